//! Sub-index and overall index computation.

use super::breakpoints::breakpoint_table;
use super::{Pollutant, PollutantReading};

/// Largest concentration accepted before input is treated as corrupt.
///
/// Anything between a table's ceiling and this bound saturates to the maximum
/// index instead of failing.
pub const MAX_SANE_CONCENTRATION: f64 = 50_000.0;

/// Input errors raised by the index engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndexError {
    /// Concentration was below zero.
    #[error("{pollutant} concentration must not be negative (got {value})")]
    NegativeConcentration {
        /// Pollutant being evaluated.
        pollutant: Pollutant,
        /// Rejected value.
        value: f64,
    },
    /// Concentration was NaN or infinite.
    #[error("{pollutant} concentration must be a finite number")]
    NonFiniteConcentration {
        /// Pollutant being evaluated.
        pollutant: Pollutant,
    },
    /// Concentration exceeded [`MAX_SANE_CONCENTRATION`].
    #[error("{pollutant} concentration {value} exceeds the accepted maximum {max}")]
    ConcentrationOutOfRange {
        /// Pollutant being evaluated.
        pollutant: Pollutant,
        /// Rejected value.
        value: f64,
        /// Accepted maximum.
        max: f64,
    },
    /// The pollutant has no breakpoint table.
    #[error("{pollutant} does not contribute to the air quality index")]
    UnsupportedPollutant {
        /// Pollutant that was requested.
        pollutant: Pollutant,
    },
}

/// Convert a single concentration into its sub-index.
///
/// # Errors
///
/// Returns [`IndexError`] when the pollutant has no breakpoint table or the
/// concentration is negative, non-finite, or beyond
/// [`MAX_SANE_CONCENTRATION`].
///
/// # Examples
///
/// ```
/// use aqi_backend::domain::{Pollutant, compute_sub_index};
///
/// assert_eq!(compute_sub_index(Pollutant::Pm25, 30.0), Ok(50));
/// assert_eq!(compute_sub_index(Pollutant::Pm25, 31.0), Ok(51));
/// assert_eq!(compute_sub_index(Pollutant::Pm10, 10_000.0), Ok(500));
/// ```
pub fn compute_sub_index(pollutant: Pollutant, concentration: f64) -> Result<u16, IndexError> {
    let table =
        breakpoint_table(pollutant).ok_or(IndexError::UnsupportedPollutant { pollutant })?;
    validate_concentration(pollutant, concentration)?;
    Ok(table.sub_index(concentration))
}

/// Combine the PM2.5 and PM10 sub-indices into the overall index.
///
/// The worst pollutant dominates: the result is the larger sub-index.
///
/// # Errors
///
/// Propagates the first [`IndexError`] raised by either sub-index.
pub fn compute_overall_index(reading: &PollutantReading) -> Result<u16, IndexError> {
    let pm25 = compute_sub_index(Pollutant::Pm25, reading.pm25)?;
    let pm10 = compute_sub_index(Pollutant::Pm10, reading.pm10)?;
    Ok(pm25.max(pm10))
}

fn validate_concentration(pollutant: Pollutant, value: f64) -> Result<(), IndexError> {
    if !value.is_finite() {
        return Err(IndexError::NonFiniteConcentration { pollutant });
    }
    if value < 0.0 {
        return Err(IndexError::NegativeConcentration { pollutant, value });
    }
    if value > MAX_SANE_CONCENTRATION {
        return Err(IndexError::ConcentrationOutOfRange {
            pollutant,
            value,
            max: MAX_SANE_CONCENTRATION,
        });
    }
    Ok(())
}
