//! Pollutant identifiers and raw concentration readings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pollutants reported by monitoring stations.
///
/// Only [`Pollutant::Pm25`] and [`Pollutant::Pm10`] carry breakpoint tables;
/// the remaining gases are informational.
///
/// # Examples
///
/// ```
/// # use aqi_backend::domain::Pollutant;
/// assert_eq!("pm2.5".parse::<Pollutant>(), Ok(Pollutant::Pm25));
/// assert_eq!(Pollutant::So2.as_str(), "so2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pollutant {
    /// Fine particulate matter, 2.5 µm and below.
    Pm25,
    /// Coarse particulate matter, 10 µm and below.
    Pm10,
    /// Ozone.
    O3,
    /// Nitrogen dioxide.
    No2,
    /// Carbon monoxide.
    Co,
    /// Sulphur dioxide.
    So2,
}

impl Pollutant {
    /// Every pollutant, in reporting order.
    pub const ALL: [Self; 6] = [
        Self::Pm25,
        Self::Pm10,
        Self::O3,
        Self::No2,
        Self::Co,
        Self::So2,
    ];

    /// Canonical wire name, matching the upstream feed parameter names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pm25 => "pm25",
            Self::Pm10 => "pm10",
            Self::O3 => "o3",
            Self::No2 => "no2",
            Self::Co => "co",
            Self::So2 => "so2",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown pollutant name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pollutant: {input}")]
pub struct ParsePollutantError {
    /// The unrecognised input value.
    pub input: String,
}

impl FromStr for Pollutant {
    type Err = ParsePollutantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pm25" | "pm2.5" | "pm2_5" => Ok(Self::Pm25),
            "pm10" => Ok(Self::Pm10),
            "o3" => Ok(Self::O3),
            "no2" => Ok(Self::No2),
            "co" => Ok(Self::Co),
            "so2" => Ok(Self::So2),
            _ => Err(ParsePollutantError {
                input: s.to_owned(),
            }),
        }
    }
}

/// One set of pollutant concentrations observed at a single instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantReading {
    /// PM2.5 concentration in µg/m³.
    pub pm25: f64,
    /// PM10 concentration in µg/m³.
    pub pm10: f64,
    /// Ozone concentration.
    pub o3: f64,
    /// Nitrogen dioxide concentration.
    pub no2: f64,
    /// Carbon monoxide concentration.
    pub co: f64,
    /// Sulphur dioxide concentration.
    pub so2: f64,
    /// Observation time.
    pub timestamp: DateTime<Utc>,
}

impl PollutantReading {
    /// Concentration recorded for `pollutant`.
    pub fn concentration(&self, pollutant: Pollutant) -> f64 {
        match pollutant {
            Pollutant::Pm25 => self.pm25,
            Pollutant::Pm10 => self.pm10,
            Pollutant::O3 => self.o3,
            Pollutant::No2 => self.no2,
            Pollutant::Co => self.co,
            Pollutant::So2 => self.so2,
        }
    }

    /// Overwrite the concentration recorded for `pollutant`.
    pub fn set_concentration(&mut self, pollutant: Pollutant, value: f64) {
        let slot = match pollutant {
            Pollutant::Pm25 => &mut self.pm25,
            Pollutant::Pm10 => &mut self.pm10,
            Pollutant::O3 => &mut self.o3,
            Pollutant::No2 => &mut self.no2,
            Pollutant::Co => &mut self.co,
            Pollutant::So2 => &mut self.so2,
        };
        *slot = value;
    }
}
