//! Piecewise-linear breakpoint tables for the national air quality index.
//!
//! Each table is ordered by concentration and its tuples never overlap. The
//! integer concentration bounds leave one-unit gaps between tuples (for
//! example PM2.5 30 and 31); [`BreakpointTable::sub_index`] bridges a gap by
//! interpolating between the neighbouring tuple endpoints so the index stays
//! monotonic.

use super::Pollutant;

/// Highest index value any table can produce.
pub const MAX_INDEX: u16 = 500;

/// One `(concentration_low, concentration_high, index_low, index_high)` tuple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    /// Inclusive lower concentration bound.
    pub concentration_low: f64,
    /// Inclusive upper concentration bound.
    pub concentration_high: f64,
    /// Index value at `concentration_low`.
    pub index_low: u16,
    /// Index value at `concentration_high`.
    pub index_high: u16,
}

impl Breakpoint {
    const fn new(
        concentration_low: f64,
        concentration_high: f64,
        index_low: u16,
        index_high: u16,
    ) -> Self {
        Self {
            concentration_low,
            concentration_high,
            index_low,
            index_high,
        }
    }

    /// Whether `concentration` lies inside this tuple, bounds included.
    pub fn contains(&self, concentration: f64) -> bool {
        (self.concentration_low..=self.concentration_high).contains(&concentration)
    }

    fn interpolate(&self, concentration: f64) -> u16 {
        interpolate(
            (self.concentration_low, self.concentration_high),
            (self.index_low, self.index_high),
            concentration,
        )
    }
}

/// Ordered breakpoint tuples for a single pollutant.
#[derive(Debug, Clone, Copy)]
pub struct BreakpointTable {
    pollutant: Pollutant,
    breakpoints: &'static [Breakpoint],
}

const PM25_BREAKPOINTS: &[Breakpoint] = &[
    Breakpoint::new(0.0, 30.0, 0, 50),
    Breakpoint::new(31.0, 60.0, 51, 100),
    Breakpoint::new(61.0, 90.0, 101, 200),
    Breakpoint::new(91.0, 120.0, 201, 300),
    Breakpoint::new(121.0, 250.0, 301, 400),
    Breakpoint::new(251.0, 500.0, 401, 500),
];

const PM10_BREAKPOINTS: &[Breakpoint] = &[
    Breakpoint::new(0.0, 50.0, 0, 50),
    Breakpoint::new(51.0, 100.0, 51, 100),
    Breakpoint::new(101.0, 250.0, 101, 200),
    Breakpoint::new(251.0, 350.0, 201, 300),
    Breakpoint::new(351.0, 430.0, 301, 400),
    Breakpoint::new(431.0, 600.0, 401, 500),
];

/// PM2.5 breakpoints (µg/m³, 24-hour average).
pub const PM25_TABLE: BreakpointTable = BreakpointTable {
    pollutant: Pollutant::Pm25,
    breakpoints: PM25_BREAKPOINTS,
};

/// PM10 breakpoints (µg/m³, 24-hour average).
pub const PM10_TABLE: BreakpointTable = BreakpointTable {
    pollutant: Pollutant::Pm10,
    breakpoints: PM10_BREAKPOINTS,
};

/// Look up the breakpoint table for `pollutant`, if it has one.
pub fn breakpoint_table(pollutant: Pollutant) -> Option<&'static BreakpointTable> {
    match pollutant {
        Pollutant::Pm25 => Some(&PM25_TABLE),
        Pollutant::Pm10 => Some(&PM10_TABLE),
        Pollutant::O3 | Pollutant::No2 | Pollutant::Co | Pollutant::So2 => None,
    }
}

impl BreakpointTable {
    /// Pollutant this table applies to.
    pub fn pollutant(&self) -> Pollutant {
        self.pollutant
    }

    /// Tuples in ascending concentration order.
    pub fn breakpoints(&self) -> &'static [Breakpoint] {
        self.breakpoints
    }

    /// Upper concentration bound of the last tuple.
    pub fn ceiling(&self) -> f64 {
        self.breakpoints
            .last()
            .map_or(0.0, |last| last.concentration_high)
    }

    /// Map a non-negative concentration onto the index scale.
    ///
    /// Concentrations past [`Self::ceiling`] saturate at [`MAX_INDEX`].
    pub fn sub_index(&self, concentration: f64) -> u16 {
        let mut previous: Option<&Breakpoint> = None;
        for breakpoint in self.breakpoints {
            if concentration < breakpoint.concentration_low {
                return match previous {
                    Some(lower) => interpolate(
                        (lower.concentration_high, breakpoint.concentration_low),
                        (lower.index_high, breakpoint.index_low),
                        concentration,
                    ),
                    None => breakpoint.index_low,
                };
            }
            if breakpoint.contains(concentration) {
                return breakpoint.interpolate(concentration);
            }
            previous = Some(breakpoint);
        }
        MAX_INDEX
    }
}

fn interpolate(
    (concentration_low, concentration_high): (f64, f64),
    (index_low, index_high): (u16, u16),
    concentration: f64,
) -> u16 {
    let index_low = f64::from(index_low);
    let index_high = f64::from(index_high);
    let value = (index_high - index_low) / (concentration_high - concentration_low)
        * (concentration - concentration_low)
        + index_low;
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "value is rounded and clamped to 0..=MAX_INDEX first"
    )]
    let index = value.round_ties_even().clamp(0.0, f64::from(MAX_INDEX)) as u16;
    index
}
