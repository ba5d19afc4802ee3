//! Index engine: standardised air quality index from pollutant concentrations.
//!
//! Pure and synchronous. Callers supply concentrations (observed or
//! synthetic, the engine cannot tell) and receive an integer index on the
//! 0–500 scale.

mod breakpoints;
mod category;
mod index;
mod pollutant;

pub use breakpoints::{
    Breakpoint, BreakpointTable, MAX_INDEX, PM10_TABLE, PM25_TABLE, breakpoint_table,
};
pub use category::AqiCategory;
pub use index::{IndexError, MAX_SANE_CONCENTRATION, compute_overall_index, compute_sub_index};
pub use pollutant::{ParsePollutantError, Pollutant, PollutantReading};
