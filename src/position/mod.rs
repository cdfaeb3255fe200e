//! Position module
//!
//! Derives positions and realized P&L from the ordered trade sequence

mod calculator;
mod types;

pub use calculator::PositionCalculator;
pub use types::{Position, PositionError, PositionState, Realization};
