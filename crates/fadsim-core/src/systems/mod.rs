//! Systems - logic that operates on components

mod aggregation;
mod drift;

pub use aggregation::*;
pub use drift::*;
