//! # Protocell
//!
//! Command line driver for the protocell engine: runs a single organism in
//! an isolated dish and reports what it did.

/// Single-organism dish host and run reports
pub mod dish;

pub use dish::{Dish, DishHost, OffspringSummary, RunReport};
