//! Analysis modules.
//!
//! Reduces raw openFDA reports into ranked reaction counts.

pub mod aggregator;

pub use aggregator::*;
