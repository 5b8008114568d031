//! Page rendering for the search client.

pub mod generator;

pub use generator::*;
