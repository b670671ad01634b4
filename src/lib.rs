//! orbitrack - live satellite positions from two-line element sets
//!
//! Parses TLE text, propagates it with SGP4, converts to geodetic
//! coordinates on a fixed cadence, and samples orbit paths for display.

pub mod analysis;
pub mod data;
pub mod propagation;
pub mod renderer;
