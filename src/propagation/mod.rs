//! Orbital propagation module
//!
//! The `propagator` submodule loads element sets into satkit's SGP4 model and
//! converts TEME output to geodetic coordinates via `geodesy`. On top of it:
//!
//! - `batch_loop` re-propagates a whole collection on a fixed cadence and
//!   hands each time-consistent [`Snapshot`] to a callback.
//! - `orbit_track` samples one orbital period of a single object for drawing.
//!
//! # Example
//!
//! ```ignore
//! use orbitrack::data::{parse, DEFAULT_LIMIT};
//! use orbitrack::propagation::start;
//!
//! let sets = parse(&text, DEFAULT_LIMIT);
//! let handle = start(sets, 30_000, |snapshot| {
//!     println!("{} positions at {}", snapshot.positions.len(), snapshot.instant);
//! })?;
//! // ...
//! handle.stop();
//! ```

mod batch_loop;
mod geodesy;
mod orbit_track;
mod propagator;

pub use batch_loop::*;
pub use geodesy::*;
pub use orbit_track::*;
pub use propagator::*;
