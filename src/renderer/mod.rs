//! Scene-side helpers: geographic projection and live marker state
//!
//! The scene graph itself lives outside this crate; these types produce the
//! positions it draws.

mod markers;
mod projection;

pub use markers::*;
pub use projection::*;
