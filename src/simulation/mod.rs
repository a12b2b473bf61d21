//! Time-driven scene state
//!
//! Orbiting bodies, the player ship, and the curved ship path with the frame
//! that follows it. Everything here is plain data and math; rendering lives
//! in [`crate::gfx`].

pub mod body;
pub mod frame;
pub mod path;
pub mod vehicle;

pub use body::{BodyId, BodySystem, CelestialBody};
pub use frame::PathFrame;
pub use path::{CurveError, PathCurve, PiecewiseBezier};
pub use vehicle::Vehicle;
