use cgmath::Vector3;
use std::fmt;

use crate::simulation::BodyId;

/// What the camera is attached to; exactly one is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    /// Fixed offset from the central body
    FreeOrbitOnSun,
    /// Orbits the given body at a zoomable distance
    LockedOnBody(BodyId),
    /// Hovers behind and above the ship
    FollowVehicle,
}

impl fmt::Display for CameraMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraMode::FreeOrbitOnSun => f.write_str("free"),
            CameraMode::LockedOnBody(BodyId(index)) => write!(f, "body #{}", index + 1),
            CameraMode::FollowVehicle => f.write_str("ship"),
        }
    }
}

/// Look-at triple resolved for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParameters {
    pub eye: Vector3<f32>,
    pub center: Vector3<f32>,
    pub up: Vector3<f32>,
}
