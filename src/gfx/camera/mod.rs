pub mod camera_mode;
pub mod camera_resolver;
pub mod camera_utils;

// Re-export main types
pub use camera_mode::{CameraMode, ViewParameters};
pub use camera_resolver::CameraResolver;
pub use camera_utils::{billboard_angles, normal_matrix, perspective_projection};
