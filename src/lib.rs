//! Orrery
//!
//! A real-time solar system viewer built on wgpu and winit: orbiting bodies,
//! a keyboard-driven camera, a steerable ship and hot-reloadable shaders.

pub mod app;
pub mod config;
pub mod gfx;
pub mod input;
pub mod simulation;

// Re-export main types for convenience
pub use app::{FrameLifecycle, OrreryApp};
pub use config::SceneConfig;
