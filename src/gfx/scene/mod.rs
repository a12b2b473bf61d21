//! # Scene Module
//!
//! Per-frame composition of the solar system scene.
//!
//! - [`SceneComposer`] - owns scene state and GPU resources, implements
//!   [`FrameLifecycle`](crate::app::FrameLifecycle)
//! - [`DisplayFlags`] - greyscale and curve overlay toggles

pub mod composer;
pub mod display;

// Re-export main types
pub use composer::SceneComposer;
pub use display::{CurveDisplayMode, DisplayFlags, OverlaySet};
