//! Core rendering functionality
//!
//! Backend traits the scene draws through, and their wgpu implementation.

pub mod draw;
pub mod pipeline_manager;
pub mod render_engine;
pub mod vertex;

pub use draw::{DrawBackend, MeshHandle, RenderBackend, TextureHandle, Topology};
pub use pipeline_manager::{PipelineConfig, PipelineKey, PipelineManager};
pub use render_engine::{RenderEngine, RenderError};
pub use vertex::Vertex3D;
