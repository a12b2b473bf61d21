//! # Graphics Module
//!
//! Everything between the simulation state and the GPU.
//!
//! - **Camera** ([`camera`]) - camera modes resolved into view and projection
//! - **Shaders** ([`shader`]) - file-backed programs with hot reload and
//!   name-addressed uniforms
//! - **Rendering** ([`rendering`]) - backend traits and the wgpu
//!   [`RenderEngine`]
//! - **Geometry** ([`geometry`]) - spheres, quads, polylines and OBJ meshes
//! - **Resources** ([`resources`]) - texture images and GPU textures
//! - **Scene** ([`scene`]) - per-frame draw orchestration

pub mod camera;
pub mod geometry;
pub mod rendering;
pub mod resources;
pub mod scene;
pub mod shader;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use rendering::render_engine::RenderEngine;
pub use scene::SceneComposer;
