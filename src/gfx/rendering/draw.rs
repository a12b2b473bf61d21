//! Drawing seam between the scene composer and the graphics device
//!
//! The composer talks to the device in immediate-mode terms: bind a program,
//! write its uniforms, bind a texture, draw a mesh. [`DrawBackend`] covers the
//! mesh, texture and frame parts; [`ShaderBackend`] covers programs.

use crate::gfx::{
    geometry::GeometryData, resources::texture_resource::TextureImage, shader::ShaderBackend,
};

/// Uploaded mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Uploaded texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// How the vertices of a mesh are assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    #[default]
    Triangles,
    LineStrip,
    Lines,
}

impl Topology {
    pub fn to_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
            Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Topology::Lines => wgpu::PrimitiveTopology::LineList,
        }
    }
}

/// Mesh, texture and frame operations required from the graphics device
pub trait DrawBackend {
    fn upload_mesh(&mut self, label: &str, mesh: &GeometryData) -> MeshHandle;

    fn upload_texture(&mut self, label: &str, image: &TextureImage) -> TextureHandle;

    /// Resizes the drawable surface. Zero sizes are ignored.
    fn resize(&mut self, width: u32, height: u32);

    /// Starts recording a frame
    fn begin_frame(&mut self);

    /// Binds a texture to `unit` for subsequent draws; `None` binds plain white
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>);

    /// Enables or disables source-alpha blending for subsequent draws
    fn set_blending(&mut self, enabled: bool);

    /// Draws a mesh with the bound program, its current uniforms and the
    /// bound texture
    fn draw_mesh(&mut self, mesh: MeshHandle);

    /// Submits the recorded frame and presents it
    fn end_frame(&mut self);
}

/// Everything the scene composer needs from a device
pub trait RenderBackend: ShaderBackend + DrawBackend {}

impl<T: ShaderBackend + DrawBackend> RenderBackend for T {}
