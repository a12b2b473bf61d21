//! # Procedural and loaded geometry
//!
//! Generates the meshes the scene draws: a UV sphere shared by every body
//! and the starfield, a camera-facing quad for the glow billboard, polylines
//! for debug curves and line segments for frame axes. The ship mesh is loaded
//! from an OBJ file.

pub mod obj;
pub mod primitives;

pub use obj::{load_obj, ship_mesh};
pub use primitives::*;

use crate::gfx::rendering::{draw::Topology, vertex::Vertex3D};

/// Geometry data ready for GPU upload
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<[f32; 3]>,
    /// Texture coordinates (u, v)
    pub tex_coords: Vec<[f32; 2]>,
    /// Normal vectors (x, y, z)
    pub normals: Vec<[f32; 3]>,
    /// Element indices; empty for non-indexed line meshes
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.indices.len() / 3,
            _ => 0,
        }
    }

    /// Number of elements a draw call covers
    pub fn element_count(&self) -> u32 {
        if self.indices.is_empty() {
            self.vertices.len() as u32
        } else {
            self.indices.len() as u32
        }
    }

    /// Interleaves the attribute arrays into GPU vertices
    ///
    /// Missing normals default to +Y and missing texture coordinates to zero.
    pub fn to_vertices(&self) -> Vec<Vertex3D> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, position)| Vertex3D {
                position: *position,
                normal: self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                tex_coord: self.tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect()
    }
}
