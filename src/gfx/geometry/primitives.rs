//! # Primitive Shape Generation

use super::GeometryData;
use crate::gfx::rendering::draw::Topology;
use cgmath::Vector3;
use std::f32::consts::PI;

/// Generate a UV sphere with specified resolution
///
/// Returns a sphere of radius 1.0 centered at the origin. `v` runs from the
/// north pole (0) to the south pole (1), `u` once around the equator.
///
/// # Arguments
/// * `longitude_segments` - Number of vertical segments (longitude lines)
/// * `latitude_segments` - Number of horizontal segments (latitude lines)
pub fn generate_sphere(longitude_segments: u32, latitude_segments: u32) -> GeometryData {
    let mut data = GeometryData::new();

    let long_segs = longitude_segments.max(3);
    let lat_segs = latitude_segments.max(2);

    for lat in 0..=lat_segs {
        let theta = lat as f32 * PI / lat_segs as f32;
        let sin_theta = theta.sin();
        let cos_theta = theta.cos();

        for long in 0..=long_segs {
            let phi = long as f32 * 2.0 * PI / long_segs as f32;

            // Longitude runs clockwise seen from above so the texture is not
            // mirrored on the outside of the sphere
            let x = sin_theta * phi.cos();
            let y = cos_theta;
            let z = -sin_theta * phi.sin();

            data.vertices.push([x, y, z]);
            data.normals.push([x, y, z]);
            data.tex_coords
                .push([long as f32 / long_segs as f32, lat as f32 / lat_segs as f32]);
        }
    }

    for lat in 0..lat_segs {
        for long in 0..long_segs {
            let first = lat * (long_segs + 1) + long;
            let second = first + long_segs + 1;

            data.indices.extend_from_slice(&[first, second, first + 1]);
            data.indices.extend_from_slice(&[second, second + 1, first + 1]);
        }
    }

    data
}

/// Unit quad in the XY plane facing +Z, centred at the origin
///
/// Spans [-1, 1] on both axes so a uniform scale by `s` yields a quad of
/// half-size `s`.
pub fn generate_billboard_quad() -> GeometryData {
    GeometryData {
        vertices: vec![
            [-1.0, -1.0, 0.0],
            [1.0, -1.0, 0.0],
            [1.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0],
        ],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        tex_coords: vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]],
        indices: vec![0, 1, 2, 2, 3, 0],
        topology: Topology::Triangles,
    }
}

/// Line strip through `points`, repeating the first point when `closed`
pub fn generate_polyline(points: &[Vector3<f32>], closed: bool) -> GeometryData {
    let mut vertices: Vec<[f32; 3]> = points.iter().map(|p| [p.x, p.y, p.z]).collect();
    if closed {
        if let Some(first) = vertices.first().copied() {
            vertices.push(first);
        }
    }

    GeometryData {
        normals: vec![[0.0, 1.0, 0.0]; vertices.len()],
        tex_coords: vec![[0.0, 0.0]; vertices.len()],
        vertices,
        indices: Vec::new(),
        topology: Topology::LineStrip,
    }
}

/// Independent line segments from `(start, end)` pairs
pub fn generate_line_segments(segments: &[(Vector3<f32>, Vector3<f32>)]) -> GeometryData {
    let vertices: Vec<[f32; 3]> = segments
        .iter()
        .flat_map(|(a, b)| [[a.x, a.y, a.z], [b.x, b.y, b.z]])
        .collect();

    GeometryData {
        normals: vec![[0.0, 1.0, 0.0]; vertices.len()],
        tex_coords: vec![[0.0, 0.0]; vertices.len()],
        vertices,
        indices: Vec::new(),
        topology: Topology::Lines,
    }
}

/// A single unit segment from the origin along +X
///
/// Frame axes are drawn by transforming this segment onto each axis.
pub fn generate_unit_axis() -> GeometryData {
    generate_line_segments(&[(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0))])
}
