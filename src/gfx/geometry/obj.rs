//! OBJ mesh loading

use log::{info, warn};
use std::path::Path;

use super::GeometryData;
use crate::gfx::rendering::draw::Topology;

/// Loads and merges every model in an OBJ file into one triangle mesh
///
/// Normals are taken from the file when present for every vertex and
/// computed from the faces otherwise.
pub fn load_obj(path: &Path) -> Result<GeometryData, tobj::LoadError> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )?;

    let mut data = GeometryData::new();
    for model in models {
        let mesh = model.mesh;
        let base = data.vertices.len() as u32;

        let normals = if !mesh.normals.is_empty() && mesh.normals.len() == mesh.positions.len() {
            mesh.normals.clone()
        } else {
            calculate_vertex_normals(&mesh.positions, &mesh.indices)
        };

        for (i, position) in mesh.positions.chunks_exact(3).enumerate() {
            data.vertices.push([position[0], position[1], position[2]]);
            data.normals
                .push([normals[3 * i], normals[3 * i + 1], normals[3 * i + 2]]);
            let uv = mesh
                .texcoords
                .get(2 * i..2 * i + 2)
                .map(|uv| [uv[0], 1.0 - uv[1]])
                .unwrap_or([0.0, 0.0]);
            data.tex_coords.push(uv);
        }
        data.indices.extend(mesh.indices.iter().map(|i| base + i));
    }

    data.topology = Topology::Triangles;
    Ok(data)
}

/// Area-weighted vertex normals accumulated from triangle faces
fn calculate_vertex_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let mut normals = vec![0.0f32; positions.len()];
    let vertex = |i: u32| {
        let i = i as usize * 3;
        cgmath::Vector3::new(positions[i], positions[i + 1], positions[i + 2])
    };

    for face in indices.chunks_exact(3) {
        let (a, b, c) = (vertex(face[0]), vertex(face[1]), vertex(face[2]));
        let n = (b - a).cross(c - a);
        for &i in face {
            let i = i as usize * 3;
            normals[i] += n.x;
            normals[i + 1] += n.y;
            normals[i + 2] += n.z;
        }
    }

    for normal in normals.chunks_exact_mut(3) {
        let length = (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
        if length > f32::EPSILON {
            normal.iter_mut().for_each(|c| *c /= length);
        } else {
            normal.copy_from_slice(&[0.0, 1.0, 0.0]);
        }
    }
    normals
}

/// The ship mesh from `path`, or a small procedural dart if it cannot be read
pub fn ship_mesh(path: &Path) -> GeometryData {
    match load_obj(path) {
        Ok(mesh) if !mesh.vertices.is_empty() => {
            info!(
                "Loaded ship mesh \"{}\" ({} triangles)",
                path.display(),
                mesh.triangle_count()
            );
            mesh
        }
        Ok(_) => {
            warn!("Ship mesh \"{}\" is empty, using fallback", path.display());
            fallback_dart()
        }
        Err(err) => {
            warn!("Cannot load ship mesh \"{}\": {}, using fallback", path.display(), err);
            fallback_dart()
        }
    }
}

/// Flat arrowhead pointing along +Z
fn fallback_dart() -> GeometryData {
    let positions = [
        [0.0, 0.0, 2.0],
        [-1.0, 0.0, -1.0],
        [0.0, 0.4, -0.6],
        [1.0, 0.0, -1.0],
        [0.0, -0.3, -0.6],
    ];
    let indices = vec![0, 2, 1, 0, 3, 2, 0, 1, 4, 0, 4, 3, 1, 2, 4, 2, 3, 4];

    let flat: Vec<f32> = positions.iter().flatten().copied().collect();
    let normals = calculate_vertex_normals(&flat, &indices);

    GeometryData {
        vertices: positions.to_vec(),
        normals: normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect(),
        tex_coords: vec![[0.5, 0.5]; positions.len()],
        indices,
        topology: Topology::Triangles,
    }
}
