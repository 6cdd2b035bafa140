use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// GPU-ready mesh buffers: interleaved `position.xyz normal.xyz` vertices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 6
    }
}

/// Parses an OBJ file from memory.
///
/// Faces are fan-triangulated; vertices referenced with different normals are
/// duplicated. When the file carries no usable normals, smooth normals are
/// reconstructed from the triangle faces.
pub fn load_obj_from_str(data: &str) -> Result<MeshData> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut corners: Vec<(usize, Option<usize>)> = Vec::new();
    let mut face_sizes: Vec<usize> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => positions.push(
                read_vec3(&mut parts)
                    .with_context(|| format!("invalid vertex on line {}", line_no + 1))?,
            ),
            Some("vn") => normals.push(
                read_vec3(&mut parts)
                    .with_context(|| format!("invalid normal on line {}", line_no + 1))?,
            ),
            Some("f") => {
                let start = corners.len();
                for corner in parts {
                    corners.push(
                        read_corner(corner, positions.len(), normals.len())
                            .with_context(|| format!("invalid face on line {}", line_no + 1))?,
                    );
                }
                let size = corners.len() - start;
                if size < 3 {
                    return Err(anyhow!(
                        "face on line {} references fewer than 3 vertices",
                        line_no + 1
                    ));
                }
                face_sizes.push(size);
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }

    let mut mesh = assemble(&positions, &normals, &corners, &face_sizes);
    if mesh
        .vertices
        .chunks_exact(6)
        .any(|v| v[3] == 0.0 && v[4] == 0.0 && v[5] == 0.0)
    {
        reconstruct_normals(&mut mesh);
    }
    Ok(mesh)
}

fn read_vec3<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut out = [0.0f32; 3];
    for slot in &mut out {
        *slot = parts
            .next()
            .ok_or_else(|| anyhow!("missing component"))?
            .parse()?;
    }
    Ok(Vec3::from_array(out))
}

/// Resolves a `v`, `v/vt`, `v//vn` or `v/vt/vn` face corner. OBJ indices are
/// 1-based; negative indices count back from the end of the list.
fn read_corner(text: &str, positions: usize, normals: usize) -> Result<(usize, Option<usize>)> {
    let mut fields = text.split('/');
    let position = fields
        .next()
        .ok_or_else(|| anyhow!("empty face corner"))?
        .parse::<i32>()?;
    let position =
        resolve_index(position, positions).ok_or_else(|| anyhow!("vertex index out of range"))?;
    let _texcoord = fields.next();
    let normal = match fields.next() {
        Some("") | None => None,
        Some(raw) => resolve_index(raw.parse::<i32>()?, normals),
    };
    Ok((position, normal))
}

fn resolve_index(index: i32, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let back = (-index) as usize;
        (back <= len).then(|| len - back)
    } else {
        None
    }
}

fn assemble(
    positions: &[Vec3],
    normals: &[Vec3],
    corners: &[(usize, Option<usize>)],
    face_sizes: &[usize],
) -> MeshData {
    let mut dedup: HashMap<(usize, Option<usize>), u32> = HashMap::new();
    let mut mesh = MeshData::default();

    let mut emit = |mesh: &mut MeshData, corner: (usize, Option<usize>)| -> u32 {
        *dedup.entry(corner).or_insert_with(|| {
            let index = (mesh.vertices.len() / 6) as u32;
            let position = positions[corner.0];
            let normal = corner.1.map(|i| normals[i]).unwrap_or(Vec3::ZERO);
            mesh.vertices.extend_from_slice(&[
                position.x, position.y, position.z, normal.x, normal.y, normal.z,
            ]);
            index
        })
    };

    let mut cursor = 0;
    for &size in face_sizes {
        let face = &corners[cursor..cursor + size];
        cursor += size;
        let anchor = emit(&mut mesh, face[0]);
        for pair in face[1..].windows(2) {
            let b = emit(&mut mesh, pair[0]);
            let c = emit(&mut mesh, pair[1]);
            mesh.indices.extend_from_slice(&[anchor, b, c]);
        }
    }
    mesh
}

fn reconstruct_normals(mesh: &mut MeshData) {
    let count = mesh.vertex_count();
    let mut accum = vec![Vec3::ZERO; count];

    for triangle in mesh.indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        let p0 = Vec3::from_slice(&mesh.vertices[i0 * 6..i0 * 6 + 3]);
        let p1 = Vec3::from_slice(&mesh.vertices[i1 * 6..i1 * 6 + 3]);
        let p2 = Vec3::from_slice(&mesh.vertices[i2 * 6..i2 * 6 + 3]);
        let face_normal = (p1 - p0).cross(p2 - p0);
        if face_normal.length_squared() > f32::EPSILON {
            let face_normal = face_normal.normalize();
            accum[i0] += face_normal;
            accum[i1] += face_normal;
            accum[i2] += face_normal;
        }
    }

    for (i, normal) in accum.into_iter().enumerate() {
        let normal = normal.normalize_or_zero();
        mesh.vertices[i * 6 + 3] = normal.x;
        mesh.vertices[i * 6 + 4] = normal.y;
        mesh.vertices[i * 6 + 5] = normal.z;
    }
}

/// Generates a UV sphere with analytic normals. Used for the earth and sun,
/// which the original scene builds procedurally rather than loading.
pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> MeshData {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut mesh = MeshData::default();

    for ring in 0..=rings {
        let theta = std::f32::consts::PI * ring as f32 / rings as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for segment in 0..=segments {
            let phi = std::f32::consts::TAU * segment as f32 / segments as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let normal = Vec3::new(sin_theta * cos_phi, cos_theta, sin_theta * sin_phi);
            let position = normal * radius;
            mesh.vertices.extend_from_slice(&[
                position.x, position.y, position.z, normal.x, normal.y, normal.z,
            ]);
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            mesh.indices
                .extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_triangle() {
        let obj = "\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = load_obj_from_str(obj).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn quad_is_fan_triangulated() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = load_obj_from_str(obj).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = load_obj_from_str(obj).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn missing_normals_are_reconstructed() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = load_obj_from_str(obj).unwrap();
        for vertex in mesh.vertices.chunks_exact(6) {
            let normal = Vec3::new(vertex[3], vertex[4], vertex[5]);
            assert!((normal.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn explicit_normals_are_kept() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 -1\nf 1//1 2//1 3//1\n";
        let mesh = load_obj_from_str(obj).unwrap();
        assert_eq!(&mesh.vertices[3..6], &[0.0, 0.0, -1.0]);
    }

    #[test]
    fn empty_file_is_an_error() {
        assert!(load_obj_from_str("# nothing here\n").is_err());
    }

    #[test]
    fn sphere_normals_are_unit_radial() {
        let mesh = uv_sphere(18.0, 30, 30);
        assert_eq!(mesh.vertex_count(), 31 * 31);
        for vertex in mesh.vertices.chunks_exact(6) {
            let position = Vec3::new(vertex[0], vertex[1], vertex[2]);
            let normal = Vec3::new(vertex[3], vertex[4], vertex[5]);
            assert!((position.length() - 18.0).abs() < 1e-3);
            assert!((normal.length() - 1.0).abs() < 1e-5);
        }
    }
}
