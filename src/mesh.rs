use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::config::{read_text, LoadError};

/// Interleaved vertex consumed by the lit model pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// OBJ texture space, `v` pointing up.
    pub tex_coords: [f32; 2],
}

/// Consecutive indices drawn with one material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshGroup {
    /// Name given to `usemtl`, `None` before the first one.
    pub material: Option<String>,
    pub indices: Range<u32>,
}

/// Indexed triangle list ready for upload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub groups: Vec<MeshGroup>,
    /// First `mtllib` file named by the model, as written.
    pub material_library: Option<String>,
}

impl MeshData {
    pub fn load_obj(path: &Path) -> Result<Self, LoadError> {
        let contents = read_text(path)?;
        parse_obj(&contents).map_err(|reason| LoadError::Mesh {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Material library path, resolved against the model's directory.
    pub fn material_library_path(&self, model_path: &Path) -> Option<PathBuf> {
        let library = self.material_library.as_deref()?;
        let dir = model_path.parent().unwrap_or(Path::new(""));
        Some(dir.join(library.replace('\\', "/")))
    }
}

/// Parses a Wavefront OBJ document: positions, texture coordinates,
/// normals, faces, `mtllib` and `usemtl`.
///
/// Polygons are fanned into triangles, faces are grouped by the material in
/// effect, and vertices without a normal get a smoothed face normal.
pub fn parse_obj(data: &str) -> Result<MeshData, String> {
    let mut positions = Vec::new();
    let mut tex_coords = Vec::new();
    let mut normals = Vec::new();
    let mut triangles: Vec<[Corner; 3]> = Vec::new();
    let mut material_library = None;
    // (first triangle, material) for every material switch.
    let mut switches: Vec<(usize, Option<String>)> = vec![(0, None)];

    for (line_no, line) in data.lines().enumerate() {
        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        let line_no = line_no + 1;
        match tag {
            "v" => positions.push(parse_vec3(parts).map_err(|e| format!("line {line_no}: {e}"))?),
            "vt" => tex_coords.push(parse_vec2(parts).map_err(|e| format!("line {line_no}: {e}"))?),
            "vn" => normals.push(parse_vec3(parts).map_err(|e| format!("line {line_no}: {e}"))?),
            "f" => {
                let polygon = parse_face(parts).map_err(|e| format!("line {line_no}: {e}"))?;
                for i in 1..polygon.len() - 1 {
                    triangles.push([polygon[0], polygon[i], polygon[i + 1]]);
                }
            }
            "mtllib" => {
                let name = rest_of_line(line, tag);
                if material_library.is_none() && !name.is_empty() {
                    material_library = Some(name.to_string());
                }
            }
            "usemtl" => {
                let material = Some(rest_of_line(line, tag).to_string());
                match switches.last_mut() {
                    Some(last) if last.0 == triangles.len() => last.1 = material,
                    _ => switches.push((triangles.len(), material)),
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err("no vertex positions".to_string());
    }

    let (mut mesh, missing_normals) = weld(&positions, &tex_coords, &normals, &triangles)?;
    if missing_normals {
        smooth_normals(&mut mesh);
    }
    mesh.groups = material_groups(switches, triangles.len());
    mesh.material_library = material_library;
    Ok(mesh)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Corner {
    position: i64,
    tex_coord: i64,
    normal: i64,
}

/// Material and file names may contain spaces.
fn rest_of_line<'a>(line: &'a str, tag: &str) -> &'a str {
    line.trim_start()[tag.len()..].trim()
}

fn material_groups(switches: Vec<(usize, Option<String>)>, triangle_count: usize) -> Vec<MeshGroup> {
    let ends = switches
        .iter()
        .skip(1)
        .map(|(start, _)| *start)
        .chain(std::iter::once(triangle_count));
    switches
        .iter()
        .zip(ends)
        .filter(|((start, _), end)| start < end)
        .map(|((start, material), end)| MeshGroup {
            material: material.clone(),
            indices: (*start * 3) as u32..(end * 3) as u32,
        })
        .collect()
}

fn parse_vec2<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec2, String> {
    let u = parse_number(parts.next().ok_or("missing texture coordinate")?)?;
    // A lone `u` is allowed; `v` then defaults to zero.
    let v = parts.next().map_or(Ok(0.0), parse_number)?;
    Ok(Vec2::new(u, v))
}

fn parse_number(token: &str) -> Result<f32, String> {
    token
        .parse::<f32>()
        .map_err(|_| format!("`{token}` is not a number"))
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3, String> {
    let mut component = || -> Result<f32, String> {
        parse_number(parts.next().ok_or("missing vector component")?)
    };
    Ok(Vec3::new(component()?, component()?, component()?))
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<Corner>, String> {
    let corners = parts
        .map(|part| {
            let mut fields = part.split('/');
            let position = fields
                .next()
                .and_then(|field| field.parse::<i64>().ok())
                .ok_or_else(|| format!("bad face corner `{part}`"))?;
            let mut index = || {
                fields
                    .next()
                    .and_then(|field| field.parse::<i64>().ok())
                    .unwrap_or(0)
            };
            let tex_coord = index();
            let normal = index();
            Ok(Corner {
                position,
                tex_coord,
                normal,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;
    if corners.len() < 3 {
        return Err("faces need at least three corners".to_string());
    }
    Ok(corners)
}

/// Resolves a 1-based (or negative, relative) OBJ index.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    match index {
        i if i > 0 => usize::try_from(i - 1).ok().filter(|&i| i < len),
        i if i < 0 => len.checked_sub(usize::try_from(-i).ok()?),
        _ => None,
    }
}

type WeldKey = (usize, Option<usize>, Option<usize>);

fn weld(
    positions: &[Vec3],
    tex_coords: &[Vec2],
    normals: &[Vec3],
    triangles: &[[Corner; 3]],
) -> Result<(MeshData, bool), String> {
    let mut lookup: HashMap<WeldKey, u32> = HashMap::new();
    let mut mesh = MeshData::default();
    let mut missing_normals = false;

    for corner in triangles.iter().flatten() {
        let position = resolve_index(corner.position, positions.len())
            .ok_or_else(|| format!("vertex index {} out of range", corner.position))?;
        let tex_coord = resolve_index(corner.tex_coord, tex_coords.len());
        let normal = resolve_index(corner.normal, normals.len());
        missing_normals |= normal.is_none();
        let next = mesh.vertices.len() as u32;
        let key = (position, tex_coord, normal);
        let index = *lookup.entry(key).or_insert_with(|| {
            let n = normal.map(|i| normals[i]).unwrap_or(Vec3::ZERO);
            let uv = tex_coord.map(|i| tex_coords[i]).unwrap_or(Vec2::ZERO);
            mesh.vertices.push(MeshVertex {
                position: positions[position].to_array(),
                normal: n.to_array(),
                tex_coords: uv.to_array(),
            });
            next
        });
        mesh.indices.push(index);
    }
    Ok((mesh, missing_normals))
}

/// Fills zero normals with the normalized sum of adjacent face normals.
fn smooth_normals(mesh: &mut MeshData) {
    let mut accumulated = vec![Vec3::ZERO; mesh.vertices.len()];
    for triangle in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let p = |i: usize| Vec3::from_array(mesh.vertices[i].position);
        let face = (p(b) - p(a)).cross(p(c) - p(a));
        if let Some(face) = face.try_normalize() {
            for i in [a, b, c] {
                accumulated[i] += face;
            }
        }
    }
    for (vertex, normal) in mesh.vertices.iter_mut().zip(accumulated) {
        if Vec3::from_array(vertex.normal) == Vec3::ZERO {
            vertex.normal = normal.normalize_or_zero().to_array();
        }
    }
}

/// Unit cube used for the light markers, 24 vertices and 36 indices.
pub fn marker_cube() -> (Vec<[f32; 3]>, Vec<u16>) {
    const FACES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in FACES {
        let base = vertices.len() as u16;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            vertices.push(((normal + u * su + v * sv) * 0.5).to_array());
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_triangle_and_computes_normals() {
        let mesh = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices.len(), 3);
        for vertex in &mesh.vertices {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn fans_quads_and_welds_shared_corners() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1 4//1\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn negative_indices_are_relative() {
        let mesh = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3/1 -2/2 -1/3\n").unwrap();
        assert_eq!(mesh.vertices[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        assert!(parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n").is_err());
        assert!(parse_obj("# comment only\n").is_err());
    }

    #[test]
    fn texture_coordinates_follow_their_corner() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
                   vt 0 0\nvt 1 0\nvt 0 1\nvt 0.25 0.75 0\n\
                   vn 0 0 1\n\
                   f 1/1/1 2/2/1 3/3/1\n\
                   f 1/4/1 2/2/1 3/3/1\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.vertices[1].tex_coords, [1.0, 0.0]);
        assert_eq!(mesh.vertices[2].tex_coords, [0.0, 1.0]);
        // Same position, different texture coordinate: a separate vertex.
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 1, 2]);
        assert_eq!(mesh.vertices[3].position, [0.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[3].tex_coords, [0.25, 0.75]);
    }

    #[test]
    fn texture_coordinates_without_normals_are_kept() {
        let mesh = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.5\nf 1/1 2/1 3/-1\n").unwrap();
        assert!(mesh.vertices.iter().all(|v| v.tex_coords == [0.5, 0.5]));
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn malformed_texture_coordinate_is_rejected() {
        let err = parse_obj("v 0 0 0\nvt x 1\n").unwrap_err();
        assert!(err.starts_with("line 2"), "{err}");
    }

    #[test]
    fn faces_are_grouped_by_material() {
        let obj = "mtllib forest.mtl\n\
                   v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\n\
                   f 1 2 3\n\
                   usemtl Bark\n\
                   f 1 2 3\nf 2 4 3\n\
                   usemtl Leaves\nusemtl Leaves Dark\n\
                   f 2 4 3\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.material_library.as_deref(), Some("forest.mtl"));
        assert_eq!(
            mesh.groups,
            vec![
                MeshGroup {
                    material: None,
                    indices: 0..3
                },
                MeshGroup {
                    material: Some("Bark".to_string()),
                    indices: 3..9
                },
                MeshGroup {
                    material: Some("Leaves Dark".to_string()),
                    indices: 9..12
                },
            ]
        );
        assert_eq!(
            mesh.material_library_path(Path::new("objects/forest/forest.obj")),
            Some(PathBuf::from("objects/forest/forest.mtl"))
        );
    }

    #[test]
    fn marker_cube_faces_point_outwards() {
        let (vertices, indices) = marker_cube();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        for triangle in indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]]
                .map(|i| Vec3::from_array(vertices[i as usize]));
            let normal = (b - a).cross(c - a);
            let center = (a + b + c) / 3.0;
            assert!(normal.dot(center) > 0.0);
        }
    }
}
