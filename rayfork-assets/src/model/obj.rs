//! Wavefront OBJ loading.
//!
//! Line parser over `v`/`vt`/`vn`/`f` records with fan triangulation and
//! negative-index support. All shapes merge into a single mesh; materials
//! are not parsed, so the model carries the default white material.

use crate::error::{Error, Result};
use crate::model::{finalize_model, Mesh, Model};

const MAX_INDEX_VALUE: usize = u16::MAX as usize;

/// One `a/b/c` face corner: indices into the position/texcoord/normal pools.
#[derive(Debug, Clone, Copy)]
struct FaceVertex {
    position: usize,
    texcoord: Option<usize>,
    normal: Option<usize>,
}

/// Resolve an OBJ index (1-based, negative counts from the end).
fn resolve_index(raw: i64, pool_len: usize) -> Result<usize> {
    let index = if raw > 0 {
        raw - 1
    } else if raw < 0 {
        pool_len as i64 + raw
    } else {
        return Err(Error::BadFormat {
            container: "OBJ",
            reason: "face index 0 is not valid",
        });
    };
    if index < 0 || index as usize >= pool_len {
        return Err(Error::BadFormat {
            container: "OBJ",
            reason: "face index out of range",
        });
    }
    Ok(index as usize)
}

fn parse_face_vertex(
    token: &str,
    positions: usize,
    texcoords: usize,
    normals: usize,
) -> Result<FaceVertex> {
    let mut parts = token.split('/');
    let bad = || Error::BadFormat {
        container: "OBJ",
        reason: "malformed face vertex",
    };

    let position = resolve_index(parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?, positions)?;
    let texcoord = match parts.next() {
        None | Some("") => None,
        Some(t) => Some(resolve_index(t.parse().map_err(|_| bad())?, texcoords)?),
    };
    let normal = match parts.next() {
        None | Some("") => None,
        Some(n) => Some(resolve_index(n.parse().map_err(|_| bad())?, normals)?),
    };
    Ok(FaceVertex {
        position,
        texcoord,
        normal,
    })
}

/// Parse an OBJ file held in memory into a single-mesh model.
pub fn model_from_obj(bytes: &[u8]) -> Result<Model> {
    let text = std::str::from_utf8(bytes).map_err(|_| Error::BadFormat {
        container: "OBJ",
        reason: "not valid UTF-8 text",
    })?;

    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut mesh = Mesh::default();

    let parse_f32 = |s: Option<&str>| s.and_then(|v| v.parse::<f32>().ok()).unwrap_or(0.0);

    fn emit(
        fv: FaceVertex,
        positions: &[[f32; 3]],
        texcoords: &[[f32; 2]],
        normals: &[[f32; 3]],
        mesh: &mut Mesh,
    ) -> Result<u16> {
        let index = mesh.vertex_count();
        if index > MAX_INDEX_VALUE {
            return Err(Error::Unsupported(
                "OBJ mesh exceeds 65536 expanded vertices".into(),
            ));
        }
        mesh.positions.extend_from_slice(&positions[fv.position]);
        if let Some(t) = fv.texcoord {
            let [u, v] = texcoords[t];
            // OBJ texcoord origin is bottom-left
            mesh.texcoords.extend_from_slice(&[u, 1.0 - v]);
        }
        if let Some(n) = fv.normal {
            mesh.normals.extend_from_slice(&normals[n]);
        }
        Ok(index as u16)
    }

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => positions.push([
                parse_f32(parts.next()),
                parse_f32(parts.next()),
                parse_f32(parts.next()),
            ]),
            Some("vt") => texcoords.push([parse_f32(parts.next()), parse_f32(parts.next())]),
            Some("vn") => normals.push([
                parse_f32(parts.next()),
                parse_f32(parts.next()),
                parse_f32(parts.next()),
            ]),
            Some("f") => {
                let corners: Vec<FaceVertex> = parts
                    .map(|t| parse_face_vertex(t, positions.len(), texcoords.len(), normals.len()))
                    .collect::<Result<_>>()?;
                if corners.len() < 3 {
                    return Err(Error::BadFormat {
                        container: "OBJ",
                        reason: "face with fewer than 3 vertices",
                    });
                }
                // Fan triangulation
                let first = emit(corners[0], &positions, &texcoords, &normals, &mut mesh)?;
                let mut prev = emit(corners[1], &positions, &texcoords, &normals, &mut mesh)?;
                for &corner in &corners[2..] {
                    let current = emit(corner, &positions, &texcoords, &normals, &mut mesh)?;
                    mesh.indices.extend_from_slice(&[first, prev, current]);
                    prev = current;
                }
            }
            // Groups, objects, materials and smoothing are ignored; a single
            // merged mesh comes out regardless of shape count
            _ => {}
        }
    }

    if mesh.vertex_count() == 0 {
        return Err(Error::BadFormat {
            container: "OBJ",
            reason: "no geometry found",
        });
    }

    // Sparse attribute usage (some faces with vt/vn, some without) leaves
    // ragged arrays; drop an attribute unless every vertex has it
    let n = mesh.vertex_count();
    if mesh.texcoords.len() != n * 2 {
        mesh.texcoords.clear();
    }
    if mesh.normals.len() != n * 3 {
        mesh.normals.clear();
    }

    tracing::info!(
        "loaded OBJ: {} vertices, {} triangles",
        mesh.vertex_count(),
        mesh.triangle_count()
    );

    let mut model = Model {
        transform: glam::Mat4::IDENTITY,
        meshes: vec![mesh],
        materials: Vec::new(),
        mesh_material: Vec::new(),
        bones: Vec::new(),
        bind_pose: Vec::new(),
    };
    finalize_model(&mut model);
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD_OBJ: &str = "\
# a unit quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_quad_fan_triangulation() {
        let model = model_from_obj(QUAD_OBJ.as_bytes()).unwrap();
        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.normals.len(), 12);
    }

    #[test]
    fn test_texcoord_v_is_flipped() {
        let model = model_from_obj(QUAD_OBJ.as_bytes()).unwrap();
        let mesh = &model.meshes[0];
        // vt 0 0 becomes (0, 1)
        assert_eq!(&mesh.texcoords[0..2], &[0.0, 1.0]);
        // vt 1 1 becomes (1, 0)
        assert_eq!(&mesh.texcoords[4..6], &[1.0, 0.0]);
    }

    #[test]
    fn test_negative_indices() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
f -3 -2 -1
";
        let model = model_from_obj(obj.as_bytes()).unwrap();
        assert_eq!(model.meshes[0].indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_default_material_installed() {
        let model = model_from_obj(QUAD_OBJ.as_bytes()).unwrap();
        assert_eq!(model.materials.len(), 1);
        assert_eq!(model.mesh_material, vec![0]);
    }

    #[test]
    fn test_positions_only_obj() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let model = model_from_obj(obj.as_bytes()).unwrap();
        let mesh = &model.meshes[0];
        assert!(mesh.texcoords.is_empty());
        assert!(mesh.normals.is_empty());
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn test_rejects_empty_and_malformed() {
        assert!(model_from_obj(b"# nothing here\n").is_err());
        assert!(model_from_obj(b"f 1 2 3\n").is_err()); // indices into nothing
        assert!(model_from_obj(b"v 0 0 0\nf 0 0 0\n").is_err()); // index 0
    }
}
