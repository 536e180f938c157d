//! IQM v2 (Inter-Quake Model) loading: meshes, skeleton and animations.
//!
//! # Layout (all fields little-endian u32 unless noted)
//! ```text
//! 0x00: magic "INTERQUAKEMODEL\0" (16 bytes)
//! 0x10: version (2)          0x14: filesize        0x18: flags
//! 0x1C: num_text/ofs_text    0x24: num_meshes/ofs_meshes
//! 0x2C: num_vertexarrays, num_vertexes, ofs_vertexarrays
//! 0x38: num_triangles, ofs_triangles, ofs_adjacency
//! 0x44: num_joints/ofs_joints        0x4C: num_poses/ofs_poses
//! 0x54: num_anims/ofs_anims
//! 0x5C: num_frames, num_framechannels, ofs_frames, ofs_bounds
//! 0x6C: num_comment/ofs_comment      0x74: num_extensions/ofs_extensions
//! ```
//!
//! Triangle winding in the file is reversed relative to CCW, so indices 0
//! and 2 swap on load. Blend weights are stored as bytes and dequantize to
//! `v / 255`. Animation frame data is a stream of u16 channel values gated
//! by each pose's 10-bit mask (3 translation, 4 rotation, 3 scale).

use glam::{Quat, Vec3};

use crate::error::{Error, Result};
use crate::math::Transform;
use crate::model::{finalize_model, BoneInfo, Mesh, Model, ModelAnimation};

const MAGIC: &[u8; 16] = b"INTERQUAKEMODEL\0";
const VERSION: u32 = 2;
const HEADER_SIZE: usize = 124;

const MESH_SIZE: usize = 24;
const TRIANGLE_SIZE: usize = 12;
const VERTEX_ARRAY_SIZE: usize = 20;
const JOINT_SIZE: usize = 48;
const POSE_SIZE: usize = 88;
const ANIM_SIZE: usize = 20;

// Vertex array types
const IQM_POSITION: u32 = 0;
const IQM_TEXCOORD: u32 = 1;
const IQM_NORMAL: u32 = 2;
const IQM_BLENDINDEXES: u32 = 4;
const IQM_BLENDWEIGHTS: u32 = 5;

#[derive(Debug, Clone, Copy)]
struct IqmHeader {
    num_text: u32,
    ofs_text: u32,
    num_meshes: u32,
    ofs_meshes: u32,
    num_vertexarrays: u32,
    num_vertexes: u32,
    ofs_vertexarrays: u32,
    num_triangles: u32,
    ofs_triangles: u32,
    num_joints: u32,
    ofs_joints: u32,
    num_poses: u32,
    ofs_poses: u32,
    num_anims: u32,
    ofs_anims: u32,
    num_frames: u32,
    num_framechannels: u32,
    ofs_frames: u32,
}

fn u32_at(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(Error::BadFormat {
            container: "IQM",
            reason: "offset past end of file",
        })
}

fn i32_at(bytes: &[u8], offset: usize) -> Result<i32> {
    Ok(u32_at(bytes, offset)? as i32)
}

fn f32_at(bytes: &[u8], offset: usize) -> Result<f32> {
    Ok(f32::from_bits(u32_at(bytes, offset)?))
}

fn u16_at(bytes: &[u8], offset: usize) -> Result<u16> {
    bytes
        .get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(Error::BadFormat {
            container: "IQM",
            reason: "offset past end of file",
        })
}

impl IqmHeader {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::BadFormat {
                container: "IQM",
                reason: "file shorter than the header",
            });
        }
        if &bytes[0..16] != MAGIC {
            return Err(Error::BadFormat {
                container: "IQM",
                reason: "missing INTERQUAKEMODEL magic",
            });
        }
        if u32_at(bytes, 0x10)? != VERSION {
            return Err(Error::BadFormat {
                container: "IQM",
                reason: "only IQM version 2 is supported",
            });
        }
        Ok(Self {
            num_text: u32_at(bytes, 0x1c)?,
            ofs_text: u32_at(bytes, 0x20)?,
            num_meshes: u32_at(bytes, 0x24)?,
            ofs_meshes: u32_at(bytes, 0x28)?,
            num_vertexarrays: u32_at(bytes, 0x2c)?,
            num_vertexes: u32_at(bytes, 0x30)?,
            ofs_vertexarrays: u32_at(bytes, 0x34)?,
            num_triangles: u32_at(bytes, 0x38)?,
            ofs_triangles: u32_at(bytes, 0x3c)?,
            num_joints: u32_at(bytes, 0x44)?,
            ofs_joints: u32_at(bytes, 0x48)?,
            num_poses: u32_at(bytes, 0x4c)?,
            ofs_poses: u32_at(bytes, 0x50)?,
            num_anims: u32_at(bytes, 0x54)?,
            ofs_anims: u32_at(bytes, 0x58)?,
            num_frames: u32_at(bytes, 0x5c)?,
            num_framechannels: u32_at(bytes, 0x60)?,
            ofs_frames: u32_at(bytes, 0x64)?,
        })
    }

    /// Null-terminated string at `offset` into the text section.
    fn text(&self, bytes: &[u8], offset: u32) -> String {
        if offset >= self.num_text {
            return String::new();
        }
        let start = (self.ofs_text + offset) as usize;
        let end = (self.ofs_text + self.num_text) as usize;
        let Some(section) = bytes.get(start..end.min(bytes.len())) else {
            return String::new();
        };
        let len = section.iter().position(|&b| b == 0).unwrap_or(section.len());
        String::from_utf8_lossy(&section[..len]).into_owned()
    }
}

/// Flat float attribute array covering all vertices in the file.
fn read_float_array(
    bytes: &[u8],
    offset: u32,
    total: usize,
    components: usize,
) -> Result<Vec<f32>> {
    let mut out = Vec::with_capacity(total * components);
    for i in 0..total * components {
        out.push(f32_at(bytes, offset as usize + i * 4)?);
    }
    Ok(out)
}

fn read_byte_array(bytes: &[u8], offset: u32, total: usize, components: usize) -> Result<Vec<u8>> {
    bytes
        .get(offset as usize..offset as usize + total * components)
        .map(|b| b.to_vec())
        .ok_or(Error::BadFormat {
            container: "IQM",
            reason: "vertex array past end of file",
        })
}

/// Joints composed over the parent chain into world-space bind transforms.
fn read_skeleton(bytes: &[u8], header: &IqmHeader) -> Result<(Vec<BoneInfo>, Vec<Transform>)> {
    let mut bones = Vec::with_capacity(header.num_joints as usize);
    let mut bind_pose: Vec<Transform> = Vec::with_capacity(header.num_joints as usize);

    for j in 0..header.num_joints as usize {
        let base = header.ofs_joints as usize + j * JOINT_SIZE;
        let name_offset = u32_at(bytes, base)?;
        let parent = i32_at(bytes, base + 4)?;

        let translation = Vec3::new(
            f32_at(bytes, base + 8)?,
            f32_at(bytes, base + 12)?,
            f32_at(bytes, base + 16)?,
        );
        let rotation = Quat::from_xyzw(
            f32_at(bytes, base + 20)?,
            f32_at(bytes, base + 24)?,
            f32_at(bytes, base + 28)?,
            f32_at(bytes, base + 32)?,
        )
        .normalize();
        let scale = Vec3::new(
            f32_at(bytes, base + 36)?,
            f32_at(bytes, base + 40)?,
            f32_at(bytes, base + 44)?,
        );

        bones.push(BoneInfo {
            name: header.text(bytes, name_offset),
            parent,
        });

        // Parents precede children in well-formed files, so the composed
        // parent transform is already available
        let local = Transform {
            translation,
            rotation,
            scale,
        };
        let world = match parent {
            p if p >= 0 && (p as usize) < bind_pose.len() => {
                compose(bind_pose[p as usize], local)
            }
            _ => local,
        };
        bind_pose.push(world);
    }
    Ok((bones, bind_pose))
}

/// Parent-chain composition: rotate the child translation into the parent
/// frame, multiply rotations and scales.
fn compose(parent: Transform, local: Transform) -> Transform {
    Transform {
        translation: parent.rotation * local.translation + parent.translation,
        rotation: parent.rotation * local.rotation,
        scale: parent.scale * local.scale,
    }
}

/// Load the meshes and skeleton of an IQM file.
pub fn model_from_iqm(bytes: &[u8]) -> Result<Model> {
    let header = IqmHeader::from_bytes(bytes)?;
    let total = header.num_vertexes as usize;

    // Gather the file-wide vertex arrays first
    let mut positions = Vec::new();
    let mut texcoords = Vec::new();
    let mut normals = Vec::new();
    let mut blend_indices = Vec::new();
    let mut blend_weights = Vec::new();

    for a in 0..header.num_vertexarrays as usize {
        let base = header.ofs_vertexarrays as usize + a * VERTEX_ARRAY_SIZE;
        let kind = u32_at(bytes, base)?;
        let offset = u32_at(bytes, base + 16)?;
        match kind {
            IQM_POSITION => positions = read_float_array(bytes, offset, total, 3)?,
            IQM_TEXCOORD => texcoords = read_float_array(bytes, offset, total, 2)?,
            IQM_NORMAL => normals = read_float_array(bytes, offset, total, 3)?,
            IQM_BLENDINDEXES => blend_indices = read_byte_array(bytes, offset, total, 4)?,
            IQM_BLENDWEIGHTS => blend_weights = read_byte_array(bytes, offset, total, 4)?,
            _ => {} // tangents, colors and custom arrays are not carried
        }
    }
    if positions.is_empty() && header.num_meshes > 0 {
        return Err(Error::BadFormat {
            container: "IQM",
            reason: "no position array",
        });
    }

    let mut meshes = Vec::with_capacity(header.num_meshes as usize);
    for m in 0..header.num_meshes as usize {
        let base = header.ofs_meshes as usize + m * MESH_SIZE;
        let first_vertex = u32_at(bytes, base + 8)? as usize;
        let num_vertexes = u32_at(bytes, base + 12)? as usize;
        let first_triangle = u32_at(bytes, base + 16)? as usize;
        let num_triangles = u32_at(bytes, base + 20)? as usize;

        if num_vertexes > u16::MAX as usize + 1 {
            return Err(Error::Unsupported("IQM mesh exceeds u16 indices".into()));
        }

        let range = |v: &Vec<f32>, comps: usize| -> Vec<f32> {
            if v.is_empty() {
                Vec::new()
            } else {
                v[first_vertex * comps..(first_vertex + num_vertexes) * comps].to_vec()
            }
        };

        let mut mesh = Mesh {
            positions: range(&positions, 3),
            texcoords: range(&texcoords, 2),
            normals: range(&normals, 3),
            ..Default::default()
        };
        if !blend_indices.is_empty() && !blend_weights.is_empty() {
            mesh.bone_ids =
                blend_indices[first_vertex * 4..(first_vertex + num_vertexes) * 4].to_vec();
            // Weights dequantize from bytes
            mesh.bone_weights = blend_weights
                [first_vertex * 4..(first_vertex + num_vertexes) * 4]
                .iter()
                .map(|&w| w as f32 / 255.0)
                .collect();
        }

        mesh.indices = Vec::with_capacity(num_triangles * 3);
        for t in 0..num_triangles {
            let tri = header.ofs_triangles as usize + (first_triangle + t) * TRIANGLE_SIZE;
            let v0 = u32_at(bytes, tri)? as usize;
            let v1 = u32_at(bytes, tri + 4)? as usize;
            let v2 = u32_at(bytes, tri + 8)? as usize;
            // File winding is reversed relative to CCW: swap corners 0 and 2
            for v in [v2, v1, v0] {
                let rebased = v.checked_sub(first_vertex).ok_or(Error::BadFormat {
                    container: "IQM",
                    reason: "triangle index before mesh base",
                })?;
                mesh.indices.push(rebased as u16);
            }
        }
        meshes.push(mesh);
    }

    let (bones, bind_pose) = read_skeleton(bytes, &header)?;

    tracing::info!(
        "loaded IQM: {} meshes, {} joints",
        meshes.len(),
        bones.len()
    );
    let mut model = Model {
        transform: glam::Mat4::IDENTITY,
        meshes,
        materials: Vec::new(),
        mesh_material: Vec::new(),
        bones,
        bind_pose,
    };
    finalize_model(&mut model);
    Ok(model)
}

/// Load every animation clip of an IQM file.
pub fn animations_from_iqm(bytes: &[u8]) -> Result<Vec<ModelAnimation>> {
    let header = IqmHeader::from_bytes(bytes)?;
    let num_poses = header.num_poses as usize;

    // Pose channel descriptors
    struct PoseDesc {
        parent: i32,
        mask: u32,
        offsets: [f32; 10],
        scales: [f32; 10],
    }
    let mut poses = Vec::with_capacity(num_poses);
    for p in 0..num_poses {
        let base = header.ofs_poses as usize + p * POSE_SIZE;
        let mut offsets = [0.0f32; 10];
        let mut scales = [0.0f32; 10];
        for c in 0..10 {
            offsets[c] = f32_at(bytes, base + 8 + c * 4)?;
            scales[c] = f32_at(bytes, base + 48 + c * 4)?;
        }
        poses.push(PoseDesc {
            parent: i32_at(bytes, base)?,
            mask: u32_at(bytes, base + 4)?,
            offsets,
            scales,
        });
    }

    // Bone names come from the joint table when present
    let bones: Vec<BoneInfo> = if header.num_joints as usize == num_poses {
        read_skeleton(bytes, &header)?.0
    } else {
        poses
            .iter()
            .map(|p| BoneInfo {
                name: String::new(),
                parent: p.parent,
            })
            .collect()
    };

    let mut animations = Vec::with_capacity(header.num_anims as usize);
    for a in 0..header.num_anims as usize {
        let base = header.ofs_anims as usize + a * ANIM_SIZE;
        let first_frame = u32_at(bytes, base + 4)? as usize;
        let num_frames = u32_at(bytes, base + 8)? as usize;

        let mut frame_poses = Vec::with_capacity(num_frames);
        for f in 0..num_frames {
            // The frame's channel stream starts at a fixed stride
            let mut counter =
                (first_frame + f) * header.num_framechannels as usize;
            let mut channel_value = |active: bool, offset: f32, scale: f32| -> Result<f32> {
                if !active {
                    return Ok(offset);
                }
                let raw = u16_at(
                    bytes,
                    header.ofs_frames as usize + counter * 2,
                )?;
                counter += 1;
                Ok(offset + raw as f32 * scale)
            };

            let mut pose_row: Vec<Transform> = Vec::with_capacity(num_poses);
            for desc in &poses {
                // Ten channels: 3 translation, 4 rotation (xyzw), 3 scale
                let mut ch = [0.0f32; 10];
                for (c, slot) in ch.iter_mut().enumerate() {
                    *slot = channel_value(
                        desc.mask & (1 << c) != 0,
                        desc.offsets[c],
                        desc.scales[c],
                    )?;
                }
                let local = Transform {
                    translation: Vec3::new(ch[0], ch[1], ch[2]),
                    rotation: Quat::from_xyzw(ch[3], ch[4], ch[5], ch[6]).normalize(),
                    scale: Vec3::new(ch[7], ch[8], ch[9]),
                };
                // Propagate through the parent chain like the bind pose
                let world = match desc.parent {
                    p if p >= 0 && (p as usize) < pose_row.len() => {
                        compose(pose_row[p as usize], local)
                    }
                    _ => local,
                };
                pose_row.push(world);
            }
            frame_poses.push(pose_row);
        }

        animations.push(ModelAnimation {
            bones: bones.clone(),
            frame_poses,
        });
    }

    tracing::info!("loaded {} IQM animations", animations.len());
    Ok(animations)
}
