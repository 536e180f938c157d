//! glTF 2.0 / GLB loading through the `gltf` crate.
//!
//! Accepted geometry: triangle primitives with float texcoords and indices
//! that fit in u16. Each primitive becomes one engine mesh. Buffers and
//! images resolve from the GLB blob, data URIs, or external files through
//! the IO capability.

use std::path::Path;

use crate::color::Color;
use crate::error::{Error, Result};
use crate::image::Image;
use crate::io::AssetIo;
use crate::model::{
    finalize_model, Material, MaterialMapKind, Mesh, Model,
};

fn decode_error(reason: String) -> Error {
    Error::Decode {
        library: "gltf",
        reason,
    }
}

/// Minimal base64 decoder for `data:` URIs (standard alphabet, `=` padding).
fn decode_base64(input: &str) -> Result<Vec<u8>> {
    fn value(c: u8) -> Option<u32> {
        match c {
            b'A'..=b'Z' => Some((c - b'A') as u32),
            b'a'..=b'z' => Some((c - b'a') as u32 + 26),
            b'0'..=b'9' => Some((c - b'0') as u32 + 52),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }

    let mut out = Vec::with_capacity(input.len() / 4 * 3);
    let mut acc = 0u32;
    let mut bits = 0u32;
    for &c in input.as_bytes() {
        if c == b'=' || c == b'\n' || c == b'\r' {
            continue;
        }
        let v = value(c).ok_or_else(|| decode_error("invalid base64 in data URI".into()))?;
        acc = (acc << 6) | v;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
    }
    Ok(out)
}

/// Resolve a buffer or image URI: inline base64 or a file next to the asset.
fn resolve_uri(uri: &str, io: &dyn AssetIo, base_dir: &Path) -> Result<Vec<u8>> {
    if let Some(data) = uri.strip_prefix("data:") {
        let payload = data
            .split_once(";base64,")
            .map(|(_, p)| p)
            .ok_or_else(|| decode_error("data URI without base64 payload".into()))?;
        return decode_base64(payload);
    }
    io.read_file(&base_dir.join(uri))
}

/// Decode one glTF image, whatever its source.
fn load_image(
    image: &gltf::Image,
    buffers: &[Vec<u8>],
    io: &dyn AssetIo,
    base_dir: &Path,
) -> Result<Image> {
    match image.source() {
        gltf::image::Source::View { view, .. } => {
            // Re-mux the buffer view into a contiguous blob, then decode
            let buffer = buffers
                .get(view.buffer().index())
                .ok_or_else(|| decode_error("image view references a missing buffer".into()))?;
            let start = view.offset();
            let end = start + view.length();
            let blob = buffer
                .get(start..end)
                .ok_or_else(|| decode_error("image view out of buffer bounds".into()))?;
            Image::from_memory(blob)
        }
        gltf::image::Source::Uri { uri, .. } => {
            let bytes = resolve_uri(uri, io, base_dir)?;
            Image::from_memory(&bytes)
        }
    }
}

fn texture_image(
    texture: gltf::texture::Texture,
    buffers: &[Vec<u8>],
    io: &dyn AssetIo,
    base_dir: &Path,
) -> Option<Image> {
    match load_image(&texture.source(), buffers, io, base_dir) {
        Ok(image) => Some(image),
        Err(e) => {
            tracing::warn!("failed to load glTF texture: {}", e);
            None
        }
    }
}

/// Map one glTF PBR metallic-roughness material onto the engine material.
fn convert_material(
    material: gltf::Material,
    buffers: &[Vec<u8>],
    io: &dyn AssetIo,
    base_dir: &Path,
) -> Material {
    let mut out = Material::default_white();
    let pbr = material.pbr_metallic_roughness();

    // Base-color factor tints the roughness slot; the base-color texture
    // lands in the albedo slot
    let f = pbr.base_color_factor();
    out.map_mut(MaterialMapKind::Roughness).color = Color::new(
        (f[0] * 255.0).round() as u8,
        (f[1] * 255.0).round() as u8,
        (f[2] * 255.0).round() as u8,
        (f[3] * 255.0).round() as u8,
    );
    if let Some(info) = pbr.base_color_texture() {
        out.map_mut(MaterialMapKind::Albedo).image =
            texture_image(info.texture(), buffers, io, base_dir);
    }

    out.map_mut(MaterialMapKind::Metalness).value = pbr.metallic_factor();
    out.map_mut(MaterialMapKind::Roughness).value = pbr.roughness_factor();
    if let Some(info) = pbr.metallic_roughness_texture() {
        out.map_mut(MaterialMapKind::Metalness).image =
            texture_image(info.texture(), buffers, io, base_dir);
    }

    if let Some(normal) = material.normal_texture() {
        out.map_mut(MaterialMapKind::Normal).image =
            texture_image(normal.texture(), buffers, io, base_dir);
    }
    if let Some(occlusion) = material.occlusion_texture() {
        out.map_mut(MaterialMapKind::Occlusion).image =
            texture_image(occlusion.texture(), buffers, io, base_dir);
    }
    if let Some(info) = material.emissive_texture() {
        out.map_mut(MaterialMapKind::Emission).image =
            texture_image(info.texture(), buffers, io, base_dir);
    }
    let e = material.emissive_factor();
    out.map_mut(MaterialMapKind::Emission).color = Color::rgb(
        (e[0] * 255.0).round() as u8,
        (e[1] * 255.0).round() as u8,
        (e[2] * 255.0).round() as u8,
    );

    out
}

/// Load a glTF or GLB asset held in memory. External buffers and images
/// resolve relative to `base_dir` through the IO capability.
pub fn model_from_gltf(bytes: &[u8], io: &dyn AssetIo, base_dir: &Path) -> Result<Model> {
    let gltf = gltf::Gltf::from_slice(bytes).map_err(|e| decode_error(e.to_string()))?;
    let document = gltf.document;
    let mut blob = gltf.blob;

    // Resolve every buffer up front
    let mut buffers: Vec<Vec<u8>> = Vec::new();
    for buffer in document.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => blob
                .take()
                .ok_or_else(|| decode_error("GLB declares a BIN buffer but has no blob".into()))?,
            gltf::buffer::Source::Uri(uri) => resolve_uri(uri, io, base_dir)?,
        };
        buffers.push(data);
    }

    // Materials in document order; one default slot appended last for
    // meshes without a material index
    let mut materials: Vec<Material> = document
        .materials()
        .map(|m| convert_material(m, &buffers, io, base_dir))
        .collect();
    let default_slot = materials.len();
    materials.push(Material::default_white());

    let mut meshes = Vec::new();
    let mut mesh_material = Vec::new();
    for gltf_mesh in document.meshes() {
        for primitive in gltf_mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                return Err(Error::Unsupported(format!(
                    "glTF primitive mode {:?}",
                    primitive.mode()
                )));
            }
            let reader = primitive.reader(|b| buffers.get(b.index()).map(Vec::as_slice));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .ok_or_else(|| decode_error("primitive without positions".into()))?
                .collect();

            let mut mesh = Mesh {
                positions: positions.iter().flatten().copied().collect(),
                ..Default::default()
            };
            if let Some(normals) = reader.read_normals() {
                mesh.normals = normals.flatten().collect();
            }
            if let Some(texcoords) = reader.read_tex_coords(0) {
                mesh.texcoords = texcoords.into_f32().flatten().collect();
            }
            if let Some(tangents) = reader.read_tangents() {
                mesh.tangents = tangents.flatten().collect();
            }
            if let Some(colors) = reader.read_colors(0) {
                mesh.colors = colors
                    .into_rgba_f32()
                    .flatten()
                    .map(|c| (c * 255.0).round() as u8)
                    .collect();
            }

            if let Some(indices) = reader.read_indices() {
                let wide: Vec<u32> = indices.into_u32().collect();
                if let Some(&too_big) = wide.iter().find(|&&v| v > u16::MAX as u32) {
                    return Err(Error::Unsupported(format!(
                        "glTF index {} does not fit in u16",
                        too_big
                    )));
                }
                mesh.indices = wide.into_iter().map(|v| v as u16).collect();
            }

            mesh_material.push(primitive.material().index().unwrap_or(default_slot));
            meshes.push(mesh);
        }
    }

    tracing::info!(
        "loaded glTF: {} meshes, {} materials",
        meshes.len(),
        materials.len()
    );
    let mut model = Model {
        transform: glam::Mat4::IDENTITY,
        meshes,
        materials,
        mesh_material,
        bones: Vec::new(),
        bind_pose: Vec::new(),
    };
    finalize_model(&mut model);
    Ok(model)
}
