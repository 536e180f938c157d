//! Meshes, materials, models and skeletal animation.
//!
//! Meshes keep the struct-of-arrays layout GPU upload wants: flat attribute
//! vectors that are either empty or exactly `vertex_count` entries long.

mod gen;
mod gltf;
mod iqm;
mod obj;

pub use gen::{
    gen_cube, gen_cubicmap, gen_cylinder, gen_heightmap, gen_hemisphere, gen_knot, gen_plane,
    gen_polygon, gen_sphere, gen_torus,
};
pub use gltf::model_from_gltf;
pub use iqm::{animations_from_iqm, model_from_iqm};
pub use obj::model_from_obj;

use glam::{Mat4, Vec3};

use crate::color::Color;
use crate::error::{Error, Result};
use crate::image::Image;
use crate::math::{ray_triangle, Ray, RayHit, Transform};

/// CPU-side mesh. Attribute vectors are either empty or hold exactly
/// `vertex_count` entries (x3 floats for positions/normals, x2 for
/// texcoords, x4 for tangents/colors/skinning).
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub positions: Vec<f32>,
    pub texcoords: Vec<f32>,
    pub texcoords2: Vec<f32>,
    pub normals: Vec<f32>,
    pub tangents: Vec<f32>,
    pub colors: Vec<u8>,
    pub indices: Vec<u16>,

    // Skinning; when present, fully populated
    pub bone_ids: Vec<u8>,
    pub bone_weights: Vec<f32>,
    pub anim_positions: Vec<f32>,
    pub anim_normals: Vec<f32>,

    // Opaque GPU handles, zero until uploaded. Buffer slots in order:
    // positions, texcoords, normals, colors, tangents, texcoords2, indices
    pub vao_id: u32,
    pub vbo_ids: [u32; 7],
}

impl Mesh {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        if self.indices.is_empty() {
            self.vertex_count() / 3
        } else {
            self.indices.len() / 3
        }
    }

    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::new(
            self.positions[index * 3],
            self.positions[index * 3 + 1],
            self.positions[index * 3 + 2],
        )
    }

    /// Axis-aligned bounds of the positions.
    pub fn bounding_box(&self) -> crate::math::BoundingBox {
        crate::math::BoundingBox::from_points(
            (0..self.vertex_count()).map(|i| self.position(i)),
        )
    }

    /// Triangle corner indices, honoring the index buffer when present.
    fn triangle(&self, t: usize) -> (usize, usize, usize) {
        if self.indices.is_empty() {
            (t * 3, t * 3 + 1, t * 3 + 2)
        } else {
            (
                self.indices[t * 3] as usize,
                self.indices[t * 3 + 1] as usize,
                self.indices[t * 3 + 2] as usize,
            )
        }
    }
}

/// Material map slots, PBR metallic-roughness naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum MaterialMapKind {
    Albedo = 0,
    Metalness,
    Normal,
    Roughness,
    Occlusion,
    Emission,
    Height,
    Cubemap,
    Irradiance,
    Prefilter,
    Brdf,
}

pub const MAX_MATERIAL_MAPS: usize = 11;

/// One material slot: an optional CPU-side image (uploaded later), the
/// opaque texture handle once uploaded, a color factor and a scalar value.
#[derive(Debug, Clone, Default)]
pub struct MaterialMap {
    pub image: Option<Image>,
    pub texture_id: u32,
    pub color: Color,
    pub value: f32,
}

#[derive(Debug, Clone)]
pub struct Material {
    pub shader_id: u32,
    pub maps: [MaterialMap; MAX_MATERIAL_MAPS],
}

impl Material {
    /// Plain white material used when a loader produced none.
    pub fn default_white() -> Self {
        let mut maps: [MaterialMap; MAX_MATERIAL_MAPS] = Default::default();
        maps[MaterialMapKind::Albedo as usize].color = Color::WHITE;
        maps[MaterialMapKind::Metalness as usize].value = 0.0;
        maps[MaterialMapKind::Roughness as usize].value = 1.0;
        Self { shader_id: 0, maps }
    }

    #[inline]
    pub fn map(&self, kind: MaterialMapKind) -> &MaterialMap {
        &self.maps[kind as usize]
    }

    #[inline]
    pub fn map_mut(&mut self, kind: MaterialMapKind) -> &mut MaterialMap {
        &mut self.maps[kind as usize]
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::default_white()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoneInfo {
    pub name: String,
    pub parent: i32,
}

#[derive(Debug, Clone)]
pub struct Model {
    pub transform: Mat4,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    /// Per-mesh index into `materials`.
    pub mesh_material: Vec<usize>,
    pub bones: Vec<BoneInfo>,
    pub bind_pose: Vec<Transform>,
}

impl Model {
    /// Wrap a single mesh with the default material.
    pub fn from_mesh(mesh: Mesh) -> Self {
        let mut model = Self {
            transform: Mat4::IDENTITY,
            meshes: vec![mesh],
            materials: Vec::new(),
            mesh_material: Vec::new(),
            bones: Vec::new(),
            bind_pose: Vec::new(),
        };
        finalize_model(&mut model);
        model
    }
}

/// Skeletal animation clip. `frame_poses[frame][bone]` is a world-space
/// pose; compatibility with a model means identical bone count and parents.
#[derive(Debug, Clone)]
pub struct ModelAnimation {
    pub bones: Vec<BoneInfo>,
    pub frame_poses: Vec<Vec<Transform>>,
}

impl ModelAnimation {
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_poses.len()
    }

    /// Same skeleton shape: bone count and parent indices match.
    pub fn compatible_with(&self, model: &Model) -> bool {
        self.bones.len() == model.bones.len()
            && self
                .bones
                .iter()
                .zip(&model.bones)
                .all(|(a, b)| a.parent == b.parent)
    }
}

/// Post-load invariants, applied after every model loader:
/// no meshes -> unit cube; no materials -> default white with all meshes
/// pointing at it; transform reset to identity.
pub fn finalize_model(model: &mut Model) {
    if model.meshes.is_empty() {
        tracing::warn!("model has no meshes, installing a unit cube");
        model.meshes.push(gen_cube(Vec3::ONE));
    }
    if model.materials.is_empty() {
        model.materials.push(Material::default_white());
        model.mesh_material = vec![0; model.meshes.len()];
    }
    if model.mesh_material.len() != model.meshes.len() {
        model.mesh_material.resize(model.meshes.len(), 0);
    }
    for slot in &mut model.mesh_material {
        if *slot >= model.materials.len() {
            *slot = model.materials.len() - 1;
        }
    }
    model.transform = Mat4::IDENTITY;
}

/// Evaluate one animation frame onto the model's `anim_*` buffers.
///
/// The frame index wraps modulo the clip length. Each vertex follows its
/// first bone (four are stored; this contract uses only bone 0):
/// `p' = rot_delta * (p * out.scale - in.t) + out.t` where
/// `rot_delta = out.rot * in.rot⁻¹`.
pub fn update_model_animation(
    model: &mut Model,
    anim: &ModelAnimation,
    frame: u32,
) -> Result<()> {
    if !anim.compatible_with(model) {
        return Err(Error::BadArgument("animation does not match the model skeleton"));
    }
    if anim.frame_count() == 0 {
        return Err(Error::BadArgument("animation has no frames"));
    }
    let frame = frame as usize % anim.frame_count();
    let poses = &anim.frame_poses[frame];

    for mesh in &mut model.meshes {
        if mesh.bone_ids.is_empty() {
            continue;
        }
        let n = mesh.vertex_count();
        if mesh.anim_positions.len() != n * 3 {
            mesh.anim_positions = vec![0.0; n * 3];
        }
        if mesh.anim_normals.len() != mesh.normals.len() {
            mesh.anim_normals = vec![0.0; mesh.normals.len()];
        }

        for v in 0..n {
            let bone = mesh.bone_ids[v * 4] as usize;
            if bone >= model.bind_pose.len() {
                continue;
            }
            let pose_in = model.bind_pose[bone];
            let pose_out = poses[bone];
            let rot_delta = pose_out.rotation * pose_in.rotation.inverse();

            let p = Vec3::new(
                mesh.positions[v * 3],
                mesh.positions[v * 3 + 1],
                mesh.positions[v * 3 + 2],
            );
            let animated =
                rot_delta * (p * pose_out.scale - pose_in.translation) + pose_out.translation;
            mesh.anim_positions[v * 3] = animated.x;
            mesh.anim_positions[v * 3 + 1] = animated.y;
            mesh.anim_positions[v * 3 + 2] = animated.z;

            if !mesh.normals.is_empty() {
                let nrm = Vec3::new(
                    mesh.normals[v * 3],
                    mesh.normals[v * 3 + 1],
                    mesh.normals[v * 3 + 2],
                );
                let rotated = rot_delta * nrm;
                mesh.anim_normals[v * 3] = rotated.x;
                mesh.anim_normals[v * 3 + 1] = rotated.y;
                mesh.anim_normals[v * 3 + 2] = rotated.z;
            }
        }
    }
    Ok(())
}

/// Nearest ray hit against a mesh's triangles, transformed by `transform`.
pub fn ray_mesh(ray: Ray, mesh: &Mesh, transform: Mat4) -> Option<RayHit> {
    let mut nearest: Option<RayHit> = None;
    for t in 0..mesh.triangle_count() {
        let (a, b, c) = mesh.triangle(t);
        let v0 = transform.transform_point3(mesh.position(a));
        let v1 = transform.transform_point3(mesh.position(b));
        let v2 = transform.transform_point3(mesh.position(c));
        if let Some(hit) = ray_triangle(ray, v0, v1, v2) {
            if nearest.is_none_or(|n| hit.distance < n.distance) {
                nearest = Some(hit);
            }
        }
    }
    nearest
}

/// Nearest ray hit across all meshes of a model.
pub fn ray_model(ray: Ray, model: &Model) -> Option<RayHit> {
    let mut nearest: Option<RayHit> = None;
    for mesh in &model.meshes {
        if let Some(hit) = ray_mesh(ray, mesh, model.transform) {
            if nearest.is_none_or(|n| hit.distance < n.distance) {
                nearest = Some(hit);
            }
        }
    }
    nearest
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_finalize_empty_model_installs_cube() {
        let mut model = Model {
            transform: Mat4::from_translation(Vec3::ONE),
            meshes: Vec::new(),
            materials: Vec::new(),
            mesh_material: Vec::new(),
            bones: Vec::new(),
            bind_pose: Vec::new(),
        };
        finalize_model(&mut model);

        assert_eq!(model.meshes.len(), 1);
        assert!(model.meshes[0].vertex_count() > 0);
        assert_eq!(model.materials.len(), 1);
        assert_eq!(model.mesh_material, vec![0]);
        assert_eq!(model.transform, Mat4::IDENTITY);
        assert_eq!(
            model.materials[0].map(MaterialMapKind::Albedo).color,
            Color::WHITE
        );
    }

    #[test]
    fn test_animation_compatibility() {
        let model = Model {
            transform: Mat4::IDENTITY,
            meshes: Vec::new(),
            materials: Vec::new(),
            mesh_material: Vec::new(),
            bones: vec![
                BoneInfo { name: "root".into(), parent: -1 },
                BoneInfo { name: "arm".into(), parent: 0 },
            ],
            bind_pose: vec![Transform::IDENTITY; 2],
        };

        let good = ModelAnimation {
            bones: vec![
                BoneInfo { name: "a".into(), parent: -1 },
                BoneInfo { name: "b".into(), parent: 0 },
            ],
            frame_poses: vec![vec![Transform::IDENTITY; 2]],
        };
        assert!(good.compatible_with(&model));

        let bad = ModelAnimation {
            bones: vec![BoneInfo { name: "a".into(), parent: -1 }],
            frame_poses: vec![vec![Transform::IDENTITY]],
        };
        assert!(!bad.compatible_with(&model));
    }

    fn skinned_test_model() -> Model {
        let mut mesh = gen_cube(Vec3::ONE);
        let n = mesh.vertex_count();
        mesh.bone_ids = vec![0; n * 4];
        mesh.bone_weights = {
            let mut w = vec![0.0; n * 4];
            for v in 0..n {
                w[v * 4] = 1.0;
            }
            w
        };
        let mut model = Model::from_mesh(mesh);
        model.bones = vec![BoneInfo { name: "root".into(), parent: -1 }];
        model.bind_pose = vec![Transform::IDENTITY];
        model
    }

    #[test]
    fn test_update_animation_identity_pose_is_noop() {
        let mut model = skinned_test_model();
        let anim = ModelAnimation {
            bones: model.bones.clone(),
            frame_poses: vec![vec![Transform::IDENTITY]],
        };
        update_model_animation(&mut model, &anim, 0).unwrap();
        assert_eq!(model.meshes[0].anim_positions, model.meshes[0].positions);
    }

    #[test]
    fn test_update_animation_translates_vertices() {
        let mut model = skinned_test_model();
        let anim = ModelAnimation {
            bones: model.bones.clone(),
            frame_poses: vec![vec![Transform {
                translation: Vec3::new(0.0, 2.0, 0.0),
                rotation: Quat::IDENTITY,
                scale: Vec3::ONE,
            }]],
        };
        update_model_animation(&mut model, &anim, 0).unwrap();
        let mesh = &model.meshes[0];
        for v in 0..mesh.vertex_count() {
            assert_eq!(mesh.anim_positions[v * 3 + 1], mesh.positions[v * 3 + 1] + 2.0);
        }
    }

    #[test]
    fn test_update_animation_wraps_frame_index() {
        let mut model = skinned_test_model();
        let anim = ModelAnimation {
            bones: model.bones.clone(),
            frame_poses: vec![vec![Transform::IDENTITY]; 4],
        };
        // Frame 6 wraps to 2 rather than erroring
        update_model_animation(&mut model, &anim, 6).unwrap();
    }

    #[test]
    fn test_update_animation_rejects_mismatched_skeleton() {
        let mut model = skinned_test_model();
        let anim = ModelAnimation {
            bones: Vec::new(),
            frame_poses: vec![Vec::new()],
        };
        assert!(update_model_animation(&mut model, &anim, 0).is_err());
    }

    #[test]
    fn test_ray_model_hits_cube() {
        let model = Model::from_mesh(gen_cube(Vec3::ONE));
        let ray = Ray {
            position: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
        };
        let hit = ray_model(ray, &model).unwrap();
        assert!((hit.distance - 4.5).abs() < 1e-5, "cube face at z=0.5");

        let miss = Ray {
            position: Vec3::new(10.0, 0.0, 5.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
        };
        assert!(ray_model(miss, &model).is_none());
    }
}
