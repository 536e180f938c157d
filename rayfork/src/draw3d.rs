//! 3D primitive and model drawing.

use std::f32::consts::PI;

use glam::{Mat4, Vec2, Vec3};
use rayfork_assets::{BoundingBox, Color, MaterialMapKind, Model, Ray, Rect};

use crate::camera::Camera3d;
use crate::context::Context;
use crate::device::DrawMode;
use crate::texture::Texture;

impl Context {
    pub fn draw_line3d(&mut self, start: Vec3, end: Vec3, color: Color) {
        self.reserve(2);
        self.device.begin(DrawMode::Lines);
        self.vertex_color(color);
        self.device.vertex3f(start.x, start.y, start.z);
        self.device.vertex3f(end.x, end.y, end.z);
        self.device.end();
    }

    pub fn draw_ray(&mut self, ray: Ray, color: Color) {
        let scale = 10000.0;
        self.draw_line3d(ray.position, ray.position + ray.direction * scale, color);
    }

    /// Solid cube centered at `position`.
    pub fn draw_cube(&mut self, position: Vec3, size: Vec3, color: Color) {
        let h = size * 0.5;
        // (normal, two in-plane tangents) per face
        let faces = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        ];

        self.reserve(36);
        self.device.push_matrix();
        self.device.translatef(position.x, position.y, position.z);
        self.device.begin(DrawMode::Triangles);
        self.vertex_color(color);
        for (normal, tan_u, tan_v) in faces {
            let center = normal * h;
            let u = tan_u * h;
            let v = tan_v * h;
            let corners = [center - u - v, center + u - v, center + u + v, center - u + v];
            self.device.normal3f(normal.x, normal.y, normal.z);
            for i in [0usize, 1, 2, 0, 2, 3] {
                let c = corners[i];
                self.device.vertex3f(c.x, c.y, c.z);
            }
        }
        self.device.end();
        self.device.pop_matrix();
    }

    /// Cube edges as lines.
    pub fn draw_cube_wires(&mut self, position: Vec3, size: Vec3, color: Color) {
        let h = size * 0.5;
        let corner = |x: f32, y: f32, z: f32| position + Vec3::new(x * h.x, y * h.y, z * h.z);

        self.reserve(24);
        self.device.begin(DrawMode::Lines);
        self.vertex_color(color);
        // Bottom square, top square, verticals
        let bottom = [
            corner(-1.0, -1.0, -1.0),
            corner(1.0, -1.0, -1.0),
            corner(1.0, -1.0, 1.0),
            corner(-1.0, -1.0, 1.0),
        ];
        let top = [
            corner(-1.0, 1.0, -1.0),
            corner(1.0, 1.0, -1.0),
            corner(1.0, 1.0, 1.0),
            corner(-1.0, 1.0, 1.0),
        ];
        for i in 0..4 {
            for (a, b) in [
                (bottom[i], bottom[(i + 1) % 4]),
                (top[i], top[(i + 1) % 4]),
                (bottom[i], top[i]),
            ] {
                self.device.vertex3f(a.x, a.y, a.z);
                self.device.vertex3f(b.x, b.y, b.z);
            }
        }
        self.device.end();
    }

    /// Textured cube, the full texture on each face.
    pub fn draw_cube_texture(
        &mut self,
        texture: &Texture,
        position: Vec3,
        size: Vec3,
        color: Color,
    ) {
        let h = size * 0.5;
        let faces = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        ];

        self.reserve(24);
        self.device.push_matrix();
        self.device.translatef(position.x, position.y, position.z);
        self.device.enable_texture(texture.id);
        self.device.begin(DrawMode::Quads);
        self.vertex_color(color);
        for (normal, tan_u, tan_v) in faces {
            let center = normal * h;
            let u = tan_u * h;
            let v = tan_v * h;
            self.device.normal3f(normal.x, normal.y, normal.z);
            self.device.tex_coord2f(0.0, 1.0);
            let c = center - u - v;
            self.device.vertex3f(c.x, c.y, c.z);
            self.device.tex_coord2f(1.0, 1.0);
            let c = center + u - v;
            self.device.vertex3f(c.x, c.y, c.z);
            self.device.tex_coord2f(1.0, 0.0);
            let c = center + u + v;
            self.device.vertex3f(c.x, c.y, c.z);
            self.device.tex_coord2f(0.0, 0.0);
            let c = center - u + v;
            self.device.vertex3f(c.x, c.y, c.z);
        }
        self.device.end();
        self.device.disable_texture();
        self.device.pop_matrix();
    }

    pub fn draw_sphere(&mut self, center: Vec3, radius: f32, color: Color) {
        self.draw_sphere_ex(center, radius, 16, 16, color);
    }

    /// Sphere as `rings x slices` of triangles.
    pub fn draw_sphere_ex(
        &mut self,
        center: Vec3,
        radius: f32,
        rings: u32,
        slices: u32,
        color: Color,
    ) {
        let rings = rings.max(2);
        let slices = slices.max(3);
        let point = |ring: u32, slice: u32| -> Vec3 {
            let phi = ring as f32 / rings as f32 * PI;
            let theta = slice as f32 / slices as f32 * 2.0 * PI;
            Vec3::new(
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            )
        };

        self.reserve((rings * slices * 6) as usize);
        self.device.push_matrix();
        self.device.translatef(center.x, center.y, center.z);
        self.device.scalef(radius, radius, radius);
        self.device.begin(DrawMode::Triangles);
        self.vertex_color(color);
        for ring in 0..rings {
            for slice in 0..slices {
                let p00 = point(ring, slice);
                let p10 = point(ring + 1, slice);
                let p01 = point(ring, slice + 1);
                let p11 = point(ring + 1, slice + 1);
                for p in [p00, p10, p11, p00, p11, p01] {
                    self.device.normal3f(p.x, p.y, p.z);
                    self.device.vertex3f(p.x, p.y, p.z);
                }
            }
        }
        self.device.end();
        self.device.pop_matrix();
    }

    pub fn draw_sphere_wires(
        &mut self,
        center: Vec3,
        radius: f32,
        rings: u32,
        slices: u32,
        color: Color,
    ) {
        let rings = rings.max(2);
        let slices = slices.max(3);
        let point = |ring: u32, slice: u32| -> Vec3 {
            let phi = ring as f32 / rings as f32 * PI;
            let theta = slice as f32 / slices as f32 * 2.0 * PI;
            center
                + radius
                    * Vec3::new(
                        phi.sin() * theta.cos(),
                        phi.cos(),
                        phi.sin() * theta.sin(),
                    )
        };

        self.reserve((rings * slices * 4) as usize);
        self.device.begin(DrawMode::Lines);
        self.vertex_color(color);
        for ring in 0..rings {
            for slice in 0..slices {
                let p00 = point(ring, slice);
                let p10 = point(ring + 1, slice);
                let p01 = point(ring, slice + 1);
                self.device.vertex3f(p00.x, p00.y, p00.z);
                self.device.vertex3f(p10.x, p10.y, p10.z);
                self.device.vertex3f(p00.x, p00.y, p00.z);
                self.device.vertex3f(p01.x, p01.y, p01.z);
            }
        }
        self.device.end();
    }

    /// Cylinder (or truncated cone) from `position` along +Y.
    pub fn draw_cylinder(
        &mut self,
        position: Vec3,
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        slices: u32,
        color: Color,
    ) {
        let slices = slices.max(3);
        let step = 2.0 * PI / slices as f32;

        self.reserve((slices * 12) as usize);
        self.device.push_matrix();
        self.device.translatef(position.x, position.y, position.z);
        self.device.begin(DrawMode::Triangles);
        self.vertex_color(color);
        for i in 0..slices {
            let a0 = i as f32 * step;
            let a1 = a0 + step;
            let b0 = Vec3::new(a0.cos() * radius_bottom, 0.0, a0.sin() * radius_bottom);
            let b1 = Vec3::new(a1.cos() * radius_bottom, 0.0, a1.sin() * radius_bottom);
            let t0 = Vec3::new(a0.cos() * radius_top, height, a0.sin() * radius_top);
            let t1 = Vec3::new(a1.cos() * radius_top, height, a1.sin() * radius_top);

            // Side wall
            for p in [b0, t0, t1, b0, t1, b1] {
                self.device.vertex3f(p.x, p.y, p.z);
            }
            // Caps
            if radius_top > 0.0 {
                self.device.vertex3f(0.0, height, 0.0);
                self.device.vertex3f(t0.x, t0.y, t0.z);
                self.device.vertex3f(t1.x, t1.y, t1.z);
            }
            if radius_bottom > 0.0 {
                self.device.vertex3f(0.0, 0.0, 0.0);
                self.device.vertex3f(b1.x, b1.y, b1.z);
                self.device.vertex3f(b0.x, b0.y, b0.z);
            }
        }
        self.device.end();
        self.device.pop_matrix();
    }

    pub fn draw_cylinder_wires(
        &mut self,
        position: Vec3,
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        slices: u32,
        color: Color,
    ) {
        let slices = slices.max(3);
        let step = 2.0 * PI / slices as f32;

        self.reserve((slices * 6) as usize);
        self.device.begin(DrawMode::Lines);
        self.vertex_color(color);
        for i in 0..slices {
            let a0 = i as f32 * step;
            let a1 = a0 + step;
            let b0 = position + Vec3::new(a0.cos() * radius_bottom, 0.0, a0.sin() * radius_bottom);
            let b1 = position + Vec3::new(a1.cos() * radius_bottom, 0.0, a1.sin() * radius_bottom);
            let t0 = position + Vec3::new(a0.cos() * radius_top, height, a0.sin() * radius_top);
            let t1 = position + Vec3::new(a1.cos() * radius_top, height, a1.sin() * radius_top);

            for (a, b) in [(b0, b1), (t0, t1), (b0, t0)] {
                self.device.vertex3f(a.x, a.y, a.z);
                self.device.vertex3f(b.x, b.y, b.z);
            }
        }
        self.device.end();
    }

    /// XZ plane quad centered at `center`, +Y normal.
    pub fn draw_plane(&mut self, center: Vec3, size: Vec2, color: Color) {
        self.reserve(4);
        self.device.push_matrix();
        self.device.translatef(center.x, center.y, center.z);
        self.device.scalef(size.x, 1.0, size.y);

        self.device.begin(DrawMode::Quads);
        self.vertex_color(color);
        self.device.normal3f(0.0, 1.0, 0.0);
        self.device.vertex3f(-0.5, 0.0, -0.5);
        self.device.vertex3f(-0.5, 0.0, 0.5);
        self.device.vertex3f(0.5, 0.0, 0.5);
        self.device.vertex3f(0.5, 0.0, -0.5);
        self.device.end();
        self.device.pop_matrix();
    }

    /// Grid of lines on the XZ plane around the origin.
    pub fn draw_grid(&mut self, slices: u32, spacing: f32) {
        let half = slices as f32 / 2.0;

        self.reserve(((slices + 1) * 4) as usize);
        self.device.begin(DrawMode::Lines);
        for i in 0..=slices {
            let offset = (i as f32 - half) * spacing;
            let shade = if i as f32 == half {
                Color::GRAY
            } else {
                Color::LIGHTGRAY
            };
            self.vertex_color(shade);
            self.device.vertex3f(offset, 0.0, -half * spacing);
            self.device.vertex3f(offset, 0.0, half * spacing);
            self.device.vertex3f(-half * spacing, 0.0, offset);
            self.device.vertex3f(half * spacing, 0.0, offset);
        }
        self.device.end();
    }

    pub fn draw_bounding_box(&mut self, bbox: BoundingBox, color: Color) {
        let center = (bbox.min + bbox.max) * 0.5;
        let size = bbox.max - bbox.min;
        self.draw_cube_wires(center, size, color);
    }

    /// Camera-facing quad built from the view matrix's right vector and
    /// world up.
    pub fn draw_billboard(
        &mut self,
        camera: &Camera3d,
        texture: &Texture,
        source: Rect,
        center: Vec3,
        size: f32,
        tint: Color,
    ) {
        let view = camera.view_matrix();
        // First row of the view matrix is the camera right vector
        let right = Vec3::new(view.x_axis.x, view.y_axis.x, view.z_axis.x);
        let up = Vec3::Y;

        let width = size * source.width.abs() / source.height.abs().max(1e-6);
        let half_r = right * width * 0.5;
        let half_u = up * size * 0.5;

        let (tw, th) = (texture.width as f32, texture.height as f32);
        let (u0, u1) = (source.x / tw, (source.x + source.width) / tw);
        let (v0, v1) = (source.y / th, (source.y + source.height) / th);

        self.reserve(4);
        self.device.enable_texture(texture.id);
        self.device.begin(DrawMode::Quads);
        self.device.color4ub(tint.r, tint.g, tint.b, tint.a);

        let p = center - half_r + half_u;
        self.device.tex_coord2f(u0, v0);
        self.device.vertex3f(p.x, p.y, p.z);
        let p = center - half_r - half_u;
        self.device.tex_coord2f(u0, v1);
        self.device.vertex3f(p.x, p.y, p.z);
        let p = center + half_r - half_u;
        self.device.tex_coord2f(u1, v1);
        self.device.vertex3f(p.x, p.y, p.z);
        let p = center + half_r + half_u;
        self.device.tex_coord2f(u1, v0);
        self.device.vertex3f(p.x, p.y, p.z);

        self.device.end();
        self.device.disable_texture();
    }

    pub fn draw_model(&mut self, model: &mut Model, position: Vec3, scale: f32, tint: Color) {
        self.draw_model_ex(model, position, Vec3::Y, 0.0, Vec3::splat(scale), tint);
    }

    /// Draw all meshes of a model. The tint multiplies into each
    /// material's albedo color for the duration of the draw.
    pub fn draw_model_ex(
        &mut self,
        model: &mut Model,
        position: Vec3,
        rotation_axis: Vec3,
        rotation_angle_deg: f32,
        scale: Vec3,
        tint: Color,
    ) {
        let transform = Mat4::from_translation(position)
            * Mat4::from_axis_angle(
                rotation_axis.normalize_or_zero(),
                rotation_angle_deg.to_radians(),
            )
            * Mat4::from_scale(scale)
            * model.transform;

        for (mesh, &slot) in model.meshes.iter().zip(&model.mesh_material) {
            let material = &mut model.materials[slot];
            let albedo = material.map(MaterialMapKind::Albedo).color;
            let tinted = Color {
                r: ((albedo.r as u16 * tint.r as u16) / 255) as u8,
                g: ((albedo.g as u16 * tint.g as u16) / 255) as u8,
                b: ((albedo.b as u16 * tint.b as u16) / 255) as u8,
                a: ((albedo.a as u16 * tint.a as u16) / 255) as u8,
            };
            material.map_mut(MaterialMapKind::Albedo).color = tinted;
            self.device.draw_mesh(mesh, material, transform);
            material.map_mut(MaterialMapKind::Albedo).color = albedo;
        }
    }
}
