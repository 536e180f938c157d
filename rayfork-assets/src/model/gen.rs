//! Procedural mesh generation.
//!
//! All generators produce indexed meshes with positions, normals and UVs,
//! CCW winding for outward-facing normals.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::color::Color;
use crate::image::Image;
use crate::model::Mesh;

#[derive(Default)]
struct MeshBuilder {
    positions: Vec<f32>,
    normals: Vec<f32>,
    texcoords: Vec<f32>,
    indices: Vec<u16>,
}

impl MeshBuilder {
    fn vertex(&mut self, p: Vec3, n: Vec3, uv: Vec2) -> u16 {
        let index = (self.positions.len() / 3) as u16;
        self.positions.extend_from_slice(&[p.x, p.y, p.z]);
        self.normals.extend_from_slice(&[n.x, n.y, n.z]);
        self.texcoords.extend_from_slice(&[uv.x, uv.y]);
        index
    }

    fn triangle(&mut self, a: u16, b: u16, c: u16) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Two triangles `a b c` and `a c d`.
    fn quad(&mut self, a: u16, b: u16, c: u16, d: u16) {
        self.triangle(a, b, c);
        self.triangle(a, c, d);
    }

    fn build(self) -> Mesh {
        Mesh {
            positions: self.positions,
            normals: self.normals,
            texcoords: self.texcoords,
            indices: self.indices,
            ..Default::default()
        }
    }
}

/// Axis-aligned cube centered at the origin. 24 vertices (4 per face) with
/// flat normals and per-face UVs.
pub fn gen_cube(size: Vec3) -> Mesh {
    let h = size * 0.5;
    let mut b = MeshBuilder::default();

    // (normal, two in-plane tangents) per face
    let faces = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    ];
    for (normal, tan_u, tan_v) in faces {
        let center = normal * h;
        let u = tan_u * h;
        let v = tan_v * h;
        let i0 = b.vertex(center - u - v, normal, Vec2::new(0.0, 1.0));
        let i1 = b.vertex(center + u - v, normal, Vec2::new(1.0, 1.0));
        let i2 = b.vertex(center + u + v, normal, Vec2::new(1.0, 0.0));
        let i3 = b.vertex(center - u + v, normal, Vec2::new(0.0, 0.0));
        b.quad(i0, i1, i2, i3);
    }
    b.build()
}

/// Flat XZ plane centered at the origin, +Y normal.
pub fn gen_plane(width: f32, depth: f32, subdivisions_x: u32, subdivisions_z: u32) -> Mesh {
    let sub_x = subdivisions_x.clamp(1, 256);
    let sub_z = subdivisions_z.clamp(1, 256);
    let mut b = MeshBuilder::default();

    for z in 0..=sub_z {
        for x in 0..=sub_x {
            let u = x as f32 / sub_x as f32;
            let v = z as f32 / sub_z as f32;
            b.vertex(
                Vec3::new((u - 0.5) * width, 0.0, (v - 0.5) * depth),
                Vec3::Y,
                Vec2::new(u, v),
            );
        }
    }
    for z in 0..sub_z {
        for x in 0..sub_x {
            let i0 = (z * (sub_x + 1) + x) as u16;
            let i1 = i0 + 1;
            let i2 = ((z + 1) * (sub_x + 1) + x) as u16;
            let i3 = i2 + 1;
            b.triangle(i0, i2, i1);
            b.triangle(i1, i2, i3);
        }
    }
    b.build()
}

/// UV sphere with smooth normals and equirectangular mapping. A duplicate
/// seam column at U=1 keeps texture wrapping correct.
pub fn gen_sphere(radius: f32, rings: u32, slices: u32) -> Mesh {
    gen_sphere_arc(radius, rings, slices, PI)
}

/// Top half of a UV sphere.
pub fn gen_hemisphere(radius: f32, rings: u32, slices: u32) -> Mesh {
    gen_sphere_arc(radius, rings, slices, PI / 2.0)
}

fn gen_sphere_arc(radius: f32, rings: u32, slices: u32, max_phi: f32) -> Mesh {
    let radius = radius.max(1e-3);
    let rings = rings.clamp(2, 256);
    let slices = slices.clamp(3, 256);
    let mut b = MeshBuilder::default();

    for ring in 0..=rings {
        let phi = (ring as f32 / rings as f32) * max_phi;
        let y = radius * phi.cos();
        let ring_radius = radius * phi.sin();
        for slice in 0..=slices {
            let theta = (slice as f32 / slices as f32) * 2.0 * PI;
            let p = Vec3::new(
                ring_radius * theta.cos(),
                y,
                ring_radius * theta.sin(),
            );
            b.vertex(
                p,
                p.normalize_or_zero(),
                Vec2::new(
                    slice as f32 / slices as f32,
                    ring as f32 / rings as f32,
                ),
            );
        }
    }

    let verts_per_ring = slices + 1;
    for ring in 0..rings {
        for slice in 0..slices {
            let i0 = (ring * verts_per_ring + slice) as u16;
            let i1 = i0 + 1;
            let i2 = ((ring + 1) * verts_per_ring + slice) as u16;
            let i3 = i2 + 1;
            b.triangle(i0, i1, i3);
            b.triangle(i0, i3, i2);
        }
    }
    b.build()
}

/// Closed cylinder along Y, base at y=0.
pub fn gen_cylinder(radius: f32, height: f32, slices: u32) -> Mesh {
    let slices = slices.clamp(3, 256);
    let mut b = MeshBuilder::default();

    // Side wall, duplicate seam column
    for slice in 0..=slices {
        let theta = (slice as f32 / slices as f32) * 2.0 * PI;
        let normal = Vec3::new(theta.cos(), 0.0, theta.sin());
        let u = slice as f32 / slices as f32;
        b.vertex(normal * radius, normal, Vec2::new(u, 1.0));
        b.vertex(normal * radius + Vec3::Y * height, normal, Vec2::new(u, 0.0));
    }
    for slice in 0..slices {
        let i0 = (slice * 2) as u16;
        let i1 = i0 + 1;
        let i2 = i0 + 2;
        let i3 = i0 + 3;
        b.triangle(i0, i1, i3);
        b.triangle(i0, i3, i2);
    }

    // Caps: center fan
    for (y, normal) in [(height, Vec3::Y), (0.0, Vec3::NEG_Y)] {
        let center = b.vertex(Vec3::new(0.0, y, 0.0), normal, Vec2::new(0.5, 0.5));
        let first = center + 1;
        for slice in 0..=slices {
            let theta = (slice as f32 / slices as f32) * 2.0 * PI;
            b.vertex(
                Vec3::new(theta.cos() * radius, y, theta.sin() * radius),
                normal,
                Vec2::new(0.5 + theta.cos() * 0.5, 0.5 + theta.sin() * 0.5),
            );
        }
        for slice in 0..slices {
            let a = first + slice as u16;
            let c = first + slice as u16 + 1;
            if normal.y > 0.0 {
                b.triangle(center, c, a);
            } else {
                b.triangle(center, a, c);
            }
        }
    }
    b.build()
}

/// Torus around the Y axis. `radius` is the ring radius, `size` the tube
/// radius.
pub fn gen_torus(radius: f32, size: f32, rad_segments: u32, sides: u32) -> Mesh {
    let rad_segments = rad_segments.clamp(3, 256);
    let sides = sides.clamp(3, 256);
    let mut b = MeshBuilder::default();

    for seg in 0..=rad_segments {
        let theta = (seg as f32 / rad_segments as f32) * 2.0 * PI;
        let ring_center = Vec3::new(theta.cos() * radius, 0.0, theta.sin() * radius);
        let ring_dir = Vec3::new(theta.cos(), 0.0, theta.sin());
        for side in 0..=sides {
            let phi = (side as f32 / sides as f32) * 2.0 * PI;
            let normal = ring_dir * phi.cos() + Vec3::Y * phi.sin();
            b.vertex(
                ring_center + normal * size,
                normal,
                Vec2::new(
                    seg as f32 / rad_segments as f32,
                    side as f32 / sides as f32,
                ),
            );
        }
    }
    let verts_per_seg = sides + 1;
    for seg in 0..rad_segments {
        for side in 0..sides {
            let i0 = (seg * verts_per_seg + side) as u16;
            let i1 = i0 + 1;
            let i2 = ((seg + 1) * verts_per_seg + side) as u16;
            let i3 = i2 + 1;
            b.triangle(i0, i2, i1);
            b.triangle(i1, i2, i3);
        }
    }
    b.build()
}

/// Trefoil knot swept with a circular tube.
pub fn gen_knot(radius: f32, size: f32, rad_segments: u32, sides: u32) -> Mesh {
    let rad_segments = rad_segments.clamp(3, 512);
    let sides = sides.clamp(3, 256);
    let mut b = MeshBuilder::default();

    let curve = |t: f32| -> Vec3 {
        Vec3::new(
            (t.sin() + 2.0 * (2.0 * t).sin()) * 0.5,
            (t.cos() - 2.0 * (2.0 * t).cos()) * 0.5,
            -(3.0 * t).sin() * 0.5,
        ) * radius
    };

    for seg in 0..=rad_segments {
        let t = (seg as f32 / rad_segments as f32) * 2.0 * PI;
        let center = curve(t);
        // Frame from the curve tangent and an orthogonalized reference
        let tangent = (curve(t + 0.01) - center).normalize_or_zero();
        let reference = if tangent.dot(Vec3::Y).abs() < 0.99 {
            Vec3::Y
        } else {
            Vec3::X
        };
        let side_a = tangent.cross(reference).normalize_or_zero();
        let side_b = tangent.cross(side_a);

        for side in 0..=sides {
            let phi = (side as f32 / sides as f32) * 2.0 * PI;
            let normal = side_a * phi.cos() + side_b * phi.sin();
            b.vertex(
                center + normal * size,
                normal,
                Vec2::new(
                    seg as f32 / rad_segments as f32,
                    side as f32 / sides as f32,
                ),
            );
        }
    }
    let verts_per_seg = sides + 1;
    for seg in 0..rad_segments {
        for side in 0..sides {
            let i0 = (seg * verts_per_seg + side) as u16;
            let i1 = i0 + 1;
            let i2 = ((seg + 1) * verts_per_seg + side) as u16;
            let i3 = i2 + 1;
            b.triangle(i0, i2, i1);
            b.triangle(i1, i2, i3);
        }
    }
    b.build()
}

/// Regular n-gon fan on the XZ plane, +Y normal.
pub fn gen_polygon(sides: u32, radius: f32) -> Mesh {
    let sides = sides.clamp(3, 256);
    let mut b = MeshBuilder::default();

    let center = b.vertex(Vec3::ZERO, Vec3::Y, Vec2::new(0.5, 0.5));
    for i in 0..=sides {
        let theta = (i as f32 / sides as f32) * 2.0 * PI;
        b.vertex(
            Vec3::new(theta.cos() * radius, 0.0, theta.sin() * radius),
            Vec3::Y,
            Vec2::new(0.5 + theta.cos() * 0.5, 0.5 + theta.sin() * 0.5),
        );
    }
    for i in 0..sides {
        b.triangle(center, center + 1 + i as u16 + 1, center + 1 + i as u16);
    }
    b.build()
}

/// Heightmap mesh: one vertex per pixel, height from luminance scaled to
/// `size.y`, grid spanning `size.x` by `size.z`. Normals from central
/// differences.
pub fn gen_heightmap(image: &Image, size: Vec3) -> crate::error::Result<Mesh> {
    let pixels = image.to_colors()?;
    let (w, h) = (image.width as usize, image.height as usize);
    if w < 2 || h < 2 {
        return Err(crate::error::Error::BadArgument(
            "heightmap image must be at least 2x2",
        ));
    }

    let height_at = |x: usize, z: usize| -> f32 {
        pixels[z * w + x].luminance() as f32 / 255.0 * size.y
    };

    let mut b = MeshBuilder::default();
    for z in 0..h {
        for x in 0..w {
            let fx = x as f32 / (w - 1) as f32;
            let fz = z as f32 / (h - 1) as f32;

            // Central differences, clamped at the borders
            let xl = height_at(x.saturating_sub(1), z);
            let xr = height_at((x + 1).min(w - 1), z);
            let zd = height_at(x, z.saturating_sub(1));
            let zu = height_at(x, (z + 1).min(h - 1));
            let normal = Vec3::new(xl - xr, 2.0 * size.x / (w - 1) as f32, zd - zu)
                .normalize_or_zero();

            b.vertex(
                Vec3::new(
                    (fx - 0.5) * size.x,
                    height_at(x, z),
                    (fz - 0.5) * size.z,
                ),
                normal,
                Vec2::new(fx, fz),
            );
        }
    }
    for z in 0..h - 1 {
        for x in 0..w - 1 {
            let i0 = (z * w + x) as u16;
            let i1 = i0 + 1;
            let i2 = ((z + 1) * w + x) as u16;
            let i3 = i2 + 1;
            b.triangle(i0, i2, i1);
            b.triangle(i1, i2, i3);
        }
    }
    Ok(b.build())
}

/// Voxel walls from a black/white map: white pixels are solid cells; faces
/// are emitted only where a solid cell borders an empty one, plus floors
/// and ceilings.
pub fn gen_cubicmap(image: &Image, cube_size: Vec3) -> crate::error::Result<Mesh> {
    let pixels = image.to_colors()?;
    let (w, h) = (image.width as i32, image.height as i32);
    let solid = |x: i32, z: i32| -> bool {
        if x < 0 || z < 0 || x >= w || z >= h {
            return false;
        }
        pixels[(z * w + x) as usize].luminance() > 127
    };

    let mut b = MeshBuilder::default();
    let mut emit_face = |center: Vec3, normal: Vec3, tan_u: Vec3, tan_v: Vec3| {
        let i0 = b.vertex(center - tan_u - tan_v, normal, Vec2::new(0.0, 1.0));
        let i1 = b.vertex(center + tan_u - tan_v, normal, Vec2::new(1.0, 1.0));
        let i2 = b.vertex(center + tan_u + tan_v, normal, Vec2::new(1.0, 0.0));
        let i3 = b.vertex(center - tan_u + tan_v, normal, Vec2::new(0.0, 0.0));
        b.quad(i0, i1, i2, i3);
    };

    let half = cube_size * 0.5;
    for z in 0..h {
        for x in 0..w {
            if !solid(x, z) {
                continue;
            }
            let center = Vec3::new(
                x as f32 * cube_size.x,
                half.y,
                z as f32 * cube_size.z,
            );

            // Top and bottom always
            emit_face(
                center + Vec3::Y * half.y,
                Vec3::Y,
                Vec3::X * half.x,
                Vec3::NEG_Z * half.z,
            );
            emit_face(
                center - Vec3::Y * half.y,
                Vec3::NEG_Y,
                Vec3::X * half.x,
                Vec3::Z * half.z,
            );

            // Side walls only against empty neighbors
            if !solid(x + 1, z) {
                emit_face(
                    center + Vec3::X * half.x,
                    Vec3::X,
                    Vec3::NEG_Z * half.z,
                    Vec3::Y * half.y,
                );
            }
            if !solid(x - 1, z) {
                emit_face(
                    center - Vec3::X * half.x,
                    Vec3::NEG_X,
                    Vec3::Z * half.z,
                    Vec3::Y * half.y,
                );
            }
            if !solid(x, z + 1) {
                emit_face(
                    center + Vec3::Z * half.z,
                    Vec3::Z,
                    Vec3::X * half.x,
                    Vec3::Y * half.y,
                );
            }
            if !solid(x, z - 1) {
                emit_face(
                    center - Vec3::Z * half.z,
                    Vec3::NEG_Z,
                    Vec3::NEG_X * half.x,
                    Vec3::Y * half.y,
                );
            }
        }
    }
    Ok(b.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every generator invariant in one place: attribute lengths line up
    /// and indices stay in range.
    fn assert_mesh_well_formed(mesh: &Mesh) {
        let n = mesh.vertex_count();
        assert!(n > 0);
        assert_eq!(mesh.positions.len(), n * 3);
        assert_eq!(mesh.normals.len(), n * 3);
        assert_eq!(mesh.texcoords.len(), n * 2);
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < n));
    }

    #[test]
    fn test_cube_shape() {
        let mesh = gen_cube(Vec3::new(2.0, 4.0, 6.0));
        assert_mesh_well_formed(&mesh);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.indices.len(), 36);

        let bbox = mesh.bounding_box();
        assert_eq!(bbox.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(bbox.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_plane_subdivisions() {
        let mesh = gen_plane(4.0, 4.0, 2, 3);
        assert_mesh_well_formed(&mesh);
        assert_eq!(mesh.vertex_count(), 3 * 4);
        assert_eq!(mesh.indices.len(), 2 * 3 * 2 * 3);
        assert!(mesh.normals.chunks(3).all(|n| n == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_sphere_vertices_on_radius() {
        let mesh = gen_sphere(2.0, 8, 12);
        assert_mesh_well_formed(&mesh);
        for v in 0..mesh.vertex_count() {
            let len = mesh.position(v).length();
            assert!((len - 2.0).abs() < 1e-4, "vertex at distance {}", len);
        }
    }

    #[test]
    fn test_hemisphere_stays_above_ground() {
        let mesh = gen_hemisphere(1.0, 6, 8);
        assert_mesh_well_formed(&mesh);
        for v in 0..mesh.vertex_count() {
            assert!(mesh.position(v).y >= -1e-5);
        }
    }

    #[test]
    fn test_cylinder_bounds() {
        let mesh = gen_cylinder(1.0, 3.0, 16);
        assert_mesh_well_formed(&mesh);
        let bbox = mesh.bounding_box();
        assert!((bbox.min.y - 0.0).abs() < 1e-5);
        assert!((bbox.max.y - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_torus_vertex_distances() {
        let mesh = gen_torus(3.0, 0.5, 16, 8);
        assert_mesh_well_formed(&mesh);
        // Every vertex lies between radius-size and radius+size from the Y axis
        for v in 0..mesh.vertex_count() {
            let p = mesh.position(v);
            let d = Vec2::new(p.x, p.z).length();
            assert!(d > 2.4 && d < 3.6, "ring distance {}", d);
        }
    }

    #[test]
    fn test_knot_well_formed() {
        let mesh = gen_knot(1.0, 0.25, 64, 8);
        assert_mesh_well_formed(&mesh);
    }

    #[test]
    fn test_polygon_fan() {
        let mesh = gen_polygon(6, 1.0);
        assert_mesh_well_formed(&mesh);
        assert_eq!(mesh.indices.len(), 6 * 3);
    }

    #[test]
    fn test_heightmap_heights() {
        let mut img = Image::gen_color(3, 3, Color::BLACK).unwrap();
        img.set_pixel(1, 1, Color::WHITE).unwrap();
        let mesh = gen_heightmap(&img, Vec3::new(2.0, 5.0, 2.0)).unwrap();
        assert_mesh_well_formed(&mesh);
        assert_eq!(mesh.vertex_count(), 9);

        // Center pixel is full height, corners are flat
        assert!((mesh.position(4).y - 5.0).abs() < 1e-5);
        assert_eq!(mesh.position(0).y, 0.0);
    }

    #[test]
    fn test_cubicmap_single_cell_is_closed_cube() {
        let mut img = Image::gen_color(3, 3, Color::BLACK).unwrap();
        img.set_pixel(1, 1, Color::WHITE).unwrap();
        let mesh = gen_cubicmap(&img, Vec3::ONE).unwrap();
        assert_mesh_well_formed(&mesh);
        // Isolated cell: 6 faces, 4 vertices each
        assert_eq!(mesh.vertex_count(), 24);
    }

    #[test]
    fn test_cubicmap_shared_wall_is_omitted() {
        let mut img = Image::gen_color(3, 1, Color::BLACK).unwrap();
        img.set_pixel(0, 0, Color::WHITE).unwrap();
        img.set_pixel(1, 0, Color::WHITE).unwrap();
        let mesh = gen_cubicmap(&img, Vec3::ONE).unwrap();
        // Two cells, 2 faces hidden: 2*6 - 2 = 10 faces
        assert_eq!(mesh.vertex_count(), 40);
    }
}
