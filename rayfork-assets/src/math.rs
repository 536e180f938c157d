//! Geometry primitives and intersection tests.
//!
//! Vector/matrix/quaternion math comes from `glam`; this module adds the
//! handful of types glam has no equivalent for (rectangles, rays, bounding
//! boxes, TRS poses) and the ray-intersection routines used for picking.

use glam::{Quat, Vec2, Vec3};

/// Axis-aligned rectangle, position + size, in pixels or world units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// Overlapping region of two rectangles; zero-sized when disjoint.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.width).min(other.x + other.width);
        let y1 = (self.y + self.height).min(other.y + other.height);
        Rect::new(x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0))
    }
}

/// Translation / rotation / scale pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Axis-aligned box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for p in points {
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub position: Vec3,
    pub direction: Vec3,
}

/// Intersection result for ray tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub position: Vec3,
    pub normal: Vec3,
}

/// Determinant epsilon below which a ray counts as parallel to a triangle.
const RAY_EPSILON: f32 = 1e-6;

/// Möller–Trumbore ray/triangle intersection, no back-face culling.
pub fn ray_triangle(ray: Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<RayHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let p = ray.direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < RAY_EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let t_vec = ray.position - v0;
    let u = t_vec.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = t_vec.cross(edge1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(q) * inv_det;
    if t <= RAY_EPSILON {
        return None;
    }

    Some(RayHit {
        distance: t,
        position: ray.position + ray.direction * t,
        normal: edge1.cross(edge2).normalize_or_zero(),
    })
}

/// Boolean ray/sphere test by projecting the center onto the ray.
pub fn ray_sphere(ray: Ray, center: Vec3, radius: f32) -> bool {
    let to_center = center - ray.position;
    let distance_sq = to_center.length_squared();
    let projection = ray.direction.dot(to_center);
    let residual_sq = distance_sq - projection * projection;
    residual_sq <= radius * radius && (projection >= 0.0 || distance_sq <= radius * radius)
}

/// Ray/sphere test returning the intersection point.
///
/// When the ray origin is inside the sphere the far intersection is
/// returned, otherwise the near one.
pub fn ray_sphere_ex(ray: Ray, center: Vec3, radius: f32) -> Option<RayHit> {
    let to_center = center - ray.position;
    let distance_sq = to_center.length_squared();
    let projection = ray.direction.dot(to_center);
    let residual_sq = distance_sq - projection * projection;
    if residual_sq > radius * radius {
        return None;
    }

    let half_chord = (radius * radius - residual_sq).sqrt();
    let inside = distance_sq < radius * radius;
    let t = if inside {
        projection + half_chord
    } else {
        projection - half_chord
    };
    if t < 0.0 {
        return None;
    }

    let position = ray.position + ray.direction * t;
    Some(RayHit {
        distance: t,
        position,
        normal: (position - center).normalize_or_zero(),
    })
}

/// Slab-method ray/AABB test.
pub fn ray_box(ray: Ray, bbox: BoundingBox) -> Option<RayHit> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        let origin = ray.position[axis];
        let dir = ray.direction[axis];
        let (lo, hi) = (bbox.min[axis], bbox.max[axis]);

        if dir.abs() < RAY_EPSILON {
            if origin < lo || origin > hi {
                return None;
            }
        } else {
            let inv = 1.0 / dir;
            let (t0, t1) = if inv >= 0.0 {
                ((lo - origin) * inv, (hi - origin) * inv)
            } else {
                ((hi - origin) * inv, (lo - origin) * inv)
            };
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
    }

    let t = if t_min >= 0.0 { t_min } else { t_max };
    if t < 0.0 {
        return None;
    }

    let position = ray.position + ray.direction * t;
    let center = (bbox.min + bbox.max) * 0.5;
    let half = (bbox.max - bbox.min) * 0.5;
    let local = (position - center) / half.max(Vec3::splat(RAY_EPSILON));

    // Dominant axis of the local hit point picks the face normal
    let abs = local.abs();
    let normal = if abs.x >= abs.y && abs.x >= abs.z {
        Vec3::new(local.x.signum(), 0.0, 0.0)
    } else if abs.y >= abs.z {
        Vec3::new(0.0, local.y.signum(), 0.0)
    } else {
        Vec3::new(0.0, 0.0, local.z.signum())
    };

    Some(RayHit {
        distance: t,
        position,
        normal,
    })
}

/// Next power of two ≥ `value` (`0 → 1`).
#[inline]
pub fn next_pot(value: u32) -> u32 {
    value.max(1).next_power_of_two()
}

/// Uniform random integer in `[min, max]`, both ends inclusive.
pub fn random_value(min: i32, max: i32) -> i32 {
    use rand::Rng;
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    rand::rng().random_range(lo..=hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_and_overlap() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(r.contains(Vec2::new(10.0, 10.0)));
        assert!(r.contains(Vec2::new(29.9, 29.9)));
        assert!(!r.contains(Vec2::new(30.0, 30.0)));

        assert!(r.overlaps(&Rect::new(25.0, 25.0, 10.0, 10.0)));
        assert!(!r.overlaps(&Rect::new(30.0, 10.0, 5.0, 5.0)));
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), Rect::new(5.0, 5.0, 5.0, 5.0));

        let disjoint = Rect::new(20.0, 20.0, 5.0, 5.0);
        let empty = a.intersection(&disjoint);
        assert_eq!(empty.width, 0.0);
        assert_eq!(empty.height, 0.0);
    }

    #[test]
    fn test_ray_triangle_through_centroid() {
        let (v0, v1, v2) = (
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let centroid = (v0 + v1 + v2) / 3.0;
        let origin = centroid + Vec3::Y * 5.0;
        let ray = Ray {
            position: origin,
            direction: -Vec3::Y,
        };

        let hit = ray_triangle(ray, v0, v1, v2).unwrap();
        assert!((hit.distance - 5.0).abs() < 1e-5);
        assert!((hit.position - centroid).length() < 1e-5);
    }

    #[test]
    fn test_ray_triangle_parallel_misses() {
        let ray = Ray {
            position: Vec3::new(0.0, 1.0, 0.0),
            direction: Vec3::X,
        };
        let hit = ray_triangle(
            ray,
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_ray_sphere_from_outside() {
        let ray = Ray {
            position: Vec3::new(-5.0, 0.0, 0.0),
            direction: Vec3::X,
        };
        assert!(ray_sphere(ray, Vec3::ZERO, 1.0));

        let hit = ray_sphere_ex(ray, Vec3::ZERO, 1.0).unwrap();
        assert!((hit.distance - 4.0).abs() < 1e-5);
        assert!((hit.position - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_ray_sphere_from_inside_picks_far_hit() {
        let ray = Ray {
            position: Vec3::ZERO,
            direction: Vec3::X,
        };
        let hit = ray_sphere_ex(ray, Vec3::ZERO, 2.0).unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-5);
        assert!((hit.position - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_ray_box() {
        let bbox = BoundingBox {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        };
        let ray = Ray {
            position: Vec3::new(-5.0, 0.0, 0.0),
            direction: Vec3::X,
        };
        let hit = ray_box(ray, bbox).unwrap();
        assert!((hit.distance - 4.0).abs() < 1e-5);
        assert_eq!(hit.normal, Vec3::new(-1.0, 0.0, 0.0));

        let miss = Ray {
            position: Vec3::new(-5.0, 3.0, 0.0),
            direction: Vec3::X,
        };
        assert!(ray_box(miss, bbox).is_none());
    }

    #[test]
    fn test_next_pot() {
        assert_eq!(next_pot(0), 1);
        assert_eq!(next_pot(1), 1);
        assert_eq!(next_pot(3), 4);
        assert_eq!(next_pot(128), 128);
        assert_eq!(next_pot(129), 256);
    }

    #[test]
    fn test_random_value_in_range() {
        for _ in 0..100 {
            let v = random_value(-3, 7);
            assert!((-3..=7).contains(&v));
        }
    }
}
