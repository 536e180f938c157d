//! Cameras and screen/world conversions.

use glam::{Mat4, Vec2, Vec3, Vec4, Vec4Swizzles};
use rayfork_assets::Ray;

pub const CAMERA_NEAR_PLANE: f64 = 0.01;
pub const CAMERA_FAR_PLANE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraProjection {
    Perspective,
    Orthographic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera3d {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees (perspective), or the vertical
    /// extent in world units (orthographic).
    pub fovy: f32,
    pub projection: CameraProjection,
}

impl Default for Camera3d {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fovy: 45.0,
            projection: CameraProjection::Perspective,
        }
    }
}

impl Camera3d {
    /// OpenGL-style view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// OpenGL-style clip-space projection for the given aspect ratio.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        match self.projection {
            CameraProjection::Perspective => Mat4::perspective_rh_gl(
                self.fovy.to_radians(),
                aspect,
                CAMERA_NEAR_PLANE as f32,
                CAMERA_FAR_PLANE as f32,
            ),
            CameraProjection::Orthographic => {
                let top = self.fovy / 2.0;
                let right = top * aspect;
                Mat4::orthographic_rh_gl(
                    -right,
                    right,
                    -top,
                    top,
                    CAMERA_NEAR_PLANE as f32,
                    CAMERA_FAR_PLANE as f32,
                )
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2d {
    pub offset: Vec2,
    pub target: Vec2,
    /// Rotation in degrees.
    pub rotation: f32,
    pub zoom: f32,
}

impl Default for Camera2d {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            target: Vec2::ZERO,
            rotation: 0.0,
            zoom: 1.0,
        }
    }
}

impl Camera2d {
    /// World-to-screen matrix: translate by `-target`, scale by zoom,
    /// rotate, then translate by `offset`.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.offset.extend(0.0))
            * Mat4::from_rotation_z(self.rotation.to_radians())
            * Mat4::from_scale(Vec3::new(self.zoom, self.zoom, 1.0))
            * Mat4::from_translation(-self.target.extend(0.0))
    }
}

/// NDC point to world space: invert `proj * view`, transform, divide by w.
pub fn unproject(source: Vec3, projection: Mat4, view: Mat4) -> Vec3 {
    let inverse = (projection * view).inverse();
    let point = inverse * Vec4::new(source.x, source.y, source.z, 1.0);
    if point.w == 0.0 {
        return Vec3::ZERO;
    }
    point.xyz() / point.w
}

/// Picking ray through a screen position.
///
/// Perspective rays originate at the camera; orthographic rays originate on
/// the near plane.
pub fn mouse_ray(screen_pos: Vec2, screen_size: Vec2, camera: &Camera3d) -> Ray {
    // Screen to NDC, y flipped
    let ndc = Vec2::new(
        2.0 * screen_pos.x / screen_size.x - 1.0,
        1.0 - 2.0 * screen_pos.y / screen_size.y,
    );

    let view = camera.view_matrix();
    let projection = camera.projection_matrix(screen_size.x / screen_size.y);

    let near = unproject(Vec3::new(ndc.x, ndc.y, -1.0), projection, view);
    let far = unproject(Vec3::new(ndc.x, ndc.y, 1.0), projection, view);

    let position = match camera.projection {
        CameraProjection::Perspective => camera.position,
        CameraProjection::Orthographic => near,
    };
    Ray {
        position,
        direction: (far - near).normalize_or_zero(),
    }
}

/// World position to screen pixels.
pub fn world_to_screen(position: Vec3, camera: &Camera3d, screen_size: Vec2) -> Vec2 {
    let view = camera.view_matrix();
    let projection = camera.projection_matrix(screen_size.x / screen_size.y);
    let clip = projection * view * position.extend(1.0);
    if clip.w == 0.0 {
        return Vec2::ZERO;
    }
    let ndc = clip.xyz() / clip.w;
    Vec2::new(
        (ndc.x + 1.0) / 2.0 * screen_size.x,
        (1.0 - ndc.y) / 2.0 * screen_size.y,
    )
}
