//! The rendering context: default handles, frame brackets and resource
//! upload paths.
//!
//! Every bracket that changes device state (`begin_2d`, `begin_3d`,
//! scissor, shader, blend mode, render target) flushes queued vertices
//! first; vertices already emitted belong to the state they were emitted
//! under.

use glam::{Mat4, Vec2};
use rayfork_assets::{
    Color, Error, Font as FontData, Image, MipmapsImage, Model, PixelFormat, Rect, Result,
};

use crate::camera::{Camera2d, Camera3d, CameraProjection, CAMERA_FAR_PLANE, CAMERA_NEAR_PLANE};
use crate::device::{BlendMode, GfxDevice, MatrixMode};
use crate::texture::{Font, RenderTexture, Texture};

pub struct Context {
    pub(crate) device: Box<dyn GfxDevice>,

    pub screen_width: u32,
    pub screen_height: u32,
    pub(crate) render_width: u32,
    pub(crate) render_height: u32,
    /// Extra scale applied to every frame (DPI scaling).
    pub screen_scaling: Mat4,

    pub default_texture: Texture,
    pub default_font: Font,
    /// Texture sampled when filling shape primitives; a 1x1 white texture
    /// by default, swappable to pack shapes into a sprite atlas.
    pub(crate) shapes_texture: Texture,
    pub(crate) shapes_texture_rect: Rect,

    current_shader: Option<u32>,
    current_blend: BlendMode,
    /// Nested render targets: `(fbo id, width, height)`.
    render_target_stack: Vec<(u32, u32, u32)>,
}

impl Context {
    /// Build a context over a device: uploads the 1x1 white default
    /// texture and the embedded default font, and sets up the screen
    /// projection.
    pub fn new(mut device: Box<dyn GfxDevice>, screen_width: u32, screen_height: u32) -> Result<Self> {
        let id = device.load_texture(1, 1, PixelFormat::R8G8B8A8, 1, &[255, 255, 255, 255]);
        let default_texture = Texture {
            id,
            width: 1,
            height: 1,
            mipmaps: 1,
            format: PixelFormat::R8G8B8A8,
        };

        let font_data = FontData::default_font()?;
        let font_texture_id = device.load_texture(
            font_data.atlas.width,
            font_data.atlas.height,
            font_data.atlas.format,
            1,
            &font_data.atlas.data,
        );
        let default_font = Font {
            texture: Texture {
                id: font_texture_id,
                width: font_data.atlas.width,
                height: font_data.atlas.height,
                mipmaps: 1,
                format: font_data.atlas.format,
            },
            data: font_data,
        };

        let mut context = Self {
            device,
            screen_width,
            screen_height,
            render_width: screen_width,
            render_height: screen_height,
            screen_scaling: Mat4::IDENTITY,
            default_texture,
            default_font,
            shapes_texture: default_texture,
            shapes_texture_rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            current_shader: None,
            current_blend: BlendMode::Alpha,
            render_target_stack: Vec::new(),
        };
        context.setup_screen_projection();
        tracing::info!("context ready: {}x{}", screen_width, screen_height);
        Ok(context)
    }

    pub fn device_mut(&mut self) -> &mut dyn GfxDevice {
        self.device.as_mut()
    }

    #[inline]
    pub fn render_size(&self) -> (u32, u32) {
        (self.render_width, self.render_height)
    }

    /// Classic 2D screen projection: pixel coordinates, y down.
    fn setup_screen_projection(&mut self) {
        self.device
            .viewport(0, 0, self.render_width as i32, self.render_height as i32);
        self.device.matrix_mode(MatrixMode::Projection);
        self.device.load_identity();
        self.device.ortho(
            0.0,
            self.render_width as f64,
            self.render_height as f64,
            0.0,
            0.0,
            1.0,
        );
        self.device.matrix_mode(MatrixMode::ModelView);
        self.device.load_identity();
    }

    /// Flush if appending `vertex_count` more vertices would overflow.
    pub(crate) fn reserve(&mut self, vertex_count: usize) {
        if self.device.check_buffer_limit(vertex_count) {
            self.device.draw();
        }
    }

    /// Set the sticky vertex color on the emitter.
    #[inline]
    pub(crate) fn vertex_color(&mut self, color: Color) {
        self.device.color4ub(color.r, color.g, color.b, color.a);
    }

    // ========================================================================
    // Frame brackets
    // ========================================================================

    pub fn begin(&mut self) {
        self.device.load_identity();
        self.device.mult_matrix(self.screen_scaling);
    }

    pub fn end(&mut self) {
        self.device.draw();
    }

    pub fn clear(&mut self, color: Color) {
        self.device.clear_color(color);
        self.device.clear_screen_buffers();
    }

    pub fn begin_2d(&mut self, camera: Camera2d) {
        self.device.draw();
        self.device.load_identity();
        self.device.mult_matrix(self.screen_scaling * camera.matrix());
    }

    pub fn end_2d(&mut self) {
        self.device.draw();
        self.device.load_identity();
        self.device.mult_matrix(self.screen_scaling);
    }

    /// Enter 3D: pushes the projection, installs the camera's projection
    /// and view, and enables depth testing.
    pub fn begin_3d(&mut self, camera: Camera3d) {
        self.device.draw();

        self.device.matrix_mode(MatrixMode::Projection);
        self.device.push_matrix();
        self.device.load_identity();

        let aspect = self.render_width as f64 / self.render_height as f64;
        match camera.projection {
            CameraProjection::Perspective => {
                let top = CAMERA_NEAR_PLANE * (camera.fovy as f64 * 0.5).to_radians().tan();
                let right = top * aspect;
                self.device
                    .frustum(-right, right, -top, top, CAMERA_NEAR_PLANE, CAMERA_FAR_PLANE);
            }
            CameraProjection::Orthographic => {
                let top = camera.fovy as f64 / 2.0;
                let right = top * aspect;
                self.device
                    .ortho(-right, right, -top, top, CAMERA_NEAR_PLANE, CAMERA_FAR_PLANE);
            }
        }

        self.device.matrix_mode(MatrixMode::ModelView);
        self.device.load_identity();
        self.device.mult_matrix(camera.view_matrix());
        self.device.enable_depth_test();
    }

    pub fn end_3d(&mut self) {
        self.device.draw();

        self.device.matrix_mode(MatrixMode::Projection);
        self.device.pop_matrix();
        self.device.matrix_mode(MatrixMode::ModelView);
        self.device.load_identity();
        self.device.mult_matrix(self.screen_scaling);
        self.device.disable_depth_test();
    }

    /// Redirect rendering into a framebuffer. Nesting is tracked on a
    /// stack so `end_render_to_texture` restores the enclosing target.
    pub fn begin_render_to_texture(&mut self, target: &RenderTexture) {
        self.device.draw();
        self.device.enable_render_texture(target.id);

        let (w, h) = (target.texture.width, target.texture.height);
        self.render_target_stack.push((target.id, w, h));
        self.render_width = w;
        self.render_height = h;

        self.device.viewport(0, 0, w as i32, h as i32);
        self.device.matrix_mode(MatrixMode::Projection);
        self.device.load_identity();
        // Bottom-up ortho: framebuffer textures sample y-flipped
        self.device.ortho(0.0, w as f64, 0.0, h as f64, 0.0, 1.0);
        self.device.matrix_mode(MatrixMode::ModelView);
        self.device.load_identity();
    }

    pub fn end_render_to_texture(&mut self) {
        self.device.draw();
        self.render_target_stack.pop();

        match self.render_target_stack.last().copied() {
            Some((fbo, w, h)) => {
                // Back into the enclosing target
                self.device.enable_render_texture(fbo);
                self.render_width = w;
                self.render_height = h;
                self.device.viewport(0, 0, w as i32, h as i32);
                self.device.matrix_mode(MatrixMode::Projection);
                self.device.load_identity();
                self.device.ortho(0.0, w as f64, 0.0, h as f64, 0.0, 1.0);
                self.device.matrix_mode(MatrixMode::ModelView);
                self.device.load_identity();
            }
            None => {
                self.device.disable_render_texture();
                self.render_width = self.screen_width;
                self.render_height = self.screen_height;
                self.setup_screen_projection();
            }
        }
    }

    /// Clip rendering to `rect` (screen pixels, y down).
    pub fn begin_scissor(&mut self, rect: Rect) {
        self.device.draw();
        self.device.enable_scissor_test();
        // Device scissor origin is bottom-left
        let y = self.render_height as i32 - (rect.y + rect.height) as i32;
        self.device
            .scissor(rect.x as i32, y, rect.width as i32, rect.height as i32);
    }

    pub fn end_scissor(&mut self) {
        self.device.draw();
        self.device.disable_scissor_test();
    }

    pub fn begin_shader(&mut self, shader_id: u32) {
        if self.current_shader != Some(shader_id) {
            self.device.draw();
            self.device.set_shader(Some(shader_id));
            self.current_shader = Some(shader_id);
        }
    }

    pub fn end_shader(&mut self) {
        if self.current_shader.is_some() {
            self.device.draw();
            self.device.set_shader(None);
            self.current_shader = None;
        }
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        if self.current_blend != mode {
            self.device.draw();
            self.device.blend_mode(mode);
            self.current_blend = mode;
        }
    }

    /// Swap the texture shape fills sample from (atlas packing).
    pub fn set_shapes_texture(&mut self, texture: Texture, source: Rect) {
        self.shapes_texture = texture;
        self.shapes_texture_rect = source;
    }

    // ========================================================================
    // Resource uploads
    // ========================================================================

    pub fn load_texture_from_image(&mut self, image: &Image) -> Result<Texture> {
        if image.width == 0 || image.height == 0 {
            return Err(Error::BadArgument("texture with a zero dimension"));
        }
        let id = self
            .device
            .load_texture(image.width, image.height, image.format, 1, &image.data);
        Ok(Texture {
            id,
            width: image.width,
            height: image.height,
            mipmaps: 1,
            format: image.format,
        })
    }

    pub fn load_texture_from_mipmaps(&mut self, image: &MipmapsImage) -> Result<Texture> {
        if image.width == 0 || image.height == 0 {
            return Err(Error::BadArgument("texture with a zero dimension"));
        }
        let id = self.device.load_texture(
            image.width,
            image.height,
            image.format,
            image.mipmaps,
            &image.data,
        );
        Ok(Texture {
            id,
            width: image.width,
            height: image.height,
            mipmaps: image.mipmaps,
            format: image.format,
        })
    }

    pub fn update_texture(&mut self, texture: &Texture, pixels: &[u8]) -> Result<()> {
        let needed = texture.format.buffer_size(texture.width, texture.height);
        if pixels.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                got: pixels.len(),
            });
        }
        self.device.update_texture(
            texture.id,
            texture.width,
            texture.height,
            texture.format,
            pixels,
        );
        Ok(())
    }

    /// Upload a cubemap from a square image holding the six faces stacked
    /// vertically. `size` is the face edge length.
    pub fn load_texture_cubemap(&mut self, image: &Image, size: u32) -> Result<Texture> {
        let needed = image.format.buffer_size(size, size * 6);
        if image.data.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                got: image.data.len(),
            });
        }
        let id = self
            .device
            .load_texture_cubemap(size, image.format, &image.data);
        Ok(Texture {
            id,
            width: size,
            height: size,
            mipmaps: 1,
            format: image.format,
        })
    }

    pub fn unload_texture(&mut self, texture: Texture) {
        self.device.delete_texture(texture.id);
    }

    pub fn set_texture_filter(&mut self, texture: &Texture, filter: crate::device::TextureFilter) {
        self.device.set_texture_filter(texture.id, filter);
    }

    pub fn set_texture_wrap(&mut self, texture: &Texture, wrap: crate::device::TextureWrap) {
        self.device.set_texture_wrap(texture.id, wrap);
    }

    pub fn unload_shader(&mut self, shader_id: u32) {
        if self.current_shader == Some(shader_id) {
            self.end_shader();
        }
        self.device.unload_shader(shader_id);
    }

    pub fn generate_texture_mipmaps(&mut self, texture: &mut Texture) {
        texture.mipmaps = self
            .device
            .generate_mipmaps(texture.id, texture.width, texture.height);
    }

    pub fn load_render_texture(&mut self, width: u32, height: u32) -> RenderTexture {
        let (fbo, color, depth) = self.device.load_render_texture(width, height);
        RenderTexture {
            id: fbo,
            texture: Texture {
                id: color,
                width,
                height,
                mipmaps: 1,
                format: PixelFormat::R8G8B8A8,
            },
            depth_id: depth,
        }
    }

    pub fn unload_render_texture(&mut self, target: RenderTexture) {
        self.device.delete_render_texture(target.id);
    }

    /// Upload a CPU-side font's atlas.
    pub fn load_font(&mut self, data: FontData) -> Font {
        let id = self.device.load_texture(
            data.atlas.width,
            data.atlas.height,
            data.atlas.format,
            1,
            &data.atlas.data,
        );
        Font {
            texture: Texture {
                id,
                width: data.atlas.width,
                height: data.atlas.height,
                mipmaps: 1,
                format: data.atlas.format,
            },
            data,
        }
    }

    /// Upload every mesh of a model (the GPU half of model finalization).
    pub fn upload_model(&mut self, model: &mut Model) {
        for mesh in &mut model.meshes {
            self.device.load_mesh(mesh);
        }
    }

    /// Evaluate one animation frame and push the animated position and
    /// normal buffers to the device.
    pub fn update_model_animation(
        &mut self,
        model: &mut Model,
        anim: &rayfork_assets::ModelAnimation,
        frame: u32,
    ) -> Result<()> {
        rayfork_assets::update_model_animation(model, anim, frame)?;
        for mesh in &model.meshes {
            if !mesh.anim_positions.is_empty() {
                self.device.update_buffer(mesh.vbo_ids[0], &mesh.anim_positions);
            }
            if !mesh.anim_normals.is_empty() {
                self.device.update_buffer(mesh.vbo_ids[2], &mesh.anim_normals);
            }
        }
        Ok(())
    }

    pub fn unload_model(&mut self, model: &Model) {
        for mesh in &model.meshes {
            self.device.unload_mesh(mesh);
        }
    }

    /// Read back a texture as an image.
    pub fn read_texture(&mut self, texture: &Texture) -> Result<Image> {
        let data = self.device.read_texture_pixels(
            texture.id,
            texture.width,
            texture.height,
            texture.format,
        );
        Image::from_raw(data, texture.width, texture.height, texture.format)
    }

    /// Read back the screen as an RGBA8 image.
    pub fn read_screen(&mut self) -> Result<Image> {
        let data = self
            .device
            .read_screen_pixels(self.screen_width, self.screen_height);
        Image::from_raw(
            data,
            self.screen_width,
            self.screen_height,
            PixelFormat::R8G8B8A8,
        )
    }

    /// Resize the screen (window resize).
    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.screen_width = width;
        self.screen_height = height;
        if self.render_target_stack.is_empty() {
            self.render_width = width;
            self.render_height = height;
            self.setup_screen_projection();
        }
    }

    /// Convert a screen position to 2D world space under a camera.
    pub fn screen_to_world_2d(&self, position: Vec2, camera: Camera2d) -> Vec2 {
        let inverse = camera.matrix().inverse();
        let p = inverse.transform_point3(position.extend(0.0));
        Vec2::new(p.x, p.y)
    }

    pub fn world_to_screen_2d(&self, position: Vec2, camera: Camera2d) -> Vec2 {
        let p = camera.matrix().transform_point3(position.extend(0.0));
        Vec2::new(p.x, p.y)
    }
}

#[cfg(test)]
impl Context {
    /// Take the recording device back out to inspect the call stream.
    /// Test contexts are always built over a [`crate::device::RecordingDevice`].
    pub(crate) fn into_recording(self) -> crate::device::RecordingDevice {
        *self.device.into_any().downcast().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DrawMode, RecordingDevice};

    fn test_context() -> Context {
        Context::new(Box::new(RecordingDevice::new()), 800, 600).unwrap()
    }

    #[test]
    fn test_context_uploads_defaults() {
        let context = test_context();
        assert_ne!(context.default_texture.id, 0);
        assert_ne!(context.default_font.texture.id, 0);
        assert_ne!(context.default_texture.id, context.default_font.texture.id);
        assert_eq!(context.default_font.base_size(), 10.0);
    }

    #[test]
    fn test_quad_flushes_before_shader_change() {
        // A queued quad must be committed under the default shader before a
        // custom shader takes effect
        let mut context = Context::new(Box::new(RecordingDevice::with_capacity(64)), 800, 600)
            .unwrap();

        context.reserve(4);
        context.device.begin(DrawMode::Quads);
        for (x, y, u, v) in [
            (0.0, 0.0, 0.0, 0.0),
            (0.0, 32.0, 0.0, 1.0),
            (32.0, 32.0, 1.0, 1.0),
            (32.0, 0.0, 1.0, 0.0),
        ] {
            context.device.tex_coord2f(u, v);
            context.device.vertex2f(x, y);
        }
        context.device.end();

        context.begin_shader(7);
        context.end_shader();
        context.end();

        let device = context.into_recording();
        assert_eq!(device.draws.len(), 1, "exactly one draw call for the quad");
        let draw = &device.draws[0];
        assert_eq!(draw.shader, None, "quad was flushed under the default shader");
        assert_eq!(draw.vertices.len(), 4);
        assert_eq!(draw.vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(draw.vertices[2].texcoord, [1.0, 1.0]);

        // And the shader switch happened after that flush
        let draw_pos = device.calls.iter().position(|c| c == "draw").unwrap();
        let shader_pos = device
            .calls
            .iter()
            .position(|c| c == "set_shader Some(7)")
            .unwrap();
        assert!(draw_pos < shader_pos);
    }

    #[test]
    fn test_two_batches_split_by_shader_change() {
        let mut context = test_context();

        context.device.begin(DrawMode::Triangles);
        context.device.vertex2f(0.0, 0.0);
        context.device.vertex2f(1.0, 0.0);
        context.device.vertex2f(0.0, 1.0);
        context.device.end();

        context.begin_shader(3);

        context.device.begin(DrawMode::Triangles);
        context.device.vertex2f(5.0, 0.0);
        context.device.vertex2f(6.0, 0.0);
        context.device.vertex2f(5.0, 1.0);
        context.device.end();

        context.end();

        let device = context.into_recording();
        assert_eq!(device.draws.len(), 2);
        assert_eq!(device.draws[0].shader, None);
        assert_eq!(device.draws[1].shader, Some(3));
        // Vertex streams arrive exactly as emitted
        assert_eq!(device.draws[0].vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(device.draws[1].vertices[0].position, [5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_buffer_limit_triggers_flush() {
        let mut context =
            Context::new(Box::new(RecordingDevice::with_capacity(4)), 800, 600).unwrap();

        context.reserve(3);
        context.device.vertex2f(0.0, 0.0);
        context.device.vertex2f(1.0, 0.0);
        context.device.vertex2f(0.0, 1.0);

        // Next triangle does not fit: reserve flushes the first one
        context.reserve(3);
        context.device.vertex2f(9.0, 0.0);
        context.device.vertex2f(10.0, 0.0);
        context.device.vertex2f(9.0, 1.0);
        context.end();

        let device = context.into_recording();
        assert_eq!(device.draws.len(), 2);
        assert_eq!(device.draws[0].vertices.len(), 3);
        assert_eq!(device.draws[1].vertices.len(), 3);
    }

    #[test]
    fn test_begin_3d_orders_flush_projection_depth() {
        let mut context = test_context();
        context.device.vertex2f(0.0, 0.0); // queued 2D vertex
        context.begin_3d(Camera3d::default());
        context.end_3d();
        context.end();

        let device = context.into_recording();
        // The queued vertex flushed before the 3D projection switch: after
        // the flush comes a projection-mode switch, then depth test on
        assert_eq!(device.draws[0].vertices.len(), 1);
        let draw_pos = device.calls.iter().position(|c| c == "draw").unwrap();
        let after_flush = &device.calls[draw_pos..];
        let proj_pos = after_flush
            .iter()
            .position(|c| c == "matrix_mode Projection")
            .unwrap();
        let depth_pos = after_flush
            .iter()
            .position(|c| c == "enable_depth_test")
            .unwrap();
        assert!(proj_pos < depth_pos);
        assert!(after_flush.iter().any(|c| c == "disable_depth_test"));
    }

    #[test]
    fn test_render_target_stack_nesting() {
        let mut context = test_context();
        let outer = context.load_render_texture(256, 256);
        let inner = context.load_render_texture(64, 64);

        context.begin_render_to_texture(&outer);
        assert_eq!(context.render_size(), (256, 256));
        context.begin_render_to_texture(&inner);
        assert_eq!(context.render_size(), (64, 64));
        context.end_render_to_texture();
        // Back to the outer target, not the screen
        assert_eq!(context.render_size(), (256, 256));
        context.end_render_to_texture();
        assert_eq!(context.render_size(), (800, 600));

        let device = context.into_recording();
        // The outer target was re-enabled when the inner one ended
        let enables: Vec<&String> = device
            .calls
            .iter()
            .filter(|c| c.starts_with("enable_render_texture"))
            .collect();
        assert_eq!(enables.len(), 3);
        assert!(device.calls.iter().any(|c| c == "disable_render_texture"));
    }

    #[test]
    fn test_scissor_flips_y() {
        let mut context = test_context();
        context.begin_scissor(Rect::new(10.0, 20.0, 100.0, 50.0));
        context.end_scissor();

        let device = context.into_recording();
        // 600 - (20 + 50) = 530
        assert!(device.calls.iter().any(|c| c == "scissor 10 530 100 50"));
    }

    #[test]
    fn test_update_model_animation_pushes_anim_buffers() {
        use rayfork_assets::model::gen_cube;
        use rayfork_assets::{BoneInfo, ModelAnimation, Transform};

        let mut context = test_context();
        let mut mesh = gen_cube(glam::Vec3::ONE);
        let n = mesh.vertex_count();
        mesh.bone_ids = vec![0; n * 4];
        mesh.bone_weights = vec![1.0; n * 4];
        let mut model = Model::from_mesh(mesh);
        model.bones = vec![BoneInfo {
            name: "root".into(),
            parent: -1,
        }];
        model.bind_pose = vec![Transform::IDENTITY];
        context.upload_model(&mut model);

        let anim = ModelAnimation {
            bones: model.bones.clone(),
            frame_poses: vec![vec![Transform::IDENTITY]],
        };
        context.update_model_animation(&mut model, &anim, 0).unwrap();

        let device = context.into_recording();
        // Positions and normals pushed for the one mesh
        assert_eq!(
            device
                .calls
                .iter()
                .filter(|c| c.starts_with("update_buffer"))
                .count(),
            2
        );
    }

    #[test]
    fn test_blend_mode_change_flushes_once() {
        let mut context = test_context();
        context.device.vertex2f(0.0, 0.0);
        context.set_blend_mode(BlendMode::Additive);
        context.set_blend_mode(BlendMode::Additive); // no-op repeat
        context.end();

        let device = context.into_recording();
        assert_eq!(device.draws.len(), 1);
        assert_eq!(
            device
                .calls
                .iter()
                .filter(|c| c.starts_with("blend_mode"))
                .count(),
            1
        );
    }
}
