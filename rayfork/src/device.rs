//! The graphics device contract.
//!
//! The batcher never talks to a GPU API directly; everything funnels
//! through [`GfxDevice`], an immediate-mode command sink with a matrix
//! stack, a `begin`/`vertex`/`end` emitter feeding fixed-size vertex
//! buffers, state switches, and resource uploads returning opaque ids.
//!
//! [`RecordingDevice`] implements the trait by recording the call stream;
//! batcher and context tests assert against it.

use glam::Mat4;
use rayfork_assets::{Color, Material, Mesh, PixelFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    Lines,
    Triangles,
    Quads,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixMode {
    Projection,
    ModelView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Alpha,
    Additive,
    Multiplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Point,
    Bilinear,
    Trilinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    Repeat,
    Clamp,
    MirrorRepeat,
}

/// Opaque command sink the batcher emits into.
///
/// Vertex state (`tex_coord2f`, `normal3f`, `color4ub`) is sticky: it
/// applies to every following `vertex*` call until changed, matching the
/// classic immediate-mode contract.
pub trait GfxDevice {
    // Matrix stack
    fn matrix_mode(&mut self, mode: MatrixMode);
    fn push_matrix(&mut self);
    fn pop_matrix(&mut self);
    fn load_identity(&mut self);
    fn translatef(&mut self, x: f32, y: f32, z: f32);
    fn rotatef(&mut self, angle_deg: f32, x: f32, y: f32, z: f32);
    fn scalef(&mut self, x: f32, y: f32, z: f32);
    fn mult_matrix(&mut self, matrix: Mat4);
    fn frustum(&mut self, left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64);
    fn ortho(&mut self, left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64);

    // Emitter
    fn begin(&mut self, mode: DrawMode);
    fn end(&mut self);
    fn vertex2f(&mut self, x: f32, y: f32);
    fn vertex3f(&mut self, x: f32, y: f32, z: f32);
    fn tex_coord2f(&mut self, u: f32, v: f32);
    fn normal3f(&mut self, x: f32, y: f32, z: f32);
    fn color4ub(&mut self, r: u8, g: u8, b: u8, a: u8);

    // State
    fn enable_texture(&mut self, id: u32);
    fn disable_texture(&mut self);
    fn set_shader(&mut self, id: Option<u32>);
    fn blend_mode(&mut self, mode: BlendMode);
    fn enable_depth_test(&mut self);
    fn disable_depth_test(&mut self);
    fn enable_wire_mode(&mut self);
    fn disable_wire_mode(&mut self);
    fn enable_scissor_test(&mut self);
    fn disable_scissor_test(&mut self);
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&mut self, color: Color);
    fn clear_screen_buffers(&mut self);

    // Resources (ids are opaque; 0 is never a valid id)
    fn load_texture(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        mipmaps: u32,
        data: &[u8],
    ) -> u32;
    fn load_texture_cubemap(&mut self, size: u32, format: PixelFormat, data: &[u8]) -> u32;
    fn update_texture(
        &mut self,
        id: u32,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: &[u8],
    );
    fn delete_texture(&mut self, id: u32);
    /// Returns the mipmap count after generation.
    fn generate_mipmaps(&mut self, id: u32, width: u32, height: u32) -> u32;
    fn set_texture_filter(&mut self, id: u32, filter: TextureFilter);
    fn set_texture_wrap(&mut self, id: u32, wrap: TextureWrap);
    fn read_texture_pixels(&mut self, id: u32, width: u32, height: u32, format: PixelFormat)
        -> Vec<u8>;
    fn read_screen_pixels(&mut self, width: u32, height: u32) -> Vec<u8>;
    /// Returns `(framebuffer id, color texture id, depth texture id)`.
    fn load_render_texture(&mut self, width: u32, height: u32) -> (u32, u32, u32);
    fn enable_render_texture(&mut self, fbo_id: u32);
    fn disable_render_texture(&mut self);
    fn delete_render_texture(&mut self, fbo_id: u32);
    /// Uploads attribute buffers and fills the mesh's GPU handle slots.
    fn load_mesh(&mut self, mesh: &mut Mesh);
    /// Replace the contents of one attribute buffer (animation updates).
    fn update_buffer(&mut self, buffer_id: u32, data: &[f32]);
    fn draw_mesh(&mut self, mesh: &Mesh, material: &Material, transform: Mat4);
    fn unload_mesh(&mut self, mesh: &Mesh);
    fn unload_shader(&mut self, id: u32);

    // Lifecycle
    /// True when appending `vertex_count` more vertices would overflow the
    /// current buffer. The batcher flushes and retries on true.
    fn check_buffer_limit(&mut self, vertex_count: usize) -> bool;
    /// Flush everything queued since the last draw.
    fn draw(&mut self);

    /// Downcast escape hatch for device-specific access (tests, native
    /// handles).
    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any>;
}

// ============================================================================
// Recording device (test double)
// ============================================================================

/// Default vertex capacity of the recording device's buffer.
pub const RECORDING_BUFFER_CAPACITY: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedVertex {
    pub position: [f32; 3],
    pub texcoord: [f32; 2],
    pub normal: [f32; 3],
    pub color: [u8; 4],
}

/// One flushed draw call: the vertex stream exactly as emitted, plus the
/// state it was emitted under.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub shader: Option<u32>,
    pub blend: BlendMode,
    pub vertices: Vec<RecordedVertex>,
}

/// A [`GfxDevice`] that records instead of rendering.
///
/// Vertices accumulate until `draw` flushes them into `draws`; every other
/// call appends a line to `calls` so tests can assert ordering.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub capacity: usize,
    pub draws: Vec<RecordedDraw>,
    pub calls: Vec<String>,

    pending: Vec<RecordedVertex>,
    cur_texcoord: [f32; 2],
    cur_normal: [f32; 3],
    cur_color: [u8; 4],
    cur_shader: Option<u32>,
    cur_blend: BlendMode,
    next_id: u32,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::with_capacity(RECORDING_BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            cur_color: [255, 255, 255, 255],
            next_id: 1,
            ..Default::default()
        }
    }

    fn log(&mut self, call: impl Into<String>) {
        self.calls.push(call.into());
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Vertices queued but not yet flushed.
    pub fn pending_vertices(&self) -> usize {
        self.pending.len()
    }

    fn push_vertex(&mut self, position: [f32; 3]) {
        self.pending.push(RecordedVertex {
            position,
            texcoord: self.cur_texcoord,
            normal: self.cur_normal,
            color: self.cur_color,
        });
    }
}

impl GfxDevice for RecordingDevice {
    fn matrix_mode(&mut self, mode: MatrixMode) {
        self.log(format!("matrix_mode {:?}", mode));
    }
    fn push_matrix(&mut self) {
        self.log("push_matrix");
    }
    fn pop_matrix(&mut self) {
        self.log("pop_matrix");
    }
    fn load_identity(&mut self) {
        self.log("load_identity");
    }
    fn translatef(&mut self, x: f32, y: f32, z: f32) {
        self.log(format!("translatef {} {} {}", x, y, z));
    }
    fn rotatef(&mut self, angle_deg: f32, x: f32, y: f32, z: f32) {
        self.log(format!("rotatef {} {} {} {}", angle_deg, x, y, z));
    }
    fn scalef(&mut self, x: f32, y: f32, z: f32) {
        self.log(format!("scalef {} {} {}", x, y, z));
    }
    fn mult_matrix(&mut self, _matrix: Mat4) {
        self.log("mult_matrix");
    }
    fn frustum(&mut self, l: f64, r: f64, b: f64, t: f64, n: f64, f: f64) {
        self.log(format!("frustum {} {} {} {} {} {}", l, r, b, t, n, f));
    }
    fn ortho(&mut self, l: f64, r: f64, b: f64, t: f64, n: f64, f: f64) {
        self.log(format!("ortho {} {} {} {} {} {}", l, r, b, t, n, f));
    }

    fn begin(&mut self, mode: DrawMode) {
        self.log(format!("begin {:?}", mode));
    }
    fn end(&mut self) {
        self.log("end");
    }
    fn vertex2f(&mut self, x: f32, y: f32) {
        self.push_vertex([x, y, 0.0]);
    }
    fn vertex3f(&mut self, x: f32, y: f32, z: f32) {
        self.push_vertex([x, y, z]);
    }
    fn tex_coord2f(&mut self, u: f32, v: f32) {
        self.cur_texcoord = [u, v];
    }
    fn normal3f(&mut self, x: f32, y: f32, z: f32) {
        self.cur_normal = [x, y, z];
    }
    fn color4ub(&mut self, r: u8, g: u8, b: u8, a: u8) {
        self.cur_color = [r, g, b, a];
    }

    fn enable_texture(&mut self, id: u32) {
        self.log(format!("enable_texture {}", id));
    }
    fn disable_texture(&mut self) {
        self.log("disable_texture");
    }
    fn set_shader(&mut self, id: Option<u32>) {
        self.cur_shader = id;
        self.log(format!("set_shader {:?}", id));
    }
    fn blend_mode(&mut self, mode: BlendMode) {
        self.cur_blend = mode;
        self.log(format!("blend_mode {:?}", mode));
    }
    fn enable_depth_test(&mut self) {
        self.log("enable_depth_test");
    }
    fn disable_depth_test(&mut self) {
        self.log("disable_depth_test");
    }
    fn enable_wire_mode(&mut self) {
        self.log("enable_wire_mode");
    }
    fn disable_wire_mode(&mut self) {
        self.log("disable_wire_mode");
    }
    fn enable_scissor_test(&mut self) {
        self.log("enable_scissor_test");
    }
    fn disable_scissor_test(&mut self) {
        self.log("disable_scissor_test");
    }
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.log(format!("scissor {} {} {} {}", x, y, width, height));
    }
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.log(format!("viewport {} {} {} {}", x, y, width, height));
    }
    fn clear_color(&mut self, color: Color) {
        self.log(format!(
            "clear_color {} {} {} {}",
            color.r, color.g, color.b, color.a
        ));
    }
    fn clear_screen_buffers(&mut self) {
        self.log("clear_screen_buffers");
    }

    fn load_texture(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        mipmaps: u32,
        _data: &[u8],
    ) -> u32 {
        let id = self.alloc_id();
        self.log(format!(
            "load_texture {} {}x{} {:?} mips {}",
            id, width, height, format, mipmaps
        ));
        id
    }
    fn load_texture_cubemap(&mut self, size: u32, format: PixelFormat, _data: &[u8]) -> u32 {
        let id = self.alloc_id();
        self.log(format!("load_texture_cubemap {} {} {:?}", id, size, format));
        id
    }
    fn update_texture(
        &mut self,
        id: u32,
        width: u32,
        height: u32,
        _format: PixelFormat,
        _data: &[u8],
    ) {
        self.log(format!("update_texture {} {}x{}", id, width, height));
    }
    fn delete_texture(&mut self, id: u32) {
        self.log(format!("delete_texture {}", id));
    }
    fn generate_mipmaps(&mut self, id: u32, width: u32, height: u32) -> u32 {
        self.log(format!("generate_mipmaps {}", id));
        1 + width.max(height).ilog2()
    }
    fn set_texture_filter(&mut self, id: u32, filter: TextureFilter) {
        self.log(format!("set_texture_filter {} {:?}", id, filter));
    }
    fn set_texture_wrap(&mut self, id: u32, wrap: TextureWrap) {
        self.log(format!("set_texture_wrap {} {:?}", id, wrap));
    }
    fn read_texture_pixels(
        &mut self,
        _id: u32,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Vec<u8> {
        vec![0; format.buffer_size(width, height)]
    }
    fn read_screen_pixels(&mut self, width: u32, height: u32) -> Vec<u8> {
        vec![0; PixelFormat::R8G8B8A8.buffer_size(width, height)]
    }
    fn load_render_texture(&mut self, width: u32, height: u32) -> (u32, u32, u32) {
        let fbo = self.alloc_id();
        let color = self.alloc_id();
        let depth = self.alloc_id();
        self.log(format!("load_render_texture {} {}x{}", fbo, width, height));
        (fbo, color, depth)
    }
    fn enable_render_texture(&mut self, fbo_id: u32) {
        self.log(format!("enable_render_texture {}", fbo_id));
    }
    fn disable_render_texture(&mut self) {
        self.log("disable_render_texture");
    }
    fn delete_render_texture(&mut self, fbo_id: u32) {
        self.log(format!("delete_render_texture {}", fbo_id));
    }
    fn load_mesh(&mut self, mesh: &mut Mesh) {
        mesh.vao_id = self.alloc_id();
        for slot in &mut mesh.vbo_ids {
            *slot = self.next_id;
            self.next_id += 1;
        }
        self.log(format!("load_mesh vao {}", mesh.vao_id));
    }
    fn update_buffer(&mut self, buffer_id: u32, data: &[f32]) {
        self.log(format!("update_buffer {} ({} floats)", buffer_id, data.len()));
    }
    fn draw_mesh(&mut self, mesh: &Mesh, _material: &Material, _transform: Mat4) {
        self.log(format!("draw_mesh vao {}", mesh.vao_id));
    }
    fn unload_mesh(&mut self, mesh: &Mesh) {
        self.log(format!("unload_mesh vao {}", mesh.vao_id));
    }
    fn unload_shader(&mut self, id: u32) {
        self.log(format!("unload_shader {}", id));
    }

    fn check_buffer_limit(&mut self, vertex_count: usize) -> bool {
        self.pending.len() + vertex_count > self.capacity
    }
    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
        self
    }
    fn draw(&mut self) {
        if !self.pending.is_empty() {
            let vertices = std::mem::take(&mut self.pending);
            self.draws.push(RecordedDraw {
                shader: self.cur_shader,
                blend: self.cur_blend,
                vertices,
            });
        }
        self.log("draw");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertices_accumulate_until_draw() {
        let mut device = RecordingDevice::new();
        device.begin(DrawMode::Triangles);
        device.color4ub(255, 0, 0, 255);
        device.vertex2f(0.0, 0.0);
        device.vertex2f(1.0, 0.0);
        device.vertex2f(0.0, 1.0);
        device.end();

        assert_eq!(device.pending_vertices(), 3);
        assert!(device.draws.is_empty());

        device.draw();
        assert_eq!(device.draws.len(), 1);
        assert_eq!(device.draws[0].vertices.len(), 3);
        assert_eq!(device.draws[0].vertices[0].color, [255, 0, 0, 255]);
        assert_eq!(device.pending_vertices(), 0);
    }

    #[test]
    fn test_sticky_vertex_state() {
        let mut device = RecordingDevice::new();
        device.tex_coord2f(0.25, 0.75);
        device.vertex2f(0.0, 0.0);
        device.vertex2f(1.0, 1.0);
        device.draw();

        let draw = &device.draws[0];
        assert_eq!(draw.vertices[0].texcoord, [0.25, 0.75]);
        assert_eq!(draw.vertices[1].texcoord, [0.25, 0.75]);
    }

    #[test]
    fn test_empty_draw_records_no_call() {
        let mut device = RecordingDevice::new();
        device.draw();
        assert!(device.draws.is_empty());
    }

    #[test]
    fn test_buffer_limit_predicate() {
        let mut device = RecordingDevice::with_capacity(4);
        assert!(!device.check_buffer_limit(4));
        device.vertex2f(0.0, 0.0);
        assert!(!device.check_buffer_limit(3));
        assert!(device.check_buffer_limit(4));
    }

    #[test]
    fn test_resource_ids_are_distinct() {
        let mut device = RecordingDevice::new();
        let a = device.load_texture(1, 1, PixelFormat::R8G8B8A8, 1, &[0; 4]);
        let b = device.load_texture(1, 1, PixelFormat::R8G8B8A8, 1, &[0; 4]);
        let (fbo, color, depth) = device.load_render_texture(4, 4);
        let ids = [a, b, fbo, color, depth];
        for (i, x) in ids.iter().enumerate() {
            for y in &ids[i + 1..] {
                assert_ne!(x, y);
            }
        }
    }
}
