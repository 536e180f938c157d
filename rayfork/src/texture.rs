//! GPU-side texture, render-texture and font handles.
//!
//! Ids come from the device and are opaque here. CPU-side entities
//! (images, font atlases) live in `rayfork-assets`; this module only pairs
//! them with their uploaded handles.

use rayfork_assets::text::{measure_text, measure_text_rect};
use rayfork_assets::{Font as FontData, PixelFormat, Rect};

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    pub mipmaps: u32,
    pub format: PixelFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTexture {
    /// Framebuffer id.
    pub id: u32,
    pub texture: Texture,
    pub depth_id: u32,
}

/// A font whose atlas has been uploaded. The CPU-side data stays around
/// for measurement and atlas-rect lookups.
#[derive(Debug, Clone)]
pub struct Font {
    pub texture: Texture,
    pub data: FontData,
}

impl Font {
    #[inline]
    pub fn base_size(&self) -> f32 {
        self.data.base_size
    }

    pub fn measure(&self, text: &str, font_size: f32, spacing: f32) -> Vec2 {
        measure_text(&self.data, text, font_size, spacing)
    }

    pub fn measure_rect(
        &self,
        text: &str,
        rect: Rect,
        font_size: f32,
        spacing: f32,
        word_wrap: bool,
    ) -> Vec2 {
        measure_text_rect(&self.data, text, rect, font_size, spacing, word_wrap)
    }
}
