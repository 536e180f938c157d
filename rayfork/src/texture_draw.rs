//! Textured quad drawing: regions, n-patches and tiling.

use glam::Vec2;
use rayfork_assets::{Color, Rect};

use crate::context::Context;
use crate::device::DrawMode;
use crate::texture::Texture;

/// Nine-slice (or three-slice) layout description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NPatchInfo {
    /// Region of the texture the patch cuts up.
    pub source: Rect,
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub layout: NPatchLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NPatchLayout {
    /// 3x3 grid: corners stay, edges and center stretch.
    NinePatch,
    /// 1x3 row: left and right stay, the middle stretches.
    ThreePatchHorizontal,
    /// 3x1 column: top and bottom stay, the middle stretches.
    ThreePatchVertical,
}

impl Context {
    pub fn draw_texture(&mut self, texture: &Texture, position: Vec2, tint: Color) {
        self.draw_texture_ex(texture, position, 0.0, 1.0, tint);
    }

    pub fn draw_texture_ex(
        &mut self,
        texture: &Texture,
        position: Vec2,
        rotation: f32,
        scale: f32,
        tint: Color,
    ) {
        let source = Rect::new(0.0, 0.0, texture.width as f32, texture.height as f32);
        let dest = Rect::new(
            position.x,
            position.y,
            texture.width as f32 * scale,
            texture.height as f32 * scale,
        );
        self.draw_texture_region(texture, source, dest, Vec2::ZERO, rotation, tint);
    }

    /// Draw `source` of the texture into `dest`, rotated around `origin`
    /// (relative to the destination's top-left corner).
    ///
    /// Negative source width/height flip the region on that axis.
    pub fn draw_texture_region(
        &mut self,
        texture: &Texture,
        source: Rect,
        dest: Rect,
        origin: Vec2,
        rotation: f32,
        tint: Color,
    ) {
        if texture.id == 0 {
            return;
        }
        let (tw, th) = (texture.width as f32, texture.height as f32);

        let flip_x = source.width < 0.0;
        let flip_y = source.height < 0.0;
        let mut src = source;
        if flip_x {
            src.x -= src.width;
            src.width = -src.width;
        }
        if flip_y {
            src.y -= src.height;
            src.height = -src.height;
        }

        let (mut u0, mut u1) = (src.x / tw, (src.x + src.width) / tw);
        let (mut v0, mut v1) = (src.y / th, (src.y + src.height) / th);
        if flip_x {
            std::mem::swap(&mut u0, &mut u1);
        }
        if flip_y {
            std::mem::swap(&mut v0, &mut v1);
        }

        self.reserve(4);
        self.device.push_matrix();
        self.device.translatef(dest.x, dest.y, 0.0);
        self.device.rotatef(rotation, 0.0, 0.0, 1.0);
        self.device.translatef(-origin.x, -origin.y, 0.0);

        self.device.enable_texture(texture.id);
        self.device.begin(DrawMode::Quads);
        self.device.color4ub(tint.r, tint.g, tint.b, tint.a);
        self.device.normal3f(0.0, 0.0, 1.0);

        self.device.tex_coord2f(u0, v0);
        self.device.vertex2f(0.0, 0.0);
        self.device.tex_coord2f(u0, v1);
        self.device.vertex2f(0.0, dest.height);
        self.device.tex_coord2f(u1, v1);
        self.device.vertex2f(dest.width, dest.height);
        self.device.tex_coord2f(u1, v0);
        self.device.vertex2f(dest.width, 0.0);

        self.device.end();
        self.device.disable_texture();
        self.device.pop_matrix();
    }

    /// Tile `source` across `dest` at `scale`, clipping the last partial
    /// row and column.
    pub fn draw_texture_tiled(
        &mut self,
        texture: &Texture,
        source: Rect,
        dest: Rect,
        origin: Vec2,
        rotation: f32,
        scale: f32,
        tint: Color,
    ) {
        if texture.id == 0 || scale <= 0.0 {
            return;
        }
        let tile_w = source.width * scale;
        let tile_h = source.height * scale;
        if tile_w <= 0.0 || tile_h <= 0.0 {
            return;
        }

        let mut y = 0.0;
        while y < dest.height {
            let mut x = 0.0;
            let row_h = tile_h.min(dest.height - y);
            while x < dest.width {
                let col_w = tile_w.min(dest.width - x);
                // Partial tiles sample a cropped region
                let src = Rect::new(
                    source.x,
                    source.y,
                    source.width * col_w / tile_w,
                    source.height * row_h / tile_h,
                );
                self.draw_texture_region(
                    texture,
                    src,
                    Rect::new(dest.x + x, dest.y + y, col_w, row_h),
                    origin,
                    rotation,
                    tint,
                );
                x += tile_w;
            }
            y += tile_h;
        }
    }

    /// Nine-slice / three-slice draw.
    ///
    /// When the destination is smaller than the summed borders, the corners
    /// shrink proportionally and the stretched middle collapses.
    pub fn draw_texture_npatch(
        &mut self,
        texture: &Texture,
        info: NPatchInfo,
        dest: Rect,
        origin: Vec2,
        rotation: f32,
        tint: Color,
    ) {
        if texture.id == 0 {
            return;
        }
        let (tw, th) = (texture.width as f32, texture.height as f32);

        let mut left = info.left;
        let mut right = info.right;
        let mut top = info.top;
        let mut bottom = info.bottom;

        // Border shrink when the destination cannot fit both borders
        if dest.width < left + right && matches!(info.layout, NPatchLayout::NinePatch | NPatchLayout::ThreePatchHorizontal) {
            let shrink = dest.width / (left + right);
            left *= shrink;
            right *= shrink;
        }
        if dest.height < top + bottom && matches!(info.layout, NPatchLayout::NinePatch | NPatchLayout::ThreePatchVertical) {
            let shrink = dest.height / (top + bottom);
            top *= shrink;
            bottom *= shrink;
        }

        // Destination slice edges
        let xs: Vec<f32> = match info.layout {
            NPatchLayout::NinePatch | NPatchLayout::ThreePatchHorizontal => {
                vec![0.0, left, (dest.width - right).max(left), dest.width]
            }
            NPatchLayout::ThreePatchVertical => vec![0.0, dest.width],
        };
        let ys: Vec<f32> = match info.layout {
            NPatchLayout::NinePatch | NPatchLayout::ThreePatchVertical => {
                vec![0.0, top, (dest.height - bottom).max(top), dest.height]
            }
            NPatchLayout::ThreePatchHorizontal => vec![0.0, dest.height],
        };

        // Texture slice edges (unshrunk borders)
        let us: Vec<f32> = match info.layout {
            NPatchLayout::NinePatch | NPatchLayout::ThreePatchHorizontal => vec![
                info.source.x / tw,
                (info.source.x + info.left) / tw,
                (info.source.x + info.source.width - info.right) / tw,
                (info.source.x + info.source.width) / tw,
            ],
            NPatchLayout::ThreePatchVertical => vec![
                info.source.x / tw,
                (info.source.x + info.source.width) / tw,
            ],
        };
        let vs: Vec<f32> = match info.layout {
            NPatchLayout::NinePatch | NPatchLayout::ThreePatchVertical => vec![
                info.source.y / th,
                (info.source.y + info.top) / th,
                (info.source.y + info.source.height - info.bottom) / th,
                (info.source.y + info.source.height) / th,
            ],
            NPatchLayout::ThreePatchHorizontal => vec![
                info.source.y / th,
                (info.source.y + info.source.height) / th,
            ],
        };

        let cells = (xs.len() - 1) * (ys.len() - 1);
        self.reserve(cells * 4);

        self.device.push_matrix();
        self.device.translatef(dest.x, dest.y, 0.0);
        self.device.rotatef(rotation, 0.0, 0.0, 1.0);
        self.device.translatef(-origin.x, -origin.y, 0.0);

        self.device.enable_texture(texture.id);
        self.device.begin(DrawMode::Quads);
        self.device.color4ub(tint.r, tint.g, tint.b, tint.a);
        self.device.normal3f(0.0, 0.0, 1.0);

        for row in 0..ys.len() - 1 {
            for col in 0..xs.len() - 1 {
                let (x0, x1) = (xs[col], xs[col + 1]);
                let (y0, y1) = (ys[row], ys[row + 1]);
                if x1 <= x0 || y1 <= y0 {
                    continue; // collapsed middle slice
                }
                let (u0, u1) = (us[col], us[col + 1]);
                let (v0, v1) = (vs[row], vs[row + 1]);

                self.device.tex_coord2f(u0, v0);
                self.device.vertex2f(x0, y0);
                self.device.tex_coord2f(u0, v1);
                self.device.vertex2f(x0, y1);
                self.device.tex_coord2f(u1, v1);
                self.device.vertex2f(x1, y1);
                self.device.tex_coord2f(u1, v0);
                self.device.vertex2f(x1, y0);
            }
        }

        self.device.end();
        self.device.disable_texture();
        self.device.pop_matrix();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RecordingDevice;
    use rayfork_assets::PixelFormat;

    fn test_context() -> Context {
        Context::new(Box::new(RecordingDevice::new()), 800, 600).unwrap()
    }

    fn test_texture() -> Texture {
        Texture {
            id: 42,
            width: 64,
            height: 64,
            mipmaps: 1,
            format: PixelFormat::R8G8B8A8,
        }
    }

    #[test]
    fn test_region_emits_quad_with_uvs() {
        let mut context = test_context();
        let texture = test_texture();
        context.draw_texture_region(
            &texture,
            Rect::new(16.0, 16.0, 32.0, 32.0),
            Rect::new(100.0, 100.0, 64.0, 64.0),
            Vec2::ZERO,
            0.0,
            Color::WHITE,
        );
        context.end();

        let device = context.into_recording();
        let v = &device.draws[0].vertices;
        assert_eq!(v.len(), 4);
        assert_eq!(v[0].texcoord, [0.25, 0.25]);
        assert_eq!(v[2].texcoord, [0.75, 0.75]);
        assert_eq!(v[2].position, [64.0, 64.0, 0.0]);
        assert!(device.calls.iter().any(|c| c == "enable_texture 42"));
    }

    #[test]
    fn test_negative_source_height_flips_v() {
        let mut context = test_context();
        let texture = test_texture();
        context.draw_texture_region(
            &texture,
            Rect::new(0.0, 64.0, 64.0, -64.0),
            Rect::new(0.0, 0.0, 64.0, 64.0),
            Vec2::ZERO,
            0.0,
            Color::WHITE,
        );
        context.end();

        let device = context.into_recording();
        let v = &device.draws[0].vertices;
        // First vertex samples the bottom of the region
        assert_eq!(v[0].texcoord[1], 1.0);
        assert_eq!(v[1].texcoord[1], 0.0);
    }

    #[test]
    fn test_nine_patch_emits_nine_quads() {
        let mut context = test_context();
        let texture = test_texture();
        let info = NPatchInfo {
            source: Rect::new(0.0, 0.0, 64.0, 64.0),
            left: 8.0,
            top: 8.0,
            right: 8.0,
            bottom: 8.0,
            layout: NPatchLayout::NinePatch,
        };
        context.draw_texture_npatch(
            &texture,
            info,
            Rect::new(0.0, 0.0, 200.0, 100.0),
            Vec2::ZERO,
            0.0,
            Color::WHITE,
        );
        context.end();

        let device = context.into_recording();
        assert_eq!(device.draws[0].vertices.len(), 9 * 4);
    }

    #[test]
    fn test_three_patch_horizontal_emits_three_quads() {
        let mut context = test_context();
        let texture = test_texture();
        let info = NPatchInfo {
            source: Rect::new(0.0, 0.0, 64.0, 64.0),
            left: 8.0,
            top: 0.0,
            right: 8.0,
            bottom: 0.0,
            layout: NPatchLayout::ThreePatchHorizontal,
        };
        context.draw_texture_npatch(
            &texture,
            info,
            Rect::new(0.0, 0.0, 200.0, 64.0),
            Vec2::ZERO,
            0.0,
            Color::WHITE,
        );
        context.end();

        let device = context.into_recording();
        assert_eq!(device.draws[0].vertices.len(), 3 * 4);
    }

    #[test]
    fn test_narrow_nine_patch_omits_center_and_shrinks_corners() {
        let mut context = test_context();
        let texture = test_texture();
        let info = NPatchInfo {
            source: Rect::new(0.0, 0.0, 64.0, 64.0),
            left: 20.0,
            top: 20.0,
            right: 20.0,
            bottom: 20.0,
            layout: NPatchLayout::NinePatch,
        };
        // Destination narrower than left+right: the middle column collapses
        context.draw_texture_npatch(
            &texture,
            info,
            Rect::new(0.0, 0.0, 20.0, 100.0),
            Vec2::ZERO,
            0.0,
            Color::WHITE,
        );
        context.end();

        let device = context.into_recording();
        // 2 columns x 3 rows of surviving cells
        assert_eq!(device.draws[0].vertices.len(), 6 * 4);
        // Corner width shrank to half the border
        let v = &device.draws[0].vertices;
        assert_eq!(v[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(v[2].position[0], 10.0);
    }

    #[test]
    fn test_tiled_covers_destination() {
        let mut context = test_context();
        let texture = test_texture();
        context.draw_texture_tiled(
            &texture,
            Rect::new(0.0, 0.0, 64.0, 64.0),
            Rect::new(0.0, 0.0, 150.0, 64.0),
            Vec2::ZERO,
            0.0,
            1.0,
            Color::WHITE,
        );
        context.end();

        let device = context.into_recording();
        // 3 tiles in x (two full, one 22px sliver), 1 row
        assert_eq!(device.draws[0].vertices.len(), 3 * 4);
    }
}
