//! Text drawing over the glyph atlas.
//!
//! Glyph placement shares the layout code in `rayfork-assets`; this module
//! only turns placements into textured quads.

use glam::Vec2;
use rayfork_assets::text::{layout_text_rect, utf8};
use rayfork_assets::{Color, Rect};

use crate::context::Context;
use crate::device::{DrawMode, GfxDevice};
use crate::texture::Font;

/// Emit one glyph quad at `top_left`, scaled by `scale`.
fn emit_glyph(
    device: &mut dyn GfxDevice,
    font: &Font,
    codepoint: char,
    top_left: Vec2,
    scale: f32,
    tint: Color,
) {
    let Some(glyph) = font.data.glyph_or_replacement(codepoint) else {
        return;
    };
    if glyph.width <= 0.0 || glyph.height <= 0.0 {
        return; // whitespace glyphs carry no ink
    }
    let (tw, th) = (font.texture.width as f32, font.texture.height as f32);
    let x = top_left.x + glyph.offset_x * scale;
    let y = top_left.y + glyph.offset_y * scale;
    let w = glyph.width * scale;
    let h = glyph.height * scale;

    let (u0, u1) = (glyph.x / tw, (glyph.x + glyph.width) / tw);
    let (v0, v1) = (glyph.y / th, (glyph.y + glyph.height) / th);

    if device.check_buffer_limit(4) {
        device.draw();
    }
    device.enable_texture(font.texture.id);
    device.begin(DrawMode::Quads);
    device.color4ub(tint.r, tint.g, tint.b, tint.a);
    device.normal3f(0.0, 0.0, 1.0);

    device.tex_coord2f(u0, v0);
    device.vertex2f(x, y);
    device.tex_coord2f(u0, v1);
    device.vertex2f(x, y + h);
    device.tex_coord2f(u1, v1);
    device.vertex2f(x + w, y + h);
    device.tex_coord2f(u1, v0);
    device.vertex2f(x + w, y);

    device.end();
    device.disable_texture();
}

fn emit_text(
    device: &mut dyn GfxDevice,
    font: &Font,
    text: &str,
    position: Vec2,
    font_size: f32,
    spacing: f32,
    tint: Color,
) {
    let scale = font_size / font.data.base_size;
    let line_advance = 1.5 * font.data.base_size * scale;

    let mut pen = position;
    for rune in utf8::runes(text.as_bytes()) {
        if rune.codepoint == '\n' {
            pen.x = position.x;
            pen.y += line_advance;
            continue;
        }
        emit_glyph(device, font, rune.codepoint, pen, scale, tint);
        let advance = match font.data.glyph_or_replacement(rune.codepoint) {
            Some(g) if g.advance_x > 0.0 => g.advance_x,
            Some(g) => g.width + g.offset_x,
            None => 0.0,
        };
        pen.x += advance * scale + spacing;
    }
}

impl Context {
    /// Draw with the default font.
    pub fn draw_text(
        &mut self,
        text: &str,
        position: Vec2,
        font_size: f32,
        spacing: f32,
        tint: Color,
    ) {
        emit_text(
            self.device.as_mut(),
            &self.default_font,
            text,
            position,
            font_size,
            spacing,
            tint,
        );
    }

    pub fn draw_text_ex(
        &mut self,
        font: &Font,
        text: &str,
        position: Vec2,
        font_size: f32,
        spacing: f32,
        tint: Color,
    ) {
        emit_text(
            self.device.as_mut(),
            font,
            text,
            position,
            font_size,
            spacing,
            tint,
        );
    }

    /// Word-wrapped drawing inside `rect`, sharing the measurement state
    /// machine.
    pub fn draw_text_rect(
        &mut self,
        font: &Font,
        text: &str,
        rect: Rect,
        font_size: f32,
        spacing: f32,
        word_wrap: bool,
        tint: Color,
    ) {
        let scale = font_size / font.data.base_size;
        let layout = layout_text_rect(&font.data, text, rect, font_size, spacing, word_wrap);
        for placed in &layout.glyphs {
            emit_glyph(
                self.device.as_mut(),
                font,
                placed.codepoint,
                Vec2::new(placed.x, placed.y),
                scale,
                tint,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RecordingDevice;

    fn test_context() -> Context {
        Context::new(Box::new(RecordingDevice::new()), 800, 600).unwrap()
    }

    #[test]
    fn test_draw_text_emits_quads_per_visible_glyph() {
        let mut context = test_context();
        context.draw_text("Hi", Vec2::new(10.0, 20.0), 10.0, 1.0, Color::WHITE);
        context.end();

        let device = context.into_recording();
        // Two glyphs, four vertices each
        assert_eq!(device.draws[0].vertices.len(), 8);
        // First quad sits at the pen origin ('H' has no offsets)
        assert_eq!(device.draws[0].vertices[0].position, [10.0, 20.0, 0.0]);
        // Second glyph starts after advance 3 + spacing 1
        assert_eq!(device.draws[0].vertices[4].position, [14.0, 20.0, 0.0]);
    }

    #[test]
    fn test_spaces_emit_no_quads() {
        let mut context = test_context();
        context.draw_text("a a", Vec2::ZERO, 10.0, 0.0, Color::WHITE);
        context.end();

        let device = context.into_recording();
        assert_eq!(device.draws[0].vertices.len(), 8, "space glyph has no ink");
    }

    #[test]
    fn test_newline_moves_pen_down() {
        let mut context = test_context();
        context.draw_text("H\nH", Vec2::ZERO, 10.0, 1.0, Color::WHITE);
        context.end();

        let device = context.into_recording();
        let v = &device.draws[0].vertices;
        assert_eq!(v[0].position, [0.0, 0.0, 0.0]);
        // Second 'H' is one 1.5x line advance down, x reset
        assert_eq!(v[4].position, [0.0, 15.0, 0.0]);
    }

    #[test]
    fn test_unknown_codepoint_renders_replacement_glyph() {
        let mut context = test_context();
        context.draw_text("✓", Vec2::ZERO, 10.0, 1.0, Color::WHITE);
        context.end();

        let device = context.into_recording();
        // The default font has no check mark; the '?' glyph stands in
        assert_eq!(device.draws[0].vertices.len(), 4);
    }

    #[test]
    fn test_scaled_text_scales_quads() {
        let mut context = test_context();
        context.draw_text("H", Vec2::ZERO, 20.0, 0.0, Color::WHITE);
        context.end();

        let device = context.into_recording();
        let v = &device.draws[0].vertices;
        // 'H' is 3x10 at base size; at scale 2 the quad is 6x20
        assert_eq!(v[2].position, [6.0, 20.0, 0.0]);
    }

    #[test]
    fn test_wrapped_draw_places_lines() {
        let mut context = test_context();
        let font = context.default_font.clone();
        context.draw_text_rect(
            &font,
            "HH HH",
            Rect::new(0.0, 0.0, 9.0, 100.0),
            10.0,
            1.0,
            true,
            Color::WHITE,
        );
        context.end();

        let device = context.into_recording();
        // Four 'H' glyphs drawn, space consumed at the break
        assert_eq!(device.draws[0].vertices.len(), 16);
        // Two on line 0, two on line 1 (15px down)
        let ys: Vec<f32> = device.draws[0]
            .vertices
            .iter()
            .step_by(4)
            .map(|v| v.position[1])
            .collect();
        assert_eq!(ys, vec![0.0, 0.0, 15.0, 15.0]);
    }
}
