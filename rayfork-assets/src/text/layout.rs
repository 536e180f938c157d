//! Text measurement and rectangle-aware wrapping.
//!
//! Wrapping and measuring share one code path: `layout_text_rect` runs a
//! two-state machine (find the break point, then emit the line) and returns
//! glyph placements plus the text extent. Measuring simply ignores the
//! placements.

use glam::Vec2;

use crate::math::Rect;
use crate::text::font::Font;
use crate::text::utf8;

/// One glyph with its resolved top-left position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub codepoint: char,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub glyphs: Vec<PlacedGlyph>,
    pub size: Vec2,
}

/// Horizontal advance of one glyph at base size. Fonts without explicit
/// advances (image fonts) fall back to `width + offset_x`.
fn glyph_advance(font: &Font, codepoint: char) -> f32 {
    match font.glyph_or_replacement(codepoint) {
        Some(g) if g.advance_x > 0.0 => g.advance_x,
        Some(g) => g.width + g.offset_x,
        None => 0.0,
    }
}

/// Measure unwrapped text. `\n` resets the cursor and advances the line by
/// `1.5 * base_size * scale`.
pub fn measure_text(font: &Font, text: &str, font_size: f32, spacing: f32) -> Vec2 {
    let scale = font_size / font.base_size;
    let line_advance = 1.5 * font.base_size * scale;

    let (mut x, mut y) = (0.0f32, 0.0f32);
    let mut max_x = 0.0f32;
    for rune in utf8::runes(text.as_bytes()) {
        if rune.codepoint == '\n' {
            x = 0.0;
            y += line_advance;
            continue;
        }
        x += glyph_advance(font, rune.codepoint) * scale + spacing;
        max_x = max_x.max(x - spacing);
    }
    Vec2::new(max_x, y + font.base_size * scale)
}

/// Lay text out inside `rect`, optionally word-wrapping at whitespace.
///
/// Per line the machine runs two states: find the break point (accumulate
/// width, remembering the last whitespace; on overflow rewind to it), then
/// emit the line's glyphs. Lines that would start below the rectangle are
/// dropped.
pub fn layout_text_rect(
    font: &Font,
    text: &str,
    rect: Rect,
    font_size: f32,
    spacing: f32,
    word_wrap: bool,
) -> TextLayout {
    let scale = font_size / font.base_size;
    let line_advance = 1.5 * font.base_size * scale;
    let glyph_height = font.base_size * scale;

    let runes: Vec<(char, f32)> = utf8::runes(text.as_bytes())
        .map(|r| (r.codepoint, glyph_advance(font, r.codepoint) * scale))
        .collect();

    let mut glyphs = Vec::new();
    let mut max_x = 0.0f32;
    let mut y = 0.0f32;
    let mut last_line_y = 0.0f32;
    let mut emitted_lines = 0u32;
    let mut line_start = 0usize;

    while line_start < runes.len() {
        if y + glyph_height > rect.height {
            break;
        }

        // State A (wrap-find): scan for the line end
        let mut width = 0.0f32;
        let mut last_space: Option<usize> = None;
        let mut end = runes.len();
        let mut k = line_start;
        while k < runes.len() {
            let (cp, adv) = runes[k];
            if cp == '\n' {
                end = k;
                break;
            }
            if cp == ' ' || cp == '\t' {
                last_space = Some(k);
            }
            let step = adv + if k > line_start { spacing } else { 0.0 };
            if width + step > rect.width && k > line_start {
                // Rewind to the last whitespace when word-wrapping
                end = if word_wrap {
                    last_space.unwrap_or(k)
                } else {
                    k
                };
                break;
            }
            width += step;
            k += 1;
        }

        // State B (emit): place the line's glyphs
        let mut x = 0.0f32;
        for &(cp, adv) in &runes[line_start..end] {
            glyphs.push(PlacedGlyph {
                codepoint: cp,
                x: rect.x + x,
                y: rect.y + y,
            });
            x += adv + spacing;
        }
        if end > line_start {
            max_x = max_x.max(x - spacing);
            last_line_y = y;
            emitted_lines += 1;
        }

        // The separator the line broke on is consumed, not carried over
        line_start = match runes.get(end) {
            Some(&(cp, _)) if cp == '\n' || cp == ' ' || cp == '\t' => end + 1,
            _ => end,
        };
        y += line_advance;
    }

    let height = if emitted_lines > 0 {
        last_line_y + glyph_height
    } else {
        0.0
    };
    TextLayout {
        glyphs,
        size: Vec2::new(max_x, height),
    }
}

/// Extent of wrapped text without drawing it.
pub fn measure_text_rect(
    font: &Font,
    text: &str,
    rect: Rect,
    font_size: f32,
    spacing: f32,
    word_wrap: bool,
) -> Vec2 {
    layout_text_rect(font, text, rect, font_size, spacing, word_wrap).size
}
