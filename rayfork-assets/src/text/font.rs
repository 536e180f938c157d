//! Font and glyph entities, plus the embedded default font.

use crate::color::Color;
use crate::error::Result;
use crate::image::Image;
use crate::pixel_format::PixelFormat;
use crate::text::default_font_data::{
    DEFAULT_FONT_ATLAS_SIDE, DEFAULT_FONT_BASE_SIZE, DEFAULT_FONT_BITMAP,
    DEFAULT_FONT_FIRST_CODEPOINT, DEFAULT_FONT_GLYPH_COUNT, DEFAULT_FONT_WIDTHS,
};
use crate::text::utf8::REPLACEMENT;

/// One renderable glyph: a rectangle inside the font atlas plus layout
/// metrics in the font's base-size coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphInfo {
    pub codepoint: char,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub advance_x: f32,
}

/// CPU-side font: glyph atlas image plus metrics.
///
/// `base_size` is the pixel height the metrics were computed at; layout
/// scales everything by `font_size / base_size`.
#[derive(Debug, Clone)]
pub struct Font {
    pub atlas: Image,
    pub glyphs: Vec<GlyphInfo>,
    pub base_size: f32,
}

impl Font {
    /// Linear search by codepoint.
    pub fn glyph(&self, codepoint: char) -> Option<&GlyphInfo> {
        self.glyphs.iter().find(|g| g.codepoint == codepoint)
    }

    /// Lookup with fallback to the replacement glyph.
    pub fn glyph_or_replacement(&self, codepoint: char) -> Option<&GlyphInfo> {
        self.glyph(codepoint).or_else(|| self.glyph(REPLACEMENT))
    }

    /// Reconstruct the embedded default font: a 128x128 1-bit atlas packed
    /// into 512 words, 224 glyphs from codepoint 32, base size 10.
    ///
    /// The atlas expands to gray+alpha (luma always 255, alpha carries the
    /// bit) so it uploads like any other font texture.
    pub fn default_font() -> Result<Font> {
        let side = DEFAULT_FONT_ATLAS_SIDE;
        let mut data = vec![0u8; PixelFormat::GrayAlpha.buffer_size(side, side)];
        for i in 0..(side * side) as usize {
            let bit = (DEFAULT_FONT_BITMAP[i / 32] >> (i % 32)) & 1;
            data[i * 2] = 255;
            data[i * 2 + 1] = if bit != 0 { 255 } else { 0 };
        }
        let atlas = Image::from_raw(data, side, side, PixelFormat::GrayAlpha)?;

        // Same layout walk the bitmap was generated with: left to right,
        // 1-pixel gap, 10-pixel rows
        let row_height = DEFAULT_FONT_BASE_SIZE;
        let mut glyphs = Vec::with_capacity(DEFAULT_FONT_GLYPH_COUNT);
        let (mut x, mut y) = (0u32, 0u32);
        for (i, &width) in DEFAULT_FONT_WIDTHS.iter().enumerate() {
            let codepoint = char::from_u32(DEFAULT_FONT_FIRST_CODEPOINT + i as u32)
                .unwrap_or(REPLACEMENT);
            if x + width as u32 > side {
                x = 0;
                y += row_height;
            }
            glyphs.push(GlyphInfo {
                codepoint,
                x: x as f32,
                y: y as f32,
                width: width as f32,
                height: row_height as f32,
                offset_x: 0.0,
                offset_y: 0.0,
                advance_x: 0.0, // layout falls back to width + offset_x
            });
            x += width as u32 + 1;
        }

        Ok(Font {
            atlas,
            glyphs,
            base_size: DEFAULT_FONT_BASE_SIZE as f32,
        })
    }
}

/// Strip the key color out of an extracted font atlas.
pub(crate) fn clear_key_color(atlas: &mut Image, key: Color) -> Result<()> {
    atlas.replace_color(key, Color::BLANK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_font_shape() {
        let font = Font::default_font().unwrap();
        assert_eq!(font.base_size, 10.0);
        assert_eq!(font.glyphs.len(), 224);
        assert_eq!(font.atlas.format, PixelFormat::GrayAlpha);
        assert_eq!((font.atlas.width, font.atlas.height), (128, 128));
        assert_eq!(font.glyphs[0].codepoint, ' ');
    }

    #[test]
    fn test_default_font_known_widths() {
        let font = Font::default_font().unwrap();
        assert_eq!(font.glyph('H').unwrap().width, 3.0);
        assert_eq!(font.glyph('i').unwrap().width, 2.0);
    }

    #[test]
    fn test_glyphs_fit_in_atlas() {
        let font = Font::default_font().unwrap();
        for g in &font.glyphs {
            assert!(g.x + g.width <= 128.0, "glyph {:?} sticks out", g.codepoint);
            assert!(g.y + g.height <= 128.0);
        }
    }

    #[test]
    fn test_glyph_pixels_have_coverage() {
        // 'H' has ink; its atlas rectangle must contain set alpha bytes
        let font = Font::default_font().unwrap();
        let g = *font.glyph('H').unwrap();
        let mut covered = 0;
        for y in g.y as u32..(g.y + g.height) as u32 {
            for x in g.x as u32..(g.x + g.width) as u32 {
                if font.atlas.get_pixel(x, y).unwrap().a > 0 {
                    covered += 1;
                }
            }
        }
        assert!(covered > 5, "expected ink in 'H', found {} pixels", covered);
    }

    #[test]
    fn test_lookup_falls_back_to_replacement() {
        let font = Font::default_font().unwrap();
        let fallback = font.glyph_or_replacement('✓').unwrap();
        assert_eq!(fallback.codepoint, '?');
    }
}
