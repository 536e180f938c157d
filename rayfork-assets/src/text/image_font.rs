//! Bitmap-font extraction by color-key scanning.

use crate::color::Color;
use crate::error::{Error, Result};
use crate::image::Image;
use crate::text::font::{clear_key_color, Font, GlyphInfo};

/// Extract a font from a glyph sheet keyed by `key`.
///
/// The first non-key pixel gives the cell spacing offsets (`char_spacing`,
/// `line_spacing`); the vertical run of non-key pixels below it gives the
/// glyph height. Cells are walked left to right, top to bottom; each
/// glyph's width is the horizontal run until the next key pixel.
/// Codepoints are assigned sequentially from `first_codepoint`.
pub fn font_from_image(image: &Image, key: Color, first_codepoint: char) -> Result<Font> {
    let pixels = image.to_colors()?;
    let (w, h) = (image.width as usize, image.height as usize);
    let at = |x: usize, y: usize| pixels[y * w + x];
    let is_key = |c: Color| c.eq_rgb(key);

    // First non-key pixel fixes the padding offsets
    let mut origin = None;
    'scan: for y in 0..h {
        for x in 0..w {
            if !is_key(at(x, y)) {
                origin = Some((x, y));
                break 'scan;
            }
        }
    }
    let Some((char_spacing, line_spacing)) = origin else {
        return Err(Error::BadArgument("no glyph pixels found in font image"));
    };

    // Glyph height: vertical run of non-key pixels at the first glyph column
    let mut char_height = 0;
    while line_spacing + char_height < h && !is_key(at(char_spacing, line_spacing + char_height)) {
        char_height += 1;
    }
    if char_height == 0 {
        return Err(Error::BadArgument("could not measure glyph height"));
    }

    // Walk cells row by row
    let mut glyphs = Vec::new();
    let mut next_codepoint = first_codepoint as u32;
    let mut y = line_spacing;
    while y + char_height <= h {
        let mut x = 0;
        while x < w {
            if is_key(at(x, y)) {
                x += 1;
                continue;
            }
            // Horizontal run until the next key pixel
            let start = x;
            while x < w && !is_key(at(x, y)) {
                x += 1;
            }
            glyphs.push(GlyphInfo {
                codepoint: char::from_u32(next_codepoint)
                    .ok_or(Error::BadArgument("codepoint overflow in font image"))?,
                x: start as f32,
                y: y as f32,
                width: (x - start) as f32,
                height: char_height as f32,
                offset_x: 0.0,
                offset_y: 0.0,
                advance_x: 0.0,
            });
            next_codepoint += 1;
        }
        y += char_height + line_spacing;
    }

    if glyphs.is_empty() {
        return Err(Error::BadArgument("no glyphs extracted from font image"));
    }

    // Key pixels become transparent in the atlas
    let mut atlas = image.to_format(crate::pixel_format::PixelFormat::R8G8B8A8)?;
    clear_key_color(&mut atlas, key)?;

    tracing::debug!(
        "extracted image font: {} glyphs, height {}",
        glyphs.len(),
        char_height
    );
    Ok(Font {
        atlas,
        glyphs,
        base_size: char_height as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a sheet with glyphs of the given widths on a magenta key,
    /// 1px spacing, glyph height 3.
    fn build_sheet(widths: &[u32]) -> Image {
        let key = Color::MAGENTA;
        let total: u32 = widths.iter().map(|w| w + 1).sum::<u32>() + 1;
        let mut img = Image::gen_color(total, 5, key).unwrap();
        let mut x = 1;
        for &w in widths {
            for gy in 1..4 {
                for gx in x..x + w {
                    img.set_pixel(gx, gy, Color::WHITE).unwrap();
                }
            }
            x += w + 1;
        }
        img
    }

    #[test]
    fn test_extracts_widths_and_height() {
        let sheet = build_sheet(&[3, 2, 4]);
        let font = font_from_image(&sheet, Color::MAGENTA, 'A').unwrap();

        assert_eq!(font.base_size, 3.0);
        assert_eq!(font.glyphs.len(), 3);
        assert_eq!(font.glyphs[0].codepoint, 'A');
        assert_eq!(font.glyphs[1].codepoint, 'B');
        assert_eq!(font.glyphs[0].width, 3.0);
        assert_eq!(font.glyphs[1].width, 2.0);
        assert_eq!(font.glyphs[2].width, 4.0);
    }

    #[test]
    fn test_key_color_becomes_transparent() {
        let sheet = build_sheet(&[2]);
        let font = font_from_image(&sheet, Color::MAGENTA, 'A').unwrap();
        assert_eq!(font.atlas.get_pixel(0, 0).unwrap().a, 0);
        let g = &font.glyphs[0];
        assert_eq!(
            font.atlas.get_pixel(g.x as u32, g.y as u32).unwrap(),
            Color::WHITE
        );
    }

    #[test]
    fn test_all_key_image_errors() {
        let img = Image::gen_color(8, 8, Color::MAGENTA).unwrap();
        assert!(font_from_image(&img, Color::MAGENTA, 'A').is_err());
    }
}
