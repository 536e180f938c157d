//! TTF font loading: glyph rasterization via `fontdue`, square-atlas sizing
//! and simple-row packing.

use crate::error::{Error, Result};
use crate::image::Image;
use crate::math::next_pot;
use crate::pixel_format::PixelFormat;
use crate::text::font::{Font, GlyphInfo};

/// Pixels of padding around each glyph in the atlas.
pub const FONT_ATLAS_PADDING: u32 = 4;

/// Coverage below this clamps to zero when antialiasing is off.
const AA_OFF_THRESHOLD: u8 = 80;

/// Default codepoint set: printable ASCII (U+0020..U+007E).
fn default_codepoints() -> Vec<char> {
    (' '..='~').collect()
}

/// Atlas side: square, power of two, sized from the summed padded glyph
/// areas with a 1.3 slack factor.
fn atlas_side(total_padded_area: f32) -> u32 {
    next_pot((total_padded_area.sqrt().ceil() * 1.3).ceil() as u32)
}

/// Rasterize a TTF/OTF font into a gray+alpha atlas.
///
/// `codepoints` defaults to printable ASCII. With `antialias` off, low
/// coverage values clamp to zero for crisp 1-bit style glyphs.
pub fn font_from_ttf(
    data: &[u8],
    base_size: f32,
    codepoints: Option<&[char]>,
    antialias: bool,
) -> Result<Font> {
    if base_size <= 0.0 {
        return Err(Error::BadArgument("font size must be positive"));
    }
    let font = fontdue::Font::from_bytes(data, fontdue::FontSettings::default()).map_err(|e| {
        Error::Decode {
            library: "fontdue",
            reason: e.to_string(),
        }
    })?;

    let owned;
    let codepoints = match codepoints {
        Some(cps) => cps,
        None => {
            owned = default_codepoints();
            &owned
        }
    };
    if codepoints.is_empty() {
        return Err(Error::BadArgument("empty codepoint set"));
    }

    let ascent = font
        .horizontal_line_metrics(base_size)
        .map(|m| m.ascent)
        .unwrap_or(base_size);

    // Metrics pass: padded area sum drives the atlas size
    let padding = FONT_ATLAS_PADDING;
    let mut total_area = 0.0f32;
    for &cp in codepoints {
        let m = font.metrics(cp, base_size);
        total_area += (m.width as u32 + 2 * padding) as f32 * (m.height as u32 + 2 * padding) as f32;
    }
    let side = atlas_side(total_area);

    // Gray+alpha atlas: luma fixed at 255, alpha carries coverage
    let mut atlas_data = vec![0u8; PixelFormat::GrayAlpha.buffer_size(side, side)];
    for px in atlas_data.chunks_exact_mut(2) {
        px[0] = 255;
    }

    // Simple-row packing
    let mut glyphs = Vec::with_capacity(codepoints.len());
    let (mut x, mut y) = (padding, padding);
    for &cp in codepoints {
        let (metrics, coverage) = font.rasterize(cp, base_size);
        let (w, h) = (metrics.width as u32, metrics.height as u32);

        if x + w + 2 * padding > side {
            x = padding;
            y += base_size as u32 + padding;
        }
        if y + h > side {
            tracing::warn!("font atlas full, dropping glyphs from {:?}", cp);
            break;
        }

        for gy in 0..h {
            for gx in 0..w {
                let mut v = coverage[(gy * w + gx) as usize];
                if !antialias && v < AA_OFF_THRESHOLD {
                    v = 0;
                }
                let offset = (((y + gy) * side + x + gx) * 2 + 1) as usize;
                atlas_data[offset] = v;
            }
        }

        glyphs.push(GlyphInfo {
            codepoint: cp,
            x: x as f32,
            y: y as f32,
            width: w as f32,
            height: h as f32,
            offset_x: metrics.xmin as f32,
            offset_y: ascent - (metrics.ymin as f32 + h as f32),
            advance_x: metrics.advance_width,
        });
        x += w + 2 * padding;
    }

    tracing::debug!(
        "built font atlas: {}x{}, {} glyphs at {}px",
        side,
        side,
        glyphs.len(),
        base_size
    );
    Ok(Font {
        atlas: Image::from_raw(atlas_data, side, side, PixelFormat::GrayAlpha)?,
        glyphs,
        base_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atlas_side_is_power_of_two() {
        for area in [10.0, 100.0, 5000.0, 123456.0] {
            let side = atlas_side(area);
            assert!(side.is_power_of_two());
            // Property: least power of two >= ceil(sqrt(area * 1.69))
            let lower = (area * 1.69).sqrt().ceil() as u32;
            assert!(side >= lower);
            assert!(side / 2 < lower.max(2), "side {} not minimal for {}", side, area);
        }
    }

    #[test]
    fn test_default_codepoint_set() {
        let cps = default_codepoints();
        assert_eq!(cps.len(), 95);
        assert_eq!(*cps.first().unwrap(), ' ');
        assert_eq!(*cps.last().unwrap(), '~');
    }

    #[test]
    fn test_rejects_garbage_font_data() {
        assert!(font_from_ttf(&[1, 2, 3, 4], 16.0, None, true).is_err());
    }

    #[test]
    fn test_rejects_bad_size() {
        assert!(font_from_ttf(&[], 0.0, None, true).is_err());
    }
}
