//! Pixel formats and the conversion engine.
//!
//! Conversions form a star: every uncompressed format decodes to a
//! normalized RGBA float pivot (or to [`Color`], the RGBA8 pivot) and the
//! pivot encodes to every uncompressed destination. Compressed formats are
//! opaque blobs that only ever pass through to the GPU with their tag;
//! nothing here decodes them.
//!
//! Bit-exact packings:
//! ```text
//! R5G6B5:   rrrrrggg gggbbbbb   (stored as one little-endian u16)
//! R5G5B5A1: rrrrrggg ggbbbbba   (alpha thresholded at 50/255)
//! R4G4B4A4: rrrrgggg bbbbaaaa
//! ```
//! Grayscale encoding uses BT.601 luma. Channel quantization rounds to
//! nearest (`round(v * 31)` for 5-bit, etc.).

use glam::Vec4;

use crate::color::Color;
use crate::error::{Error, Result};

/// Alpha at or below this normalized threshold packs to a 0 bit in R5G5B5A1.
pub const ALPHA_1BIT_THRESHOLD: f32 = 50.0 / 255.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    // Uncompressed
    Grayscale,
    GrayAlpha,
    R5G6B5,
    R8G8B8,
    R5G5B5A1,
    R4G4B4A4,
    R8G8B8A8,
    R32,
    R32G32B32,
    R32G32B32A32,
    // Compressed (opaque blobs)
    Dxt1Rgb,
    Dxt1Rgba,
    Dxt3Rgba,
    Dxt5Rgba,
    Etc1Rgb,
    Etc2Rgb,
    Etc2EacRgba,
    Pvrt,
    Astc4x4,
    Astc8x8,
}

impl PixelFormat {
    pub const UNCOMPRESSED: [PixelFormat; 10] = [
        PixelFormat::Grayscale,
        PixelFormat::GrayAlpha,
        PixelFormat::R5G6B5,
        PixelFormat::R8G8B8,
        PixelFormat::R5G5B5A1,
        PixelFormat::R4G4B4A4,
        PixelFormat::R8G8B8A8,
        PixelFormat::R32,
        PixelFormat::R32G32B32,
        PixelFormat::R32G32B32A32,
    ];

    #[inline]
    pub fn is_compressed(self) -> bool {
        !matches!(
            self,
            PixelFormat::Grayscale
                | PixelFormat::GrayAlpha
                | PixelFormat::R5G6B5
                | PixelFormat::R8G8B8
                | PixelFormat::R5G5B5A1
                | PixelFormat::R4G4B4A4
                | PixelFormat::R8G8B8A8
                | PixelFormat::R32
                | PixelFormat::R32G32B32
                | PixelFormat::R32G32B32A32
        )
    }

    /// Storage cost per pixel in bits. Pure table.
    #[inline]
    pub fn bits_per_pixel(self) -> usize {
        match self {
            PixelFormat::Grayscale => 8,
            PixelFormat::GrayAlpha => 16,
            PixelFormat::R5G6B5 => 16,
            PixelFormat::R8G8B8 => 24,
            PixelFormat::R5G5B5A1 => 16,
            PixelFormat::R4G4B4A4 => 16,
            PixelFormat::R8G8B8A8 => 32,
            PixelFormat::R32 => 32,
            PixelFormat::R32G32B32 => 96,
            PixelFormat::R32G32B32A32 => 128,
            PixelFormat::Dxt1Rgb | PixelFormat::Dxt1Rgba => 4,
            PixelFormat::Dxt3Rgba | PixelFormat::Dxt5Rgba => 8,
            PixelFormat::Etc1Rgb | PixelFormat::Etc2Rgb => 4,
            PixelFormat::Etc2EacRgba => 8,
            PixelFormat::Pvrt => 4,
            PixelFormat::Astc4x4 => 8,
            PixelFormat::Astc8x8 => 2,
        }
    }

    /// Storage cost per pixel in bytes. Not defined for block-compressed formats.
    #[inline]
    pub fn bytes_per_pixel(self) -> Option<usize> {
        if self.is_compressed() {
            None
        } else {
            Some(self.bits_per_pixel() / 8)
        }
    }

    /// Total byte size of a `width × height` buffer in this format.
    #[inline]
    pub fn buffer_size(self, width: u32, height: u32) -> usize {
        (width as usize * height as usize * self.bits_per_pixel()).div_ceil(8)
    }
}

// ============================================================================
// Single-pixel codecs
// ============================================================================

/// Decode one pixel into the normalized RGBA float pivot.
///
/// `src` must hold at least one pixel of `format`; missing channels decode
/// as 0 (color) / 1 (alpha).
pub fn decode_pixel_normalized(src: &[u8], format: PixelFormat) -> Result<Vec4> {
    let bpp = format
        .bytes_per_pixel()
        .ok_or(Error::CompressedFormat(format))?;
    if src.len() < bpp {
        return Err(Error::BufferTooSmall {
            needed: bpp,
            got: src.len(),
        });
    }

    Ok(match format {
        PixelFormat::Grayscale => {
            let g = src[0] as f32 / 255.0;
            Vec4::new(g, g, g, 1.0)
        }
        PixelFormat::GrayAlpha => {
            let g = src[0] as f32 / 255.0;
            Vec4::new(g, g, g, src[1] as f32 / 255.0)
        }
        PixelFormat::R5G6B5 => {
            let v = u16::from_le_bytes([src[0], src[1]]);
            Vec4::new(
                ((v >> 11) & 0x1f) as f32 / 31.0,
                ((v >> 5) & 0x3f) as f32 / 63.0,
                (v & 0x1f) as f32 / 31.0,
                1.0,
            )
        }
        PixelFormat::R8G8B8 => Vec4::new(
            src[0] as f32 / 255.0,
            src[1] as f32 / 255.0,
            src[2] as f32 / 255.0,
            1.0,
        ),
        PixelFormat::R5G5B5A1 => {
            let v = u16::from_le_bytes([src[0], src[1]]);
            Vec4::new(
                ((v >> 11) & 0x1f) as f32 / 31.0,
                ((v >> 6) & 0x1f) as f32 / 31.0,
                ((v >> 1) & 0x1f) as f32 / 31.0,
                (v & 0x1) as f32,
            )
        }
        PixelFormat::R4G4B4A4 => {
            let v = u16::from_le_bytes([src[0], src[1]]);
            Vec4::new(
                ((v >> 12) & 0xf) as f32 / 15.0,
                ((v >> 8) & 0xf) as f32 / 15.0,
                ((v >> 4) & 0xf) as f32 / 15.0,
                (v & 0xf) as f32 / 15.0,
            )
        }
        PixelFormat::R8G8B8A8 => Vec4::new(
            src[0] as f32 / 255.0,
            src[1] as f32 / 255.0,
            src[2] as f32 / 255.0,
            src[3] as f32 / 255.0,
        ),
        PixelFormat::R32 => {
            let r = f32::from_le_bytes([src[0], src[1], src[2], src[3]]);
            Vec4::new(r, 0.0, 0.0, 1.0)
        }
        PixelFormat::R32G32B32 => Vec4::new(
            f32::from_le_bytes([src[0], src[1], src[2], src[3]]),
            f32::from_le_bytes([src[4], src[5], src[6], src[7]]),
            f32::from_le_bytes([src[8], src[9], src[10], src[11]]),
            1.0,
        ),
        PixelFormat::R32G32B32A32 => Vec4::new(
            f32::from_le_bytes([src[0], src[1], src[2], src[3]]),
            f32::from_le_bytes([src[4], src[5], src[6], src[7]]),
            f32::from_le_bytes([src[8], src[9], src[10], src[11]]),
            f32::from_le_bytes([src[12], src[13], src[14], src[15]]),
        ),
        _ => unreachable!("compressed formats rejected above"),
    })
}

/// Encode one normalized RGBA pixel into `dst`.
pub fn encode_pixel_normalized(dst: &mut [u8], format: PixelFormat, value: Vec4) -> Result<()> {
    let bpp = format
        .bytes_per_pixel()
        .ok_or(Error::CompressedFormat(format))?;
    if dst.len() < bpp {
        return Err(Error::BufferTooSmall {
            needed: bpp,
            got: dst.len(),
        });
    }

    #[inline]
    fn quant(v: f32, max: f32) -> u16 {
        (v.clamp(0.0, 1.0) * max).round() as u16
    }
    // Luma per BT.601
    #[inline]
    fn luma(v: Vec4) -> f32 {
        0.299 * v.x + 0.587 * v.y + 0.114 * v.z
    }

    match format {
        PixelFormat::Grayscale => {
            dst[0] = quant(luma(value), 255.0) as u8;
        }
        PixelFormat::GrayAlpha => {
            dst[0] = quant(luma(value), 255.0) as u8;
            dst[1] = quant(value.w, 255.0) as u8;
        }
        PixelFormat::R5G6B5 => {
            let v = (quant(value.x, 31.0) << 11) | (quant(value.y, 63.0) << 5) | quant(value.z, 31.0);
            dst[0..2].copy_from_slice(&v.to_le_bytes());
        }
        PixelFormat::R8G8B8 => {
            dst[0] = quant(value.x, 255.0) as u8;
            dst[1] = quant(value.y, 255.0) as u8;
            dst[2] = quant(value.z, 255.0) as u8;
        }
        PixelFormat::R5G5B5A1 => {
            let a = (value.w > ALPHA_1BIT_THRESHOLD) as u16;
            let v = (quant(value.x, 31.0) << 11)
                | (quant(value.y, 31.0) << 6)
                | (quant(value.z, 31.0) << 1)
                | a;
            dst[0..2].copy_from_slice(&v.to_le_bytes());
        }
        PixelFormat::R4G4B4A4 => {
            let v = (quant(value.x, 15.0) << 12)
                | (quant(value.y, 15.0) << 8)
                | (quant(value.z, 15.0) << 4)
                | quant(value.w, 15.0);
            dst[0..2].copy_from_slice(&v.to_le_bytes());
        }
        PixelFormat::R8G8B8A8 => {
            dst[0] = quant(value.x, 255.0) as u8;
            dst[1] = quant(value.y, 255.0) as u8;
            dst[2] = quant(value.z, 255.0) as u8;
            dst[3] = quant(value.w, 255.0) as u8;
        }
        PixelFormat::R32 => {
            dst[0..4].copy_from_slice(&value.x.to_le_bytes());
        }
        PixelFormat::R32G32B32 => {
            dst[0..4].copy_from_slice(&value.x.to_le_bytes());
            dst[4..8].copy_from_slice(&value.y.to_le_bytes());
            dst[8..12].copy_from_slice(&value.z.to_le_bytes());
        }
        PixelFormat::R32G32B32A32 => {
            dst[0..4].copy_from_slice(&value.x.to_le_bytes());
            dst[4..8].copy_from_slice(&value.y.to_le_bytes());
            dst[8..12].copy_from_slice(&value.z.to_le_bytes());
            dst[12..16].copy_from_slice(&value.w.to_le_bytes());
        }
        _ => unreachable!("compressed formats rejected above"),
    }
    Ok(())
}

/// Decode one pixel into the RGBA8 pivot.
#[inline]
pub fn decode_pixel(src: &[u8], format: PixelFormat) -> Result<Color> {
    if format == PixelFormat::R8G8B8A8 {
        if src.len() < 4 {
            return Err(Error::BufferTooSmall {
                needed: 4,
                got: src.len(),
            });
        }
        return Ok(Color::new(src[0], src[1], src[2], src[3]));
    }
    Ok(Color::from_normalized(decode_pixel_normalized(src, format)?))
}

/// Encode one RGBA8 pixel.
#[inline]
pub fn encode_pixel(dst: &mut [u8], format: PixelFormat, color: Color) -> Result<()> {
    encode_pixel_normalized(dst, format, color.normalize())
}

// ============================================================================
// Bulk conversion
// ============================================================================

/// Convert a whole pixel buffer between two uncompressed formats.
///
/// `src` must be a whole number of pixels; `dst` must hold at least as many
/// pixels in the destination format. Same-format conversion is a straight
/// copy; everything else pivots through normalized RGBA per pixel.
pub fn format_pixels(
    src: &[u8],
    src_format: PixelFormat,
    dst: &mut [u8],
    dst_format: PixelFormat,
) -> Result<()> {
    let src_bpp = src_format
        .bytes_per_pixel()
        .ok_or(Error::CompressedFormat(src_format))?;
    let dst_bpp = dst_format
        .bytes_per_pixel()
        .ok_or(Error::CompressedFormat(dst_format))?;

    if src.len() % src_bpp != 0 {
        return Err(Error::BadArgument("source is not a whole number of pixels"));
    }
    let count = src.len() / src_bpp;
    if dst.len() < count * dst_bpp {
        return Err(Error::BufferTooSmall {
            needed: count * dst_bpp,
            got: dst.len(),
        });
    }

    if src_format == dst_format {
        dst[..src.len()].copy_from_slice(src);
        return Ok(());
    }

    for i in 0..count {
        let pixel = decode_pixel_normalized(&src[i * src_bpp..], src_format)?;
        encode_pixel_normalized(&mut dst[i * dst_bpp..], dst_format, pixel)?;
    }
    Ok(())
}

/// Decode a whole buffer into RGBA8 colors.
pub fn decode_pixels_to_rgba32(src: &[u8], format: PixelFormat) -> Result<Vec<Color>> {
    let bpp = format
        .bytes_per_pixel()
        .ok_or(Error::CompressedFormat(format))?;
    if src.len() % bpp != 0 {
        return Err(Error::BadArgument("source is not a whole number of pixels"));
    }
    let count = src.len() / bpp;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        out.push(decode_pixel(&src[i * bpp..], format)?);
    }
    Ok(out)
}

/// Encode RGBA8 colors into a destination buffer.
pub fn encode_pixels_from_rgba32(
    pixels: &[Color],
    dst: &mut [u8],
    format: PixelFormat,
) -> Result<()> {
    format_pixels(
        bytemuck::cast_slice(pixels),
        PixelFormat::R8G8B8A8,
        dst,
        format,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_per_pixel_table() {
        assert_eq!(PixelFormat::Grayscale.bits_per_pixel(), 8);
        assert_eq!(PixelFormat::R5G6B5.bits_per_pixel(), 16);
        assert_eq!(PixelFormat::R8G8B8A8.bits_per_pixel(), 32);
        assert_eq!(PixelFormat::R32G32B32A32.bits_per_pixel(), 128);
        assert_eq!(PixelFormat::Dxt1Rgb.bits_per_pixel(), 4);
        assert_eq!(PixelFormat::Astc8x8.bits_per_pixel(), 2);
    }

    #[test]
    fn test_bytes_per_pixel_only_uncompressed() {
        assert_eq!(PixelFormat::R8G8B8.bytes_per_pixel(), Some(3));
        assert_eq!(PixelFormat::Dxt5Rgba.bytes_per_pixel(), None);
    }

    #[test]
    fn test_buffer_size() {
        assert_eq!(PixelFormat::R8G8B8A8.buffer_size(16, 16), 16 * 16 * 4);
        assert_eq!(PixelFormat::Grayscale.buffer_size(3, 3), 9);
        // 4 bpp compressed: half a byte per pixel
        assert_eq!(PixelFormat::Dxt1Rgb.buffer_size(64, 64), 64 * 64 / 2);
    }

    #[test]
    fn test_roundtrip_exact_formats() {
        // Formats that reproduce any 8-bit RGB(A) value exactly
        let color = Color::new(13, 77, 201, 255);
        for format in [
            PixelFormat::R8G8B8,
            PixelFormat::R8G8B8A8,
            PixelFormat::R32G32B32,
            PixelFormat::R32G32B32A32,
        ] {
            let mut buf = [0u8; 16];
            encode_pixel(&mut buf, format, color).unwrap();
            let back = decode_pixel(&buf, format).unwrap();
            assert_eq!(back, color, "format {:?}", format);
        }
    }

    #[test]
    fn test_roundtrip_all_uncompressed_with_quantization() {
        let colors = [
            Color::new(0, 0, 0, 255),
            Color::new(255, 255, 255, 255),
            Color::new(128, 64, 192, 255),
        ];
        for format in PixelFormat::UNCOMPRESSED {
            // Step size of the narrowest channel of the format
            let tolerance = match format {
                PixelFormat::R5G6B5 | PixelFormat::R5G5B5A1 => 255 / 31 + 1,
                PixelFormat::R4G4B4A4 => 255 / 15 + 1,
                PixelFormat::Grayscale | PixelFormat::GrayAlpha | PixelFormat::R32 => continue,
                _ => 0,
            };
            for color in colors {
                let mut buf = [0u8; 16];
                encode_pixel(&mut buf, format, color).unwrap();
                let back = decode_pixel(&buf, format).unwrap();
                assert!(
                    (back.r as i32 - color.r as i32).abs() <= tolerance
                        && (back.g as i32 - color.g as i32).abs() <= tolerance
                        && (back.b as i32 - color.b as i32).abs() <= tolerance,
                    "format {:?}: {:?} -> {:?}",
                    format,
                    color,
                    back
                );
            }
        }
    }

    #[test]
    fn test_grayscale_uses_luma() {
        let mut buf = [0u8; 1];
        encode_pixel(&mut buf, PixelFormat::Grayscale, Color::rgb(0, 255, 0)).unwrap();
        assert_eq!(buf[0], 150); // 0.587 * 255, rounded
    }

    #[test]
    fn test_r5g6b5_packing_is_bit_exact() {
        let mut buf = [0u8; 2];
        // Pure red: r=31, g=0, b=0 -> 1111 1000 0000 0000
        encode_pixel(&mut buf, PixelFormat::R5G6B5, Color::rgb(255, 0, 0)).unwrap();
        assert_eq!(u16::from_le_bytes(buf), 0xf800);

        // Pure green: g=63 -> 0000 0111 1110 0000
        encode_pixel(&mut buf, PixelFormat::R5G6B5, Color::rgb(0, 255, 0)).unwrap();
        assert_eq!(u16::from_le_bytes(buf), 0x07e0);
    }

    #[test]
    fn test_r5g5b5a1_alpha_threshold() {
        let mut buf = [0u8; 2];

        encode_pixel(&mut buf, PixelFormat::R5G5B5A1, Color::new(0, 0, 0, 50)).unwrap();
        assert_eq!(u16::from_le_bytes(buf) & 1, 0, "alpha 50 is at the threshold");

        encode_pixel(&mut buf, PixelFormat::R5G5B5A1, Color::new(0, 0, 0, 51)).unwrap();
        assert_eq!(u16::from_le_bytes(buf) & 1, 1, "alpha 51 is above the threshold");
    }

    #[test]
    fn test_format_pixels_star_roundtrip() {
        // RGBA32 -> F -> RGBA32 for every uncompressed F, on values every
        // format can represent (black/white, opaque).
        let src: Vec<u8> = [Color::BLACK, Color::WHITE, Color::WHITE, Color::BLACK]
            .iter()
            .flat_map(|c| [c.r, c.g, c.b, c.a])
            .collect();

        for format in PixelFormat::UNCOMPRESSED {
            if format == PixelFormat::R32 {
                continue; // single-channel float keeps red only
            }
            let mut tmp = vec![0u8; format.buffer_size(4, 1)];
            let mut back = vec![0u8; 16];
            format_pixels(&src, PixelFormat::R8G8B8A8, &mut tmp, format).unwrap();
            format_pixels(&tmp, format, &mut back, PixelFormat::R8G8B8A8).unwrap();
            assert_eq!(back, src, "format {:?}", format);
        }
    }

    #[test]
    fn test_format_pixels_rejects_compressed() {
        let src = [0u8; 8];
        let mut dst = [0u8; 64];
        assert!(matches!(
            format_pixels(&src, PixelFormat::Dxt1Rgb, &mut dst, PixelFormat::R8G8B8A8),
            Err(Error::CompressedFormat(_))
        ));
    }

    #[test]
    fn test_format_pixels_checks_destination_size() {
        let src = [0u8; 8]; // 2 RGBA8 pixels
        let mut dst = [0u8; 2]; // room for 2/3 of an R8G8B8 pixel pair
        assert!(matches!(
            format_pixels(&src, PixelFormat::R8G8B8A8, &mut dst, PixelFormat::R8G8B8),
            Err(Error::BufferTooSmall { needed: 6, got: 2 })
        ));
    }
}
