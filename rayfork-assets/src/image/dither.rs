//! Floyd–Steinberg dithering down to 16-bit packed formats.

use crate::error::{Error, Result};
use crate::image::Image;
use crate::pixel_format::PixelFormat;

/// Map requested per-channel bit widths to a known 16-bit packing.
fn target_format(r_bits: u32, g_bits: u32, b_bits: u32, a_bits: u32) -> Result<PixelFormat> {
    match (r_bits, g_bits, b_bits, a_bits) {
        (5, 6, 5, 0) => Ok(PixelFormat::R5G6B5),
        (5, 5, 5, 1) => Ok(PixelFormat::R5G5B5A1),
        (4, 4, 4, 4) => Ok(PixelFormat::R4G4B4A4),
        _ => Err(Error::Unsupported(format!(
            "no 16-bit packing for channel widths {}/{}/{}/{}",
            r_bits, g_bits, b_bits, a_bits
        ))),
    }
}

impl Image {
    /// Dither into the 16-bit format implied by the per-channel bit widths.
    ///
    /// Quantization truncates each channel to its bit width; the truncation
    /// error diffuses to the unprocessed neighbors with the classic
    /// 7/16, 3/16, 5/16, 1/16 weights.
    pub fn dither(&self, r_bits: u32, g_bits: u32, b_bits: u32, a_bits: u32) -> Result<Image> {
        let format = target_format(r_bits, g_bits, b_bits, a_bits)?;
        let (w, h) = (self.width as usize, self.height as usize);

        // Error accumulation needs headroom beyond u8
        let mut channels: Vec<[i32; 4]> = self
            .to_colors()?
            .into_iter()
            .map(|c| [c.r as i32, c.g as i32, c.b as i32, c.a as i32])
            .collect();

        let mut data = vec![0u8; format.buffer_size(self.width, self.height)];

        for y in 0..h {
            for x in 0..w {
                let index = y * w + x;
                let old = channels[index];

                // Truncate to the requested widths
                let quantized = [
                    (old[0].clamp(0, 255) as u32) >> (8 - r_bits),
                    (old[1].clamp(0, 255) as u32) >> (8 - g_bits),
                    (old[2].clamp(0, 255) as u32) >> (8 - b_bits),
                    if a_bits > 0 {
                        (old[3].clamp(0, 255) as u32) >> (8 - a_bits)
                    } else {
                        0
                    },
                ];

                let error = [
                    old[0] - ((quantized[0] << (8 - r_bits)) as i32),
                    old[1] - ((quantized[1] << (8 - g_bits)) as i32),
                    old[2] - ((quantized[2] << (8 - b_bits)) as i32),
                    if a_bits > 0 {
                        old[3] - ((quantized[3] << (8 - a_bits)) as i32)
                    } else {
                        0
                    },
                ];

                let mut spread = |dx: i32, dy: i32, num: i32| {
                    let (nx, ny) = (x as i32 + dx, y as i32 + dy);
                    if nx < 0 || nx >= w as i32 || ny >= h as i32 {
                        return;
                    }
                    let n = (ny as usize) * w + nx as usize;
                    for k in 0..4 {
                        channels[n][k] += error[k] * num / 16;
                    }
                };
                spread(1, 0, 7);
                spread(-1, 1, 3);
                spread(0, 1, 5);
                spread(1, 1, 1);

                let packed = ((quantized[0] << (g_bits + b_bits + a_bits))
                    | (quantized[1] << (b_bits + a_bits))
                    | (quantized[2] << a_bits)
                    | quantized[3]) as u16;
                data[index * 2..index * 2 + 2].copy_from_slice(&packed.to_le_bytes());
            }
        }

        Image::from_raw(data, self.width, self.height, format)
    }
}
