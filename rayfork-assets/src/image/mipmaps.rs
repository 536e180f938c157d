//! Mipmap chain construction.
//!
//! Level 0 is stored first at full size; each following level halves both
//! dimensions (floored, minimum 1) and is stored contiguously. All levels
//! share the base image's pixel format.

use crate::error::{Error, Result};
use crate::image::Image;
use crate::pixel_format::PixelFormat;

#[derive(Debug, Clone, PartialEq)]
pub struct MipmapsImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mipmaps: u32,
    pub format: PixelFormat,
}

/// Byte size of a full chain: `Σ max(1, w >> k) * max(1, h >> k)` pixels.
pub fn mipmaps_buffer_size(width: u32, height: u32, mipmaps: u32, format: PixelFormat) -> usize {
    let mut total = 0;
    let (mut w, mut h) = (width, height);
    for _ in 0..mipmaps {
        total += format.buffer_size(w, h);
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    total
}

/// Largest possible chain length for the given base size.
pub fn max_mipmap_count(width: u32, height: u32) -> u32 {
    let mut count = 1;
    let (mut w, mut h) = (width, height);
    while w > 1 || h > 1 {
        w = (w / 2).max(1);
        h = (h / 2).max(1);
        count += 1;
    }
    count
}

impl MipmapsImage {
    /// Wrap a single image as a one-level chain.
    pub fn from_image(image: Image) -> Self {
        Self {
            data: image.data,
            width: image.width,
            height: image.height,
            mipmaps: 1,
            format: image.format,
        }
    }

    /// Byte offset and dimensions of one level.
    pub fn level(&self, level: u32) -> Result<(usize, u32, u32)> {
        if level >= self.mipmaps {
            return Err(Error::BadArgument("mipmap level out of range"));
        }
        let mut offset = 0;
        let (mut w, mut h) = (self.width, self.height);
        for _ in 0..level {
            offset += self.format.buffer_size(w, h);
            w = (w / 2).max(1);
            h = (h / 2).max(1);
        }
        Ok((offset, w, h))
    }
}

impl Image {
    /// Build a mipmap chain by successive bilinear halvings.
    ///
    /// `levels` caps the chain length; `None` runs down to 1×1. Every level
    /// is re-encoded into the base image's format.
    pub fn generate_mipmaps(&self, levels: Option<u32>) -> Result<MipmapsImage> {
        self.format
            .bytes_per_pixel()
            .ok_or(Error::CompressedFormat(self.format))?;

        let count = levels
            .unwrap_or(u32::MAX)
            .clamp(1, max_mipmap_count(self.width, self.height));

        let mut data =
            Vec::with_capacity(mipmaps_buffer_size(self.width, self.height, count, self.format));
        data.extend_from_slice(&self.data);

        // Downscale the previous level each step rather than the base, so a
        // chain is a genuine pyramid of successive halvings
        let mut current = self.clone();
        for _ in 1..count {
            let w = (current.width / 2).max(1);
            let h = (current.height / 2).max(1);
            current = current.resize(w, h)?;
            data.extend_from_slice(&current.data);
        }

        Ok(MipmapsImage {
            data,
            width: self.width,
            height: self.height,
            mipmaps: count,
            format: self.format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn test_max_mipmap_count() {
        assert_eq!(max_mipmap_count(1, 1), 1);
        assert_eq!(max_mipmap_count(2, 2), 2);
        assert_eq!(max_mipmap_count(16, 16), 5);
        assert_eq!(max_mipmap_count(16, 4), 5); // wide side dominates
    }

    #[test]
    fn test_chain_size_identity() {
        let img = Image::gen_color(16, 16, Color::WHITE).unwrap();
        let chain = img.generate_mipmaps(None).unwrap();
        assert_eq!(chain.mipmaps, 5);

        let expected: usize = [16u32, 8, 4, 2, 1]
            .iter()
            .map(|&side| PixelFormat::R8G8B8A8.buffer_size(side, side))
            .sum();
        assert_eq!(chain.data.len(), expected);
        assert_eq!(
            chain.data.len(),
            mipmaps_buffer_size(16, 16, 5, PixelFormat::R8G8B8A8)
        );
    }

    #[test]
    fn test_non_square_chain() {
        let img = Image::gen_color(8, 2, Color::WHITE).unwrap();
        let chain = img.generate_mipmaps(None).unwrap();
        // 8x2 -> 4x1 -> 2x1 -> 1x1
        assert_eq!(chain.mipmaps, 4);
        let (offset, w, h) = chain.level(1).unwrap();
        assert_eq!((w, h), (4, 1));
        assert_eq!(offset, PixelFormat::R8G8B8A8.buffer_size(8, 2));
    }

    #[test]
    fn test_requested_level_cap() {
        let img = Image::gen_color(16, 16, Color::WHITE).unwrap();
        let chain = img.generate_mipmaps(Some(2)).unwrap();
        assert_eq!(chain.mipmaps, 2);
        assert_eq!(
            chain.data.len(),
            PixelFormat::R8G8B8A8.buffer_size(16, 16) + PixelFormat::R8G8B8A8.buffer_size(8, 8)
        );
    }

    #[test]
    fn test_levels_keep_format() {
        let img = Image::gen_color(8, 8, Color::WHITE)
            .unwrap()
            .to_format(PixelFormat::R5G6B5)
            .unwrap();
        let chain = img.generate_mipmaps(None).unwrap();
        assert_eq!(chain.format, PixelFormat::R5G6B5);
        assert_eq!(
            chain.data.len(),
            mipmaps_buffer_size(8, 8, 4, PixelFormat::R5G6B5)
        );
    }

    #[test]
    fn test_level_out_of_range() {
        let img = Image::gen_color(4, 4, Color::WHITE).unwrap();
        let chain = img.generate_mipmaps(Some(1)).unwrap();
        assert!(chain.level(1).is_err());
    }
}
