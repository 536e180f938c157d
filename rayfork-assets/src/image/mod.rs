//! CPU-side images: the `Image`, `MipmapsImage` and `Gif` entities plus the
//! delegated loaders (PNG/BMP/TGA/JPEG/HDR via the `image` crate, animated
//! GIF via the `gif` crate).
//!
//! Buffer invariant: `data.len() == format.buffer_size(width, height)`.
//! Constructors validate it; operations preserve it.

mod dither;
mod gen;
mod mipmaps;
mod ops;

pub use mipmaps::MipmapsImage;

use std::io::Cursor;
use std::path::Path;

use crate::color::Color;
use crate::error::{Error, Result};
use crate::io::AssetIo;
use crate::pixel_format::{self, PixelFormat};

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl Image {
    /// Wrap an existing pixel buffer, validating the size invariant.
    pub fn from_raw(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        let needed = format.buffer_size(width, height);
        if data.len() != needed {
            return Err(Error::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// Build an RGBA8 image from a row-major pixel slice.
    pub fn from_colors(pixels: &[Color], width: u32, height: u32) -> Result<Self> {
        if pixels.len() != width as usize * height as usize {
            return Err(Error::BadArgument("pixel count does not match dimensions"));
        }
        Ok(Self {
            data: bytemuck::cast_slice(pixels).to_vec(),
            width,
            height,
            format: PixelFormat::R8G8B8A8,
        })
    }

    /// Total byte size of the pixel buffer.
    #[inline]
    pub fn size(&self) -> usize {
        self.format.buffer_size(self.width, self.height)
    }

    #[inline]
    fn require_uncompressed(&self) -> Result<usize> {
        self.format
            .bytes_per_pixel()
            .ok_or(Error::CompressedFormat(self.format))
    }

    /// Decode the whole image into RGBA8 pixels.
    pub fn to_colors(&self) -> Result<Vec<Color>> {
        self.require_uncompressed()?;
        pixel_format::decode_pixels_to_rgba32(&self.data, self.format)
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Result<Color> {
        let bpp = self.require_uncompressed()?;
        if x >= self.width || y >= self.height {
            return Err(Error::BadArgument("pixel coordinates out of bounds"));
        }
        let offset = (y as usize * self.width as usize + x as usize) * bpp;
        pixel_format::decode_pixel(&self.data[offset..], self.format)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) -> Result<()> {
        let bpp = self.require_uncompressed()?;
        if x >= self.width || y >= self.height {
            return Err(Error::BadArgument("pixel coordinates out of bounds"));
        }
        let offset = (y as usize * self.width as usize + x as usize) * bpp;
        pixel_format::encode_pixel(&mut self.data[offset..], self.format, color)
    }

    /// Convert into `format`, writing into a caller buffer.
    pub fn format_into(&self, format: PixelFormat, dst: &mut [u8]) -> Result<()> {
        pixel_format::format_pixels(&self.data, self.format, dst, format)
    }

    /// Convert into `format`, allocating the destination.
    pub fn to_format(&self, format: PixelFormat) -> Result<Image> {
        let mut data = vec![0u8; format.buffer_size(self.width, self.height)];
        self.format_into(format, &mut data)?;
        Ok(Image {
            data,
            width: self.width,
            height: self.height,
            format,
        })
    }

    /// Decode an image file held in memory. PNG, BMP, TGA and JPEG keep
    /// their natural channel layout; Radiance HDR decodes to R32G32B32.
    pub fn from_memory(bytes: &[u8]) -> Result<Image> {
        let decoded = image::load_from_memory(bytes).map_err(|e| Error::Decode {
            library: "image",
            reason: e.to_string(),
        })?;

        let (width, height) = (decoded.width(), decoded.height());
        let (data, format) = match decoded {
            image::DynamicImage::ImageLuma8(buf) => (buf.into_raw(), PixelFormat::Grayscale),
            image::DynamicImage::ImageLumaA8(buf) => (buf.into_raw(), PixelFormat::GrayAlpha),
            image::DynamicImage::ImageRgb8(buf) => (buf.into_raw(), PixelFormat::R8G8B8),
            image::DynamicImage::ImageRgba8(buf) => (buf.into_raw(), PixelFormat::R8G8B8A8),
            image::DynamicImage::ImageRgb32F(buf) => {
                let floats = buf.into_raw();
                (
                    bytemuck::cast_slice(&floats).to_vec(),
                    PixelFormat::R32G32B32,
                )
            }
            image::DynamicImage::ImageRgba32F(buf) => {
                let floats = buf.into_raw();
                (
                    bytemuck::cast_slice(&floats).to_vec(),
                    PixelFormat::R32G32B32A32,
                )
            }
            other => (other.to_rgba8().into_raw(), PixelFormat::R8G8B8A8),
        };

        tracing::debug!("decoded image: {}x{} {:?}", width, height, format);
        Image::from_raw(data, width, height, format)
    }

    /// Decode an image file resolved through the IO capability.
    pub fn from_file(io: &dyn AssetIo, path: &Path) -> Result<Image> {
        let bytes = io.read_file(path)?;
        Self::from_memory(&bytes)
    }
}

/// Animated GIF: all frames decoded to RGBA8 in one contiguous buffer.
///
/// Frame `k` starts at byte offset `k * width * height * 4`. Delays keep the
/// decoder's units (hundredths of a second for GIF).
#[derive(Debug, Clone, PartialEq)]
pub struct Gif {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
    pub frame_delays: Vec<u16>,
    pub format: PixelFormat,
}

impl Gif {
    /// Demux an animated GIF. Frames smaller than the canvas are composited
    /// over the previous frame at their declared offset.
    pub fn from_memory(bytes: &[u8]) -> Result<Gif> {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);
        let mut decoder = options
            .read_info(Cursor::new(bytes))
            .map_err(|e| Error::Decode {
                library: "gif",
                reason: e.to_string(),
            })?;

        let width = decoder.width() as u32;
        let height = decoder.height() as u32;
        let frame_size = width as usize * height as usize * 4;

        let mut data = Vec::new();
        let mut frame_delays = Vec::new();
        let mut canvas = vec![0u8; frame_size];

        loop {
            let frame = match decoder.read_next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    return Err(Error::Decode {
                        library: "gif",
                        reason: e.to_string(),
                    })
                }
            };

            // Blit the (possibly partial) frame into the running canvas,
            // clamped to the canvas bounds
            let fw = frame.width as usize;
            let fh = frame.height as usize;
            let fx = frame.left as usize;
            let fy = frame.top as usize;
            let rows = fh.min((height as usize).saturating_sub(fy));
            let copy_w = fw.min((width as usize).saturating_sub(fx)) * 4;
            for row in 0..rows {
                let dst_start = ((fy + row) * width as usize + fx) * 4;
                let src_start = row * fw * 4;
                canvas[dst_start..dst_start + copy_w]
                    .copy_from_slice(&frame.buffer[src_start..src_start + copy_w]);
            }

            data.extend_from_slice(&canvas);
            frame_delays.push(frame.delay);
        }

        if frame_delays.is_empty() {
            return Err(Error::Decode {
                library: "gif",
                reason: "no frames".into(),
            });
        }

        tracing::debug!(
            "decoded gif: {}x{}, {} frames",
            width,
            height,
            frame_delays.len()
        );
        Ok(Gif {
            data,
            width,
            height,
            frame_count: frame_delays.len() as u32,
            frame_delays,
            format: PixelFormat::R8G8B8A8,
        })
    }

    /// Copy one frame out as a standalone image.
    pub fn frame(&self, index: u32) -> Result<Image> {
        if index >= self.frame_count {
            return Err(Error::BadArgument("gif frame index out of range"));
        }
        let frame_size = self.format.buffer_size(self.width, self.height);
        let start = index as usize * frame_size;
        Image::from_raw(
            self.data[start..start + frame_size].to_vec(),
            self.width,
            self.height,
            self.format,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_identity() {
        let img = Image::from_colors(&[Color::WHITE; 12], 4, 3).unwrap();
        assert_eq!(
            img.size(),
            4 * 3 * img.format.bytes_per_pixel().unwrap()
        );
        assert_eq!(img.size(), img.data.len());
    }

    #[test]
    fn test_from_raw_validates_size() {
        assert!(Image::from_raw(vec![0u8; 10], 4, 4, PixelFormat::R8G8B8A8).is_err());
        assert!(Image::from_raw(vec![0u8; 64], 4, 4, PixelFormat::R8G8B8A8).is_ok());
    }

    #[test]
    fn test_pixel_accessors() {
        let mut img = Image::from_colors(&[Color::BLACK; 16], 4, 4).unwrap();
        img.set_pixel(2, 1, Color::RED).unwrap();
        assert_eq!(img.get_pixel(2, 1).unwrap(), Color::RED);
        assert_eq!(img.get_pixel(0, 0).unwrap(), Color::BLACK);
        assert!(img.get_pixel(4, 0).is_err());
    }

    #[test]
    fn test_format_roundtrip_through_gray_alpha() {
        let img = Image::from_colors(
            &[Color::new(100, 100, 100, 200), Color::new(0, 0, 0, 255)],
            2,
            1,
        )
        .unwrap();
        let ga = img.to_format(PixelFormat::GrayAlpha).unwrap();
        assert_eq!(ga.data.len(), 4);
        // Gray value carries luma, byte 1 carries alpha
        assert_eq!(ga.data[1], 200);
        assert_eq!(ga.data[3], 255);
    }

    #[test]
    fn test_png_roundtrip_via_image_crate() {
        // Encode a tiny PNG with the image crate, decode with the loader
        let mut png = Vec::new();
        let buf = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        buf.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let img = Image::from_memory(&png).unwrap();
        assert_eq!((img.width, img.height), (2, 2));
        assert_eq!(img.get_pixel(0, 0).unwrap(), Color::rgb(255, 0, 0));
    }

    #[test]
    fn test_from_memory_rejects_garbage() {
        assert!(Image::from_memory(&[0, 1, 2, 3]).is_err());
    }
}
