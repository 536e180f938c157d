//! Algorithmic image operations.
//!
//! All operations require an uncompressed source. Per-pixel color work
//! decodes to RGBA8, applies the operation and encodes back to the image's
//! own format, so every op is format-preserving unless its contract says
//! otherwise (rotation changes shape, alpha-mask promotes to RGBA8).

use glam::Vec4;

use crate::color::Color;
use crate::error::{Error, Result};
use crate::image::Image;
use crate::math::Rect;
use crate::pixel_format::{self, PixelFormat};

/// Bilinear resample of a u8-subpixel buffer through the `image` crate.
fn resample_u8<P>(data: &[u8], w: u32, h: u32, nw: u32, nh: u32) -> Result<Vec<u8>>
where
    P: image::Pixel<Subpixel = u8> + 'static,
{
    let buf: image::ImageBuffer<P, Vec<u8>> = image::ImageBuffer::from_raw(w, h, data.to_vec())
        .ok_or(Error::BadArgument("pixel buffer does not match dimensions"))?;
    Ok(
        image::imageops::resize(&buf, nw, nh, image::imageops::FilterType::Triangle)
            .into_raw(),
    )
}

/// Integer clamp of a float rectangle against image bounds.
fn clamp_rect(rect: Rect, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let x0 = (rect.x.max(0.0) as u32).min(width);
    let y0 = (rect.y.max(0.0) as u32).min(height);
    let x1 = ((rect.x + rect.width).max(0.0) as u32).min(width);
    let y1 = ((rect.y + rect.height).max(0.0) as u32).min(height);
    (x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
}

impl Image {
    /// Bilinear resize. Formats the resampler handles natively (grayscale,
    /// gray+alpha, RGB, RGBA) resize in their own layout; every other
    /// uncompressed format pivots through RGBA8.
    pub fn resize(&self, new_width: u32, new_height: u32) -> Result<Image> {
        if new_width == 0 || new_height == 0 {
            return Err(Error::BadArgument("resize target has a zero dimension"));
        }
        let (w, h) = (self.width, self.height);
        let data = match self.format {
            PixelFormat::Grayscale => {
                resample_u8::<image::Luma<u8>>(&self.data, w, h, new_width, new_height)?
            }
            PixelFormat::GrayAlpha => {
                resample_u8::<image::LumaA<u8>>(&self.data, w, h, new_width, new_height)?
            }
            PixelFormat::R8G8B8 => {
                resample_u8::<image::Rgb<u8>>(&self.data, w, h, new_width, new_height)?
            }
            PixelFormat::R8G8B8A8 => {
                resample_u8::<image::Rgba<u8>>(&self.data, w, h, new_width, new_height)?
            }
            f if f.is_compressed() => return Err(Error::CompressedFormat(f)),
            _ => {
                // Pivot: convert to RGBA8, resample, convert back
                let rgba = self.to_format(PixelFormat::R8G8B8A8)?;
                let resized = rgba.resize(new_width, new_height)?;
                return resized.to_format(self.format);
            }
        };
        Image::from_raw(data, new_width, new_height, self.format)
    }

    /// Nearest-neighbor resize into a caller buffer using 16.16 fixed point.
    pub fn resize_nearest_into(
        &self,
        new_width: u32,
        new_height: u32,
        dst: &mut [u8],
    ) -> Result<()> {
        let bpp = self
            .format
            .bytes_per_pixel()
            .ok_or(Error::CompressedFormat(self.format))?;
        if new_width == 0 || new_height == 0 {
            return Err(Error::BadArgument("resize target has a zero dimension"));
        }
        let needed = new_width as usize * new_height as usize * bpp;
        if dst.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                got: dst.len(),
            });
        }

        let x_ratio = ((self.width as usize) << 16) / new_width as usize + 1;
        let y_ratio = ((self.height as usize) << 16) / new_height as usize + 1;
        let src_stride = self.width as usize * bpp;

        for y in 0..new_height as usize {
            let sy = ((y * y_ratio) >> 16).min(self.height as usize - 1);
            for x in 0..new_width as usize {
                let sx = ((x * x_ratio) >> 16).min(self.width as usize - 1);
                let src_off = sy * src_stride + sx * bpp;
                let dst_off = (y * new_width as usize + x) * bpp;
                dst[dst_off..dst_off + bpp].copy_from_slice(&self.data[src_off..src_off + bpp]);
            }
        }
        Ok(())
    }

    /// Allocating wrapper over [`Image::resize_nearest_into`].
    pub fn resize_nearest(&self, new_width: u32, new_height: u32) -> Result<Image> {
        let mut data = vec![0u8; self.format.buffer_size(new_width, new_height)];
        self.resize_nearest_into(new_width, new_height, &mut data)?;
        Image::from_raw(data, new_width, new_height, self.format)
    }

    /// Copy out a rectangle, clamped to the image bounds.
    pub fn crop(&self, rect: Rect) -> Result<Image> {
        let bpp = self
            .format
            .bytes_per_pixel()
            .ok_or(Error::CompressedFormat(self.format))?;
        let (x0, y0, w, h) = clamp_rect(rect, self.width, self.height);
        if w == 0 || h == 0 {
            return Err(Error::BadArgument("crop rectangle is empty after clamping"));
        }

        let src_stride = self.width as usize * bpp;
        let row_len = w as usize * bpp;
        let mut data = Vec::with_capacity(row_len * h as usize);
        for y in y0..y0 + h {
            let start = y as usize * src_stride + x0 as usize * bpp;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Image::from_raw(data, w, h, self.format)
    }

    /// Mirror rows in place.
    pub fn flip_vertical(&mut self) -> Result<()> {
        let bpp = self
            .format
            .bytes_per_pixel()
            .ok_or(Error::CompressedFormat(self.format))?;
        let stride = self.width as usize * bpp;
        let h = self.height as usize;
        let mut row = vec![0u8; stride];
        for y in 0..h / 2 {
            let (top, bottom) = (y * stride, (h - 1 - y) * stride);
            row.copy_from_slice(&self.data[top..top + stride]);
            self.data.copy_within(bottom..bottom + stride, top);
            self.data[bottom..bottom + stride].copy_from_slice(&row);
        }
        Ok(())
    }

    /// Mirror pixels within each row, in place.
    pub fn flip_horizontal(&mut self) -> Result<()> {
        let bpp = self
            .format
            .bytes_per_pixel()
            .ok_or(Error::CompressedFormat(self.format))?;
        let stride = self.width as usize * bpp;
        let w = self.width as usize;
        for y in 0..self.height as usize {
            let row = &mut self.data[y * stride..(y + 1) * stride];
            for x in 0..w / 2 {
                let (a, b) = (x * bpp, (w - 1 - x) * bpp);
                for k in 0..bpp {
                    row.swap(a + k, b + k);
                }
            }
        }
        Ok(())
    }

    /// Rotate 90 degrees clockwise. Out of place, the result is transposed
    /// in shape: destination index is `dst[x * h + (h - 1 - y)]`.
    pub fn rotate_cw(&self) -> Result<Image> {
        let bpp = self
            .format
            .bytes_per_pixel()
            .ok_or(Error::CompressedFormat(self.format))?;
        let (w, h) = (self.width as usize, self.height as usize);
        let mut data = vec![0u8; self.data.len()];
        for y in 0..h {
            for x in 0..w {
                let src = (y * w + x) * bpp;
                let dst = (x * h + (h - 1 - y)) * bpp;
                data[dst..dst + bpp].copy_from_slice(&self.data[src..src + bpp]);
            }
        }
        Image::from_raw(data, self.height, self.width, self.format)
    }

    /// Rotate 90 degrees counter-clockwise.
    pub fn rotate_ccw(&self) -> Result<Image> {
        let bpp = self
            .format
            .bytes_per_pixel()
            .ok_or(Error::CompressedFormat(self.format))?;
        let (w, h) = (self.width as usize, self.height as usize);
        let mut data = vec![0u8; self.data.len()];
        for y in 0..h {
            for x in 0..w {
                let src = (y * w + x) * bpp;
                let dst = ((w - 1 - x) * h + y) * bpp;
                data[dst..dst + bpp].copy_from_slice(&self.data[src..src + bpp]);
            }
        }
        Image::from_raw(data, self.height, self.width, self.format)
    }

    /// Decode, apply `f` per pixel, encode back in place.
    fn map_pixels(&mut self, mut f: impl FnMut(Color) -> Color) -> Result<()> {
        let mut pixels = self.to_colors()?;
        for p in &mut pixels {
            *p = f(*p);
        }
        pixel_format::encode_pixels_from_rgba32(&pixels, &mut self.data, self.format)
    }

    /// Multiply every pixel by `tint` (channel-wise, normalized).
    pub fn tint(&mut self, tint: Color) -> Result<()> {
        self.map_pixels(|c| Color {
            r: ((c.r as u16 * tint.r as u16) / 255) as u8,
            g: ((c.g as u16 * tint.g as u16) / 255) as u8,
            b: ((c.b as u16 * tint.b as u16) / 255) as u8,
            a: ((c.a as u16 * tint.a as u16) / 255) as u8,
        })
    }

    /// Invert color channels, leaving alpha untouched.
    pub fn invert(&mut self) -> Result<()> {
        self.map_pixels(|c| Color {
            r: 255 - c.r,
            g: 255 - c.g,
            b: 255 - c.b,
            a: c.a,
        })
    }

    /// Adjust contrast. `contrast` in [-100, 100] maps to the multiplier
    /// `((100 + c) / 100)²` applied around mid-gray.
    pub fn contrast(&mut self, contrast: f32) -> Result<()> {
        let c = contrast.clamp(-100.0, 100.0);
        let factor = ((100.0 + c) / 100.0) * ((100.0 + c) / 100.0);
        let apply = |v: u8| -> u8 {
            let shifted = (v as f32 / 255.0 - 0.5) * factor + 0.5;
            (shifted.clamp(0.0, 1.0) * 255.0).round() as u8
        };
        self.map_pixels(|p| Color {
            r: apply(p.r),
            g: apply(p.g),
            b: apply(p.b),
            a: p.a,
        })
    }

    /// Additive brightness, `delta` in [-255, 255], clamped per channel.
    pub fn brightness(&mut self, delta: i32) -> Result<()> {
        let d = delta.clamp(-255, 255);
        let apply = |v: u8| (v as i32 + d).clamp(0, 255) as u8;
        self.map_pixels(|p| Color {
            r: apply(p.r),
            g: apply(p.g),
            b: apply(p.b),
            a: p.a,
        })
    }

    /// Replace exact occurrences of `search` with `replacement`.
    pub fn replace_color(&mut self, search: Color, replacement: Color) -> Result<()> {
        self.map_pixels(|p| if p == search { replacement } else { p })
    }

    /// Replace pixels whose alpha is at or below `threshold` (normalized)
    /// with `fill`.
    pub fn alpha_clear(&mut self, fill: Color, threshold: f32) -> Result<()> {
        let cutoff = (threshold.clamp(0.0, 1.0) * 255.0) as u8;
        self.map_pixels(|p| if p.a <= cutoff { fill } else { p })
    }

    /// Scale color channels by alpha.
    pub fn alpha_premultiply(&mut self) -> Result<()> {
        self.map_pixels(|p| Color {
            r: ((p.r as u16 * p.a as u16) / 255) as u8,
            g: ((p.g as u16 * p.a as u16) / 255) as u8,
            b: ((p.b as u16 * p.a as u16) / 255) as u8,
            a: p.a,
        })
    }

    /// Crop to the tight bounding box of pixels with alpha above `threshold`.
    pub fn alpha_crop(&self, threshold: f32) -> Result<Image> {
        let cutoff = (threshold.clamp(0.0, 1.0) * 255.0) as u8;
        let pixels = self.to_colors()?;

        let (mut min_x, mut min_y) = (self.width, self.height);
        let (mut max_x, mut max_y) = (0u32, 0u32);
        let mut any = false;
        for y in 0..self.height {
            for x in 0..self.width {
                if pixels[(y * self.width + x) as usize].a > cutoff {
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                    any = true;
                }
            }
        }
        if !any {
            return Err(Error::BadArgument("image is fully transparent"));
        }

        self.crop(Rect::new(
            min_x as f32,
            min_y as f32,
            (max_x - min_x + 1) as f32,
            (max_y - min_y + 1) as f32,
        ))
    }

    /// Write `mask`'s luma into the alpha channel. The mask is resized to
    /// the image size when it differs; the image is promoted to RGBA8.
    pub fn alpha_mask(&mut self, mask: &Image) -> Result<()> {
        let mask = if mask.width != self.width || mask.height != self.height {
            mask.resize(self.width, self.height)?
        } else {
            mask.clone()
        };
        let mask_pixels = mask.to_colors()?;

        let mut pixels = self.to_colors()?;
        for (p, m) in pixels.iter_mut().zip(&mask_pixels) {
            p.a = m.luminance();
        }

        self.data = bytemuck::cast_slice(&pixels).to_vec();
        self.format = PixelFormat::R8G8B8A8;
        Ok(())
    }

    /// Extract up to `max_size` distinct colors, skipping fully transparent
    /// pixels. Linear-probe dedup, order of first appearance.
    pub fn palette(&self, max_size: usize) -> Result<Vec<Color>> {
        let pixels = self.to_colors()?;
        let mut out: Vec<Color> = Vec::with_capacity(max_size.min(256));
        for p in pixels {
            if p.a == 0 {
                continue;
            }
            if !out.contains(&p) {
                out.push(p);
                if out.len() == max_size {
                    break;
                }
            }
        }
        Ok(out)
    }

    /// Composite `src_rect` of `src` into `dst_rect` of `self`, resizing the
    /// source region when the rectangles differ and alpha-blending with the
    /// source-over formula `out.a = s.a + d.a * (1 - s.a)`.
    pub fn draw(&mut self, src: &Image, src_rect: Rect, dst_rect: Rect, tint: Color) -> Result<()> {
        self.format
            .bytes_per_pixel()
            .ok_or(Error::CompressedFormat(self.format))?;

        let mut piece = src.crop(src_rect)?;
        let (dx, dy, dw, dh) = clamp_rect(dst_rect, self.width, self.height);
        if dw == 0 || dh == 0 {
            return Err(Error::BadArgument("destination rectangle is empty"));
        }
        if piece.width != dw || piece.height != dh {
            piece = piece.resize(dw, dh)?;
        }

        let tint = tint.normalize();
        let src_pixels = piece.to_colors()?;
        let mut dst_pixels = self.to_colors()?;

        for y in 0..dh {
            for x in 0..dw {
                let s = src_pixels[(y * dw + x) as usize].normalize() * tint;
                let d_index = ((dy + y) * self.width + dx + x) as usize;
                let d = dst_pixels[d_index].normalize();

                let out_a = s.w + d.w * (1.0 - s.w);
                let blended = if out_a > 0.0 {
                    let rgb = (s.truncate() * s.w + d.truncate() * d.w * (1.0 - s.w)) / out_a;
                    Vec4::new(rgb.x, rgb.y, rgb.z, out_a)
                } else {
                    Vec4::ZERO
                };
                dst_pixels[d_index] = Color::from_normalized(blended);
            }
        }

        pixel_format::encode_pixels_from_rgba32(&dst_pixels, &mut self.data, self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image_4x4() -> Image {
        let mut pixels = Vec::new();
        for i in 0..16u8 {
            pixels.push(Color::new(i * 16, 255 - i * 16, i, 255));
        }
        Image::from_colors(&pixels, 4, 4).unwrap()
    }

    #[test]
    fn test_flip_vertical_involution() {
        let original = test_image_4x4();
        let mut img = original.clone();
        img.flip_vertical().unwrap();
        assert_ne!(img, original);
        img.flip_vertical().unwrap();
        assert_eq!(img, original);
    }

    #[test]
    fn test_flip_horizontal_involution() {
        let original = test_image_4x4();
        let mut img = original.clone();
        img.flip_horizontal().unwrap();
        img.flip_horizontal().unwrap();
        assert_eq!(img, original);
    }

    #[test]
    fn test_rotate_cw_four_times_is_identity() {
        let original = test_image_4x4();
        let mut img = original.clone();
        for _ in 0..4 {
            img = img.rotate_cw().unwrap();
        }
        assert_eq!(img, original);
    }

    #[test]
    fn test_rotate_cw_then_ccw_is_identity() {
        let original = test_image_4x4();
        let rotated = original.rotate_cw().unwrap().rotate_ccw().unwrap();
        assert_eq!(rotated, original);
    }

    #[test]
    fn test_rotate_changes_shape() {
        let img = Image::from_colors(&[Color::WHITE; 6], 3, 2).unwrap();
        let rotated = img.rotate_cw().unwrap();
        assert_eq!((rotated.width, rotated.height), (2, 3));
    }

    #[test]
    fn test_crop_full_rect_is_identity() {
        let img = test_image_4x4();
        let cropped = img.crop(Rect::new(0.0, 0.0, 4.0, 4.0)).unwrap();
        assert_eq!(cropped, img);
    }

    #[test]
    fn test_crop_clamps_out_of_bounds() {
        let img = test_image_4x4();
        let cropped = img.crop(Rect::new(2.0, 2.0, 100.0, 100.0)).unwrap();
        assert_eq!((cropped.width, cropped.height), (2, 2));
        assert_eq!(cropped.get_pixel(0, 0).unwrap(), img.get_pixel(2, 2).unwrap());
    }

    #[test]
    fn test_invert_involution() {
        let original = test_image_4x4();
        let mut img = original.clone();
        img.invert().unwrap();
        img.invert().unwrap();
        assert_eq!(img, original);
    }

    #[test]
    fn test_premultiply_keeps_opaque_pixels() {
        let original = test_image_4x4(); // all alpha 255
        let mut img = original.clone();
        img.alpha_premultiply().unwrap();
        assert_eq!(img, original);
    }

    #[test]
    fn test_premultiply_scales_translucent_pixels() {
        let mut img =
            Image::from_colors(&[Color::new(200, 100, 50, 128)], 1, 1).unwrap();
        img.alpha_premultiply().unwrap();
        let p = img.get_pixel(0, 0).unwrap();
        assert_eq!(p, Color::new(100, 50, 25, 128));
    }

    #[test]
    fn test_alpha_clear() {
        let mut img = Image::from_colors(
            &[Color::new(1, 2, 3, 10), Color::new(4, 5, 6, 200)],
            2,
            1,
        )
        .unwrap();
        img.alpha_clear(Color::MAGENTA, 0.5).unwrap();
        assert_eq!(img.get_pixel(0, 0).unwrap(), Color::MAGENTA);
        assert_eq!(img.get_pixel(1, 0).unwrap(), Color::new(4, 5, 6, 200));
    }

    #[test]
    fn test_alpha_crop_finds_tight_bbox() {
        let mut pixels = vec![Color::BLANK; 16];
        pixels[5] = Color::WHITE; // (1, 1)
        pixels[10] = Color::WHITE; // (2, 2)
        let img = Image::from_colors(&pixels, 4, 4).unwrap();

        let cropped = img.alpha_crop(0.0).unwrap();
        assert_eq!((cropped.width, cropped.height), (2, 2));
        assert_eq!(cropped.get_pixel(0, 0).unwrap(), Color::WHITE);
    }

    #[test]
    fn test_resize_nearest_doubles_pixels() {
        let img = Image::from_colors(
            &[Color::RED, Color::GREEN, Color::BLUE, Color::WHITE],
            2,
            2,
        )
        .unwrap();
        let big = img.resize_nearest(4, 4).unwrap();
        assert_eq!(big.get_pixel(0, 0).unwrap(), Color::RED);
        assert_eq!(big.get_pixel(1, 1).unwrap(), Color::RED);
        assert_eq!(big.get_pixel(2, 0).unwrap(), Color::GREEN);
        assert_eq!(big.get_pixel(3, 3).unwrap(), Color::WHITE);
    }

    #[test]
    fn test_resize_bilinear_solid_color_stays_solid() {
        let img = Image::from_colors(&[Color::rgb(10, 200, 30); 16], 4, 4).unwrap();
        let resized = img.resize(8, 8).unwrap();
        assert_eq!(resized.get_pixel(3, 3).unwrap(), Color::rgb(10, 200, 30));
        assert_eq!((resized.width, resized.height), (8, 8));
    }

    #[test]
    fn test_resize_rejects_compressed() {
        let img = Image {
            data: vec![0u8; PixelFormat::Dxt1Rgb.buffer_size(8, 8)],
            width: 8,
            height: 8,
            format: PixelFormat::Dxt1Rgb,
        };
        assert!(img.resize(4, 4).is_err());
    }

    #[test]
    fn test_contrast_extremes() {
        let mut img = Image::from_colors(&[Color::new(100, 200, 30, 255)], 1, 1).unwrap();
        img.contrast(-100.0).unwrap(); // factor 0: everything mid-gray
        assert_eq!(img.get_pixel(0, 0).unwrap(), Color::new(128, 128, 128, 255));
    }

    #[test]
    fn test_brightness_clamps() {
        let mut img = Image::from_colors(&[Color::new(200, 10, 128, 255)], 1, 1).unwrap();
        img.brightness(100).unwrap();
        assert_eq!(img.get_pixel(0, 0).unwrap(), Color::new(255, 110, 228, 255));
    }

    #[test]
    fn test_replace_color_exact_match_only() {
        let mut img = Image::from_colors(
            &[Color::new(1, 2, 3, 255), Color::new(1, 2, 3, 254)],
            2,
            1,
        )
        .unwrap();
        img.replace_color(Color::new(1, 2, 3, 255), Color::WHITE).unwrap();
        assert_eq!(img.get_pixel(0, 0).unwrap(), Color::WHITE);
        assert_eq!(img.get_pixel(1, 0).unwrap(), Color::new(1, 2, 3, 254));
    }

    #[test]
    fn test_palette_dedup_and_cap() {
        let img = Image::from_colors(
            &[
                Color::RED,
                Color::RED,
                Color::GREEN,
                Color::BLUE,
                Color::BLANK, // transparent, skipped
                Color::GREEN,
            ],
            6,
            1,
        )
        .unwrap();
        assert_eq!(img.palette(16).unwrap(), vec![Color::RED, Color::GREEN, Color::BLUE]);
        assert_eq!(img.palette(2).unwrap(), vec![Color::RED, Color::GREEN]);
    }

    #[test]
    fn test_draw_opaque_copy() {
        let mut dst = Image::from_colors(&[Color::BLACK; 16], 4, 4).unwrap();
        let src = Image::from_colors(&[Color::RED; 4], 2, 2).unwrap();
        dst.draw(
            &src,
            Rect::new(0.0, 0.0, 2.0, 2.0),
            Rect::new(1.0, 1.0, 2.0, 2.0),
            Color::WHITE,
        )
        .unwrap();
        assert_eq!(dst.get_pixel(0, 0).unwrap(), Color::BLACK);
        assert_eq!(dst.get_pixel(1, 1).unwrap(), Color::RED);
        assert_eq!(dst.get_pixel(2, 2).unwrap(), Color::RED);
        assert_eq!(dst.get_pixel(3, 3).unwrap(), Color::BLACK);
    }

    #[test]
    fn test_draw_blends_translucent_source() {
        let mut dst = Image::from_colors(&[Color::new(0, 0, 0, 255)], 1, 1).unwrap();
        let src = Image::from_colors(&[Color::new(255, 255, 255, 128)], 1, 1).unwrap();
        dst.draw(
            &src,
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Color::WHITE,
        )
        .unwrap();
        let p = dst.get_pixel(0, 0).unwrap();
        // 50% white over opaque black
        assert_eq!(p.a, 255);
        assert!((p.r as i32 - 128).abs() <= 1);
    }
}
