//! Procedural image generation. Everything generates RGBA8.

use rand::Rng;

use crate::color::Color;
use crate::error::{Error, Result};
use crate::image::Image;

// ============================================================================
// Gradient noise (used by the perlin generator)
// ============================================================================

#[inline]
fn hash2(ix: i32, iy: i32) -> u32 {
    let mut h = (ix as u32).wrapping_mul(0x8da6b343) ^ (iy as u32).wrapping_mul(0xd8163841);
    h ^= h >> 13;
    h = h.wrapping_mul(0x85ebca6b);
    h ^ (h >> 16)
}

#[inline]
fn grad(hash: u32, x: f32, y: f32) -> f32 {
    match hash & 3 {
        0 => x + y,
        1 => -x + y,
        2 => x - y,
        _ => -x - y,
    }
}

/// 2D gradient noise in roughly [-1, 1].
fn perlin_2d(x: f32, y: f32) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let (ix, iy) = (x0 as i32, y0 as i32);
    let (fx, fy) = (x - x0, y - y0);

    // Quintic fade
    let u = fx * fx * fx * (fx * (fx * 6.0 - 15.0) + 10.0);
    let v = fy * fy * fy * (fy * (fy * 6.0 - 15.0) + 10.0);

    let g00 = grad(hash2(ix, iy), fx, fy);
    let g10 = grad(hash2(ix + 1, iy), fx - 1.0, fy);
    let g01 = grad(hash2(ix, iy + 1), fx, fy - 1.0);
    let g11 = grad(hash2(ix + 1, iy + 1), fx - 1.0, fy - 1.0);

    let nx0 = g00 + u * (g10 - g00);
    let nx1 = g01 + u * (g11 - g01);
    nx0 + v * (nx1 - nx0)
}

/// Fractal sum of `perlin_2d` octaves.
fn fbm_2d(x: f32, y: f32, octaves: u32, lacunarity: f32, gain: f32) -> f32 {
    let mut sum = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    for _ in 0..octaves {
        sum += perlin_2d(x * frequency, y * frequency) * amplitude;
        frequency *= lacunarity;
        amplitude *= gain;
    }
    sum
}

fn linear_mix(a: Color, b: Color, t: f32) -> Color {
    Color {
        r: (a.r as f32 + (b.r as f32 - a.r as f32) * t).round() as u8,
        g: (a.g as f32 + (b.g as f32 - a.g as f32) * t).round() as u8,
        b: (a.b as f32 + (b.b as f32 - a.b as f32) * t).round() as u8,
        a: (a.a as f32 + (b.a as f32 - a.a as f32) * t).round() as u8,
    }
}

fn check_dims(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        Err(Error::BadArgument("generated image has a zero dimension"))
    } else {
        Ok(())
    }
}

impl Image {
    /// Solid color fill.
    pub fn gen_color(width: u32, height: u32, color: Color) -> Result<Image> {
        check_dims(width, height)?;
        Image::from_colors(&vec![color; (width * height) as usize], width, height)
    }

    /// Vertical gradient, `top` at row 0 to `bottom` at the last row.
    pub fn gen_gradient_v(width: u32, height: u32, top: Color, bottom: Color) -> Result<Image> {
        check_dims(width, height)?;
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            let t = if height > 1 {
                y as f32 / (height - 1) as f32
            } else {
                0.0
            };
            let row = linear_mix(top, bottom, t);
            pixels.extend(std::iter::repeat_n(row, width as usize));
        }
        Image::from_colors(&pixels, width, height)
    }

    /// Horizontal gradient, `left` at column 0 to `right` at the last column.
    pub fn gen_gradient_h(width: u32, height: u32, left: Color, right: Color) -> Result<Image> {
        check_dims(width, height)?;
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for _y in 0..height {
            for x in 0..width {
                let t = if width > 1 {
                    x as f32 / (width - 1) as f32
                } else {
                    0.0
                };
                pixels.push(linear_mix(left, right, t));
            }
        }
        Image::from_colors(&pixels, width, height)
    }

    /// Radial gradient. `density` in [0, 1] is the fraction of the radius
    /// that stays pure `inner`.
    pub fn gen_gradient_radial(
        width: u32,
        height: u32,
        density: f32,
        inner: Color,
        outer: Color,
    ) -> Result<Image> {
        check_dims(width, height)?;
        let radius = width.min(height) as f32 / 2.0;
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let density = density.clamp(0.0, 1.0);

        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let dist = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
                let t = if radius * (1.0 - density) > 0.0 {
                    ((dist - radius * density) / (radius * (1.0 - density))).clamp(0.0, 1.0)
                } else if dist < radius {
                    0.0
                } else {
                    1.0
                };
                pixels.push(linear_mix(inner, outer, t));
            }
        }
        Image::from_colors(&pixels, width, height)
    }

    /// Checkerboard with `checks_x × checks_y`-pixel cells.
    pub fn gen_checked(
        width: u32,
        height: u32,
        checks_x: u32,
        checks_y: u32,
        col1: Color,
        col2: Color,
    ) -> Result<Image> {
        check_dims(width, height)?;
        if checks_x == 0 || checks_y == 0 {
            return Err(Error::BadArgument("checker cell size must be nonzero"));
        }
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let cell = x / checks_x + y / checks_y;
                pixels.push(if cell % 2 == 0 { col1 } else { col2 });
            }
        }
        Image::from_colors(&pixels, width, height)
    }

    /// White noise: each pixel is `col1` with probability `factor`.
    pub fn gen_white_noise(
        width: u32,
        height: u32,
        factor: f32,
        col1: Color,
        col2: Color,
    ) -> Result<Image> {
        check_dims(width, height)?;
        let mut rng = rand::rng();
        let pixels: Vec<Color> = (0..width * height)
            .map(|_| {
                if rng.random::<f32>() < factor {
                    col1
                } else {
                    col2
                }
            })
            .collect();
        Image::from_colors(&pixels, width, height)
    }

    /// Fractal gradient noise mapped to grayscale.
    pub fn gen_perlin_noise(
        width: u32,
        height: u32,
        offset_x: i32,
        offset_y: i32,
        scale: f32,
    ) -> Result<Image> {
        check_dims(width, height)?;
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let nx = (x as i32 + offset_x) as f32 * scale / width as f32;
                let ny = (y as i32 + offset_y) as f32 * scale / height as f32;
                // Octave parameters follow the common fbm defaults
                let n = fbm_2d(nx, ny, 6, 2.0, 0.5);
                let p = ((n + 1.0) / 2.0).clamp(0.0, 1.0);
                let v = (p * 255.0).round() as u8;
                pixels.push(Color::rgb(v, v, v));
            }
        }
        Image::from_colors(&pixels, width, height)
    }

    /// Worley-style cellular noise: brightness is the normalized distance to
    /// the nearest per-tile seed point.
    pub fn gen_cellular(width: u32, height: u32, tile_size: u32) -> Result<Image> {
        check_dims(width, height)?;
        if tile_size == 0 {
            return Err(Error::BadArgument("tile size must be nonzero"));
        }
        let mut rng = rand::rng();
        let tiles_x = width.div_ceil(tile_size) as i32;
        let tiles_y = height.div_ceil(tile_size) as i32;

        // One random seed point per tile
        let mut seeds = Vec::with_capacity((tiles_x * tiles_y) as usize);
        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let sx = tx * tile_size as i32 + rng.random_range(0..tile_size as i32);
                let sy = ty * tile_size as i32 + rng.random_range(0..tile_size as i32);
                seeds.push((sx, sy));
            }
        }

        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height as i32 {
            let ty = y / tile_size as i32;
            for x in 0..width as i32 {
                let tx = x / tile_size as i32;

                let mut min_dist_sq = f32::MAX;
                for ny in (ty - 1)..=(ty + 1) {
                    for nx in (tx - 1)..=(tx + 1) {
                        if nx < 0 || ny < 0 || nx >= tiles_x || ny >= tiles_y {
                            continue;
                        }
                        let (sx, sy) = seeds[(ny * tiles_x + nx) as usize];
                        let d = ((x - sx) * (x - sx) + (y - sy) * (y - sy)) as f32;
                        min_dist_sq = min_dist_sq.min(d);
                    }
                }

                let v = ((min_dist_sq.sqrt() / tile_size as f32).clamp(0.0, 1.0) * 255.0) as u8;
                pixels.push(Color::rgb(v, v, v));
            }
        }
        Image::from_colors(&pixels, width, height)
    }
}
