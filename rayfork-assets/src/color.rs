//! RGBA8 color type.
//!
//! `Color` doubles as the canonical uncompressed pixel: 4 bytes, one per
//! channel, alpha last. The pixel-format engine decodes every uncompressed
//! format into it.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const LIGHTGRAY: Color = Color::rgb(200, 200, 200);
    pub const GRAY: Color = Color::rgb(130, 130, 130);
    pub const DARKGRAY: Color = Color::rgb(80, 80, 80);
    pub const YELLOW: Color = Color::rgb(253, 249, 0);
    pub const GOLD: Color = Color::rgb(255, 203, 0);
    pub const ORANGE: Color = Color::rgb(255, 161, 0);
    pub const PINK: Color = Color::rgb(255, 109, 194);
    pub const RED: Color = Color::rgb(230, 41, 55);
    pub const MAROON: Color = Color::rgb(190, 33, 55);
    pub const GREEN: Color = Color::rgb(0, 228, 48);
    pub const LIME: Color = Color::rgb(0, 158, 47);
    pub const DARKGREEN: Color = Color::rgb(0, 117, 44);
    pub const SKYBLUE: Color = Color::rgb(102, 191, 255);
    pub const BLUE: Color = Color::rgb(0, 121, 241);
    pub const DARKBLUE: Color = Color::rgb(0, 82, 172);
    pub const PURPLE: Color = Color::rgb(200, 122, 255);
    pub const VIOLET: Color = Color::rgb(135, 60, 190);
    pub const DARKPURPLE: Color = Color::rgb(112, 31, 126);
    pub const BEIGE: Color = Color::rgb(211, 176, 131);
    pub const BROWN: Color = Color::rgb(127, 106, 79);
    pub const DARKBROWN: Color = Color::rgb(76, 63, 47);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const RAYWHITE: Color = Color::rgb(245, 245, 245);

    /// Fully transparent black.
    pub const BLANK: Color = Color::new(0, 0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from RGB components.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Component-wise equality ignoring alpha.
    #[inline]
    pub fn eq_rgb(self, other: Color) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }

    /// Channels as floats in [0, 1].
    #[inline]
    pub fn normalize(self) -> Vec4 {
        Vec4::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }

    /// Inverse of [`Color::normalize`]; components are clamped and rounded.
    #[inline]
    pub fn from_normalized(v: Vec4) -> Self {
        Self {
            r: (v.x.clamp(0.0, 1.0) * 255.0).round() as u8,
            g: (v.y.clamp(0.0, 1.0) * 255.0).round() as u8,
            b: (v.z.clamp(0.0, 1.0) * 255.0).round() as u8,
            a: (v.w.clamp(0.0, 1.0) * 255.0).round() as u8,
        }
    }

    /// Same color with alpha scaled to `alpha` in [0, 1].
    #[inline]
    pub fn fade(self, alpha: f32) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    /// Parse from a 0xRRGGBBAA integer.
    #[inline]
    pub const fn from_hex(value: u32) -> Self {
        Self {
            r: (value >> 24) as u8,
            g: (value >> 16) as u8,
            b: (value >> 8) as u8,
            a: value as u8,
        }
    }

    /// Pack into a 0xRRGGBBAA integer.
    #[inline]
    pub const fn to_hex(self) -> u32 {
        (self.r as u32) << 24 | (self.g as u32) << 16 | (self.b as u32) << 8 | self.a as u32
    }

    /// BT.601 luma, rounded. Used by grayscale encoding and heightmap meshing.
    #[inline]
    pub fn luminance(self) -> u8 {
        (0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32).round() as u8
    }

    /// Hue in degrees [0, 360), saturation and value in [0, 1]. Alpha is preserved separately.
    pub fn to_hsv(self) -> (f32, f32, f32) {
        let r = self.r as f32 / 255.0;
        let g = self.g as f32 / 255.0;
        let b = self.b as f32 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * (((g - b) / delta).rem_euclid(6.0))
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let s = if max == 0.0 { 0.0 } else { delta / max };

        (h, s, max)
    }

    /// Build an opaque color from hue (degrees), saturation and value.
    pub fn from_hsv(h: f32, s: f32, v: f32) -> Self {
        let h = h.rem_euclid(360.0);
        let c = v * s;
        let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
        let m = v - c;

        let (r, g, b) = match (h / 60.0) as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        Self {
            r: ((r + m) * 255.0).round() as u8,
            g: ((g + m) * 255.0).round() as u8,
            b: ((b + m) * 255.0).round() as u8,
            a: 255,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_rgb_ignores_alpha() {
        let a = Color::new(10, 20, 30, 255);
        let b = Color::new(10, 20, 30, 0);
        assert!(a.eq_rgb(b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_normalize_roundtrip() {
        let c = Color::new(1, 127, 200, 255);
        assert_eq!(Color::from_normalized(c.normalize()), c);
    }

    #[test]
    fn test_hex_roundtrip() {
        let c = Color::new(0x12, 0x34, 0x56, 0x78);
        assert_eq!(c.to_hex(), 0x12345678);
        assert_eq!(Color::from_hex(0x12345678), c);
    }

    #[test]
    fn test_hsv_roundtrip_primaries() {
        for c in [Color::RED, Color::GREEN, Color::BLUE, Color::WHITE, Color::BLACK] {
            let (h, s, v) = c.to_hsv();
            let back = Color::from_hsv(h, s, v);
            assert!((back.r as i32 - c.r as i32).abs() <= 1);
            assert!((back.g as i32 - c.g as i32).abs() <= 1);
            assert!((back.b as i32 - c.b as i32).abs() <= 1);
        }
    }

    #[test]
    fn test_fade() {
        assert_eq!(Color::WHITE.fade(0.0).a, 0);
        assert_eq!(Color::WHITE.fade(0.5).a, 128);
        assert_eq!(Color::WHITE.fade(2.0).a, 255);
    }

    #[test]
    fn test_luminance_weights() {
        assert_eq!(Color::WHITE.luminance(), 255);
        assert_eq!(Color::BLACK.luminance(), 0);
        // Pure green carries the largest weight
        assert_eq!(Color::rgb(0, 255, 0).luminance(), 150);
    }
}
