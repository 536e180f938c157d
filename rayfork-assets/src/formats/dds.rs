//! DDS (DirectDraw Surface) texture container.
//!
//! # Layout
//! ```text
//! 0x00: magic "DDS " (4 bytes)
//! 0x04: header (124 bytes, all u32 little-endian)
//!       +0x00 size (124)        +0x04 flags
//!       +0x08 height            +0x0C width
//!       +0x10 pitch_or_linear_size
//!       +0x14 depth             +0x18 mipmap_count
//!       +0x1C reserved[11]
//!       +0x48 pixelformat (32 bytes):
//!             +0x00 size (32)   +0x04 flags (0x1 alpha, 0x4 fourcc, 0x40 rgb)
//!             +0x08 fourcc      +0x0C rgb_bit_count
//!             +0x10 r_bitmask   +0x14 g_bitmask
//!             +0x18 b_bitmask   +0x1C a_bitmask
//!       +0x68 caps[4] + reserved
//! 0x80: pixel payload
//! ```
//!
//! Supported paths: 16-bit uncompressed (R5G6B5 straight copy, A1R5G5B5 and
//! A4R4G4B4 reordered to alpha-last), 24-bit RGB, 32-bit BGRA byte-swapped
//! to RGBA, and DXT1/3/5 blobs passed through untouched.

use crate::error::{Error, Result};
use crate::formats::{read_u32_le, DecodedInfo};
use crate::image::MipmapsImage;
use crate::pixel_format::PixelFormat;

const MAGIC: &[u8; 4] = b"DDS ";
const HEADER_SIZE: usize = 4 + 124;

const DDPF_ALPHAPIXELS: u32 = 0x1;
const DDPF_FOURCC: u32 = 0x4;

#[derive(Debug, Clone, Copy)]
struct DdsHeader {
    width: u32,
    height: u32,
    pitch_or_linear_size: u32,
    mipmap_count: u32,
    pf_flags: u32,
    fourcc: [u8; 4],
    rgb_bit_count: u32,
    r_bitmask: u32,
    a_bitmask: u32,
}

impl DdsHeader {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::BadFormat {
                container: "DDS",
                reason: "file shorter than the header",
            });
        }
        if &bytes[0..4] != MAGIC {
            return Err(Error::BadFormat {
                container: "DDS",
                reason: "missing \"DDS \" magic",
            });
        }
        Ok(Self {
            height: read_u32_le(bytes, 0x0c),
            width: read_u32_le(bytes, 0x10),
            pitch_or_linear_size: read_u32_le(bytes, 0x14),
            mipmap_count: read_u32_le(bytes, 0x1c),
            pf_flags: read_u32_le(bytes, 0x50),
            fourcc: [bytes[0x54], bytes[0x55], bytes[0x56], bytes[0x57]],
            rgb_bit_count: read_u32_le(bytes, 0x58),
            r_bitmask: read_u32_le(bytes, 0x5c),
            a_bitmask: read_u32_le(bytes, 0x68),
        })
    }

    /// Mipmap count defaults to 1 when the header stores 0.
    fn mipmaps(&self) -> u32 {
        self.mipmap_count.max(1)
    }

    fn pixel_format(&self) -> Result<PixelFormat> {
        if self.pf_flags & DDPF_FOURCC != 0 {
            let has_alpha = self.pf_flags & DDPF_ALPHAPIXELS != 0;
            return match &self.fourcc {
                b"DXT1" => Ok(if has_alpha {
                    PixelFormat::Dxt1Rgba
                } else {
                    PixelFormat::Dxt1Rgb
                }),
                b"DXT3" => Ok(PixelFormat::Dxt3Rgba),
                b"DXT5" => Ok(PixelFormat::Dxt5Rgba),
                _ => Err(Error::Unsupported(format!(
                    "DDS fourcc {:?}",
                    String::from_utf8_lossy(&self.fourcc)
                ))),
            };
        }

        match self.rgb_bit_count {
            16 => {
                if self.r_bitmask == 0xf800 {
                    Ok(PixelFormat::R5G6B5)
                } else if self.r_bitmask == 0x7c00 && self.a_bitmask == 0x8000 {
                    Ok(PixelFormat::R5G5B5A1)
                } else if self.r_bitmask == 0x0f00 && self.a_bitmask == 0xf000 {
                    Ok(PixelFormat::R4G4B4A4)
                } else {
                    Err(Error::Unsupported(format!(
                        "DDS 16-bit masks r={:#x} a={:#x}",
                        self.r_bitmask, self.a_bitmask
                    )))
                }
            }
            24 => Ok(PixelFormat::R8G8B8),
            32 => Ok(PixelFormat::R8G8B8A8),
            other => Err(Error::Unsupported(format!("DDS bit count {}", other))),
        }
    }

    fn payload_size(&self) -> Result<usize> {
        let format = self.pixel_format()?;
        if format.is_compressed() {
            // Extra levels are bounded by the level-0 size, so one doubling
            // covers the whole chain
            let factor = if self.mipmaps() > 1 { 2 } else { 1 };
            Ok(self.pitch_or_linear_size as usize * factor)
        } else {
            Ok(format.buffer_size(self.width, self.height))
        }
    }
}

/// Required output buffer size, from the header alone.
pub fn compute_size(bytes: &[u8]) -> Result<usize> {
    DdsHeader::from_bytes(bytes)?.payload_size()
}

/// Decode into a caller buffer of at least [`compute_size`] bytes.
pub fn decode_into(bytes: &[u8], dst: &mut [u8]) -> Result<DecodedInfo> {
    let header = DdsHeader::from_bytes(bytes)?;
    let format = header.pixel_format()?;
    let size = header.payload_size()?;

    if dst.len() < size {
        return Err(Error::BufferTooSmall {
            needed: size,
            got: dst.len(),
        });
    }
    let src = bytes
        .get(HEADER_SIZE..HEADER_SIZE + size)
        .ok_or(Error::BadFormat {
            container: "DDS",
            reason: "payload shorter than the header promises",
        })?;
    let dst = &mut dst[..size];
    dst.copy_from_slice(src);

    // Channel-order fixups for the alpha-first 16/32-bit layouts
    match format {
        PixelFormat::R5G5B5A1 => {
            // A1R5G5B5 -> R5G5B5A1: move the top alpha bit to bit 0
            for px in dst.chunks_exact_mut(2) {
                let v = u16::from_le_bytes([px[0], px[1]]);
                let fixed = (v << 1) | (v >> 15);
                px.copy_from_slice(&fixed.to_le_bytes());
            }
        }
        PixelFormat::R4G4B4A4 => {
            // A4R4G4B4 -> R4G4B4A4: rotate the alpha nibble to the bottom
            for px in dst.chunks_exact_mut(2) {
                let v = u16::from_le_bytes([px[0], px[1]]);
                let fixed = (v << 4) | (v >> 12);
                px.copy_from_slice(&fixed.to_le_bytes());
            }
        }
        PixelFormat::R8G8B8A8 => {
            // BGRA -> RGBA: swap bytes 0 and 2 of each pixel
            for px in dst.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }
        _ => {}
    }

    let mipmaps = if format.is_compressed() {
        header.mipmaps()
    } else {
        1 // extra uncompressed levels are not carried over
    };

    tracing::debug!(
        "decoded DDS: {}x{} {:?}, {} mipmaps",
        header.width,
        header.height,
        format,
        mipmaps
    );
    Ok(DecodedInfo {
        width: header.width,
        height: header.height,
        mipmaps,
        format,
    })
}

/// Allocating wrapper over the two-phase API.
pub fn decode(bytes: &[u8]) -> Result<MipmapsImage> {
    let size = compute_size(bytes)?;
    let mut data = vec![0u8; size];
    let info = decode_into(bytes, &mut data)?;
    Ok(MipmapsImage {
        data,
        width: info.width,
        height: info.height,
        mipmaps: info.mipmaps,
        format: info.format,
    })
}
