//! PKM (ETC texture) container.
//!
//! # Layout
//! ```text
//! 0x00: magic "PKM " (4 bytes)
//! 0x04: version "10" or "20" (2 bytes ASCII)
//! 0x06: format u16 (big-endian: 0 = ETC1_RGB, 1 = ETC2_RGB, 3 = ETC2_EAC_RGBA)
//! 0x08: padded width u16 (big-endian, multiple of 4)
//! 0x0A: padded height u16 (big-endian)
//! 0x0C: original width u16 (big-endian)
//! 0x0E: original height u16 (big-endian)
//! 0x10: block payload
//! ```
//!
//! Every 16-bit header field is big-endian. The payload is passed through.

use crate::error::{Error, Result};
use crate::formats::{read_u16_be, DecodedInfo};
use crate::image::MipmapsImage;
use crate::pixel_format::PixelFormat;

const MAGIC: &[u8; 4] = b"PKM ";
const HEADER_SIZE: usize = 16;

#[derive(Debug, Clone, Copy)]
struct PkmHeader {
    format: u16,
    width: u16,
    height: u16,
}

impl PkmHeader {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::BadFormat {
                container: "PKM",
                reason: "file shorter than the header",
            });
        }
        if &bytes[0..4] != MAGIC {
            return Err(Error::BadFormat {
                container: "PKM",
                reason: "missing \"PKM \" magic",
            });
        }
        Ok(Self {
            format: read_u16_be(bytes, 0x06),
            width: read_u16_be(bytes, 0x08),
            height: read_u16_be(bytes, 0x0a),
        })
    }

    fn pixel_format(&self) -> Result<PixelFormat> {
        match self.format {
            0 => Ok(PixelFormat::Etc1Rgb),
            1 => Ok(PixelFormat::Etc2Rgb),
            3 => Ok(PixelFormat::Etc2EacRgba),
            other => Err(Error::Unsupported(format!("PKM format code {}", other))),
        }
    }

    fn payload_size(&self) -> Result<usize> {
        Ok(self
            .pixel_format()?
            .buffer_size(self.width as u32, self.height as u32))
    }
}

/// Required output buffer size, from the header alone.
pub fn compute_size(bytes: &[u8]) -> Result<usize> {
    PkmHeader::from_bytes(bytes)?.payload_size()
}

/// Decode into a caller buffer of at least [`compute_size`] bytes.
pub fn decode_into(bytes: &[u8], dst: &mut [u8]) -> Result<DecodedInfo> {
    let header = PkmHeader::from_bytes(bytes)?;
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
            container: "PKM",
            reason: "payload shorter than the header promises",
        })?;
    dst[..size].copy_from_slice(src);

    tracing::debug!(
        "decoded PKM: {}x{} {:?}",
        header.width,
        header.height,
        format
    );
    Ok(DecodedInfo {
        width: header.width as u32,
        height: header.height as u32,
        mipmaps: 1,
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

#[cfg(test)]
mod tests {
    use super::*;

    fn build_pkm(format: u16, width: u16, height: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(b"20");
        out.extend_from_slice(&format.to_be_bytes());
        out.extend_from_slice(&width.to_be_bytes());
        out.extend_from_slice(&height.to_be_bytes());
        out.extend_from_slice(&width.to_be_bytes());
        out.extend_from_slice(&height.to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_rejects_bad_magic() {
        assert!(matches!(
            compute_size(b"NOPE............"),
            Err(Error::BadFormat { container: "PKM", .. })
        ));
    }

    #[test]
    fn test_etc1_is_4bpp() {
        // 8x8 at 4 bpp: 32 bytes
        let bytes = build_pkm(0, 8, 8, &[0x11; 32]);
        assert_eq!(compute_size(&bytes).unwrap(), 32);

        let img = decode(&bytes).unwrap();
        assert_eq!(img.format, PixelFormat::Etc1Rgb);
        assert_eq!((img.width, img.height), (8, 8));
        assert_eq!(img.data, vec![0x11; 32]);
    }

    #[test]
    fn test_etc2_eac_is_8bpp() {
        let bytes = build_pkm(3, 8, 8, &[0x22; 64]);
        assert_eq!(compute_size(&bytes).unwrap(), 64);
        assert_eq!(decode(&bytes).unwrap().format, PixelFormat::Etc2EacRgba);
    }

    #[test]
    fn test_header_fields_are_big_endian() {
        // width 260 = 0x0104 stored big-endian as [0x01, 0x04]
        let bytes = build_pkm(1, 260, 4, &vec![0u8; 260 * 4 / 2]);
        let img = decode(&bytes).unwrap();
        assert_eq!(img.width, 260);
        assert_eq!(img.format, PixelFormat::Etc2Rgb);
    }

    #[test]
    fn test_unknown_format_code() {
        let bytes = build_pkm(7, 4, 4, &[0u8; 8]);
        assert!(matches!(compute_size(&bytes), Err(Error::Unsupported(_))));
    }
}
