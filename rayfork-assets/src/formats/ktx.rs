//! KTX 1.1 texture container.
//!
//! # Layout
//! ```text
//! 0x00: identifier (12 bytes): AB "KTX 11" BB 0D 0A 1A 0A
//! 0x0C: endianness u32          0x10: gl_type u32
//! 0x14: gl_type_size u32        0x18: gl_format u32
//! 0x1C: gl_internal_format u32  0x20: gl_base_internal_format u32
//! 0x24: pixel_width u32         0x28: pixel_height u32
//! 0x2C: pixel_depth u32         0x30: array_elements u32
//! 0x34: faces u32               0x38: mipmap_levels u32
//! 0x3C: key_value_bytes u32
//! 0x40: key-value blob (key_value_bytes)
//! then: level-0 image size u32, followed by the payload
//! ```
//!
//! All words are little-endian. Only the ETC family of internal-format
//! tokens is accepted; the payload passes through untouched.

use crate::error::{Error, Result};
use crate::formats::{read_u32_le, DecodedInfo};
use crate::image::MipmapsImage;
use crate::pixel_format::PixelFormat;

const HEADER_SIZE: usize = 64;

// GL internal-format tokens
const GL_ETC1_RGB8_OES: u32 = 0x8d64;
const GL_COMPRESSED_RGB8_ETC2: u32 = 0x9274;
const GL_COMPRESSED_RGBA8_ETC2_EAC: u32 = 0x9278;

#[derive(Debug, Clone, Copy)]
struct KtxHeader {
    internal_format: u32,
    width: u32,
    height: u32,
    mipmap_levels: u32,
    key_value_bytes: u32,
}

impl KtxHeader {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::BadFormat {
                container: "KTX",
                reason: "file shorter than the header",
            });
        }
        if &bytes[1..7] != b"KTX 11" {
            return Err(Error::BadFormat {
                container: "KTX",
                reason: "missing \"KTX 11\" identifier",
            });
        }
        Ok(Self {
            internal_format: read_u32_le(bytes, 0x1c),
            width: read_u32_le(bytes, 0x24),
            height: read_u32_le(bytes, 0x28),
            mipmap_levels: read_u32_le(bytes, 0x38),
            key_value_bytes: read_u32_le(bytes, 0x3c),
        })
    }

    fn pixel_format(&self) -> Result<PixelFormat> {
        match self.internal_format {
            GL_ETC1_RGB8_OES => Ok(PixelFormat::Etc1Rgb),
            GL_COMPRESSED_RGB8_ETC2 => Ok(PixelFormat::Etc2Rgb),
            GL_COMPRESSED_RGBA8_ETC2_EAC => Ok(PixelFormat::Etc2EacRgba),
            other => Err(Error::Unsupported(format!(
                "KTX internal format {:#x}",
                other
            ))),
        }
    }

    /// File offset of the level-0 image-size word.
    fn payload_offset(&self) -> usize {
        HEADER_SIZE + self.key_value_bytes as usize
    }
}

/// Required output buffer size: the level-0 image size word.
pub fn compute_size(bytes: &[u8]) -> Result<usize> {
    let header = KtxHeader::from_bytes(bytes)?;
    header.pixel_format()?;
    let offset = header.payload_offset();
    if bytes.len() < offset + 4 {
        return Err(Error::BadFormat {
            container: "KTX",
            reason: "missing level-0 image size",
        });
    }
    Ok(read_u32_le(bytes, offset) as usize)
}

/// Decode into a caller buffer of at least [`compute_size`] bytes.
pub fn decode_into(bytes: &[u8], dst: &mut [u8]) -> Result<DecodedInfo> {
    let header = KtxHeader::from_bytes(bytes)?;
    let format = header.pixel_format()?;
    let size = compute_size(bytes)?;

    if dst.len() < size {
        return Err(Error::BufferTooSmall {
            needed: size,
            got: dst.len(),
        });
    }
    let start = header.payload_offset() + 4;
    let src = bytes.get(start..start + size).ok_or(Error::BadFormat {
        container: "KTX",
        reason: "payload shorter than the image size word promises",
    })?;
    dst[..size].copy_from_slice(src);

    tracing::debug!(
        "decoded KTX: {}x{} {:?}, {} levels in file",
        header.width,
        header.height,
        format,
        header.mipmap_levels
    );
    Ok(DecodedInfo {
        width: header.width,
        height: header.height,
        mipmaps: 1, // only level 0 is carried
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

    fn build_ktx(internal_format: u32, width: u32, height: u32, kv: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_SIZE];
        out[0] = 0xab;
        out[1..7].copy_from_slice(b"KTX 11");
        out[7] = 0xbb;
        out[8..12].copy_from_slice(&[0x0d, 0x0a, 0x1a, 0x0a]);
        out[0x0c..0x10].copy_from_slice(&0x04030201u32.to_le_bytes());
        out[0x1c..0x20].copy_from_slice(&internal_format.to_le_bytes());
        out[0x24..0x28].copy_from_slice(&width.to_le_bytes());
        out[0x28..0x2c].copy_from_slice(&height.to_le_bytes());
        out[0x38..0x3c].copy_from_slice(&1u32.to_le_bytes());
        out[0x3c..0x40].copy_from_slice(&(kv.len() as u32).to_le_bytes());
        out.extend_from_slice(kv);
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_rejects_bad_identifier() {
        let mut bytes = build_ktx(GL_ETC1_RGB8_OES, 4, 4, &[], &[0u8; 8]);
        bytes[3] = b'Z';
        assert!(matches!(
            compute_size(&bytes),
            Err(Error::BadFormat { container: "KTX", .. })
        ));
    }

    #[test]
    fn test_etc1_payload_passthrough() {
        let bytes = build_ktx(GL_ETC1_RGB8_OES, 8, 8, &[], &[0x5a; 32]);
        assert_eq!(compute_size(&bytes).unwrap(), 32);

        let img = decode(&bytes).unwrap();
        assert_eq!(img.format, PixelFormat::Etc1Rgb);
        assert_eq!((img.width, img.height), (8, 8));
        assert_eq!(img.data, vec![0x5a; 32]);
    }

    #[test]
    fn test_key_value_blob_is_skipped() {
        let kv = b"KTXorientation\0S=r,T=d\0\0";
        let bytes = build_ktx(GL_COMPRESSED_RGB8_ETC2, 4, 4, kv, &[0x77; 8]);
        let img = decode(&bytes).unwrap();
        assert_eq!(img.format, PixelFormat::Etc2Rgb);
        assert_eq!(img.data, vec![0x77; 8]);
    }

    #[test]
    fn test_eac_token() {
        let bytes = build_ktx(GL_COMPRESSED_RGBA8_ETC2_EAC, 4, 4, &[], &[0u8; 16]);
        assert_eq!(decode(&bytes).unwrap().format, PixelFormat::Etc2EacRgba);
    }

    #[test]
    fn test_unknown_token() {
        let bytes = build_ktx(0x1234, 4, 4, &[], &[0u8; 16]);
        assert!(matches!(compute_size(&bytes), Err(Error::Unsupported(_))));
    }
}
