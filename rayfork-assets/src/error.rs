//! Error type shared across the asset pipeline.
//!
//! Every fallible operation returns `Result<T, Error>`. Errors are absorbing:
//! a failed load propagates with `?` and downstream code never sees a
//! half-built entity.

use std::path::PathBuf;

use thiserror::Error;

use crate::pixel_format::PixelFormat;

#[derive(Debug, Error)]
pub enum Error {
    /// Rectangle out of bounds, zero-size input, mismatched image sizes.
    #[error("bad argument: {0}")]
    BadArgument(&'static str),

    /// Destination buffer smaller than the required output.
    #[error("destination buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall { needed: usize, got: usize },

    /// File missing, unreadable, or empty.
    #[error("failed to read {path:?}: {reason}")]
    Io { path: PathBuf, reason: String },

    /// Magic or version mismatch in a container decoder.
    #[error("not a valid {container} file: {reason}")]
    BadFormat {
        container: &'static str,
        reason: &'static str,
    },

    /// Recognized but unimplemented format variant.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A delegated decoder refused the input.
    #[error("{library} failed to decode: {reason}")]
    Decode {
        library: &'static str,
        reason: String,
    },

    /// Operation requires an uncompressed pixel format.
    #[error("operation requires an uncompressed pixel format, got {0:?}")]
    CompressedFormat(PixelFormat),
}

pub type Result<T> = std::result::Result<T, Error>;
