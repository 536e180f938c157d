//! File IO capability for asset loaders that resolve paths.
//!
//! Loaders never touch the filesystem directly. Anything that reads an asset
//! by path (fonts, images, glTF external buffers) takes `&dyn AssetIo`, so
//! applications can redirect reads to an archive, a memory pack, or tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Maximum file size `StdIo` will read into memory.
pub const MAX_ASSET_BYTES: u64 = 256 * 1024 * 1024; // 256 MiB

pub trait AssetIo {
    /// Size of the file in bytes, or 0 when it does not exist.
    fn file_size(&self, path: &Path) -> u64;

    /// Read the whole file into memory.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Filesystem-backed IO with a size cap.
#[derive(Debug, Clone)]
pub struct StdIo {
    pub max_bytes: u64,
}

impl Default for StdIo {
    fn default() -> Self {
        Self {
            max_bytes: MAX_ASSET_BYTES,
        }
    }
}

impl AssetIo for StdIo {
    fn file_size(&self, path: &Path) -> u64 {
        std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let len = std::fs::metadata(path)
            .map_err(|e| Error::Io {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .len();
        if len == 0 {
            return Err(Error::Io {
                path: path.to_path_buf(),
                reason: "file is empty".into(),
            });
        }
        if len > self.max_bytes {
            return Err(Error::Io {
                path: path.to_path_buf(),
                reason: format!("file too large ({} bytes, max {})", len, self.max_bytes),
            });
        }
        std::fs::read(path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// In-memory IO used by tests and embedded asset packs.
#[derive(Debug, Clone, Default)]
pub struct MemoryIo {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.files.insert(path.into(), data);
    }
}

impl AssetIo for MemoryIo {
    fn file_size(&self, path: &Path) -> u64 {
        self.files.get(path).map(|d| d.len() as u64).unwrap_or(0)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| Error::Io {
            path: path.to_path_buf(),
            reason: "not present in memory pack".into(),
        })
    }
}
