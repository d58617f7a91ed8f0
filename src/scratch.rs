// SPDX-License-Identifier: MIT

//! Scoped scratch files with guaranteed cleanup
//!
//! Every analysis cycle creates transient files (the resized raster, the
//! persisted upload). Each gets a per-request unique name and is removed
//! when its guard drops, on every exit path.

use std::path::{Path, PathBuf};
use tracing::warn;

use crate::Result;

/// A uniquely named temporary file removed on drop.
///
/// Removal failure is logged and never masks the primary result.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Reserve a unique path under `dir` without creating the file yet.
    /// The caller is expected to write to `path()` before the guard drops.
    pub fn reserve(dir: &Path, stem: &str, extension: &str) -> Self {
        let name = format!("{}_{}.{}", stem, uuid::Uuid::new_v4(), extension);
        Self {
            path: dir.join(name),
        }
    }

    /// Reserve a unique path under `dir` and write `bytes` to it.
    pub fn create(dir: &Path, stem: &str, extension: &str, bytes: &[u8]) -> Result<Self> {
        let file = Self::reserve(dir, stem, extension);
        std::fs::write(&file.path, bytes)?;
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("Failed to remove scratch file {:?}: {}", self.path, e);
            }
        }
    }
}
