//! The conversion session: scratch storage scoped to one improvement run.
//!
//! A [`Session`] binds the transient state of one document-in, document-out
//! transformation — a private temporary directory for extracted media and
//! intermediate text. It is created at the start of `improve` and released on
//! every exit path, success or failure: the `TempDir` inside is deleted on
//! drop, including during unwinding, so sustained load cannot accumulate
//! scratch directories.
//!
//! Sessions never share state. Concurrent runs each get their own isolated
//! subtree, so no locking is required between them.

use crate::error::ImproveError;
use crate::registry::ImageRegistry;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Scratch storage for one improvement run.
#[derive(Debug)]
pub struct Session {
    scratch: TempDir,
}

impl Session {
    /// Create a fresh session with its own scratch directory.
    pub fn new() -> Result<Self, ImproveError> {
        let scratch = tempfile::Builder::new()
            .prefix("docimprover-")
            .tempdir()
            .map_err(|e| ImproveError::Internal(format!("failed to create scratch dir: {e}")))?;
        debug!(path = %scratch.path().display(), "Session scratch created");
        Ok(Self { scratch })
    }

    /// Root of this session's scratch subtree.
    pub fn path(&self) -> &Path {
        self.scratch.path()
    }

    /// Write every registered asset into `dir` as `<id>.<ext>`, creating the
    /// directory if needed. Returns the directory path.
    ///
    /// Callers pass either a persistent directory (the files outlive the
    /// session) or a subdirectory of [`Session::path`] (deleted with the
    /// session).
    pub fn extract_media(
        &self,
        registry: &ImageRegistry,
        dir: &Path,
    ) -> Result<PathBuf, ImproveError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| ImproveError::Internal(format!("failed to create media dir: {e}")))?;

        for asset in registry.iter() {
            let file = dir.join(format!("{}.{}", asset.id, extension_for(&asset.content_type)));
            std::fs::write(&file, &asset.bytes).map_err(|e| {
                ImproveError::Internal(format!("failed to write {}: {e}", file.display()))
            })?;
        }

        debug!(count = registry.len(), dir = %dir.display(), "Extracted media");
        Ok(dir.to_path_buf())
    }
}

/// File extension for a media content type.
fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/x-emf" => "emf",
        "image/x-wmf" => "wmf",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}
