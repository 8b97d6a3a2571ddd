//! Error types for the docimprover library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ImproveError`] — **Fatal**: the improvement run cannot proceed at all
//!   (bad input file, empty document, oversized image payload, gateway
//!   failure). Returned as `Err(ImproveError)` from the top-level `improve*`
//!   functions. Fatal errors abort the pipeline without partial side effects
//!   beyond already-released scratch storage.
//!
//! * [`EmbedError`] — **Non-fatal**: a single image failed to re-embed during
//!   recomposition, but the rest of the document is fine. Accumulated into
//!   [`crate::output::ImproveOutput::embed_errors`] so callers can inspect
//!   partial success rather than losing the whole document to one bad image.
//!
//! A single image exceeding the per-image size threshold is neither: it
//! degrades to a sentinel placeholder during decomposition and is only
//! logged as a warning.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docimprover library.
///
/// Per-image re-embedding failures use [`EmbedError`] and are stored in
/// [`crate::output::ImproveOutput`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ImproveError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a DOCX container.
    #[error("File is not a valid Word document: '{path}'\nFirst bytes: {magic:?}")]
    NotADocx { path: PathBuf, magic: [u8; 4] },

    /// The zip container opened but the WordprocessingML inside is unusable.
    #[error("Word document is corrupt or unsupported: {detail}")]
    InvalidDocx { detail: String },

    // ── Decomposition errors ──────────────────────────────────────────────
    /// No extractable text remained after decomposition.
    ///
    /// Raised before any Rewrite Gateway call is made.
    #[error("Document is empty: no extractable text found")]
    EmptyDocument,

    /// The combined size of all registered images exceeds the aggregate
    /// threshold; sending the payload downstream would be wasteful.
    #[error(
        "Total image size ({:.1}MB) exceeds maximum allowed size ({:.1}MB)",
        *total_bytes as f64 / 1024.0 / 1024.0,
        *limit_bytes as f64 / 1024.0 / 1024.0
    )]
    ImagesTooLarge { total_bytes: u64, limit_bytes: u64 },

    // ── Gateway errors ────────────────────────────────────────────────────
    /// The rewrite gateway failed (transport or service error).
    ///
    /// No retry is attempted at this layer; retry/backoff, if desired,
    /// belongs to the caller.
    #[error("Rewrite gateway failed: {message}")]
    GatewayFailed { message: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output document.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image during recomposition.
///
/// The recomposer is best-effort per image: any of these is recorded and the
/// rest of the document is still produced.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum EmbedError {
    /// A placeholder referenced an id with no registered asset.
    #[error("Image '{id}': no registered asset for this placeholder")]
    AssetMissing { id: String },

    /// The asset bytes could not be decoded to obtain pixel dimensions.
    #[error("Image '{id}': undecodable image data: {detail}")]
    UndecodableImage { id: String, detail: String },
}

impl EmbedError {
    /// The placeholder id this error refers to.
    pub fn id(&self) -> &str {
        match self {
            EmbedError::AssetMissing { id } | EmbedError::UndecodableImage { id, .. } => id,
        }
    }
}
