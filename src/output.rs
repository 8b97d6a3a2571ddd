//! Result types returned by a completed improvement run.

use crate::error::EmbedError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything produced by one successful improvement run.
///
/// The run is considered successful even when some images could not be
/// re-embedded; those failures are reported per image in
/// [`embed_errors`](Self::embed_errors) so the caller can decide whether a
/// partially illustrated document is acceptable.
#[derive(Debug)]
pub struct ImproveOutput {
    /// The improved document as a complete DOCX payload.
    pub document: Vec<u8>,

    /// Text extracted from the source document, placeholders included, before
    /// the rewrite. Useful for diffing against the rewrite.
    pub original_text: String,

    /// Cleaned rewrite as returned by the gateway and post-processed.
    pub rewritten_text: String,

    /// Directory holding extracted media files, present only when
    /// [`crate::ImproveConfig::media_dir`] was set. Scratch-only media is
    /// deleted with the session and not reported.
    pub media_dir: Option<PathBuf>,

    /// Per-image failures from the recompose step, in document order.
    pub embed_errors: Vec<EmbedError>,

    /// Counters and timings for the run.
    pub stats: ImproveStats,
}

/// Counters and timings for one improvement run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImproveStats {
    /// Non-empty paragraphs found in the source document.
    pub paragraphs: usize,
    /// Images registered during decomposition (oversized images excluded).
    pub images_registered: usize,
    /// Images successfully re-embedded in the output document.
    pub images_embedded: usize,
    /// Combined payload size of registered images, in bytes.
    pub image_bytes: u64,
    /// Wall-clock duration of the whole run, in milliseconds.
    pub total_duration_ms: u64,
    /// Portion of the run spent waiting on the rewrite gateway, in
    /// milliseconds.
    pub gateway_duration_ms: u64,
}
