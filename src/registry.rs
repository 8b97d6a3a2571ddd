//! The image registry: session-scoped storage for extracted image assets.
//!
//! During decomposition every embedded image is replaced in the text stream
//! by a placeholder token of the form `[IMAGE:<id>]` while its payload is
//! parked here. The recomposer resolves placeholders back into pictures and
//! evicts each asset immediately after a successful re-embedding, so peak
//! memory stays bounded while processing image-heavy documents.
//!
//! The registry is an explicit struct threaded through the pipeline, never a
//! process-wide singleton: concurrent improvement runs each own their own
//! registry and cannot interfere.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use uuid::Uuid;

/// Reserved id for images dropped because they exceed the per-image size
/// threshold. Lives outside the UUID namespace so it can never collide with
/// an issued identifier.
pub const OVERSIZED_SENTINEL_ID: &str = "oversized";

/// Text rendered into the output document in place of an oversized image.
pub const OVERSIZED_MARKER_TEXT: &str = "[image omitted: too large to process]";

/// Matches a line that consists solely of a placeholder token, capturing the id.
static RE_PLACEHOLDER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[IMAGE:([^\]]+)\]$").unwrap());

/// Render the placeholder token for an id.
pub fn placeholder(id: &str) -> String {
    format!("[IMAGE:{id}]")
}

/// If `line` (after trimming) is exactly one placeholder token, return its id.
pub fn parse_placeholder_line(line: &str) -> Option<&str> {
    RE_PLACEHOLDER_LINE
        .captures(line.trim())
        .map(|caps| caps.get(1).unwrap().as_str().trim())
}

/// One extracted image: payload plus the metadata needed to re-embed it.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    /// Opaque unique token; appears in the text stream exactly once as
    /// `[IMAGE:<id>]`.
    pub id: String,
    /// Raw image payload as stored in the source container.
    pub bytes: Vec<u8>,
    /// MIME content type, derived from the media part's extension.
    pub content_type: String,
    /// Original pixel dimensions `(width, height)`. `None` when the payload
    /// did not decode at registration time; the recomposer reports such
    /// assets as per-image errors instead of failing the run.
    pub dimensions: Option<(u32, u32)>,
}

/// In-memory id → [`ImageAsset`] mapping, owned by one conversion session.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    assets: HashMap<String, ImageAsset>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an image payload under a freshly issued unique id and return the id.
    pub fn register(
        &mut self,
        bytes: Vec<u8>,
        content_type: impl Into<String>,
        dimensions: Option<(u32, u32)>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        self.assets.insert(
            id.clone(),
            ImageAsset {
                id: id.clone(),
                bytes,
                content_type: content_type.into(),
                dimensions,
            },
        );
        id
    }

    /// Look up an asset without removing it.
    pub fn get(&self, id: &str) -> Option<&ImageAsset> {
        self.assets.get(id)
    }

    /// Remove and return an asset. Used by the recomposer to evict each image
    /// immediately after successful insertion.
    pub fn take(&mut self, id: &str) -> Option<ImageAsset> {
        self.assets.remove(id)
    }

    /// Combined payload size of all registered assets, in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.assets.values().map(|a| a.bytes.len() as u64).sum()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Iterate over all registered assets in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &ImageAsset> {
        self.assets.values()
    }

    /// Drop every asset. Called when the session ends.
    pub fn clear(&mut self) {
        self.assets.clear();
    }
}
