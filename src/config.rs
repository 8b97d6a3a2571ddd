//! Configuration types for the document improvement pipeline.
//!
//! All behaviour is controlled through [`ImproveConfig`], built via its
//! [`ImproveConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs across calls, serialise them for logging, and diff two
//! runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::ImproveError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default per-image size threshold: 10 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Default aggregate size threshold across all registered images: 50 MiB.
pub const DEFAULT_MAX_TOTAL_IMAGE_BYTES: u64 = 50 * 1024 * 1024;

/// Configuration for one document improvement run.
///
/// Built via [`ImproveConfig::builder()`] or using
/// [`ImproveConfig::default()`].
///
/// # Example
/// ```rust
/// use docimprover::ImproveConfig;
///
/// let config = ImproveConfig::builder()
///     .model("gpt-4")
///     .max_image_bytes(8 * 1024 * 1024)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImproveConfig {
    /// Maximum size of a single embedded image in bytes. Default: 10 MiB.
    ///
    /// Images above this are not registered at all: the decomposer substitutes
    /// the oversized sentinel placeholder and logs a warning, so one huge
    /// image never fails the whole document.
    pub max_image_bytes: u64,

    /// Maximum combined size of all registered images in bytes. Default: 50 MiB.
    ///
    /// Exceeding this fails the run before the rewrite step — the combined
    /// payload would be wasteful to carry through the rest of the pipeline.
    pub max_total_image_bytes: u64,

    /// Maximum display width for re-embedded images, in inches. Default: 6.0.
    pub max_width_inches: f64,

    /// Maximum display height for re-embedded images, in inches. Default: 8.0.
    pub max_height_inches: f64,

    /// Assumed source resolution when converting pixel dimensions to inches.
    /// Default: 96.
    ///
    /// DOCX stores image extents in physical units (EMU); raster payloads
    /// carry only pixels. 96 DPI is the conventional screen resolution that
    /// makes a 960 px screenshot come out 10 inches wide before capping.
    pub assumed_dpi: u32,

    /// List indentation per nesting level, in twentieths of a point.
    /// Default: 360 (18 pt per level).
    pub list_indent_twips: i32,

    /// LLM model identifier sent to the rewrite gateway. Default: "gpt-4".
    pub model: String,

    /// Sampling temperature for the rewrite completion. Default: 0.7.
    ///
    /// Rewriting is a creative task, unlike transcription: some temperature
    /// produces more natural prose, while staying low enough that structure
    /// and placeholder tokens come back intact.
    pub temperature: f32,

    /// Maximum tokens the gateway may generate. Default: 2048.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses the built-in default
    /// ([`crate::prompts::DEFAULT_SYSTEM_PROMPT`]).
    pub system_prompt: Option<String>,

    /// Per-gateway-call HTTP timeout in seconds. Default: 120.
    ///
    /// The core imposes no timeout of its own; this is plumbed into the
    /// shipped [`crate::gateway::OpenAiGateway`] as a courtesy.
    pub gateway_timeout_secs: u64,

    /// Persistent directory for extracted media files.
    ///
    /// If set, every registered image is written here as `<id>.<ext>` and the
    /// path is reported in [`crate::output::ImproveOutput::media_dir`]. If
    /// None (default), media lives only in the session scratch directory and
    /// is deleted when the run finishes.
    pub media_dir: Option<PathBuf>,
}

impl Default for ImproveConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_total_image_bytes: DEFAULT_MAX_TOTAL_IMAGE_BYTES,
            max_width_inches: 6.0,
            max_height_inches: 8.0,
            assumed_dpi: 96,
            list_indent_twips: 360,
            model: "gpt-4".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            system_prompt: None,
            gateway_timeout_secs: 120,
            media_dir: None,
        }
    }
}

impl ImproveConfig {
    /// Create a new builder for `ImproveConfig`.
    pub fn builder() -> ImproveConfigBuilder {
        ImproveConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ImproveConfig`].
#[derive(Debug)]
pub struct ImproveConfigBuilder {
    config: ImproveConfig,
}

impl ImproveConfigBuilder {
    pub fn max_image_bytes(mut self, bytes: u64) -> Self {
        self.config.max_image_bytes = bytes;
        self
    }

    pub fn max_total_image_bytes(mut self, bytes: u64) -> Self {
        self.config.max_total_image_bytes = bytes;
        self
    }

    pub fn max_width_inches(mut self, inches: f64) -> Self {
        self.config.max_width_inches = inches;
        self
    }

    pub fn max_height_inches(mut self, inches: f64) -> Self {
        self.config.max_height_inches = inches;
        self
    }

    pub fn assumed_dpi(mut self, dpi: u32) -> Self {
        self.config.assumed_dpi = dpi.max(1);
        self
    }

    pub fn list_indent_twips(mut self, twips: i32) -> Self {
        self.config.list_indent_twips = twips;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn gateway_timeout_secs(mut self, secs: u64) -> Self {
        self.config.gateway_timeout_secs = secs;
        self
    }

    pub fn media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.media_dir = Some(dir.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ImproveConfig, ImproveError> {
        let c = &self.config;
        if c.max_image_bytes == 0 {
            return Err(ImproveError::InvalidConfig(
                "max_image_bytes must be > 0".into(),
            ));
        }
        if c.max_total_image_bytes < c.max_image_bytes {
            return Err(ImproveError::InvalidConfig(format!(
                "max_total_image_bytes ({}) must be >= max_image_bytes ({})",
                c.max_total_image_bytes, c.max_image_bytes
            )));
        }
        if c.max_width_inches <= 0.0 || c.max_height_inches <= 0.0 {
            return Err(ImproveError::InvalidConfig(
                "display bounds must be positive".into(),
            ));
        }
        if c.model.is_empty() {
            return Err(ImproveError::InvalidConfig("model must be set".into()));
        }
        Ok(self.config)
    }
}
