//! # docimprover
//!
//! Improve the prose of Word documents with an LLM while carrying every
//! embedded image through the round trip untouched.
//!
//! ## Why this crate?
//!
//! Feeding a whole DOCX to a language model either loses the images or forces
//! the model to hallucinate them back. Instead this crate pulls the document
//! apart: text goes to the model as Markdown, images are parked in an
//! in-memory registry behind opaque `[IMAGE:<id>]` tokens the model is
//! instructed to preserve verbatim. After the rewrite the tokens are resolved
//! back into the original image payloads, so the output document contains the
//! improved prose with the exact source images in their original positions.
//!
//! ## Pipeline Overview
//!
//! ```text
//! DOCX
//!  │
//!  ├─ 1. Input      validate path and container magic
//!  ├─ 2. Decompose  walk the XML, extract text, park images behind tokens
//!  ├─ 3. Rewrite    one gateway call with the placeholder-preserving prompt
//!  ├─ 4. Polish     fence stripping, token isolation, whitespace cleanup
//!  ├─ 5. Segment    classify Markdown lines into typed blocks
//!  └─ 6. Recompose  rebuild a DOCX, re-embedding registry assets
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docimprover::{improve_to_file, ImproveConfig, OpenAiGateway};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ImproveConfig::default();
//!     let gateway = OpenAiGateway::from_env(&config)?;
//!     let output = improve_to_file("report.docx", "report.improved.docx", &gateway, &config)?;
//!     eprintln!(
//!         "{} paragraphs, {} images, {} ms",
//!         output.stats.paragraphs,
//!         output.stats.images_embedded,
//!         output.stats.total_duration_ms,
//!     );
//!     Ok(())
//! }
//! ```
//!
//! Any `Fn(&str, &str) -> Result<String, ImproveError>` works as a gateway,
//! which keeps tests and custom backends trivial:
//!
//! ```rust,no_run
//! use docimprover::{improve, ImproveConfig, ImproveError};
//!
//! let echo = |_system: &str, text: &str| -> Result<String, ImproveError> {
//!     Ok(text.to_string())
//! };
//! let output = improve("report.docx", &echo, &ImproveConfig::default())?;
//! # Ok::<(), ImproveError>(())
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docimprove` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docimprover = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod gateway;
pub mod improve;
pub mod markdown;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod registry;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ImproveConfig, ImproveConfigBuilder};
pub use error::{EmbedError, ImproveError};
pub use gateway::{OpenAiGateway, RewriteGateway};
pub use improve::{improve, improve_bytes, improve_to_file};
pub use output::{ImproveOutput, ImproveStats};
pub use registry::{ImageAsset, ImageRegistry};
