//! Pipeline stages for the document improvement round trip.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap
//! implementations without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ decompose ──▶ gateway ──▶ postprocess ──▶ segment ──▶ recompose
//! (path)    (text +       (rewrite)   (cleanup)       (blocks)    (DOCX out)
//!            registry)
//! ```
//!
//! 1. [`input`]       — validate the caller-supplied path and load the bytes
//! 2. [`decompose`]   — walk the container, extract text, park images in the
//!    registry behind placeholder tokens
//! 3. the gateway call — the only stage with network I/O, behind
//!    [`crate::gateway::RewriteGateway`]
//! 4. [`postprocess`] — deterministic cleanup of the rewritten markdown
//! 5. [`crate::markdown::segment`] — classify lines into typed blocks
//! 6. [`recompose`]   — rebuild a document, re-embedding registry assets

pub mod decompose;
pub mod input;
pub mod postprocess;
pub mod recompose;
