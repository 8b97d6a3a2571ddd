//! The end-to-end improvement run: decompose, rewrite, recompose.
//!
//! This module owns the orchestration and nothing else. Every transformation
//! lives in a pipeline stage; here we only thread data between stages, time
//! them, and assemble the [`ImproveOutput`].

use crate::config::ImproveConfig;
use crate::error::ImproveError;
use crate::gateway::RewriteGateway;
use crate::markdown;
use crate::output::{ImproveOutput, ImproveStats};
use crate::pipeline::{decompose, input, postprocess, recompose};
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use crate::session::Session;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Improve the document at `path` and return the finished DOCX in memory.
///
/// Fatal conditions (unreadable input, empty document, aggregate image size
/// over threshold, gateway failure) abort with [`ImproveError`]; per-image
/// problems never do and are reported in the output instead.
pub fn improve(
    path: impl AsRef<Path>,
    gateway: &dyn RewriteGateway,
    config: &ImproveConfig,
) -> Result<ImproveOutput, ImproveError> {
    let bytes = input::read_docx(path)?;
    improve_bytes(&bytes, gateway, config)
}

/// Improve an in-memory DOCX payload.
///
/// Same pipeline as [`improve`] minus the path resolution; callers that
/// receive documents over the network start here.
pub fn improve_bytes(
    docx: &[u8],
    gateway: &dyn RewriteGateway,
    config: &ImproveConfig,
) -> Result<ImproveOutput, ImproveError> {
    let started = Instant::now();

    input::validate_magic(docx).map_err(|magic| ImproveError::NotADocx {
        path: "<memory>".into(),
        magic,
    })?;

    let session = Session::new()?;

    // Stage 1: pull text and images apart.
    let decomposition = decompose::decompose(docx, config)?;
    let original_text = decomposition.text;
    let mut registry = decomposition.registry;
    info!(
        paragraphs = decomposition.paragraph_count,
        images = registry.len(),
        image_bytes = registry.total_bytes(),
        "Decomposed document"
    );

    // Persist media before the gateway call so the files survive even when
    // the rewrite fails and the caller wants to inspect what was extracted.
    let media_dir = match &config.media_dir {
        Some(dir) => Some(session.extract_media(&registry, dir)?),
        None => {
            let scratch = session.path().join("media");
            session.extract_media(&registry, &scratch)?;
            None
        }
    };

    let images_registered = registry.len();
    let image_bytes = registry.total_bytes();

    // Stage 2: the rewrite. The only stage that leaves the process.
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let gateway_started = Instant::now();
    let raw = gateway.rewrite(system_prompt, &original_text)?;
    let gateway_duration_ms = gateway_started.elapsed().as_millis() as u64;
    info!(
        elapsed_ms = gateway_duration_ms,
        chars = raw.len(),
        "Gateway rewrite complete"
    );

    // Stage 3: cleanup, classification, reassembly.
    let rewritten_text = postprocess::clean_markdown(&raw);
    let nodes = markdown::segment(&rewritten_text);
    let recomposition = recompose::recompose(&nodes, &mut registry, config)?;

    for err in &recomposition.embed_errors {
        warn!(id = err.id(), %err, "Image not re-embedded");
    }
    // Assets still in the registry had their placeholders dropped by the
    // rewrite despite the prompt. Their images are absent from the output.
    if !registry.is_empty() {
        warn!(
            orphaned = registry.len(),
            "Placeholders lost during rewrite; corresponding images omitted"
        );
    }
    registry.clear();

    let stats = ImproveStats {
        paragraphs: decomposition.paragraph_count,
        images_registered,
        images_embedded: recomposition.images_embedded,
        image_bytes,
        total_duration_ms: started.elapsed().as_millis() as u64,
        gateway_duration_ms,
    };
    info!(
        total_ms = stats.total_duration_ms,
        embedded = stats.images_embedded,
        "Improvement run complete"
    );

    Ok(ImproveOutput {
        document: recomposition.docx,
        original_text,
        rewritten_text,
        media_dir,
        embed_errors: recomposition.embed_errors,
        stats,
    })
}

/// Improve a document and write the result to `output_path` atomically.
///
/// The payload is written to a sibling temp file and renamed into place, so
/// a crash mid-write never leaves a truncated document at the target path.
pub fn improve_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    gateway: &dyn RewriteGateway,
    config: &ImproveConfig,
) -> Result<ImproveOutput, ImproveError> {
    let output_path = output_path.as_ref();
    let output = improve(input_path, gateway, config)?;
    write_atomic(output_path, &output.document)?;
    info!(path = %output_path.display(), size = output.document.len(), "Wrote improved document");
    Ok(output)
}

fn write_atomic(path: &Path, payload: &[u8]) -> Result<(), ImproveError> {
    let io_err = |source: std::io::Error| ImproveError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))
        .map_err(io_err)?;
    std::io::Write::write_all(&mut tmp, payload).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
