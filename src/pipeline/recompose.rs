//! Recomposition: typed block stream + image registry → new DOCX.
//!
//! Each [`DocNode`] becomes one paragraph in the output document:
//!
//! * [`TextBlock`]s get a style per block kind (heading styles per level,
//!   list paragraphs with real Word numbering and indentation proportional
//!   to nesting level) and their inline spans become styled runs — bold and
//!   italic flags set directly, code spans in a fixed monospace typeface.
//!   Grouped lines are joined inside the paragraph with explicit line breaks.
//! * Image placeholders resolve through the registry. Display dimensions
//!   come from pixel dimensions at the assumed source resolution, uniformly
//!   downscaled to the configured bounds (width cap first, height re-checked
//!   after). Each asset is evicted from the registry immediately after a
//!   successful insertion to bound memory on large documents.
//!
//! The recomposer is best-effort per image: any single embedding failure is
//! recorded in the returned error list and the rest of the document is still
//! produced. An empty stream is not an error here — emptiness was already
//! rejected before the rewrite step.

use crate::config::ImproveConfig;
use crate::error::{EmbedError, ImproveError};
use crate::markdown::{BlockKind, DocNode, Span, TextBlock};
use crate::registry::{ImageRegistry, OVERSIZED_MARKER_TEXT, OVERSIZED_SENTINEL_ID};
use docx_rs::{
    AbstractNumbering, BreakType, Docx, IndentLevel, Level, LevelJc, LevelText, LineSpacing,
    LineSpacingType, NumberFormat, Numbering, NumberingId, Paragraph, Pic, Run, RunFonts,
    SpecialIndentType, Start, Style, StyleType,
};
use std::io::Cursor;
use tracing::{debug, warn};

/// EMUs (English Metric Units) per inch, the unit DOCX uses for extents.
const EMU_PER_INCH: f64 = 914_400.0;

/// Typeface used for `code` spans.
const MONOSPACE_FONT: &str = "Courier New";

/// Numbering instance ids for the two list families.
const BULLET_NUMBERING_ID: usize = 1;
const DECIMAL_NUMBERING_ID: usize = 2;

/// Line height for non-heading paragraphs, in 240ths of a line: 276 = 1.15
/// lines. Headings rely on their before/after spacing instead.
const BODY_LINE_HEIGHT: i32 = 276;

/// Run font sizes in half-points, per heading level (index 0 = default text).
///
/// Mirrors the document formatting table: 11 pt body, 16/14/12 pt for the
/// first three heading levels, 11 pt beyond that.
const HEADING_SIZES: [usize; 7] = [22, 32, 28, 24, 22, 22, 22];

/// Paragraph spacing (before, after) in twentieths of a point, per heading
/// level (index 0 = default text: 6 pt both sides).
const HEADING_SPACING: [(u32, u32); 7] = [
    (120, 120),
    (240, 120),
    (200, 120),
    (160, 120),
    (120, 120),
    (120, 120),
    (120, 120),
];

/// The result of recomposing one document.
#[derive(Debug)]
pub struct Recomposition {
    /// The finished DOCX payload.
    pub docx: Vec<u8>,
    /// Non-fatal per-image failures, in document order.
    pub embed_errors: Vec<EmbedError>,
    /// Number of images successfully re-embedded.
    pub images_embedded: usize,
}

/// Build a new document from the node stream and the image registry.
pub fn recompose(
    nodes: &[DocNode],
    registry: &mut ImageRegistry,
    config: &ImproveConfig,
) -> Result<Recomposition, ImproveError> {
    let mut docx = base_document();
    let mut embed_errors = Vec::new();
    let mut images_embedded = 0usize;

    for node in nodes {
        match node {
            DocNode::Block(block) => {
                docx = docx.add_paragraph(block_paragraph(block, config));
            }
            DocNode::Image(id) if id.as_str() == OVERSIZED_SENTINEL_ID => {
                // Graceful degradation: the image was dropped at decomposition
                // time; reproduce the marker as plain text.
                docx = docx
                    .add_paragraph(Paragraph::new().add_run(Run::new().add_text(OVERSIZED_MARKER_TEXT)));
            }
            DocNode::Image(id) => match image_paragraph(id, registry, config) {
                Ok(paragraph) => {
                    docx = docx.add_paragraph(paragraph);
                    registry.take(id);
                    images_embedded += 1;
                }
                Err(e) => {
                    warn!("{e}");
                    embed_errors.push(e);
                }
            },
        }
    }

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| ImproveError::Internal(format!("failed to pack document: {e}")))?;

    debug!(
        blocks = nodes.len(),
        images_embedded,
        errors = embed_errors.len(),
        "Recomposition complete"
    );

    Ok(Recomposition {
        docx: cursor.into_inner(),
        embed_errors,
        images_embedded,
    })
}

// ── Document skeleton ────────────────────────────────────────────────────

/// A fresh document with the styles and numbering definitions every output
/// uses: heading styles 1–6, a quote style, and bullet/decimal list
/// numberings with nine levels each.
fn base_document() -> Docx {
    let mut docx = Docx::new();

    for level in 1..=6u8 {
        let size = HEADING_SIZES[level.min(6) as usize];
        docx = docx.add_style(
            Style::new(format!("Heading{level}"), StyleType::Paragraph)
                .name(format!("Heading {level}"))
                .bold()
                .size(size),
        );
    }
    docx = docx.add_style(
        Style::new("Quote", StyleType::Paragraph)
            .name("Quote")
            .italic(),
    );

    let mut bullets = AbstractNumbering::new(BULLET_NUMBERING_ID);
    let mut decimals = AbstractNumbering::new(DECIMAL_NUMBERING_ID);
    for level in 0..9usize {
        bullets = bullets.add_level(Level::new(
            level,
            Start::new(1),
            NumberFormat::new("bullet"),
            LevelText::new("•"),
            LevelJc::new("left"),
        ));
        decimals = decimals.add_level(Level::new(
            level,
            Start::new(1),
            NumberFormat::new("decimal"),
            LevelText::new(format!("%{}.", level + 1)),
            LevelJc::new("left"),
        ));
    }

    docx.add_abstract_numbering(bullets)
        .add_abstract_numbering(decimals)
        .add_numbering(Numbering::new(BULLET_NUMBERING_ID, BULLET_NUMBERING_ID))
        .add_numbering(Numbering::new(DECIMAL_NUMBERING_ID, DECIMAL_NUMBERING_ID))
}

// ── Text blocks ──────────────────────────────────────────────────────────

/// Render one text block as a styled paragraph.
fn block_paragraph(block: &TextBlock, config: &ImproveConfig) -> Paragraph {
    let mut paragraph = Paragraph::new();

    let heading_level = match block.kind {
        BlockKind::Heading(level) => level as usize,
        _ => 0,
    };
    let (before, after) = HEADING_SPACING[heading_level.min(6)];
    let mut spacing = LineSpacing::new().before(before).after(after);
    if heading_level == 0 {
        spacing = spacing.line_rule(LineSpacingType::Auto).line(BODY_LINE_HEIGHT);
    }
    paragraph = paragraph.line_spacing(spacing);

    match block.kind {
        BlockKind::Heading(level) => {
            paragraph = paragraph.style(&format!("Heading{level}"));
        }
        BlockKind::BulletItem(level) => {
            paragraph = list_format(paragraph, BULLET_NUMBERING_ID, level, config);
        }
        BlockKind::NumberedItem(level) => {
            paragraph = list_format(paragraph, DECIMAL_NUMBERING_ID, level, config);
        }
        BlockKind::Blockquote => {
            paragraph = paragraph
                .style("Quote")
                .indent(Some(config.list_indent_twips), None, None, None);
        }
        BlockKind::Paragraph => {}
    }

    for (i, line) in block.lines.iter().enumerate() {
        if i > 0 {
            paragraph = paragraph.add_run(Run::new().add_break(BreakType::TextWrapping));
        }
        for span in line {
            paragraph = paragraph.add_run(span_run(span, heading_level));
        }
    }

    paragraph
}

/// Attach numbering and nesting indentation to a list paragraph.
///
/// One fixed indent unit per nesting level; nested items additionally hang
/// their first line so the marker sits left of the wrapped text.
fn list_format(
    paragraph: Paragraph,
    numbering_id: usize,
    level: usize,
    config: &ImproveConfig,
) -> Paragraph {
    let indent = config.list_indent_twips * level as i32;
    let special = if level > 0 {
        Some(SpecialIndentType::Hanging(config.list_indent_twips))
    } else {
        None
    };
    paragraph
        .numbering(NumberingId::new(numbering_id), IndentLevel::new(level))
        .indent(Some(indent), special, None, None)
}

/// Render one inline span as a styled run.
fn span_run(span: &Span, heading_level: usize) -> Run {
    let mut run = Run::new()
        .add_text(span.text.as_str())
        .size(HEADING_SIZES[heading_level.min(6)]);
    if heading_level > 0 || span.style.bold {
        run = run.bold();
    }
    if span.style.italic {
        run = run.italic();
    }
    if span.style.code {
        run = run.fonts(RunFonts::new().ascii(MONOSPACE_FONT));
    }
    run
}

// ── Images ───────────────────────────────────────────────────────────────

/// Resolve a placeholder id into a picture paragraph at its display size.
///
/// Does not evict the asset; the caller removes it only after the paragraph
/// has actually been added to the document.
fn image_paragraph(
    id: &str,
    registry: &ImageRegistry,
    config: &ImproveConfig,
) -> Result<Paragraph, EmbedError> {
    let asset = registry.get(id).ok_or_else(|| EmbedError::AssetMissing {
        id: id.to_string(),
    })?;

    let (width_px, height_px) = asset.dimensions.ok_or_else(|| EmbedError::UndecodableImage {
        id: id.to_string(),
        detail: format!("no pixel dimensions for {}", asset.content_type),
    })?;

    if width_px == 0 || height_px == 0 {
        return Err(EmbedError::UndecodableImage {
            id: id.to_string(),
            detail: "zero-sized image".to_string(),
        });
    }

    let (width_in, height_in) = scale_to_bounds(width_px, height_px, config);
    let width_emu = (width_in * EMU_PER_INCH) as u32;
    let height_emu = (height_in * EMU_PER_INCH) as u32;

    let pic = Pic::new(&asset.bytes).size(width_emu, height_emu);
    Ok(Paragraph::new().add_run(Run::new().add_image(pic)))
}

/// Convert pixel dimensions to display inches, capped to the configured
/// bounds with the aspect ratio preserved.
///
/// Width is checked first; height is re-checked after any width-driven
/// scaling, so neither dimension ever exceeds its bound.
fn scale_to_bounds(width_px: u32, height_px: u32, config: &ImproveConfig) -> (f64, f64) {
    let dpi = config.assumed_dpi as f64;
    let mut width_in = width_px as f64 / dpi;
    let mut height_in = height_px as f64 / dpi;

    if width_in > config.max_width_inches {
        let scale = config.max_width_inches / width_in;
        width_in = config.max_width_inches;
        height_in *= scale;
    }
    if height_in > config.max_height_inches {
        let scale = config.max_height_inches / height_in;
        height_in = config.max_height_inches;
        width_in *= scale;
    }

    (width_in, height_in)
}

// ── Tests ────────────────────────────────────────────────────────────────
