//! Decomposition: DOCX → text stream + image registry.
//!
//! Walks the WordprocessingML inside the container in document order and
//! emits one line per paragraph, with every embedded image replaced by a
//! `[IMAGE:<id>]` placeholder while its payload is parked in the
//! [`ImageRegistry`].
//!
//! ## Image embedding idioms
//!
//! Word has accumulated several ways to reference a picture from a run; we
//! recognise the relationship id wherever it appears:
//!
//! * DrawingML, inline or floating: `<a:blip r:embed="rIdN"/>` (covers
//!   `wp:inline`, `wp:anchor`, and bare `pic:pic` under `w:drawing`)
//! * Legacy VML: `<v:imagedata r:id="rIdN"/>` (or `r:href` in very old files)
//!
//! The id resolves through `word/_rels/document.xml.rels` to a part under
//! `word/media/`. We stream `word/document.xml` with quick-xml and match on
//! local element names, so unconventional namespace prefixes still work.

use crate::config::ImproveConfig;
use crate::error::ImproveError;
use crate::registry::{placeholder, ImageRegistry, OVERSIZED_SENTINEL_ID};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::ZipArchive;

/// The result of decomposing one document.
#[derive(Debug)]
pub struct Decomposition {
    /// Paragraph lines joined with `\n`, placeholders embedded. Lines with no
    /// remaining content are dropped.
    pub text: String,
    /// All registered image assets, keyed by the ids used in `text`.
    pub registry: ImageRegistry,
    /// Number of non-empty paragraphs that contributed to `text`.
    pub paragraph_count: usize,
}

/// Decompose a DOCX payload into `(text, image registry)`.
///
/// # Errors
///
/// * [`ImproveError::InvalidDocx`] — the container or its document part is
///   unreadable.
/// * [`ImproveError::EmptyDocument`] — nothing but whitespace was extracted;
///   raised here so the pipeline halts before any gateway call.
/// * [`ImproveError::ImagesTooLarge`] — the combined registered payload
///   exceeds the aggregate threshold.
///
/// A single oversized image is not an error: it is replaced by the oversized
/// sentinel placeholder and logged as a warning.
pub fn decompose(docx: &[u8], config: &ImproveConfig) -> Result<Decomposition, ImproveError> {
    let mut archive = ZipArchive::new(Cursor::new(docx)).map_err(|e| ImproveError::InvalidDocx {
        detail: format!("not a readable zip container: {e}"),
    })?;

    let relationships = read_relationships(&mut archive)?;
    let document_xml = read_entry(&mut archive, "word/document.xml").map_err(|e| {
        ImproveError::InvalidDocx {
            detail: format!("missing word/document.xml: {e}"),
        }
    })?;

    let mut walker = DocumentWalker {
        archive: &mut archive,
        relationships: &relationships,
        config,
        registry: ImageRegistry::new(),
        lines: Vec::new(),
    };
    walker.walk(&document_xml)?;

    let DocumentWalker {
        registry, lines, ..
    } = walker;

    let text = lines.join("\n");
    if text.trim().is_empty() {
        return Err(ImproveError::EmptyDocument);
    }

    let total_bytes = registry.total_bytes();
    if total_bytes > config.max_total_image_bytes {
        return Err(ImproveError::ImagesTooLarge {
            total_bytes,
            limit_bytes: config.max_total_image_bytes,
        });
    }

    debug!(
        paragraphs = lines.len(),
        images = registry.len(),
        image_bytes = total_bytes,
        "Decomposition complete"
    );

    Ok(Decomposition {
        paragraph_count: lines.len(),
        text,
        registry,
    })
}

// ── Container access ─────────────────────────────────────────────────────

fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, zip::result::ZipError> {
    let mut entry = archive.by_name(name)?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Parse `word/_rels/document.xml.rels` into an Id → Target map.
fn read_relationships(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
) -> Result<HashMap<String, String>, ImproveError> {
    let xml = read_entry(archive, "word/_rels/document.xml.rels").map_err(|e| {
        ImproveError::InvalidDocx {
            detail: format!("missing document relationships: {e}"),
        }
    })?;

    let mut reader = Reader::from_reader(&xml[..]);
    let mut buf = Vec::new();
    let mut map = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if local_name(e.name().as_ref()) == b"Relationship" {
                    let mut id = None;
                    let mut target = None;
                    for attr in e.attributes().flatten() {
                        match local_name(attr.key.as_ref()) {
                            b"Id" => id = Some(attr_value(&attr.value)),
                            b"Target" => target = Some(attr_value(&attr.value)),
                            _ => {}
                        }
                    }
                    if let (Some(id), Some(target)) = (id, target) {
                        map.insert(id, target);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ImproveError::InvalidDocx {
                    detail: format!("malformed relationships XML: {e}"),
                });
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(map)
}

/// Resolve a relationship target to its path inside the container.
fn media_path(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else {
        format!("word/{target}")
    }
}

/// MIME content type for a media part, from its file extension.
fn content_type_for(target: &str) -> &'static str {
    let ext = target.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

// ── Document walk ────────────────────────────────────────────────────────

struct DocumentWalker<'a, 'data> {
    archive: &'a mut ZipArchive<Cursor<&'data [u8]>>,
    relationships: &'a HashMap<String, String>,
    config: &'a ImproveConfig,
    registry: ImageRegistry,
    lines: Vec<String>,
}

impl DocumentWalker<'_, '_> {
    fn walk(&mut self, document_xml: &[u8]) -> Result<(), ImproveError> {
        let mut reader = Reader::from_reader(document_xml);
        let mut buf = Vec::new();

        let mut current_line = String::new();
        let mut in_paragraph = false;
        let mut in_text = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                    b"p" => {
                        in_paragraph = true;
                        current_line.clear();
                    }
                    b"t" => in_text = true,
                    b"blip" | b"imagedata" => self.handle_image(&e, &mut current_line),
                    _ => {}
                },
                Ok(Event::Empty(e)) => {
                    if matches!(local_name(e.name().as_ref()), b"blip" | b"imagedata") {
                        self.handle_image(&e, &mut current_line);
                    }
                }
                Ok(Event::Text(t)) => {
                    if in_paragraph && in_text {
                        match t.unescape() {
                            Ok(text) => current_line.push_str(&text),
                            Err(e) => warn!("Skipping undecodable text run: {e}"),
                        }
                    }
                }
                Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                    b"p" => {
                        in_paragraph = false;
                        if !current_line.trim().is_empty() {
                            self.lines.push(std::mem::take(&mut current_line));
                        } else {
                            current_line.clear();
                        }
                    }
                    b"t" => in_text = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ImproveError::InvalidDocx {
                        detail: format!("malformed document XML: {e}"),
                    });
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    /// Resolve one image reference and append its placeholder to the line.
    ///
    /// Failures to resolve the payload are logged and skipped rather than
    /// failing the whole operation.
    fn handle_image(&mut self, element: &BytesStart<'_>, line: &mut String) {
        let Some(rid) = image_relationship_id(element) else {
            return;
        };

        let Some(target) = self.relationships.get(&rid) else {
            warn!(%rid, "Image relationship not found; dropping image");
            return;
        };

        let path = media_path(target);
        let bytes = match read_entry(self.archive, &path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%path, "Failed to read image part: {e}; dropping image");
                return;
            }
        };

        if bytes.len() as u64 > self.config.max_image_bytes {
            warn!(
                size = bytes.len(),
                limit = self.config.max_image_bytes,
                "Image exceeds maximum allowed size; substituting sentinel"
            );
            line.push_str(&placeholder(OVERSIZED_SENTINEL_ID));
            return;
        }

        let dimensions = match image::load_from_memory(&bytes) {
            Ok(img) => Some((img.width(), img.height())),
            Err(e) => {
                debug!(%path, "Could not decode image dimensions: {e}");
                None
            }
        };

        let content_type = content_type_for(target);
        let id = self.registry.register(bytes, content_type, dimensions);
        line.push_str(&placeholder(&id));
    }
}

/// Extract the relationship id from an image reference element.
///
/// `a:blip` carries `r:embed`; `v:imagedata` carries `r:id` or, in very old
/// documents, `r:href`.
fn image_relationship_id(element: &BytesStart<'_>) -> Option<String> {
    let mut fallback = None;
    for attr in element.attributes().flatten() {
        match local_name(attr.key.as_ref()) {
            b"embed" | b"id" => return Some(attr_value(&attr.value)),
            b"href" => fallback = Some(attr_value(&attr.value)),
            _ => {}
        }
    }
    fallback
}

/// Strip any namespace prefix from a qualified XML name.
fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

fn attr_value(value: &[u8]) -> String {
    String::from_utf8_lossy(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_name_strips_prefix() {
        assert_eq!(local_name(b"w:t"), b"t");
        assert_eq!(local_name(b"a:blip"), b"blip");
        assert_eq!(local_name(b"Relationship"), b"Relationship");
    }

    #[test]
    fn media_path_handles_relative_and_absolute_targets() {
        assert_eq!(media_path("media/image1.png"), "word/media/image1.png");
        assert_eq!(media_path("/word/media/image1.png"), "word/media/image1.png");
    }

    #[test]
    fn content_types_cover_common_formats() {
        assert_eq!(content_type_for("media/image1.png"), "image/png");
        assert_eq!(content_type_for("media/photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("media/legacy.wmf"), "image/x-wmf");
        assert_eq!(content_type_for("media/unknown.xyz"), "application/octet-stream");
    }

    #[test]
    fn garbage_bytes_are_not_a_container() {
        let config = ImproveConfig::default();
        let err = decompose(b"definitely not a zip", &config).unwrap_err();
        assert!(matches!(err, ImproveError::InvalidDocx { .. }));
    }
}
