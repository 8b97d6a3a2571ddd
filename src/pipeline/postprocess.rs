//! Post-processing: deterministic cleanup of gateway-rewritten Markdown.
//!
//! Even a well-prompted model occasionally returns text that is semantically
//! fine but structurally awkward for the recomposer:
//!
//! - the whole reply wrapped in ` ```markdown ... ``` ` fences despite the
//!   prompt saying otherwise
//! - Windows-style `\r\n` line endings
//! - a placeholder token merged into a surrounding sentence instead of
//!   sitting on its own line
//! - an invented `![figure](chart.png)` image link that references nothing
//!
//! These passes run in a fixed order before block classification. Each pass
//! is a pure `&str → String` function with no shared state, independently
//! testable.
//!
//! The placeholder-isolation pass exists because the placeholder contract is
//! assumed, not enforced: a token the model keeps verbatim but splices
//! mid-sentence would otherwise never be recognised by the segmenter and its
//! image would silently drop out of the round trip.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup passes to raw gateway output.
///
/// Passes (applied in order):
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Demote foreign `![alt](url)` image links to italic captions
/// 6. Move placeholder tokens embedded mid-line onto their own lines
/// 7. Ensure the text ends with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = demote_foreign_images(&s);
    let s = isolate_placeholders(&s);
    ensure_final_newline(&s)
}

// ── Pass 1: Strip outer markdown fences ──────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown)?\n(.*)\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Pass 2: Normalise line endings ───────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Pass 3: Trim trailing whitespace per line ────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Pass 4: Collapse excessive blank lines ───────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Pass 5: Demote foreign image links ───────────────────────────────────
//
// The placeholder token is the only sanctioned image channel through the
// rewrite step. A markdown image link in the output is either hallucinated
// or a mangled placeholder; either way the URL references nothing we can
// embed. Keep the caption text, drop the link.

static RE_MD_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)").unwrap());

fn demote_foreign_images(input: &str) -> String {
    RE_MD_IMAGE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let alt = caps[1].trim();
            if alt.is_empty() {
                String::new()
            } else {
                format!("*{alt}*")
            }
        })
        .to_string()
}

// ── Pass 6: Isolate placeholder tokens ───────────────────────────────────

static RE_PLACEHOLDER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[IMAGE:[^\]]+\]").unwrap());

fn isolate_placeholders(input: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for line in input.lines() {
        let trimmed = line.trim();
        // Already alone on its line, or no token at all: pass through.
        if !RE_PLACEHOLDER_TOKEN.is_match(trimmed)
            || RE_PLACEHOLDER_TOKEN
                .find(trimmed)
                .map(|m| m.start() == 0 && m.end() == trimmed.len())
                .unwrap_or(false)
        {
            out.push(line.to_string());
            continue;
        }

        let mut pos = 0;
        for m in RE_PLACEHOLDER_TOKEN.find_iter(line) {
            let before = line[pos..m.start()].trim();
            if !before.is_empty() {
                out.push(before.to_string());
            }
            out.push(m.as_str().to_string());
            pos = m.end();
        }
        let after = line[pos..].trim();
        if !after.is_empty() {
            out.push(after.to_string());
        }
    }
    out.join("\n")
}

// ── Pass 7: Ensure final newline ─────────────────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{trimmed}\n")
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
