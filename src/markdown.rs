//! Markdown formatter: classifies raw lines into typed blocks and parses
//! inline span formatting.
//!
//! The rewrite gateway returns markdown-flavoured text. This module turns it
//! into the typed stream the recomposer consumes:
//!
//! * [`classify_line`] — ordered pattern checks mapping one raw line to a
//!   [`BlockKind`] plus its marker-stripped content. First match wins; the
//!   patterns do not overlap once order is fixed.
//! * [`parse_inline`] — a single left-to-right scanner over the content
//!   string, splitting it into plain and styled [`Span`]s. Precedence is the
//!   pattern list order (`**` before `*`, `__` before `_`), ties broken by
//!   leftmost starting position. Implemented as an explicit scanning loop
//!   rather than repeated regex search-and-splice so the precedence rules are
//!   auditable and rescans stay linear.
//! * [`segment`] — groups adjacent non-blank prose lines of the same kind
//!   into one [`TextBlock`] (joined with an explicit line break in the
//!   output) and lifts placeholder lines out as [`DocNode::Image`]
//!   pseudo-blocks. A blank line or a placeholder line always terminates the
//!   current grouping; headings and list items never group.

use crate::registry::parse_placeholder_line;
use once_cell::sync::Lazy;
use regex::Regex;

/// The classified kind of one content block.
///
/// List variants carry their nesting level (leading whitespace length
/// integer-divided by 2); headings carry their level 1–6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    BulletItem(usize),
    NumberedItem(usize),
    Blockquote,
    Paragraph,
}

/// Inline styling flags for one span of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
}

impl SpanStyle {
    pub const PLAIN: SpanStyle = SpanStyle {
        bold: false,
        italic: false,
        code: false,
    };
    pub const BOLD: SpanStyle = SpanStyle {
        bold: true,
        italic: false,
        code: false,
    };
    pub const ITALIC: SpanStyle = SpanStyle {
        bold: false,
        italic: true,
        code: false,
    };
    pub const CODE: SpanStyle = SpanStyle {
        bold: false,
        italic: false,
        code: true,
    };
}

/// One run of text with uniform styling.
///
/// Invariant: the spans of a line concatenate to the original line text with
/// markup stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Span {
            text: text.into(),
            style: SpanStyle::PLAIN,
        }
    }

    pub fn styled(text: impl Into<String>, style: SpanStyle) -> Self {
        Span {
            text: text.into(),
            style,
        }
    }
}

/// A classified unit of content: one or more same-kind source lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub kind: BlockKind,
    /// One span sequence per grouped source line, in order. The recomposer
    /// joins lines with explicit line breaks inside a single paragraph.
    pub lines: Vec<Vec<Span>>,
}

/// One element of the ordered document stream consumed by the recomposer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocNode {
    Block(TextBlock),
    /// An image placeholder, carrying the id from its `[IMAGE:<id>]` token.
    Image(String),
}

// ── Line classification ──────────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());
static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)[*+-]\s+(.+)$").unwrap());
static RE_NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)\d+\.\s+(.+)$").unwrap());
static RE_QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*>\s+(.+)$").unwrap());

/// Classify one non-empty raw line, returning the marker-stripped content and
/// its [`BlockKind`].
///
/// Checks run in a fixed order (heading, bullet, numbered, blockquote); the
/// first match wins, anything else is a plain paragraph. Given the same line
/// twice the result is identical — there is no state between calls.
pub fn classify_line(line: &str) -> (String, BlockKind) {
    if let Some(caps) = RE_HEADING.captures(line) {
        let level = caps[1].len() as u8;
        return (caps[2].to_string(), BlockKind::Heading(level));
    }
    if let Some(caps) = RE_BULLET.captures(line) {
        let level = caps[1].len() / 2;
        return (caps[2].to_string(), BlockKind::BulletItem(level));
    }
    if let Some(caps) = RE_NUMBERED.captures(line) {
        let level = caps[1].len() / 2;
        return (caps[2].to_string(), BlockKind::NumberedItem(level));
    }
    if let Some(caps) = RE_QUOTE.captures(line) {
        return (caps[1].to_string(), BlockKind::Blockquote);
    }
    (line.to_string(), BlockKind::Paragraph)
}

// ── Inline span scanning ─────────────────────────────────────────────────

/// Delimiter patterns in precedence order. Two-character delimiters come
/// before their one-character prefixes so `**bold**` is never misread as
/// italic.
const INLINE_PATTERNS: [(&str, SpanStyle); 5] = [
    ("**", SpanStyle::BOLD),
    ("__", SpanStyle::BOLD),
    ("*", SpanStyle::ITALIC),
    ("_", SpanStyle::ITALIC),
    ("`", SpanStyle::CODE),
];

/// An inline match found by the scanner: byte offsets into the content string.
struct InlineMatch {
    start: usize,
    content_start: usize,
    content_end: usize,
    end: usize,
    style: SpanStyle,
}

/// Find the earliest match of `delim … delim` (non-empty interior) at or
/// after `from`, mirroring a non-greedy regex search: the closer is the first
/// delimiter occurrence leaving at least one character of content.
fn find_delimited(text: &str, from: usize, delim: &str, style: SpanStyle) -> Option<InlineMatch> {
    let d = delim.len();
    let mut search = from;
    while let Some(rel) = text[search..].find(delim) {
        let open = search + rel;
        let content_start = open + d;

        // Closer is the first later delimiter occurrence that leaves a
        // non-empty interior. Offsets stay on char boundaries because the
        // delimiters are ASCII and `find` returns boundary-aligned indices.
        let mut close_from = content_start;
        while close_from < text.len() {
            match text[close_from..].find(delim) {
                Some(rel_close) => {
                    let content_end = close_from + rel_close;
                    if content_end == content_start {
                        // Empty interior; keep scanning for a later closer.
                        close_from = content_end + 1;
                        continue;
                    }
                    return Some(InlineMatch {
                        start: open,
                        content_start,
                        content_end,
                        end: content_end + d,
                        style,
                    });
                }
                None => break,
            }
        }

        search = open + 1;
        if search >= text.len() {
            break;
        }
    }
    None
}

/// Split a content string into plain and styled spans.
///
/// Scans left to right for the earliest occurrence of any inline pattern;
/// ties in starting position are broken by pattern list order. Unmatched
/// trailing text becomes a final unstyled span. An empty input yields no
/// spans.
pub fn parse_inline(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let mut best: Option<InlineMatch> = None;
        for (delim, style) in INLINE_PATTERNS {
            if let Some(m) = find_delimited(text, pos, delim, style) {
                // Strict less-than keeps pattern order as the tie-breaker.
                if best.as_ref().map_or(true, |b| m.start < b.start) {
                    best = Some(m);
                }
            }
        }

        match best {
            Some(m) => {
                if m.start > pos {
                    spans.push(Span::plain(&text[pos..m.start]));
                }
                spans.push(Span::styled(&text[m.content_start..m.content_end], m.style));
                pos = m.end;
            }
            None => {
                spans.push(Span::plain(&text[pos..]));
                break;
            }
        }
    }

    spans
}

// ── Block segmentation ───────────────────────────────────────────────────

/// Whether adjacent same-kind lines merge into one block. Each list item and
/// heading is its own paragraph in the output (a merged pair of bullets would
/// share one marker), so only prose kinds group.
fn groups(kind: BlockKind) -> bool {
    matches!(kind, BlockKind::Paragraph | BlockKind::Blockquote)
}

/// Turn rewritten text into the ordered [`DocNode`] stream.
///
/// Lines with no content are dropped and terminate the current grouping, as
/// does a placeholder line. Adjacent non-blank paragraph or blockquote lines
/// merge into one [`TextBlock`]; headings and list items always stand alone.
pub fn segment(text: &str) -> Vec<DocNode> {
    let mut nodes = Vec::new();
    let mut current: Option<TextBlock> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            if let Some(block) = current.take() {
                nodes.push(DocNode::Block(block));
            }
            continue;
        }

        if let Some(id) = parse_placeholder_line(line) {
            if let Some(block) = current.take() {
                nodes.push(DocNode::Block(block));
            }
            nodes.push(DocNode::Image(id.to_string()));
            continue;
        }

        let (content, kind) = classify_line(line);
        let spans = parse_inline(&content);

        match current.as_mut() {
            Some(block) if block.kind == kind && groups(kind) => block.lines.push(spans),
            _ => {
                if let Some(block) = current.take() {
                    nodes.push(DocNode::Block(block));
                }
                current = Some(TextBlock {
                    kind,
                    lines: vec![spans],
                });
            }
        }
    }

    if let Some(block) = current.take() {
        nodes.push(DocNode::Block(block));
    }

    nodes
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(spans: &[Span]) -> String {
        spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn classify_headings() {
        assert_eq!(
            classify_line("# Title"),
            ("Title".into(), BlockKind::Heading(1))
        );
        assert_eq!(
            classify_line("### Sub"),
            ("Sub".into(), BlockKind::Heading(3))
        );
        assert_eq!(
            classify_line("###### Deep"),
            ("Deep".into(), BlockKind::Heading(6))
        );
        // Seven hashes exceed the heading range.
        assert_eq!(classify_line("####### nope").1, BlockKind::Paragraph);
        // No space after the marker.
        assert_eq!(classify_line("#nope").1, BlockKind::Paragraph);
    }

    #[test]
    fn classify_list_items_and_nesting() {
        assert_eq!(
            classify_line("* item"),
            ("item".into(), BlockKind::BulletItem(0))
        );
        assert_eq!(
            classify_line("- item"),
            ("item".into(), BlockKind::BulletItem(0))
        );
        assert_eq!(
            classify_line("+ item"),
            ("item".into(), BlockKind::BulletItem(0))
        );
        assert_eq!(
            classify_line("    * nested"),
            ("nested".into(), BlockKind::BulletItem(2))
        );
        assert_eq!(
            classify_line("1. first"),
            ("first".into(), BlockKind::NumberedItem(0))
        );
        assert_eq!(
            classify_line("  12. nested"),
            ("nested".into(), BlockKind::NumberedItem(1))
        );
    }

    #[test]
    fn classify_blockquote_and_paragraph() {
        assert_eq!(
            classify_line("> quoted"),
            ("quoted".into(), BlockKind::Blockquote)
        );
        assert_eq!(
            classify_line("just text"),
            ("just text".into(), BlockKind::Paragraph)
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let line = "  * some *styled* item";
        assert_eq!(classify_line(line), classify_line(line));
    }

    #[test]
    fn inline_bold_and_italic() {
        let spans = parse_inline("Some *italic* and **bold** text.");
        assert_eq!(
            spans,
            vec![
                Span::plain("Some "),
                Span::styled("italic", SpanStyle::ITALIC),
                Span::plain(" and "),
                Span::styled("bold", SpanStyle::BOLD),
                Span::plain(" text."),
            ]
        );
    }

    #[test]
    fn inline_underscore_variants() {
        let spans = parse_inline("__strong__ and _soft_");
        assert_eq!(spans[0], Span::styled("strong", SpanStyle::BOLD));
        assert_eq!(spans[1], Span::plain(" and "));
        assert_eq!(spans[2], Span::styled("soft", SpanStyle::ITALIC));
    }

    #[test]
    fn inline_code_span() {
        let spans = parse_inline("run `cargo doc` now");
        assert_eq!(
            spans,
            vec![
                Span::plain("run "),
                Span::styled("cargo doc", SpanStyle::CODE),
                Span::plain(" now"),
            ]
        );
    }

    #[test]
    fn double_star_wins_over_single_at_same_position() {
        let spans = parse_inline("**bold**");
        assert_eq!(spans, vec![Span::styled("bold", SpanStyle::BOLD)]);
    }

    #[test]
    fn unterminated_markup_stays_plain() {
        let spans = parse_inline("a *dangling star");
        assert_eq!(spans, vec![Span::plain("a *dangling star")]);
    }

    #[test]
    fn spans_concatenate_to_stripped_text() {
        let input = "mix **b** and _i_ with `c` ends";
        let spans = parse_inline(input);
        assert_eq!(flat(&spans), "mix b and i with c ends");
    }

    #[test]
    fn segment_groups_same_kind_lines() {
        let nodes = segment("first line\nsecond line\n\nthird");
        assert_eq!(nodes.len(), 2);
        match &nodes[0] {
            DocNode::Block(b) => {
                assert_eq!(b.kind, BlockKind::Paragraph);
                assert_eq!(b.lines.len(), 2);
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn segment_splits_on_kind_change() {
        let nodes = segment("# Title\nSome text");
        assert_eq!(nodes.len(), 2);
        assert!(matches!(
            &nodes[0],
            DocNode::Block(b) if b.kind == BlockKind::Heading(1)
        ));
        assert!(matches!(
            &nodes[1],
            DocNode::Block(b) if b.kind == BlockKind::Paragraph
        ));
    }

    #[test]
    fn segment_lifts_placeholders() {
        let nodes = segment("before\n[IMAGE:abc]\nafter");
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[1], DocNode::Image(id) if id == "abc"));
    }

    #[test]
    fn segment_title_then_styled_paragraph() {
        let nodes = segment("# Title\n\nSome *italic* and **bold** text.\n");
        assert_eq!(nodes.len(), 2);
        match (&nodes[0], &nodes[1]) {
            (DocNode::Block(h), DocNode::Block(p)) => {
                assert_eq!(h.kind, BlockKind::Heading(1));
                assert_eq!(h.lines, vec![vec![Span::plain("Title")]]);
                assert_eq!(p.kind, BlockKind::Paragraph);
                assert_eq!(
                    p.lines[0],
                    vec![
                        Span::plain("Some "),
                        Span::styled("italic", SpanStyle::ITALIC),
                        Span::plain(" and "),
                        Span::styled("bold", SpanStyle::BOLD),
                        Span::plain(" text."),
                    ]
                );
            }
            other => panic!("unexpected nodes: {other:?}"),
        }
    }

    #[test]
    fn blockquote_lines_group() {
        let nodes = segment("> first\n> second");
        assert_eq!(nodes.len(), 1);
        assert!(matches!(
            &nodes[0],
            DocNode::Block(b) if b.kind == BlockKind::Blockquote && b.lines.len() == 2
        ));
    }

    #[test]
    fn list_items_never_group() {
        let nodes = segment("* one\n* two\n  * nested");
        assert_eq!(nodes.len(), 3);
        for node in &nodes {
            assert!(matches!(
                node,
                DocNode::Block(b) if b.lines.len() == 1
            ));
        }
    }

    #[test]
    fn consecutive_headings_stay_separate() {
        let nodes = segment("# One\n# Two");
        assert_eq!(nodes.len(), 2);
    }
}
