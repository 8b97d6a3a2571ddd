//! End-to-end tests over the decompose → rewrite → recompose round trip.
//!
//! Fixtures are built as minimal but structurally honest DOCX containers:
//! a real zip with `word/document.xml`, `word/_rels/document.xml.rels`, and
//! media parts, so the decomposer exercises the same paths as on real files.

use docimprover::pipeline::decompose::decompose;
use docimprover::registry::{parse_placeholder_line, OVERSIZED_MARKER_TEXT, OVERSIZED_SENTINEL_ID};
use docimprover::{improve_bytes, improve_to_file, ImproveConfig, ImproveError};
use std::cell::Cell;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

// ── Fixture construction ─────────────────────────────────────────────────

enum Para<'a> {
    Text(&'a str),
    Image(&'a [u8]),
}

/// Build a DOCX container with the given paragraphs. Images use the
/// DrawingML `a:blip r:embed` idiom.
fn build_docx(paragraphs: &[Para<'_>]) -> Vec<u8> {
    let mut body = String::new();
    let mut rels = String::new();
    let mut media: Vec<(String, Vec<u8>)> = Vec::new();

    for (i, para) in paragraphs.iter().enumerate() {
        match para {
            Para::Text(text) => {
                body.push_str(&format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"));
            }
            Para::Image(bytes) => {
                let rid = format!("rId{}", i + 1);
                let target = format!("media/image{}.png", i + 1);
                rels.push_str(&format!(
                    r#"<Relationship Id="{rid}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="{target}"/>"#
                ));
                body.push_str(&format!(
                    r#"<w:p><w:r><w:drawing><wp:inline><a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="{rid}"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
                ));
                media.push((format!("word/{target}"), bytes.to_vec()));
            }
        }
    }

    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let relationships = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file("word/document.xml", options).unwrap();
    writer.write_all(document.as_bytes()).unwrap();
    writer
        .start_file("word/_rels/document.xml.rels", options)
        .unwrap();
    writer.write_all(relationships.as_bytes()).unwrap();
    for (path, bytes) in &media {
        writer.start_file(path.as_str(), options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A small but genuinely decodable PNG payload.
fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 31) as u8, (y * 17) as u8, 128, 255])
    });
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// Placeholder ids appearing in `text`, in line order.
fn placeholder_ids(text: &str) -> Vec<&str> {
    text.lines().filter_map(parse_placeholder_line).collect()
}

fn identity_gateway() -> impl Fn(&str, &str) -> Result<String, ImproveError> {
    |_sys: &str, text: &str| Ok(text.to_string())
}

// ── Decomposition properties ─────────────────────────────────────────────

#[test]
fn each_image_gets_a_distinct_placeholder_in_document_order() {
    let png = png_bytes(4, 4);
    let docx = build_docx(&[
        Para::Text("Intro"),
        Para::Image(&png),
        Para::Text("Middle"),
        Para::Image(&png),
        Para::Image(&png),
    ]);

    let decomposition = decompose(&docx, &ImproveConfig::default()).unwrap();
    let ids = placeholder_ids(&decomposition.text);

    assert_eq!(ids.len(), 3);
    assert_eq!(decomposition.registry.len(), 3);
    for id in &ids {
        assert!(decomposition.registry.get(id).is_some());
        assert_eq!(ids.iter().filter(|other| other == &id).count(), 1);
    }
    let lines: Vec<&str> = decomposition.text.lines().collect();
    assert_eq!(lines[0], "Intro");
    assert_eq!(lines[2], "Middle");
}

#[test]
fn registered_assets_carry_payload_and_dimensions() {
    let png = png_bytes(32, 8);
    let docx = build_docx(&[Para::Text("x"), Para::Image(&png)]);

    let decomposition = decompose(&docx, &ImproveConfig::default()).unwrap();
    let asset = decomposition.registry.iter().next().unwrap();
    assert_eq!(asset.bytes, png);
    assert_eq!(asset.content_type, "image/png");
    assert_eq!(asset.dimensions, Some((32, 8)));
}

#[test]
fn whitespace_only_document_is_empty() {
    let docx = build_docx(&[Para::Text("   "), Para::Text("")]);
    let err = decompose(&docx, &ImproveConfig::default()).unwrap_err();
    assert!(matches!(err, ImproveError::EmptyDocument));
}

#[test]
fn oversized_image_becomes_sentinel_not_error() {
    let big = vec![0xAB; 30_000];
    let docx = build_docx(&[Para::Text("before"), Para::Image(&big), Para::Text("after")]);
    let config = ImproveConfig::builder()
        .max_image_bytes(10_000)
        .max_total_image_bytes(10_000)
        .build()
        .unwrap();

    let decomposition = decompose(&docx, &config).unwrap();
    assert!(decomposition.registry.is_empty());
    assert_eq!(
        placeholder_ids(&decomposition.text),
        vec![OVERSIZED_SENTINEL_ID]
    );
}

#[test]
fn aggregate_threshold_is_fatal() {
    // Each image passes the per-image check; together they exceed the total.
    let blob = vec![0xCD; 30_000];
    let docx = build_docx(&[Para::Text("x"), Para::Image(&blob), Para::Image(&blob)]);
    let config = ImproveConfig::builder()
        .max_image_bytes(40_000)
        .max_total_image_bytes(50_000)
        .build()
        .unwrap();

    let err = decompose(&docx, &config).unwrap_err();
    assert!(matches!(
        err,
        ImproveError::ImagesTooLarge {
            total_bytes: 60_000,
            limit_bytes: 50_000,
        }
    ));
}

// ── Full round trip ──────────────────────────────────────────────────────

#[test]
fn round_trip_preserves_image_count() {
    let png = png_bytes(16, 16);
    let docx = build_docx(&[
        Para::Text("Some introductory prose."),
        Para::Image(&png),
        Para::Text("And a closing thought."),
        Para::Image(&png),
    ]);

    let output = improve_bytes(&docx, &identity_gateway(), &ImproveConfig::default()).unwrap();
    assert_eq!(output.stats.images_registered, 2);
    assert_eq!(output.stats.images_embedded, 2);
    assert!(output.embed_errors.is_empty());

    // The output document must decompose to the same number of images.
    let back = decompose(&output.document, &ImproveConfig::default()).unwrap();
    assert_eq!(back.registry.len(), 2);
    assert!(back.text.contains("Some introductory prose."));
}

#[test]
fn empty_document_fails_before_gateway_is_called() {
    let docx = build_docx(&[Para::Text("  ")]);
    let called = Cell::new(false);
    let gateway = |_sys: &str, text: &str| -> Result<String, ImproveError> {
        called.set(true);
        Ok(text.to_string())
    };

    let err = improve_bytes(&docx, &gateway, &ImproveConfig::default());
    assert!(matches!(err, Err(ImproveError::EmptyDocument)));
    assert!(!called.get());
}

#[test]
fn aggregate_threshold_fails_before_gateway_is_called() {
    let blob = vec![0xEF; 30_000];
    let docx = build_docx(&[Para::Text("x"), Para::Image(&blob), Para::Image(&blob)]);
    let config = ImproveConfig::builder()
        .max_image_bytes(40_000)
        .max_total_image_bytes(50_000)
        .build()
        .unwrap();

    let called = Cell::new(false);
    let gateway = |_sys: &str, text: &str| -> Result<String, ImproveError> {
        called.set(true);
        Ok(text.to_string())
    };

    let err = improve_bytes(&docx, &gateway, &config);
    assert!(matches!(err, Err(ImproveError::ImagesTooLarge { .. })));
    assert!(!called.get());
}

#[test]
fn oversized_image_round_trips_as_marker_text() {
    let big = vec![0xAB; 30_000];
    let png = png_bytes(4, 4);
    let docx = build_docx(&[Para::Text("keep me"), Para::Image(&big), Para::Image(&png)]);
    let config = ImproveConfig::builder()
        .max_image_bytes(10_000)
        .max_total_image_bytes(10_000)
        .build()
        .unwrap();

    let output = improve_bytes(&docx, &identity_gateway(), &config).unwrap();
    assert_eq!(output.stats.images_registered, 1);
    assert_eq!(output.stats.images_embedded, 1);

    let back = decompose(&output.document, &ImproveConfig::default()).unwrap();
    assert!(back.text.contains(OVERSIZED_MARKER_TEXT));
    assert_eq!(back.registry.len(), 1);
}

#[test]
fn dropped_placeholders_omit_images_without_failing() {
    let png = png_bytes(8, 8);
    let docx = build_docx(&[Para::Text("prose"), Para::Image(&png)]);
    let forgetful = |_sys: &str, _text: &str| -> Result<String, ImproveError> {
        Ok("Entirely rewritten prose with no tokens.".to_string())
    };

    let output = improve_bytes(&docx, &forgetful, &ImproveConfig::default()).unwrap();
    assert_eq!(output.stats.images_registered, 1);
    assert_eq!(output.stats.images_embedded, 0);
    assert!(output.embed_errors.is_empty());

    let back = decompose(&output.document, &ImproveConfig::default()).unwrap();
    assert!(back.registry.is_empty());
}

#[test]
fn unknown_placeholder_is_reported_per_image() {
    let docx = build_docx(&[Para::Text("prose")]);
    let inventive = |_sys: &str, text: &str| -> Result<String, ImproveError> {
        Ok(format!("{text}\n[IMAGE:not-a-real-id]\n"))
    };

    let output = improve_bytes(&docx, &inventive, &ImproveConfig::default()).unwrap();
    assert_eq!(output.embed_errors.len(), 1);
    assert_eq!(output.embed_errors[0].id(), "not-a-real-id");
}

#[test]
fn gateway_failure_aborts_the_run() {
    let docx = build_docx(&[Para::Text("prose")]);
    let broken = |_sys: &str, _text: &str| -> Result<String, ImproveError> {
        Err(ImproveError::GatewayFailed {
            message: "connection refused".to_string(),
        })
    };

    let err = improve_bytes(&docx, &broken, &ImproveConfig::default());
    assert!(matches!(err, Err(ImproveError::GatewayFailed { .. })));
}

#[test]
fn markdown_structure_survives_into_the_output_document() {
    let docx = build_docx(&[Para::Text("raw draft text")]);
    let structured = |_sys: &str, _text: &str| -> Result<String, ImproveError> {
        Ok("# Quarterly Report\n\nThe results **exceeded** expectations.\n\n- revenue up\n- costs down\n".to_string())
    };

    let output = improve_bytes(&docx, &structured, &ImproveConfig::default()).unwrap();
    let back = decompose(&output.document, &ImproveConfig::default()).unwrap();
    let lines: Vec<&str> = back.text.lines().collect();

    assert_eq!(lines[0], "Quarterly Report");
    assert!(back.text.contains("The results exceeded expectations."));
    assert!(back.text.contains("revenue up"));
    assert!(back.text.contains("costs down"));
}

#[test]
fn improve_to_file_writes_a_valid_container() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.docx");
    let output_path = dir.path().join("out.docx");
    std::fs::write(&input, build_docx(&[Para::Text("file based run")])).unwrap();

    improve_to_file(&input, &output_path, &identity_gateway(), &ImproveConfig::default()).unwrap();

    let written = std::fs::read(&output_path).unwrap();
    assert_eq!(&written[..4], b"PK\x03\x04");
    let back = decompose(&written, &ImproveConfig::default()).unwrap();
    assert!(back.text.contains("file based run"));
}

#[test]
fn media_dir_persists_extracted_images() {
    let dir = tempfile::tempdir().unwrap();
    let media = dir.path().join("media");
    let png = png_bytes(4, 4);
    let docx = build_docx(&[Para::Text("x"), Para::Image(&png)]);
    let config = ImproveConfig::builder().media_dir(&media).build().unwrap();

    let output = improve_bytes(&docx, &identity_gateway(), &config).unwrap();
    assert_eq!(output.media_dir.as_deref(), Some(media.as_path()));

    let files: Vec<_> = std::fs::read_dir(&media).unwrap().flatten().collect();
    assert_eq!(files.len(), 1);
    assert_eq!(std::fs::read(files[0].path()).unwrap(), png);
}
