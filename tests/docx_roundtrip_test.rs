// DOCXラウンドトリップテスト: メディア以外はバイト単位で不変

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use watermark_removal::diagnostics::NullDiagnostics;
use watermark_removal::error::WatermarkError;
use watermark_removal::method::Method;
use watermark_removal::{ProcessOptions, process};

const CONTENT_TYPES: &str = r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#;
const DOCUMENT_XML: &str = r#"<?xml version="1.0"?><w:document><w:body>body text</w:body></w:document>"#;
const ARCHIVE_COMMENT: &str = "generated by test";

/// 透かし色と本文色を持つ2x2画像のPNGバイト列を作る。
fn watermark_png() -> Vec<u8> {
    let mut rgb = RgbImage::new(2, 2);
    rgb.put_pixel(0, 0, Rgb([240, 240, 240]));
    rgb.put_pixel(1, 0, Rgb([192, 192, 192]));
    rgb.put_pixel(0, 1, Rgb([0x12, 0x34, 0x56]));
    rgb.put_pixel(1, 1, Rgb([0, 0, 0]));

    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(rgb)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode test PNG");
    bytes
}

/// テスト用DOCX(ZIPパッケージ)をファイルに書き出す。
fn create_test_docx(dir: &Path) -> PathBuf {
    let path = dir.join("input.docx");
    let file = File::create(&path).expect("create docx");
    let mut writer = ZipWriter::new(file);
    writer.set_raw_comment(ARCHIVE_COMMENT.as_bytes().to_vec().into_boxed_slice());

    let options = SimpleFileOptions::default();

    writer
        .start_file("[Content_Types].xml", options)
        .expect("start entry");
    writer.write_all(CONTENT_TYPES.as_bytes()).expect("write");

    writer
        .start_file("word/document.xml", options)
        .expect("start entry");
    writer.write_all(DOCUMENT_XML.as_bytes()).expect("write");

    writer
        .start_file("word/media/image1.png", options)
        .expect("start entry");
    writer.write_all(&watermark_png()).expect("write");

    writer.finish().expect("finish docx");
    path
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Vec<u8> {
    let mut entry = archive.by_name(name).expect("entry present");
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).expect("read entry");
    bytes
}

fn options_for(method: Method) -> ProcessOptions {
    ProcessOptions {
        method,
        ..ProcessOptions::default()
    }
}

#[test]
fn test_docx_non_media_entries_byte_identical() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = create_test_docx(dir.path());
    let output = dir.path().join("output.docx");

    process(
        &input,
        Some(output.clone()),
        &options_for(Method::ColorReplace),
        &NullDiagnostics,
    )
    .expect("process docx");

    let mut src = ZipArchive::new(File::open(&input).expect("open input")).expect("zip");
    let mut dst = ZipArchive::new(File::open(&output).expect("open output")).expect("zip");

    assert_eq!(src.len(), dst.len(), "entry count must be preserved");

    for name in ["[Content_Types].xml", "word/document.xml"] {
        assert_eq!(
            read_entry(&mut src, name),
            read_entry(&mut dst, name),
            "non-media entry {name} must be byte-identical"
        );
    }
}

#[test]
fn test_docx_archive_comment_copied_verbatim() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = create_test_docx(dir.path());
    let output = dir.path().join("output.docx");

    process(
        &input,
        Some(output.clone()),
        &options_for(Method::ColorReplace),
        &NullDiagnostics,
    )
    .expect("process docx");

    let dst = ZipArchive::new(File::open(&output).expect("open output")).expect("zip");
    assert_eq!(dst.comment(), ARCHIVE_COMMENT.as_bytes());
}

#[test]
fn test_docx_media_entry_transformed() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = create_test_docx(dir.path());
    let output = dir.path().join("output.docx");

    process(
        &input,
        Some(output.clone()),
        &options_for(Method::ColorReplace),
        &NullDiagnostics,
    )
    .expect("process docx");

    let mut dst = ZipArchive::new(File::open(&output).expect("open output")).expect("zip");
    let media = read_entry(&mut dst, "word/media/image1.png");
    let decoded = image::load_from_memory(&media).expect("decode media").to_rgb8();

    // 透かし色は白へ、本文色はそのまま
    assert_eq!(decoded.get_pixel(0, 0).0, [255, 255, 255]);
    assert_eq!(decoded.get_pixel(1, 0).0, [255, 255, 255]);
    assert_eq!(decoded.get_pixel(0, 1).0, [0x12, 0x34, 0x56]);
    assert_eq!(decoded.get_pixel(1, 1).0, [0, 0, 0]);
}

#[test]
fn test_docx_threshold_mask_method() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = create_test_docx(dir.path());
    let output = dir.path().join("output.docx");

    process(
        &input,
        Some(output.clone()),
        &options_for(Method::ThresholdMask),
        &NullDiagnostics,
    )
    .expect("process docx");

    let mut dst = ZipArchive::new(File::open(&output).expect("open output")).expect("zip");
    let media = read_entry(&mut dst, "word/media/image1.png");
    let decoded = image::load_from_memory(&media).expect("decode media").to_rgb8();

    // 明るい低彩度画素は白、暗い画素は保持
    assert_eq!(decoded.get_pixel(0, 0).0, [255, 255, 255]);
    assert_eq!(decoded.get_pixel(1, 1).0, [0, 0, 0]);
}

#[test]
fn test_docx_rejects_token_heuristic_before_io() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = create_test_docx(dir.path());
    let output = dir.path().join("output.docx");

    let err = process(
        &input,
        Some(output.clone()),
        &options_for(Method::TokenHeuristic),
        &NullDiagnostics,
    )
    .expect_err("token heuristic must be rejected for DOCX");

    assert!(matches!(err, WatermarkError::InvalidMethod(_)));
    assert!(!output.exists(), "no output may be created");
}
