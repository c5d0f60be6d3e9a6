//! Fixture builders shared by the integration tests

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use zip::write::SimpleFileOptions;

use fereader::convert::{images_to_pdf, text_to_epub};
use fereader::ReaderConfig;

/// Solid-color PNG of the given size
pub fn png(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb(color))
        .save(&path)
        .unwrap();
    path
}

/// PDF with one page per `(width, height)` entry
pub fn pdf_with_pages(dir: &Path, name: &str, sizes: &[(u32, u32)], password: Option<&str>) -> PathBuf {
    let images: Vec<PathBuf> = sizes
        .iter()
        .enumerate()
        .map(|(i, (w, h))| png(dir, &format!("{name}-{i}.png"), *w, *h, [30 * i as u8, 90, 160]))
        .collect();
    let output = dir.join(name);
    images_to_pdf(&images, &output, password).unwrap();
    output
}

/// Single-chapter EPUB generated from `text`
pub fn epub_from_text(dir: &Path, stem: &str, text: &str) -> PathBuf {
    let input = dir.join(format!("{stem}.txt"));
    std::fs::write(&input, text).unwrap();
    let output = dir.join(format!("{stem}.epub"));
    text_to_epub(&input, &output).unwrap();
    output
}

/// Hand-built archive from `(name, contents)` entries, stored uncompressed
pub fn zip_archive(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (entry, data) in entries {
        zip.start_file(*entry, options).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

/// Flip one byte of the first occurrence of `marker`, breaking that entry's CRC
pub fn damage_payload(path: &Path, marker: &str) {
    let mut bytes = std::fs::read(path).unwrap();
    let offset = bytes
        .windows(marker.len())
        .position(|w| w == marker.as_bytes())
        .unwrap();
    bytes[offset] ^= 0xff;
    std::fs::write(path, bytes).unwrap();
}

pub const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Config whose scratch workspaces live under `scratch`
pub fn config_with_scratch(scratch: &Path) -> ReaderConfig {
    ReaderConfig {
        scratch_root: Some(scratch.to_path_buf()),
        viewport_margin: 0.0,
        ..ReaderConfig::default()
    }
}

/// Number of entries directly under `dir`
pub fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
