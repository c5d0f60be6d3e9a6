//! EPUB extraction into a scratch workspace

use std::fs::{self, File};
use std::io;
use std::path::Path;

use tracing::{debug, info, warn};

use super::package::{EpubMetadata, EpubPackage};
use super::resolver::AssetResolver;
use super::workspace::ScratchWorkspace;
use crate::document::{LoadError, MarkupPage};

/// A loaded EPUB: rewritten pages plus the workspace they point into
#[derive(Debug)]
pub struct EpubDocument {
    pages: Vec<MarkupPage>,
    metadata: EpubMetadata,
    workspace: ScratchWorkspace,
}

impl EpubDocument {
    /// Pages in spine order; never empty
    pub fn pages(&self) -> &[MarkupPage] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&MarkupPage> {
        self.pages.get(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn metadata(&self) -> &EpubMetadata {
        &self.metadata
    }

    pub fn workspace(&self) -> &ScratchWorkspace {
        &self.workspace
    }

    /// Delete the extracted files; pages keep their text but asset paths dangle
    pub fn close(&mut self) {
        self.workspace.destroy();
    }
}

impl EpubPackage {
    /// Extract the archive into a fresh workspace and rewrite every spine document
    ///
    /// The workspace is created under `scratch_root` when given. On failure the
    /// partially filled workspace is removed before returning.
    pub fn unpack(mut self, scratch_root: Option<&Path>) -> Result<EpubDocument, LoadError> {
        let workspace = ScratchWorkspace::create(scratch_root)?;
        let extracted = extract_all(&mut self, &workspace)?;

        let mut pages = Vec::with_capacity(self.spine.len());
        for entry in &self.spine {
            let local = workspace.resolve(&entry.archive_path);
            let bytes = fs::read(&local)?;
            let html = String::from_utf8_lossy(&bytes);

            let resolver = AssetResolver::new(&entry.archive_path, workspace.root());
            let rewritten = resolver
                .rewrite(&html)
                .map_err(|e| LoadError::Corrupt(format!("{}: {e}", entry.archive_path)))?;

            pages.push(MarkupPage {
                source: Some(entry.archive_path.clone()),
                html: rewritten,
            });
        }

        if pages.is_empty() {
            warn!(path = %self.path.display(), "EPUB has no content documents, using placeholder page");
            pages.push(MarkupPage::placeholder());
        }

        info!(
            path = %self.path.display(),
            pages = pages.len(),
            extracted,
            workspace = %workspace.root().display(),
            "Opened EPUB"
        );

        Ok(EpubDocument {
            pages,
            metadata: self.metadata,
            workspace,
        })
    }
}

/// Copy every safe archive entry into the workspace, returning the file count
fn extract_all(package: &mut EpubPackage, workspace: &ScratchWorkspace) -> Result<usize, LoadError> {
    let mut extracted = 0;
    for index in 0..package.archive.len() {
        let mut entry = package.archive.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(name = %entry.name(), "Skipping archive entry outside the workspace");
            continue;
        };
        let target = workspace.root().join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        extracted += 1;
    }
    debug!(files = extracted, "Extracted EPUB archive");
    Ok(extracted)
}

/// Open, validate and extract an EPUB in one step
pub fn open<P: AsRef<Path>>(path: P, scratch_root: Option<&Path>) -> Result<EpubDocument, LoadError> {
    EpubPackage::open(path)?.unpack(scratch_root)
}

#[cfg(test)]
mod tests {
    use super::super::package::tests::{sample_entries, write_zip, CONTAINER};
    use super::*;

    #[test]
    fn test_unpack_extracts_and_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        write_zip(&path, &sample_entries());

        let doc = open(&path, Some(dir.path())).unwrap();
        assert_eq!(doc.page_count(), 2);

        let root = doc.workspace().root().to_path_buf();
        assert!(root.join("OEBPS").join("css").join("style.css").is_file());
        assert!(root.join("mimetype").is_file());

        let first = doc.page(0).unwrap();
        assert_eq!(first.source.as_deref(), Some("OEBPS/text/chap1.xhtml"));
        let img = root.join("OEBPS").join("text").join("img").join("a.png");
        assert!(first.html.contains(&img.to_string_lossy().into_owned()));
        assert!(first.html.contains("One"));
        assert!(doc.page(1).unwrap().html.contains("Two"));
    }

    #[test]
    fn test_encoded_asset_name_resolves_to_extracted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hash.epub");
        let opf = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <manifest><item id="c1" href="text/c.xhtml" media-type="application/xhtml+xml"/></manifest>
  <spine><itemref idref="c1"/></spine>
</package>"#;
        write_zip(
            &path,
            &[
                ("META-INF/container.xml", CONTAINER.as_bytes()),
                ("OEBPS/content.opf", opf.as_bytes()),
                ("OEBPS/text/c.xhtml", br#"<html><body><img src="img/a%23b.png"/></body></html>"#.as_slice()),
                ("OEBPS/text/img/a#b.png", b"pixels".as_slice()),
            ],
        );

        let doc = open(&path, Some(dir.path())).unwrap();
        let html = &doc.page(0).unwrap().html;
        let start = html.find("src=\"").unwrap() + 5;
        let end = start + html[start..].find('"').unwrap();
        let src = &html[start..end];

        assert!(!src.contains('#'));
        let decoded = urlencoding::decode(src).unwrap();
        assert!(Path::new(decoded.as_ref()).is_file());
    }

    #[test]
    fn test_empty_spine_yields_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.epub");
        let opf = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata/>
  <manifest/>
  <spine/>
</package>"#;
        write_zip(
            &path,
            &[
                ("META-INF/container.xml", CONTAINER.as_bytes()),
                ("OEBPS/content.opf", opf.as_bytes()),
            ],
        );

        let doc = open(&path, Some(dir.path())).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert!(doc.page(0).unwrap().is_placeholder());
    }

    #[test]
    fn test_close_removes_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        write_zip(&path, &sample_entries());

        let mut doc = open(&path, Some(dir.path())).unwrap();
        let root = doc.workspace().root().to_path_buf();
        assert!(root.is_dir());

        doc.close();
        assert!(!root.exists());
        // Pages survive the workspace
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_unsafe_entry_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evil.epub");
        let mut entries = sample_entries();
        entries.push(("../../escape.txt", b"nope".as_slice()));
        write_zip(&path, &entries);

        let scratch = dir.path().join("scratch");
        std::fs::create_dir(&scratch).unwrap();
        let doc = open(&path, Some(&scratch)).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert!(!dir.path().join("escape.txt").exists());
        assert!(!scratch.join("escape.txt").exists());
    }

    #[test]
    fn test_corrupt_archive_creates_no_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.epub");
        std::fs::write(&path, b"garbage").unwrap();

        let scratch = dir.path().join("scratch");
        std::fs::create_dir(&scratch).unwrap();
        assert!(open(&path, Some(&scratch)).is_err());
        assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
    }
}
