//! EPUB package reader
//!
//! Validates the zip container and parses `META-INF/container.xml` and the
//! OPF package document into reading order. Nothing is written to disk here;
//! extraction happens later in [`EpubPackage::unpack`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::{debug, warn};
use zip::ZipArchive;

use super::resolver::{join_normalized, parent_dir};
use crate::document::LoadError;

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Descriptive metadata from the OPF `<metadata>` block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpubMetadata {
    pub title: Option<String>,
    pub creator: Option<String>,
    pub language: Option<String>,
    pub identifier: Option<String>,
}

/// One content document in reading order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineEntry {
    /// Manifest id
    pub id: String,
    /// Normalized archive path
    pub archive_path: String,
    pub media_type: String,
}

/// A validated, not yet extracted EPUB archive
pub struct EpubPackage {
    pub(super) path: PathBuf,
    pub(super) archive: ZipArchive<File>,
    pub(super) opf_path: String,
    pub(super) metadata: EpubMetadata,
    pub(super) spine: Vec<SpineEntry>,
}

impl std::fmt::Debug for EpubPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpubPackage")
            .field("path", &self.path)
            .field("entries", &self.archive.len())
            .field("opf_path", &self.opf_path)
            .field("spine", &self.spine.len())
            .finish()
    }
}

impl EpubPackage {
    /// Open and validate an EPUB archive
    ///
    /// Fails with [`LoadError::Io`] when the file cannot be read and with
    /// [`LoadError::Corrupt`] when it is not a zip archive, has no readable
    /// package document, or any entry fails to decompress or match its CRC.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut archive = ZipArchive::new(file)?;

        let opf_path = locate_package_document(&mut archive)?;
        let opf_xml = read_entry_string(&mut archive, &opf_path)?;
        let package: OpfPackage = from_str(strip_bom(&opf_xml))
            .map_err(|e| LoadError::Corrupt(format!("invalid package document {opf_path}: {e}")))?;

        let metadata = package.metadata.map(EpubMetadata::from).unwrap_or_default();
        let spine = build_spine(&archive, &opf_path, package.manifest, package.spine);
        verify_payloads(&mut archive)?;

        debug!(
            path = %path.display(),
            opf = %opf_path,
            entries = archive.len(),
            spine = spine.len(),
            "Validated EPUB package"
        );

        Ok(Self {
            path,
            archive,
            opf_path,
            metadata,
            spine,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Archive path of the OPF package document
    pub fn opf_path(&self) -> &str {
        &self.opf_path
    }

    pub fn metadata(&self) -> &EpubMetadata {
        &self.metadata
    }

    /// Content documents in reading order
    pub fn spine(&self) -> &[SpineEntry] {
        &self.spine
    }
}

/// Decompress every file entry, checking each payload against its stored CRC
fn verify_payloads(archive: &mut ZipArchive<File>) -> Result<(), LoadError> {
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        io::copy(&mut entry, &mut io::sink()).map_err(|e| {
            LoadError::Corrupt(format!("damaged archive entry {}: {e}", entry.name()))
        })?;
    }
    Ok(())
}

/// Find the OPF via `container.xml`, falling back to the first `.opf` entry
fn locate_package_document(archive: &mut ZipArchive<File>) -> Result<String, LoadError> {
    if archive.index_for_name(CONTAINER_PATH).is_some() {
        let xml = read_entry_string(archive, CONTAINER_PATH)?;
        let container: Container = from_str(strip_bom(&xml))
            .map_err(|e| LoadError::Corrupt(format!("invalid {CONTAINER_PATH}: {e}")))?;
        let rootfile = container
            .rootfiles
            .rootfile
            .into_iter()
            .map(|r| r.full_path)
            .find(|p| !p.trim().is_empty())
            .ok_or_else(|| LoadError::Corrupt(format!("{CONTAINER_PATH} lists no rootfile")))?;
        return Ok(join_normalized("", rootfile.trim()));
    }

    warn!("EPUB has no {}, searching for a package document", CONTAINER_PATH);
    archive
        .file_names()
        .find(|name| name.to_ascii_lowercase().ends_with(".opf"))
        .map(str::to_string)
        .ok_or_else(|| LoadError::Corrupt("archive contains no package document".to_string()))
}

fn read_entry_string(archive: &mut ZipArchive<File>, name: &str) -> Result<String, LoadError> {
    let mut entry = archive.by_name(name).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => {
            LoadError::Corrupt(format!("missing archive entry {name}"))
        }
        other => LoadError::from(other),
    })?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| LoadError::Corrupt(format!("{name} is not valid UTF-8")))
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Resolve spine itemrefs through the manifest into archive paths
///
/// Dangling idrefs, non-markup items and items whose file is absent from the
/// archive are skipped.
fn build_spine(
    archive: &ZipArchive<File>,
    opf_path: &str,
    manifest: Option<OpfManifest>,
    spine: Option<OpfSpine>,
) -> Vec<SpineEntry> {
    let items: HashMap<String, OpfManifestItem> = manifest
        .map(|m| m.item)
        .unwrap_or_default()
        .into_iter()
        .map(|item| (item.id.clone(), item))
        .collect();
    let base = parent_dir(opf_path);

    let mut entries = Vec::new();
    for itemref in spine.map(|s| s.itemref).unwrap_or_default() {
        let Some(item) = items.get(&itemref.idref) else {
            warn!(idref = %itemref.idref, "Spine references unknown manifest item");
            continue;
        };
        if !is_content_document(item) {
            debug!(href = %item.href, media_type = %item.media_type, "Skipping non-markup spine item");
            continue;
        }

        let href = urlencoding::decode(&item.href)
            .map(|h| h.into_owned())
            .unwrap_or_else(|_| item.href.clone());
        let archive_path = join_normalized(base, &href);
        if archive.index_for_name(&archive_path).is_none() {
            warn!(path = %archive_path, "Spine item missing from archive");
            continue;
        }

        entries.push(SpineEntry {
            id: item.id.clone(),
            archive_path,
            media_type: item.media_type.clone(),
        });
    }
    entries
}

fn is_content_document(item: &OpfManifestItem) -> bool {
    match item.media_type.as_str() {
        "application/xhtml+xml" | "text/html" => true,
        "" => {
            let guessed = mime_guess::from_path(&item.href).first_raw();
            matches!(guessed, Some("application/xhtml+xml") | Some("text/html"))
        }
        _ => false,
    }
}

impl From<OpfMetadata> for EpubMetadata {
    fn from(metadata: OpfMetadata) -> Self {
        let first = |values: Vec<DcText>| {
            values
                .into_iter()
                .map(|v| v.content.trim().to_string())
                .find(|v| !v.is_empty())
        };
        Self {
            title: first(metadata.title),
            creator: first(metadata.creator),
            language: first(metadata.language),
            identifier: first(metadata.identifier),
        }
    }
}

// container.xml

#[derive(Debug, Deserialize)]
struct Container {
    rootfiles: RootFiles,
}

#[derive(Debug, Deserialize)]
struct RootFiles {
    #[serde(rename = "rootfile", default)]
    rootfile: Vec<RootFile>,
}

#[derive(Debug, Deserialize)]
struct RootFile {
    #[serde(rename = "@full-path", default)]
    full_path: String,
}

// OPF package document

#[derive(Debug, Deserialize)]
struct OpfPackage {
    metadata: Option<OpfMetadata>,
    manifest: Option<OpfManifest>,
    spine: Option<OpfSpine>,
}

#[derive(Debug, Deserialize)]
struct OpfMetadata {
    #[serde(rename = "title", default)]
    title: Vec<DcText>,

    #[serde(rename = "creator", default)]
    creator: Vec<DcText>,

    #[serde(rename = "language", default)]
    language: Vec<DcText>,

    #[serde(rename = "identifier", default)]
    identifier: Vec<DcText>,
}

#[derive(Debug, Deserialize)]
struct DcText {
    #[serde(rename = "$text", default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpfManifest {
    #[serde(rename = "item", default)]
    item: Vec<OpfManifestItem>,
}

#[derive(Debug, Deserialize)]
struct OpfManifestItem {
    #[serde(rename = "@id", default)]
    id: String,

    #[serde(rename = "@href", default)]
    href: String,

    #[serde(rename = "@media-type", default)]
    media_type: String,
}

#[derive(Debug, Deserialize)]
struct OpfSpine {
    #[serde(rename = "itemref", default)]
    itemref: Vec<OpfItemRef>,
}

#[derive(Debug, Deserialize)]
struct OpfItemRef {
    #[serde(rename = "@idref", default)]
    idref: String,
}
