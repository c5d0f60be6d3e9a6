//! Document generation
//!
//! Three stateless batch operations build new containers:
//!
//! | Operation | Input | Output |
//! |---|---|---|
//! | [`text_to_pdf`] | UTF-8 text file | paginated A4 PDF, optionally encrypted |
//! | [`text_to_epub`] | UTF-8 text file | single-chapter EPUB 3 |
//! | [`images_to_pdf`] | image files | one PDF page per image, sized to the image |
//!
//! Every input is validated before the output is touched. Output is written
//! to a temporary file beside the destination and renamed into place only
//! after it is complete, so a failed job never leaves a partial file.

mod epub;
mod images;
mod text;

use std::path::{Path, PathBuf};

use mupdf::Document;
use serde::{Deserialize, Serialize};
use tempfile::{NamedTempFile, TempPath};
use thiserror::Error;
use tracing::info;

use crate::mupdf::PdfWriteSettings;

pub use epub::text_to_epub;
pub use images::images_to_pdf;
pub use text::text_to_pdf;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("No input files given")]
    NoInput,

    #[error("Cannot read input {path}: {reason}")]
    UnreadableInput { path: PathBuf, reason: String },

    #[error("Cannot write output {path}: {reason}")]
    UnwritableOutput { path: PathBuf, reason: String },

    /// Passwords must be non-empty and free of `,` and `=`
    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("PDF backend error: {0}")]
    Backend(String),
}

impl From<mupdf::Error> for GenerationError {
    fn from(err: mupdf::Error) -> Self {
        GenerationError::Backend(err.to_string())
    }
}

impl GenerationError {
    pub(crate) fn unreadable(path: &Path, reason: impl ToString) -> Self {
        GenerationError::UnreadableInput {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unwritable(path: &Path, reason: impl ToString) -> Self {
        GenerationError::UnwritableOutput {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionMode {
    TextToPdf,
    TextToEpub,
    ImagesToPdf,
}

impl ConversionMode {
    pub fn label(&self) -> &'static str {
        match self {
            ConversionMode::TextToPdf => "text_to_pdf",
            ConversionMode::TextToEpub => "text_to_epub",
            ConversionMode::ImagesToPdf => "images_to_pdf",
        }
    }
}

/// One generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    pub mode: ConversionMode,
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    #[serde(default)]
    pub password: Option<String>,
}

impl ConversionJob {
    pub fn new(mode: ConversionMode, inputs: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            inputs,
            output: output.into(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Validate arity and dispatch to the matching operation
    pub fn run(&self) -> Result<(), GenerationError> {
        let password = self.password.as_deref();
        match self.mode {
            ConversionMode::TextToPdf => text_to_pdf(self.single_input()?, &self.output, password),
            ConversionMode::TextToEpub => {
                if password.is_some_and(|p| !p.is_empty()) {
                    return Err(GenerationError::InvalidPassword(
                        "EPUB output cannot be password protected".to_string(),
                    ));
                }
                text_to_epub(self.single_input()?, &self.output)
            }
            ConversionMode::ImagesToPdf => images_to_pdf(&self.inputs, &self.output, password),
        }?;
        info!(
            mode = self.mode.label(),
            inputs = self.inputs.len(),
            output = %self.output.display(),
            "Conversion finished"
        );
        Ok(())
    }

    fn single_input(&self) -> Result<&Path, GenerationError> {
        match self.inputs.as_slice() {
            [] => Err(GenerationError::NoInput),
            [input] => Ok(input.as_path()),
            [first, ..] => Err(GenerationError::unreadable(
                first,
                format!("{} expects exactly one input, got {}", self.mode.label(), self.inputs.len()),
            )),
        }
    }
}

/// Turn an optional password into writer settings; empty means unencrypted
pub(crate) fn pdf_settings(password: Option<&str>) -> Result<PdfWriteSettings, GenerationError> {
    match password {
        None | Some("") => Ok(PdfWriteSettings::default()),
        Some(p) if PdfWriteSettings::is_valid_password(p) => {
            Ok(PdfWriteSettings::with_password(Some(p.to_string())))
        }
        Some(_) => Err(GenerationError::InvalidPassword(
            "passwords may not contain ',' or '='".to_string(),
        )),
    }
}

/// Read a UTF-8 text input
pub(crate) fn read_text(path: &Path) -> Result<String, GenerationError> {
    let bytes = std::fs::read(path).map_err(|e| GenerationError::unreadable(path, e))?;
    String::from_utf8(bytes).map_err(|_| GenerationError::unreadable(path, "not valid UTF-8 text"))
}

/// Reserve a temporary file next to `output`
///
/// Fails with `UnwritableOutput` when the destination directory is missing or
/// read-only, or when `output` names a directory.
pub(crate) fn staging_file(output: &Path) -> Result<NamedTempFile, GenerationError> {
    if output.is_dir() {
        return Err(GenerationError::unwritable(output, "is a directory"));
    }
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        return Err(GenerationError::unwritable(output, "parent directory does not exist"));
    }
    tempfile::Builder::new()
        .prefix(".fereader-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|e| GenerationError::unwritable(output, e))
}

/// Move a completed staging file onto `output`
pub(crate) fn commit(staged: TempPath, output: &Path) -> Result<(), GenerationError> {
    staged
        .persist(output)
        .map_err(|e| GenerationError::unwritable(output, e.error))
}

/// Re-open a finished PDF and check it holds `pages` pages
///
/// Catches finalization failures the writer swallows on drop.
pub(crate) fn verify_written_pdf(
    staged: &Path,
    output: &Path,
    password: Option<&str>,
    pages: usize,
) -> Result<(), GenerationError> {
    let incomplete = |reason: String| GenerationError::unwritable(output, reason);
    let unreadable = |e: mupdf::Error| incomplete(format!("written PDF does not re-open: {e}"));
    let bytes = std::fs::read(staged).map_err(|e| incomplete(e.to_string()))?;
    // Staging files carry a `.part` suffix, so the format is named explicitly
    let mut doc = Document::from_bytes(&bytes, "application/pdf").map_err(unreadable)?;
    if doc.needs_password().map_err(unreadable)? {
        let unlocked = match password {
            Some(password) => doc.authenticate(password).map_err(unreadable)?,
            None => false,
        };
        if !unlocked {
            return Err(incomplete("written PDF rejects its own password".to_string()));
        }
    }
    let written = doc.page_count().map_err(unreadable)?.max(0) as usize;
    if written != pages {
        return Err(incomplete(format!(
            "written PDF has {written} pages, expected {pages}"
        )));
    }
    Ok(())
}

/// Stem of `path` for use as a document title
pub(crate) fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Untitled".to_string())
}
