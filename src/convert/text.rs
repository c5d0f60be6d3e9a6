//! Plain text → PDF
//!
//! The text is wrapped in a minimal XHTML document, laid out by MuPDF's
//! reflowable HTML engine on A4 pages, and replayed page by page into a PDF
//! writer.

use std::path::Path;

use mupdf::Document;
use tracing::debug;

use super::{
    commit, pdf_settings, read_text, staging_file, title_from_path, verify_written_pdf,
    GenerationError,
};
use crate::mupdf::PdfPageWriter;

/// A4 in points
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const FONT_SIZE: f32 = 11.0;

const STYLE: &str = "body { margin: 54pt; font-family: serif; line-height: 1.35; } \
                     p { margin: 0 0 0.7em 0; }";

/// Paginate a UTF-8 text file into a PDF, encrypting it when `password` is set
pub fn text_to_pdf(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<(), GenerationError> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let settings = pdf_settings(password)?;
    let text = read_text(input)?;
    let staged = staging_file(output)?.into_temp_path();

    let xhtml = text_to_xhtml(&title_from_path(input), &text);
    let mut source = Document::from_bytes(xhtml.as_bytes(), "application/xhtml+xml")?;
    source.layout(PAGE_WIDTH, PAGE_HEIGHT, FONT_SIZE)?;
    let page_count = source.page_count()?;

    {
        let mut writer = PdfPageWriter::create(&staged, &settings)?;
        for index in 0..page_count {
            let page = source.load_page(index)?;
            writer.copy_page(&page)?;
        }
        debug!(pages = writer.page_count(), encrypted = settings.password.is_some(), "Wrote text PDF");
    }

    verify_written_pdf(&staged, output, settings.password.as_deref(), page_count.max(0) as usize)?;
    commit(staged, output)
}

/// XHTML document with one paragraph per blank-line-separated block
pub(crate) fn text_to_xhtml(title: &str, text: &str) -> String {
    let mut body = String::new();
    for paragraph in paragraphs(text) {
        body.push_str("<p>");
        let lines: Vec<String> = paragraph
            .iter()
            .map(|line| html_escape::encode_text(line).into_owned())
            .collect();
        body.push_str(&lines.join("<br/>"));
        body.push_str("</p>\n");
    }
    if body.is_empty() {
        body.push_str("<p></p>\n");
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\">\n\
         <head><title>{}</title><style>{}</style></head>\n\
         <body>\n{}</body>\n\
         </html>\n",
        html_escape::encode_text(title),
        STYLE,
        body
    )
}

/// Split into paragraphs at blank lines, dropping surrounding whitespace
fn paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
