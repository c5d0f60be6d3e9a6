//! Asset-path resolution for EPUB content documents
//!
//! Resource references inside a content document are relative to that
//! document's own position in the archive. They are resolved with POSIX
//! join-and-normalize rules and rewritten to absolute paths inside the
//! scratch workspace, so each page is self-contained.
//!
//! Uses lol_html for streaming HTML rewriting.

use std::path::{Path, PathBuf};

use lol_html::{element, rewrite_str, RewriteStrSettings};
use thiserror::Error;

/// Errors during markup rewriting
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("HTML rewrite failed: {0}")]
    Rewrite(String),
}

/// Directory portion of an archive path (`"OEBPS/text/ch1.xhtml"` → `"OEBPS/text"`)
pub fn parent_dir(archive_path: &str) -> &str {
    match archive_path.rfind('/') {
        Some(idx) => &archive_path[..idx],
        None => "",
    }
}

/// Join `href` onto `base_dir` and normalize
///
/// `.` segments are dropped and `..` removes the previous segment. A `..` at the
/// archive root is discarded rather than escaping the archive. A leading `/`
/// makes `href` relative to the archive root.
pub fn join_normalized(base_dir: &str, href: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let start = if href.starts_with('/') { "" } else { base_dir };

    for segment in start.split('/').chain(href.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// References that point outside the archive and are left untouched
pub fn is_external(href: &str) -> bool {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("//") {
        return true;
    }
    has_scheme(href)
}

/// `scheme:` prefix per RFC 3986 (`http:`, `data:`, `mailto:`, ...)
fn has_scheme(href: &str) -> bool {
    let Some(colon) = href.find(':') else {
        return false;
    };
    let scheme = &href[..colon];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => chars
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.'),
        _ => false,
    }
}

/// Strip query/fragment and percent-decoding from a raw attribute value
fn clean_href(href: &str) -> String {
    let without_fragment = href.split('#').next().unwrap_or(href);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
    let trimmed = without_query.trim().replace('\\', "/");
    urlencoding::decode(&trimmed)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(trimmed)
}

/// Escape the characters URL parsers treat as delimiters in a filesystem path
fn escape_path_chars(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '%' => out.push_str("%25"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            ' ' => out.push_str("%20"),
            other => out.push(other),
        }
    }
    out
}

/// Resolves references of one content document into workspace paths
#[derive(Debug, Clone)]
pub struct AssetResolver {
    doc_dir: String,
    workspace_root: PathBuf,
}

impl AssetResolver {
    /// `doc_path` is the content document's archive path
    pub fn new(doc_path: &str, workspace_root: &Path) -> Self {
        Self {
            doc_dir: parent_dir(doc_path).to_string(),
            workspace_root: workspace_root.to_path_buf(),
        }
    }

    /// Archive path a reference points to, or `None` for external references
    pub fn archive_path(&self, href: &str) -> Option<String> {
        if is_external(href) {
            return None;
        }
        let cleaned = clean_href(href);
        if cleaned.is_empty() {
            return None;
        }
        Some(join_normalized(&self.doc_dir, &cleaned))
    }

    /// Absolute workspace path for a reference
    pub fn local_path(&self, href: &str) -> Option<PathBuf> {
        let archive_path = self.archive_path(href)?;
        let mut path = self.workspace_root.clone();
        for segment in archive_path.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        Some(path)
    }

    /// Attribute value to substitute for `href`
    ///
    /// The decoded archive path only locates the file. Its segments are
    /// percent-encoded again on the way out, so names containing `#`, `?`, `%`
    /// or spaces still parse as a single path.
    pub fn localize(&self, href: &str) -> Option<String> {
        let archive_path = self.archive_path(href)?;
        let mut value = escape_path_chars(&self.workspace_root.to_string_lossy());
        for segment in archive_path.split('/').filter(|s| !s.is_empty()) {
            if !value.ends_with('/') {
                value.push('/');
            }
            value.push_str(&urlencoding::encode(segment));
        }
        Some(value)
    }

    /// Rewrite every asset reference in `html`
    ///
    /// Covers `img[src]`, `source[src]`, `link[href]` and SVG
    /// `image[href|xlink:href]`. Hyperlinks (`a[href]`) are navigation and
    /// stay as they are.
    pub fn rewrite(&self, html: &str) -> Result<String, RewriteError> {
        let result = rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!("img[src]", |el| {
                        if let Some(src) = el.get_attribute("src") {
                            if let Some(local) = self.localize(&src) {
                                el.set_attribute("src", &local)?;
                            }
                        }
                        Ok(())
                    }),
                    element!("source[src]", |el| {
                        if let Some(src) = el.get_attribute("src") {
                            if let Some(local) = self.localize(&src) {
                                el.set_attribute("src", &local)?;
                            }
                        }
                        Ok(())
                    }),
                    element!("link[href]", |el| {
                        if let Some(href) = el.get_attribute("href") {
                            if let Some(local) = self.localize(&href) {
                                el.set_attribute("href", &local)?;
                            }
                        }
                        Ok(())
                    }),
                    element!("image", |el| {
                        for attr in ["href", "xlink:href"] {
                            if let Some(href) = el.get_attribute(attr) {
                                if let Some(local) = self.localize(&href) {
                                    el.set_attribute(attr, &local)?;
                                }
                            }
                        }
                        Ok(())
                    }),
                ],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|e| RewriteError::Rewrite(e.to_string()))?;

        Ok(result)
    }
}
