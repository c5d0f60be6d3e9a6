//! Scratch workspace for extracted EPUB archives
//!
//! A [`ScratchWorkspace`] exclusively owns one temporary directory. It is
//! destroyed explicitly by the session when the owning document is replaced
//! or the reader shuts down; `Drop` only covers paths that never reach those
//! events (early returns, panics).

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

const WORKSPACE_PREFIX: &str = "fereader-epub-";

/// Exclusively-owned temporary extraction directory
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: Option<TempDir>,
    /// Kept after destruction so callers can still report where it lived
    root: PathBuf,
}

impl ScratchWorkspace {
    /// Create a fresh workspace under the system temp dir, or under `parent` if given
    pub fn create(parent: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        let root = dir.path().to_path_buf();
        debug!(root = %root.display(), "Created scratch workspace");
        Ok(Self {
            dir: Some(dir),
            root,
        })
    }

    /// Workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of an archive-relative path inside the workspace
    pub fn resolve(&self, archive_path: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in archive_path.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }

    pub fn is_live(&self) -> bool {
        self.dir.is_some()
    }

    /// Recursively delete the workspace; failures are logged, never raised
    ///
    /// Only the first call does anything.
    pub fn destroy(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match dir.close() {
            Ok(()) => debug!(root = %self.root.display(), "Destroyed scratch workspace"),
            Err(e) => warn!(
                root = %self.root.display(),
                error = %e,
                "Failed to remove scratch workspace; leaving stale files"
            ),
        }
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        self.destroy();
    }
}
