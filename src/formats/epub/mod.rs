//! EPUB format implementation
//!
//! Loading happens in two phases so that a failed load never costs the
//! caller its current document:
//!
//! 1. [`EpubPackage::open`] validates the zip container and parses the
//!    package document into reading order. No files are written.
//! 2. [`EpubPackage::unpack`] creates a [`ScratchWorkspace`], extracts every
//!    entry and rewrites asset references in each spine document through the
//!    [`AssetResolver`], producing an [`EpubDocument`].

mod package;
mod resolver;
mod unpacker;
mod workspace;

pub use package::{EpubMetadata, EpubPackage, SpineEntry};
pub use resolver::{is_external, join_normalized, parent_dir, AssetResolver, RewriteError};
pub use unpacker::{open, EpubDocument};
pub use workspace::ScratchWorkspace;
