//! Filesystem abstraction used by extension discovery.
//!
//! Directory traversal, wildcard listing, and file reads go through these
//! traits so the glob resolver and the extension manager can be exercised
//! against an in-memory tree as well as a real disk.

mod finder;
mod mem;
mod real;

pub use finder::DirectoryFinder;
pub use mem::MemoryFileSystem;
pub use real::RealFileSystem;

use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

/// Listing depth for directory queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListDepth {
    /// Direct children only.
    Shallow,
    /// Every descendant.
    Deep,
}

/// A directory node in an abstracted filesystem.
pub trait Directory: Send + Sync {
    /// Absolute path of this directory.
    fn path(&self) -> &Path;

    /// Parent directory, or `None` at a filesystem root.
    fn parent(&self) -> Option<Arc<dyn Directory>>;

    /// Child directories whose names match a wildcard pattern. The pattern
    /// applies to the final name component; `*` matches everything.
    fn directories(&self, pattern: &str, depth: ListDepth) -> Vec<Arc<dyn Directory>>;

    /// Files directly in this directory whose names match a wildcard
    /// pattern.
    fn files(&self, pattern: &str) -> Vec<Arc<dyn FsFile>>;
}

/// A file node in an abstracted filesystem.
pub trait FsFile: Send + Sync {
    /// Absolute path of this file.
    fn path(&self) -> &Path;

    /// Directory containing the file.
    fn parent(&self) -> Option<Arc<dyn Directory>>;

    /// Opens the file for reading.
    fn open(&self) -> io::Result<Box<dyn Read + Send>>;
}

/// Entry point for resolving absolute paths against a tree.
pub trait FileSystem: Send + Sync {
    /// The directory at an absolute path, if one exists.
    fn directory(&self, path: &Path) -> Option<Arc<dyn Directory>>;

    /// The file at an absolute path, if one exists.
    fn file(&self, path: &Path) -> Option<Arc<dyn FsFile>>;

    /// True if a file exists at the path.
    fn file_exists(&self, path: &Path) -> bool {
        self.file(path).is_some()
    }
}

/// Matches a single name component against a wildcard pattern.
pub(crate) fn name_matches(pattern: &str, name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match glob::Pattern::new(pattern) {
        Ok(compiled) => compiled.matches(name),
        // An unparseable pattern degrades to a literal comparison.
        Err(_) => pattern == name,
    }
}
