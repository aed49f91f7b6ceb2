//! Glob resolution over abstracted directory trees.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use super::{Directory, FsFile, ListDepth};
use crate::error::{EngineError, Result};

/// Resolves glob patterns against a start directory.
///
/// Patterns are processed one `/`-separated component at a time against a
/// working set of directories:
///
/// * `**` keeps the current set and adds every descendant, fetched once
///   per directory;
/// * `..` replaces each directory with its parent, dropping roots;
/// * `.` and empty components are skipped;
/// * anything else narrows the set through the directory's native
///   wildcard listing.
///
/// Results are deduplicated by absolute path.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryFinder;

impl DirectoryFinder {
    pub fn new() -> Self {
        DirectoryFinder
    }

    /// Directories matching `pattern`, resolved from `start`. An empty
    /// pattern resolves to the start directory itself.
    pub fn directories(
        &self,
        start: &Arc<dyn Directory>,
        pattern: &str,
    ) -> Vec<Arc<dyn Directory>> {
        let mut current: Vec<Arc<dyn Directory>> = vec![Arc::clone(start)];
        for component in pattern.split('/') {
            match component {
                "" | "." => continue,
                ".." => {
                    current = current.iter().filter_map(|dir| dir.parent()).collect();
                }
                "**" => {
                    let mut expanded = current.clone();
                    for dir in &current {
                        expanded.extend(dir.directories("*", ListDepth::Deep));
                    }
                    current = expanded;
                }
                segment => {
                    let mut next = Vec::new();
                    for dir in &current {
                        next.extend(dir.directories(segment, ListDepth::Shallow));
                    }
                    current = next;
                }
            }
            dedupe_dirs(&mut current);
        }
        current
    }

    /// Files matching `pattern`, resolved from `start`. The final
    /// component names the files; everything before it selects
    /// directories. A pattern ending in `/` selects no files.
    pub fn files(&self, start: &Arc<dyn Directory>, pattern: &str) -> Result<Vec<Arc<dyn FsFile>>> {
        if pattern.is_empty() {
            return Err(EngineError::InvalidArgument {
                name: "pattern",
                reason: "file pattern may not be empty".to_string(),
            });
        }
        let (dir_part, file_part) = match pattern.rfind('/') {
            Some(split) => (&pattern[..split], &pattern[split + 1..]),
            None => ("", pattern),
        };
        if file_part.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for dir in self.directories(start, dir_part) {
            for file in dir.files(file_part) {
                if seen.insert(file.path().to_path_buf()) {
                    found.push(file);
                }
            }
        }
        Ok(found)
    }
}

fn dedupe_dirs(dirs: &mut Vec<Arc<dyn Directory>>) {
    let mut seen: HashSet<PathBuf> = HashSet::with_capacity(dirs.len());
    dirs.retain(|dir| seen.insert(dir.path().to_path_buf()));
}
