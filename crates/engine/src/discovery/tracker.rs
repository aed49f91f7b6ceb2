//! Candidate bookkeeping for a discovery pass.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::candidate::CandidatePack;

/// Records every pack file a scan has touched and keeps one winner per
/// pack name, preferring the higher version on collision.
#[derive(Debug, Default)]
pub struct CandidateTracker {
    evaluated: HashSet<PathBuf>,
    by_name: HashMap<String, CandidatePack>,
    order: Vec<String>,
}

impl CandidateTracker {
    pub fn new() -> Self {
        CandidateTracker::default()
    }

    /// Marks a file path as evaluated. Returns `false` if the path was
    /// already seen, in which case the caller must not process it again.
    pub fn mark_evaluated(&mut self, path: &Path) -> bool {
        self.evaluated.insert(path.to_path_buf())
    }

    /// True if the path has been evaluated in this scan.
    pub fn was_evaluated(&self, path: &Path) -> bool {
        self.evaluated.contains(path)
    }

    /// Adds a candidate, keeping whichever of the old and new carries the
    /// higher pack version. First sighting of a name keeps its position
    /// in iteration order.
    pub fn add_or_update(&mut self, candidate: CandidatePack) {
        let name = candidate.name().to_string();
        match self.by_name.get(&name) {
            Some(existing) if candidate.version() > existing.version() => {
                debug!(
                    pack = %name,
                    new = %candidate.version(),
                    old = %existing.version(),
                    "candidate supersedes a lower version"
                );
                self.by_name.insert(name, candidate);
            }
            Some(existing) => {
                debug!(
                    pack = %name,
                    kept = %existing.version(),
                    dropped = %candidate.version(),
                    "keeping existing candidate"
                );
            }
            None => {
                self.order.push(name.clone());
                self.by_name.insert(name, candidate);
            }
        }
    }

    /// Winning candidates in first-sighting order.
    pub fn winners(&self) -> impl Iterator<Item = &CandidatePack> {
        self.order.iter().filter_map(|name| self.by_name.get(name))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
