//! `std::fs`-backed filesystem.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use super::{name_matches, Directory, FileSystem, FsFile, ListDepth};

/// Filesystem implementation over the real disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        RealFileSystem
    }
}

impl FileSystem for RealFileSystem {
    fn directory(&self, path: &Path) -> Option<Arc<dyn Directory>> {
        path.is_dir().then(|| {
            Arc::new(RealDirectory {
                path: path.to_path_buf(),
            }) as Arc<dyn Directory>
        })
    }

    fn file(&self, path: &Path) -> Option<Arc<dyn FsFile>> {
        path.is_file().then(|| {
            Arc::new(RealFile {
                path: path.to_path_buf(),
            }) as Arc<dyn FsFile>
        })
    }
}

#[derive(Debug)]
struct RealDirectory {
    path: PathBuf,
}

impl Directory for RealDirectory {
    fn path(&self) -> &Path {
        &self.path
    }

    fn parent(&self) -> Option<Arc<dyn Directory>> {
        self.path.parent().map(|parent| {
            Arc::new(RealDirectory {
                path: parent.to_path_buf(),
            }) as Arc<dyn Directory>
        })
    }

    fn directories(&self, pattern: &str, depth: ListDepth) -> Vec<Arc<dyn Directory>> {
        let mut found: Vec<PathBuf> = match depth {
            ListDepth::Shallow => list_children(&self.path, pattern, true),
            ListDepth::Deep => WalkDir::new(&self.path)
                .min_depth(1)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|entry| entry.file_type().is_dir())
                .filter(|entry| entry_name_matches(entry.path(), pattern))
                .map(|entry| entry.into_path())
                .collect(),
        };
        found.sort();
        found
            .into_iter()
            .map(|path| Arc::new(RealDirectory { path }) as Arc<dyn Directory>)
            .collect()
    }

    fn files(&self, pattern: &str) -> Vec<Arc<dyn FsFile>> {
        let mut found = list_children(&self.path, pattern, false);
        found.sort();
        found
            .into_iter()
            .map(|path| Arc::new(RealFile { path }) as Arc<dyn FsFile>)
            .collect()
    }
}

fn list_children(dir: &Path, pattern: &str, want_dirs: bool) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| {
            entry
                .file_type()
                .map(|ty| if want_dirs { ty.is_dir() } else { ty.is_file() })
                .unwrap_or(false)
        })
        .map(|entry| entry.path())
        .filter(|path| entry_name_matches(path, pattern))
        .collect()
}

fn entry_name_matches(path: &Path, pattern: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name_matches(pattern, name))
}

#[derive(Debug)]
struct RealFile {
    path: PathBuf,
}

impl FsFile for RealFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn parent(&self) -> Option<Arc<dyn Directory>> {
        self.path.parent().map(|parent| {
            Arc::new(RealDirectory {
                path: parent.to_path_buf(),
            }) as Arc<dyn Directory>
        })
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}
