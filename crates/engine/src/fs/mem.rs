//! In-memory filesystem for exercising discovery without touching disk.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::{name_matches, Directory, FileSystem, FsFile, ListDepth};

#[derive(Debug, Default)]
struct Tree {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Arc<Vec<u8>>>,
}

/// A virtual tree of directories and byte-backed files.
///
/// Paths are normalized to absolute form; adding a file creates every
/// missing ancestor directory. Clones share the same tree.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileSystem {
    tree: Arc<RwLock<Tree>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        let fs = MemoryFileSystem::default();
        fs.write().dirs.insert(PathBuf::from("/"));
        fs
    }

    /// Adds a directory and its ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        let path = normalize(path.as_ref());
        let mut tree = self.write();
        insert_with_ancestors(&mut tree.dirs, &path);
        self
    }

    /// Adds a file with the given contents, creating ancestor directories.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> &Self {
        let path = normalize(path.as_ref());
        let mut tree = self.write();
        if let Some(parent) = path.parent() {
            insert_with_ancestors(&mut tree.dirs, parent);
        }
        tree.files.insert(path, Arc::new(contents.into()));
        self
    }

    /// Adds a UTF-8 text file.
    pub fn add_text_file(&self, path: impl AsRef<Path>, text: &str) -> &Self {
        self.add_file(path, text.as_bytes().to_vec())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tree> {
        self.tree.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tree> {
        self.tree.read().unwrap_or_else(|e| e.into_inner())
    }
}

fn insert_with_ancestors(dirs: &mut BTreeSet<PathBuf>, path: &Path) {
    let mut current = Some(path);
    while let Some(dir) = current {
        if !dirs.insert(dir.to_path_buf()) {
            break;
        }
        current = dir.parent();
    }
}

/// Collapses `.` and `..` and roots relative paths at `/`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => out.push(name),
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
        }
    }
    out
}

impl FileSystem for MemoryFileSystem {
    fn directory(&self, path: &Path) -> Option<Arc<dyn Directory>> {
        let path = normalize(path);
        self.read().dirs.contains(&path).then(|| {
            Arc::new(MemDirectory {
                fs: self.clone(),
                path,
            }) as Arc<dyn Directory>
        })
    }

    fn file(&self, path: &Path) -> Option<Arc<dyn FsFile>> {
        let path = normalize(path);
        let contents = self.read().files.get(&path).cloned()?;
        Some(Arc::new(MemFile {
            fs: self.clone(),
            path,
            contents,
        }))
    }
}

#[derive(Debug)]
struct MemDirectory {
    fs: MemoryFileSystem,
    path: PathBuf,
}

impl Directory for MemDirectory {
    fn path(&self) -> &Path {
        &self.path
    }

    fn parent(&self) -> Option<Arc<dyn Directory>> {
        let parent = self.path.parent()?;
        self.fs.directory(parent)
    }

    fn directories(&self, pattern: &str, depth: ListDepth) -> Vec<Arc<dyn Directory>> {
        let tree = self.fs.read();
        tree.dirs
            .iter()
            .filter(|dir| match depth {
                ListDepth::Shallow => dir.parent() == Some(self.path.as_path()),
                ListDepth::Deep => dir.starts_with(&self.path) && *dir != &self.path,
            })
            .filter(|dir| {
                dir.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name_matches(pattern, name))
            })
            .map(|dir| {
                Arc::new(MemDirectory {
                    fs: self.fs.clone(),
                    path: dir.clone(),
                }) as Arc<dyn Directory>
            })
            .collect()
    }

    fn files(&self, pattern: &str) -> Vec<Arc<dyn FsFile>> {
        let tree = self.fs.read();
        tree.files
            .iter()
            .filter(|(path, _)| path.parent() == Some(self.path.as_path()))
            .filter(|(path, _)| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name_matches(pattern, name))
            })
            .map(|(path, contents)| {
                Arc::new(MemFile {
                    fs: self.fs.clone(),
                    path: path.clone(),
                    contents: contents.clone(),
                }) as Arc<dyn FsFile>
            })
            .collect()
    }
}

#[derive(Debug)]
struct MemFile {
    fs: MemoryFileSystem,
    path: PathBuf,
    contents: Arc<Vec<u8>>,
}

impl FsFile for MemFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn parent(&self) -> Option<Arc<dyn Directory>> {
        let parent = self.path.parent()?;
        self.fs.directory(parent)
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.contents.as_ref().clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_ancestors_and_normalizes() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/a/b/c/suite.qpack", b"bytes".as_slice());
        assert!(fs.directory(Path::new("/a/b/c")).is_some());
        assert!(fs.directory(Path::new("/a")).is_some());
        assert!(fs.directory(Path::new("/a/b/../b")).is_some());
        assert!(fs.file_exists(Path::new("/a/b/c/suite.qpack")));
        assert!(fs.directory(Path::new("/missing")).is_none());
    }

    #[test]
    fn listings_respect_depth_and_pattern() {
        let fs = MemoryFileSystem::new();
        fs.add_dir("/root/tools/sub");
        fs.add_dir("/root/other");
        fs.add_file("/root/tools/a.qpack", b"".as_slice());
        fs.add_file("/root/tools/b.txt", b"".as_slice());

        let root = fs.directory(Path::new("/root")).unwrap();
        assert_eq!(root.directories("*", ListDepth::Shallow).len(), 2);
        assert_eq!(root.directories("*", ListDepth::Deep).len(), 3);
        assert_eq!(root.directories("to*", ListDepth::Shallow).len(), 1);

        let tools = fs.directory(Path::new("/root/tools")).unwrap();
        let packs = tools.files("*.qpack");
        assert_eq!(packs.len(), 1);
        assert_eq!(packs[0].path(), Path::new("/root/tools/a.qpack"));
    }

    #[test]
    fn file_contents_round_trip() {
        let fs = MemoryFileSystem::new();
        fs.add_text_file("/notes/hello.addons", "one\ntwo\n");
        let file = fs.file(Path::new("/notes/hello.addons")).unwrap();
        let mut text = String::new();
        file.open().unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "one\ntwo\n");
        assert_eq!(file.parent().unwrap().path(), Path::new("/notes"));
    }

    #[test]
    fn root_has_no_parent() {
        let fs = MemoryFileSystem::new();
        let root = fs.directory(Path::new("/")).unwrap();
        assert!(root.parent().is_none());
    }
}
