//! Input filesystems the compiler can read from
//!
//! The compiler never touches `std::fs` directly; it goes through the
//! [`InputFs`] trait. Paths handed to an `InputFs` are virtual: absolute,
//! `/`-separated and relative to the filesystem's own root.
//!
//! Two implementations ship with the crate:
//!
//! - [`OsFs`] reads a real directory on disk
//! - [`MemoryFs`] holds a tree in memory, which is handy for tests and for
//!   callers that assemble their assets programmatically
//!
//! ```rust
//! use embedfs::input::{InputFs, MemoryFs};
//!
//! let fs = MemoryFs::new()
//!     .file("/folder/a.txt", "Stuff.")
//!     .dir("/empty");
//!
//! let mut names = fs.read_dir("/").unwrap();
//! names.sort();
//! assert_eq!(names, vec!["empty", "folder"]);
//! ```

use crate::types::{InputFileType, InputMetadata, Timestamp};
use crate::vfs::path;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Read-only access to a source tree
///
/// Implementations must be shareable across the compiler's worker threads.
pub trait InputFs: Send + Sync {
    /// Metadata for `path`, following symbolic links
    fn metadata(&self, path: &str) -> io::Result<InputMetadata>;

    /// Metadata for `path` without following a final symbolic link
    fn symlink_metadata(&self, path: &str) -> io::Result<InputMetadata> {
        self.metadata(path)
    }

    /// Open the file at `path` for reading
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>>;

    /// Names of the entries directly inside the directory at `path`, in no
    /// particular order
    fn read_dir(&self, path: &str) -> io::Result<Vec<String>>;
}

/// A directory on the local filesystem
#[derive(Debug, Clone)]
pub struct OsFs {
    root: PathBuf,
}

impl OsFs {
    /// Serve the directory at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory being served
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let relative = path.trim_start_matches('/');
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }

    fn convert(meta: fs::Metadata) -> InputMetadata {
        let file_type = meta.file_type();
        let file_type = if file_type.is_symlink() {
            InputFileType::Symlink
        } else if file_type.is_dir() {
            InputFileType::Directory
        } else if file_type.is_file() {
            InputFileType::File
        } else {
            InputFileType::Other
        };

        InputMetadata {
            file_type,
            len: if file_type == InputFileType::Directory { 0 } else { meta.len() },
            modified: meta.modified().map(Timestamp::from).unwrap_or_default(),
        }
    }
}

impl InputFs for OsFs {
    fn metadata(&self, path: &str) -> io::Result<InputMetadata> {
        fs::metadata(self.resolve(path)).map(Self::convert)
    }

    fn symlink_metadata(&self, path: &str) -> io::Result<InputMetadata> {
        fs::symlink_metadata(self.resolve(path)).map(Self::convert)
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>> {
        let file = fs::File::open(self.resolve(path))?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.resolve(path))? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!("Skipping non UTF-8 name {:?} in {}", raw, path),
            }
        }
        Ok(names)
    }
}

#[derive(Debug, Clone)]
enum MemoryNode {
    File(Arc<[u8]>),
    Dir,
    Unreadable,
    Symlink(String),
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    node: MemoryNode,
    modified: Timestamp,
}

/// An in-memory tree
///
/// Parent directories are created implicitly. Besides plain files and
/// directories it can model unreadable files and symbolic links so that
/// walker policies can be exercised without touching the disk.
#[derive(Debug, Clone)]
pub struct MemoryFs {
    entries: BTreeMap<String, MemoryEntry>,
    default_modified: Timestamp,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    /// Create a tree holding only the root directory
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            path::ROOT.to_string(),
            MemoryEntry {
                node: MemoryNode::Dir,
                modified: Timestamp::UNIX_EPOCH,
            },
        );
        Self {
            entries,
            default_modified: Timestamp::UNIX_EPOCH,
        }
    }

    /// Modification time given to entries added after this call
    pub fn with_modified(mut self, modified: Timestamp) -> Self {
        self.default_modified = modified;
        if let Some(root) = self.entries.get_mut(path::ROOT) {
            root.modified = modified;
        }
        self
    }

    /// Add a file
    pub fn file(mut self, file_path: &str, content: impl AsRef<[u8]>) -> Self {
        let content: Arc<[u8]> = Arc::from(content.as_ref());
        self.insert(file_path, MemoryNode::File(content));
        self
    }

    /// Add a directory (empty unless files are added beneath it)
    pub fn dir(mut self, dir_path: &str) -> Self {
        self.insert(dir_path, MemoryNode::Dir);
        self
    }

    /// Add a file whose metadata is readable but whose content is not
    pub fn unreadable(mut self, file_path: &str) -> Self {
        self.insert(file_path, MemoryNode::Unreadable);
        self
    }

    /// Add a symbolic link pointing at `target` (an absolute virtual path)
    pub fn symlink(mut self, link_path: &str, target: &str) -> Self {
        self.insert(link_path, MemoryNode::Symlink(path::normalize(target)));
        self
    }

    fn insert(&mut self, raw_path: &str, node: MemoryNode) {
        let normalized = path::normalize(raw_path);
        let mut ancestor = path::parent(&normalized);
        while let Some(dir) = ancestor {
            self.entries.entry(dir.to_string()).or_insert(MemoryEntry {
                node: MemoryNode::Dir,
                modified: self.default_modified,
            });
            ancestor = path::parent(dir);
        }
        self.entries.insert(
            normalized,
            MemoryEntry {
                node,
                modified: self.default_modified,
            },
        );
    }

    fn lookup(&self, raw_path: &str) -> io::Result<&MemoryEntry> {
        self.entries
            .get(&path::normalize(raw_path))
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} does not exist", raw_path)))
    }

    fn follow(&self, raw_path: &str) -> io::Result<&MemoryEntry> {
        let mut entry = self.lookup(raw_path)?;
        // Bounded so a link cycle reports an error instead of spinning
        for _ in 0..32 {
            match &entry.node {
                MemoryNode::Symlink(target) => entry = self.lookup(target)?,
                _ => return Ok(entry),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!("too many levels of symbolic links at {}", raw_path),
        ))
    }

    fn describe(entry: &MemoryEntry) -> InputMetadata {
        let (file_type, len) = match &entry.node {
            MemoryNode::File(content) => (InputFileType::File, content.len() as u64),
            MemoryNode::Unreadable => (InputFileType::File, 0),
            MemoryNode::Dir => (InputFileType::Directory, 0),
            MemoryNode::Symlink(_) => (InputFileType::Symlink, 0),
        };
        InputMetadata {
            file_type,
            len,
            modified: entry.modified,
        }
    }
}

impl InputFs for MemoryFs {
    fn metadata(&self, path: &str) -> io::Result<InputMetadata> {
        self.follow(path).map(Self::describe)
    }

    fn symlink_metadata(&self, path: &str) -> io::Result<InputMetadata> {
        self.lookup(path).map(Self::describe)
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>> {
        match &self.follow(path)?.node {
            MemoryNode::File(content) => Ok(Box::new(&content[..])),
            MemoryNode::Unreadable => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is not readable", path),
            )),
            _ => Err(io::Error::new(io::ErrorKind::Other, format!("{} is not a file", path))),
        }
    }

    fn read_dir(&self, dir_path: &str) -> io::Result<Vec<String>> {
        let dir = path::normalize(dir_path);
        if !matches!(self.follow(&dir)?.node, MemoryNode::Dir) {
            return Err(io::Error::new(io::ErrorKind::Other, format!("{} is not a directory", dir_path)));
        }

        let names = self
            .entries
            .keys()
            .filter(|key| path::parent(key) == Some(dir.as_str()))
            .map(|key| path::base_name(key).to_string())
            .collect();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_fs_creates_parents() {
        let fs = MemoryFs::new().file("/a/b/c.txt", "x");
        assert!(fs.metadata("/a").unwrap().is_dir());
        assert!(fs.metadata("/a/b").unwrap().is_dir());
        assert_eq!(fs.metadata("/a/b/c.txt").unwrap().len, 1);
        assert_eq!(fs.read_dir("/a").unwrap(), vec!["b"]);
    }

    #[test]
    fn test_memory_fs_missing_path() {
        let fs = MemoryFs::new();
        let err = fs.metadata("/does/not/exist").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_memory_fs_symlinks() {
        let fs = MemoryFs::new().file("/target.txt", "data").symlink("/link.txt", "/target.txt");
        assert_eq!(fs.symlink_metadata("/link.txt").unwrap().file_type, InputFileType::Symlink);
        assert!(fs.metadata("/link.txt").unwrap().is_file());

        let mut content = String::new();
        fs.open("/link.txt").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "data");
    }

    #[test]
    fn test_memory_fs_unreadable() {
        let fs = MemoryFs::new().unreadable("/secret");
        assert!(fs.metadata("/secret").unwrap().is_file());
        assert!(fs.open("/secret").is_err());
    }

    #[test]
    fn test_os_fs_reads_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("folder")).unwrap();
        fs::write(temp_dir.path().join("folder/a.txt"), "Stuff.").unwrap();

        let input = OsFs::new(temp_dir.path());
        assert!(input.metadata("/").unwrap().is_dir());
        assert_eq!(input.read_dir("/").unwrap(), vec!["folder"]);

        let meta = input.metadata("/folder/a.txt").unwrap();
        assert!(meta.is_file());
        assert_eq!(meta.len, 6);

        let mut content = String::new();
        input.open("/folder/a.txt").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "Stuff.");
    }
}
