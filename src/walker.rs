//! Depth-first traversal of an input filesystem
//!
//! The walker visits a directory before its children (pre-order) and visits
//! children in lexicographic byte order of their names, so two walks over the
//! same tree always produce the same sequence.
//!
//! ## Failure policy
//!
//! - The root must be a readable directory; anything else aborts the walk.
//! - Any other entry that cannot be stat'ed or listed is logged with
//!   `warn!` and skipped. One unreadable file never fails a compile.
//!
//! ## Symbolic links and special files
//!
//! - Symbolic links are skipped unless `follow_symlinks` is enabled.
//! - When following, a link to a regular file is yielded as a file carrying
//!   the target's metadata and content. Links to directories are always
//!   skipped, which rules out cycles.
//! - FIFOs, sockets and devices are always skipped.
//!
//! ## Ignore patterns
//!
//! Patterns are regular expressions matched against the full virtual path of
//! every entry below the root (for example `/folder/a.txt`). A matching
//! directory is pruned together with everything beneath it.
//!
//! ```rust
//! use embedfs::input::MemoryFs;
//! use embedfs::walker::{IgnoreSet, Walker};
//!
//! let fs = MemoryFs::new()
//!     .file("/b.txt", "b")
//!     .file("/a/x.txt", "x")
//!     .file("/a/.DS_Store", "junk");
//!
//! let ignore = IgnoreSet::new(["\\.DS_Store$"]).unwrap();
//! let walker = Walker::new(&fs).with_ignore(ignore);
//! let paths: Vec<String> = walker.walk("/").unwrap().map(|e| e.path).collect();
//! assert_eq!(paths, vec!["/", "/a", "/a/x.txt", "/b.txt"]);
//! ```

use crate::error::{EmbedError, Result};
use crate::input::InputFs;
use crate::types::{InputFileType, InputMetadata};
use crate::vfs::path;
use regex::RegexSet;
use std::io::{self, Read};
use tracing::{debug, trace, warn};

/// Compiled ignore patterns
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    set: RegexSet,
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self { set: RegexSet::empty() }
    }
}

impl IgnoreSet {
    /// Compile a list of regular expressions
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` if any expression fails to compile.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            set: RegexSet::new(patterns)?,
        })
    }

    /// Whether any pattern matches `path`
    pub fn is_ignored(&self, path: &str) -> bool {
        !self.set.is_empty() && self.set.is_match(path)
    }

    /// Number of patterns
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether there are no patterns
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

/// One entry produced by a walk
pub struct WalkEntry<'a> {
    /// Virtual path relative to the walk root (`/` is the root itself)
    pub path: String,
    /// Path on the input filesystem
    pub source: String,
    /// Metadata; for followed links this describes the target
    pub metadata: InputMetadata,
    fs: &'a dyn InputFs,
}

impl<'a> WalkEntry<'a> {
    /// Whether this entry is a directory
    pub fn is_dir(&self) -> bool {
        self.metadata.is_dir()
    }

    /// Open the entry's content for reading
    pub fn open(&self) -> io::Result<Box<dyn Read + Send + 'a>> {
        self.fs.open(&self.source)
    }
}

impl std::fmt::Debug for WalkEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkEntry")
            .field("path", &self.path)
            .field("source", &self.source)
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Traversal configuration
pub struct Walker<'a> {
    fs: &'a dyn InputFs,
    ignore: IgnoreSet,
    follow_symlinks: bool,
}

impl<'a> Walker<'a> {
    /// Walk `fs` with no ignore patterns and symlinks skipped
    pub fn new(fs: &'a dyn InputFs) -> Self {
        Self {
            fs,
            ignore: IgnoreSet::default(),
            follow_symlinks: false,
        }
    }

    /// Skip entries matching `ignore`
    pub fn with_ignore(mut self, ignore: IgnoreSet) -> Self {
        self.ignore = ignore;
        self
    }

    /// Follow symbolic links to regular files
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Start a walk at `root` on the input filesystem.
    ///
    /// The root is stat'ed and listed eagerly so that an unreadable root
    /// fails here; everything else is visited lazily as the iterator is
    /// driven.
    ///
    /// # Errors
    ///
    /// Returns `RootUnreadable` if the root cannot be stat'ed or listed, and
    /// `NotADirectory` if it is not a directory.
    pub fn walk(&self, root: &str) -> Result<Walk<'_>> {
        let root_source = path::normalize(root);
        let metadata = self.fs.metadata(&root_source).map_err(|source| EmbedError::RootUnreadable {
            path: root_source.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(EmbedError::NotADirectory(root_source));
        }

        let mut walk = Walk {
            walker: self,
            pending_root: None,
            stack: Vec::new(),
            skipped: 0,
            ignored: 0,
        };
        let names = self.fs.read_dir(&root_source).map_err(|source| EmbedError::RootUnreadable {
            path: root_source.clone(),
            source,
        })?;
        walk.push_children(path::ROOT, &root_source, names);
        walk.pending_root = Some(WalkEntry {
            path: path::ROOT.to_string(),
            source: root_source,
            metadata,
            fs: self.fs,
        });
        Ok(walk)
    }
}

struct Pending {
    path: String,
    source: String,
}

/// Lazy pre-order iterator over a tree
///
/// Finite and not restartable; start a new walk to traverse again.
pub struct Walk<'w> {
    walker: &'w Walker<'w>,
    pending_root: Option<WalkEntry<'w>>,
    stack: Vec<Pending>,
    skipped: usize,
    ignored: usize,
}

impl<'w> Walk<'w> {
    /// Entries skipped so far because they could not be read or are unsupported
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Entries pruned so far by ignore patterns
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    fn push_children(&mut self, dir_path: &str, dir_source: &str, mut names: Vec<String>) {
        names.sort();
        for name in names.into_iter().rev() {
            let child_path = path::join(dir_path, &name);
            if self.walker.ignore.is_ignored(&child_path) {
                debug!("Ignoring {}", child_path);
                self.ignored += 1;
                continue;
            }
            self.stack.push(Pending {
                source: path::join(dir_source, &name),
                path: child_path,
            });
        }
    }

    fn skip(&mut self, pending: &Pending, reason: impl std::fmt::Display) -> Option<WalkEntry<'w>> {
        warn!("Skipping {}: {}", pending.source, reason);
        self.skipped += 1;
        None
    }

    fn visit(&mut self, pending: Pending) -> Option<WalkEntry<'w>> {
        let fs = self.walker.fs;
        let mut metadata = match fs.symlink_metadata(&pending.source) {
            Ok(metadata) => metadata,
            Err(err) => return self.skip(&pending, format!("can't stat: {}", err)),
        };

        if metadata.file_type == InputFileType::Symlink {
            if !self.walker.follow_symlinks {
                return self.skip(&pending, "symbolic link");
            }
            metadata = match fs.metadata(&pending.source) {
                Ok(target) => target,
                Err(err) => return self.skip(&pending, format!("dangling symbolic link: {}", err)),
            };
            if !metadata.is_file() {
                return self.skip(&pending, "symbolic link to a non-regular file");
            }
            trace!("Following symbolic link {}", pending.source);
        }

        match metadata.file_type {
            InputFileType::File => {}
            InputFileType::Directory => match fs.read_dir(&pending.source) {
                Ok(names) => self.push_children(&pending.path, &pending.source, names),
                Err(err) => return self.skip(&pending, format!("can't list directory: {}", err)),
            },
            InputFileType::Symlink | InputFileType::Other => {
                return self.skip(&pending, "special file");
            }
        }

        Some(WalkEntry {
            path: pending.path,
            source: pending.source,
            metadata,
            fs,
        })
    }
}

impl<'w> Iterator for Walk<'w> {
    type Item = WalkEntry<'w>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(root) = self.pending_root.take() {
            return Some(root);
        }
        while let Some(pending) = self.stack.pop() {
            if let Some(entry) = self.visit(pending) {
                return Some(entry);
            }
        }
        None
    }
}
