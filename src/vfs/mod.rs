//! Embedded read-only filesystem runtime
//!
//! An [`EmbeddedFs`] is an immutable, sorted table from absolute path to
//! [`Entry`]. Generated code builds it in a `static` with
//! [`EmbeddedFs::from_static`]; a decoded bundle exposes one through
//! [`Artifact::filesystem`](crate::artifact::Artifact::filesystem).
//!
//! ## Entries
//!
//! - [`RawFile`]: original bytes, served like a byte array
//! - [`CompressedFile`]: a gzip stream plus the original length, served
//!   through a forward-only decoder with rewind-and-replay seeking
//! - [`Directory`]: child paths, resolved against the same table
//!
//! ## Concurrency
//!
//! The table is never mutated, so an `EmbeddedFs` can be shared freely
//! between threads. Each [`Handle`] carries its own cursor state and needs
//! `&mut` access to read or seek; opening the same path twice yields two
//! independent handles.
//!
//! ## Example
//!
//! ```rust
//! use embedfs::vfs::{Directory, EmbeddedFs, Entry, RawFile};
//! use embedfs::types::Timestamp;
//! use std::io::Read;
//!
//! static ENTRIES: [(&str, Entry<'static>); 2] = [
//!     ("/", Entry::Directory(Directory::new("/", Timestamp::new(0, 0), &["/hello.txt"]))),
//!     ("/hello.txt", Entry::Raw(RawFile::new("hello.txt", Timestamp::new(0, 0), b"Hello!"))),
//! ];
//! static FS: EmbeddedFs<'static> = EmbeddedFs::from_static(&ENTRIES);
//!
//! let mut handle = FS.open("/hello.txt").unwrap();
//! let mut text = String::new();
//! handle.read_to_string(&mut text).unwrap();
//! assert_eq!(text, "Hello!");
//! ```

pub mod handle;
pub mod path;

pub use handle::{CompressedFileHandle, DirHandle, Handle, RawFileHandle};
pub use crate::types::Timestamp;

use crate::error::{EmbedError, Result};
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::io::Read;

/// Mode reported for regular files (read-only)
pub const FILE_MODE: u32 = 0o444;
/// Directory bit within a mode
pub const MODE_DIR: u32 = 0o040000;
/// Mode reported for directories
pub const DIR_MODE: u32 = MODE_DIR | 0o755;

const READ_PREALLOC_LIMIT: usize = 1 << 20;

/// A file stored uncompressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile<'a> {
    name: &'a str,
    modified: Timestamp,
    content: &'a [u8],
}

impl<'a> RawFile<'a> {
    /// Describe a raw file
    pub const fn new(name: &'a str, modified: Timestamp, content: &'a [u8]) -> Self {
        Self { name, modified, content }
    }

    /// Stored bytes
    pub fn content(&self) -> &'a [u8] {
        self.content
    }
}

/// A file stored as a gzip stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedFile<'a> {
    name: &'a str,
    modified: Timestamp,
    compressed: &'a [u8],
    uncompressed_size: u64,
}

impl<'a> CompressedFile<'a> {
    /// Describe a compressed file
    pub const fn new(name: &'a str, modified: Timestamp, compressed: &'a [u8], uncompressed_size: u64) -> Self {
        Self {
            name,
            modified,
            compressed,
            uncompressed_size,
        }
    }

    /// Stored gzip bytes
    pub fn compressed(&self) -> &'a [u8] {
        self.compressed
    }

    /// Length of the decompressed content
    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }
}

/// A directory listing its children by absolute path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory<'a> {
    name: &'a str,
    modified: Timestamp,
    children: Cow<'a, [&'a str]>,
}

impl<'a> Directory<'a> {
    /// Describe a directory over a borrowed child list
    pub const fn new(name: &'a str, modified: Timestamp, children: &'a [&'a str]) -> Self {
        Self {
            name,
            modified,
            children: Cow::Borrowed(children),
        }
    }

    /// Describe a directory over an owned child list
    pub fn with_children(name: &'a str, modified: Timestamp, children: Vec<&'a str>) -> Self {
        Self {
            name,
            modified,
            children: Cow::Owned(children),
        }
    }

    /// Child paths in listing order
    pub fn children(&self) -> &[&'a str] {
        &self.children
    }
}

/// One embedded node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry<'a> {
    /// Uncompressed file
    Raw(RawFile<'a>),
    /// Gzip-compressed file
    Compressed(CompressedFile<'a>),
    /// Directory
    Directory(Directory<'a>),
}

impl<'a> Entry<'a> {
    /// Stat-like view of this entry
    pub fn metadata(&self) -> Metadata<'a> {
        match self {
            Entry::Raw(file) => Metadata {
                name: file.name,
                size: file.content.len() as u64,
                mode: FILE_MODE,
                modified: file.modified,
            },
            Entry::Compressed(file) => Metadata {
                name: file.name,
                size: file.uncompressed_size,
                mode: FILE_MODE,
                modified: file.modified,
            },
            Entry::Directory(dir) => Metadata {
                name: dir.name,
                size: 0,
                mode: DIR_MODE,
                modified: dir.modified,
            },
        }
    }

    /// Whether this entry is a directory
    pub fn is_dir(&self) -> bool {
        matches!(self, Entry::Directory(_))
    }
}

/// File information returned by `metadata` and directory listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata<'a> {
    name: &'a str,
    size: u64,
    mode: u32,
    modified: Timestamp,
}

impl<'a> Metadata<'a> {
    /// Base name (`/` for the root)
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Uncompressed length in bytes, 0 for directories
    pub fn len(&self) -> u64 {
        self.size
    }

    /// Whether the length is zero
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Fixed mode bits
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Whether this describes a directory
    pub fn is_dir(&self) -> bool {
        self.mode & MODE_DIR != 0
    }

    /// Whether this describes a regular file
    pub fn is_file(&self) -> bool {
        !self.is_dir()
    }

    /// Modification time captured at compile time
    pub fn modified(&self) -> Timestamp {
        self.modified
    }

    /// Modification time as a UTC date
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified.to_datetime()
    }
}

/// An immutable embedded filesystem
#[derive(Debug, Clone)]
pub struct EmbeddedFs<'a> {
    entries: Cow<'a, [(&'a str, Entry<'a>)]>,
}

impl<'a> EmbeddedFs<'a> {
    /// Wrap a table that is already sorted by path.
    ///
    /// This is what generated code calls; the compiler always emits entries
    /// in sorted order.
    pub const fn from_static(entries: &'a [(&'a str, Entry<'a>)]) -> Self {
        Self {
            entries: Cow::Borrowed(entries),
        }
    }

    /// Build from entries in any order
    pub fn from_entries(mut entries: Vec<(&'a str, Entry<'a>)>) -> Self {
        entries.sort_by(|a, b| a.0.cmp(b.0));
        Self {
            entries: Cow::Owned(entries),
        }
    }

    /// Number of entries, including the root
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every embedded path in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.iter().map(|(entry_path, _)| *entry_path)
    }

    /// Whether any file is stored compressed
    pub fn has_compressed_files(&self) -> bool {
        self.entries.iter().any(|(_, entry)| matches!(entry, Entry::Compressed(_)))
    }

    /// Whether any file is stored raw
    pub fn has_raw_files(&self) -> bool {
        self.entries.iter().any(|(_, entry)| matches!(entry, Entry::Raw(_)))
    }

    /// Look up an already-normalized path
    pub fn entry(&self, normalized: &str) -> Option<(&'a str, &Entry<'a>)> {
        self.entries
            .binary_search_by(|(entry_path, _)| (*entry_path).cmp(normalized))
            .ok()
            .map(|idx| {
                let (entry_path, entry) = &self.entries[idx];
                (*entry_path, entry)
            })
    }

    /// Metadata for `path`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the path is not embedded.
    pub fn metadata(&self, path: &str) -> Result<Metadata<'a>> {
        let normalized = path::normalize(path);
        self.entry(&normalized)
            .map(|(_, entry)| entry.metadata())
            .ok_or(EmbedError::NotFound(normalized))
    }

    /// Open `path` for reading or listing
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the path is not embedded, and `CorruptArtifact`
    /// if a directory references a child that is missing from the table.
    pub fn open(&self, path: &str) -> Result<Handle<'a>> {
        let normalized = path::normalize(path);
        let (entry_path, entry) = self
            .entry(&normalized)
            .ok_or_else(|| EmbedError::NotFound(normalized.clone()))?;

        Ok(match entry {
            Entry::Raw(file) => Handle::Raw(RawFileHandle::new(entry_path, file)),
            Entry::Compressed(file) => Handle::Compressed(CompressedFileHandle::new(entry_path, file)),
            Entry::Directory(dir) => {
                let children = dir
                    .children()
                    .iter()
                    .map(|child| {
                        self.entry(child)
                            .map(|(_, child_entry)| child_entry.metadata())
                            .ok_or_else(|| EmbedError::corrupt(entry_path, format!("missing child {}", child)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Handle::Directory(DirHandle::new(entry_path, entry.metadata(), children))
            }
        })
    }

    /// Read the whole content of the file at `path`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for missing paths, `IsADirectory` for
    /// directories, and `CorruptArtifact` if the stored stream is damaged.
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let mut handle = self.open(path)?;
        if handle.is_dir() {
            return Err(EmbedError::IsADirectory(handle.path().to_string()));
        }
        // The declared length comes from the artifact, so it only sizes the
        // first allocation up to a cap
        let hint = usize::try_from(handle.metadata().len()).unwrap_or(usize::MAX);
        let mut content = Vec::with_capacity(hint.min(READ_PREALLOC_LIMIT));
        handle.read_to_end(&mut content).map_err(|err| {
            if let Some(EmbedError::CorruptArtifact { path, reason }) = EmbedError::from_io(&err) {
                return EmbedError::corrupt(path.clone(), reason.clone());
            }
            EmbedError::Io(err)
        })?;
        Ok(content)
    }

    /// Every path in pre-order starting at the root, children in listing
    /// order
    pub fn walk(&self) -> Walk<'_, 'a> {
        let stack = match self.entry(path::ROOT) {
            Some((root, _)) => vec![root],
            None => Vec::new(),
        };
        Walk { fs: self, stack }
    }
}

/// Pre-order iterator over an [`EmbeddedFs`]
#[derive(Debug)]
pub struct Walk<'fs, 'a> {
    fs: &'fs EmbeddedFs<'a>,
    stack: Vec<&'a str>,
}

impl<'fs, 'a> Iterator for Walk<'fs, 'a> {
    type Item = (&'a str, Metadata<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(next_path) = self.stack.pop() {
            let Some((entry_path, entry)) = self.fs.entry(next_path) else {
                continue;
            };
            if let Entry::Directory(dir) = entry {
                self.stack.extend(dir.children().iter().rev().copied());
            }
            return Some((entry_path, entry.metadata()));
        }
        None
    }
}
