//! Core data types used throughout embedfs
//!
//! ## Overview
//!
//! The types in this module represent:
//! - **Time**: `Timestamp` - a const-constructible modification time shared by
//!   the compiler and the runtime
//! - **Input state**: `InputMetadata`, `InputFileType` - what an input
//!   filesystem reports about an entry
//! - **Manifest nodes**: `Node`, `FileNode`, `DirNode`, `Payload` - the
//!   in-memory tree built by the compiler before serialization
//! - **Results**: `CompileReport` - what a compile run produced
//!
//! ## Examples
//!
//! ```rust
//! use embedfs::types::Timestamp;
//!
//! let ts = Timestamp::new(1_700_000_000, 0);
//! assert_eq!(ts.to_datetime().unwrap().timestamp(), 1_700_000_000);
//! ```

use crate::compression::CompressionStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Modification time with nanosecond precision
///
/// Stored as seconds and nanoseconds relative to the Unix epoch so that
/// generated code can build it in a `static` initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp {
    /// Whole seconds since the Unix epoch (negative before 1970)
    pub secs: i64,
    /// Sub-second nanoseconds, always below 1_000_000_000
    pub nanos: u32,
}

impl Timestamp {
    /// The Unix epoch
    pub const UNIX_EPOCH: Timestamp = Timestamp { secs: 0, nanos: 0 };

    /// Create a timestamp from seconds and nanoseconds
    pub const fn new(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }

    /// Convert from a `SystemTime`, including times before the epoch
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Self::new(after.as_secs() as i64, after.subsec_nanos()),
            Err(err) => {
                let before = err.duration();
                if before.subsec_nanos() == 0 {
                    Self::new(-(before.as_secs() as i64), 0)
                } else {
                    Self::new(
                        -(before.as_secs() as i64) - 1,
                        NANOS_PER_SEC - before.subsec_nanos(),
                    )
                }
            }
        }
    }

    /// Whether `nanos` is a proper sub-second count
    pub const fn is_valid(self) -> bool {
        self.nanos < NANOS_PER_SEC
    }

    /// Convert to a `SystemTime`
    ///
    /// Returns `None` for an invalid nanosecond field or a time the
    /// platform's `SystemTime` cannot represent.
    pub fn to_system_time(self) -> Option<SystemTime> {
        if !self.is_valid() {
            return None;
        }
        let nanos = Duration::from_nanos(u64::from(self.nanos));
        if self.secs >= 0 {
            UNIX_EPOCH.checked_add(Duration::from_secs(self.secs.unsigned_abs()))?.checked_add(nanos)
        } else {
            UNIX_EPOCH
                .checked_sub(Duration::from_secs(self.secs.unsigned_abs()))?
                .checked_add(nanos)
        }
    }

    /// Convert to a UTC `DateTime`, if representable
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.secs, self.nanos)
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

/// Kind of entry reported by an input filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputFileType {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (only reported by `symlink_metadata`)
    Symlink,
    /// FIFO, socket, device or anything else
    Other,
}

/// Metadata an input filesystem reports for one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMetadata {
    /// Entry kind
    pub file_type: InputFileType,
    /// Length in bytes (0 for directories)
    pub len: u64,
    /// Last modification time
    pub modified: Timestamp,
}

impl InputMetadata {
    /// Whether the entry is a directory
    pub fn is_dir(&self) -> bool {
        self.file_type == InputFileType::Directory
    }

    /// Whether the entry is a regular file
    pub fn is_file(&self) -> bool {
        self.file_type == InputFileType::File
    }
}

/// Stored form of a file's content
///
/// Exactly one form is kept per file; the compressed form only survives when
/// it is strictly smaller than the original content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Original bytes
    Raw(Vec<u8>),
    /// Gzip stream of the original bytes
    Compressed(Vec<u8>),
}

impl Payload {
    /// Whether this payload is the compressed form
    pub fn is_compressed(&self) -> bool {
        matches!(self, Payload::Compressed(_))
    }

    /// Number of stored bytes
    pub fn stored_len(&self) -> usize {
        match self {
            Payload::Raw(bytes) | Payload::Compressed(bytes) => bytes.len(),
        }
    }
}

/// A file in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    /// Absolute slash-separated path, unique across the manifest
    pub path: String,
    /// Base name
    pub name: String,
    /// Last modification time of the source
    pub modified: Timestamp,
    /// Length of the original content
    pub uncompressed_size: u64,
    /// Stored content
    pub payload: Payload,
}

/// A directory in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirNode {
    /// Absolute slash-separated path, unique across the manifest
    pub path: String,
    /// Base name (`/` for the root)
    pub name: String,
    /// Last modification time of the source
    pub modified: Timestamp,
    /// Child paths in lexicographic base-name order
    pub children: Vec<String>,
}

/// A manifest node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// A regular file
    File(FileNode),
    /// A directory
    Dir(DirNode),
}

impl Node {
    /// Absolute path of the node
    pub fn path(&self) -> &str {
        match self {
            Node::File(file) => &file.path,
            Node::Dir(dir) => &dir.path,
        }
    }

    /// Whether the node is a directory
    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Dir(_))
    }
}

/// Summary of one compile run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileReport {
    /// Files embedded
    pub files: usize,
    /// Directories embedded, including the root
    pub directories: usize,
    /// Entries skipped because they could not be read or were unsupported
    pub skipped: usize,
    /// Compression decisions
    pub compression: CompressionStats,
    /// Total original bytes across all files
    pub total_size: u64,
    /// Hex SHA-256 of the artifact's bundle encoding
    pub digest: String,
    /// Where the artifact was written, if anywhere
    pub output: Option<PathBuf>,
    /// Wall-clock time of the run
    pub duration: Duration,
}
