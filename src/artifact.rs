//! The serialized snapshot
//!
//! An [`Artifact`] is the manifest flattened into a mapping from absolute
//! path to [`Descriptor`]. Directories reference their children by path
//! into the same mapping; file content is never duplicated.
//!
//! The artifact has two external forms:
//!
//! - Rust source, produced by [`emit`](crate::emit)
//! - a binary bundle: the `EMFS` magic, a little-endian `u16` format version
//!   and the bincode encoding of the artifact. Bundles are meant for
//!   `include_bytes!` and are read back with [`Artifact::from_bundle`].
//!
//! ```rust
//! use embedfs::artifact::Artifact;
//! use embedfs::manifest::ManifestBuilder;
//!
//! let artifact = Artifact::from_manifest(&ManifestBuilder::new().build());
//! let bytes = artifact.to_bundle().unwrap();
//! let decoded = Artifact::from_bundle(&bytes).unwrap();
//! assert_eq!(decoded, artifact);
//! assert!(decoded.filesystem().open("/").unwrap().is_dir());
//! ```

use crate::error::{EmbedError, Result};
use crate::manifest::Manifest;
use crate::types::{Node, Payload, Timestamp};
use crate::vfs::{self, CompressedFile, Directory, EmbeddedFs, Entry, RawFile};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

/// Leading bytes of every bundle
pub const BUNDLE_MAGIC: [u8; 4] = *b"EMFS";

/// Current bundle format version
pub const BUNDLE_VERSION: u16 = 1;

const HEADER_LEN: usize = BUNDLE_MAGIC.len() + 2;

/// Deflate never expands more than this many output bytes per input byte
const MAX_INFLATE_RATIO: u64 = 1032;

/// One entry of the artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Descriptor {
    /// File stored uncompressed
    RawFile {
        /// Base name
        name: String,
        /// Modification time
        modified: Timestamp,
        /// Original bytes
        content: Vec<u8>,
    },
    /// File stored as a gzip stream
    CompressedFile {
        /// Base name
        name: String,
        /// Modification time
        modified: Timestamp,
        /// Gzip bytes, strictly shorter than `uncompressed_size`
        compressed_content: Vec<u8>,
        /// Length of the original content
        uncompressed_size: u64,
    },
    /// Directory
    Directory {
        /// Base name (`/` for the root)
        name: String,
        /// Modification time
        modified: Timestamp,
        /// Child paths in base-name order
        children: Vec<String>,
    },
}

impl Descriptor {
    /// Base name of the entry
    pub fn name(&self) -> &str {
        match self {
            Descriptor::RawFile { name, .. }
            | Descriptor::CompressedFile { name, .. }
            | Descriptor::Directory { name, .. } => name,
        }
    }

    /// Modification time of the entry
    pub fn modified(&self) -> Timestamp {
        match self {
            Descriptor::RawFile { modified, .. }
            | Descriptor::CompressedFile { modified, .. }
            | Descriptor::Directory { modified, .. } => *modified,
        }
    }

    /// Whether this is a directory
    pub fn is_dir(&self) -> bool {
        matches!(self, Descriptor::Directory { .. })
    }

    /// Original content length, 0 for directories
    pub fn size(&self) -> u64 {
        match self {
            Descriptor::RawFile { content, .. } => content.len() as u64,
            Descriptor::CompressedFile { uncompressed_size, .. } => *uncompressed_size,
            Descriptor::Directory { .. } => 0,
        }
    }

    fn as_entry(&self) -> Entry<'_> {
        match self {
            Descriptor::RawFile { name, modified, content } => Entry::Raw(RawFile::new(name, *modified, content)),
            Descriptor::CompressedFile {
                name,
                modified,
                compressed_content,
                uncompressed_size,
            } => Entry::Compressed(CompressedFile::new(name, *modified, compressed_content, *uncompressed_size)),
            Descriptor::Directory { name, modified, children } => Entry::Directory(Directory::with_children(
                name,
                *modified,
                children.iter().map(String::as_str).collect(),
            )),
        }
    }
}

/// A complete snapshot ready to be emitted or embedded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Path to descriptor, sorted by path
    pub entries: BTreeMap<String, Descriptor>,
    /// Whether any file is stored compressed
    pub has_compressed_files: bool,
    /// Whether any file is stored raw
    pub has_raw_files: bool,
}

impl Artifact {
    /// Flatten a manifest into an artifact
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut entries = BTreeMap::new();
        let mut has_compressed_files = false;
        let mut has_raw_files = false;

        for node in manifest.nodes() {
            let descriptor = match node {
                Node::Dir(dir) => Descriptor::Directory {
                    name: dir.name.clone(),
                    modified: dir.modified,
                    children: dir.children.clone(),
                },
                Node::File(file) => match &file.payload {
                    Payload::Raw(content) => {
                        has_raw_files = true;
                        Descriptor::RawFile {
                            name: file.name.clone(),
                            modified: file.modified,
                            content: content.clone(),
                        }
                    }
                    Payload::Compressed(compressed) => {
                        has_compressed_files = true;
                        Descriptor::CompressedFile {
                            name: file.name.clone(),
                            modified: file.modified,
                            compressed_content: compressed.clone(),
                            uncompressed_size: file.uncompressed_size,
                        }
                    }
                },
            };
            entries.insert(node.path().to_string(), descriptor);
        }

        Self {
            entries,
            has_compressed_files,
            has_raw_files,
        }
    }

    /// Number of file entries
    pub fn file_count(&self) -> usize {
        self.entries.values().filter(|d| !d.is_dir()).count()
    }

    /// Number of directory entries, including the root
    pub fn dir_count(&self) -> usize {
        self.entries.values().filter(|d| d.is_dir()).count()
    }

    /// Sum of original file lengths
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(Descriptor::size).sum()
    }

    /// Runtime view over this artifact
    pub fn filesystem(&self) -> EmbeddedFs<'_> {
        EmbeddedFs::from_entries(
            self.entries
                .iter()
                .map(|(entry_path, descriptor)| (entry_path.as_str(), descriptor.as_entry()))
                .collect(),
        )
    }

    /// Check the structural invariants a compiled artifact always holds.
    ///
    /// # Errors
    ///
    /// Returns `CorruptArtifact` naming the first offending path.
    pub fn validate(&self) -> Result<()> {
        match self.entries.get(vfs::path::ROOT) {
            Some(root) if root.is_dir() => {}
            _ => return Err(EmbedError::corrupt(vfs::path::ROOT, "root directory is missing")),
        }

        let mut saw_compressed = false;
        let mut saw_raw = false;
        for (entry_path, descriptor) in &self.entries {
            if vfs::path::normalize(entry_path) != *entry_path {
                return Err(EmbedError::corrupt(entry_path.as_str(), "path is not normalized"));
            }
            if !descriptor.modified().is_valid() {
                return Err(EmbedError::corrupt(entry_path.as_str(), "modification time is out of range"));
            }
            match descriptor {
                Descriptor::Directory { children, .. } => {
                    for child in children {
                        if vfs::path::parent(child) != Some(entry_path.as_str()) || !self.entries.contains_key(child) {
                            return Err(EmbedError::corrupt(entry_path.as_str(), format!("bad child reference {}", child)));
                        }
                    }
                }
                Descriptor::CompressedFile {
                    compressed_content,
                    uncompressed_size,
                    ..
                } => {
                    saw_compressed = true;
                    if compressed_content.len() as u64 >= *uncompressed_size {
                        return Err(EmbedError::corrupt(
                            entry_path.as_str(),
                            "compressed payload is not smaller than its content",
                        ));
                    }
                    if *uncompressed_size > (compressed_content.len() as u64).saturating_mul(MAX_INFLATE_RATIO) {
                        return Err(EmbedError::corrupt(
                            entry_path.as_str(),
                            format!("declared size {} cannot come from the compressed payload", uncompressed_size),
                        ));
                    }
                }
                Descriptor::RawFile { .. } => saw_raw = true,
            }
        }

        if saw_compressed != self.has_compressed_files || saw_raw != self.has_raw_files {
            return Err(EmbedError::corrupt(vfs::path::ROOT, "payload flags disagree with entries"));
        }
        Ok(())
    }

    /// Encode as a binary bundle
    pub fn to_bundle(&self) -> Result<Vec<u8>> {
        let payload = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(&BUNDLE_MAGIC);
        bytes.extend_from_slice(&BUNDLE_VERSION.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decode and validate a binary bundle
    ///
    /// # Errors
    ///
    /// Returns `InvalidBundle` for a wrong header or trailing bytes, a
    /// bincode error for an undecodable body, and `CorruptArtifact` if the
    /// decoded snapshot breaks its invariants.
    pub fn from_bundle(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(EmbedError::InvalidBundle(format!("{} bytes is too short", bytes.len())));
        }
        let (header, payload) = bytes.split_at(HEADER_LEN);
        if header[..BUNDLE_MAGIC.len()] != BUNDLE_MAGIC {
            return Err(EmbedError::InvalidBundle("missing EMFS magic".to_string()));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != BUNDLE_VERSION {
            return Err(EmbedError::InvalidBundle(format!(
                "unsupported format version {} (expected {})",
                version, BUNDLE_VERSION
            )));
        }

        let (artifact, consumed): (Artifact, usize) =
            bincode::serde::decode_from_slice(payload, bincode::config::standard())?;
        if consumed != payload.len() {
            return Err(EmbedError::InvalidBundle(format!(
                "{} trailing bytes after artifact",
                payload.len() - consumed
            )));
        }
        artifact.validate()?;
        debug!("Decoded bundle with {} entries", artifact.entries.len());
        Ok(artifact)
    }

    /// Hex SHA-256 of the bundle encoding
    pub fn digest(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(self.to_bundle()?);
        Ok(hex::encode(hasher.finalize()))
    }
}
