//! Open handles onto embedded entries
//!
//! Every handle owns its own cursor. Handles borrow only the embedded data,
//! never the [`EmbeddedFs`](super::EmbeddedFs) they came from, so a handle
//! opened from a `static` filesystem is `Handle<'static>`.
//!
//! Compressed files are served through a forward-only gzip decoder. Seeking
//! only moves a logical position; the next read reconciles the decoder with
//! it by fast-forwarding (decode and discard) or, when the target lies
//! behind the decoder, by starting a fresh decoder from the beginning of the
//! stored stream. Backward seeks therefore cost O(target offset).

use super::{CompressedFile, Metadata, RawFile};
use crate::error::{EmbedError, Result};
use flate2::read::GzDecoder;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use tracing::trace;

/// Resolve a seek request against the current position and content size.
///
/// Positions past the end are allowed; reads there return end-of-file.
fn resolve_seek(path: &str, current: u64, size: u64, pos: SeekFrom) -> Result<u64> {
    let (base, offset) = match pos {
        SeekFrom::Start(target) => return Ok(target),
        SeekFrom::Current(offset) => (current, offset),
        SeekFrom::End(offset) => (size, offset),
    };
    base.checked_add_signed(offset).ok_or_else(|| {
        if offset < 0 {
            EmbedError::invalid_seek(path, format!("position {} + {} is before the start", base, offset))
        } else {
            EmbedError::invalid_seek(path, format!("position {} + {} overflows", base, offset))
        }
    })
}

/// Handle onto an uncompressed file
#[derive(Debug, Clone)]
pub struct RawFileHandle<'a> {
    path: &'a str,
    metadata: Metadata<'a>,
    content: &'a [u8],
    position: u64,
}

impl<'a> RawFileHandle<'a> {
    pub(super) fn new(path: &'a str, file: &RawFile<'a>) -> Self {
        Self {
            path,
            metadata: super::Entry::Raw(file.clone()).metadata(),
            content: file.content,
            position: 0,
        }
    }

    /// Current read position
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl Read for RawFileHandle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.content.len() as u64;
        if self.position >= len || buf.is_empty() {
            return Ok(0);
        }
        let start = self.position as usize;
        let n = buf.len().min(self.content.len() - start);
        buf[..n].copy_from_slice(&self.content[start..start + n]);
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for RawFileHandle<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = resolve_seek(self.path, self.position, self.content.len() as u64, pos)?;
        Ok(self.position)
    }
}

/// Handle onto a gzip-compressed file
///
/// Tracks two positions: where the caller wants to read next (logical) and
/// how many decompressed bytes the decoder has produced so far (stream).
pub struct CompressedFileHandle<'a> {
    path: &'a str,
    metadata: Metadata<'a>,
    compressed: &'a [u8],
    size: u64,
    decoder: Option<GzDecoder<&'a [u8]>>,
    stream_position: u64,
    logical_position: u64,
}

impl<'a> CompressedFileHandle<'a> {
    pub(super) fn new(path: &'a str, file: &CompressedFile<'a>) -> Self {
        Self {
            path,
            metadata: super::Entry::Compressed(file.clone()).metadata(),
            compressed: file.compressed,
            size: file.uncompressed_size,
            decoder: None,
            stream_position: 0,
            logical_position: 0,
        }
    }

    /// Current logical read position
    pub fn position(&self) -> u64 {
        self.logical_position
    }

    /// Stored gzip bytes, for callers that can serve them unmodified
    pub fn gzip_bytes(&self) -> &'a [u8] {
        self.compressed
    }

    /// Drop the decoder; the next read starts a new one
    fn reset(&mut self) {
        self.decoder = None;
        self.stream_position = 0;
    }

    fn corrupt(&self, reason: impl Into<String>) -> io::Error {
        EmbedError::corrupt(self.path, reason).into()
    }
}

impl fmt::Debug for CompressedFileHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressedFileHandle")
            .field("path", &self.path)
            .field("size", &self.size)
            .field("compressed_len", &self.compressed.len())
            .field("stream_position", &self.stream_position)
            .field("logical_position", &self.logical_position)
            .finish()
    }
}

impl Read for CompressedFileHandle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.logical_position >= self.size {
            return Ok(0);
        }

        if self.stream_position > self.logical_position {
            trace!(
                "Rewinding {} from {} to reach {}",
                self.path,
                self.stream_position,
                self.logical_position
            );
            self.reset();
        }

        let path = self.path;
        let compressed = self.compressed;
        let decoder = self.decoder.get_or_insert_with(|| GzDecoder::new(compressed));

        if self.stream_position < self.logical_position {
            let gap = self.logical_position - self.stream_position;
            let skipped = io::copy(&mut (&mut *decoder).take(gap), &mut io::sink())
                .map_err(|err| io::Error::from(EmbedError::corrupt(path, err.to_string())))?;
            self.stream_position += skipped;
            if skipped < gap {
                return Err(self.corrupt(format!(
                    "stream ended at {} of {} bytes",
                    self.stream_position, self.size
                )));
            }
        }

        let remaining = self.size - self.logical_position;
        let limit = (buf.len() as u64).min(remaining) as usize;
        let n = decoder
            .read(&mut buf[..limit])
            .map_err(|err| io::Error::from(EmbedError::corrupt(path, err.to_string())))?;
        if n == 0 {
            return Err(self.corrupt(format!(
                "stream ended at {} of {} bytes",
                self.stream_position, self.size
            )));
        }

        self.stream_position += n as u64;
        self.logical_position += n as u64;
        Ok(n)
    }
}

impl Seek for CompressedFileHandle<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.logical_position = resolve_seek(self.path, self.logical_position, self.size, pos)?;
        Ok(self.logical_position)
    }
}

/// Handle onto a directory
///
/// Child metadata is resolved when the handle is opened.
#[derive(Debug, Clone)]
pub struct DirHandle<'a> {
    path: &'a str,
    metadata: Metadata<'a>,
    children: Vec<Metadata<'a>>,
    cursor: usize,
}

impl<'a> DirHandle<'a> {
    pub(super) fn new(path: &'a str, metadata: Metadata<'a>, children: Vec<Metadata<'a>>) -> Self {
        Self {
            path,
            metadata,
            children,
            cursor: 0,
        }
    }

    /// List children.
    ///
    /// With `None` (or `Some(0)`) the full listing is returned and the
    /// cursor is left alone. With `Some(n)` at most `n` children after the
    /// cursor are returned and the cursor advances past them; once every
    /// child has been returned the result is empty.
    pub fn read_dir(&mut self, page: Option<usize>) -> Vec<Metadata<'a>> {
        match page {
            None | Some(0) => self.children.clone(),
            Some(count) => {
                let start = self.cursor.min(self.children.len());
                let end = start.saturating_add(count).min(self.children.len());
                self.cursor = end;
                self.children[start..end].to_vec()
            }
        }
    }
}

impl Seek for DirHandle<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Start(0) => {
                self.cursor = 0;
                Ok(0)
            }
            other => Err(EmbedError::invalid_seek(
                self.path,
                format!("directories only support rewinding to the start, got {:?}", other),
            )
            .into()),
        }
    }
}

/// An open embedded entry
#[derive(Debug)]
pub enum Handle<'a> {
    /// Uncompressed file
    Raw(RawFileHandle<'a>),
    /// Gzip-compressed file
    Compressed(CompressedFileHandle<'a>),
    /// Directory
    Directory(DirHandle<'a>),
}

impl<'a> Handle<'a> {
    /// Normalized path this handle was opened at
    pub fn path(&self) -> &'a str {
        match self {
            Handle::Raw(h) => h.path,
            Handle::Compressed(h) => h.path,
            Handle::Directory(h) => h.path,
        }
    }

    /// Metadata of the opened entry
    pub fn metadata(&self) -> Metadata<'a> {
        match self {
            Handle::Raw(h) => h.metadata,
            Handle::Compressed(h) => h.metadata,
            Handle::Directory(h) => h.metadata,
        }
    }

    /// Whether the handle refers to a directory
    pub fn is_dir(&self) -> bool {
        matches!(self, Handle::Directory(_))
    }

    /// Whether the handle refers to a file stored compressed
    pub fn is_compressed(&self) -> bool {
        matches!(self, Handle::Compressed(_))
    }

    /// Stored gzip bytes, only for compressed files
    pub fn gzip_bytes(&self) -> Option<&'a [u8]> {
        match self {
            Handle::Compressed(h) => Some(h.gzip_bytes()),
            _ => None,
        }
    }

    /// List a directory's children; see [`DirHandle::read_dir`]
    ///
    /// # Errors
    ///
    /// Returns `NotADirectory` when called on a file.
    pub fn read_dir(&mut self, page: Option<usize>) -> Result<Vec<Metadata<'a>>> {
        match self {
            Handle::Directory(h) => Ok(h.read_dir(page)),
            other => Err(EmbedError::NotADirectory(other.path().to_string())),
        }
    }

    /// Release decoder state. Always succeeds and may be called repeatedly;
    /// a later read on a compressed file starts a fresh decoder.
    pub fn close(&mut self) {
        if let Handle::Compressed(h) = self {
            h.reset();
        }
    }
}

impl Read for Handle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Handle::Raw(h) => h.read(buf),
            Handle::Compressed(h) => h.read(buf),
            Handle::Directory(h) => Err(EmbedError::IsADirectory(h.path.to_string()).into()),
        }
    }
}

impl Seek for Handle<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Handle::Raw(h) => h.seek(pos),
            Handle::Compressed(h) => h.seek(pos),
            Handle::Directory(h) => h.seek(pos),
        }
    }
}
