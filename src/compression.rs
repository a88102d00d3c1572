//! Gzip compression decisions for embedded files
//!
//! Every file is offered to a gzip encoder exactly once. The compressed form
//! is kept only when it is strictly smaller than the original content;
//! otherwise the original bytes are stored as-is. Decisions are made per
//! file with no shared dictionary, so they can run on any number of threads.
//!
//! ## Determinism
//!
//! The gzip header is written with a zero modification time and no file
//! name, so the same input always produces the same compressed bytes for a
//! given level.
//!
//! ## Examples
//!
//! ```rust
//! use embedfs::compression::CompressionEngine;
//!
//! let engine = CompressionEngine::default();
//!
//! let text = "This file compresses well. Bla".to_string() + &"a".repeat(200);
//! let decision = engine.decide("/sample.txt", text.as_bytes(), text.len() as u64).unwrap();
//! assert!(decision.payload.is_compressed());
//!
//! let short = b"Its normal contents are here.";
//! let decision = engine.decide("/short.txt", &short[..], short.len() as u64).unwrap();
//! assert!(!decision.payload.is_compressed());
//! ```

use crate::error::Result;
use crate::types::Payload;
use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use tracing::{debug, trace};

/// Compression statistics for reporting
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionStats {
    /// Number of files stored compressed
    pub files_compressed: usize,
    /// Number of files stored raw
    pub files_stored_raw: usize,
    /// Total bytes saved by compression
    pub bytes_saved: u64,
}

impl CompressionStats {
    /// Fold one decision into the totals
    pub fn record(&mut self, decision: &Decision) {
        match &decision.payload {
            Payload::Compressed(bytes) => {
                self.files_compressed += 1;
                self.bytes_saved += decision.uncompressed_size - bytes.len() as u64;
            }
            Payload::Raw(_) => self.files_stored_raw += 1,
        }
    }

    /// Fraction of files that were stored compressed (0.0 to 1.0)
    ///
    /// ```rust
    /// # use embedfs::compression::CompressionStats;
    /// let stats = CompressionStats { files_compressed: 3, files_stored_raw: 1, bytes_saved: 0 };
    /// assert_eq!(stats.compression_ratio(), 0.75);
    /// ```
    pub fn compression_ratio(&self) -> f64 {
        let total_files = self.files_compressed + self.files_stored_raw;
        if total_files == 0 {
            return 0.0;
        }
        self.files_compressed as f64 / total_files as f64
    }
}

/// Outcome of offering one file to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Chosen stored form
    pub payload: Payload,
    /// Number of bytes actually read from the source
    pub uncompressed_size: u64,
}

/// Gzip compression engine
///
/// Holds only the compression level, so a single engine can be shared
/// across a worker pool.
#[derive(Debug, Clone, Copy)]
pub struct CompressionEngine {
    level: Compression,
}

impl Default for CompressionEngine {
    fn default() -> Self {
        Self::new(Compression::best())
    }
}

impl CompressionEngine {
    /// Create a new engine with the given gzip level
    pub fn new(level: Compression) -> Self {
        Self { level }
    }

    /// Gzip level in use
    pub fn level(&self) -> Compression {
        self.level
    }

    /// Read `reader` to the end and choose raw or compressed storage.
    ///
    /// The reader is consumed in a single forward pass; bytes are fed to the
    /// encoder and kept in a raw buffer at the same time. `size_hint` is the
    /// size the input filesystem reported; a zero hint skips the encoder
    /// entirely. The decision itself is made against the number of bytes
    /// actually read.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from `reader` fails.
    pub fn decide<R: Read>(&self, path: &str, mut reader: R, size_hint: u64) -> Result<Decision> {
        let mut raw = Vec::with_capacity(size_hint.min(64 * 1024 * 1024) as usize);
        let mut encoder = (size_hint > 0).then(|| self.encoder());

        {
            let mut tee = Tee {
                raw: &mut raw,
                encoder: encoder.as_mut(),
            };
            io::copy(&mut reader, &mut tee)?;
        }

        let uncompressed_size = raw.len() as u64;
        if raw.is_empty() {
            trace!("{} is empty, storing raw", path);
            return Ok(Decision {
                payload: Payload::Raw(raw),
                uncompressed_size,
            });
        }

        // A zero hint with content means the file grew after it was stat'ed;
        // compress from the buffer rather than re-reading the source.
        let compressed = match encoder {
            Some(encoder) => encoder.finish()?,
            None => {
                let mut encoder = self.encoder();
                encoder.write_all(&raw)?;
                encoder.finish()?
            }
        };

        if (compressed.len() as u64) < uncompressed_size {
            debug!(
                "Compressed {}: {} -> {} bytes ({:.1}%)",
                path,
                uncompressed_size,
                compressed.len(),
                compressed.len() as f64 / uncompressed_size as f64 * 100.0
            );
            Ok(Decision {
                payload: Payload::Compressed(compressed),
                uncompressed_size,
            })
        } else {
            debug!(
                "Compression not beneficial for {} ({} -> {} bytes), storing raw",
                path,
                uncompressed_size,
                compressed.len()
            );
            Ok(Decision {
                payload: Payload::Raw(raw),
                uncompressed_size,
            })
        }
    }

    fn encoder(&self) -> GzEncoder<Vec<u8>> {
        GzBuilder::new().mtime(0).write(Vec::new(), self.level)
    }
}

/// Writer that copies every byte into the raw buffer and the encoder
struct Tee<'a> {
    raw: &'a mut Vec<u8>,
    encoder: Option<&'a mut GzEncoder<Vec<u8>>>,
}

impl Write for Tee<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.write_all(buf)?;
        }
        self.raw.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.flush(),
            None => Ok(()),
        }
    }
}
