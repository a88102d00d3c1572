//! # embedfs - Read-only filesystems compiled into your binary
//!
//! Compiles a directory tree into a self-contained snapshot that can be
//! embedded in a program, plus the runtime that serves that snapshot through
//! ordinary file operations: open, stat, read, seek and directory listing.
//!
//! ## Overview
//!
//! The crate has two halves:
//!
//! - **The snapshot compiler** walks a source tree, decides per file whether
//!   gzip pays off (the compressed form is kept only when strictly smaller),
//!   and serializes the tree either as Rust source defining a `static` or as
//!   a binary bundle.
//! - **The embedded runtime** ([`vfs`]) serves the snapshot without touching
//!   the disk. Compressed files support arbitrary-offset seeking even though
//!   gzip decoding is forward-only: a seek only moves a logical position and
//!   the next read fast-forwards or restarts the decoder as needed.
//!
//! ## Quick Start
//!
//! Compile at build time:
//!
//! ```rust,no_run
//! use embedfs::CompilerBuilder;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let compiler = CompilerBuilder::new()
//!     .module_name("assets")
//!     .static_name("ASSETS")
//!     .cfg_predicates(vec!["not(debug_assertions)".to_string()])
//!     .build()?;
//! let report = compiler.compile_dir(Path::new("./static"), Path::new("src/assets_vfsdata.rs"))?;
//! println!("Embedded {} files ({} compressed)", report.files, report.compression.files_compressed);
//! # Ok(())
//! # }
//! ```
//!
//! Then serve the files at run time:
//!
//! ```rust,ignore
//! mod assets_vfsdata;
//! use std::io::{Read, Seek, SeekFrom};
//!
//! let mut file = assets_vfsdata::assets::ASSETS.open("/index.html")?;
//! file.seek(SeekFrom::Start(15))?;
//! let mut rest = String::new();
//! file.read_to_string(&mut rest)?;
//! ```
//!
//! ## In-process round trip
//!
//! ```rust
//! use embedfs::{CompilerBuilder, MemoryFs};
//! use std::io::Read;
//!
//! let input = MemoryFs::new().file("/folder/a.txt", "Stuff.");
//! let compiler = CompilerBuilder::new().parallel_workers(1).build().unwrap();
//! let (artifact, report) = compiler.build_artifact(&input, "/").unwrap();
//! assert_eq!(report.files, 1);
//!
//! let fs = artifact.filesystem();
//! let mut text = String::new();
//! fs.open("/folder/a.txt").unwrap().read_to_string(&mut text).unwrap();
//! assert_eq!(text, "Stuff.");
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, EmbedError>`. Runtime handles implement
//! `std::io::Read` and `std::io::Seek`; their errors are `io::Error`s that
//! carry the original `EmbedError`, recoverable with
//! [`EmbedError::from_io`]. A damaged embedded stream surfaces as
//! `CorruptArtifact`, never as a panic.
//!
//! ## Module Organization
//!
//! - [`compiler`]: Pipeline orchestration and configuration
//! - [`walker`]: Depth-first traversal with ignore patterns
//! - [`input`]: Input filesystem trait and implementations
//! - [`compression`]: Per-file gzip decision
//! - [`manifest`]: In-memory tree built before serialization
//! - [`artifact`]: Serialized snapshot and binary bundles
//! - [`emit`]: Rust source output
//! - [`naming`]: Identifier allocation and byte-string escaping
//! - [`vfs`]: Embedded filesystem runtime
//! - [`types`]: Common types and data structures
//! - [`error`]: Error types and handling

// Public API modules
pub mod artifact;
pub mod compiler;
pub mod compression;
pub mod emit;
pub mod error;
pub mod input;
pub mod manifest;
pub mod naming;
pub mod types;
pub mod vfs;
pub mod walker;

// Re-export main types for convenience
pub use artifact::{Artifact, Descriptor};
pub use compiler::{Compiler, CompilerBuilder, OutputFormat};
pub use compression::{CompressionEngine, CompressionStats};
pub use error::{EmbedError, Result};
pub use input::{InputFs, MemoryFs, OsFs};
pub use types::*;
pub use vfs::{EmbeddedFs, Entry, Handle, Metadata};
