//! Error types for embedfs
//!
//! A single error enum covers both halves of the crate: the snapshot
//! compiler (walking, compressing, emitting) and the embedded runtime
//! (open, read, seek, list). Runtime handles implement `std::io::Read` and
//! `std::io::Seek`, so runtime errors are also convertible into
//! `std::io::Error` with the original `EmbedError` kept as the inner source.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the embedfs library
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Main error type for all embedfs operations
#[derive(Debug, Error)]
pub enum EmbedError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Errors during JSON serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors during bincode serialization/deserialization
    #[error("Bincode error: {0}")]
    Bincode(String),

    /// Path is absent from the embedded filesystem or the input tree
    #[error("Not found: {0}")]
    NotFound(String),

    /// A directory operation was requested on a file
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// A file operation was requested on a directory
    #[error("Is a directory: {0}")]
    IsADirectory(String),

    /// Seek target outside the representable range
    #[error("Invalid seek on {path}: {reason}")]
    InvalidSeek {
        /// Path of the handle being seeked
        path: String,
        /// Why the target was rejected
        reason: String,
    },

    /// Embedded compressed payload failed to decompress
    #[error("Corrupt artifact at {path}: {reason}")]
    CorruptArtifact {
        /// Path of the damaged entry
        path: String,
        /// What went wrong while decoding
        reason: String,
    },

    /// The input root could not be read
    #[error("Cannot read input root {path:?}: {source}")]
    RootUnreadable {
        /// Root that was requested
        path: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The output destination could not be created or written
    #[error("Cannot write output {path:?}: {source}")]
    Output {
        /// Output destination
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Identifier allocation could not produce a unique name
    #[error("Unresolvable name collision for {0}")]
    NameCollision(String),

    /// Bundle bytes do not carry a recognised header
    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Ignore pattern failed to compile
    #[error("Invalid ignore pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<bincode::error::DecodeError> for EmbedError {
    fn from(err: bincode::error::DecodeError) -> Self {
        EmbedError::Bincode(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for EmbedError {
    fn from(err: bincode::error::EncodeError) -> Self {
        EmbedError::Bincode(err.to_string())
    }
}

impl From<EmbedError> for io::Error {
    fn from(err: EmbedError) -> Self {
        let kind = match &err {
            EmbedError::Io(inner) => inner.kind(),
            EmbedError::NotFound(_) => io::ErrorKind::NotFound,
            EmbedError::InvalidSeek { .. } => io::ErrorKind::InvalidInput,
            EmbedError::CorruptArtifact { .. } => io::ErrorKind::InvalidData,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

impl EmbedError {
    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        EmbedError::Internal(msg.into())
    }

    /// Create a configuration error with a custom message
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        EmbedError::InvalidConfiguration(msg.into())
    }

    /// Create a seek error for `path`
    pub fn invalid_seek(path: impl Into<String>, reason: impl Into<String>) -> Self {
        EmbedError::InvalidSeek {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a corruption error for `path`
    pub fn corrupt(path: impl Into<String>, reason: impl Into<String>) -> Self {
        EmbedError::CorruptArtifact {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Recover the `EmbedError` carried inside an `io::Error` produced by a
    /// runtime handle, if there is one.
    pub fn from_io(err: &io::Error) -> Option<&EmbedError> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<EmbedError>())
    }

    /// Check if this error indicates a damaged artifact.
    ///
    /// Artifacts produced by this crate's compiler never trigger this; seeing
    /// it means the embedded data was altered after compilation.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            EmbedError::CorruptArtifact { .. } | EmbedError::InvalidBundle(_) | EmbedError::Bincode(_)
        )
    }

    /// Check if this error means the requested path does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            EmbedError::NotFound(_) => true,
            EmbedError::Io(err) => err.kind() == io::ErrorKind::NotFound,
            EmbedError::RootUnreadable { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
