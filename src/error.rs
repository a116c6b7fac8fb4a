//! Error types for the disk cache
//!
//! Provides unified error handling using thiserror.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache operations.
///
/// A read that finds no entry is not an error on its own; it only becomes
/// [`CacheError::NoProducer`] when the caller gave no way to fill the entry.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Entry is missing and no producer was supplied
    #[error("No cached entry at {} and no producer supplied", .path.display())]
    NoProducer { path: PathBuf },

    /// Underlying filesystem failure
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Compression or decompression failed
    #[error("Codec error: {0}")]
    Codec(String),

    /// A fallible producer failed to compute the value
    #[error("Producer failed: {0}")]
    Producer(#[source] anyhow::Error),
}

impl CacheError {
    /// Wraps an I/O failure together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the native error kind for [`CacheError::Io`], `None` otherwise.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            CacheError::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
