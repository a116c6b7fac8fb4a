//! Disk Cache - A content-addressed on-disk cache
//!
//! Maps arbitrary keys to sharded files, serves stored values, and computes
//! and persists missing ones through a caller-supplied producer.

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod tasks;

pub use cache::{
    CacheStore, CacheStoreBuilder, Codec, FsStorage, GzipCodec, IdentityCodec, KeyMapper, Storage,
};
pub use config::StoreConfig;
pub use diagnostics::DiagnosticSink;
pub use error::{CacheError, Result};
