//! Cache Module
//!
//! Content-addressed disk caching with fill-on-miss and optional compression.

mod codec;
mod key;
mod stats;
mod storage;
mod store;


// Re-export public types
pub use codec::{Codec, GzipCodec, IdentityCodec};
pub use key::KeyMapper;
pub use stats::{StatsSnapshot, StoreStats};
pub use storage::{FsStorage, Storage};
pub use store::{CacheStore, CacheStoreBuilder};
