//! Key Mapper Module
//!
//! Maps arbitrary cache keys to sharded file locations.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

// == Key Mapper ==
/// Converts cache keys into storage locations under a fixed root.
///
/// Layout: `<root>/<digest[0]>/<digest>` where `digest` is the lowercase hex
/// SHA-256 of the key bytes. The single leading hex character caps fan-out at
/// 16 shard directories.
#[derive(Debug, Clone)]
pub struct KeyMapper {
    /// Directory the shard directories live under
    root: PathBuf,
}

impl KeyMapper {
    // == Constructor ==
    /// Creates a mapper rooted at `root`.
    ///
    /// # Arguments
    /// * `root` - Cache root; fixed for the mapper's lifetime
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the cache root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lowercase hex digest of the raw key bytes.
    pub fn digest(key: impl AsRef<[u8]>) -> String {
        hex::encode(Sha256::digest(key.as_ref()))
    }

    // == Locate ==
    /// Returns the entry path for `key`. Never fails.
    pub fn locate(&self, key: impl AsRef<[u8]>) -> PathBuf {
        let digest = Self::digest(key);
        self.root.join(&digest[..1]).join(digest)
    }
}
