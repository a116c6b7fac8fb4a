//! Codec Module
//!
//! Transparent transforms applied between produced bytes and on-disk bytes.

use std::io::{Read, Write};

use async_trait::async_trait;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{CacheError, Result};

/// Two-way byte transform applied on write (`compress`) and on hit (`decompress`).
#[async_trait]
pub trait Codec: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    async fn compress(&self, data: Vec<u8>) -> Result<Vec<u8>>;

    async fn decompress(&self, data: Vec<u8>) -> Result<Vec<u8>>;
}

// == Identity Codec ==
/// Stores bytes exactly as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

#[async_trait]
impl Codec for IdentityCodec {
    fn name(&self) -> &'static str {
        "identity"
    }

    async fn compress(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        Ok(data)
    }

    async fn decompress(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        Ok(data)
    }
}

// == Gzip Codec ==
/// Gzip via flate2. Work runs on the blocking pool so large entries don't
/// stall the runtime.
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    level: Compression,
}

impl GzipCodec {
    pub fn new() -> Self {
        Self {
            level: Compression::default(),
        }
    }

    /// Compression level 0-9.
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn gzip(data: &[u8], level: Compression) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 32), level);
    encoder.write_all(data)?;
    encoder.finish()
}

/// Every byte must belong to a gzip member; trailing garbage is an error.
fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 2);
    MultiGzDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

async fn run_blocking<F>(op: &'static str, f: F) -> Result<Vec<u8>>
where
    F: FnOnce() -> std::io::Result<Vec<u8>> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CacheError::Codec(format!("{op} task failed: {e}")))?
        .map_err(|e| CacheError::Codec(format!("{op} failed: {e}")))
}

#[async_trait]
impl Codec for GzipCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }

    async fn compress(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let level = self.level;
        run_blocking("gzip compress", move || gzip(&data, level)).await
    }

    async fn decompress(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        run_blocking("gzip decompress", move || gunzip(&data)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identity_passthrough() {
        let codec = IdentityCodec;
        let data = b"unchanged".to_vec();
        assert_eq!(codec.compress(data.clone()).await.unwrap(), data);
        assert_eq!(codec.decompress(data.clone()).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_gzip_changes_bytes_and_restores_them() {
        let codec = GzipCodec::new();
        let data = "compressible ".repeat(200).into_bytes();

        let packed = codec.compress(data.clone()).await.unwrap();
        assert_ne!(packed, data);
        assert!(packed.len() < data.len());
        // gzip magic
        assert_eq!(&packed[..2], &[0x1f, 0x8b]);

        assert_eq!(codec.decompress(packed).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_gzip_empty_input() {
        let codec = GzipCodec::with_level(9);
        let packed = codec.compress(Vec::new()).await.unwrap();
        assert!(codec.decompress(packed).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gzip_rejects_trailing_garbage() {
        let codec = GzipCodec::new();
        let mut packed = codec.compress(b"hello".to_vec()).await.unwrap();
        packed.extend_from_slice(b"GARBAGE-NOT-GZIP");

        let err = codec.decompress(packed).await.unwrap_err();
        assert!(matches!(err, CacheError::Codec(_)));
    }

    #[tokio::test]
    async fn test_gzip_rejects_plain_bytes() {
        let codec = GzipCodec::new();
        let err = codec
            .decompress(b"definitely not gzip".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Codec(_)));
    }
}
