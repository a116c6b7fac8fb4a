//! Storage Module
//!
//! The filesystem primitives the store is built on, behind a swappable trait.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

/// Raw I/O service used by [`CacheStore`](crate::cache::CacheStore).
///
/// A missing path is reported as `io::ErrorKind::NotFound`; the store relies on
/// that to tell a miss apart from a hard failure.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Reads the whole file at `path`.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replaces the file at `path` with `data`.
    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Creates `path` and its parents. Must succeed if the directory already
    /// exists or appears concurrently.
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Returns `Ok(false)` when nothing exists at `path`.
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Unlinks the file at `path`.
    async fn remove(&self, path: &Path) -> io::Result<()>;
}

// == Filesystem Storage ==
/// [`Storage`] backed by `tokio::fs`.
///
/// Writes go to a uniquely named sibling first and are renamed into place, so
/// a concurrent reader sees either the old or the new entry, never a torn one.
///
/// A crash between the write and the rename leaves a `<digest>.tmp.<uuid>`
/// file in the shard directory. Nothing reads or removes it; clearing stale
/// temp files is left to whoever manages the cache root.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    /// Creates the filesystem storage. It holds no state.
    pub fn new() -> Self {
        Self
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".tmp.{}", uuid::Uuid::new_v4().simple()));
    path.with_file_name(name)
}

#[async_trait]
impl Storage for FsStorage {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let tmp = temp_path_for(path);
        if let Err(e) = fs::write(&tmp, data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        // std's create_dir_all already tolerates a concurrent creator
        fs::create_dir_all(path).await
    }

    async fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }
}
