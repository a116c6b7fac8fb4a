//! Cache Store Module
//!
//! Fill-on-miss disk cache combining the key mapper, the storage service and
//! the codec strategy.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error};

use crate::cache::{
    Codec, FsStorage, GzipCodec, IdentityCodec, KeyMapper, StatsSnapshot, Storage, StoreStats,
};
use crate::config::StoreConfig;
use crate::diagnostics::DiagnosticSink;
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_write_back, WriteBackTracker};

// == Cache Store ==
/// Content-addressed disk cache.
///
/// Cloning is cheap and every clone shares the same configuration, counters
/// and pending write-backs.
///
/// No locking is done between calls. Two concurrent misses on the same key
/// both run their producer and both write; whichever write lands last wins.
/// Callers needing single-flight must deduplicate above this layer.
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    /// Key to path mapping under the configured root
    mapper: KeyMapper,
    /// Filesystem primitives
    storage: Arc<dyn Storage>,
    /// Transform between produced bytes and stored bytes
    codec: Arc<dyn Codec>,
    /// Receives write failure messages
    debug: DiagnosticSink,
    /// Hit, miss and write counters
    stats: StoreStats,
    /// Fill-path writes still in flight
    write_backs: WriteBackTracker,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a filesystem-backed store from `config`.
    ///
    /// The codec is fixed here: gzip when `config.compress` is set, identity
    /// otherwise.
    ///
    /// # Arguments
    /// * `config` - Root directory, compression flag and diagnostic sink
    pub fn new(config: StoreConfig) -> Self {
        CacheStoreBuilder::from_config(config).build()
    }

    // == Builder ==
    /// Starts a builder with the default configuration, for injecting a
    /// custom [`Storage`] or [`Codec`].
    pub fn builder() -> CacheStoreBuilder {
        CacheStoreBuilder::default()
    }

    // == Locate ==
    /// Path the entry for `key` lives at, whether or not it exists yet.
    ///
    /// # Arguments
    /// * `key` - Any byte sequence; never inspected beyond hashing
    pub fn locate(&self, key: impl AsRef<[u8]>) -> PathBuf {
        self.inner.mapper.locate(key)
    }

    /// Root directory holding the shard directories.
    pub fn root(&self) -> &Path {
        self.inner.mapper.root()
    }

    /// Whether stored bytes pass through a non-identity codec.
    pub fn is_compressed(&self) -> bool {
        self.inner.codec.name() != IdentityCodec.name()
    }

    // == Stats ==
    /// Returns a snapshot of the counters shared by all clones.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Sink used for failures nobody awaits.
    pub(crate) fn diagnostics(&self) -> &DiagnosticSink {
        &self.inner.debug
    }

    // == Get ==
    /// Returns the cached value for `key`.
    ///
    /// A miss fails with [`CacheError::NoProducer`]; use
    /// [`get_or_fill`](Self::get_or_fill) when the value may be absent.
    pub async fn get(&self, key: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let path = self.locate(key);
        match self.lookup(&path).await? {
            Some(data) => Ok(data),
            None => Err(CacheError::NoProducer { path }),
        }
    }

    /// Returns the cached value for `key`, computing it with `producer` on a miss.
    ///
    /// `producer` runs at most once, and only when no entry exists. Its output
    /// is returned straight away while a detached task persists it; the
    /// outcome of that write never affects this call.
    pub async fn get_or_fill<F, Fut>(&self, key: impl AsRef<[u8]>, producer: F) -> Result<Vec<u8>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<u8>>,
    {
        let key = key.as_ref();
        let path = self.locate(key);
        if let Some(data) = self.lookup(&path).await? {
            return Ok(data);
        }

        self.inner.stats.record_fill();
        debug!("invoking producer for {}", path.display());
        let data = producer().await;
        self.write_back(key, &data);
        Ok(data)
    }

    /// Like [`get_or_fill`](Self::get_or_fill) with a producer that can fail.
    ///
    /// A failed producer fails the call with [`CacheError::Producer`] and
    /// nothing is written.
    pub async fn try_get_or_fill<F, Fut>(
        &self,
        key: impl AsRef<[u8]>,
        producer: F,
    ) -> Result<Vec<u8>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Vec<u8>>>,
    {
        let key = key.as_ref();
        let path = self.locate(key);
        if let Some(data) = self.lookup(&path).await? {
            return Ok(data);
        }

        self.inner.stats.record_fill();
        debug!("invoking fallible producer for {}", path.display());
        let data = producer().await.map_err(CacheError::Producer)?;
        self.write_back(key, &data);
        Ok(data)
    }

    /// Reads and decodes the entry at `path`. `Ok(None)` means a miss.
    async fn lookup(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match self.inner.storage.read(path).await {
            Ok(raw) => {
                self.inner.stats.record_hit();
                debug!("cache hit at {}", path.display());
                self.inner.codec.decompress(raw).await.map(Some)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.inner.stats.record_miss();
                debug!("cache miss at {}", path.display());
                Ok(None)
            }
            Err(e) => {
                error!("cache read at {} failed: {}", path.display(), e);
                Err(CacheError::io(path, e))
            }
        }
    }

    fn write_back(&self, key: &[u8], data: &[u8]) {
        let handle = spawn_write_back(self.clone(), key.to_vec(), data.to_vec());
        self.inner.write_backs.track(handle);
    }

    // == Write ==
    /// Stores `data` under `key`, replacing any previous entry.
    ///
    /// The shard directory is created if needed. A codec failure aborts the
    /// write before anything touches disk. I/O failures are also reported to
    /// the diagnostic sink.
    pub async fn write(&self, key: impl AsRef<[u8]>, data: impl Into<Vec<u8>>) -> Result<()> {
        let path = self.locate(key);

        let payload = match self.inner.codec.compress(data.into()).await {
            Ok(payload) => payload,
            Err(e) => {
                self.inner.stats.record_write_failure();
                return Err(e);
            }
        };

        if let Err(e) = self.persist(&path, &payload).await {
            self.inner.stats.record_write_failure();
            self.inner.debug.emit(&format!("Cache write error: {e}"));
            return Err(e);
        }

        self.inner.stats.record_write();
        debug!("wrote {} bytes to {}", payload.len(), path.display());
        Ok(())
    }

    async fn persist(&self, path: &Path, payload: &[u8]) -> Result<()> {
        if let Some(shard) = path.parent() {
            self.inner
                .storage
                .create_dir_all(shard)
                .await
                .map_err(|e| CacheError::io(shard, e))?;
        }

        self.inner
            .storage
            .write(path, payload)
            .await
            .map_err(|e| CacheError::io(path, e))
    }

    // == Delete ==
    /// Removes the entry for `key`. Deleting an absent entry succeeds.
    pub async fn delete(&self, key: impl AsRef<[u8]>) -> Result<()> {
        let path = self.locate(key);

        let exists = self
            .inner
            .storage
            .exists(&path)
            .await
            .map_err(|e| CacheError::io(&path, e))?;

        if exists {
            match self.inner.storage.remove(&path).await {
                Ok(()) => debug!("deleted {}", path.display()),
                // lost a race with another delete
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    error!("cache delete at {} failed: {}", path.display(), e);
                    return Err(CacheError::io(&path, e));
                }
            }
        }

        self.inner.stats.record_delete();
        Ok(())
    }

    // == Flush ==
    /// Waits for every write-back started so far by this store or its clones.
    pub async fn flush(&self) {
        self.inner.write_backs.wait_all().await;
    }

    pub fn pending_write_backs(&self) -> usize {
        self.inner.write_backs.pending()
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("root", &self.root())
            .field("codec", &self.inner.codec.name())
            .field("debug", &self.inner.debug)
            .finish()
    }
}

// == Builder ==
/// Assembles a [`CacheStore`] with an injected storage service or codec.
#[derive(Default)]
pub struct CacheStoreBuilder {
    /// Root, compression flag and sink
    config: StoreConfig,
    /// Injected storage, `FsStorage` when unset
    storage: Option<Arc<dyn Storage>>,
    /// Injected codec, derived from `config.compress` when unset
    codec: Option<Arc<dyn Codec>>,
}

impl CacheStoreBuilder {
    /// Creates a builder seeded with `config`.
    ///
    /// # Arguments
    /// * `config` - Starting configuration; later setters override its fields
    pub fn from_config(config: StoreConfig) -> Self {
        Self {
            config,
            storage: None,
            codec: None,
        }
    }

    /// Sets the directory entries are stored under.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.root = root.into();
        self
    }

    /// Enables gzip for stored entries. Ignored when a codec is injected.
    pub fn compress(mut self, compress: bool) -> Self {
        self.config.compress = compress;
        self
    }

    /// Sets the callback receiving human-readable diagnostics.
    ///
    /// # Arguments
    /// * `sink` - Called from any in-flight operation; must not block
    pub fn debug<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.config.debug = DiagnosticSink::new(sink);
        self
    }

    /// Replaces the default filesystem storage.
    pub fn storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Overrides the codec implied by `compress`.
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    /// Fixes the configuration and creates the store.
    pub fn build(self) -> CacheStore {
        let storage = self.storage.unwrap_or_else(|| Arc::new(FsStorage::new()));
        let codec = self.codec.unwrap_or_else(|| {
            if self.config.compress {
                Arc::new(GzipCodec::new())
            } else {
                Arc::new(IdentityCodec)
            }
        });

        debug!(
            "cache store at {} using {} codec",
            self.config.root.display(),
            codec.name()
        );

        CacheStore {
            inner: Arc::new(StoreInner {
                mapper: KeyMapper::new(self.config.root),
                storage,
                codec,
                debug: self.config.debug,
                stats: StoreStats::new(),
                write_backs: WriteBackTracker::new(),
            }),
        }
    }
}
