//! Write-Back Task
//!
//! Detached task persisting a freshly produced value after a cache miss.

use std::sync::Mutex;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::CacheStore;
use crate::error::CacheError;

/// Spawns a detached task that writes `data` under `key`.
///
/// The caller of `get` already holds the value, so the outcome of this task is
/// never returned to anyone. Failures go to the store's diagnostic sink and to
/// `tracing`. I/O failures are already reported by `write` itself, so only
/// other failures are reported here.
///
/// # Returns
/// A JoinHandle for the spawned task. Dropping it does not cancel the write.
pub fn spawn_write_back(store: CacheStore, key: Vec<u8>, data: Vec<u8>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let path = store.locate(&key);
        match store.write(&key, data).await {
            Ok(()) => debug!("write-back stored {}", path.display()),
            Err(e) => {
                warn!("write-back to {} failed: {}", path.display(), e);
                if !matches!(e, CacheError::Io { .. }) {
                    store
                        .diagnostics()
                        .emit(&format!("Cache write-back error: {e}"));
                }
            }
        }
    })
}

// == Write-Back Tracker ==
/// Remembers write-backs still in flight so they can be awaited.
#[derive(Debug, Default)]
pub struct WriteBackTracker {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WriteBackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a spawned write-back, pruning ones that already finished.
    pub fn track(&self, handle: JoinHandle<()>) {
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Number of write-backs not yet finished.
    pub fn pending(&self) -> usize {
        let handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Waits for every write-back tracked so far.
    pub async fn wait_all(&self) {
        let drained: Vec<JoinHandle<()>> = {
            let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *handles)
        };

        for handle in drained {
            if let Err(e) = handle.await {
                warn!("write-back task did not complete: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn test_write_back_persists_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(StoreConfig::new(dir.path()));

        let handle = spawn_write_back(store.clone(), b"key".to_vec(), b"value".to_vec());
        handle.await.unwrap();

        assert_eq!(store.get("key").await.unwrap(), b"value");
    }

    #[tokio::test]
    async fn test_tracker_waits_for_all() {
        let tracker = WriteBackTracker::new();
        for ms in [30u64, 10, 20] {
            tracker.track(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }));
        }
        assert_eq!(tracker.pending(), 3);

        tracker.wait_all().await;
        assert_eq!(tracker.pending(), 0);
    }

    #[tokio::test]
    async fn test_tracker_prunes_finished() {
        let tracker = WriteBackTracker::new();
        let done = tokio::spawn(async {});
        tokio::time::sleep(Duration::from_millis(10)).await;
        tracker.track(done);
        tracker.track(tokio::spawn(async {}));

        tracker.wait_all().await;
        assert_eq!(tracker.pending(), 0);
    }
}
