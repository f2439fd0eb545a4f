//! Disk tier of the tile cache.
//!
//! Entries are raw, still-encoded tile bytes stored under their
//! `tile-<key>` name. Reads are synchronous; writes are handed off and never
//! reported back to the caller.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;

use crate::prelude::HashMap;
use crate::Result;

/// Key/value byte store the tile repo persists tiles into
pub trait FileCache: Send + Sync {
    /// Bytes stored under `key`, if any
    fn read(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `bytes` under `key` at some later point. Failures are only logged.
    fn write_later(&self, key: String, bytes: Vec<u8>);
}

#[derive(Debug, Default)]
struct PendingWrites {
    count: AtomicUsize,
    idle: Notify,
}

/// Counts a write as pending until dropped, even if the task is cancelled
struct WriteGuard(Arc<PendingWrites>);

impl WriteGuard {
    fn new(pending: &Arc<PendingWrites>) -> Self {
        pending.count.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(pending))
    }
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// One file per entry inside a directory
#[derive(Debug, Clone)]
pub struct DirFileCache {
    directory: PathBuf,
    pending: Arc<PendingWrites>,
}

impl DirFileCache {
    /// Opens (and creates if needed) a cache rooted at `directory`
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            pending: Arc::default(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Writes handed to `write_later` that have not finished yet
    pub fn pending_writes(&self) -> usize {
        self.pending.count.load(Ordering::SeqCst)
    }

    /// Waits until every write handed to `write_later` so far has finished.
    ///
    /// Call before shutting the runtime down; the blocking pool drops
    /// writes that have not started by then.
    pub async fn flush(&self) {
        loop {
            let idle = self.pending.idle.notified();
            if self.pending_writes() == 0 {
                return;
            }
            idle.await;
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(key)
    }

    /// Writes through a temporary file so readers never see a partial entry
    fn write_now(directory: &Path, key: &str, bytes: &[u8]) -> std::io::Result<()> {
        let final_path = directory.join(key);
        let tmp_path = directory.join(format!(".{}.tmp", key));

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &final_path)
    }
}

impl FileCache for DirFileCache {
    fn read(&self, key: &str) -> Option<Vec<u8>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                log::warn!("failed to read {} from disk cache: {}", key, e);
                None
            }
        }
    }

    fn write_later(&self, key: String, bytes: Vec<u8>) {
        let directory = self.directory.clone();
        let guard = WriteGuard::new(&self.pending);
        let write = move || {
            let _guard = guard;
            if let Err(e) = Self::write_now(&directory, &key, &bytes) {
                log::warn!("failed to write {} to disk cache: {}", key, e);
            } else {
                log::debug!("stored {} ({} bytes) in disk cache", key, bytes.len());
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(write);
            }
            Err(_) => write(),
        }
    }
}

/// In-memory stand-in for [`DirFileCache`]; writes land immediately
#[derive(Debug, Default)]
pub struct MemoryFileCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryFileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl FileCache for MemoryFileCache {
    fn read(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn write_later(&self, key: String, bytes: Vec<u8>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, bytes);
    }
}
