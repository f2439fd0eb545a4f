//! Tile acquisition: memory cache, disk cache, then the network.

use image::DynamicImage;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::background::queue::BoundedQueue;
use crate::core::config::TileRepoConfig;
use crate::core::zoom::ZoomLevel;
use crate::net::api::{ApiService, FetchError};
use crate::repo::token_cache::AccessTokenCache;
use crate::tiles::cache::TileCache;
use crate::tiles::disk::FileCache;
use crate::tiles::request::{CacheKey, TileRequest};
use crate::tiles::wmts::{find_closest_matrix, ClosestMatrix, WmtsLayerConfig};

/// Called once the requested tile sits in the memory cache
pub type OnCached = Box<dyn FnOnce(&TileRequest, Arc<DynamicImage>) + Send + 'static>;

/// A request waiting for a fetch worker
pub struct PendingFetch {
    pub request: TileRequest,
    on_cached: OnCached,
}

impl fmt::Debug for PendingFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFetch")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

struct Shared {
    memory: TileCache<CacheKey, Arc<DynamicImage>>,
    files: Arc<dyn FileCache>,
    api: Arc<dyn ApiService>,
    tokens: AccessTokenCache,
    queue: BoundedQueue<PendingFetch>,
}

/// Serves tiles from cache and fetches missing ones in the background.
///
/// Pending fetches are taken newest first. When the queue is full the
/// oldest pending fetch is dropped without calling its continuation.
pub struct TileRepo {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl TileRepo {
    /// Spawns the fetch workers. Must be called from within a Tokio runtime.
    pub fn new(
        config: &TileRepoConfig,
        tokens: AccessTokenCache,
        api: Arc<dyn ApiService>,
        files: Arc<dyn FileCache>,
    ) -> Self {
        let shared = Arc::new(Shared {
            memory: TileCache::new(config.memory_cache_bytes),
            files,
            api,
            tokens,
            queue: BoundedQueue::lifo(config.queue_capacity),
        });

        let workers = (0..config.max_in_flight_requests.max(1))
            .map(|id| tokio::spawn(Arc::clone(&shared).run_worker(id)))
            .collect();

        log::debug!(
            "tile repo started with {} workers, {} byte memory cache",
            config.max_in_flight_requests.max(1),
            config.memory_cache_bytes
        );

        Self { shared, workers }
    }

    /// Cached tile, if any. Never touches the network.
    ///
    /// A tile found only on disk is decoded and promoted to the memory cache.
    pub fn get_cached(&self, request: &TileRequest) -> Option<Arc<DynamicImage>> {
        let key = request.cache_key();
        if let Some(image) = self.shared.memory.get(&key) {
            return Some(image);
        }

        let bytes = self.shared.files.read(&key.file_name())?;
        match image::load_from_memory(&bytes) {
            Ok(image) => {
                let image = Arc::new(image);
                self.shared.memory.put(key, Arc::clone(&image));
                Some(image)
            }
            Err(e) => {
                log::warn!("discarding undecodable disk entry {}: {}", key.file_name(), e);
                None
            }
        }
    }

    /// Queues `request` for fetching; `on_cached` runs once it is cached.
    ///
    /// Requests are not deduplicated. A failed fetch is logged and dropped
    /// without calling `on_cached`.
    pub fn request_caching<F>(&self, request: TileRequest, on_cached: F)
    where
        F: FnOnce(&TileRequest, Arc<DynamicImage>) + Send + 'static,
    {
        let pending = PendingFetch {
            request,
            on_cached: Box::new(on_cached),
        };
        if let Some(dropped) = self.shared.queue.push(pending) {
            log::debug!("tile queue full, dropped {:?}", dropped.request);
        }
    }

    /// The layer matrix closest to `zoom`
    pub fn find_closest_matrix<'a>(
        &self,
        layer: &'a WmtsLayerConfig,
        zoom: ZoomLevel,
    ) -> Option<ClosestMatrix<'a>> {
        find_closest_matrix(layer, zoom)
    }

    /// Requests not yet picked up by a worker
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn memory_cache(&self) -> &TileCache<CacheKey, Arc<DynamicImage>> {
        &self.shared.memory
    }

    pub fn access_tokens(&self) -> &AccessTokenCache {
        &self.shared.tokens
    }
}

impl Drop for TileRepo {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

impl fmt::Debug for TileRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileRepo")
            .field("workers", &self.workers.len())
            .field("pending", &self.shared.queue.len())
            .field("cached_tiles", &self.shared.memory.len())
            .finish()
    }
}

impl Shared {
    async fn run_worker(self: Arc<Self>, id: usize) {
        loop {
            let pending = self.queue.pop().await;
            let request = pending.request.clone();
            if let Err(e) = self.fetch(pending).await {
                log::warn!("worker {} failed to fetch {:?}: {}", id, request, e);
            }
        }
    }

    async fn fetch(&self, pending: PendingFetch) -> Result<(), FetchError> {
        let PendingFetch { request, on_cached } = pending;
        let key = request.cache_key();

        // An earlier duplicate may have landed while this one waited
        if let Some(image) = self.memory.get(&key) {
            on_cached(&request, image);
            return Ok(());
        }

        let token = self.tokens.get().await?;
        let bytes = match self.api.get_tile(&token, &request).await {
            Err(FetchError::Unauthorized) => {
                self.tokens.invalidate(&token);
                return Err(FetchError::Unauthorized);
            }
            other => other?,
        };

        let (bytes, decoded) = tokio::task::spawn_blocking(move || {
            let decoded = image::load_from_memory(&bytes);
            (bytes, decoded)
        })
        .await
        .map_err(|e| FetchError::Decode(e.to_string()))?;
        let image = Arc::new(decoded.map_err(|e| FetchError::Decode(e.to_string()))?);

        self.memory.put(key, Arc::clone(&image));
        self.files.write_later(key.file_name(), bytes);
        on_cached(&request, image);
        Ok(())
    }
}
