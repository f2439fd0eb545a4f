use async_trait::async_trait;
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, Semaphore};

use trailmap::core::config::{TileRepoConfig, TrailmapConfig};
use trailmap::net::auth::AuthInfo;
use trailmap::prelude::*;
use trailmap::MapError;

fn png_tile(color: [u8; 4]) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba(color)));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();
    bytes
}

fn request(row: i32, col: i32) -> TileRequest {
    TileRequest::new("topo", "summer", "3857", "12", TilePosition::new(row, col))
}

#[derive(Default)]
struct MockApi {
    tile: Vec<u8>,
    fail_with: Option<FetchError>,
    reject_first_tile: AtomicBool,
    renewals: AtomicUsize,
    tile_calls: AtomicUsize,
    deleted: Mutex<Vec<RenewalToken>>,
}

impl MockApi {
    fn serving(tile: Vec<u8>) -> Self {
        Self {
            tile,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ApiService for MockApi {
    async fn renew_session(
        &self,
        renewal_token: &RenewalToken,
    ) -> std::result::Result<AuthInfo, RenewalError> {
        assert!(renewal_token.as_str().starts_with("ren-"));
        let n = self.renewals.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AuthInfo {
            access_token: AccessToken::new(format!("acc-{}", n)),
            renewal_token: RenewalToken::new(format!("ren-{}", n)),
        })
    }

    async fn delete_session(
        &self,
        renewal_token: &RenewalToken,
    ) -> std::result::Result<(), FetchError> {
        self.deleted.lock().unwrap().push(renewal_token.clone());
        Ok(())
    }

    async fn get_tile(
        &self,
        access_token: &AccessToken,
        _request: &TileRequest,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        assert!(access_token.as_str().starts_with("acc-"));
        self.tile_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_first_tile.swap(false, Ordering::SeqCst) {
            return Err(FetchError::Unauthorized);
        }
        match &self.fail_with {
            Some(error) => Err(error.clone()),
            None => Ok(self.tile.clone()),
        }
    }
}

/// Holds every tile fetch until the test hands out a permit
struct GatedApi {
    tile: Vec<u8>,
    gate: Semaphore,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    order: Mutex<Vec<TilePosition>>,
}

impl GatedApi {
    fn new() -> Self {
        Self {
            tile: png_tile([9, 9, 9, 255]),
            gate: Semaphore::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            order: Mutex::new(Vec::new()),
        }
    }

    async fn wait_for_in_flight(&self, n: usize) {
        for _ in 0..1000 {
            if self.in_flight.load(Ordering::SeqCst) >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("never reached {} concurrent fetches", n);
    }
}

#[async_trait]
impl ApiService for GatedApi {
    async fn renew_session(
        &self,
        _renewal_token: &RenewalToken,
    ) -> std::result::Result<AuthInfo, RenewalError> {
        Err(RenewalError::Network("not used".to_string()))
    }

    async fn delete_session(
        &self,
        _renewal_token: &RenewalToken,
    ) -> std::result::Result<(), FetchError> {
        Ok(())
    }

    async fn get_tile(
        &self,
        _access_token: &AccessToken,
        request: &TileRequest,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        self.order.lock().unwrap().push(request.position);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let permit = self.gate.acquire().await.unwrap();
        permit.forget();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.tile.clone())
    }
}

fn gated_tile_repo(api: Arc<GatedApi>, workers: usize, queue_capacity: usize) -> TileRepo {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = TileRepoConfig {
        max_in_flight_requests: workers,
        queue_capacity,
        ..TileRepoConfig::for_testing()
    };
    let tokens = AccessTokenCache::new(
        || async { Ok::<_, RenewalError>(AccessToken::new("acc-1")) },
        None,
    );
    TileRepo::new(&config, tokens, api, Arc::new(MemoryFileCache::new()))
}

/// Queues a request whose receiver resolves to `Ok` once cached, `Err` if dropped
fn queue_tile(tiles: &TileRepo, row: i32, col: i32) -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    tiles.request_caching(request(row, col), move |_, _| {
        let _ = tx.send(());
    });
    rx
}

fn test_config() -> TrailmapConfig {
    TrailmapConfig {
        tiles: TileRepoConfig::for_testing(),
        ..Default::default()
    }
}

async fn logged_in_repo(api: Arc<MockApi>, files: Arc<MemoryFileCache>) -> Repo {
    let _ = env_logger::builder().is_test(true).try_init();
    let session = Arc::new(MemorySessionStore::logged_in(RenewalToken::new("ren-0")));
    Repo::new(&test_config(), api, session, files).await.unwrap()
}

async fn cache_and_wait(
    tiles: &TileRepo,
    request: TileRequest,
) -> Option<Arc<DynamicImage>> {
    let (tx, rx) = oneshot::channel();
    tiles.request_caching(request, move |_, image| {
        let _ = tx.send(image);
    });
    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("continuation neither ran nor was dropped")
        .ok()
}

#[tokio::test]
async fn test_request_caching_populates_both_tiers() {
    let api = Arc::new(MockApi::serving(png_tile([10, 20, 30, 255])));
    let files = Arc::new(MemoryFileCache::new());
    let repo = logged_in_repo(Arc::clone(&api), Arc::clone(&files)).await;
    let tiles = repo.tile_repo();

    assert!(tiles.get_cached(&request(1, 2)).is_none());
    assert_eq!(api.tile_calls.load(Ordering::SeqCst), 0);

    let delivered = cache_and_wait(tiles, request(1, 2)).await.unwrap();
    assert_eq!(delivered.width(), 8);

    let cached = tiles.get_cached(&request(1, 2)).unwrap();
    assert!(Arc::ptr_eq(&cached, &delivered));

    let file_name = request(1, 2).cache_key().file_name();
    for _ in 0..100 {
        if files.read(&file_name).is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(files.read(&file_name), Some(api.tile.clone()));
}

#[tokio::test]
async fn test_continuation_runs_once_per_request() {
    let api = Arc::new(MockApi::serving(png_tile([1, 2, 3, 255])));
    let repo = logged_in_repo(api, Arc::new(MemoryFileCache::new())).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = oneshot::channel();
    let counter = Arc::clone(&calls);
    repo.tile_repo().request_caching(request(3, 3), move |cached, _| {
        assert_eq!(cached, &request(3, 3));
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(());
    });

    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cold_memory_cache_reads_from_disk() {
    let files = Arc::new(MemoryFileCache::new());
    let bytes = png_tile([200, 100, 50, 255]);
    files.write_later(request(7, 9).cache_key().file_name(), bytes.clone());

    let api = Arc::new(MockApi::serving(bytes.clone()));
    let repo = logged_in_repo(Arc::clone(&api), files).await;
    let tiles = repo.tile_repo();

    let from_disk = tiles.get_cached(&request(7, 9)).unwrap();
    let expected = image::load_from_memory(&bytes).unwrap();
    assert_eq!(from_disk.as_bytes(), expected.as_bytes());
    assert_eq!(api.tile_calls.load(Ordering::SeqCst), 0);

    // Promoted to memory: the same image comes back
    assert!(tiles.memory_cache().contains(&request(7, 9).cache_key()));
    assert!(Arc::ptr_eq(&from_disk, &tiles.get_cached(&request(7, 9)).unwrap()));
}

#[tokio::test]
async fn test_failed_fetch_drops_request() {
    let api = Arc::new(MockApi {
        fail_with: Some(FetchError::Status(503)),
        ..Default::default()
    });
    let files = Arc::new(MemoryFileCache::new());
    let repo = logged_in_repo(Arc::clone(&api), Arc::clone(&files)).await;

    assert!(cache_and_wait(repo.tile_repo(), request(0, 0)).await.is_none());
    assert!(repo.tile_repo().get_cached(&request(0, 0)).is_none());
    assert!(files.is_empty());
    assert_eq!(api.tile_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_undecodable_tile_is_not_cached() {
    let api = Arc::new(MockApi::serving(b"not an image".to_vec()));
    let files = Arc::new(MemoryFileCache::new());
    let repo = logged_in_repo(api, Arc::clone(&files)).await;

    assert!(cache_and_wait(repo.tile_repo(), request(0, 1)).await.is_none());
    assert!(repo.tile_repo().memory_cache().is_empty());
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_unauthorized_tile_invalidates_token() {
    let api = Arc::new(MockApi::serving(png_tile([0, 0, 0, 255])));
    api.reject_first_tile.store(true, Ordering::SeqCst);
    let repo = logged_in_repo(Arc::clone(&api), Arc::new(MemoryFileCache::new())).await;

    assert!(cache_and_wait(repo.tile_repo(), request(4, 4)).await.is_none());
    assert!(repo.access_tokens().current().is_none());

    assert!(cache_and_wait(repo.tile_repo(), request(4, 4)).await.is_some());
    assert_eq!(api.renewals.load(Ordering::SeqCst), 2);
    assert_eq!(repo.access_tokens().current(), Some(AccessToken::new("acc-2")));
}

#[tokio::test]
async fn test_repo_requires_login() {
    let result = Repo::new(
        &test_config(),
        Arc::new(MockApi::default()),
        Arc::new(MemorySessionStore::new()),
        Arc::new(MemoryFileCache::new()),
    )
    .await;

    assert!(matches!(
        result,
        Err(MapError::Session(SessionError::NotLoggedIn))
    ));
}

#[tokio::test]
async fn test_renewal_persists_new_renewal_token_and_logout_clears_it() {
    let api = Arc::new(MockApi::serving(png_tile([0, 0, 0, 255])));
    let session = Arc::new(MemorySessionStore::logged_in(RenewalToken::new("ren-0")));
    let repo = Repo::new(
        &test_config(),
        Arc::clone(&api) as Arc<dyn ApiService>,
        Arc::clone(&session) as Arc<dyn SessionStore>,
        Arc::new(MemoryFileCache::new()),
    )
    .await
    .unwrap();

    assert_eq!(repo.access_tokens().get().await.unwrap(), AccessToken::new("acc-1"));
    assert_eq!(
        session.renewal_token().await.unwrap(),
        Some(RenewalToken::new("ren-1"))
    );

    repo.logout().await.unwrap();
    assert_eq!(session.renewal_token().await.unwrap(), None);
    assert_eq!(
        api.deleted.lock().unwrap().as_slice(),
        &[RenewalToken::new("ren-1")]
    );
}

#[tokio::test]
async fn test_closest_matrix_through_repo() {
    let api = Arc::new(MockApi::default());
    let repo = logged_in_repo(api, Arc::new(MemoryFileCache::new())).await;

    let corner = Coordinate::new(-20037508.34, 20037508.34, Crs::WebMercator);
    let matrices = [10.0, 5.0, 1.0]
        .iter()
        .enumerate()
        .map(|(i, r)| {
            WmtsTileMatrixConfig::with_resolution(i.to_string(), MetersPerPixel(*r), corner, 2, 2)
        })
        .collect();
    let layer = WmtsLayerConfig::from_set(
        "topo",
        "summer",
        WmtsTileMatrixSetConfig {
            identifier: "3857".to_string(),
            crs: Crs::WebMercator,
            matrices,
        },
    );

    let closest = repo
        .tile_repo()
        .find_closest_matrix(&layer, ZoomLevel::new(4.0))
        .unwrap();
    assert_eq!(closest.matrix.identifier, "1");
}

#[tokio::test]
async fn test_continuation_runs_after_disk_write_is_issued() {
    let api = Arc::new(MockApi::serving(png_tile([5, 5, 5, 255])));
    let files = Arc::new(MemoryFileCache::new());
    let repo = logged_in_repo(api, Arc::clone(&files)).await;

    let (tx, rx) = oneshot::channel();
    let seen = Arc::clone(&files);
    repo.tile_repo().request_caching(request(6, 6), move |cached, _| {
        let _ = tx.send(seen.read(&cached.cache_key().file_name()).is_some());
    });

    let on_disk = tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .unwrap()
        .unwrap();
    assert!(on_disk);
}

#[tokio::test]
async fn test_fetches_never_exceed_worker_count() {
    let api = Arc::new(GatedApi::new());
    let tiles = gated_tile_repo(Arc::clone(&api), 3, 16);

    let receivers: Vec<_> = (0..10).map(|col| queue_tile(&tiles, 0, col)).collect();
    api.wait_for_in_flight(3).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(api.in_flight.load(Ordering::SeqCst), 3);
    assert_eq!(tiles.pending(), 7);

    api.gate.add_permits(10);
    for rx in receivers {
        tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .unwrap()
            .unwrap();
    }
    assert_eq!(api.peak.load(Ordering::SeqCst), 3);
    assert_eq!(api.order.lock().unwrap().len(), 10);
}

#[tokio::test]
async fn test_newest_request_fetched_first_and_overflow_dropped() {
    let api = Arc::new(GatedApi::new());
    let tiles = gated_tile_repo(Arc::clone(&api), 2, 4);

    // Workers only run once the test yields, so all six land in the queue first
    let mut receivers: Vec<_> = (0..6).map(|col| queue_tile(&tiles, 0, col)).collect();
    assert_eq!(tiles.pending(), 4);

    let kept = receivers.split_off(2);
    for dropped in receivers {
        assert!(dropped.await.is_err());
    }

    api.wait_for_in_flight(2).await;
    api.gate.add_permits(4);
    for rx in kept {
        tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .unwrap()
            .unwrap();
    }

    let order: Vec<_> = api.order.lock().unwrap().iter().map(|p| p.col).collect();
    assert_eq!(order, vec![5, 4, 3, 2]);
    assert!(tiles.get_cached(&request(0, 0)).is_none());
    assert!(tiles.get_cached(&request(0, 1)).is_none());
}
