use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use trailmap::prelude::*;
use trailmap::tiles::wmts::TileMatrixLimits;

/// Prefetch a window of tiles into the disk cache
#[derive(Debug, Parser)]
#[command(name = "trailmap-app", version, about)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON description of the WMTS layer to fetch from
    #[arg(short, long)]
    layer: PathBuf,

    /// Renewal token of the logged-in user
    #[arg(long, env = "TRAILMAP_RENEWAL_TOKEN")]
    renewal_token: String,

    /// Target resolution; the closest matrix of the layer is used
    #[arg(long, default_value_t = 10.0)]
    meters_per_pixel: f64,

    #[arg(long)]
    min_row: i32,
    #[arg(long)]
    max_row: i32,
    #[arg(long)]
    min_col: i32,
    #[arg(long)]
    max_col: i32,

    /// Seconds to wait for outstanding fetches
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TrailmapConfig::from_json_file(path)?,
        None => TrailmapConfig::default(),
    };
    config.validate()?;

    let layer: WmtsLayerConfig = serde_json::from_str(&std::fs::read_to_string(&args.layer)?)?;

    let cache_dir = config
        .disk_cache_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("tile-cache"));
    let files = Arc::new(DirFileCache::open(&cache_dir)?);
    let api = Arc::new(HttpApiService::new(&config.api)?);
    let session = Arc::new(MemorySessionStore::logged_in(RenewalToken::new(
        args.renewal_token.clone(),
    )));

    let repo = Repo::new(&config, api, session, files.clone()).await?;
    let tiles = repo.tile_repo();

    let zoom = ZoomLevel::new(args.meters_per_pixel);
    let closest = tiles
        .find_closest_matrix(&layer, zoom)
        .ok_or("layer has no tile matrices")?;
    log::info!(
        "using matrix {} at {} m/px for target {} m/px",
        closest.matrix.identifier,
        closest.matched,
        closest.target
    );

    let window = TileMatrixLimits {
        min_row: args.min_row,
        max_row: args.max_row,
        min_col: args.min_col,
        max_col: args.max_col,
    };
    let served = layer.limits_for(&closest.matrix.identifier);

    let template = TileRequest::new(
        layer.service_identifier.clone(),
        layer.identifier.clone(),
        layer.set.identifier.clone(),
        closest.matrix.identifier.clone(),
        TilePosition::new(0, 0),
    );

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let mut already_cached = 0usize;
    let mut requested = 0usize;

    for row in window.min_row..=window.max_row {
        for col in window.min_col..=window.max_col {
            if served.map_or(false, |limits| !limits.contains(row, col)) {
                continue;
            }

            let request = template.at(TilePosition::new(row, col));
            if tiles.get_cached(&request).is_some() {
                already_cached += 1;
                continue;
            }

            let done = done_tx.clone();
            tiles.request_caching(request, move |request, _| {
                let _ = done.send(request.position);
            });
            requested += 1;
        }
    }
    drop(done_tx);

    // The channel closes once every continuation has run or been dropped
    let mut fetched = 0usize;
    let wait = async {
        while let Some(position) = done_rx.recv().await {
            log::debug!("cached tile {:?}", position);
            fetched += 1;
        }
    };
    if tokio::time::timeout(Duration::from_secs(args.timeout_secs), wait)
        .await
        .is_err()
    {
        log::warn!("gave up waiting for outstanding tiles");
    }

    // Stop the workers, then let their disk writes land before the runtime goes
    drop(repo);
    files.flush().await;

    println!(
        "{} already cached, {} of {} fetched into {}",
        already_cached,
        fetched,
        requested,
        cache_dir.display()
    );
    Ok(())
}
