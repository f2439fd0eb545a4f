//! Configuration for the tile pipeline, the map processor and the remote
//! service.
//!
//! Everything can be built in code through the presets, or loaded from a
//! JSON document in which every field is optional.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::constants::{
    DEFAULT_MEMORY_CACHE_BYTES, DEFAULT_TILE_QUEUE_CAPACITY, EVENT_BUFFER_SIZE,
    MAX_IN_FLIGHT_REQUESTS,
};
use crate::{MapError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TileRepoProfile {
    Balanced,
    LowResource,
    HighPerformance,
    Custom(TileRepoConfig),
}

impl TileRepoProfile {
    pub fn resolve(&self) -> TileRepoConfig {
        match self {
            Self::Balanced => TileRepoConfig::default(),
            Self::LowResource => TileRepoConfig::low_resource(),
            Self::HighPerformance => TileRepoConfig::high_performance(),
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for TileRepoProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileRepoConfig {
    /// Budget of the memory cache, in bytes of decoded image data
    pub memory_cache_bytes: usize,
    /// Number of fetch workers
    pub max_in_flight_requests: usize,
    /// Pending requests kept before the oldest is dropped
    pub queue_capacity: usize,
}

impl TileRepoConfig {
    pub fn low_resource() -> Self {
        Self {
            memory_cache_bytes: 16 * 1024 * 1024,
            max_in_flight_requests: 4,
            queue_capacity: 48,
        }
    }

    pub fn high_performance() -> Self {
        Self {
            memory_cache_bytes: 256 * 1024 * 1024,
            max_in_flight_requests: 32,
            queue_capacity: 512,
        }
    }

    pub fn for_testing() -> Self {
        Self {
            memory_cache_bytes: 1024 * 1024,
            max_in_flight_requests: 2,
            queue_capacity: 16,
        }
    }
}

impl Default for TileRepoConfig {
    fn default() -> Self {
        Self {
            memory_cache_bytes: DEFAULT_MEMORY_CACHE_BYTES,
            max_in_flight_requests: MAX_IN_FLIGHT_REQUESTS,
            queue_capacity: DEFAULT_TILE_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlingConfig {
    /// Initial per-frame delta is `-velocity / velocity_divisor`
    pub velocity_divisor: f64,
    /// Multiplier applied to the delta after every frame
    pub decay: f64,
    /// The animation stops once both deltas are at or below this magnitude
    pub stop_threshold: f64,
    pub frames_per_second: u32,
}

impl FlingConfig {
    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(1000 / self.frames_per_second.max(1) as u64)
    }
}

impl Default for FlingConfig {
    fn default() -> Self {
        Self {
            velocity_divisor: 15.0,
            decay: 0.8,
            stop_threshold: 1.0,
            frames_per_second: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapProcessorConfig {
    pub event_buffer_size: usize,
    pub fling: FlingConfig,
}

impl Default for MapProcessorConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: EVENT_BUFFER_SIZE,
            fling: FlingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            timeout_secs: 30,
            user_agent: concat!("trailmap/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenCacheConfig {
    /// Seconds a renewed access token stays valid; `None` keeps it until it
    /// is rejected by the server
    pub lifetime_secs: Option<u64>,
}

impl TokenCacheConfig {
    pub fn lifetime(&self) -> Option<Duration> {
        self.lifetime_secs.map(Duration::from_secs)
    }
}

/// Top-level configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailmapConfig {
    pub api: ApiConfig,
    pub tiles: TileRepoConfig,
    pub map: MapProcessorConfig,
    pub tokens: TokenCacheConfig,
    /// Directory backing the disk tile cache
    pub disk_cache_dir: Option<PathBuf>,
}

impl TrailmapConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Rejects values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.tiles.max_in_flight_requests == 0 {
            return Err(MapError::Config(
                "tiles.max_in_flight_requests must be at least 1".to_string(),
            ));
        }
        if self.tiles.queue_capacity == 0 {
            return Err(MapError::Config(
                "tiles.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.map.event_buffer_size == 0 {
            return Err(MapError::Config(
                "map.event_buffer_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.map.fling.decay) {
            return Err(MapError::Config(format!(
                "map.fling.decay must be in [0, 1), got {}",
                self.map.fling.decay
            )));
        }
        Ok(())
    }
}
