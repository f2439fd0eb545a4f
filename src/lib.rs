//! # Trailmap
//!
//! Tile acquisition and viewport state for a pannable, zoomable map backed
//! by a WMTS-style imagery service.
//!
//! The two halves are [`TileRepo`], which serves tiles from a memory and disk
//! cache and fetches missing ones with a bounded pool of workers, and
//! [`MapProcessor`], which folds gestures into a published [`MapState`].

pub mod background;
pub mod core;
pub mod input;
pub mod map;
pub mod net;
pub mod prelude;
pub mod repo;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::TrailmapConfig,
    geo::{Coordinate, Crs, LatLng, Point},
    state::{MapSize, MapState},
    zoom::{MetersPerPixel, ZoomLevel},
};

pub use input::{events::Event, gestures::Gesture};

pub use map::processor::MapProcessor;

pub use net::{
    api::{ApiService, FetchError, HttpApiService},
    auth::{AccessToken, RenewalError, RenewalToken},
};

pub use repo::{
    app::Repo,
    session::{MemorySessionStore, SessionError, SessionStore},
    token_cache::AccessTokenCache,
};

pub use tiles::{
    disk::{DirFileCache, FileCache, MemoryFileCache},
    repo::TileRepo,
    request::{CacheKey, TilePosition, TileRequest},
    wmts::WmtsLayerConfig,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Renewal error: {0}")]
    Renewal(#[from] RenewalError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Config error: {0}")]
    Config(String),
}

/// Error type alias for convenience
pub type Error = MapError;
