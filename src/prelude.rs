//! Prelude module for common trailmap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use trailmap::prelude::*;`

pub use crate::core::{
    config::{
        ApiConfig, FlingConfig, MapProcessorConfig, TileRepoConfig, TileRepoProfile,
        TokenCacheConfig, TrailmapConfig,
    },
    geo::{Coordinate, Crs, LatLng, Point},
    state::{MapSize, MapState},
    zoom::{MetersPerPixel, ZoomLevel},
};

pub use crate::input::{
    events::{Event, TouchEvent, TouchEventType, TouchPoint},
    gestures::{Gesture, GestureConfig, GestureDetector},
};

pub use crate::map::{fling::FlingDeltas, processor::MapProcessor};

pub use crate::net::{
    api::{ApiService, FetchError, HttpApiService},
    auth::{AccessToken, AuthInfo, RenewalError, RenewalToken},
};

pub use crate::repo::{
    app::Repo,
    session::{MemorySessionStore, SessionError, SessionStore},
    token_cache::AccessTokenCache,
};

pub use crate::tiles::{
    cache::TileCache,
    disk::{DirFileCache, FileCache, MemoryFileCache},
    repo::TileRepo,
    request::{CacheKey, TilePosition, TileRequest},
    wmts::{
        find_closest_matrix, ClosestMatrix, WmtsLayerConfig, WmtsTileMatrixConfig,
        WmtsTileMatrixSetConfig,
    },
};

pub use crate::{Error as MapError, Result};

pub use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};
