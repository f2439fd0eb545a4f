pub mod cache;
pub mod disk;
pub mod hash;
pub mod repo;
pub mod request;
pub mod wmts;

// Re-exports for convenience
pub use cache::{CacheCost, TileCache};
pub use disk::{DirFileCache, FileCache, MemoryFileCache};
pub use repo::{OnCached, TileRepo};
pub use request::{CacheKey, TilePosition, TileRequest};
pub use wmts::{
    find_closest_matrix, ClosestMatrix, TileMatrixLimits, WmtsLayerConfig, WmtsLayerMatrix,
    WmtsTileMatrixConfig, WmtsTileMatrixSetConfig,
};
