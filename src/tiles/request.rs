use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::constants::TILE_FILE_PREFIX;

/// Row/column of a tile inside its matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilePosition {
    pub row: i32,
    pub col: i32,
}

impl TilePosition {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

/// Identifies one tile of one matrix of one layer of a WMTS service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRequest {
    pub service_identifier: String,
    pub layer_identifier: String,
    pub set_identifier: String,
    pub matrix_identifier: String,
    pub position: TilePosition,
}

impl TileRequest {
    pub fn new(
        service_identifier: impl Into<String>,
        layer_identifier: impl Into<String>,
        set_identifier: impl Into<String>,
        matrix_identifier: impl Into<String>,
        position: TilePosition,
    ) -> Self {
        Self {
            service_identifier: service_identifier.into(),
            layer_identifier: layer_identifier.into(),
            set_identifier: set_identifier.into(),
            matrix_identifier: matrix_identifier.into(),
            position,
        }
    }

    /// The same tile at another position of the matrix
    pub fn at(&self, position: TilePosition) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }

    /// Stable 64-bit key shared by the memory and disk caches
    pub fn cache_key(&self) -> CacheKey {
        crate::tiles::hash::create_key(self)
    }
}

/// Cache key derived from a [`TileRequest`].
///
/// Collisions between distinct requests are possible but not guarded
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(pub u64);

impl CacheKey {
    /// Name of the tile's entry in the disk cache, e.g. `tile--4242`
    pub fn file_name(&self) -> String {
        format!("{}{}", TILE_FILE_PREFIX, self)
    }
}

/// Rendered as a signed integer to stay compatible with existing disk caches
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 as i64)
    }
}
