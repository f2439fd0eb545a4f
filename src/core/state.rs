use serde::{Deserialize, Serialize};

use crate::core::geo::Coordinate;
use crate::core::zoom::ZoomLevel;

/// Viewport dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MapSize {
    pub width: u32,
    pub height: u32,
}

impl MapSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Immutable snapshot of what the map is showing.
///
/// Every transition goes through the `with_*` builders, which hand back a
/// fresh value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapState {
    pub center: Coordinate,
    pub zoom: ZoomLevel,
    pub size: MapSize,
}

impl MapState {
    pub fn new(center: Coordinate, zoom: ZoomLevel, size: MapSize) -> Self {
        Self { center, zoom, size }
    }

    pub fn with_center(&self, center: Coordinate) -> Self {
        Self { center, ..*self }
    }

    pub fn with_zoom(&self, zoom: ZoomLevel) -> Self {
        Self { zoom, ..*self }
    }

    pub fn with_size(&self, size: MapSize) -> Self {
        Self { size, ..*self }
    }
}
