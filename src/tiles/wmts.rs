//! Static description of WMTS layers and their tile matrices.

use serde::{Deserialize, Serialize};

use crate::core::constants::{STANDARDIZED_PIXEL_SIZE, TILE_SIZE};
use crate::core::geo::{Coordinate, Crs};
use crate::core::zoom::{MetersPerPixel, ZoomLevel};

/// One resolution level of a tile matrix set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmtsTileMatrixConfig {
    pub identifier: String,
    pub scale_denominator: f64,
    pub top_left_corner: Coordinate,
    pub tile_width: u32,
    pub tile_height: u32,
    pub matrix_width: u32,
    pub matrix_height: u32,
}

impl WmtsTileMatrixConfig {
    /// A square-tiled matrix with the given ground resolution
    pub fn with_resolution(
        identifier: impl Into<String>,
        meters_per_pixel: MetersPerPixel,
        top_left_corner: Coordinate,
        matrix_width: u32,
        matrix_height: u32,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            scale_denominator: meters_per_pixel.value() / STANDARDIZED_PIXEL_SIZE,
            top_left_corner,
            tile_width: TILE_SIZE,
            tile_height: TILE_SIZE,
            matrix_width,
            matrix_height,
        }
    }

    /// Ground resolution for a CRS measured in meters
    pub fn meters_per_pixel(&self) -> MetersPerPixel {
        MetersPerPixel(self.scale_denominator * STANDARDIZED_PIXEL_SIZE)
    }
}

/// A tile matrix set: a CRS and its matrices, coarsest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmtsTileMatrixSetConfig {
    pub identifier: String,
    pub crs: Crs,
    pub matrices: Vec<WmtsTileMatrixConfig>,
}

impl WmtsTileMatrixSetConfig {
    pub fn matrix(&self, identifier: &str) -> Option<&WmtsTileMatrixConfig> {
        self.matrices.iter().find(|m| m.identifier == identifier)
    }
}

/// Range of tiles a layer actually serves within one matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMatrixLimits {
    pub min_row: i32,
    pub max_row: i32,
    pub min_col: i32,
    pub max_col: i32,
}

impl TileMatrixLimits {
    pub fn contains(&self, row: i32, col: i32) -> bool {
        (self.min_row..=self.max_row).contains(&row) && (self.min_col..=self.max_col).contains(&col)
    }
}

/// A matrix offered by a layer, with optional limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmtsLayerMatrix {
    pub matrix: WmtsTileMatrixConfig,
    #[serde(default)]
    pub limits: Option<TileMatrixLimits>,
}

/// A named imagery layer of a WMTS service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmtsLayerConfig {
    pub service_identifier: String,
    pub identifier: String,
    pub set: WmtsTileMatrixSetConfig,
    /// Matrices the layer serves, in the order they should be considered
    pub matrices: Vec<WmtsLayerMatrix>,
}

impl WmtsLayerConfig {
    /// A layer serving every matrix of `set` without limits
    pub fn from_set(
        service_identifier: impl Into<String>,
        identifier: impl Into<String>,
        set: WmtsTileMatrixSetConfig,
    ) -> Self {
        let matrices = set
            .matrices
            .iter()
            .cloned()
            .map(|matrix| WmtsLayerMatrix {
                matrix,
                limits: None,
            })
            .collect();

        Self {
            service_identifier: service_identifier.into(),
            identifier: identifier.into(),
            set,
            matrices,
        }
    }

    pub fn limits_for(&self, matrix_identifier: &str) -> Option<TileMatrixLimits> {
        self.matrices
            .iter()
            .find(|m| m.matrix.identifier == matrix_identifier)
            .and_then(|m| m.limits)
    }
}

/// Result of [`find_closest_matrix`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestMatrix<'a> {
    pub target: MetersPerPixel,
    pub matched: MetersPerPixel,
    pub matrix: &'a WmtsTileMatrixConfig,
}

/// Picks the layer matrix whose resolution is nearest to the zoom.
///
/// Ties go to the matrix listed first. `None` only if the layer has no
/// matrices.
pub fn find_closest_matrix(layer: &WmtsLayerConfig, zoom: ZoomLevel) -> Option<ClosestMatrix<'_>> {
    let target = zoom.meters_per_pixel();
    let mut closest: Option<(MetersPerPixel, &WmtsTileMatrixConfig)> = None;

    for entry in &layer.matrices {
        let for_this_matrix = entry.matrix.meters_per_pixel();
        let closer = match closest {
            Some((best, _)) => target.distance_to(for_this_matrix) < target.distance_to(best),
            None => true,
        };
        if closer {
            closest = Some((for_this_matrix, &entry.matrix));
        }
    }

    closest.map(|(matched, matrix)| ClosestMatrix {
        target,
        matched,
        matrix,
    })
}
