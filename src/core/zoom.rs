use serde::{Deserialize, Serialize};
use std::fmt;

/// Ground resolution: how many meters a single screen pixel covers
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetersPerPixel(pub f64);

impl MetersPerPixel {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Absolute difference to another resolution
    pub fn distance_to(&self, other: MetersPerPixel) -> f64 {
        (self.0 - other.0).abs()
    }
}

impl fmt::Display for MetersPerPixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} m/px", self.0)
    }
}

/// The map's zoom, expressed as the ground resolution currently shown.
///
/// Smaller values are further zoomed in. No bounds are enforced here; the
/// presentation layer is expected to clamp if it needs to.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ZoomLevel {
    pub level: MetersPerPixel,
}

impl ZoomLevel {
    pub fn new(meters_per_pixel: f64) -> Self {
        Self {
            level: MetersPerPixel(meters_per_pixel),
        }
    }

    pub fn meters_per_pixel(&self) -> MetersPerPixel {
        self.level
    }

    /// Returns a new zoom level multiplied by `factor`
    pub fn scaled_by(&self, factor: f64) -> ZoomLevel {
        ZoomLevel::new(self.level.0 * factor)
    }

    /// Absolute distance to a target resolution
    pub fn distance_to(&self, target: MetersPerPixel) -> f64 {
        self.level.distance_to(target)
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self::new(crate::core::constants::DEFAULT_METERS_PER_PIXEL)
    }
}
