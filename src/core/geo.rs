use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::core::zoom::ZoomLevel;

/// Web Mercator projection constants
const EARTH_RADIUS: f64 = 6378137.0;
const MAX_LATITUDE: f64 = 85.0511287798;

/// Coordinate reference systems a [`Coordinate`] can be expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// Geographic WGS 84 (EPSG:4326): x is longitude, y is latitude, in degrees
    Wgs84,
    /// Web Mercator (EPSG:3857): x is easting, y is northing, in meters
    WebMercator,
}

impl Crs {
    /// The EPSG identifier, e.g. `EPSG:3857`
    pub fn identifier(&self) -> &'static str {
        match self {
            Crs::Wgs84 => "EPSG:4326",
            Crs::WebMercator => "EPSG:3857",
        }
    }

    /// Parses an identifier such as `EPSG:3857` or the OGC URN form
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let code = identifier.rsplit(':').next()?;
        match code {
            "4326" => Some(Crs::Wgs84),
            "3857" | "900913" => Some(Crs::WebMercator),
            _ => None,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }

    /// Clamps latitude to the range Web Mercator can represent
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }

    /// Converts to Web Mercator projection (EPSG:3857)
    pub fn to_mercator(&self) -> Point {
        let lat = Self::clamp_lat(self.lat);
        let x = self.lng.to_radians() * EARTH_RADIUS;
        let y = ((PI / 4.0 + lat.to_radians() / 2.0).tan().ln()) * EARTH_RADIUS;
        Point::new(x, y)
    }

    /// Creates LatLng from Web Mercator coordinates
    pub fn from_mercator(point: Point) -> Self {
        let lng = (point.x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (point.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        Self::new(lat, lng)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a point in screen or projected coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply(&self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Midpoint between two points
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// An immutable position tagged with the reference system it is expressed in.
///
/// Conversions always return a new value; the source is never touched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub crs: Crs,
}

impl Coordinate {
    pub fn new(x: f64, y: f64, crs: Crs) -> Self {
        Self { x, y, crs }
    }

    /// A geographic position, longitude on x and latitude on y
    pub fn from_lat_lng(lat_lng: LatLng) -> Self {
        Self::new(lat_lng.lng, lat_lng.lat, Crs::Wgs84)
    }

    /// Geographic latitude/longitude of this coordinate
    pub fn to_lat_lng(&self) -> LatLng {
        match self.crs {
            Crs::Wgs84 => LatLng::new(self.y, self.x),
            Crs::WebMercator => LatLng::from_mercator(Point::new(self.x, self.y)),
        }
    }

    /// Re-expresses this coordinate in `target`
    pub fn to_crs(&self, target: Crs) -> Coordinate {
        if self.crs == target {
            return *self;
        }

        match target {
            Crs::Wgs84 => Coordinate::from_lat_lng(self.to_lat_lng()),
            Crs::WebMercator => {
                let projected = self.to_lat_lng().to_mercator();
                Coordinate::new(projected.x, projected.y, Crs::WebMercator)
            }
        }
    }

    /// Moves the coordinate by a screen-pixel delta.
    ///
    /// The delta is scaled by the zoom's meters-per-pixel, so the same pixel
    /// distance covers less ground the further the map is zoomed in. Screen y
    /// grows downwards while northing grows upwards, hence the sign flip. The
    /// result is expressed in the same system as `self`.
    pub fn moved_by(&self, zoom: ZoomLevel, delta_x: f64, delta_y: f64) -> Coordinate {
        let meters_per_pixel = zoom.meters_per_pixel().value();
        let projected = self.to_crs(Crs::WebMercator);

        Coordinate::new(
            projected.x + delta_x * meters_per_pixel,
            projected.y - delta_y * meters_per_pixel,
            Crs::WebMercator,
        )
        .to_crs(self.crs)
    }
}
