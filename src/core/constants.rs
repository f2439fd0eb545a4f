//! Engine-wide constants. Keeping them in a single place makes it easier to
//! tweak magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Standardized rendering pixel size of the OGC WMTS specification, in meters.
pub const STANDARDIZED_PIXEL_SIZE: f64 = 0.00028;

/// Initial zoom when nothing else is configured (roughly a regional overview).
pub const DEFAULT_METERS_PER_PIXEL: f64 = 100.0;

/// Fetch workers pulling from the tile queue at any one time.
pub const MAX_IN_FLIGHT_REQUESTS: usize = 20;

/// Pending tile requests kept before the oldest are dropped.
pub const DEFAULT_TILE_QUEUE_CAPACITY: usize = 128;

/// Memory tile cache budget in bytes of decoded image data (64 MiB).
pub const DEFAULT_MEMORY_CACHE_BYTES: usize = 64 * 1024 * 1024;

/// Map events buffered before the oldest are dropped.
pub const EVENT_BUFFER_SIZE: usize = 1_000;

/// Prefix of tile entries in the disk cache.
pub const TILE_FILE_PREFIX: &str = "tile-";
