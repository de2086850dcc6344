//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories.
pub const APP_NAME: &str = "openskynet";

/// Application name written into producer-info attributes.
pub const PRODUCER_APP_NAME: &str = "OpenSkyNet";

/// Application version written into producer-info attributes.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable prefix for command-line options.
pub const ENV_PREFIX: &str = "OSN_";

/// Default minimum confidence for a window's top prediction.
pub const DEFAULT_CONFIDENCE: f32 = 0.95;

/// Default overlap threshold (IoU) for non-maximum suppression.
pub const DEFAULT_NMS_OVERLAP: f32 = 0.30;

/// Default model window edge in pixels when nothing else specifies one.
pub const DEFAULT_WINDOW_SIZE: u32 = 256;

/// Default web tile zoom level.
pub const DEFAULT_ZOOM: u8 = 18;

/// Highest supported web tile zoom level.
pub const MAX_ZOOM: u8 = 22;

/// Default maximum number of concurrent tile downloads.
pub const DEFAULT_MAX_DOWNLOADS: usize = 10;

/// Default fraction of accelerator capacity available to inference.
pub const DEFAULT_MAX_UTILIZATION: f32 = 0.95;

/// Default output layer name.
pub const DEFAULT_LAYER_NAME: &str = "skynetdetects";

/// Number of ranked predictions kept per window.
pub const DEFAULT_TOP_K: usize = 5;

/// Scale factor between consecutive pyramid levels.
pub const PYRAMID_SCALE_FACTOR: u32 = 2;

/// Concurrent inference workers that saturate one accelerator.
///
/// The GPU worker pool is `ceil(max_utilization * GPU_WORKER_SLOTS)`.
pub const GPU_WORKER_SLOTS: usize = 4;

/// Utilization budget bounds.
pub mod utilization {
    /// Minimum accepted utilization fraction.
    pub const MIN: f32 = 0.05;
    /// Maximum accepted utilization fraction.
    pub const MAX: f32 = 1.0;
}

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
}

/// Web Mercator constants.
pub mod web_mercator {
    /// Latitude limit of the Web Mercator projection in degrees.
    pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;
    /// Default tile edge in pixels.
    pub const TILE_SIZE: u32 = 256;
    /// Spatial reference of tile-service output.
    pub const SPATIAL_REFERENCE: &str = "EPSG:4326";
}

/// Tile download constants.
pub mod download {
    /// Attempts per tile before the fetch fails.
    pub const MAX_ATTEMPTS: u32 = 3;
    /// Delay before the first retry in milliseconds, doubled per retry.
    pub const RETRY_BASE_DELAY_MS: u64 = 250;
    /// Per-request timeout in seconds.
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// Local raster constants.
pub mod raster {
    /// Spatial reference assumed when no `.prj` sidecar is present.
    pub const DEFAULT_SPATIAL_REFERENCE: &str = "EPSG:4326";
    /// Generic world file extension.
    pub const WORLD_FILE_EXTENSION: &str = "wld";
    /// Projection sidecar extension.
    pub const PROJECTION_EXTENSION: &str = "prj";
}

/// Feature attribute names.
pub mod attributes {
    /// Top label.
    pub const TOP_CATEGORY: &str = "top_cat";
    /// Top confidence.
    pub const TOP_SCORE: &str = "top_score";
    /// Run timestamp.
    pub const DATE: &str = "date";
    /// Ranked predictions as JSON.
    pub const TOP_FIVE: &str = "top_five";
    /// Operator name (producer info).
    pub const USER_NAME: &str = "user_name";
    /// Application name (producer info).
    pub const APP: &str = "app";
    /// Application version (producer info).
    pub const APP_VERSION: &str = "app_ver";
}
