//! Core constants derived from MapLibre style defaults and common web-map conventions.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default square tile size in CSS pixels when a source omits `tileSize`.
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Lowest zoom a source serves when `minzoom` is omitted.
pub const DEFAULT_MIN_ZOOM: u8 = 0;

/// Highest zoom a source serves when `maxzoom` is omitted.
pub const DEFAULT_MAX_ZOOM: u8 = 22;

/// Worker threads handed to vector tile loaders.
pub const VECTOR_WORKER_THREADS: usize = 2;

/// GeoJSON sources are re-tiled from a single document, so one worker suffices.
pub const GEOJSON_WORKER_THREADS: usize = 1;

/// Priority given to tiles outside the current zoom level, before the
/// per-level penalty. Any tile at the current zoom scores above this.
pub const OFF_ZOOM_PRIORITY: f64 = -1.0e6;
