//! # tilemux
//!
//! Multi-source map tile scheduling.
//!
//! A style names several tile sources (raster imagery, vector tiles, GeoJSON).
//! [`Sources`] builds one [`Source`] per supported, referenced entry, works out
//! which tiles each one needs for the current viewport and transform, and
//! funnels every tile job into one shared [`TaskQueue`] that is reprioritized
//! across all sources in a single pass. Fetching and decoding tiles is left to
//! the [`TileLoader`] implementations supplied through a [`LoaderContext`].

pub mod background;
pub mod core;
pub mod logging;
pub mod prelude;
pub mod reporter;
pub mod sources;
pub mod tiles;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{SchedulerProfile, SourcesConfig, UnsupportedSourcePolicy},
    geo::{LatLng, Point, TileCoord},
    style::{SourceDescriptor, SourceKind, Style, StyleLayer},
    viewport::{Transform, Viewport},
};

pub use crate::background::tasks::{SharedTaskQueue, Task, TaskKey};

pub use crate::reporter::{Reporter, ReporterSnapshot};

pub use crate::sources::{Sources, SourcesBuilder, Tilesets};

pub use crate::tiles::{
    factory::TileFactory,
    grid::TileGrid,
    loader::{LoaderRequest, TilePayload, WorkerMonitor},
    source::Source,
    tileset::{Tile, TileStatus, Tileset},
};

pub use crate::traits::{LoaderContext, TaskQueue, TileLoader, TileSource};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Style error: {0}")]
    Style(#[from] serde_json::Error),

    #[error("Unsupported source '{key}' of type '{kind}'")]
    UnsupportedSource { key: String, kind: String },

    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Error type alias for convenience
pub type Error = SourceError;
