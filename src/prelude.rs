//! Prelude module for common tilemux types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use tilemux::prelude::*;`

pub use crate::core::{
    config::{DriverConfig, SchedulerProfile, SourcesConfig, UnsupportedSourcePolicy},
    geo::{LatLng, Point, TileCoord},
    style::{SourceDescriptor, SourceKind, Style, StyleLayer},
    viewport::{Transform, Viewport},
};

pub use crate::background::tasks::{PriorityFn, SharedTaskQueue, Task, TaskKey};

#[cfg(feature = "tokio-runtime")]
pub use crate::background::driver::QueueDriver;

pub use crate::tiles::{
    factory::TileFactory,
    grid::TileGrid,
    loader::{LoaderRequest, TilePayload, WorkerMonitor},
    source::Source,
    tileset::{Tile, TileStatus, Tileset},
};

pub use crate::traits::{LoaderContext, TaskQueue, TileLoader, TileSource};

pub use crate::reporter::{Reporter, ReporterSnapshot};

pub use crate::sources::{Sources, SourcesBuilder, Tilesets};

pub use crate::{Error as SourceError, Result};

pub use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, RwLock},
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};
