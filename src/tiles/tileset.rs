//! Core data types for per-source tile snapshots

use crate::core::geo::TileCoord;
use crate::prelude::{HashMap, Instant};
use crate::tiles::grid::TileGrid;
use crate::tiles::loader::TilePayload;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileStatus {
    Pending,
    Loaded,
    Error,
}

#[derive(Clone)]
pub struct Tile {
    pub coord: TileCoord,
    pub status: TileStatus,
    pub payload: Option<TilePayload>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub updated_at: Instant,
}

impl Tile {
    pub fn pending(coord: TileCoord) -> Self {
        Self {
            coord,
            status: TileStatus::Pending,
            payload: None,
            error: None,
            retry_count: 0,
            updated_at: Instant::now(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.status == TileStatus::Loaded
    }

    pub fn is_pending(&self) -> bool {
        self.status == TileStatus::Pending
    }

    pub fn mark_loaded(&mut self, payload: TilePayload) {
        self.status = TileStatus::Loaded;
        self.payload = Some(payload);
        self.error = None;
        self.retry_count = 0;
        self.updated_at = Instant::now();
    }

    pub fn mark_error(&mut self, error: String) {
        self.status = TileStatus::Error;
        self.error = Some(error);
        self.retry_count += 1;
        self.updated_at = Instant::now();
    }

    /// Downcast the payload to the loader's concrete type
    pub fn payload_as<T: 'static>(&self) -> Option<&T> {
        self.payload.as_ref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("coord", &self.coord)
            .field("status", &self.status)
            .field("has_payload", &self.payload.is_some())
            .field("error", &self.error)
            .field("retry_count", &self.retry_count)
            .finish()
    }
}

/// Snapshot of one source's required tiles for one pass
#[derive(Debug, Clone)]
pub struct Tileset {
    pub source: String,
    pub grid: TileGrid,
    tiles: HashMap<String, Tile>,
    loaded: f64,
}

impl Tileset {
    pub fn new(source: impl Into<String>, grid: TileGrid, tiles: Vec<Tile>) -> Self {
        let required = tiles.len();
        let done = tiles.iter().filter(|t| t.is_loaded()).count();
        let loaded = if required == 0 {
            1.0
        } else {
            done as f64 / required as f64
        };

        Self {
            source: source.into(),
            grid,
            tiles: tiles.into_iter().map(|t| (t.coord.key(), t)).collect(),
            loaded,
        }
    }

    /// Fraction of required tiles in `Loaded` status; 1.0 when nothing is required
    pub fn loaded(&self) -> f64 {
        self.loaded
    }

    pub fn get(&self, coord: &TileCoord) -> Option<&Tile> {
        self.tiles.get(&coord.key())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Tile)> {
        self.tiles.iter()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn count(&self, status: TileStatus) -> usize {
        self.tiles.values().filter(|t| t.status == status).count()
    }
}
