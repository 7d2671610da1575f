//! Shared trait abstractions
//!
//! These are the seams between the scheduler and its collaborators: the task
//! queue every source feeds, the loaders that actually produce tile payloads,
//! and the context that builds loaders for a style.

use crate::background::tasks::{Task, TaskKey};
use crate::core::geo::TileCoord;
use crate::core::style::SourceDescriptor;
use crate::tiles::loader::{LoaderRequest, TilePayload, WorkerMonitor};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Queue of outstanding tile jobs shared by every source
///
/// Implementations must keep at most one task per [`TaskKey`] and must make
/// [`sort_tasks`](TaskQueue::sort_tasks) a single atomic step with respect to
/// concurrent enqueues.
pub trait TaskQueue: Send + Sync {
    /// Insert a task. Returns `false` and drops the task if its key is already queued.
    fn enqueue(&self, task: Task) -> bool;

    /// Re-evaluate every task's priority and establish one order across all sources
    fn sort_tasks(&self);

    /// Current queue depth
    fn count_tasks(&self) -> usize;

    /// Take the task at the front of the current order
    fn pop_task(&self) -> Option<Task>;

    fn contains(&self, key: &TaskKey) -> bool;

    fn is_empty(&self) -> bool {
        self.count_tasks() == 0
    }
}

/// Produces the payload for one tile of one source
#[async_trait]
pub trait TileLoader: Send + Sync {
    /// Fetch and decode a tile. Failures are recorded as an errored tile.
    async fn load(&self, coord: TileCoord) -> Result<TilePayload>;

    /// Depth gauge for the loader's worker pool, if it has one
    fn worker_monitor(&self) -> Option<WorkerMonitor> {
        None
    }
}

/// Builds loaders for the sources of a style
///
/// Returning `None` means this context cannot serve the source, which drops
/// it from the active set.
pub trait LoaderContext {
    fn raster_loader(&self, request: LoaderRequest<'_>) -> Option<Arc<dyn TileLoader>>;

    fn vector_loader(&self, request: LoaderRequest<'_>) -> Option<Arc<dyn TileLoader>>;
}

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`, if the source is templated.
    fn tile_url(&self, coord: TileCoord) -> Option<String>;
}

impl TileSource for SourceDescriptor {
    fn tile_url(&self, coord: TileCoord) -> Option<String> {
        if self.tiles.is_empty() {
            return None;
        }

        // Spread requests across mirror hosts the way subdomain rotation does
        let idx = ((coord.x as usize) + (coord.y as usize)) % self.tiles.len();
        let url = self.tiles[idx]
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string());
        Some(url)
    }
}
