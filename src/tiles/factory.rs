use crate::background::tasks::{PriorityFn, Task, TaskKey};
use crate::core::config::SourcesConfig;
use crate::core::constants::OFF_ZOOM_PRIORITY;
use crate::core::geo::TileCoord;
use crate::prelude::{Arc, HashMap, Mutex, RwLock};
use crate::reporter::Reporter;
use crate::tiles::grid::TileGrid;
use crate::tiles::loader::TilePayload;
use crate::tiles::tileset::{Tile, TileStatus};
use crate::traits::{TaskQueue, TileLoader};
use crate::Result;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Tiles known to one factory
struct FactoryState {
    /// Loaded or failed tiles, evicted least-recently-requested first
    settled: LruCache<TileCoord, Tile>,
    /// Tiles with a task queued or running
    pending: HashMap<TileCoord, Tile>,
}

/// Per-source cache that turns coordinates into tiles, enqueuing work as needed
///
/// A coordinate is only ever enqueued when it is neither pending nor settled,
/// so requesting the same tiles again never grows the queue. Failed tiles are
/// requested again once their retry delay has passed, up to the configured
/// number of retries.
pub struct TileFactory {
    source_key: String,
    loader: Arc<dyn TileLoader>,
    queue: Arc<dyn TaskQueue>,
    reporter: Reporter,
    config: SourcesConfig,
    state: Arc<Mutex<FactoryState>>,
    view: Arc<RwLock<Option<TileGrid>>>,
}

impl TileFactory {
    pub fn new(
        source_key: impl Into<String>,
        loader: Arc<dyn TileLoader>,
        queue: Arc<dyn TaskQueue>,
        reporter: Reporter,
        config: &SourcesConfig,
    ) -> Self {
        let capacity = NonZeroUsize::new(config.tile_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            source_key: source_key.into(),
            loader,
            queue,
            reporter,
            config: config.clone(),
            state: Arc::new(Mutex::new(FactoryState {
                settled: LruCache::new(capacity),
                pending: HashMap::default(),
            })),
            view: Arc::new(RwLock::new(None)),
        }
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    /// Record the grid the next requests are made for; queued tasks of this
    /// factory are scored against it at the next sort.
    pub fn set_view(&self, grid: TileGrid) {
        if let Ok(mut view) = self.view.write() {
            *view = Some(grid);
        }
    }

    /// Current state of `coord`, enqueuing a load if it is absent or due for a retry
    pub fn request(&self, coord: TileCoord) -> Tile {
        let Ok(mut state) = self.state.lock() else {
            return Tile::pending(coord);
        };

        if let Some(tile) = state.pending.get(&coord) {
            return tile.clone();
        }

        let mut retry_count = 0;
        if let Some(tile) = state.settled.get(&coord) {
            if !self.should_retry(tile) {
                return tile.clone();
            }
            retry_count = tile.retry_count;
        }
        state.settled.pop(&coord);

        let mut tile = Tile::pending(coord);
        tile.retry_count = retry_count;
        state.pending.insert(coord, tile.clone());
        drop(state);

        if self.queue.enqueue(self.build_task(coord)) {
            self.reporter.record_requested();
            log::debug!("queued tile {} for source '{}'", coord, self.source_key);
        } else {
            log::debug!(
                "tile {} for source '{}' was already queued",
                coord,
                self.source_key
            );
        }
        tile
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().map(|s| s.pending.len()).unwrap_or(0)
    }

    pub fn settled_count(&self) -> usize {
        self.state.lock().map(|s| s.settled.len()).unwrap_or(0)
    }

    fn should_retry(&self, tile: &Tile) -> bool {
        tile.status == TileStatus::Error
            && tile.retry_count <= self.config.max_retries
            && tile.updated_at.elapsed() >= self.config.retry_delay(tile.retry_count)
    }

    fn build_task(&self, coord: TileCoord) -> Task {
        let key = TaskKey::new(self.source_key.clone(), coord.key());

        let view = self.view.clone();
        let priority: PriorityFn = Arc::new(move || {
            view.read()
                .map(|grid| tile_priority(grid.as_ref(), &coord))
                .unwrap_or(OFF_ZOOM_PRIORITY)
        });

        let loader = self.loader.clone();
        let state = self.state.clone();
        let reporter = self.reporter.clone();
        let source_key = self.source_key.clone();
        let work = Box::pin(async move {
            let result = loader.load(coord).await;
            complete(&state, &reporter, &source_key, coord, result);
        });

        Task::new(key, priority, work)
    }
}

/// Move a finished tile from pending into the settled cache
fn complete(
    state: &Mutex<FactoryState>,
    reporter: &Reporter,
    source_key: &str,
    coord: TileCoord,
    result: Result<TilePayload>,
) {
    let Ok(mut state) = state.lock() else {
        return;
    };

    let mut tile = state
        .pending
        .remove(&coord)
        .unwrap_or_else(|| Tile::pending(coord));

    match result {
        Ok(payload) => {
            tile.mark_loaded(payload);
            reporter.record_loaded();
            log::debug!("tile {} for source '{}' loaded", coord, source_key);
        }
        Err(e) => {
            log::warn!("tile {} for source '{}' failed: {}", coord, source_key, e);
            tile.mark_error(e.to_string());
            reporter.record_failed();
        }
    }

    state.settled.put(coord, tile);
}

/// Scheduling score for a tile; higher is serviced sooner
///
/// Tiles at the grid zoom score by negated distance from the viewport centre.
/// Tiles at any other zoom score below all of them, lower the further their
/// zoom is from the grid's.
pub fn tile_priority(grid: Option<&TileGrid>, coord: &TileCoord) -> f64 {
    let Some(grid) = grid else {
        return 0.0;
    };

    if coord.z == grid.zoom {
        -grid.distance(coord)
    } else {
        OFF_ZOOM_PRIORITY - (coord.z as f64 - grid.zoom as f64).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::tasks::SharedTaskQueue;
    use crate::core::viewport::{Transform, Viewport};
    use crate::Error;
    use async_trait::async_trait;
    use futures::executor::block_on;

    struct StaticLoader;

    #[async_trait]
    impl TileLoader for StaticLoader {
        async fn load(&self, coord: TileCoord) -> Result<TilePayload> {
            let payload: TilePayload = Arc::new(coord.key());
            Ok(payload)
        }
    }

    struct FailingLoader;

    #[async_trait]
    impl TileLoader for FailingLoader {
        async fn load(&self, _coord: TileCoord) -> Result<TilePayload> {
            Err(Error::Loader("connection reset".into()))
        }
    }

    fn factory(
        loader: Arc<dyn TileLoader>,
        config: SourcesConfig,
    ) -> (TileFactory, Arc<SharedTaskQueue>) {
        let queue = Arc::new(SharedTaskQueue::new());
        let factory = TileFactory::new("osm", loader, queue.clone(), Reporter::new(), &config);
        (factory, queue)
    }

    fn run_all(queue: &SharedTaskQueue) {
        while let Some(task) = queue.pop_task() {
            block_on(task.run());
        }
    }

    #[test]
    fn test_request_enqueues_once() {
        let (factory, queue) = factory(Arc::new(StaticLoader), SourcesConfig::default());
        let coord = TileCoord::new(1, 1, 2);

        assert!(factory.request(coord).is_pending());
        assert!(factory.request(coord).is_pending());
        assert_eq!(queue.count_tasks(), 1);
        assert_eq!(factory.pending_count(), 1);
    }

    #[test]
    fn test_completed_tile_is_served_from_cache() {
        let (factory, queue) = factory(Arc::new(StaticLoader), SourcesConfig::default());
        let coord = TileCoord::new(0, 0, 0);
        factory.request(coord);
        run_all(&queue);

        let tile = factory.request(coord);
        assert!(tile.is_loaded());
        assert_eq!(tile.payload_as::<String>().map(String::as_str), Some("0/0/0"));
        assert_eq!(queue.count_tasks(), 0);
        assert_eq!(factory.settled_count(), 1);
        assert_eq!(factory.reporter.snapshot().loaded, 1);
    }

    #[test]
    fn test_failed_tile_is_not_retried_before_delay() {
        let config = SourcesConfig {
            retry_delay_ms: 60_000,
            ..Default::default()
        };
        let (factory, queue) = factory(Arc::new(FailingLoader), config);
        let coord = TileCoord::new(0, 0, 0);
        factory.request(coord);
        run_all(&queue);

        let tile = factory.request(coord);
        assert_eq!(tile.status, TileStatus::Error);
        assert_eq!(tile.error.as_deref(), Some("Loader error: connection reset"));
        assert_eq!(queue.count_tasks(), 0);
        assert_eq!(factory.reporter.snapshot().failed, 1);
    }

    #[test]
    fn test_failed_tile_retried_until_limit() {
        let config = SourcesConfig {
            retry_delay_ms: 0,
            max_retries: 2,
            ..Default::default()
        };
        let (factory, queue) = factory(Arc::new(FailingLoader), config);
        let coord = TileCoord::new(0, 0, 0);

        // First attempt plus two retries
        for _ in 0..3 {
            assert!(factory.request(coord).is_pending());
            run_all(&queue);
        }

        let tile = factory.request(coord);
        assert_eq!(tile.status, TileStatus::Error);
        assert_eq!(tile.retry_count, 3);
        assert_eq!(queue.count_tasks(), 0);
    }

    #[test]
    fn test_cache_capacity_evicts_settled_tiles() {
        let config = SourcesConfig {
            tile_cache_size: 1,
            ..Default::default()
        };
        let (factory, queue) = factory(Arc::new(StaticLoader), config);
        factory.request(TileCoord::new(0, 0, 1));
        factory.request(TileCoord::new(1, 0, 1));
        run_all(&queue);

        assert_eq!(factory.settled_count(), 1);
    }

    #[test]
    fn test_priority_follows_view() {
        let (factory, queue) = factory(Arc::new(StaticLoader), SourcesConfig::default());
        let grid = TileGrid::new(
            &Viewport::new(512.0, 512.0),
            &Transform::new(256.0, 256.0, 2048.0),
            1.0,
            512,
            0,
            22,
        );
        assert_eq!(grid.zoom, 2);
        factory.set_view(grid);

        factory.request(TileCoord::new(0, 0, 2));
        factory.request(TileCoord::new(1, 1, 2));
        factory.request(TileCoord::new(1, 1, 3));
        queue.sort_tasks();

        let order: Vec<String> = queue.keys().into_iter().map(|k| k.tile).collect();
        assert_eq!(order, vec!["2/1/1", "2/0/0", "3/1/1"]);
    }

    #[test]
    fn test_priority_without_view_is_neutral() {
        assert_eq!(tile_priority(None, &TileCoord::new(0, 0, 0)), 0.0);
    }
}
