use crate::core::geo::TileCoord;
use crate::core::style::{SourceDescriptor, SourceKind};
use crate::core::viewport::{Transform, Viewport};
use crate::tiles::factory::TileFactory;
use crate::tiles::grid::TileGrid;
use crate::tiles::tileset::{Tile, Tileset};

/// One active source of the style
///
/// Holds the descriptor it was built from and the factory that produces its
/// tiles. Each call to [`get_tiles`](Source::get_tiles) yields a fresh
/// [`Tileset`] for the given view.
pub struct Source {
    key: String,
    descriptor: SourceDescriptor,
    factory: TileFactory,
}

impl Source {
    pub fn new(key: impl Into<String>, descriptor: SourceDescriptor, factory: TileFactory) -> Self {
        Self {
            key: key.into(),
            descriptor,
            factory,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    pub fn kind(&self) -> &SourceKind {
        &self.descriptor.kind
    }

    pub fn factory(&self) -> &TileFactory {
        &self.factory
    }

    /// Grid this source would use for the view
    pub fn grid(&self, viewport: &Viewport, transform: &Transform, pix_ratio: f64) -> TileGrid {
        TileGrid::new(
            viewport,
            transform,
            pix_ratio,
            self.descriptor.tile_size(),
            self.descriptor.min_zoom(),
            self.descriptor.max_zoom(),
        )
    }

    /// Request every tile covering the view and snapshot their current state
    ///
    /// `viewport` is in device pixels and `transform` in CSS pixels. Tiles
    /// already pending or cached are not enqueued again.
    pub fn get_tiles(&self, viewport: &Viewport, transform: &Transform, pix_ratio: f64) -> Tileset {
        let grid = self.grid(viewport, transform, pix_ratio);
        self.factory.set_view(grid);

        let tiles: Vec<Tile> = grid
            .coords()
            .into_iter()
            .map(|coord: TileCoord| self.factory.request(coord))
            .collect();

        if grid.below_min_zoom {
            log::debug!("source '{}' has no tiles below zoom {}", self.key, grid.zoom);
        }
        log::debug!(
            "source '{}' needs {} tiles at zoom {} ({} pending, {} settled)",
            self.key,
            tiles.len(),
            grid.zoom,
            self.factory.pending_count(),
            self.factory.settled_count()
        );

        Tileset::new(self.key.clone(), grid, tiles)
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("key", &self.key)
            .field("kind", &self.descriptor.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::tasks::SharedTaskQueue;
    use crate::core::config::SourcesConfig;
    use crate::prelude::Arc;
    use crate::reporter::Reporter;
    use crate::tiles::loader::TilePayload;
    use crate::traits::{TaskQueue, TileLoader};
    use crate::Result;
    use async_trait::async_trait;
    use futures::executor::block_on;

    struct UnitLoader;

    #[async_trait]
    impl TileLoader for UnitLoader {
        async fn load(&self, _coord: TileCoord) -> Result<TilePayload> {
            let payload: TilePayload = Arc::new(());
            Ok(payload)
        }
    }

    fn source(descriptor: SourceDescriptor) -> (Source, Arc<SharedTaskQueue>) {
        let queue = Arc::new(SharedTaskQueue::new());
        let factory = TileFactory::new(
            "imagery",
            Arc::new(UnitLoader),
            queue.clone(),
            Reporter::new(),
            &SourcesConfig::default(),
        );
        (Source::new("imagery", descriptor, factory), queue)
    }

    fn raster() -> SourceDescriptor {
        SourceDescriptor::new(SourceKind::Raster)
            .with_tiles(["https://t.example.com/{z}/{x}/{y}.png"])
    }

    #[test]
    fn test_repeat_requests_do_not_grow_queue() {
        let (source, queue) = source(raster());
        let viewport = Viewport::new(1024.0, 768.0);
        let transform = Transform::new(512.0, 384.0, 2048.0);

        let first = source.get_tiles(&viewport, &transform, 1.0);
        let queued = queue.count_tasks();
        assert_eq!(queued, first.len());
        assert!(queued > 0);

        source.get_tiles(&viewport, &transform, 1.0);
        assert_eq!(queue.count_tasks(), queued);
    }

    #[test]
    fn test_loaded_fraction_after_servicing() {
        let (source, queue) = source(raster());
        let viewport = Viewport::new(512.0, 512.0);
        let transform = Transform::new(256.0, 256.0, 512.0);

        let before = source.get_tiles(&viewport, &transform, 1.0);
        assert_eq!(before.loaded(), 0.0);

        while let Some(task) = queue.pop_task() {
            block_on(task.run());
        }

        let after = source.get_tiles(&viewport, &transform, 1.0);
        assert_eq!(after.loaded(), 1.0);
        assert_eq!(after.source, "imagery");
    }

    #[test]
    fn test_device_pixels_scaled_by_ratio() {
        let (source, _queue) = source(raster());
        let viewport = Viewport::new(1024.0, 1024.0);
        let transform = Transform::new(256.0, 256.0, 512.0);

        // 1024 device pixels at ratio 2 is the 512 CSS pixel world
        let tileset = source.get_tiles(&viewport, &transform, 2.0);
        assert_eq!(tileset.len(), 1);
        assert!(tileset.get(&TileCoord::new(0, 0, 0)).is_some());
    }

    #[test]
    fn test_empty_viewport_is_fully_loaded() {
        let (source, queue) = source(raster());
        let tileset = source.get_tiles(&Viewport::new(0.0, 0.0), &Transform::identity(), 1.0);
        assert!(tileset.is_empty());
        assert_eq!(tileset.loaded(), 1.0);
        assert_eq!(queue.count_tasks(), 0);
    }

    #[test]
    fn test_zoom_range_respected() {
        let (source, _queue) = source(raster().with_zoom_range(0, 3));
        let transform = Transform::new(0.0, 0.0, 512.0 * 2_f64.powi(10));
        let tileset = source.get_tiles(&Viewport::new(512.0, 512.0), &transform, 1.0);
        assert_eq!(tileset.grid.zoom, 3);
        assert!(tileset.iter().all(|(_, tile)| tile.coord.z == 3));
    }

    #[test]
    fn test_below_min_zoom_queues_nothing() {
        let (source, queue) = source(raster().with_zoom_range(8, 14));
        let transform = Transform::new(256.0, 256.0, 512.0);
        let tileset = source.get_tiles(&Viewport::new(512.0, 512.0), &transform, 1.0);

        assert!(tileset.is_empty());
        assert_eq!(tileset.loaded(), 1.0);
        assert_eq!(queue.count_tasks(), 0);
    }

    #[test]
    fn test_far_pan_keeps_one_world_of_columns() {
        let (source, queue) = source(raster());
        let viewport = Viewport::new(1024.0, 1024.0);
        let transform = Transform::new(-1.0e22, 512.0, 2048.0);
        let tileset = source.get_tiles(&viewport, &transform, 1.0);

        // Zoom 2 has four columns; a 1024 pixel view spans at most three of them
        assert!(!tileset.is_empty());
        assert!(tileset.len() <= 3 * 4);
        assert_eq!(queue.count_tasks(), tileset.len());
    }
}
