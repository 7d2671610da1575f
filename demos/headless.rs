//! Drives a small style through the scheduler without any rendering
//!
//! Run with `RUST_LOG=debug cargo run --example headless` to watch tiles
//! being queued, reprioritized and loaded while the view pans.

use std::sync::atomic::{AtomicUsize, Ordering};
use tilemux::prelude::*;

const STYLE: &str = r#"{
    "version": 8,
    "glyphs": "https://fonts.example.com/{fontstack}/{range}.pbf",
    "sources": {
        "openmaptiles": { "type": "vector", "url": "https://tiles.example.com/v3.json" },
        "satellite": {
            "type": "raster",
            "tiles": [
                "https://a.imagery.example.com/{z}/{x}/{y}.jpg",
                "https://b.imagery.example.com/{z}/{x}/{y}.jpg"
            ],
            "tileSize": 256
        },
        "hills": { "type": "raster-dem", "url": "https://dem.example.com/tiles.json" }
    },
    "layers": [
        { "id": "background", "type": "background" },
        { "id": "imagery", "type": "raster", "source": "satellite" },
        { "id": "water", "type": "fill", "source": "openmaptiles", "source-layer": "water" },
        {
            "id": "roads",
            "type": "line",
            "source": "openmaptiles",
            "source-layer": "transportation"
        }
    ]
}"#;

/// Pretends to fetch a tile over the network
struct SimulatedLoader {
    descriptor: Option<SourceDescriptor>,
    latency: Duration,
    /// Tiles currently inside the simulated worker pool, if the loader has one
    in_worker: Option<Arc<AtomicUsize>>,
}

#[async_trait::async_trait]
impl TileLoader for SimulatedLoader {
    async fn load(&self, coord: TileCoord) -> tilemux::Result<TilePayload> {
        if let Some(in_worker) = &self.in_worker {
            in_worker.fetch_add(1, Ordering::SeqCst);
        }
        tokio::time::sleep(self.latency).await;
        if let Some(in_worker) = &self.in_worker {
            in_worker.fetch_sub(1, Ordering::SeqCst);
        }

        let label = match &self.descriptor {
            Some(descriptor) => descriptor.tile_url(coord).unwrap_or_else(|| coord.key()),
            None => coord.key(),
        };
        let payload: TilePayload = Arc::new(label);
        Ok(payload)
    }

    fn worker_monitor(&self) -> Option<WorkerMonitor> {
        let in_worker = self.in_worker.clone()?;
        Some(Arc::new(move || in_worker.load(Ordering::SeqCst)))
    }
}

struct DemoContext;

impl LoaderContext for DemoContext {
    fn raster_loader(&self, request: LoaderRequest<'_>) -> Option<Arc<dyn TileLoader>> {
        Some(Arc::new(SimulatedLoader {
            descriptor: Some(request.source.clone()),
            latency: Duration::from_millis(30),
            in_worker: None,
        }))
    }

    fn vector_loader(&self, request: LoaderRequest<'_>) -> Option<Arc<dyn TileLoader>> {
        log::info!(
            "vector loader for '{}' with {} layers on {} threads",
            request.key,
            request.layers.len(),
            request.threads
        );
        Some(Arc::new(SimulatedLoader {
            descriptor: None,
            latency: Duration::from_millis(60),
            in_worker: Some(Arc::new(AtomicUsize::new(0))),
        }))
    }
}

#[tokio::main]
async fn main() -> tilemux::Result<()> {
    tilemux::logging::init();

    let style = Style::from_json(STYLE)?;
    let config = SchedulerProfile::Balanced
        .resolve()
        .with_unsupported_sources(UnsupportedSourcePolicy::Warn);
    let mut sources = Sources::builder()
        .with_config(config.clone())
        .build(&style, &DemoContext)?;
    let driver = QueueDriver::spawn(sources.queue(), config.driver.clone())?;

    let viewport = Viewport::new(1280.0, 800.0);
    let mut center = LatLng::new(40.745, -73.885);

    for frame in 0..100 {
        // Drift east a little each frame
        center.lng += 0.002;
        let transform = Transform::from_center(center, 9.0, &viewport, 512);

        let Some(ratio) = sources.load_tilesets(viewport, transform) else {
            log::warn!("style has no usable sources");
            break;
        };
        let done = driver.try_recv_completed().len();

        println!(
            "frame {:3}: loaded {:5.1}%  queued {:3}  in workers {:2}  completed {:2}",
            frame,
            ratio * 100.0,
            sources.queued_tasks(),
            sources.worker_tasks(),
            done
        );

        if ratio >= 1.0 && sources.queued_tasks() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(16)).await;
    }

    driver.shutdown();
    let snapshot = serde_json::to_string_pretty(&sources.reporter().snapshot())?;
    println!("{}", snapshot);

    if let Some(imagery) = sources.get_layer_tiles("imagery") {
        println!(
            "imagery: {} tiles at zoom {}, {} loaded",
            imagery.len(),
            imagery.grid.zoom,
            imagery.count(TileStatus::Loaded)
        );
    }
    Ok(())
}
