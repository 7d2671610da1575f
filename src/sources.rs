//! Orchestration of every tile source named by a style
//!
//! [`Sources`] is built once per style. It keeps one [`Source`] for each
//! supported, referenced style entry, and on every [`load_tilesets`] call
//! refreshes all of their tilesets before reprioritizing the shared task
//! queue in a single pass.
//!
//! [`load_tilesets`]: Sources::load_tilesets

use crate::background::tasks::SharedTaskQueue;
use crate::core::config::{SchedulerProfile, SourcesConfig, UnsupportedSourcePolicy};
use crate::core::style::{SourceKind, Style, StyleLayer};
use crate::core::viewport::{Transform, Viewport};
use crate::prelude::{Arc, HashMap};
use crate::reporter::Reporter;
use crate::tiles::factory::TileFactory;
use crate::tiles::loader::{LoaderRequest, WorkerMonitor};
use crate::tiles::source::Source;
use crate::tiles::tileset::Tileset;
use crate::traits::{LoaderContext, TaskQueue, TileLoader};
use crate::{Error, Result};

/// Snapshot of every active source's tileset, keyed by source key
pub type Tilesets = HashMap<String, Arc<Tileset>>;

/// Builder for [`Sources`]
#[derive(Default)]
pub struct SourcesBuilder {
    config: SourcesConfig,
    queue: Option<Arc<dyn TaskQueue>>,
    reporter: Option<Reporter>,
}

impl SourcesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: SourcesConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_profile(mut self, profile: SchedulerProfile) -> Self {
        self.config = profile.resolve();
        self
    }

    /// Feed tasks into an existing queue instead of a fresh [`SharedTaskQueue`]
    pub fn with_queue(mut self, queue: Arc<dyn TaskQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Build the orchestrator for `style`, asking `context` for one loader per source
    pub fn build(self, style: &Style, context: &dyn LoaderContext) -> Result<Sources> {
        self.config.validate()?;

        let queue: Arc<dyn TaskQueue> = self
            .queue
            .unwrap_or_else(|| Arc::new(SharedTaskQueue::new()));
        let reporter = self.reporter.unwrap_or_default();
        let config = self.config;

        let mut layer_sources: HashMap<String, String> = HashMap::default();
        for layer in &style.layers {
            if let Some(source) = &layer.source {
                layer_sources.insert(layer.id.clone(), source.clone());
            }
        }

        let mut sources = Vec::new();
        let mut monitors: Vec<WorkerMonitor> = Vec::new();

        for (key, descriptor) in style.sources.iter() {
            let layers: Vec<&StyleLayer> = style.layers_for_source(key).collect();
            let threads = match &descriptor.kind {
                SourceKind::Vector => config.vector_threads,
                SourceKind::Geojson => config.geojson_threads,
                _ => 0,
            };

            let loader: Option<Arc<dyn TileLoader>> = match &descriptor.kind {
                SourceKind::Unsupported(kind) => {
                    match config.unsupported_sources {
                        UnsupportedSourcePolicy::Ignore => {}
                        UnsupportedSourcePolicy::Warn => {
                            log::warn!("skipping source '{}' of unsupported type '{}'", key, kind);
                        }
                        UnsupportedSourcePolicy::Reject => {
                            return Err(Error::UnsupportedSource {
                                key: key.clone(),
                                kind: kind.clone(),
                            });
                        }
                    }
                    continue;
                }
                kind if kind.is_vector_family() && layers.is_empty() => {
                    log::debug!("skipping source '{}': no layer references it", key);
                    continue;
                }
                SourceKind::Vector | SourceKind::Geojson => context.vector_loader(LoaderRequest {
                    key,
                    source: descriptor,
                    layers,
                    glyphs: style.glyphs.as_deref(),
                    threads,
                    queue: queue.clone(),
                }),
                SourceKind::Raster => context.raster_loader(LoaderRequest {
                    key,
                    source: descriptor,
                    layers,
                    glyphs: style.glyphs.as_deref(),
                    threads,
                    queue: queue.clone(),
                }),
            };

            let Some(loader) = loader else {
                log::debug!("skipping source '{}': no loader available", key);
                continue;
            };

            if let Some(monitor) = loader.worker_monitor() {
                monitors.push(monitor);
            }

            let factory =
                TileFactory::new(key.clone(), loader, queue.clone(), reporter.clone(), &config);
            sources.push(Source::new(key.clone(), descriptor.clone(), factory));
        }

        log::info!(
            "initialised {} of {} sources ({} with workers)",
            sources.len(),
            style.sources.len(),
            monitors.len()
        );

        Ok(Sources {
            sources,
            layer_sources,
            tilesets: Arc::new(HashMap::default()),
            monitors,
            queue,
            reporter,
            config,
        })
    }
}

/// Every active tile source of one style, sharing a single task queue
pub struct Sources {
    sources: Vec<Source>,
    /// Layer id to source key, last layer wins
    layer_sources: HashMap<String, String>,
    tilesets: Arc<Tilesets>,
    monitors: Vec<WorkerMonitor>,
    queue: Arc<dyn TaskQueue>,
    reporter: Reporter,
    config: SourcesConfig,
}

impl Sources {
    /// Build with default configuration and a fresh queue
    pub fn new(style: &Style, context: &dyn LoaderContext) -> Result<Self> {
        SourcesBuilder::new().build(style, context)
    }

    pub fn builder() -> SourcesBuilder {
        SourcesBuilder::new()
    }

    /// [`load_tilesets_with_ratio`](Self::load_tilesets_with_ratio) at a pixel ratio of 1
    pub fn load_tilesets(&mut self, viewport: Viewport, transform: Transform) -> Option<f64> {
        self.load_tilesets_with_ratio(viewport, transform, 1.0)
    }

    /// Refresh every source's tileset for the view and reprioritize the queue
    ///
    /// Returns the mean loaded fraction across sources, or `None` when the
    /// style left no active source.
    pub fn load_tilesets_with_ratio(
        &mut self,
        viewport: Viewport,
        transform: Transform,
        pix_ratio: f64,
    ) -> Option<f64> {
        let mut tilesets: Tilesets = HashMap::default();
        let mut total = 0.0;

        for source in &self.sources {
            let tileset = source.get_tiles(&viewport, &transform, pix_ratio);
            total += tileset.loaded();
            tilesets.insert(source.key().to_string(), Arc::new(tileset));
        }

        self.tilesets = Arc::new(tilesets);
        self.queue.sort_tasks();

        if self.sources.is_empty() {
            return None;
        }
        let ratio = total / self.sources.len() as f64;
        log::debug!(
            "loaded {:.3} across {} sources, {} tasks queued",
            ratio,
            self.sources.len(),
            self.queue.count_tasks()
        );
        Some(ratio)
    }

    /// Latest tileset of the source `layer_id` draws from
    pub fn get_layer_tiles(&self, layer_id: &str) -> Option<Arc<Tileset>> {
        let source = self.layer_sources.get(layer_id)?;
        self.tilesets.get(source).cloned()
    }

    /// Tiles waiting in the worker pools of all vector-family loaders
    pub fn worker_tasks(&self) -> usize {
        self.monitors.iter().map(|monitor| monitor()).sum()
    }

    /// Depth of the shared task queue
    pub fn queued_tasks(&self) -> usize {
        self.queue.count_tasks()
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Snapshot from the most recent load
    pub fn tilesets(&self) -> Arc<Tilesets> {
        self.tilesets.clone()
    }

    pub fn source_keys(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|source| source.key())
    }

    pub fn source(&self, key: &str) -> Option<&Source> {
        self.sources.iter().find(|source| source.key() == key)
    }

    pub fn layer_source(&self, layer_id: &str) -> Option<&str> {
        self.layer_sources.get(layer_id).map(String::as_str)
    }

    pub fn queue(&self) -> Arc<dyn TaskQueue> {
        self.queue.clone()
    }

    pub fn config(&self) -> &SourcesConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources")
            .field("sources", &self.sources)
            .field("layer_sources", &self.layer_sources)
            .field("monitors", &self.monitors.len())
            .field("queued_tasks", &self.queue.count_tasks())
            .finish()
    }
}
