//! Types exchanged with external tile loaders

use crate::core::style::{SourceDescriptor, StyleLayer};
use crate::prelude::Arc;
use crate::traits::TaskQueue;
use std::any::Any;

/// Decoded tile data; opaque to the scheduler
pub type TilePayload = Arc<dyn Any + Send + Sync>;

/// Zero-argument function returning a worker pool's current queue depth
pub type WorkerMonitor = Arc<dyn Fn() -> usize + Send + Sync>;

/// Everything a [`LoaderContext`](crate::traits::LoaderContext) needs to build one loader
pub struct LoaderRequest<'a> {
    pub key: &'a str,
    pub source: &'a SourceDescriptor,
    /// Layers drawing from this source, in style order
    pub layers: Vec<&'a StyleLayer>,
    pub glyphs: Option<&'a str>,
    /// Worker threads the loader should use; 0 for raster sources
    pub threads: usize,
    /// The queue the scheduler sorts; loaders that schedule their own
    /// follow-up work should enqueue into it
    pub queue: Arc<dyn TaskQueue>,
}

impl std::fmt::Debug for LoaderRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderRequest")
            .field("key", &self.key)
            .field("kind", &self.source.kind)
            .field("layers", &self.layers.len())
            .field("glyphs", &self.glyphs)
            .field("threads", &self.threads)
            .finish()
    }
}
