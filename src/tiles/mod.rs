pub mod factory;
pub mod grid;
pub mod loader;
pub mod source;
pub mod tileset;

// Re-exports for convenience
pub use factory::{tile_priority, TileFactory};
pub use grid::TileGrid;
pub use loader::{LoaderRequest, TilePayload, WorkerMonitor};
pub use source::Source;
pub use tileset::{Tile, TileStatus, Tileset};
