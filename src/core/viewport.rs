use crate::core::geo::{LatLng, Point};
use serde::{Deserialize, Serialize};

/// The visible pixel area tiles must cover
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in device pixels
    pub width: f64,
    /// Height in device pixels
    pub height: f64,
}

impl Viewport {
    /// Creates a new viewport
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Size of the viewport in CSS pixels for the given device pixel ratio
    pub fn css_size(&self, pix_ratio: f64) -> Point {
        let ratio = if pix_ratio.is_finite() && pix_ratio > 0.0 {
            pix_ratio
        } else {
            1.0
        };
        Point::new(self.width / ratio, self.height / ratio)
    }
}

/// Pan/zoom state mapping the unit world square to CSS pixels
///
/// A world point `p` in `[-0.5, 0.5]²` lands on screen at `translate + scale * p`,
/// so `scale` is the width of the whole world in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation in pixels
    pub translate: Point,
    /// World size in pixels
    pub scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translate: Point::new(0.0, 0.0),
            scale: 1.0,
        }
    }
}

impl Transform {
    pub fn new(x: f64, y: f64, k: f64) -> Self {
        Self {
            translate: Point::new(x, y),
            scale: k,
        }
    }

    /// Create identity transform (no change)
    pub fn identity() -> Self {
        Self::default()
    }

    /// Builds the transform that centres `center` in a viewport at a
    /// fractional `zoom`, where zoom 0 shows the world as one `tile_size` tile.
    /// The viewport is taken at a device pixel ratio of 1.
    pub fn from_center(center: LatLng, zoom: f64, viewport: &Viewport, tile_size: u32) -> Self {
        let k = tile_size as f64 * 2_f64.powf(zoom);
        let world = center.to_world();
        let x = viewport.width / 2.0 - k * world.x;
        let y = viewport.height / 2.0 - k * world.y;
        Self::new(x, y, k)
    }

    /// Zoom level implied by the scale for tiles of `tile_size` pixels
    pub fn zoom(&self, tile_size: u32) -> f64 {
        (self.scale / tile_size as f64).log2()
    }
}
