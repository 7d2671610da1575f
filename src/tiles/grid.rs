//! Tile covering for a viewport and transform
//!
//! Follows the d3-tile layout: the zoom implied by the transform scale is
//! rounded to the nearest integer level and clamped to what the source
//! serves. A view zoomed out below the source's lowest level covers nothing.
//! Tiles are laid out from the world's top-left corner. Columns wrap
//! around the antimeridian; rows are clamped to the world.

use crate::core::geo::{Point, TileCoord};
use crate::core::viewport::{Transform, Viewport};
use crate::prelude::HashSet;
use serde::{Deserialize, Serialize};

/// Placement of one zoom level's tiles on screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    /// Integer zoom the tiles are requested at
    pub zoom: u8,
    /// On-screen size of one tile in CSS pixels
    pub scale: f64,
    /// Screen position of the world's top-left corner in CSS pixels
    pub translate: Point,
    /// Viewport size in CSS pixels
    pub size: Point,
    /// The view is zoomed out past the source's lowest level
    pub below_min_zoom: bool,
}

impl TileGrid {
    /// Computes the grid for `viewport` (device pixels) under `transform` (CSS pixels)
    pub fn new(
        viewport: &Viewport,
        transform: &Transform,
        pix_ratio: f64,
        tile_size: u32,
        min_zoom: u8,
        max_zoom: u8,
    ) -> Self {
        let tile_size = tile_size.max(1);
        let k = transform.scale;
        let z = if k > 0.0 {
            transform.zoom(tile_size).max(0.0)
        } else {
            0.0
        };
        let z = if z.is_finite() { z } else { 0.0 };

        let (lo, hi) = if min_zoom <= max_zoom {
            (min_zoom, max_zoom)
        } else {
            (max_zoom, min_zoom)
        };
        let rounded = z.round() as i64;
        let z0 = rounded.clamp(lo as i64, hi.min(30) as i64) as u8;

        Self {
            zoom: z0,
            scale: tile_size as f64 * 2_f64.powf(z - z0 as f64),
            translate: Point::new(
                transform.translate.x - k / 2.0,
                transform.translate.y - k / 2.0,
            ),
            size: viewport.css_size(pix_ratio),
            below_min_zoom: rounded < lo as i64,
        }
    }

    /// Number of tiles along one axis at the grid zoom
    pub fn dimension(&self) -> u32 {
        1u32 << self.zoom
    }

    /// Viewport centre in tile units at the grid zoom
    pub fn center(&self) -> Point {
        Point::new(
            (self.size.x / 2.0 - self.translate.x) / self.scale,
            (self.size.y / 2.0 - self.translate.y) / self.scale,
        )
    }

    /// All tiles intersecting the viewport, column-wrapped and deduplicated
    ///
    /// Empty when the view is below the source's lowest zoom: the source has
    /// nothing to draw there.
    pub fn coords(&self) -> Vec<TileCoord> {
        let drawable = self.size.x > 0.0
            && self.size.y > 0.0
            && self.scale > 0.0
            && self.scale.is_finite()
            && self.translate.x.is_finite()
            && self.translate.y.is_finite();
        if self.below_min_zoom || !drawable {
            return Vec::new();
        }

        let dim = self.dimension() as i64;

        // Whole-world shifts do not change which wrapped columns are visible
        let world_width = self.scale * dim as f64;
        let tx = self.translate.x.rem_euclid(world_width);
        let x_min = (-tx / self.scale).floor() as i64;
        let x_max = ((self.size.x - tx) / self.scale).ceil() as i64;
        // A viewport wider than the world would otherwise repeat every column
        let x_max = x_max.min(x_min + dim);

        let y_min = (-self.translate.y / self.scale).floor().clamp(0.0, dim as f64) as i64;
        let y_max = ((self.size.y - self.translate.y) / self.scale)
            .ceil()
            .clamp(0.0, dim as f64) as i64;

        let mut seen = HashSet::default();
        let mut coords = Vec::new();
        for y in y_min..y_max {
            for x in x_min..x_max {
                let wrapped = x.rem_euclid(dim) as u32;
                let coord = TileCoord::new(wrapped, y as u32, self.zoom);
                if seen.insert(coord) {
                    coords.push(coord);
                }
            }
        }
        coords
    }

    /// Distance in tiles from the viewport centre, accounting for column wrap
    pub fn distance(&self, coord: &TileCoord) -> f64 {
        let center = self.center();
        let tile = coord.center();
        let dim = self.dimension() as f64;
        let dx = (tile.x - center.x).rem_euclid(dim);
        let dx = dx.min(dim - dx);
        let dy = tile.y - center.y;
        (dx * dx + dy * dy).sqrt()
    }
}
