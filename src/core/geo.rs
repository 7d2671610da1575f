use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Latitude beyond which Web Mercator is undefined
const MAX_LATITUDE: f64 = 85.0511287798;

/// Geographic position in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Position on the unit world square, `[-0.5, 0.5]` on both axes with y
    /// growing south. This is the frame a
    /// [`Transform`](crate::core::viewport::Transform) maps to the screen.
    pub fn to_world(&self) -> Point {
        let phi = self.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let mercator_y = (PI / 4.0 + phi / 2.0).tan().ln();
        Point::new(self.lng / 360.0, -mercator_y / (2.0 * PI))
    }
}

/// Pixel or tile-unit position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Slippy-map tile address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { z, x, y }
    }

    /// Stable string key, `z/x/y`, used by tilesets and the task queue
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }

    /// Centre of the tile in tile units at its own zoom
    pub fn center(&self) -> Point {
        Point::new(self.x as f64 + 0.5, self.y as f64 + 0.5)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_key_format() {
        let coord = TileCoord::new(301, 384, 10);
        assert_eq!(coord.key(), "10/301/384");
        assert_eq!(coord.to_string(), coord.key());
    }

    #[test]
    fn test_tile_center_in_tile_units() {
        assert_eq!(TileCoord::new(2, 5, 3).center(), Point::new(2.5, 5.5));
    }

    #[test]
    fn test_world_projection_origin_and_edges() {
        let origin = LatLng::new(0.0, 0.0).to_world();
        assert!(origin.x.abs() < 1e-12);
        assert!(origin.y.abs() < 1e-12);

        let east = LatLng::new(0.0, 180.0).to_world();
        assert!((east.x - 0.5).abs() < 1e-12);

        let north = LatLng::new(90.0, 0.0).to_world();
        assert!((north.y + 0.5).abs() < 1e-6);
    }
}
