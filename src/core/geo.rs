use crate::core::constants::MAX_ZOOM;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Latitude limit of the square Web Mercator world.
pub const MAX_LATITUDE: f64 = 85.0511287798;

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }

    /// Wraps longitude to [-180, 180] range
    pub fn wrap_lng(lng: f64) -> f64 {
        let wrapped = lng % 360.0;
        if wrapped > 180.0 {
            wrapped - 360.0
        } else if wrapped < -180.0 {
            wrapped + 360.0
        } else {
            wrapped
        }
    }

    /// Clamps latitude to valid range
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A 2D vector used for normalized map positions, speeds and pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply(&self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }

    /// `|x| + |y|`, the distance measure the viewport physics thresholds use
    pub fn manhattan_length(&self) -> f64 {
        self.x.abs() + self.y.abs()
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Wraps a raw tile index into `[0, 2^zoom)`.
///
/// The grid wraps around in both directions, so `-1` at zoom 2 becomes `3`.
pub fn wrap(value: i64, zoom: u8) -> u32 {
    value.rem_euclid(1_i64 << zoom) as u32
}

/// Identity of a tile slot as the viewport asks for it.
///
/// Coordinates are kept *unwrapped*: a tile one world-width east of another
/// is a different slot even though both resolve to the same image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileId {
    pub zoom: u8,
    pub x: i64,
    pub y: i64,
}

impl TileId {
    /// Creates an identity, clamping `zoom` into `[0, MAX_ZOOM]`.
    pub fn new(zoom: i32, x: i64, y: i64) -> Self {
        Self {
            zoom: zoom.clamp(0, MAX_ZOOM as i32) as u8,
            x,
            y,
        }
    }

    /// The coordinate of the image backing this slot.
    ///
    /// Zoom levels above [`MAX_ZOOM`] fall back to their ancestor tile, then
    /// `x`/`y` are wrapped into the grid of the resulting level.
    pub fn resource_coord(&self) -> TileCoord {
        let (mut zoom, mut x, mut y) = (self.zoom, self.x, self.y);
        while zoom > MAX_ZOOM {
            zoom -= 1;
            x = x.div_euclid(2);
            y = y.div_euclid(2);
        }
        TileCoord::new(wrap(x, zoom), wrap(y, zoom), zoom)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Represents a tile coordinate in the slippy map tile system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Checks if the tile is valid for the given zoom level
    pub fn is_valid(&self) -> bool {
        let max_coord = 1_u64 << self.z;
        (self.x as u64) < max_coord && (self.y as u64) < max_coord
    }
}
