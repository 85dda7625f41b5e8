use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// Snapshot of what the screen currently shows: everything the projection
/// needs to map between normalized map space and pixels.
///
/// `position` is the view offset in normalized map units. A map point `p`
/// sits at the screen center when `p + position == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// View offset in normalized map units
    pub position: Point,
    /// Linear zoom: screen pixels per normalized map unit
    pub zoom: f64,
    /// The size of the viewport in pixels
    pub size: Point,
}

impl Viewport {
    /// Creates a new viewport
    pub fn new(position: Point, zoom: f64, size: Point) -> Self {
        Self {
            position,
            zoom,
            size,
        }
    }

    /// Pixel coordinate of the screen center
    pub fn screen_center(&self) -> Point {
        self.size.multiply(0.5)
    }

    /// Whether the viewport has a drawable area
    pub fn has_area(&self) -> bool {
        self.size.x > 0.0 && self.size.y > 0.0 && self.zoom > 0.0
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(Point::default(), 1.0, Point::default())
    }
}
