//! Pure mapping between geographic, normalized, tile and pixel space.
//!
//! Normalized map space is the Web Mercator square scaled to `[0, 1)` on both
//! axes. Tile space at zoom `z` is normalized space scaled by `2^z`. Pixel
//! space depends on a [`Viewport`]. Every function here is deterministic:
//! identical inputs always yield bit-identical outputs.

use crate::core::constants::{
    ANTI_SEAM_PX, MAX_ZOOM, PREFETCH_MARGIN, ZOOM_LEVEL_OFFSET,
};
use crate::core::geo::{LatLng, Point, TileId};
use crate::core::viewport::Viewport;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Where and how large a tile is drawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TilePlacement {
    pub left: f64,
    pub top: f64,
    /// Edge length in pixels, seam fudge included
    pub size: f64,
    /// Finer tiles stack above coarser ones
    pub z_index: i32,
}

/// Inclusive rectangle of tile indices at one zoom level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRange {
    pub zoom: u8,
    pub min_x: i64,
    pub max_x: i64,
    pub min_y: i64,
    pub max_y: i64,
}

impl TileRange {
    pub fn width(&self) -> u64 {
        (self.max_x - self.min_x + 1).max(0) as u64
    }

    pub fn height(&self) -> u64 {
        (self.max_y - self.min_y + 1).max(0) as u64
    }

    pub fn len(&self) -> u64 {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &TileId) -> bool {
        id.zoom == self.zoom
            && (self.min_x..=self.max_x).contains(&id.x)
            && (self.min_y..=self.max_y).contains(&id.y)
    }

    /// Every identity in the range, column by column
    pub fn iter(&self) -> impl Iterator<Item = TileId> + '_ {
        let zoom = self.zoom;
        (self.min_x..=self.max_x).flat_map(move |x| {
            (self.min_y..=self.max_y).map(move |y| TileId { zoom, x, y })
        })
    }
}

/// Stateless projection functions
pub struct CoordinateProjection;

impl CoordinateProjection {
    /// `2^zoom` as a float, valid for negative zooms too
    fn scale(zoom: i32) -> f64 {
        2_f64.powi(zoom)
    }

    /// Scales a normalized position into tile space at `zoom`.
    pub fn to_tile_space(position: Point, zoom: i32) -> Point {
        position.multiply(Self::scale(zoom))
    }

    /// Top-left corner of a tile in normalized map units.
    pub fn tile_origin(tile: &TileId) -> Point {
        let local_zoom = Self::scale(tile.zoom as i32);
        Point::new(tile.x as f64 / local_zoom, tile.y as f64 / local_zoom)
    }

    /// Screen placement of a tile.
    pub fn to_pixel(tile: &TileId, viewport: &Viewport) -> TilePlacement {
        let origin = Self::map_to_pixel(Self::tile_origin(tile), viewport);
        TilePlacement {
            left: origin.x,
            top: origin.y,
            size: viewport.zoom / Self::scale(tile.zoom as i32) + ANTI_SEAM_PX,
            z_index: tile.zoom as i32,
        }
    }

    /// Normalized map point to screen pixel.
    pub fn map_to_pixel(map: Point, viewport: &Viewport) -> Point {
        map.add(&viewport.position)
            .multiply(viewport.zoom)
            .add(&viewport.screen_center())
    }

    /// Screen pixel back to a normalized map point. Inverse of [`Self::map_to_pixel`].
    pub fn pixel_to_map(pixel: Point, viewport: &Viewport) -> Point {
        pixel
            .subtract(&viewport.screen_center())
            .multiply(1.0 / viewport.zoom)
            .subtract(&viewport.position)
    }

    /// The view offset that brings the map point under `pixel` to the screen center.
    pub fn position_centering_pixel(pixel: Point, viewport: &Viewport) -> Point {
        Self::pixel_to_map(pixel, viewport).multiply(-1.0)
    }

    /// Range of tiles at `zoom` needed to cover the viewport, using the default margin.
    pub fn required_tile_range(viewport: &Viewport, zoom: u8) -> TileRange {
        Self::required_tile_range_with_margin(viewport, zoom, PREFETCH_MARGIN)
    }

    /// Range of tiles at `zoom` covering the viewport corners.
    ///
    /// Each half-extent of the screen is divided by `margin` before being
    /// converted to map units, then the corners are floored/ceiled in tile space.
    pub fn required_tile_range_with_margin(
        viewport: &Viewport,
        zoom: u8,
        margin: f64,
    ) -> TileRange {
        let half_w = viewport.size.x / margin / viewport.zoom;
        let half_h = viewport.size.y / margin / viewport.zoom;

        let top_left = Point::new(-half_w, -half_h).subtract(&viewport.position);
        let bottom_right = Point::new(half_w, half_h).subtract(&viewport.position);

        let top_left = Self::to_tile_space(top_left, zoom as i32);
        let bottom_right = Self::to_tile_space(bottom_right, zoom as i32);

        TileRange {
            zoom,
            min_x: top_left.x.floor() as i64,
            max_x: bottom_right.x.ceil() as i64,
            min_y: top_left.y.floor() as i64,
            max_y: bottom_right.y.ceil() as i64,
        }
    }

    /// Web Mercator position of a coordinate in `[0, 1)` normalized units.
    pub fn normalized(lat_lng: &LatLng) -> Point {
        let lat_rad = LatLng::clamp_lat(lat_lng.lat).to_radians();
        let x = (lat_lng.lng + 180.0) / 360.0;
        let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0;
        Point::new(x, y)
    }

    /// View offset that centers `lat_lng` on screen.
    ///
    /// This is the mirrored normalized position, one world-width away from
    /// `-normalized(lat_lng)` on each axis, which is the same view since the
    /// tile grid wraps.
    pub fn view_position_for(lat_lng: &LatLng) -> Point {
        Self::normalized(&LatLng::new(-lat_lng.lat, -lat_lng.lng))
    }

    /// Geographic coordinate shown at the screen center for a view offset.
    pub fn center_of(position: Point) -> LatLng {
        let x = (-position.x).rem_euclid(1.0);
        let y = (-position.y).rem_euclid(1.0);
        let lng = x * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
        LatLng::new(lat, lng)
    }

    /// Tile zoom level for a linear zoom, clamped to `[0, MAX_ZOOM]`.
    pub fn zoom_to_level(zoom: f64) -> u8 {
        let level = (zoom.log2() - ZOOM_LEVEL_OFFSET).round();
        if level.is_nan() {
            return 0;
        }
        level.clamp(0.0, MAX_ZOOM as f64) as u8
    }

    /// Linear zoom that corresponds to a tile zoom level.
    pub fn level_to_zoom(level: f64) -> f64 {
        2_f64.powf(level + ZOOM_LEVEL_OFFSET)
    }
}
