use crate::core::geo::TileId;
use crate::core::projection::TilePlacement;
use std::time::Duration;

/// The drawing side of the map. It owns opacity transitions; the cache never
/// waits for them.
pub trait TileSurface<H> {
    /// A tile finished loading: start drawing it, fading in over `fade`.
    fn show(&mut self, id: TileId, handle: &H, placement: TilePlacement, fade: Duration);

    /// The view moved: reposition and resize an already shown tile.
    fn place(&mut self, id: TileId, handle: &H, placement: TilePlacement);

    /// The cache dropped the tile. Fade out the image, if there is one, and
    /// release it afterwards.
    fn retire(&mut self, id: TileId, handle: Option<H>, fade: Duration);
}

/// Surface for headless use; discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

impl<H> TileSurface<H> for NullSurface {
    fn show(&mut self, _id: TileId, _handle: &H, _placement: TilePlacement, _fade: Duration) {}

    fn place(&mut self, _id: TileId, _handle: &H, _placement: TilePlacement) {}

    fn retire(&mut self, _id: TileId, _handle: Option<H>, _fade: Duration) {}
}
