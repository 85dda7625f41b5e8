//! # glidemap
//!
//! A slippy-map engine core: streams fixed-size raster tiles keyed by
//! `(zoom, x, y)` and animates the viewport with momentum physics.
//!
//! The crate does not fetch or decode imagery and does not draw anything.
//! Hosts plug in a [`TileSource`] (resource keys), a [`TileLoader`]
//! (asynchronous fetch) and a [`TileSurface`] (drawing), then call
//! [`MapController::tick`] once per display frame.

pub mod animation;
pub mod core;
pub mod input;
pub mod prelude;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    builder::MapBuilder,
    config::{EnergyConfig, MapConfig, MapProfile, MotionConfig, TileLoadingConfig},
    controller::{FrameReport, MapController, ViewportState},
    geo::{LatLng, Point, TileCoord, TileId},
    projection::{CoordinateProjection, TilePlacement, TileRange},
    viewport::Viewport,
};

pub use animation::{energy::ScrollEnergyManager, fade::FadeTracker};

pub use input::events::{InputEvent, KeyCode, MouseButton};

pub use tiles::{
    cache::{CacheStats, CompletionStatus, TileCache},
    loader::{Completion, LoadTicket, ThreadLoader, TileLoader, TileRequest},
    record::{TileLoadState, TileRecord},
    source::{OpenStreetMapSource, TileSource, UrlTemplateSource},
    surface::{NullSurface, TileSurface},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("zoom level {level} is out of range (0..={max})")]
    InvalidZoomLevel { level: i32, max: u8 },

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("tile load failed: {0}")]
    TileLoad(String),

    #[error("tile {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: TileId,
        from: &'static str,
        to: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs `env_logger` as the `log` backend, honouring `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
