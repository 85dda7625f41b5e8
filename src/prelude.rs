//! Prelude module for common glidemap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use glidemap::prelude::*;`

pub use crate::core::{
    builder::MapBuilder,
    config::{EnergyConfig, MapConfig, MapProfile, MotionConfig, TileLoadingConfig},
    constants::MAX_ZOOM,
    controller::{FrameReport, MapController, ViewportState},
    geo::{LatLng, Point, TileCoord, TileId},
    projection::{CoordinateProjection, TilePlacement, TileRange},
    viewport::Viewport,
};

pub use crate::animation::{energy::ScrollEnergyManager, fade::FadeTracker};

pub use crate::input::events::{InputEvent, KeyCode, MouseButton};

pub use crate::tiles::{
    cache::{CacheStats, CompletionStatus, TileCache},
    loader::{Completion, LoadTicket, ThreadLoader, TileLoader, TileRequest},
    record::{TileLoadState, TileRecord},
    source::{OpenStreetMapSource, TileSource, UrlTemplateSource},
    surface::{NullSurface, TileSurface},
};

pub use crate::{Error as MapError, Result};

pub use std::{sync::Arc, time::Duration};

pub use instant::Instant;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
