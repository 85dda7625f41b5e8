//! Map builder for fluent controller configuration
//!
//! Collects a profile or explicit configuration, the tile source, the
//! viewport size and the starting view, then validates everything once in
//! [`MapBuilder::build`].

use crate::core::{
    config::{MapConfig, MapProfile},
    constants::{DEFAULT_CURRENT_ZOOM, DEFAULT_POSITION, DEFAULT_TARGET_ZOOM, MAX_ZOOM},
    controller::{MapController, ViewportState},
    geo::{LatLng, Point},
    projection::CoordinateProjection,
};
use crate::tiles::{
    loader::TileLoader,
    source::{OpenStreetMapSource, TileSource},
};
use crate::{MapError, Result};

/// Builder for creating and configuring [`MapController`] instances
pub struct MapBuilder {
    profile: MapProfile,
    tile_source: Option<Box<dyn TileSource>>,
    size: Point,
    /// Starting view as latitude, longitude and tile level
    view: Option<(LatLng, i32)>,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self {
            profile: MapProfile::default(),
            tile_source: None,
            size: Point::default(),
            view: None,
        }
    }

    /// Use one of the preset tunings
    pub fn with_profile(mut self, profile: MapProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Use an explicit configuration
    pub fn with_config(mut self, config: MapConfig) -> Self {
        self.profile = MapProfile::Custom(config);
        self
    }

    /// Set the tile source; OpenStreetMap is used otherwise
    pub fn with_tile_source(mut self, source: Box<dyn TileSource>) -> Self {
        self.tile_source = Some(source);
        self
    }

    /// Set the map area in pixels
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = Point::new(width, height);
        self
    }

    /// Start centered on `lat`/`lng` at tile level `level`, without animating
    pub fn with_view(mut self, lat: f64, lng: f64, level: i32) -> Self {
        self.view = Some((LatLng::new(lat, lng), level));
        self
    }

    /// Build the controller with the configured options
    pub fn build<L: TileLoader>(self, loader: L) -> Result<MapController<L>> {
        let config = self.profile.resolve();
        config.validate()?;

        let state = match self.view {
            Some((center, level)) => {
                if !(0..=MAX_ZOOM as i32).contains(&level) {
                    return Err(MapError::InvalidZoomLevel {
                        level,
                        max: MAX_ZOOM,
                    });
                }
                if !center.lat.is_finite() || !center.lng.is_finite() {
                    return Err(MapError::InvalidCoordinates(format!(
                        "({}, {})",
                        center.lat, center.lng
                    )));
                }
                let zoom = CoordinateProjection::level_to_zoom(level as f64);
                ViewportState::new(
                    CoordinateProjection::view_position_for(&center),
                    zoom,
                    zoom,
                    self.size,
                )
            }
            None => ViewportState::new(
                Point::new(DEFAULT_POSITION.0, DEFAULT_POSITION.1),
                DEFAULT_CURRENT_ZOOM,
                DEFAULT_TARGET_ZOOM,
                self.size,
            ),
        };

        let source = self
            .tile_source
            .unwrap_or_else(|| Box::new(OpenStreetMapSource::new()));
        log::debug!(
            "building map: level {}, size {}x{}",
            state.current_zoom_level,
            state.size.x,
            state.size.y
        );
        Ok(MapController::from_parts(config, state, source, loader))
    }
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MotionConfig;
    use crate::tiles::loader::{Completion, TileRequest};

    struct NoopLoader;

    impl TileLoader for NoopLoader {
        type Handle = ();

        fn load(&mut self, _request: TileRequest, completion: Completion<()>) {
            completion.succeed(());
        }
    }

    #[test]
    fn test_default_build_matches_controller_defaults() {
        let map = MapBuilder::new().build(NoopLoader).unwrap();
        assert_eq!(map.state(), &ViewportState::default());
        assert_eq!(map.config(), &MapConfig::default());
    }

    #[test]
    fn test_with_view_starts_settled() {
        let map = MapBuilder::new()
            .with_size(800.0, 600.0)
            .with_view(0.0, 0.0, 5)
            .build(NoopLoader)
            .unwrap();
        assert_eq!(map.zoom_level(), 5);
        assert_eq!(map.state().current_zoom, map.target_zoom());
        assert_eq!(map.state().current_position, Point::new(0.5, 0.5));
        assert_eq!(map.state().size, Point::new(800.0, 600.0));
    }

    #[test]
    fn test_rejects_bad_level_and_config() {
        let result = MapBuilder::new().with_view(0.0, 0.0, 17).build(NoopLoader);
        assert!(matches!(
            result,
            Err(MapError::InvalidZoomLevel { level: 17, .. })
        ));

        let config = MapConfig {
            motion: MotionConfig {
                friction: -1.0,
                ..MotionConfig::default()
            },
            ..MapConfig::default()
        };
        let result = MapBuilder::new().with_config(config).build(NoopLoader);
        assert!(matches!(result, Err(MapError::Config(_))));
    }
}
