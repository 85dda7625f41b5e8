//! Per-frame viewport controller.
//!
//! Input events only move *targets* (target position, target zoom, fly-to
//! destination). [`MapController::tick`] advances the current view toward
//! them once per display frame, refreshes the tracked tile set when the view
//! changed, and starts at most one tile load.

use crate::animation::energy::ScrollEnergyManager;
use crate::core::config::MapConfig;
use crate::core::constants::{
    DEFAULT_CURRENT_ZOOM, DEFAULT_POSITION, DEFAULT_TARGET_ZOOM, MAX_LINEAR_ZOOM, MAX_ZOOM,
    MIN_LINEAR_ZOOM,
};
use crate::core::geo::{LatLng, Point, TileId};
use crate::core::projection::CoordinateProjection;
use crate::core::viewport::Viewport;
use crate::input::events::{InputEvent, KeyCode, MouseButton};
use crate::prelude::HashSet;
use crate::tiles::cache::TileCache;
use crate::tiles::loader::TileLoader;
use crate::tiles::source::{OpenStreetMapSource, TileSource};
use crate::tiles::surface::TileSurface;
use crate::{MapError, Result};
use instant::Instant;
use serde::{Deserialize, Serialize};

/// Motion state of the view, advanced by [`MapController::tick`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    /// View offset in normalized map units
    pub current_position: Point,
    /// Where a drag wants the view to be; only followed while dragging
    pub target_position: Point,
    pub current_speed: Point,
    /// Linear zoom: screen pixels per normalized map unit
    pub current_zoom: f64,
    pub(crate) target_zoom: f64,
    /// Tile level derived from `current_zoom`, always within `[0, MAX_ZOOM]`
    pub current_zoom_level: u8,
    /// Fly-to destination; overrides drag and momentum while set
    pub move_to_position: Option<Point>,
    /// Map area in pixels
    pub size: Point,
}

impl ViewportState {
    pub fn new(position: Point, current_zoom: f64, target_zoom: f64, size: Point) -> Self {
        Self {
            current_position: position,
            target_position: position,
            current_speed: Point::default(),
            current_zoom,
            target_zoom: target_zoom.clamp(MIN_LINEAR_ZOOM, MAX_LINEAR_ZOOM),
            current_zoom_level: CoordinateProjection::zoom_to_level(current_zoom),
            move_to_position: None,
            size,
        }
    }

    pub fn target_zoom(&self) -> f64 {
        self.target_zoom
    }

    /// What the screen shows right now
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.current_position, self.current_zoom, self.size)
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new(
            Point::new(DEFAULT_POSITION.0, DEFAULT_POSITION.1),
            DEFAULT_CURRENT_ZOOM,
            DEFAULT_TARGET_ZOOM,
            Point::default(),
        )
    }
}

/// What happened during one [`MapController::tick`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// The frame was skipped because rendering is suspended
    pub suspended: bool,
    /// Position, zoom or size changed materially
    pub changed: bool,
    pub requested: usize,
    pub retired: usize,
    /// Tiles whose load completed and were handed to the surface
    pub shown: usize,
    /// Tile whose load started this frame
    pub admitted: Option<TileId>,
}

pub struct MapController<L: TileLoader> {
    config: MapConfig,
    state: ViewportState,
    energy: ScrollEnergyManager,
    cache: TileCache<L::Handle>,
    source: Box<dyn TileSource>,
    loader: L,
    suspended: bool,
    /// Input changed the view since the last frame
    dirty: bool,
    dragging: bool,
    last_click: Option<Instant>,
    last_pointer: Option<Point>,
}

impl<L: TileLoader> MapController<L> {
    /// A controller with default settings fetching from OpenStreetMap
    pub fn new(loader: L) -> Self {
        Self::from_parts(
            MapConfig::default(),
            ViewportState::default(),
            Box::new(OpenStreetMapSource::new()),
            loader,
        )
    }

    pub fn with_config(config: MapConfig, source: Box<dyn TileSource>, loader: L) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, ViewportState::default(), source, loader))
    }

    pub(crate) fn from_parts(
        config: MapConfig,
        mut state: ViewportState,
        source: Box<dyn TileSource>,
        loader: L,
    ) -> Self {
        state.target_zoom = state
            .target_zoom
            .clamp(config.motion.min_zoom, config.motion.max_zoom);
        Self {
            energy: ScrollEnergyManager::with_config(&config.energy),
            cache: TileCache::new(config.tile_loading.clone()),
            config,
            state,
            source,
            loader,
            suspended: false,
            dirty: true,
            dragging: false,
            last_click: None,
            last_pointer: None,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn viewport(&self) -> Viewport {
        self.state.viewport()
    }

    pub fn cache(&self) -> &TileCache<L::Handle> {
        &self.cache
    }

    pub fn energy(&self) -> &ScrollEnergyManager {
        &self.energy
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    /// Geographic coordinate at the screen center
    pub fn center(&self) -> LatLng {
        CoordinateProjection::center_of(self.state.current_position)
    }

    pub fn zoom_level(&self) -> u8 {
        self.state.current_zoom_level
    }

    pub fn target_zoom(&self) -> f64 {
        self.state.target_zoom
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Frames are skipped until [`Self::resume_rendering`] is called.
    pub fn suspend_rendering(&mut self) {
        self.suspended = true;
    }

    pub fn resume_rendering(&mut self) {
        self.suspended = false;
    }

    /// Runs `f` with rendering suspended so that no frame observes a
    /// half-applied change, then restores the previous suspension state.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let was_suspended = self.suspended;
        self.suspended = true;
        let result = f(self);
        self.suspended = was_suspended;
        result
    }

    fn set_target_zoom(&mut self, zoom: f64) {
        let motion = &self.config.motion;
        self.state.target_zoom = zoom.clamp(motion.min_zoom, motion.max_zoom);
    }

    /// Flies to `latitude`/`longitude` and eases the zoom to `zoom_level`.
    ///
    /// Fails with [`MapError::InvalidZoomLevel`] outside `[0, MAX_ZOOM]`,
    /// leaving the view untouched.
    pub fn set_view(&mut self, latitude: f64, longitude: f64, zoom_level: i32) -> Result<()> {
        if !(0..=MAX_ZOOM as i32).contains(&zoom_level) {
            return Err(MapError::InvalidZoomLevel {
                level: zoom_level,
                max: MAX_ZOOM,
            });
        }
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(MapError::InvalidCoordinates(format!(
                "({}, {})",
                latitude, longitude
            )));
        }

        log::info!(
            "set view to ({:.5}, {:.5}) at level {}",
            latitude,
            longitude,
            zoom_level
        );
        self.batch(|map| {
            map.set_target_zoom(CoordinateProjection::level_to_zoom(zoom_level as f64));
            map.state.move_to_position = Some(CoordinateProjection::view_position_for(
                &LatLng::new(latitude, longitude),
            ));
        });
        Ok(())
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        self.handle_input_at(event, Instant::now());
    }

    /// Applies an input event that happened at `now`.
    pub fn handle_input_at(&mut self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::PointerDown { position, button } => {
                if button == MouseButton::Left {
                    self.pointer_pressed(position, now);
                }
            }
            InputEvent::PointerMove { position } => self.pointer_moved(position),
            InputEvent::PointerUp { position } => {
                self.last_pointer = Some(position);
                self.dragging = false;
            }
            InputEvent::PointerExit => self.dragging = false,
            InputEvent::Wheel { delta } => self.wheel(delta),
            InputEvent::KeyPress { key } => match key {
                KeyCode::Plus => {
                    self.set_target_zoom(self.state.target_zoom * 2.0);
                    self.dirty = true;
                }
                KeyCode::Minus => {
                    self.set_target_zoom(self.state.target_zoom / 2.0);
                    self.dirty = true;
                }
                KeyCode::Other(_) => {}
            },
            InputEvent::Resize { size } => {
                self.state.size = size;
                self.dirty = true;
            }
        }
    }

    fn pointer_pressed(&mut self, position: Point, now: Instant) {
        self.state.move_to_position = None;

        let window = self.config.motion.double_click_window();
        let is_double_click = self
            .last_click
            .map_or(false, |last| now.duration_since(last) < window);
        if is_double_click {
            self.set_target_zoom(self.state.target_zoom * 2.0);
            self.state.move_to_position = Some(CoordinateProjection::position_centering_pixel(
                position,
                &self.viewport(),
            ));
            log::debug!("double click at ({:.1}, {:.1})", position.x, position.y);
        }
        self.last_click = Some(now);

        self.state.target_position = self.state.current_position;
        self.last_pointer = Some(position);
        self.dragging = true;
    }

    fn pointer_moved(&mut self, position: Point) {
        if !self.dragging {
            return;
        }
        if let Some(last) = self.last_pointer {
            let delta = position
                .subtract(&last)
                .multiply(1.0 / self.state.current_zoom);
            self.state.target_position = self.state.target_position.add(&delta);
            self.dirty = true;
        }
        self.last_pointer = Some(position);
    }

    fn wheel(&mut self, delta: f64) {
        if !delta.is_finite() {
            log::warn!("ignoring non-finite wheel delta {}", delta);
            return;
        }
        let granted = self
            .energy
            .request_energy(delta / self.config.motion.wheel_notch);
        self.set_target_zoom(self.state.target_zoom * granted.exp());
    }

    /// Eases the zoom geometrically toward the target. Returns whether it moved.
    fn step_zoom(&mut self) -> bool {
        let ratio = self.state.current_zoom / self.state.target_zoom;
        if (ratio - 1.0).abs() <= self.config.motion.zoom_tolerance {
            return false;
        }
        self.state.current_zoom /= ratio.powf(1.0 / self.config.motion.zoom_smoothing);
        self.state.current_zoom_level = CoordinateProjection::zoom_to_level(self.state.current_zoom);
        true
    }

    /// Follows the fly-to target if there is one, otherwise the drag spring
    /// and momentum. Returns whether the position moved.
    fn step_position(&mut self) -> bool {
        let motion = &self.config.motion;
        let state = &mut self.state;
        let threshold = 1.0 / state.target_zoom;

        if let Some(target) = state.move_to_position {
            let diff = state.current_position.subtract(&target);
            state.current_position = state
                .current_position
                .subtract(&diff.multiply(motion.glide_factor));
            if diff.manhattan_length() < threshold {
                state.move_to_position = None;
            }
            return true;
        }

        let displacement = if self.dragging {
            state.current_position.subtract(&state.target_position)
        } else {
            Point::default()
        };
        state.current_speed = state
            .current_speed
            .multiply(motion.friction)
            .subtract(&displacement)
            .multiply(motion.spring_factor);

        if state.current_speed.manhattan_length() > threshold {
            state.current_position = state
                .current_position
                .add(&state.current_speed.multiply(motion.time_step));
            return true;
        }
        false
    }

    /// Advances the view by one display frame.
    pub fn tick<S>(&mut self, surface: &mut S) -> FrameReport
    where
        S: TileSurface<L::Handle>,
    {
        if self.suspended {
            return FrameReport {
                suspended: true,
                ..FrameReport::default()
            };
        }

        let mut report = FrameReport::default();
        let fade = self.config.tile_loading.fade_duration();
        let finished = self.cache.pump_completions();

        self.energy.recharge();
        let mut changed = std::mem::take(&mut self.dirty);
        changed |= self.step_zoom();
        changed |= self.step_position();
        report.changed = changed;

        let viewport = self.viewport();
        if changed {
            let outcome = self
                .cache
                .recompute_required_set(&viewport, self.state.current_zoom_level);
            report.requested = outcome.created.len();
            report.retired = outcome.retired.len();
            for retired in outcome.retired {
                surface.retire(retired.id, retired.handle, fade);
            }

            let finished: HashSet<TileId> = finished.iter().copied().collect();
            for (id, handle) in self.cache.loaded() {
                if !finished.contains(&id) {
                    surface.place(id, handle, CoordinateProjection::to_pixel(&id, &viewport));
                }
            }
        }

        for id in finished {
            if let Some(handle) = self.cache.get(&id).and_then(|record| record.handle()) {
                surface.show(id, handle, CoordinateProjection::to_pixel(&id, &viewport), fade);
                report.shown += 1;
            }
        }

        report.admitted = self.cache.admit_next(self.source.as_ref(), &mut self.loader);

        log::trace!(
            "frame: zoom {:.0} -> {:.0} (level {}), position ({:.6}, {:.6}), energy {}",
            self.state.current_zoom,
            self.state.target_zoom,
            self.state.current_zoom_level,
            self.state.current_position.x,
            self.state.current_position.y,
            self.energy
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::loader::{Completion, TileRequest};
    use crate::tiles::surface::NullSurface;
    use std::time::Duration;

    #[derive(Default)]
    struct HeldLoader {
        requests: Vec<(TileRequest, Completion<u8>)>,
    }

    impl TileLoader for HeldLoader {
        type Handle = u8;

        fn load(&mut self, request: TileRequest, completion: Completion<u8>) {
            self.requests.push((request, completion));
        }
    }

    fn controller() -> MapController<HeldLoader> {
        MapController::new(HeldLoader::default())
    }

    #[test]
    fn test_zoom_eases_without_overshoot() {
        let mut map = controller();
        assert_eq!(map.state().current_zoom, 250_000.0);
        assert_eq!(map.target_zoom(), 300_000.0);

        map.tick(&mut NullSurface);
        let zoom = map.state().current_zoom;
        assert!(zoom > 250_000.0);
        assert!(zoom < 300_000.0);

        let mut previous = zoom;
        for _ in 0..200 {
            map.tick(&mut NullSurface);
            let zoom = map.state().current_zoom;
            assert!(zoom >= previous);
            assert!(zoom <= 300_000.0);
            previous = zoom;
        }
        assert!((previous / 300_000.0 - 1.0).abs() <= 0.02);
    }

    #[test]
    fn test_zoom_stops_inside_tolerance() {
        let mut map = controller();
        map.state.current_zoom = 301_000.0;
        let report = map.tick(&mut NullSurface);
        assert_eq!(map.state().current_zoom, 301_000.0);
        // the first frame always refreshes tiles
        assert!(report.changed);
        assert!(!map.tick(&mut NullSurface).changed);
    }

    #[test]
    fn test_glide_moves_fifteen_percent() {
        let mut map = controller();
        map.state.current_zoom = map.state.target_zoom;
        let start = map.state().current_position;
        let target = start.add(&Point::new(0.01, -0.02));
        map.state.move_to_position = Some(target);

        map.tick(&mut NullSurface);
        let moved = map.state().current_position.subtract(&start);
        assert!((moved.x - 0.0015).abs() < 1e-12);
        assert!((moved.y + 0.003).abs() < 1e-12);

        for _ in 0..500 {
            map.tick(&mut NullSurface);
        }
        assert!(map.state().move_to_position.is_none());
        assert!(map.state().current_position.distance_to(&target) < 1.0 / map.target_zoom());
    }

    #[test]
    fn test_drag_moves_view_and_momentum_decays() {
        let mut map = controller();
        map.state.current_zoom = map.state.target_zoom;
        map.handle_input(InputEvent::Resize {
            size: Point::new(400.0, 300.0),
        });
        let start = map.state().current_position;
        let t0 = Instant::now();
        map.handle_input_at(
            InputEvent::PointerDown {
                position: Point::new(100.0, 100.0),
                button: MouseButton::Left,
            },
            t0,
        );
        map.handle_input(InputEvent::PointerMove {
            position: Point::new(160.0, 100.0),
        });
        let expected = start.x + 60.0 / map.state().current_zoom;
        assert!((map.state().target_position.x - expected).abs() < 1e-12);

        for _ in 0..60 {
            map.tick(&mut NullSurface);
        }
        assert!(map.state().current_position.x > start.x);

        map.handle_input(InputEvent::PointerUp {
            position: Point::new(160.0, 100.0),
        });
        assert!(!map.is_dragging());
        for _ in 0..2000 {
            map.tick(&mut NullSurface);
        }
        assert!(map.state().current_speed.manhattan_length() <= 1.0 / map.target_zoom());
    }

    #[test]
    fn test_moves_are_ignored_without_drag() {
        let mut map = controller();
        let target = map.state().target_position;
        map.handle_input(InputEvent::PointerMove {
            position: Point::new(10.0, 10.0),
        });
        assert_eq!(map.state().target_position, target);
    }

    #[test]
    fn test_double_click_zooms_toward_pointer() {
        let mut map = controller();
        map.handle_input(InputEvent::Resize {
            size: Point::new(800.0, 600.0),
        });
        let t0 = Instant::now();
        let click = Point::new(600.0, 150.0);
        let down = InputEvent::PointerDown {
            position: click,
            button: MouseButton::Left,
        };
        map.handle_input_at(down.clone(), t0);
        assert!(map.state().move_to_position.is_none());
        let viewport = map.viewport();
        map.handle_input_at(down, t0 + Duration::from_millis(120));

        assert_eq!(map.target_zoom(), 600_000.0);
        let target = map.state().move_to_position.unwrap();
        let expected = CoordinateProjection::position_centering_pixel(click, &viewport);
        assert_eq!(target, expected);
    }

    #[test]
    fn test_slow_clicks_are_not_double_clicks() {
        let mut map = controller();
        let t0 = Instant::now();
        let down = InputEvent::PointerDown {
            position: Point::new(1.0, 1.0),
            button: MouseButton::Left,
        };
        map.handle_input_at(down.clone(), t0);
        map.handle_input_at(down, t0 + Duration::from_millis(450));
        assert_eq!(map.target_zoom(), 300_000.0);
        assert!(map.state().move_to_position.is_none());
    }

    #[test]
    fn test_wheel_uses_energy() {
        let mut map = controller();
        // empty pool: nothing granted
        map.handle_input(InputEvent::Wheel { delta: 120.0 });
        assert_eq!(map.target_zoom(), 300_000.0);

        map.energy.set_current_energy(2.0);
        map.handle_input(InputEvent::Wheel { delta: 120.0 });
        let expected = 300_000.0 * 0.4_f64.exp();
        assert!((map.target_zoom() - expected).abs() < 1e-6);

        map.handle_input(InputEvent::Wheel { delta: -120.0 });
        assert!(map.target_zoom() < expected);
    }

    #[test]
    fn test_non_finite_wheel_is_ignored() {
        let mut map = controller();
        map.energy.set_current_energy(2.0);
        for delta in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            map.handle_input(InputEvent::Wheel { delta });
        }
        assert_eq!(map.target_zoom(), 300_000.0);
        assert_eq!(map.energy().current_energy(), 2.0);
    }

    #[test]
    fn test_pointer_down_cancels_fly_to() {
        let mut map = controller();
        map.handle_input(InputEvent::Resize {
            size: Point::new(800.0, 600.0),
        });
        map.set_view(-33.86, 151.2, 10).unwrap();
        map.tick(&mut NullSurface);
        assert!(map.state().move_to_position.is_some());

        map.handle_input(InputEvent::PointerDown {
            position: Point::new(400.0, 300.0),
            button: MouseButton::Left,
        });
        assert!(map.state().move_to_position.is_none());

        let before = map.state().current_position;
        map.tick(&mut NullSurface);
        assert_eq!(map.state().current_position, before);
        assert!(map.state().move_to_position.is_none());
    }

    #[test]
    fn test_target_zoom_is_clamped() {
        let mut map = controller();
        for _ in 0..40 {
            map.handle_input(InputEvent::KeyPress { key: KeyCode::Plus });
        }
        assert_eq!(map.target_zoom(), 1e8);
        for _ in 0..80 {
            map.handle_input(InputEvent::KeyPress {
                key: KeyCode::Minus,
            });
        }
        assert_eq!(map.target_zoom(), 100.0);
    }

    #[test]
    fn test_suspended_frames_do_nothing() {
        let mut map = controller();
        map.suspend_rendering();
        let before = map.state().clone();
        let report = map.tick(&mut NullSurface);
        assert!(report.suspended);
        assert_eq!(map.state(), &before);
        map.resume_rendering();
        assert!(!map.tick(&mut NullSurface).suspended);
    }

    #[test]
    fn test_batch_restores_suspension() {
        let mut map = controller();
        let inside = map.batch(|map| map.is_suspended());
        assert!(inside);
        assert!(!map.is_suspended());
    }
}
