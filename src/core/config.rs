//! Configuration system for tile loading and viewport motion tuning
//!
//! This module provides a hierarchical configuration that groups the tile
//! pipeline, the motion physics and the wheel energy pool. Presets are
//! available through [`MapProfile`]; custom values can be loaded from JSON.

use crate::core::constants::{
    DOUBLE_CLICK_MS, FADE_DURATION_MS, MAX_CONCURRENT_LOADS, MAX_LINEAR_ZOOM, MIN_LINEAR_ZOOM,
    PREFETCH_MARGIN, WHEEL_NOTCH,
};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum MapProfile {
    /// The stock feel
    Standard,
    /// Less damping, quicker settling
    Snappy,
    /// Long glides and slow zoom easing
    Cinematic,
    Custom(MapConfig),
}

impl MapProfile {
    pub fn resolve(&self) -> MapConfig {
        match self {
            Self::Standard => MapConfig::default(),
            Self::Snappy => MapConfig {
                tile_loading: TileLoadingConfig {
                    fade_duration_ms: 50,
                    ..TileLoadingConfig::default()
                },
                motion: MotionConfig {
                    friction: 0.99,
                    zoom_smoothing: 5.0,
                    glide_factor: 0.3,
                    ..MotionConfig::default()
                },
                energy: EnergyConfig {
                    recharge_rate: 0.06,
                    ..EnergyConfig::default()
                },
            },
            Self::Cinematic => MapConfig {
                tile_loading: TileLoadingConfig {
                    fade_duration_ms: 250,
                    ..TileLoadingConfig::default()
                },
                motion: MotionConfig {
                    zoom_smoothing: 20.0,
                    glide_factor: 0.08,
                    ..MotionConfig::default()
                },
                energy: EnergyConfig::default(),
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for MapProfile {
    fn default() -> Self {
        Self::Standard
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub tile_loading: TileLoadingConfig,
    pub motion: MotionConfig,
    pub energy: EnergyConfig,
}

impl MapConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects values the tile pipeline or the physics cannot run with.
    pub fn validate(&self) -> Result<()> {
        let tiles = &self.tile_loading;
        if tiles.max_concurrent_loads == 0 {
            return Err(MapError::Config("max_concurrent_loads must be at least 1".into()));
        }
        if !(tiles.prefetch_margin > 0.0) {
            return Err(MapError::Config("prefetch_margin must be positive".into()));
        }

        let motion = &self.motion;
        if !(motion.friction > 0.0 && motion.friction <= 1.0) {
            return Err(MapError::Config("friction must be in (0, 1]".into()));
        }
        if !(motion.spring_factor > 0.0 && motion.spring_factor < 1.0) {
            return Err(MapError::Config("spring_factor must be in (0, 1)".into()));
        }
        if !(motion.glide_factor > 0.0 && motion.glide_factor <= 1.0) {
            return Err(MapError::Config("glide_factor must be in (0, 1]".into()));
        }
        if !(motion.zoom_smoothing >= 1.0) {
            return Err(MapError::Config("zoom_smoothing must be at least 1".into()));
        }
        if !(motion.time_step > 0.0 && motion.zoom_tolerance > 0.0 && motion.wheel_notch > 0.0) {
            return Err(MapError::Config(
                "time_step, zoom_tolerance and wheel_notch must be positive".into(),
            ));
        }
        if !(motion.min_zoom > 0.0 && motion.min_zoom < motion.max_zoom) {
            return Err(MapError::Config("min_zoom must be positive and below max_zoom".into()));
        }

        let energy = &self.energy;
        if !(energy.max_energy > 0.0) {
            return Err(MapError::Config("max_energy must be positive".into()));
        }
        if !(energy.recharge_rate > 0.0 && energy.recharge_rate <= 1.0) {
            return Err(MapError::Config("recharge_rate must be in (0, 1]".into()));
        }
        if !(energy.request_rate > 0.0 && energy.request_rate <= 1.0) {
            return Err(MapError::Config("request_rate must be in (0, 1]".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLoadingConfig {
    /// Global cap on tiles in the `Loading` state
    pub max_concurrent_loads: usize,
    /// Screen half-extents are divided by this before computing the tile range
    pub prefetch_margin: f64,
    /// Upper edge of the kept zoom window. Only `level` and `level - 1` are
    /// ever requested, so this just drops finer records left over from
    /// before a zoom-out, which the required set already retires.
    pub keep_levels_above: u8,
    /// Tracked tiles may be this many levels coarser than the current
    /// level. At 0 the `level - 1` prefetch is skipped entirely.
    pub keep_levels_below: u8,
    pub fade_duration_ms: u64,
}

impl TileLoadingConfig {
    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_duration_ms)
    }
}

impl Default for TileLoadingConfig {
    fn default() -> Self {
        Self {
            max_concurrent_loads: MAX_CONCURRENT_LOADS,
            prefetch_margin: PREFETCH_MARGIN,
            keep_levels_above: 1,
            keep_levels_below: 2,
            fade_duration_ms: FADE_DURATION_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub friction: f64,
    pub spring_factor: f64,
    /// Integration step applied to the pan speed
    pub time_step: f64,
    /// Each frame closes `1/zoom_smoothing` of the log-distance to the target zoom
    pub zoom_smoothing: f64,
    /// Relative zoom difference below which zoom easing stops
    pub zoom_tolerance: f64,
    /// Fraction of the remaining distance a fly-to covers per frame
    pub glide_factor: f64,
    pub double_click_ms: u64,
    pub wheel_notch: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl MotionConfig {
    pub fn double_click_window(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            friction: 0.999,
            spring_factor: 0.7,
            time_step: 0.1,
            zoom_smoothing: 10.0,
            zoom_tolerance: 0.02,
            glide_factor: 0.15,
            double_click_ms: DOUBLE_CLICK_MS,
            wheel_notch: WHEEL_NOTCH,
            min_zoom: MIN_LINEAR_ZOOM,
            max_zoom: MAX_LINEAR_ZOOM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    pub max_energy: f64,
    /// Fraction of the missing energy restored per frame
    pub recharge_rate: f64,
    /// Fraction of the current energy a single request drains
    pub request_rate: f64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            max_energy: 2.0,
            recharge_rate: 0.03,
            request_rate: 0.2,
        }
    }
}
