//! Opacity bookkeeping for tiles appearing and disappearing.
//!
//! The tile cache forgets a tile the moment it is evicted; the surface keeps
//! drawing the old image until its fade-out completes. [`FadeTracker`] is the
//! piece a surface embeds to do that. A retiring image and a fresh tile with
//! the same identity can coexist.

use super::easing::{lerp, EasingType};
use crate::core::geo::TileId;
use crate::prelude::HashMap;
use instant::Instant;
use std::time::Duration;

/// One timed opacity transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    pub start: Instant,
    pub duration: Duration,
    pub from: f32,
    pub to: f32,
    pub easing: EasingType,
}

impl Fade {
    pub fn new(start: Instant, duration: Duration, from: f32, to: f32, easing: EasingType) -> Self {
        Self {
            start,
            duration,
            from,
            to,
            easing,
        }
    }

    fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        now.duration_since(self.start).as_secs_f64() / self.duration.as_secs_f64()
    }

    pub fn opacity_at(&self, now: Instant) -> f32 {
        let t = self.easing.apply(self.progress(now));
        lerp(self.from as f64, self.to as f64, t) as f32
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}

#[derive(Debug)]
struct Retiring<H> {
    id: TileId,
    handle: H,
    fade: Fade,
}

/// Tracks fade-ins of shown tiles and fade-outs of retired ones
#[derive(Debug)]
pub struct FadeTracker<H> {
    duration: Duration,
    easing: EasingType,
    shown: HashMap<TileId, Fade>,
    retiring: Vec<Retiring<H>>,
}

impl<H> FadeTracker<H> {
    pub fn new(duration: Duration) -> Self {
        Self::with_easing(duration, EasingType::Linear)
    }

    pub fn with_easing(duration: Duration, easing: EasingType) -> Self {
        Self {
            duration,
            easing,
            shown: HashMap::default(),
            retiring: Vec::new(),
        }
    }

    /// Starts fading a tile in from transparent.
    pub fn fade_in(&mut self, id: TileId, now: Instant) {
        let fade = Fade::new(now, self.duration, 0.0, 1.0, self.easing);
        self.shown.insert(id, fade);
    }

    /// Starts fading a tile out from whatever opacity it has right now.
    pub fn fade_out(&mut self, id: TileId, handle: H, now: Instant) {
        let from = self
            .shown
            .remove(&id)
            .map(|fade| fade.opacity_at(now))
            .unwrap_or(1.0);
        let fade = Fade::new(now, self.duration, from, 0.0, self.easing);
        self.retiring.push(Retiring { id, handle, fade });
    }

    /// Opacity of a shown tile, `None` when the tile is not shown
    pub fn opacity(&self, id: &TileId, now: Instant) -> Option<f32> {
        self.shown.get(id).map(|fade| fade.opacity_at(now))
    }

    /// Images still fading out with their current opacity
    pub fn retiring(&self, now: Instant) -> impl Iterator<Item = (TileId, &H, f32)> + '_ {
        self.retiring
            .iter()
            .map(move |r| (r.id, &r.handle, r.fade.opacity_at(now)))
    }

    pub fn retiring_len(&self) -> usize {
        self.retiring.len()
    }

    /// Drops finished fade-outs and hands their images back for release.
    pub fn sweep(&mut self, now: Instant) -> Vec<H> {
        let (done, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.retiring)
            .into_iter()
            .partition(|r| r.fade.is_finished(now));
        self.retiring = pending;
        done.into_iter().map(|r| r.handle).collect()
    }
}
