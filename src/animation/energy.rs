//! Energy pool that turns raw wheel deltas into gradual zoom changes.
//!
//! Every request drains a fixed fraction of whatever energy is left, so a
//! burst of wheel events decays geometrically instead of zooming by the sum
//! of all deltas. The pool refills a little every frame.

use crate::core::config::EnergyConfig;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollEnergyManager {
    current_energy: f64,
    max_energy: f64,
    recharge_rate: f64,
    request_rate: f64,
}

impl ScrollEnergyManager {
    /// An empty pool with the default rates. It fills up over the first frames.
    pub fn new() -> Self {
        Self::with_config(&EnergyConfig::default())
    }

    pub fn with_config(config: &EnergyConfig) -> Self {
        Self {
            current_energy: 0.0,
            max_energy: config.max_energy,
            recharge_rate: config.recharge_rate,
            request_rate: config.request_rate,
        }
    }

    pub fn current_energy(&self) -> f64 {
        self.current_energy
    }

    pub fn max_energy(&self) -> f64 {
        self.max_energy
    }

    /// Overrides the stored energy, clamped to `[0, max_energy]`.
    pub fn set_current_energy(&mut self, energy: f64) {
        self.current_energy = energy.clamp(0.0, self.max_energy);
    }

    /// Moves the energy a fixed fraction of the way toward the maximum.
    /// Called once per frame.
    pub fn recharge(&mut self) {
        let diff = (self.max_energy - self.current_energy) * self.recharge_rate;
        self.current_energy += diff;
    }

    /// Requests `requested` energy and returns the granted amount.
    ///
    /// The grant is `min(available, requested)` where `available` is
    /// `request_rate` of the current energy, but the pool is always drained by
    /// the full `available`. A single request can therefore never take more
    /// than `request_rate` of the pool, however large it is. Negative requests
    /// mirror positive ones.
    pub fn request_energy(&mut self, requested: f64) -> f64 {
        if requested < 0.0 {
            return -self.request_energy(-requested);
        }

        let available = self.current_energy * self.request_rate;
        self.current_energy -= available;
        available.min(requested)
    }
}

impl Default for ScrollEnergyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScrollEnergyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} of {}", self.current_energy, self.max_energy)
    }
}
