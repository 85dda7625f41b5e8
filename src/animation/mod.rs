pub mod easing;
pub mod energy;
pub mod fade;

// Re-export commonly used types and functions for convenience
pub use easing::{lerp, EasingType};
pub use energy::ScrollEnergyManager;
pub use fade::FadeTracker;
