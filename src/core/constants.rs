//! Core constants shared by the tile pipeline and the viewport physics.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Highest tile zoom level the tile servers are asked for.
pub const MAX_ZOOM: u8 = 16;

/// Tiles allowed in the `Loading` state at the same time.
pub const MAX_CONCURRENT_LOADS: usize = 3;

/// Offset between `log2(world pixels per unit)` and the tile zoom level.
pub const ZOOM_LEVEL_OFFSET: f64 = 7.9;

/// Lower clamp for the linear target zoom.
pub const MIN_LINEAR_ZOOM: f64 = 100.0;

/// Upper clamp for the linear target zoom.
pub const MAX_LINEAR_ZOOM: f64 = 100_000_000.0;

/// The visible half-extent is divided by this factor when computing the
/// required tile range, which widens the range slightly past the screen edge.
pub const PREFETCH_MARGIN: f64 = 1.8;

/// Extra pixels added to each tile edge to hide seams between neighbours.
pub const ANTI_SEAM_PX: f64 = 0.5;

/// Opacity transition length for tiles appearing and disappearing.
pub const FADE_DURATION_MS: u64 = 100;

/// Wheel delta reported for a single notch by most platforms.
pub const WHEEL_NOTCH: f64 = 120.0;

/// Two presses closer than this are a double click.
pub const DOUBLE_CLICK_MS: u64 = 200;

/// Start position of a fresh controller (normalized view offset).
pub const DEFAULT_POSITION: (f64, f64) = (0.476317347467935, 0.669774812152535);

/// Start zoom of a fresh controller.
pub const DEFAULT_CURRENT_ZOOM: f64 = 250_000.0;

/// Start target zoom of a fresh controller; the first frames glide toward it.
pub const DEFAULT_TARGET_ZOOM: f64 = 300_000.0;
