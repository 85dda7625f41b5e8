//! Tile lifecycle: identities become records, records are throttled into
//! loads, loads complete (or fail), and records are retired when the
//! viewport stops needing them.

pub mod cache;
pub mod loader;
pub mod record;
pub mod source;
pub mod surface;

pub use cache::{CacheStats, CompletionStatus, RecomputeOutcome, RetiredTile, TileCache};
pub use loader::{Completion, LoadTicket, ThreadLoader, TileCompletion, TileLoader, TileRequest};
pub use record::{TileLoadState, TileRecord};
pub use source::{OpenStreetMapSource, TileSource, UrlTemplateSource};
pub use surface::{NullSurface, TileSurface};
