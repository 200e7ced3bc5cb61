// ShareBin - local record-keeper for community donation bins
// Exposes all modules for use in the CLI and tests

pub mod db;
pub mod error;
pub mod filter;
pub mod markers;
pub mod model;
pub mod seed;
pub mod staleness;
pub mod store;

// Re-export commonly used types
pub use error::StoreError;
pub use filter::{visible, FilterPredicates};
pub use markers::{Marker, MarkerSet, ReconcileOutcome};
pub use model::{AcceptedCategories, BinId, BinRecord, BinStatus, Category, NewBin};
pub use staleness::{default_threshold, is_stale, stale_favorite_count, stale_favorites};
pub use store::{BinStore, Snapshot, Subscription};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
