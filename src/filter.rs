// Filter/Search Composer - derives the visible subset of a snapshot.
// Pure: same inputs, same output, snapshot order preserved.

use serde::{Deserialize, Serialize};

use crate::model::{AcceptedCategories, BinRecord, BinStatus};
use crate::store::Snapshot;

/// Ephemeral view-layer filter state: category flags, a verified-only
/// toggle, and free-text search. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicates {
    pub categories: AcceptedCategories,
    pub verified_only: bool,
    pub search: String,
}

impl FilterPredicates {
    /// True when every stage admits everything.
    pub fn is_empty(&self) -> bool {
        !self.categories.any() && !self.verified_only && self.search.trim().is_empty()
    }
}

/// Conjunction of three passes over the snapshot, in its order:
/// 1. categories - no flags set admits all; otherwise a record passes if it
///    accepts at least one of the set categories (OR, not AND);
/// 2. verified-only;
/// 3. case-insensitive substring search over name and operator.
pub fn visible<'a>(snapshot: &'a Snapshot, filters: &FilterPredicates) -> Vec<&'a BinRecord> {
    let query = filters.search.trim().to_lowercase();

    snapshot
        .iter()
        .filter(|bin| passes_categories(bin, &filters.categories))
        .filter(|bin| !filters.verified_only || bin.status == BinStatus::Verified)
        .filter(|bin| passes_search(bin, &query))
        .collect()
}

fn passes_categories(bin: &BinRecord, categories: &AcceptedCategories) -> bool {
    if !categories.any() {
        return true;
    }
    bin.accepted.intersects(categories)
}

fn passes_search(bin: &BinRecord, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    if bin.name.to_lowercase().contains(query) {
        return true;
    }
    bin.operator
        .as_deref()
        .unwrap_or("")
        .to_lowercase()
        .contains(query)
}

// ============================================================================
// TESTS
// ============================================================================
