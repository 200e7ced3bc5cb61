// Staleness Evaluator - decides which favorites are overdue for a
// re-verification reminder. Pure; the caller supplies `now` and hands the
// resulting count to the notification collaborator.

use chrono::{DateTime, Duration, Utc};

use crate::model::BinRecord;
use crate::store::Snapshot;

pub const DEFAULT_STALENESS_DAYS: i64 = 30;

/// Default reminder threshold: 30 days since the last verification event.
pub fn default_threshold() -> Duration {
    Duration::days(DEFAULT_STALENESS_DAYS)
}

/// A never-verified bin is always stale; otherwise stale iff strictly more
/// than `threshold` has elapsed since the last verification.
pub fn is_stale(
    last_verified_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> bool {
    match last_verified_at {
        None => true,
        Some(last) => now - last > threshold,
    }
}

/// Favorites due a reminder, in snapshot order.
pub fn stale_favorites(
    snapshot: &Snapshot,
    now: DateTime<Utc>,
    threshold: Duration,
) -> Vec<&BinRecord> {
    snapshot
        .iter()
        .filter(|bin| bin.is_favorite && is_stale(bin.last_verified_at, now, threshold))
        .collect()
}

/// The integer handed to the reminder collaborator.
pub fn stale_favorite_count(snapshot: &Snapshot, now: DateTime<Utc>, threshold: Duration) -> usize {
    stale_favorites(snapshot, now, threshold).len()
}

// ============================================================================
// TESTS
// ============================================================================
