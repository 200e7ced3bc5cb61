// Demo data seeding. Mirrors the "sample bins on first launch" behavior:
// a fixed set of Long Island donation bins with varied categories,
// favorites, verification ages, and one missing bin, inserted only when
// the store is empty.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::error::StoreError;
use crate::model::{AcceptedCategories, BinStatus, NewBin};
use crate::store::BinStore;

struct DemoBin {
    bin: NewBin,
    status: Option<(BinStatus, Duration)>,
}

fn demo(
    name: &str,
    operator: &str,
    latitude: f64,
    longitude: f64,
    photo_ref: &str,
    accepted: AcceptedCategories,
    is_favorite: bool,
    status: Option<(BinStatus, Duration)>,
) -> DemoBin {
    DemoBin {
        bin: NewBin {
            name: name.to_string(),
            operator: Some(operator.to_string()),
            latitude,
            longitude,
            photo_ref: Some(photo_ref.to_string()),
            accepted,
            is_favorite,
        },
        status,
    }
}

fn cats(clothing: bool, shoes: bool, electronics: bool, other: bool) -> AcceptedCategories {
    AcceptedCategories {
        clothing,
        shoes,
        electronics,
        other,
    }
}

fn demo_bins() -> Vec<DemoBin> {
    use BinStatus::*;

    vec![
        demo(
            "Campus Clothing Bin - Lot 1",
            "FSC Sustainability",
            40.7539,
            -73.4322,
            "b1",
            cats(true, true, false, false),
            true,
            Some((Verified, Duration::days(3))),
        ),
        demo(
            "Westbury Thrift Spot - Parking East",
            "Island Relief Collective",
            40.7680,
            -73.5855,
            "b2",
            cats(true, true, false, true),
            false,
            Some((Verified, Duration::days(7))),
        ),
        demo(
            "Huntington Station Recycle Point",
            "Suffolk Green Initiative",
            40.8360,
            -73.4150,
            "b3",
            cats(true, false, true, false),
            true,
            Some((Verified, Duration::days(1))),
        ),
        demo(
            "Farmingdale E-Waste Drop-Off",
            "Tech-Cycle LI",
            40.7305,
            -73.4500,
            "b4",
            cats(false, false, true, false),
            false,
            Some((Verified, Duration::days(10))),
        ),
        demo(
            "Massapequa Park Shoe Collection",
            "Stepping Up Foundation",
            40.6690,
            -73.4735,
            "b5",
            cats(false, true, true, false),
            true,
            Some((Verified, Duration::days(5))),
        ),
        demo(
            "Patchogue Avenue Clothing Bin",
            "Coastal Community Outreach",
            40.7710,
            -73.0100,
            "b7",
            cats(true, false, false, true),
            true,
            // Old enough to trip the default staleness threshold.
            Some((Verified, Duration::days(35))),
        ),
        demo(
            "Port Washington Miscellaneous Bin",
            "Harbor Helpers",
            40.8260,
            -73.7050,
            "b9",
            cats(true, true, true, true),
            false,
            None,
        ),
        demo(
            "Babylon Village Decommissioned Bin",
            "Retired Bins Co.",
            40.6975,
            -73.3270,
            "b10",
            cats(false, false, false, false),
            false,
            Some((Missing, Duration::days(60))),
        ),
    ]
}

/// Seed the demo bins when the store is empty. Returns how many were
/// inserted (0 when real data already exists).
pub fn seed_if_empty(store: &BinStore, now: DateTime<Utc>) -> Result<usize, StoreError> {
    if store.count() > 0 {
        return Ok(0);
    }

    let bins = demo_bins();
    let seeded = bins.len();
    for entry in bins {
        let id = store.insert(entry.bin)?;
        if let Some((status, age)) = entry.status {
            store.record_verification(id, status, now - age)?;
        }
    }

    info!(count = seeded, "seeded demo bins");
    Ok(seeded)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staleness;

    #[test]
    fn test_seed_only_when_empty() {
        let store = BinStore::open_in_memory().unwrap();
        let now = Utc::now();

        let seeded = seed_if_empty(&store, now).unwrap();
        assert!(seeded > 0);
        assert_eq!(store.count(), seeded);

        // Second run is a no-op.
        assert_eq!(seed_if_empty(&store, now).unwrap(), 0);
        assert_eq!(store.count(), seeded);
    }

    #[test]
    fn test_seed_includes_a_stale_favorite_and_a_missing_bin() {
        let store = BinStore::open_in_memory().unwrap();
        let now = Utc::now();
        seed_if_empty(&store, now).unwrap();

        let snapshot = store.snapshot();
        let stale = staleness::stale_favorites(&snapshot, now, staleness::default_threshold());
        assert!(!stale.is_empty());

        assert!(snapshot
            .iter()
            .any(|b| b.status == crate::model::BinStatus::Missing));
    }

    #[test]
    fn test_seed_names_are_valid() {
        for entry in demo_bins() {
            assert!(entry.bin.validate().is_ok());
        }
    }
}
