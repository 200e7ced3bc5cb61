// Marker Reconciler - keeps a mutable set of map markers in sync with the
// record set. Markers are keyed by bin id and survive reconciliation
// untouched when their record is unchanged, so a rendering backend never
// sees an unchanged pin destroyed and recreated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{BinId, BinRecord};
use crate::store::Snapshot;

/// Visual proxy for one bin record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: BinId,
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
    pub focused: bool,
}

impl Marker {
    fn from_record(bin: &BinRecord) -> Self {
        Marker {
            id: bin.id,
            latitude: bin.latitude,
            longitude: bin.longitude,
            label: bin.name.clone(),
            focused: false,
        }
    }

    fn mirrors(&self, bin: &BinRecord) -> bool {
        self.latitude == bin.latitude && self.longitude == bin.longitude && self.label == bin.name
    }
}

/// What one reconciliation pass did. Focus moves are tracked separately
/// because they must never show up as structural churn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    pub added: usize,
    pub removed: usize,
    pub updated: usize,
}

impl ReconcileOutcome {
    /// True when the marker set itself did not change (focus may have moved).
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.updated == 0
    }
}

/// The live marker set for the map view. One marker per record, at most one
/// focused.
#[derive(Debug, Default)]
pub struct MarkerSet {
    markers: BTreeMap<BinId, Marker>,
    focused: Option<BinId>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, id: BinId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    /// Markers in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    /// The focused marker, if any.
    pub fn focused(&self) -> Option<&Marker> {
        self.focused.and_then(|id| self.markers.get(&id))
    }

    /// Sync the marker set to `snapshot`: remove markers whose record is
    /// gone, add markers for new records, refresh position/label where the
    /// record changed, then move the focus flag. A focus-only change adds
    /// and removes nothing.
    pub fn reconcile(&mut self, snapshot: &Snapshot, focused: Option<BinId>) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        let before = self.markers.len();
        self.markers.retain(|id, _| snapshot.get(*id).is_some());
        outcome.removed = before - self.markers.len();

        for bin in snapshot.iter() {
            match self.markers.get_mut(&bin.id) {
                Some(marker) => {
                    if !marker.mirrors(bin) {
                        marker.latitude = bin.latitude;
                        marker.longitude = bin.longitude;
                        marker.label = bin.name.clone();
                        outcome.updated += 1;
                    }
                }
                None => {
                    self.markers.insert(bin.id, Marker::from_record(bin));
                    outcome.added += 1;
                }
            }
        }

        // Focus pass: a supplied id only takes effect if its record is in
        // the snapshot; otherwise nothing is focused.
        let new_focus = focused.filter(|id| self.markers.contains_key(id));
        if let Some(old) = self.focused.take() {
            if let Some(marker) = self.markers.get_mut(&old) {
                marker.focused = false;
            }
        }
        if let Some(id) = new_focus {
            if let Some(marker) = self.markers.get_mut(&id) {
                marker.focused = true;
                self.focused = Some(id);
            }
        }

        outcome
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewBin;
    use crate::store::BinStore;

    fn store_with(names: &[&str]) -> BinStore {
        let store = BinStore::open_in_memory().unwrap();
        for name in names {
            store.insert(NewBin::new(*name, 40.75, -73.43)).unwrap();
        }
        store
    }

    #[test]
    fn test_one_marker_per_record() {
        let store = store_with(&["Alpha", "Beta", "Gamma"]);
        let mut markers = MarkerSet::new();

        let outcome = markers.reconcile(&store.snapshot(), None);
        assert_eq!(outcome.added, 3);
        assert_eq!(markers.len(), store.count());
        assert!(markers.focused().is_none());
    }

    #[test]
    fn test_unchanged_snapshot_reconciles_as_noop() {
        let store = store_with(&["Alpha", "Beta"]);
        let snapshot = store.snapshot();
        let mut markers = MarkerSet::new();

        markers.reconcile(&snapshot, None);
        let second = markers.reconcile(&snapshot, None);
        assert!(second.is_noop());
    }

    #[test]
    fn test_removed_record_removes_marker_new_record_adds() {
        // Two stores with explicit ids stand in for before/after snapshots:
        // Alpha (1) disappears, Beta (2) stays, Delta (3) appears.
        let first = BinStore::open_in_memory().unwrap();
        first.upsert(NewBin::new("Alpha", 40.0, -73.0).into_record(1)).unwrap();
        first.upsert(NewBin::new("Beta", 41.0, -72.0).into_record(2)).unwrap();

        let mut markers = MarkerSet::new();
        markers.reconcile(&first.snapshot(), None);

        let second = BinStore::open_in_memory().unwrap();
        second.upsert(NewBin::new("Beta", 41.0, -72.0).into_record(2)).unwrap();
        second.upsert(NewBin::new("Delta", 42.0, -71.0).into_record(3)).unwrap();

        let outcome = markers.reconcile(&second.snapshot(), None);
        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.updated, 0);
        assert!(markers.get(1).is_none());
        assert!(markers.get(2).is_some());
        assert!(markers.get(3).is_some());
    }

    #[test]
    fn test_marker_identity_stable_and_label_refreshed() {
        let store = store_with(&["Old Label", "Steady"]);
        let mut markers = MarkerSet::new();
        markers.reconcile(&store.snapshot(), None);

        let id = store.snapshot().iter().find(|b| b.name == "Old Label").unwrap().id;
        let mut renamed = store.get(id).unwrap();
        renamed.name = "New Label".to_string();
        store.upsert(renamed).unwrap();

        let outcome = markers.reconcile(&store.snapshot(), None);
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.removed, 0);
        assert_eq!(outcome.updated, 1);
        assert_eq!(markers.get(id).unwrap().label, "New Label");
    }

    #[test]
    fn test_focus_change_alone_moves_only_the_flag() {
        let store = store_with(&["Alpha", "Beta"]);
        let snapshot = store.snapshot();
        let ids: Vec<_> = snapshot.iter().map(|b| b.id).collect();

        let mut markers = MarkerSet::new();
        markers.reconcile(&snapshot, Some(ids[0]));
        assert_eq!(markers.focused().unwrap().id, ids[0]);

        let outcome = markers.reconcile(&snapshot, Some(ids[1]));
        assert!(outcome.is_noop());
        assert_eq!(markers.focused().unwrap().id, ids[1]);
        assert!(!markers.get(ids[0]).unwrap().focused);

        let outcome = markers.reconcile(&snapshot, None);
        assert!(outcome.is_noop());
        assert!(markers.focused().is_none());
    }

    #[test]
    fn test_focus_on_absent_id_focuses_nothing() {
        let store = store_with(&["Alpha"]);
        let mut markers = MarkerSet::new();
        markers.reconcile(&store.snapshot(), Some(999));
        assert!(markers.focused().is_none());
        assert!(markers.iter().all(|m| !m.focused));
    }

    #[test]
    fn test_at_most_one_focused_marker() {
        let store = store_with(&["Alpha", "Beta", "Gamma"]);
        let snapshot = store.snapshot();
        let ids: Vec<_> = snapshot.iter().map(|b| b.id).collect();

        let mut markers = MarkerSet::new();
        for id in &ids {
            markers.reconcile(&snapshot, Some(*id));
            let focused_count = markers.iter().filter(|m| m.focused).count();
            assert_eq!(focused_count, 1);
        }
    }
}
