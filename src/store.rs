// Reactive bin store. One mutex is the single-writer serialization point:
// every mutation validates, applies the durable write, updates the
// in-memory mirror, and emits exactly one snapshot to every live
// subscriber before releasing the lock. Per-subscriber unbounded queues
// decouple delivery from the mutator without reordering.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::db;
use crate::error::StoreError;
use crate::model::{validate_name, BinId, BinRecord, BinStatus, NewBin};

// ============================================================================
// SNAPSHOT
// ============================================================================

/// An immutable, fully-materialized view of all records at one logical
/// point in the mutation sequence. Ordered by name ascending, id as the
/// tie-break. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Snapshot {
    seq: u64,
    bins: Arc<[BinRecord]>,
}

impl Snapshot {
    fn new(seq: u64, mut bins: Vec<BinRecord>) -> Self {
        bins.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Snapshot {
            seq,
            bins: bins.into(),
        }
    }

    /// Position of this snapshot in the mutation sequence. Strictly
    /// increasing across emissions; later snapshots never carry a smaller
    /// value (monotonic visibility).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BinRecord> {
        self.bins.iter()
    }

    pub fn as_slice(&self) -> &[BinRecord] {
        &self.bins
    }

    pub fn get(&self, id: BinId) -> Option<&BinRecord> {
        self.bins.iter().find(|b| b.id == id)
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a BinRecord;
    type IntoIter = std::slice::Iter<'a, BinRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.bins.iter()
    }
}

// ============================================================================
// SUBSCRIPTION
// ============================================================================

/// A live feed of snapshots. The current snapshot is delivered on
/// subscribe, then one per mutation, in emission order.
pub struct Subscription {
    rx: Receiver<Snapshot>,
}

impl Subscription {
    /// Block until the next snapshot. `None` once the store is dropped and
    /// the queue is drained.
    pub fn recv(&self) -> Option<Snapshot> {
        self.rx.recv().ok()
    }

    /// Non-blocking variant for poll-style consumers.
    pub fn try_recv(&self) -> Option<Snapshot> {
        self.rx.try_recv().ok()
    }

    /// Drain everything queued and return only the newest snapshot.
    pub fn latest(&self) -> Option<Snapshot> {
        let mut latest = None;
        while let Some(snapshot) = self.try_recv() {
            latest = Some(snapshot);
        }
        latest
    }
}

// ============================================================================
// BIN STORE
// ============================================================================

struct StoreInner {
    conn: Connection,
    bins: BTreeMap<BinId, BinRecord>,
    next_id: BinId,
    seq: u64,
    subscribers: Vec<Sender<Snapshot>>,
}

/// Observable, durable collection of bin records. Shareable across threads
/// behind an `Arc`; all mutations serialize on the internal mutex.
pub struct BinStore {
    inner: Mutex<StoreInner>,
}

impl BinStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn)?;
        info!(path = %path.display(), "opened bin store");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        db::setup_database(&conn)?;

        let mut bins = BTreeMap::new();
        for bin in db::get_all_bins(&conn)? {
            bins.insert(bin.id, bin);
        }
        let next_id = db::max_bin_id(&conn)? + 1;

        debug!(count = bins.len(), next_id, "loaded bin records");

        Ok(BinStore {
            inner: Mutex::new(StoreInner {
                conn,
                bins,
                next_id,
                seq: 0,
                subscribers: Vec::new(),
            }),
        })
    }

    /// Insert a new bin. Assigns the next identity, persists, then emits.
    /// Fails with `Validation` on a blank name, leaving the store untouched.
    pub fn insert(&self, bin: NewBin) -> Result<BinId, StoreError> {
        validate_name(&bin.name)?;

        let mut inner = self.inner.lock();
        let id = inner.next_id;
        let record = bin.into_record(id);

        db::upsert_bin(&inner.conn, &record)?;
        inner.next_id = id + 1;
        inner.bins.insert(id, record);
        debug!(id, "inserted bin");

        inner.emit();
        Ok(id)
    }

    /// Insert-or-replace by identity. Idempotent under an identical record;
    /// the id counter never re-issues an id this call has taken.
    pub fn upsert(&self, record: BinRecord) -> Result<(), StoreError> {
        validate_name(&record.name)?;

        let mut inner = self.inner.lock();
        db::upsert_bin(&inner.conn, &record)?;
        inner.next_id = inner.next_id.max(record.id + 1);
        debug!(id = record.id, "upserted bin");
        inner.bins.insert(record.id, record);

        inner.emit();
        Ok(())
    }

    /// Set the favorite flag. Never touches verification fields, so setting
    /// the current value again is observable only as a fresh snapshot.
    pub fn set_favorite(&self, id: BinId, is_favorite: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if !inner.bins.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }

        db::update_favorite(&inner.conn, id, is_favorite)?;
        if let Some(bin) = inner.bins.get_mut(&id) {
            bin.is_favorite = is_favorite;
        }
        debug!(id, is_favorite, "updated favorite");

        inner.emit();
        Ok(())
    }

    /// Apply a verification event: status, timestamp, and counter move
    /// together; subscribers never see a partial update. The timestamp is
    /// caller-supplied, never read from the wall clock here.
    pub fn record_verification(
        &self,
        id: BinId,
        status: BinStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if !inner.bins.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }

        db::update_verification(&inner.conn, id, status, timestamp)?;
        if let Some(bin) = inner.bins.get_mut(&id) {
            bin.status = status;
            bin.last_verified_at = Some(timestamp);
            bin.verification_count += 1;
        }
        debug!(id, status = %status, "recorded verification");

        inner.emit();
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.inner.lock().bins.len()
    }

    pub fn get(&self, id: BinId) -> Option<BinRecord> {
        self.inner.lock().bins.get(&id).cloned()
    }

    /// Current snapshot without subscribing.
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.inner.lock();
        inner.build_snapshot()
    }

    /// Register a subscriber. The current snapshot is queued immediately;
    /// afterwards every mutation queues exactly one more, in the order the
    /// mutations were serialized.
    pub fn subscribe(&self) -> Subscription {
        let mut inner = self.inner.lock();
        let (tx, rx) = unbounded();
        // Queue the current state so new subscribers never start blind.
        let _ = tx.send(inner.build_snapshot());
        inner.subscribers.push(tx);
        Subscription { rx }
    }
}

impl StoreInner {
    fn build_snapshot(&self) -> Snapshot {
        Snapshot::new(self.seq, self.bins.values().cloned().collect())
    }

    /// Called under the store lock after a durably-applied mutation. Sends
    /// to unbounded queues, so a slow subscriber never blocks the mutator;
    /// disconnected subscribers are dropped.
    fn emit(&mut self) {
        self.seq += 1;
        let snapshot = self.build_snapshot();
        self.subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

// ============================================================================
// TESTS
// ============================================================================
