// Durable storage collaborator: a key-indexed SQLite table with upsert,
// point updates of named fields, count, and an ordered full query.
// The store is the only caller; everything here is synchronous and
// connection-scoped.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::model::{AcceptedCategories, BinRecord, BinStatus};

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS bins (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            operator TEXT,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            photo_ref TEXT,
            accepts_clothing INTEGER NOT NULL DEFAULT 0,
            accepts_shoes INTEGER NOT NULL DEFAULT 0,
            accepts_electronics INTEGER NOT NULL DEFAULT 0,
            accepts_other INTEGER NOT NULL DEFAULT 0,
            is_favorite INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'unverified',
            last_verified_at TEXT,
            verification_count INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // The subscription query orders by name; keep it indexed.
    conn.execute("CREATE INDEX IF NOT EXISTS idx_bins_name ON bins(name)", [])?;

    Ok(())
}

/// Insert-or-replace keyed by id. The store assigns ids before calling this,
/// so the full row including identity is always written.
pub fn upsert_bin(conn: &Connection, bin: &BinRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO bins (
            id, name, operator, latitude, longitude, photo_ref,
            accepts_clothing, accepts_shoes, accepts_electronics, accepts_other,
            is_favorite, status, last_verified_at, verification_count
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            bin.id,
            bin.name,
            bin.operator,
            bin.latitude,
            bin.longitude,
            bin.photo_ref,
            bin.accepted.clothing,
            bin.accepted.shoes,
            bin.accepted.electronics,
            bin.accepted.other,
            bin.is_favorite,
            bin.status.as_str(),
            bin.last_verified_at.map(|dt| dt.to_rfc3339()),
            bin.verification_count,
        ],
    )?;

    Ok(())
}

/// Point update of the favorite flag. Returns the number of rows changed
/// (0 when the id is unknown).
pub fn update_favorite(conn: &Connection, id: i64, is_favorite: bool) -> Result<usize> {
    conn.execute(
        "UPDATE bins SET is_favorite = ?2 WHERE id = ?1",
        params![id, is_favorite],
    )
}

/// Atomic triple update for a verification event: status, timestamp, and
/// counter change in one statement or not at all.
pub fn update_verification(
    conn: &Connection,
    id: i64,
    status: BinStatus,
    timestamp: DateTime<Utc>,
) -> Result<usize> {
    conn.execute(
        "UPDATE bins
         SET status = ?2,
             last_verified_at = ?3,
             verification_count = verification_count + 1
         WHERE id = ?1",
        params![id, status.as_str(), timestamp.to_rfc3339()],
    )
}

pub fn count_bins(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM bins", [], |row| row.get(0))
}

pub fn max_bin_id(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COALESCE(MAX(id), 0) FROM bins", [], |row| row.get(0))
}

const BIN_COLUMNS: &str = "id, name, operator, latitude, longitude, photo_ref,
    accepts_clothing, accepts_shoes, accepts_electronics, accepts_other,
    is_favorite, status, last_verified_at, verification_count";

/// All bins ordered the way snapshots are ordered: name ascending, id as
/// the tie-break.
pub fn get_all_bins(conn: &Connection) -> Result<Vec<BinRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BIN_COLUMNS} FROM bins ORDER BY name ASC, id ASC"
    ))?;

    let bins = stmt
        .query_map([], row_to_bin)?
        .collect::<Result<Vec<_>>>()?;

    Ok(bins)
}

pub fn get_bin(conn: &Connection, id: i64) -> Result<Option<BinRecord>> {
    conn.query_row(
        &format!("SELECT {BIN_COLUMNS} FROM bins WHERE id = ?1"),
        params![id],
        row_to_bin,
    )
    .optional()
}

fn row_to_bin(row: &rusqlite::Row<'_>) -> Result<BinRecord> {
    let status_str: String = row.get(11)?;
    let status = BinStatus::parse(&status_str).map_err(|_| rusqlite::Error::InvalidQuery)?;

    let last_verified_str: Option<String> = row.get(12)?;
    let last_verified_at = last_verified_str
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(BinRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        operator: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        photo_ref: row.get(5)?,
        accepted: AcceptedCategories {
            clothing: row.get(6)?,
            shoes: row.get(7)?,
            electronics: row.get(8)?,
            other: row.get(9)?,
        },
        is_favorite: row.get(10)?,
        status,
        last_verified_at,
        verification_count: row.get(13)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewBin;
    use chrono::TimeZone;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn test_bin(id: i64, name: &str) -> BinRecord {
        NewBin::new(name, 40.75, -73.43).into_record(id)
    }

    #[test]
    fn test_upsert_and_read_back() {
        let conn = test_conn();
        let mut bin = test_bin(1, "Campus Clothing Bin");
        bin.operator = Some("FSC Sustainability".to_string());
        bin.accepted.clothing = true;
        bin.photo_ref = Some("b1".to_string());

        upsert_bin(&conn, &bin).unwrap();

        let loaded = get_bin(&conn, 1).unwrap().unwrap();
        assert_eq!(loaded, bin);
    }

    #[test]
    fn test_upsert_replaces_same_id() {
        let conn = test_conn();
        upsert_bin(&conn, &test_bin(1, "Old Name")).unwrap();

        let replacement = test_bin(1, "New Name");
        upsert_bin(&conn, &replacement).unwrap();

        assert_eq!(count_bins(&conn).unwrap(), 1);
        assert_eq!(get_bin(&conn, 1).unwrap().unwrap().name, "New Name");
    }

    #[test]
    fn test_query_order_name_then_id() {
        let conn = test_conn();
        upsert_bin(&conn, &test_bin(1, "Zeta")).unwrap();
        upsert_bin(&conn, &test_bin(2, "Alpha")).unwrap();
        upsert_bin(&conn, &test_bin(3, "Alpha")).unwrap();

        let all = get_all_bins(&conn).unwrap();
        let ids: Vec<i64> = all.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_update_favorite_unknown_id_changes_nothing() {
        let conn = test_conn();
        assert_eq!(update_favorite(&conn, 99, true).unwrap(), 0);
    }

    #[test]
    fn test_update_verification_triple() {
        let conn = test_conn();
        upsert_bin(&conn, &test_bin(1, "Drop-Off")).unwrap();

        let t = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let changed = update_verification(&conn, 1, BinStatus::Verified, t).unwrap();
        assert_eq!(changed, 1);

        let bin = get_bin(&conn, 1).unwrap().unwrap();
        assert_eq!(bin.status, BinStatus::Verified);
        assert_eq!(bin.verification_count, 1);
        assert_eq!(bin.last_verified_at, Some(t));
    }

    #[test]
    fn test_max_bin_id_empty_and_populated() {
        let conn = test_conn();
        assert_eq!(max_bin_id(&conn).unwrap(), 0);

        upsert_bin(&conn, &test_bin(5, "Drop-Off")).unwrap();
        assert_eq!(max_bin_id(&conn).unwrap(), 5);
    }
}
