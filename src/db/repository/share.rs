use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;

/// A `shared_exams` row as stored: the record payload stays serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredShare {
    pub id: String,
    pub data: String,
    pub expires_at: i64,
    pub created_at: i64,
}

/// Insert a new share row. An existing id is never overwritten; a
/// primary-key clash surfaces as `ConstraintViolation`.
pub fn insert_share(conn: &Connection, share: &StoredShare) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO shared_exams (id, data, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![share.id, share.data, share.expires_at, share.created_at],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, msg)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DatabaseError::ConstraintViolation(
                msg.unwrap_or_else(|| "shared_exams constraint".to_string()),
            )
        }
        other => DatabaseError::Sqlite(other),
    })?;
    Ok(())
}

/// Get a share that is still live at `now` (`now < expires_at`).
///
/// Expired rows that have not been swept yet are filtered out here,
/// so callers never see them.
pub fn get_active_share(
    conn: &Connection,
    id: &str,
    now: i64,
) -> Result<Option<StoredShare>, DatabaseError> {
    let share = conn
        .query_row(
            "SELECT id, data, expires_at, created_at
             FROM shared_exams
             WHERE id = ?1 AND expires_at > ?2",
            params![id, now],
            row_to_stored_share,
        )
        .optional()?;
    Ok(share)
}

/// Delete every share with `expires_at <= now`. Returns rows removed.
pub fn delete_expired_shares(conn: &Connection, now: i64) -> Result<usize, DatabaseError> {
    let removed = conn.execute(
        "DELETE FROM shared_exams WHERE expires_at <= ?1",
        params![now],
    )?;
    Ok(removed)
}

/// Count shares still live at `now`.
pub fn count_active_shares(conn: &Connection, now: i64) -> Result<u64, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM shared_exams WHERE expires_at > ?1",
        params![now],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

fn row_to_stored_share(row: &rusqlite::Row) -> Result<StoredShare, rusqlite::Error> {
    Ok(StoredShare {
        id: row.get(0)?,
        data: row.get(1)?,
        expires_at: row.get(2)?,
        created_at: row.get(3)?,
    })
}
