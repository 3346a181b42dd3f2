use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::ShareError;
use crate::db::repository::{
    count_active_shares, delete_expired_shares, get_active_share, insert_share, StoredShare,
};
use crate::db::sqlite::{open_database, open_memory_database};
use crate::db::DatabaseError;
use crate::models::{ExamRecord, ShareEntry};

/// Fresh ids drawn per create before giving up.
const MAX_ID_ATTEMPTS: u32 = 3;

/// Keyed, expiring store of share entries.
///
/// One SQLite connection behind a mutex: every insert, delete and read
/// runs alone, so a sweep racing a create can neither remove a live row
/// nor observe a half-written one. Shared across handlers via `Arc`.
pub struct ShareStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl ShareStore {
    /// Open (or create) the store at `path` using wall-clock time.
    pub fn open(path: &Path) -> Result<Self, ShareError> {
        let conn = open_database(path)?;
        Ok(Self::with_clock(conn, Arc::new(SystemClock)))
    }

    /// Fresh in-memory store using wall-clock time.
    pub fn open_in_memory() -> Result<Self, ShareError> {
        let conn = open_memory_database()?;
        Ok(Self::with_clock(conn, Arc::new(SystemClock)))
    }

    /// Fresh in-memory store reading time from `clock`.
    pub fn in_memory_with_clock(clock: Arc<dyn Clock>) -> Result<Self, ShareError> {
        let conn = open_memory_database()?;
        Ok(Self::with_clock(conn, clock))
    }

    /// Wrap an already-migrated connection.
    pub fn with_clock(conn: Connection, clock: Arc<dyn Clock>) -> Self {
        Self {
            conn: Mutex::new(conn),
            clock,
        }
    }

    /// Persist `record` for `ttl_secs` seconds and return the new entry.
    ///
    /// Expired rows are swept first. A non-positive TTL, or one whose
    /// expiry has no calendar representation, is rejected before the
    /// store is touched.
    pub fn create(&self, record: &ExamRecord, ttl_secs: i64) -> Result<ShareEntry, ShareError> {
        if ttl_secs <= 0 {
            return Err(ShareError::InvalidTtl(ttl_secs));
        }
        let data = serde_json::to_string(record)?;

        let conn = self.lock()?;
        let now = self.clock.now();
        let expires_at = now
            .checked_add(ttl_secs)
            .filter(|at| chrono::DateTime::from_timestamp(*at, 0).is_some())
            .ok_or(ShareError::InvalidTtl(ttl_secs))?;

        let swept = delete_expired_shares(&conn, now)?;
        if swept > 0 {
            tracing::debug!(removed = swept, "Swept expired shares before create");
        }

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let share = StoredShare {
                id: Uuid::new_v4().to_string(),
                data: data.clone(),
                expires_at,
                created_at: now,
            };
            match insert_share(&conn, &share) {
                Ok(()) => {
                    tracing::info!(share_id = %share.id, ttl_secs, expires_at, "Share created");
                    return Ok(ShareEntry {
                        id: share.id,
                        record: record.clone(),
                        created_at: now,
                        expires_at,
                    });
                }
                Err(DatabaseError::ConstraintViolation(detail)) => {
                    tracing::warn!(attempt, detail = %detail, "Share id collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ShareError::IdCollision(MAX_ID_ATTEMPTS))
    }

    /// Look up a share that is still live.
    ///
    /// `None` covers both "never existed" and "expired"; callers cannot
    /// tell them apart. Never mutates the store.
    pub fn resolve(&self, id: &str) -> Result<Option<ShareEntry>, ShareError> {
        let conn = self.lock()?;
        let now = self.clock.now();

        let Some(stored) = get_active_share(&conn, id, now)? else {
            return Ok(None);
        };
        let entry = ShareEntry {
            record: serde_json::from_str(&stored.data)?,
            id: stored.id,
            created_at: stored.created_at,
            expires_at: stored.expires_at,
        };
        Ok(Some(entry).filter(|e| e.is_live_at(now)))
    }

    /// Delete every entry with `expires_at <= now`. Returns how many
    /// were removed; a clean store yields 0.
    pub fn sweep(&self) -> Result<usize, ShareError> {
        let conn = self.lock()?;
        let removed = delete_expired_shares(&conn, self.clock.now())?;
        Ok(removed)
    }

    /// Number of entries that are live right now.
    pub fn active_count(&self) -> Result<u64, ShareError> {
        let conn = self.lock()?;
        let count = count_active_shares(&conn, self.clock.now())?;
        Ok(count)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ShareError> {
        self.conn.lock().map_err(|_| ShareError::LockPoisoned)
    }
}
