use serde::{Deserialize, Serialize};

use super::exam::ExamRecord;

/// A persisted share link. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareEntry {
    /// Random UUID v4, rendered as text.
    pub id: String,
    pub record: ExamRecord,
    /// Seconds since the Unix epoch.
    pub created_at: i64,
    /// Seconds since the Unix epoch. The entry is gone once `now >= expires_at`.
    pub expires_at: i64,
}

impl ShareEntry {
    pub fn is_live_at(&self, now: i64) -> bool {
        now < self.expires_at
    }
}
