//! Ephemeral share links for extracted exam records.
//!
//! `ShareStore` owns every entry. Entries are created once with a
//! time-to-live, readable only while unexpired, and reclaimed by
//! `sweep` (run before each create and by the periodic sweeper).
//! An expired entry is never returned, swept or not.

pub mod clock;
pub mod store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::ShareStore;
pub use sweeper::{start_sweeper, SweeperHandle};

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum ShareError {
    #[error("Share lifetime must be a positive number of seconds (got {0})")]
    InvalidTtl(i64),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Stored share could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Share store lock poisoned")]
    LockPoisoned,

    #[error("Could not allocate a unique share id after {0} attempts")]
    IdCollision(u32),
}
