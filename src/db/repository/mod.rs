//! Repository layer: table-scoped database operations.
//!
//! Functions take a borrowed `Connection`; callers own locking and
//! decide which statements run together.

mod share;

pub use share::*;
