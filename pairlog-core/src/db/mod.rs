//! Database layer for pairlog
//!
//! SQLite storage for the correction log and pattern snapshots, with
//! schema migrations tracked in `PRAGMA user_version`.

pub mod repo;
pub mod schema;

pub use repo::Database;
