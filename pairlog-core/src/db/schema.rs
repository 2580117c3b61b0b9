//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: correction log and pattern snapshots
    r#"
    -- ============================================
    -- Correction log (append-only, one per project)
    -- ============================================

    CREATE TABLE IF NOT EXISTS corrections (
        seq                INTEGER PRIMARY KEY AUTOINCREMENT,
        id                 TEXT NOT NULL UNIQUE,
        project            TEXT NOT NULL,
        what_user_said     TEXT NOT NULL,
        what_you_did_wrong TEXT NOT NULL,
        root_cause         TEXT NOT NULL,
        category           TEXT NOT NULL,
        logged_at          DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_corrections_project ON corrections(project, seq);

    CREATE TRIGGER IF NOT EXISTS corrections_no_update
    BEFORE UPDATE ON corrections
    BEGIN
        SELECT RAISE(ABORT, 'corrections are append-only');
    END;

    CREATE TRIGGER IF NOT EXISTS corrections_no_delete
    BEFORE DELETE ON corrections
    BEGIN
        SELECT RAISE(ABORT, 'corrections are append-only');
    END;

    -- ============================================
    -- Derived patterns (replaced wholesale on refresh)
    -- ============================================

    CREATE TABLE IF NOT EXISTS pattern_snapshots (
        project      TEXT PRIMARY KEY,
        refreshed_at DATETIME NOT NULL,
        patterns     JSON NOT NULL
    );
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["corrections", "pattern_snapshots"] {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "table {} should exist", table);
        }
    }

    #[test]
    fn test_corrections_reject_update_and_delete() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO corrections (id, project, what_user_said, what_you_did_wrong, root_cause, category, logged_at)
             VALUES ('c1', 'p', 'a', 'b', 'c', 'other', '2025-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        assert!(conn
            .execute("UPDATE corrections SET root_cause = 'x'", [])
            .is_err());
        assert!(conn.execute("DELETE FROM corrections", []).is_err());
    }
}
