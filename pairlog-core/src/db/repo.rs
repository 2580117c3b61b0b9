//! Database repository layer
//!
//! SQLite-backed [`CorrectionStore`].

use crate::error::{Error, Result};
use crate::store::CorrectionStore;
use crate::types::{Correction, CorrectionCategory, Pattern};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Database handle (single connection behind a mutex)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        super::schema::run_migrations(&self.conn())
    }

    /// Projects that have logged at least one correction.
    pub fn list_projects(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT DISTINCT project FROM corrections ORDER BY project")?;
        let projects = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(projects)
    }

    /// When a project's pattern snapshot was last replaced.
    pub fn patterns_refreshed_at(&self, project: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn();
        let raw: Option<String> = conn
            .query_row(
                "SELECT refreshed_at FROM pattern_snapshots WHERE project = ?",
                [project],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    // Poisoning is ignored: SQLite statements are atomic.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn row_to_correction(row: &Row) -> rusqlite::Result<Correction> {
        let category: String = row.get("category")?;
        let logged_at: String = row.get("logged_at")?;

        Ok(Correction {
            id: row.get("id")?,
            project: row.get("project")?,
            what_user_said: row.get("what_user_said")?,
            what_you_did_wrong: row.get("what_you_did_wrong")?,
            root_cause: row.get("root_cause")?,
            category: category.parse().unwrap_or_default(),
            logged_at: DateTime::parse_from_rfc3339(&logged_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?,
        })
    }
}

// ============================================
// Correction log operations
// ============================================

impl CorrectionStore for Database {
    fn append_correction(&self, correction: &Correction) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO corrections
                (id, project, what_user_said, what_you_did_wrong, root_cause, category, logged_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                correction.id,
                correction.project,
                correction.what_user_said,
                correction.what_you_did_wrong,
                correction.root_cause,
                correction.category.as_str(),
                correction.logged_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn load_corrections(&self, project: &str) -> Result<Vec<Correction>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, project, what_user_said, what_you_did_wrong, root_cause, category, logged_at
            FROM corrections
            WHERE project = ?
            ORDER BY seq
            "#,
        )?;
        let corrections = stmt
            .query_map([project], Self::row_to_correction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(corrections)
    }

    fn replace_patterns(
        &self,
        project: &str,
        patterns: &[Pattern],
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        let json = serde_json::to_string(patterns)?;
        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO pattern_snapshots (project, refreshed_at, patterns)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(project) DO UPDATE SET
                refreshed_at = excluded.refreshed_at,
                patterns = excluded.patterns
            "#,
            params![project, refreshed_at.to_rfc3339(), json],
        )?;
        Ok(())
    }

    fn load_patterns(&self, project: &str) -> Result<Vec<Pattern>> {
        let conn = self.conn();
        let json: Option<String> = conn
            .query_row(
                "SELECT patterns FROM pattern_snapshots WHERE project = ?",
                [project],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => serde_json::from_str(&json).map_err(Error::from),
            None => Ok(Vec::new()),
        }
    }

    fn category_counts(&self, project: &str) -> Result<BTreeMap<CorrectionCategory, usize>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) FROM corrections WHERE project = ? GROUP BY category",
        )?;
        let rows = stmt
            .query_map([project], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut counts = BTreeMap::new();
        for (category, count) in rows {
            let category: CorrectionCategory = category.parse().unwrap_or_default();
            *counts.entry(category).or_insert(0) += count as usize;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn correction(id: &str, project: &str, category: CorrectionCategory) -> Correction {
        Correction {
            id: id.to_string(),
            project: project.to_string(),
            what_user_said: "no, the other file".to_string(),
            what_you_did_wrong: "edited src/a.rs".to_string(),
            root_cause: "guessed the file".to_string(),
            category,
            logged_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_corrections_round_trip_in_log_order() {
        let db = test_db();
        db.append_correction(&correction("z", "shop", CorrectionCategory::WrongFile))
            .unwrap();
        db.append_correction(&correction("a", "shop", CorrectionCategory::Other))
            .unwrap();
        db.append_correction(&correction("m", "blog", CorrectionCategory::Other))
            .unwrap();

        let loaded = db.load_corrections("shop").unwrap();
        let ids: Vec<&str> = loaded.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a"]);
        assert_eq!(loaded[0], correction("z", "shop", CorrectionCategory::WrongFile));
        assert_eq!(db.list_projects().unwrap(), vec!["blog", "shop"]);
    }

    #[test]
    fn test_duplicate_correction_id_rejected() {
        let db = test_db();
        let c = correction("dup", "shop", CorrectionCategory::Other);
        db.append_correction(&c).unwrap();
        assert!(matches!(
            db.append_correction(&c),
            Err(Error::Database(_))
        ));
    }

    #[test]
    fn test_category_counts() {
        let db = test_db();
        db.append_correction(&correction("1", "shop", CorrectionCategory::WrongFile))
            .unwrap();
        db.append_correction(&correction("2", "shop", CorrectionCategory::WrongFile))
            .unwrap();
        db.append_correction(&correction("3", "shop", CorrectionCategory::VaguePrompt))
            .unwrap();

        let counts = db.category_counts("shop").unwrap();
        assert_eq!(counts.get(&CorrectionCategory::WrongFile), Some(&2));
        assert_eq!(counts.get(&CorrectionCategory::VaguePrompt), Some(&1));
        assert!(db.category_counts("empty").unwrap().is_empty());
    }

    #[test]
    fn test_pattern_snapshot_is_replaced() {
        let db = test_db();
        assert!(db.load_patterns("shop").unwrap().is_empty());
        assert_eq!(db.patterns_refreshed_at("shop").unwrap(), None);

        let pattern = Pattern {
            id: "pat-1".to_string(),
            pattern: "Recurring wrong_file: src, auth".to_string(),
            keywords: vec!["src".into(), "auth".into()],
            frequency: 2,
            last_seen: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            context: "ctx".to_string(),
            examples: vec!["no".to_string()],
            category: CorrectionCategory::WrongFile,
        };
        let t1 = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        db.replace_patterns("shop", &[pattern.clone(), pattern.clone()], t1)
            .unwrap();
        assert_eq!(db.load_patterns("shop").unwrap().len(), 2);

        let t2 = Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap();
        db.replace_patterns("shop", &[pattern.clone()], t2).unwrap();
        assert_eq!(db.load_patterns("shop").unwrap(), vec![pattern]);
        assert_eq!(db.patterns_refreshed_at("shop").unwrap(), Some(t2));
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data.db");
        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        assert!(path.exists());
    }
}
