//! Per-project correction log and pattern refresh.

use super::cluster_corrections;
use crate::error::Result;
use crate::store::CorrectionStore;
use crate::types::{Correction, CorrectionCategory, NewCorrection, Pattern};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Correction counts for a project, by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub total: usize,
    pub by_category: BTreeMap<CorrectionCategory, usize>,
}

/// Result of logging a correction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LogOutcome {
    /// The correction was appended to the log
    Logged {
        correction: Correction,
        summary: CategorySummary,
    },
    /// The entry was rejected and nothing was stored
    Skipped { reason: String },
}

/// Learns recurring patterns from one project's correction log.
///
/// Logging a correction and refreshing or reading patterns are serialized
/// against each other, so a refresh never observes a half-appended log.
pub struct PatternLearner<S> {
    store: S,
    project: String,
    lock: Mutex<()>,
}

impl<S: CorrectionStore> PatternLearner<S> {
    pub fn new(store: S, project: impl Into<String>) -> Self {
        Self {
            store,
            project: project.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Validate and append a correction.
    ///
    /// Entries missing `what_user_said`, `what_you_did_wrong` or `root_cause`
    /// are skipped. A missing or unrecognized category is stored as `other`.
    pub fn log_correction(&self, entry: NewCorrection) -> Result<LogOutcome> {
        let _guard = self.guard();

        let what_user_said = match required(entry.what_user_said, "what_user_said") {
            Ok(v) => v,
            Err(reason) => return Ok(skipped(reason)),
        };
        let what_you_did_wrong = match required(entry.what_you_did_wrong, "what_you_did_wrong") {
            Ok(v) => v,
            Err(reason) => return Ok(skipped(reason)),
        };
        let root_cause = match required(entry.root_cause, "root_cause") {
            Ok(v) => v,
            Err(reason) => return Ok(skipped(reason)),
        };

        let category = match entry.category.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.parse::<CorrectionCategory>().unwrap_or_else(|_| {
                tracing::debug!(category = raw, "Unrecognized category, storing as other");
                CorrectionCategory::Other
            }),
            _ => CorrectionCategory::Other,
        };

        let correction = Correction {
            id: uuid::Uuid::new_v4().to_string(),
            project: self.project.clone(),
            what_user_said,
            what_you_did_wrong,
            root_cause,
            category,
            logged_at: Utc::now(),
        };
        self.store.append_correction(&correction)?;

        tracing::info!(
            project = %self.project,
            correction_id = %correction.id,
            category = %correction.category,
            "Logged correction"
        );

        let summary = self.summary_unlocked()?;
        Ok(LogOutcome::Logged {
            correction,
            summary,
        })
    }

    /// Recompute patterns from the full log and persist the snapshot.
    pub fn refresh_patterns(&self) -> Result<Vec<Pattern>> {
        let _guard = self.guard();

        let corrections = self.store.load_corrections(&self.project)?;
        let patterns = cluster_corrections(&corrections);
        self.store
            .replace_patterns(&self.project, &patterns, Utc::now())?;

        tracing::info!(
            project = %self.project,
            corrections = corrections.len(),
            patterns = patterns.len(),
            "Refreshed patterns"
        );
        Ok(patterns)
    }

    /// The last persisted pattern snapshot.
    pub fn patterns(&self) -> Result<Vec<Pattern>> {
        let _guard = self.guard();
        self.store.load_patterns(&self.project)
    }

    /// Correction counts by category.
    pub fn summary(&self) -> Result<CategorySummary> {
        let _guard = self.guard();
        self.summary_unlocked()
    }

    fn summary_unlocked(&self) -> Result<CategorySummary> {
        let by_category = self.store.category_counts(&self.project)?;
        Ok(CategorySummary {
            total: by_category.values().sum(),
            by_category,
        })
    }
}

fn required(value: Option<String>, field: &str) -> std::result::Result<String, String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("missing required field: {}", field)),
    }
}

fn skipped(reason: String) -> LogOutcome {
    tracing::warn!(%reason, "Skipping correction entry");
    LogOutcome::Skipped { reason }
}
