//! Persistence seam for the correction log and pattern snapshots.

use crate::error::Result;
use crate::types::{Correction, CorrectionCategory, Pattern};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Durable storage for one append-only correction log per project and one
/// derived pattern snapshot per project.
///
/// Implementations must never edit or delete stored corrections. A pattern
/// snapshot is replaced as a whole, never patched.
pub trait CorrectionStore {
    /// Append a correction to its project's log.
    fn append_correction(&self, correction: &Correction) -> Result<()>;

    /// All corrections of a project, in the order they were logged.
    fn load_corrections(&self, project: &str) -> Result<Vec<Correction>>;

    /// Replace a project's pattern snapshot.
    fn replace_patterns(
        &self,
        project: &str,
        patterns: &[Pattern],
        refreshed_at: DateTime<Utc>,
    ) -> Result<()>;

    /// The last stored pattern snapshot of a project (empty if never refreshed).
    fn load_patterns(&self, project: &str) -> Result<Vec<Pattern>>;

    /// Number of logged corrections per category.
    fn category_counts(&self, project: &str) -> Result<BTreeMap<CorrectionCategory, usize>> {
        let mut counts = BTreeMap::new();
        for correction in self.load_corrections(project)? {
            *counts.entry(correction.category).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

impl<T: CorrectionStore + ?Sized> CorrectionStore for &T {
    fn append_correction(&self, correction: &Correction) -> Result<()> {
        (**self).append_correction(correction)
    }

    fn load_corrections(&self, project: &str) -> Result<Vec<Correction>> {
        (**self).load_corrections(project)
    }

    fn replace_patterns(
        &self,
        project: &str,
        patterns: &[Pattern],
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        (**self).replace_patterns(project, patterns, refreshed_at)
    }

    fn load_patterns(&self, project: &str) -> Result<Vec<Pattern>> {
        (**self).load_patterns(project)
    }

    fn category_counts(&self, project: &str) -> Result<BTreeMap<CorrectionCategory, usize>> {
        (**self).category_counts(project)
    }
}
