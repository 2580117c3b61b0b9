//! Scorecard engine
//!
//! Runs a fixed, ordered set of scoring categories over a collection of
//! sessions and aggregates them into one graded [`Scorecard`].
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    SCORECARD ENGINE                       │
//! │                                                           │
//! │  ┌──────────┐ ┌───────────────┐ ┌──────────────┐          │
//! │  │ Plans    │ │ Clarification │ │ Delegation   │  ... ×12 │
//! │  └────┬─────┘ └──────┬────────┘ └──────┬───────┘          │
//! │       ▼              ▼                 ▼                  │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │ ScorecardEngine::compute()                          │  │
//! │  │  - round + clamp each score, grade it               │  │
//! │  │  - overall = round(mean), graded                    │  │
//! │  │  - highlights: stable sort, worst first / best last │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Every category is total: when its signal is absent it returns a neutral
//! default and says why in [`ScoreBasis::NeutralDefault`].

pub mod categories;
mod render;

pub use render::render_markdown;

use crate::config::ScorecardConfig;
use crate::session::Session;
use chrono::{NaiveDate, Utc};
use serde::Serialize;

// ============================================
// Grades
// ============================================

/// Letter grade, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Grade {
    #[serde(rename = "F")]
    F,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl Grade {
    /// Grade for a score in [0, 100].
    pub fn from_score(score: u8) -> Self {
        match score {
            95..=u8::MAX => Grade::APlus,
            90..=94 => Grade::A,
            85..=89 => Grade::AMinus,
            80..=84 => Grade::BPlus,
            75..=79 => Grade::B,
            70..=74 => Grade::BMinus,
            65..=69 => Grade::CPlus,
            60..=64 => Grade::C,
            55..=59 => Grade::CMinus,
            50..=54 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Round and clamp a raw score into [0, 100].
pub fn normalize_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

// ============================================
// Category scores
// ============================================

/// Why a category has the score it has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreBasis {
    /// Computed from session data
    Measured,
    /// The required signal was absent
    NeutralDefault { reason: String },
}

/// One dimension of the scorecard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryScore {
    pub name: String,
    pub score: u8,
    pub grade: Grade,
    pub evidence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub good: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bad: Option<String>,
    pub basis: ScoreBasis,
}

impl CategoryScore {
    /// A score computed from data. The raw value is rounded and clamped.
    pub fn measured(name: &str, raw: f64, evidence: impl Into<String>) -> Self {
        let score = normalize_score(raw);
        Self {
            name: name.to_string(),
            score,
            grade: Grade::from_score(score),
            evidence: evidence.into(),
            good: None,
            bad: None,
            basis: ScoreBasis::Measured,
        }
    }

    /// The documented default for a category whose signal is absent.
    pub fn neutral(name: &str, default: u8, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let score = default.min(100);
        Self {
            name: name.to_string(),
            score,
            grade: Grade::from_score(score),
            evidence: reason.clone(),
            good: None,
            bad: None,
            basis: ScoreBasis::NeutralDefault { reason },
        }
    }

    /// Attach illustrative examples.
    pub fn with_examples(mut self, good: Option<String>, bad: Option<String>) -> Self {
        self.good = good;
        self.bad = bad;
        self
    }

    pub fn is_default(&self) -> bool {
        matches!(self.basis, ScoreBasis::NeutralDefault { .. })
    }
}

// ============================================
// Scorecard
// ============================================

/// A category named in the highlights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub name: String,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlights {
    pub best: Highlight,
    pub worst: Highlight,
}

/// Aggregated report over a set of sessions.
#[derive(Debug, Clone, Serialize)]
pub struct Scorecard {
    pub project: String,
    pub period: String,
    pub date: NaiveDate,
    /// Category scores in engine order
    pub categories: Vec<CategoryScore>,
    /// Rounded mean of the category scores
    pub overall: u8,
    pub overall_grade: Grade,
    /// Absent only when the engine has no categories
    pub highlights: Option<Highlights>,
    pub session_count: usize,
}

impl Scorecard {
    pub fn category(&self, name: &str) -> Option<&CategoryScore> {
        self.categories.iter().find(|c| c.name == name)
    }
}

// ============================================
// Category trait and engine
// ============================================

/// One scoring function over the full session collection.
///
/// Implementations must be total: when the signal they need is absent they
/// return [`CategoryScore::neutral`] rather than failing.
pub trait ScoringCategory: Send + Sync {
    /// Display name, unique within an engine.
    fn name(&self) -> &'static str;

    /// Score the sessions.
    fn score(&self, sessions: &[Session]) -> CategoryScore;
}

/// Runs registered categories in registration order.
pub struct ScorecardEngine {
    categories: Vec<Box<dyn ScoringCategory>>,
}

impl ScorecardEngine {
    /// Create an engine with no categories.
    pub fn new() -> Self {
        Self {
            categories: Vec::new(),
        }
    }

    /// Create an engine with the twelve built-in categories in their fixed order.
    pub fn standard(config: &ScorecardConfig) -> Self {
        let mut engine = Self::new();
        for category in categories::standard_categories(config) {
            engine.register(category);
        }
        engine
    }

    pub fn register(&mut self, category: Box<dyn ScoringCategory>) {
        tracing::debug!(category = category.name(), "Registered scoring category");
        self.categories.push(category);
    }

    pub fn category_names(&self) -> Vec<&'static str> {
        self.categories.iter().map(|c| c.name()).collect()
    }

    /// Score sessions, dated today (UTC).
    pub fn compute(&self, sessions: &[Session], project: &str, period: &str) -> Scorecard {
        self.compute_at(sessions, project, period, Utc::now().date_naive())
    }

    /// Score sessions with an explicit report date.
    pub fn compute_at(
        &self,
        sessions: &[Session],
        project: &str,
        period: &str,
        date: NaiveDate,
    ) -> Scorecard {
        let categories: Vec<CategoryScore> = self
            .categories
            .iter()
            .map(|c| {
                let score = c.score(sessions);
                tracing::debug!(
                    category = c.name(),
                    score = score.score,
                    default = score.is_default(),
                    "Scored category"
                );
                score
            })
            .collect();

        let overall = if categories.is_empty() {
            0
        } else {
            let sum: u32 = categories.iter().map(|c| c.score as u32).sum();
            normalize_score(sum as f64 / categories.len() as f64)
        };

        let highlights = highlights(&categories);

        tracing::info!(
            project,
            period,
            sessions = sessions.len(),
            overall,
            "Computed scorecard"
        );

        Scorecard {
            project: project.to_string(),
            period: period.to_string(),
            date,
            categories,
            overall,
            overall_grade: Grade::from_score(overall),
            highlights,
            session_count: sessions.len(),
        }
    }
}

impl Default for ScorecardEngine {
    fn default() -> Self {
        Self::standard(&ScorecardConfig::default())
    }
}

/// Worst is the first after a stable ascending sort, best is the last.
fn highlights(categories: &[CategoryScore]) -> Option<Highlights> {
    let mut sorted: Vec<&CategoryScore> = categories.iter().collect();
    sorted.sort_by_key(|c| c.score);

    let to_highlight = |c: &CategoryScore| Highlight {
        name: c.name.clone(),
        score: c.score,
    };
    Some(Highlights {
        worst: to_highlight(sorted.first().copied()?),
        best: to_highlight(sorted.last().copied()?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, u8);

    impl ScoringCategory for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn score(&self, _sessions: &[Session]) -> CategoryScore {
            CategoryScore::measured(self.0, self.1 as f64, "fixed")
        }
    }

    fn engine(scores: &[(&'static str, u8)]) -> ScorecardEngine {
        let mut engine = ScorecardEngine::new();
        for (name, score) in scores {
            engine.register(Box::new(Fixed(name, *score)));
        }
        engine
    }

    #[test]
    fn test_grade_ladder_boundaries() {
        let cases = [
            (100, Grade::APlus),
            (95, Grade::APlus),
            (94, Grade::A),
            (90, Grade::A),
            (85, Grade::AMinus),
            (80, Grade::BPlus),
            (75, Grade::B),
            (70, Grade::BMinus),
            (65, Grade::CPlus),
            (60, Grade::C),
            (55, Grade::CMinus),
            (50, Grade::D),
            (49, Grade::F),
            (0, Grade::F),
        ];
        for (score, grade) in cases {
            assert_eq!(Grade::from_score(score), grade, "score {}", score);
        }
    }

    #[test]
    fn test_normalize_score() {
        assert_eq!(normalize_score(78.5), 79);
        assert_eq!(normalize_score(-20.0), 0);
        assert_eq!(normalize_score(140.0), 100);
        assert_eq!(normalize_score(f64::NAN), 0);
    }

    #[test]
    fn test_highlight_ties_use_input_order() {
        let card = engine(&[("a", 60), ("b", 90), ("c", 60), ("d", 90)]).compute_at(
            &[],
            "p",
            "week",
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        );
        let highlights = card.highlights.unwrap();
        assert_eq!(highlights.worst.name, "a");
        assert_eq!(highlights.best.name, "d");
        assert_eq!(card.overall, 75);
        assert_eq!(card.overall_grade, Grade::B);
    }

    #[test]
    fn test_empty_engine() {
        let card = ScorecardEngine::new().compute(&[], "p", "all");
        assert_eq!(card.overall, 0);
        assert!(card.highlights.is_none());
    }

    #[test]
    fn test_grade_serializes_as_letter() {
        assert_eq!(serde_json::to_string(&Grade::AMinus).unwrap(), "\"A-\"");
    }
}
