//! Token and context efficiency.

use super::{percent, NEUTRAL_SCORE};
use crate::scorecard::{CategoryScore, ScoringCategory};
use crate::session::Session;
use crate::types::EventType;
use std::collections::BTreeSet;

/// Sessions with more tool calls than this are penalized.
const RUNAWAY_TOOL_CALLS: usize = 200;
const RUNAWAY_PENALTY: f64 = 10.0;

/// How far back a compaction looks for a checkpoint commit.
const COMPACTION_LOOKBACK: usize = 10;

/// Tool calls per distinct file touched.
pub struct TokenEfficiency;

/// Calls-per-file ratio → score.
fn efficiency_step(ratio: f64) -> f64 {
    match ratio {
        r if r <= 5.0 => 100.0,
        r if r <= 10.0 => 90.0,
        r if r <= 20.0 => 75.0,
        r if r <= 40.0 => 60.0,
        _ => 40.0,
    }
}

impl ScoringCategory for TokenEfficiency {
    fn name(&self) -> &'static str {
        "Token Efficiency"
    }

    fn score(&self, sessions: &[Session]) -> CategoryScore {
        let calls: usize = sessions.iter().map(|s| s.tool_calls().len()).sum();
        if calls == 0 {
            return CategoryScore::neutral(self.name(), NEUTRAL_SCORE, "No tool calls");
        }

        let files: BTreeSet<&str> = sessions.iter().flat_map(|s| s.files_touched()).collect();
        let ratio = calls as f64 / files.len().max(1) as f64;
        let runaway = sessions
            .iter()
            .filter(|s| s.tool_calls().len() > RUNAWAY_TOOL_CALLS)
            .count();

        let raw = (efficiency_step(ratio) - RUNAWAY_PENALTY * runaway as f64).max(0.0);
        let mut evidence = format!(
            "{} tool calls over {} distinct files ({:.1} per file)",
            calls,
            files.len(),
            ratio
        );
        if runaway > 0 {
            evidence.push_str(&format!(
                "; {} session(s) exceeded {} tool calls",
                runaway, RUNAWAY_TOOL_CALLS
            ));
        }
        CategoryScore::measured(self.name(), raw, evidence)
    }
}

/// Compactions preceded by a commit, so work was checkpointed before context was lost.
pub struct CompactionManagement;

impl ScoringCategory for CompactionManagement {
    fn name(&self) -> &'static str {
        "Compaction Management"
    }

    fn score(&self, sessions: &[Session]) -> CategoryScore {
        let mut total = 0;
        let mut checkpointed = 0;

        for session in sessions {
            let events = session.events();
            for &i in session.compaction_positions() {
                total += 1;
                let window = &events[i.saturating_sub(COMPACTION_LOOKBACK)..i];
                if window.iter().any(|e| e.is(EventType::Commit)) {
                    checkpointed += 1;
                }
            }
        }

        if total == 0 {
            return CategoryScore::neutral(self.name(), 100, "No compactions");
        }

        CategoryScore::measured(
            self.name(),
            percent(checkpointed, total),
            format!(
                "{}/{} compactions followed a commit within {} events",
                checkpointed, total, COMPACTION_LOOKBACK
            ),
        )
    }
}
