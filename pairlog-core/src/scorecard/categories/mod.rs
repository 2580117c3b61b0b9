//! Built-in scoring categories
//!
//! | # | Category | Module | Default |
//! |---|----------|--------|---------|
//! | 1 | Plans | [`planning`] | 75 |
//! | 2 | Clarification | [`prompting`] | 75 |
//! | 3 | Delegation | [`prompting`] | 75 |
//! | 4 | Follow-up Specificity | [`prompting`] | 75 |
//! | 5 | Token Efficiency | [`efficiency`] | 75 |
//! | 6 | Sequencing | [`planning`] | 75 |
//! | 7 | Compaction Management | [`efficiency`] | 100 |
//! | 8 | Session Lifecycle | [`flow`] | 75 |
//! | 9 | Error Recovery | [`quality`] | 95 |
//! | 10 | Workspace Hygiene | [`quality`] | 75 |
//! | 11 | Cross-Session Continuity | [`flow`] | 75 |
//! | 12 | Verification | [`quality`] | 75 |

pub mod efficiency;
pub mod flow;
pub mod planning;
pub mod prompting;
pub mod quality;

use super::ScoringCategory;
use crate::config::ScorecardConfig;
use crate::types::Event;

/// Default for categories with no signal.
pub const NEUTRAL_SCORE: u8 = 75;

/// Characters of an event shown as a good/bad example.
const EXAMPLE_CHARS: usize = 80;

/// Tools that create or modify files.
pub const FILE_WRITE_TOOLS: &[&str] = &["Write", "Edit", "MultiEdit", "NotebookEdit"];

/// The twelve built-in categories in report order.
pub fn standard_categories(config: &ScorecardConfig) -> Vec<Box<dyn ScoringCategory>> {
    vec![
        Box::new(planning::Plans),
        Box::new(prompting::Clarification),
        Box::new(prompting::Delegation),
        Box::new(prompting::FollowUpSpecificity),
        Box::new(efficiency::TokenEfficiency),
        Box::new(planning::Sequencing::new(config.pathless_prompts)),
        Box::new(efficiency::CompactionManagement),
        Box::new(flow::SessionLifecycle),
        Box::new(quality::ErrorRecovery),
        Box::new(quality::WorkspaceHygiene),
        Box::new(flow::CrossSessionContinuity),
        Box::new(quality::Verification),
    ]
}

/// `hits` as a percentage of `total`. Callers guard `total > 0`.
fn percent(hits: usize, total: usize) -> f64 {
    hits as f64 * 100.0 / total as f64
}

fn example(event: &Event) -> String {
    event.preview(EXAMPLE_CHARS)
}

/// Whether a tool call creates or modifies a file.
fn is_file_write(event: &Event) -> bool {
    event
        .tool_name()
        .is_some_and(|t| FILE_WRITE_TOOLS.contains(&t))
}
