//! Work-quality categories: corrections, workspace hygiene, verification.

use super::{example, is_file_write, percent, NEUTRAL_SCORE};
use crate::scorecard::{CategoryScore, ScoringCategory};
use crate::session::{touched_path, Session};
use crate::text;
use crate::types::Event;

/// Score when no corrections were needed.
const NO_CORRECTIONS_SCORE: u8 = 95;

/// Points lost per unit of correction rate.
const CORRECTION_RATE_WEIGHT: f64 = 500.0;

/// Weight of the recovery percentage.
const RECOVERY_WEIGHT: f64 = 0.2;

/// Events after a correction within which the assistant should respond.
const RECOVERY_WINDOW: usize = 2;

/// Path fragments of scratch, backup and throwaway files.
const SCRATCH_MARKERS: &[&str] = &["tmp/", "scratch", ".bak", ".orig", "copy", "untitled"];

/// Command terms that indicate a verification step.
const VERIFY_TERMS: &[&str] = &["test", "check", "build", "lint", "tsc", "pytest"];

/// How often the user had to correct the assistant, and whether it recovered.
pub struct ErrorRecovery;

impl ScoringCategory for ErrorRecovery {
    fn name(&self) -> &'static str {
        "Error Recovery"
    }

    fn score(&self, sessions: &[Session]) -> CategoryScore {
        let corrections: usize = sessions.iter().map(|s| s.corrections().len()).sum();
        if corrections == 0 {
            return CategoryScore::neutral(
                self.name(),
                NO_CORRECTIONS_SCORE,
                "No corrections needed",
            );
        }

        let messages: usize = sessions
            .iter()
            .map(|s| s.user_messages().len() + s.assistant_messages().len())
            .sum();

        let recovered = sessions
            .iter()
            .flat_map(|s| {
                let events = s.events();
                s.correction_positions().iter().map(move |&i| {
                    events
                        .iter()
                        .skip(i + 1)
                        .take(RECOVERY_WINDOW)
                        .any(Event::is_assistant_activity)
                })
            })
            .filter(|&ok| ok)
            .count();

        // Corrections are prompts, so `messages` is at least `corrections`.
        let rate = corrections as f64 / messages.max(1) as f64;
        let recovery = percent(recovered, corrections);
        let raw = 100.0 - rate * CORRECTION_RATE_WEIGHT + RECOVERY_WEIGHT * recovery;

        let first = sessions.iter().flat_map(|s| s.corrections()).next();
        CategoryScore::measured(
            self.name(),
            raw,
            format!(
                "{} corrections in {} messages ({:.1}%), {}/{} answered promptly",
                corrections,
                messages,
                rate * 100.0,
                recovered,
                corrections
            ),
        )
        .with_examples(None, first.map(example))
    }
}

/// File writes that avoid scratch and backup paths.
pub struct WorkspaceHygiene;

fn is_scratch_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    SCRATCH_MARKERS.iter().any(|m| lower.contains(m))
}

impl ScoringCategory for WorkspaceHygiene {
    fn name(&self) -> &'static str {
        "Workspace Hygiene"
    }

    fn score(&self, sessions: &[Session]) -> CategoryScore {
        let writes: Vec<&str> = sessions
            .iter()
            .flat_map(|s| s.tool_calls())
            .filter(|e| is_file_write(e))
            .filter_map(touched_path)
            .collect();

        if writes.is_empty() {
            return CategoryScore::neutral(self.name(), NEUTRAL_SCORE, "No file writes");
        }

        let scratch: Vec<&str> = writes.iter().copied().filter(|p| is_scratch_path(p)).collect();
        let clean = writes.len() - scratch.len();
        CategoryScore::measured(
            self.name(),
            percent(clean, writes.len()),
            format!("{}/{} file writes outside scratch paths", clean, writes.len()),
        )
        .with_examples(None, scratch.first().map(|p| p.to_string()))
    }
}

/// Editing sessions that run tests, builds or linters after the first edit.
pub struct Verification;

fn is_verify_command(event: &Event) -> bool {
    if event.tool_name() != Some("Bash") {
        return false;
    }
    let command = event
        .tool_input()
        .and_then(|input| input.get("command"))
        .and_then(|c| c.as_str())
        .unwrap_or(&event.content);
    text::contains_any_term(command, VERIFY_TERMS)
}

impl ScoringCategory for Verification {
    fn name(&self) -> &'static str {
        "Verification"
    }

    fn score(&self, sessions: &[Session]) -> CategoryScore {
        let mut total = 0;
        let mut verified = 0;

        for session in sessions {
            let events = session.events();
            let Some(first_edit) = events.iter().position(is_file_write) else {
                continue;
            };
            total += 1;
            if events[first_edit + 1..].iter().any(is_verify_command) {
                verified += 1;
            }
        }

        if total == 0 {
            return CategoryScore::neutral(self.name(), NEUTRAL_SCORE, "No editing sessions");
        }

        CategoryScore::measured(
            self.name(),
            percent(verified, total),
            format!("{}/{} editing sessions verified their changes", verified, total),
        )
    }
}
