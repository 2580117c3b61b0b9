//! Session flow: how sessions end and how the next one picks up.

use super::{example, percent, NEUTRAL_SCORE};
use crate::scorecard::{CategoryScore, ScoringCategory};
use crate::session::{touched_path, Session};
use crate::text;
use crate::types::EventType;
use std::path::Path;

/// Trailing events searched for a wrap-up commit.
const LIFECYCLE_TAIL: usize = 10;

/// Opening events searched for a handoff document.
const CONTINUITY_HEAD: usize = 5;

const CONTINUITY_CUES: &[&str] = &[
    "continue",
    "last session",
    "previously",
    "yesterday",
    "pick up",
    "resume",
    "where we left",
    "handoff",
];

/// File-name prefixes of notes carried between sessions.
const HANDOFF_FILES: &[&str] = &["HANDOFF", "PROGRESS", "NOTES", "TODO"];

/// Sessions that end with a commit.
pub struct SessionLifecycle;

impl ScoringCategory for SessionLifecycle {
    fn name(&self) -> &'static str {
        "Session Lifecycle"
    }

    fn score(&self, sessions: &[Session]) -> CategoryScore {
        let mut total = 0;
        let mut wrapped = 0;

        for session in sessions.iter().filter(|s| s.user_messages().len() > 0) {
            total += 1;
            let events = session.events();
            let tail = &events[events.len().saturating_sub(LIFECYCLE_TAIL)..];
            if tail.iter().any(|e| e.is(EventType::Commit)) {
                wrapped += 1;
            }
        }

        if total == 0 {
            return CategoryScore::neutral(self.name(), NEUTRAL_SCORE, "No sessions with prompts");
        }

        CategoryScore::measured(
            self.name(),
            percent(wrapped, total),
            format!("{}/{} sessions ended with a commit", wrapped, total),
        )
    }
}

/// Later sessions that build on earlier ones.
pub struct CrossSessionContinuity;

fn reads_handoff_file(session: &Session) -> bool {
    session
        .events()
        .iter()
        .take(CONTINUITY_HEAD)
        .filter_map(touched_path)
        .filter_map(|p| Path::new(p).file_name().and_then(|n| n.to_str()))
        .any(|name| {
            let upper = name.to_uppercase();
            HANDOFF_FILES.iter().any(|prefix| upper.starts_with(prefix))
        })
}

impl ScoringCategory for CrossSessionContinuity {
    fn name(&self) -> &'static str {
        "Cross-Session Continuity"
    }

    fn score(&self, sessions: &[Session]) -> CategoryScore {
        if sessions.len() < 2 {
            return CategoryScore::neutral(
                self.name(),
                NEUTRAL_SCORE,
                "Fewer than two sessions",
            );
        }

        // Chronological; sessions without timestamps go last, in input order.
        let mut ordered: Vec<&Session> = sessions.iter().collect();
        ordered.sort_by_key(|s| (s.started_at().is_none(), s.started_at()));

        let mut continued = 0;
        let mut good = None;
        let mut bad = None;
        let later = &ordered[1..];

        for session in later {
            let opening = session.user_messages().next();
            let cued = opening.is_some_and(|p| text::contains_any_term(&p.content, CONTINUITY_CUES));
            if cued || reads_handoff_file(session) {
                continued += 1;
                if let Some(p) = opening {
                    good.get_or_insert_with(|| example(p));
                }
            } else if let Some(p) = opening {
                bad.get_or_insert_with(|| example(p));
            }
        }

        CategoryScore::measured(
            self.name(),
            percent(continued, later.len()),
            format!(
                "{}/{} later sessions referenced prior work",
                continued,
                later.len()
            ),
        )
        .with_examples(good, bad)
    }
}
