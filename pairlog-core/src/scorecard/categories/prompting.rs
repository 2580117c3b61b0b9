//! Prompt-quality categories.

use super::{example, percent, NEUTRAL_SCORE};
use crate::scorecard::{CategoryScore, ScoringCategory};
use crate::session::Session;
use crate::text;
use crate::types::Event;

/// Sub-agent dispatch prompts longer than this are well-specified.
const DELEGATION_MIN_CHARS: usize = 200;

/// Follow-ups longer than this are specific even without a path.
const FOLLOW_UP_MIN_CHARS: usize = 80;

/// Splits events by a predicate, keeping the first example of each side.
#[derive(Default)]
struct Tally {
    hits: usize,
    total: usize,
    good: Option<String>,
    bad: Option<String>,
}

impl Tally {
    fn record(&mut self, event: &Event, hit: bool) {
        self.total += 1;
        if hit {
            self.hits += 1;
            self.good.get_or_insert_with(|| example(event));
        } else {
            self.bad.get_or_insert_with(|| example(event));
        }
    }

    fn into_score(self, name: &str, default_reason: &str, what: &str) -> CategoryScore {
        if self.total == 0 {
            return CategoryScore::neutral(name, NEUTRAL_SCORE, default_reason);
        }
        CategoryScore::measured(
            name,
            percent(self.hits, self.total),
            format!("{}/{} {}", self.hits, self.total, what),
        )
        .with_examples(self.good, self.bad)
    }
}

/// Prompts that name a file or path.
pub struct Clarification;

impl ScoringCategory for Clarification {
    fn name(&self) -> &'static str {
        "Clarification"
    }

    fn score(&self, sessions: &[Session]) -> CategoryScore {
        let mut tally = Tally::default();
        for prompt in sessions.iter().flat_map(|s| s.user_messages()) {
            tally.record(prompt, text::has_path_reference(&prompt.content));
        }
        tally.into_score(self.name(), "No prompts", "prompts reference a file or path")
    }
}

/// Sub-agent spawns with a substantial dispatch prompt.
pub struct Delegation;

fn dispatch_prompt(spawn: &Event) -> &str {
    spawn
        .tool_input()
        .and_then(|input| input.get("prompt"))
        .and_then(|p| p.as_str())
        .unwrap_or(&spawn.content)
}

impl ScoringCategory for Delegation {
    fn name(&self) -> &'static str {
        "Delegation"
    }

    fn score(&self, sessions: &[Session]) -> CategoryScore {
        let mut tally = Tally::default();
        for spawn in sessions.iter().flat_map(|s| s.sub_agent_spawns()) {
            let detailed = dispatch_prompt(spawn).chars().count() > DELEGATION_MIN_CHARS;
            tally.record(spawn, detailed);
        }
        tally.into_score(
            self.name(),
            "No sub-agent spawns",
            "sub-agent dispatches carry a detailed prompt",
        )
    }
}

/// Follow-up prompts (after a session's first) that are specific.
pub struct FollowUpSpecificity;

impl ScoringCategory for FollowUpSpecificity {
    fn name(&self) -> &'static str {
        "Follow-up Specificity"
    }

    fn score(&self, sessions: &[Session]) -> CategoryScore {
        let mut tally = Tally::default();
        for prompt in sessions.iter().flat_map(|s| s.user_messages().skip(1)) {
            let specific = text::has_path_reference(&prompt.content)
                || prompt.content.chars().count() > FOLLOW_UP_MIN_CHARS;
            tally.record(prompt, specific);
        }
        tally.into_score(self.name(), "No follow-up prompts", "follow-ups are specific")
    }
}
