//! Planning categories: up-front plans and topic sequencing.

use super::{example, percent, NEUTRAL_SCORE};
use crate::config::PathlessPrompts;
use crate::scorecard::{CategoryScore, ScoringCategory};
use crate::session::Session;
use crate::text;

/// Prompts longer than this that name a path count as a plan.
const PLAN_MIN_CHARS: usize = 100;

/// How many opening prompts are searched for a plan.
const PLAN_WINDOW: usize = 3;

/// Sessions whose opening prompts include a plan: a long prompt naming a path.
pub struct Plans;

impl ScoringCategory for Plans {
    fn name(&self) -> &'static str {
        "Plans"
    }

    fn score(&self, sessions: &[Session]) -> CategoryScore {
        let mut total = 0;
        let mut planned = 0;
        let mut good = None;
        let mut bad = None;

        for session in sessions.iter().filter(|s| s.user_messages().len() > 0) {
            total += 1;
            let plan = session.user_messages().take(PLAN_WINDOW).find(|p| {
                p.content.chars().count() > PLAN_MIN_CHARS && text::has_path_reference(&p.content)
            });
            match plan {
                Some(p) => {
                    planned += 1;
                    good.get_or_insert_with(|| example(p));
                }
                None => {
                    if let Some(first) = session.user_messages().next() {
                        bad.get_or_insert_with(|| example(first));
                    }
                }
            }
        }

        if total == 0 {
            return CategoryScore::neutral(self.name(), NEUTRAL_SCORE, "No sessions with prompts");
        }

        CategoryScore::measured(
            self.name(),
            percent(planned, total),
            format!("{}/{} sessions opened with a plan", planned, total),
        )
        .with_examples(good, bad)
    }
}

/// Topic switches between consecutive prompts.
///
/// A prompt's area is the leading directory of the last path it mentions.
/// A switch is a prompt whose area differs from the area before it within
/// the same session.
pub struct Sequencing {
    pathless: PathlessPrompts,
}

impl Sequencing {
    pub fn new(pathless: PathlessPrompts) -> Self {
        Self { pathless }
    }
}

/// Switch-rate percentage → score.
fn sequencing_step(rate_pct: f64) -> f64 {
    match rate_pct {
        r if r <= 5.0 => 100.0,
        r if r <= 10.0 => 90.0,
        r if r <= 20.0 => 75.0,
        r if r <= 35.0 => 60.0,
        _ => 45.0,
    }
}

impl ScoringCategory for Sequencing {
    fn name(&self) -> &'static str {
        "Sequencing"
    }

    fn score(&self, sessions: &[Session]) -> CategoryScore {
        let mut total = 0;
        let mut switches = 0;

        for session in sessions {
            let mut current: Option<String> = None;
            for prompt in session.user_messages() {
                let area = text::last_path_reference(&prompt.content).map(text::leading_area);
                match area {
                    Some(area) => {
                        total += 1;
                        if current.as_ref().is_some_and(|c| *c != area) {
                            switches += 1;
                        }
                        current = Some(area);
                    }
                    None => {
                        if self.pathless == PathlessPrompts::SameArea {
                            total += 1;
                        }
                    }
                }
            }
        }

        if total == 0 {
            return CategoryScore::neutral(self.name(), NEUTRAL_SCORE, "No prompts to sequence");
        }

        let rate = percent(switches, total);
        CategoryScore::measured(
            self.name(),
            sequencing_step(rate),
            format!(
                "{} topic switches across {} prompts ({:.1}%)",
                switches, total, rate
            ),
        )
    }
}
