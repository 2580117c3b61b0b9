//! Triage classifier
//!
//! Assigns an ambiguity level to an instruction before it is acted on. The
//! decision is a single pass over an ordered list of guards; the first guard
//! that fires decides the level:
//!
//! | # | Guard | Level |
//! |---|-------|-------|
//! | 1 | skip keyword | `TRIVIAL` |
//! | 2 | sequencing phrase, or ≥3 distinct imperative verbs | `MULTI_STEP` |
//! | 3 | cross-service keyword | `CROSS_SERVICE` |
//! | 4 | always-check keyword | `AMBIGUOUS` |
//! | 5 | shorter than 20 chars and starts with a short command | `TRIVIAL` |
//! | 6 | shorter than the strictness threshold, no path | `AMBIGUOUS` |
//! | 7 | vague pronoun, or vague verb with no object | `AMBIGUOUS` |
//! | 8 | otherwise | `CLEAR` |
//!
//! A learned [`Pattern`] matching the instruction then promotes the result
//! to at least `AMBIGUOUS`. Promotion never lowers a more severe level.

use crate::config::TriageConfig;
use crate::patterns::match_patterns;
use crate::text;
use crate::types::Pattern;
use serde::Serialize;

/// Instructions shorter than this may be one-shot commands.
const SHORT_COMMAND_MAX_CHARS: usize = 20;

/// Distinct imperative verbs that make an instruction multi-step.
const MULTI_VERB_THRESHOLD: usize = 3;

const IMPERATIVE_VERBS: &[&str] = &[
    "add",
    "fix",
    "update",
    "remove",
    "create",
    "refactor",
    "implement",
    "write",
    "delete",
    "rename",
    "move",
    "test",
    "deploy",
];

const VAGUE_PRONOUNS: &[&str] = &["it", "them", "that"];

const VAGUE_VERBS: &[&str] = &["fix", "update", "change", "improve", "handle", "clean"];

/// Words after a vague verb that still leave it without a real object.
const NON_OBJECTS: &[&str] = &[
    "it",
    "this",
    "that",
    "them",
    "things",
    "stuff",
    "everything",
    "up",
];

/// Ambiguity level, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriageLevel {
    Trivial,
    Clear,
    Ambiguous,
    CrossService,
    MultiStep,
}

impl TriageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriageLevel::Trivial => "TRIVIAL",
            TriageLevel::Clear => "CLEAR",
            TriageLevel::Ambiguous => "AMBIGUOUS",
            TriageLevel::CrossService => "CROSS_SERVICE",
            TriageLevel::MultiStep => "MULTI_STEP",
        }
    }

    /// What the assistant should do before acting on an instruction at this level.
    pub fn guidance(&self) -> &'static str {
        match self {
            TriageLevel::Trivial => "Proceed directly.",
            TriageLevel::Clear => "Proceed; the target is specified.",
            TriageLevel::Ambiguous => "Ask a clarifying question or confirm the target first.",
            TriageLevel::CrossService => "Check contracts and shared types in every affected service.",
            TriageLevel::MultiStep => "Write a plan and confirm the steps before starting.",
        }
    }
}

impl std::fmt::Display for TriageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TriageLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRIVIAL" => Ok(TriageLevel::Trivial),
            "CLEAR" => Ok(TriageLevel::Clear),
            "AMBIGUOUS" => Ok(TriageLevel::Ambiguous),
            "CROSS_SERVICE" => Ok(TriageLevel::CrossService),
            "MULTI_STEP" => Ok(TriageLevel::MultiStep),
            _ => Err(format!("unknown triage level: {}", s)),
        }
    }
}

/// The guard that decided a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageRule {
    SkipKeyword,
    MultiStep,
    CrossService,
    AlwaysCheck,
    ShortCommand,
    ShortWithoutPath,
    VagueReference,
    Default,
}

impl TriageRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriageRule::SkipKeyword => "skip_keyword",
            TriageRule::MultiStep => "multi_step",
            TriageRule::CrossService => "cross_service",
            TriageRule::AlwaysCheck => "always_check",
            TriageRule::ShortCommand => "short_command",
            TriageRule::ShortWithoutPath => "short_without_path",
            TriageRule::VagueReference => "vague_reference",
            TriageRule::Default => "default",
        }
    }
}

/// Result of classifying one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub level: TriageLevel,
    /// Guard that produced the level before escalation
    pub rule: TriageRule,
    /// Keyword or word that made the guard fire, when there is one
    pub trigger: Option<String>,
    /// Id of the learned pattern that promoted the level
    pub escalated_by: Option<String>,
}

impl Classification {
    fn new(level: TriageLevel, rule: TriageRule, trigger: Option<String>) -> Self {
        Self {
            level,
            rule,
            trigger,
            escalated_by: None,
        }
    }
}

/// Classify an instruction.
pub fn classify(instruction: &str, config: &TriageConfig, patterns: &[Pattern]) -> Classification {
    let instruction = instruction.trim();
    let mut result = decide(instruction, config);

    if result.level < TriageLevel::Ambiguous {
        if let Some(pattern) = match_patterns(instruction, patterns).into_iter().next() {
            tracing::debug!(
                pattern_id = %pattern.id,
                from = %result.level,
                "Escalating instruction matched by learned pattern"
            );
            result.level = TriageLevel::Ambiguous;
            result.escalated_by = Some(pattern.id.clone());
        }
    }

    result
}

fn decide(instruction: &str, config: &TriageConfig) -> Classification {
    use TriageLevel::*;

    if let Some(term) = first_term(instruction, &config.skip) {
        return Classification::new(Trivial, TriageRule::SkipKeyword, Some(term));
    }

    let words = text::words(instruction);

    if let Some(term) = first_term(instruction, &config.multi_step) {
        return Classification::new(MultiStep, TriageRule::MultiStep, Some(term));
    }
    let verbs = distinct_imperative_verbs(&words);
    if verbs.len() >= MULTI_VERB_THRESHOLD {
        return Classification::new(MultiStep, TriageRule::MultiStep, Some(verbs.join(", ")));
    }

    if let Some(term) = first_term(instruction, &config.cross_service) {
        return Classification::new(CrossService, TriageRule::CrossService, Some(term));
    }

    if let Some(term) = first_term(instruction, &config.always_check) {
        return Classification::new(Ambiguous, TriageRule::AlwaysCheck, Some(term));
    }

    let length = instruction.chars().count();

    if length < SHORT_COMMAND_MAX_CHARS {
        if let Some(first) = words.first() {
            if config.short_commands.iter().any(|c| c.eq_ignore_ascii_case(first)) {
                return Classification::new(Trivial, TriageRule::ShortCommand, Some(first.clone()));
            }
        }
    }

    if length < config.strictness.ambiguity_length_threshold()
        && !text::has_path_reference(instruction)
    {
        return Classification::new(Ambiguous, TriageRule::ShortWithoutPath, None);
    }

    if config.strictness.flags_vague_references() {
        if let Some(word) = vague_reference(&words) {
            return Classification::new(Ambiguous, TriageRule::VagueReference, Some(word));
        }
    }

    Classification::new(Clear, TriageRule::Default, None)
}

fn first_term(instruction: &str, terms: &[String]) -> Option<String> {
    terms
        .iter()
        .find(|t| text::contains_term(instruction, t))
        .cloned()
}

fn distinct_imperative_verbs(words: &[String]) -> Vec<&str> {
    let mut found: Vec<&str> = Vec::new();
    for word in words {
        if let Some(verb) = IMPERATIVE_VERBS.iter().find(|v| **v == word.as_str()) {
            if !found.contains(verb) {
                found.push(verb);
            }
        }
    }
    found
}

/// A vague pronoun, or a vague verb followed by nothing concrete.
fn vague_reference(words: &[String]) -> Option<String> {
    if let Some(pronoun) = words.iter().find(|w| VAGUE_PRONOUNS.contains(&w.as_str())) {
        return Some(pronoun.clone());
    }
    words.iter().enumerate().find_map(|(i, w)| {
        if !VAGUE_VERBS.contains(&w.as_str()) {
            return None;
        }
        match words.get(i + 1) {
            None => Some(w.clone()),
            Some(next) if NON_OBJECTS.contains(&next.as_str()) => Some(w.clone()),
            _ => None,
        }
    })
}
