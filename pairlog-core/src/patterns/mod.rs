//! Correction pattern learning
//!
//! Clusters the correction log into recurring [`Pattern`]s by keyword
//! overlap, and matches new instructions against learned patterns.
//!
//! Clustering is a greedy single pass in log order: each correction not yet
//! assigned seeds a cluster and absorbs every later unassigned correction
//! whose keyword overlap with the seed is at least [`MERGE_THRESHOLD`].
//! Clusters with a single member are dropped. Patterns are recomputed from
//! the whole log on every refresh.

mod learner;

pub use learner::{CategorySummary, LogOutcome, PatternLearner};

use crate::text;
use crate::types::{Correction, CorrectionCategory, Pattern};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

/// Minimum overlap ratio (shared ÷ smaller set) for two corrections to cluster.
pub const MERGE_THRESHOLD: f64 = 0.3;

/// Keyword hits needed for an instruction to match a pattern.
pub const MATCH_MIN_KEYWORDS: usize = 2;

const MAX_KEYWORDS: usize = 8;
const MAX_EXAMPLES: usize = 3;
const CONTEXT_MAX_CHARS: usize = 200;
const MIN_TOKEN_CHARS: usize = 3;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "these", "those", "you", "your", "yours", "was",
    "were", "are", "not", "but", "have", "has", "had", "from", "they", "them", "their", "there",
    "then", "than", "what", "when", "where", "which", "who", "why", "how", "should", "would",
    "could", "did", "does", "doing", "done", "into", "onto", "about", "just", "like", "also",
    "only", "some", "any", "all", "can", "will", "been", "being", "more", "most", "other", "very",
    "too", "our", "his", "her", "she", "him", "out", "its", "didnt", "dont", "doesnt",
    "wasnt", "isnt", "wont", "cant", "one", "use", "used", "using", "want", "wanted", "said",
    "told", "asked", "instead", "wrong", "again", "still", "yet", "now", "please", "make", "made",
    "need", "needed", "get", "got", "let", "lets", "user", "ive", "because", "before",
    "after", "over", "under", "without", "within", "each", "every", "same", "such", "here",
];

/// Extract the keyword set of a text.
///
/// Lowercases, keeps alphanumerics, whitespace, `/` and `.`, splits on
/// whitespace, trims edge dots, then drops short tokens and stop words.
/// Order of first appearance is preserved and duplicates are removed.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '/' || *c == '.')
        .collect();

    let mut keywords: Vec<String> = Vec::new();
    for token in cleaned.split_whitespace() {
        let token = token.trim_matches('.');
        if token.chars().count() < MIN_TOKEN_CHARS || STOP_WORDS.contains(&token) {
            continue;
        }
        if !keywords.iter().any(|k| k == token) {
            keywords.push(token.to_string());
        }
    }
    keywords
}

/// Shared keywords divided by the size of the smaller set.
///
/// Zero when either set is empty.
pub fn overlap_ratio(a: &[String], b: &[String]) -> f64 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    let shared = a.iter().filter(|k| b.contains(k)).count();
    shared as f64 / smaller as f64
}

/// Cluster corrections into patterns, most frequent first.
pub fn cluster_corrections(corrections: &[Correction]) -> Vec<Pattern> {
    let keyword_sets: Vec<Vec<String>> = corrections
        .iter()
        .map(|c| extract_keywords(&c.text()))
        .collect();

    let mut assigned = vec![false; corrections.len()];
    let mut patterns = Vec::new();

    for seed in 0..corrections.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut members = vec![seed];

        for candidate in (seed + 1)..corrections.len() {
            if !assigned[candidate]
                && overlap_ratio(&keyword_sets[seed], &keyword_sets[candidate]) >= MERGE_THRESHOLD
            {
                assigned[candidate] = true;
                members.push(candidate);
            }
        }

        if members.len() >= 2 {
            let member_corrections: Vec<&Correction> =
                members.iter().map(|&i| &corrections[i]).collect();
            let member_keywords: Vec<&[String]> =
                members.iter().map(|&i| keyword_sets[i].as_slice()).collect();
            patterns.push(build_pattern(&member_corrections, &member_keywords));
        }
    }

    // Stable: equal frequencies keep log order
    patterns.sort_by(|a, b| b.frequency.cmp(&a.frequency));

    tracing::debug!(
        corrections = corrections.len(),
        patterns = patterns.len(),
        "Clustered corrections"
    );
    patterns
}

fn build_pattern(members: &[&Correction], keyword_sets: &[&[String]]) -> Pattern {
    let keywords = rank_keywords(keyword_sets);
    let category = dominant_category(members);

    let description = format!(
        "Recurring {}: {}",
        category,
        keywords.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
    );

    let context = members
        .iter()
        .map(|c| c.text())
        .fold(String::new(), |longest, t| {
            if t.chars().count() > longest.chars().count() {
                t
            } else {
                longest
            }
        });

    Pattern {
        id: pattern_id(members),
        pattern: description,
        keywords,
        frequency: members.len(),
        last_seen: members
            .iter()
            .map(|c| c.logged_at)
            .max()
            .unwrap_or_default(),
        context: text::truncate_chars(context.trim(), CONTEXT_MAX_CHARS),
        examples: members
            .iter()
            .take(MAX_EXAMPLES)
            .map(|c| c.what_user_said.clone())
            .collect(),
        category,
    }
}

/// Keywords ranked by how many members contain them, ties alphabetical.
fn rank_keywords(keyword_sets: &[&[String]]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for set in keyword_sets {
        for keyword in set.iter() {
            *counts.entry(keyword.as_str()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(k, _)| k.to_string())
        .collect()
}

/// Most common category; ties go to the earlier category.
fn dominant_category(members: &[&Correction]) -> CorrectionCategory {
    let mut counts: BTreeMap<CorrectionCategory, usize> = BTreeMap::new();
    for c in members {
        *counts.entry(c.category).or_insert(0) += 1;
    }
    let mut best = CorrectionCategory::Other;
    let mut best_count = 0;
    for (category, count) in counts {
        if count > best_count {
            best = category;
            best_count = count;
        }
    }
    best
}

/// `pat-` plus a SHA-256 prefix over the sorted member ids.
fn pattern_id(members: &[&Correction]) -> String {
    let mut ids: Vec<&str> = members.iter().map(|c| c.id.as_str()).collect();
    ids.sort_unstable();

    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hex::encode(hasher.finalize());
    format!("pat-{}", &digest[..12])
}

/// Patterns with at least [`MATCH_MIN_KEYWORDS`] keywords occurring in the
/// lowercased instruction, in the given order.
pub fn match_patterns<'a>(instruction: &str, patterns: &'a [Pattern]) -> Vec<&'a Pattern> {
    let lowered = instruction.to_lowercase();
    patterns
        .iter()
        .filter(|p| {
            p.keywords
                .iter()
                .filter(|k| lowered.contains(k.as_str()))
                .count()
                >= MATCH_MIN_KEYWORDS
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn correction(id: &str, said: &str, wrong: &str, cause: &str) -> Correction {
        Correction {
            id: id.to_string(),
            project: "shop".to_string(),
            what_user_said: said.to_string(),
            what_you_did_wrong: wrong.to_string(),
            root_cause: cause.to_string(),
            category: CorrectionCategory::WrongAssumption,
            logged_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn auth_log() -> Vec<Correction> {
        vec![
            correction(
                "c1",
                "no, the auth jwt expiry",
                "changed session cookie",
                "ignored jwt expiry",
            ),
            correction(
                "c2",
                "auth broke on jwt expiry again",
                "patched login form",
                "jwt expiry check missing",
            ),
            correction(
                "c3",
                "button color is off",
                "edited navbar styles",
                "misread design mock",
            ),
        ]
    }

    #[test]
    fn test_extract_keywords() {
        let keywords = extract_keywords("No, the AUTH token in src/auth.rs... it's wrong! auth again");
        assert_eq!(keywords, vec!["auth", "token", "src/auth.rs"]);
    }

    #[test]
    fn test_overlap_ratio() {
        let a = vec!["auth".to_string(), "jwt".to_string(), "expiry".to_string()];
        let b = vec!["jwt".to_string(), "expiry".to_string()];
        assert_eq!(overlap_ratio(&a, &b), 1.0);
        assert_eq!(overlap_ratio(&a, &[]), 0.0);
    }

    #[test]
    fn test_related_corrections_cluster_and_unrelated_is_dropped() {
        let patterns = cluster_corrections(&auth_log());
        assert_eq!(patterns.len(), 1);

        let pattern = &patterns[0];
        assert_eq!(pattern.frequency, 2);
        assert!(pattern.keywords.starts_with(&[
            "auth".to_string(),
            "expiry".to_string(),
            "jwt".to_string()
        ]));
        assert_eq!(pattern.pattern, "Recurring wrong_assumption: auth, expiry, jwt");
        assert_eq!(pattern.examples.len(), 2);
        assert!(pattern.id.starts_with("pat-"));
        assert_eq!(pattern.id.len(), 16);
    }

    #[test]
    fn test_refresh_is_idempotent_and_order_insensitive() {
        let log = auth_log();
        let first = cluster_corrections(&log);
        assert_eq!(first, cluster_corrections(&log));

        let mut reversed = log.clone();
        reversed.reverse();
        let permuted = cluster_corrections(&reversed);
        assert_eq!(permuted.len(), 1);
        assert_eq!(permuted[0].id, first[0].id);
    }

    #[test]
    fn test_patterns_sorted_by_frequency() {
        let auth = auth_log();
        let log = vec![
            auth[2].clone(),
            correction("c4", "navbar button color", "edited footer", "wrong styles file"),
            auth[0].clone(),
            auth[1].clone(),
            correction("c6", "jwt expiry once more", "cookie", "auth jwt expiry"),
        ];
        let patterns = cluster_corrections(&log);
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].frequency, 3);
        assert_eq!(patterns[0].keywords[0], "auth");
        assert_eq!(patterns[1].frequency, 2);
        assert!(patterns[1].keywords.contains(&"navbar".to_string()));
    }

    #[test]
    fn test_match_patterns_requires_two_hits() {
        let mut pattern = cluster_corrections(&auth_log()).remove(0);
        pattern.keywords = vec!["auth".into(), "token".into(), "expiry".into()];
        let patterns = vec![pattern];

        assert_eq!(match_patterns("auth token refresh broke again", &patterns).len(), 1);
        assert!(match_patterns("fix the button color", &patterns).is_empty());
        assert!(match_patterns("auth only", &patterns).is_empty());
    }

    #[test]
    fn test_empty_log_yields_no_patterns() {
        assert!(cluster_corrections(&[]).is_empty());
    }
}
