//! Lexical helpers shared by the normalizer, classifier and scorecard.

use once_cell::sync::Lazy;
use regex::Regex;

/// Path-shaped candidates: a slash-separated path (`src/auth/jwt.rs`,
/// `./docs/`, `/etc/hosts`) or a bare file name with a source-like extension
/// (`main.rs`, `package.json`). Slash candidates are filtered by
/// [`is_path_like`].
static PATH_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?:\.{0,2}/)?[\w.@-]+(?:/[\w.@-]+)+/?
        |
        \b[\w-]+\.(?:rs|toml|py|ts|tsx|js|jsx|mjs|go|java|kt|rb|swift|c|h|cc|cpp|hpp|cs|php|sql|sh|md|json|ya?ml|html|css|scss|vue|svelte|lock|txt|ini|cfg|env)\b
        ",
    )
    .expect("path reference regex is valid")
});

/// Whether a candidate looks like a path rather than a word pair.
///
/// `and/or` and `client/server` are prose. A single slash between two plain
/// words only counts when something else marks it as a path: a leading or
/// trailing slash, a second separator, a dot, or a non-letter character.
fn is_path_like(candidate: &str) -> bool {
    if candidate.starts_with('/') || candidate.starts_with("./") || candidate.starts_with("../")
    {
        return true;
    }
    if candidate.ends_with('/') || candidate.matches('/').count() >= 2 {
        return true;
    }
    candidate.chars().any(|c| c != '/' && !c.is_alphabetic())
}

fn path_references<'a>(text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    PATH_REF
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|candidate| is_path_like(candidate))
}

/// Whether the text mentions a file or directory path.
pub fn has_path_reference(text: &str) -> bool {
    path_references(text).next().is_some()
}

/// The last path-like substring of the text, if any.
pub fn last_path_reference(text: &str) -> Option<&str> {
    path_references(text).last()
}

/// Leading directory component of a path, used as a coarse "area".
///
/// `./src/auth/jwt.rs` → `src`; a bare file name maps to `.`.
pub fn leading_area(path: &str) -> String {
    let trimmed = path.trim_start_matches("./").trim_start_matches('/');
    match trimmed.split_once('/') {
        Some((head, _)) if !head.is_empty() => head.to_lowercase(),
        _ => ".".to_string(),
    }
}

/// Case-insensitive term search honoring word boundaries.
///
/// A boundary is only required on a side where the term itself starts or
/// ends with an alphanumeric character, so terms like `first,` still match.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return false;
    }
    let haystack = haystack.to_lowercase();

    let needs_left = term.chars().next().is_some_and(is_word_char);
    let needs_right = term.chars().last().is_some_and(is_word_char);

    let mut start = 0;
    while let Some(offset) = haystack[start..].find(&term) {
        let at = start + offset;
        let end = at + term.len();
        let left_ok = !needs_left || !haystack[..at].chars().last().is_some_and(is_word_char);
        let right_ok = !needs_right || !haystack[end..].chars().next().is_some_and(is_word_char);
        if left_ok && right_ok {
            return true;
        }
        start = at + haystack[at..].chars().next().map_or(1, char::len_utf8);
    }
    false
}

/// Whether any of the terms occurs in the haystack (see [`contains_term`]).
pub fn contains_any_term<S: AsRef<str>>(haystack: &str, terms: &[S]) -> bool {
    terms.iter().any(|t| contains_term(haystack, t.as_ref()))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Lowercased alphanumeric words of the text, in order.
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Truncate to at most `max_chars` characters, appending `…` when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}…", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_reference() {
        assert!(has_path_reference("update src/auth/jwt.rs to refresh tokens"));
        assert!(has_path_reference("look at main.rs"));
        assert!(has_path_reference("check ./scripts/"));
        assert!(!has_path_reference("fix the button color"));
        assert!(!has_path_reference("make it faster."));
    }

    #[test]
    fn test_slash_word_pairs_are_not_paths() {
        assert!(!has_path_reference("handle the client/server handshake"));
        assert!(!has_path_reference("tests and/or docs"));
        assert!(!has_path_reference("clean up input/output handling"));
        assert_eq!(last_path_reference("see and/or fix src/io.rs"), Some("src/io.rs"));

        assert!(has_path_reference("move it under src/auth/"));
        assert!(has_path_reference("read /etc/hosts"));
        assert!(has_path_reference("bump v2/routes"));
        assert!(has_path_reference("the web_app/pages folder"));
    }

    #[test]
    fn test_last_path_and_area() {
        let text = "compare src/api/routes.ts with web/pages/index.tsx";
        assert_eq!(last_path_reference(text), Some("web/pages/index.tsx"));
        assert_eq!(leading_area("web/pages/index.tsx"), "web");
        assert_eq!(leading_area("./src/lib.rs"), "src");
        assert_eq!(leading_area("/etc/hosts"), "etc");
        assert_eq!(leading_area("Cargo.toml"), ".");
    }

    #[test]
    fn test_contains_term_word_boundaries() {
        assert!(contains_term("No, the auth test", "no"));
        assert!(!contains_term("another note", "no"));
        assert!(contains_term("First, add the route", "first,"));
        assert!(contains_term("run git status please", "git status"));
        assert!(!contains_term("anything", "then"));
        assert!(!contains_term("text", ""));
    }

    #[test]
    fn test_contains_term_multibyte_haystack() {
        assert!(contains_term("café then deploy", "then"));
        assert!(!contains_term("ééé", "e"));
    }

    #[test]
    fn test_words() {
        assert_eq!(words("Fix it, then ship!"), vec!["fix", "it", "then", "ship"]);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc…");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }
}
