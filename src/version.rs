//! Maps npm-style dependency ranges onto the documentation versions we serve.
//!
//! Only a small subset of range syntax is understood:
//!
//! - a single version or caret/tilde/comparator range: `2`, `^2.3.1`, `~2.1`, `v6`, `>=2.0.0`, `<=3`
//! - combined bounds: `>=X <=Y`, `>=X <Y` (the `>=` bound wins)
//! - inclusive hyphen ranges: `X - Y` (the lower bound wins)
//!
//! Anything else resolves to `None`: URL, path and alias dependencies
//! (colon, slash or leading dot), unions (`||`), and bare `<`/`>` bounds
//! that are not paired with `>=`/`<=`.

use crate::matcher::{FuzzyOptions, fuzzy_search};

/// Strip leading `~^v<>=` and keep everything before the first `.`.
pub fn dep_major_version_normalize(version: &str) -> String {
    let trimmed = version
        .trim()
        .trim_start_matches(|c: char| matches!(c, '~' | '^' | 'v' | '<' | '>' | '='));
    trimmed.split('.').next().unwrap_or_default().trim().to_string()
}

fn has_bare_comparator(range: &str) -> bool {
    let chars: Vec<char> = range.chars().collect();
    chars
        .iter()
        .enumerate()
        .any(|(i, c)| matches!(c, '<' | '>') && chars.get(i + 1) != Some(&'='))
}

fn relevant_bound(range: &str) -> Option<&str> {
    if let Some((lower, _upper)) = range.split_once(" - ") {
        return Some(lower.trim()).filter(|lower| !lower.is_empty());
    }

    let tokens: Vec<&str> = range.split_whitespace().collect();
    tokens
        .iter()
        .find(|token| token.starts_with(">="))
        .or_else(|| tokens.first())
        .copied()
}

/// Resolve `raw_range` to one of `supported_versions`, or `None` when the
/// range is unsupported or names a version we do not carry.
pub fn match_package_version<S: AsRef<str>>(raw_range: &str, supported_versions: &[S]) -> Option<String> {
    let range = raw_range.trim();
    if range.is_empty() || range.contains(':') || range.contains('/') || range.starts_with('.') {
        return None;
    }
    if range.contains("||") {
        return None;
    }
    if has_bare_comparator(range) && !(range.contains(">=") || range.contains("<=")) {
        return None;
    }

    let token = dep_major_version_normalize(relevant_bound(range)?);
    if token.is_empty() {
        return None;
    }

    let supported: Vec<&str> = supported_versions.iter().map(AsRef::as_ref).collect();
    if let Some(exact) = supported.iter().find(|v| **v == token) {
        return Some(exact.to_string());
    }

    let normalized: Vec<String> = supported.iter().map(|v| dep_major_version_normalize(v)).collect();
    let options = FuzzyOptions {
        max_distance: 0,
        prefix: false,
        suffix: false,
        contains: false,
        fuzzy: true,
        ..Default::default()
    };
    let best = fuzzy_search(&token, &normalized, &options).into_iter().next()?;

    normalized
        .iter()
        .position(|v| *v == best.item)
        .map(|index| supported[index].to_string())
}
