//! Name normalization and fuzzy lookup.
//!
//! Everything here works on normalized strings (see [`normalize`]) so that
//! `"Date Picker"`, `"date-picker"` and `"date_picker"` compare equal.

use serde::Serialize;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// How an item matched a query. Variants are listed in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Prefix,
    Suffix,
    Contains,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FuzzyMatch {
    pub item: String,
    pub distance: usize,
    pub match_type: MatchType,
}

/// Knobs for [`fuzzy_search`].
#[derive(Debug, Clone)]
pub struct FuzzyOptions {
    /// Only constrains the fuzzy class.
    pub max_distance: usize,
    pub max_results: usize,
    pub exact: bool,
    pub prefix: bool,
    pub suffix: bool,
    pub contains: bool,
    pub fuzzy: bool,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        Self {
            max_distance: 3,
            max_results: 10,
            exact: true,
            prefix: true,
            suffix: true,
            contains: true,
            fuzzy: false,
        }
    }
}

/// Trim, lowercase, strip diacritics and collapse runs of whitespace,
/// `-` and `_` into a single space.
pub fn normalize(s: &str) -> String {
    let stripped: String = s
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    let mut out = String::with_capacity(stripped.len());
    let mut pending_space = false;
    for c in stripped.chars() {
        if c.is_whitespace() || c == '-' || c == '_' {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

/// Levenshtein edit distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev_row: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_chars.len()]
}

/// Item with the smallest edit distance to `query`, first occurrence wins ties.
/// `None` only when `items` is empty.
pub fn find_closest<S: AsRef<str>>(query: &str, items: &[S]) -> Option<String> {
    let query = normalize(query);
    let mut best: Option<(&str, usize)> = None;

    for item in items {
        let item = item.as_ref();
        let distance = levenshtein(&query, &normalize(item));
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((item, distance)),
        }
    }

    best.map(|(item, _)| item.to_string())
}

fn classify(query: &str, item: &str, options: &FuzzyOptions) -> Option<(MatchType, usize)> {
    if options.exact && item == query {
        return Some((MatchType::Exact, 0));
    }
    // An empty query would otherwise match everything below.
    if !query.is_empty() {
        if options.prefix && item.starts_with(query) {
            return Some((MatchType::Prefix, 0));
        }
        if options.suffix && item.ends_with(query) {
            return Some((MatchType::Suffix, 0));
        }
        if options.contains && item.contains(query) {
            return Some((MatchType::Contains, 0));
        }
    }
    if options.fuzzy {
        let distance = levenshtein(query, item);
        if distance <= options.max_distance {
            return Some((MatchType::Fuzzy, distance));
        }
    }
    None
}

/// Classify every item against `query`, sorted by distance then item.
pub fn fuzzy_search<S: AsRef<str>>(
    query: &str,
    items: &[S],
    options: &FuzzyOptions,
) -> Vec<FuzzyMatch> {
    let query = normalize(query);
    let mut seen: HashSet<&str> = HashSet::new();

    let mut results: Vec<FuzzyMatch> = items
        .iter()
        .map(|item| item.as_ref())
        .filter(|item| seen.insert(*item))
        .filter_map(|item| {
            classify(&query, &normalize(item), options).map(|(match_type, distance)| FuzzyMatch {
                item: item.to_string(),
                distance,
                match_type,
            })
        })
        .collect();

    results.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.item.cmp(&b.item)));
    results.truncate(options.max_results);
    results
}
