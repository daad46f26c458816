//! Text matching helpers for the rule evaluator
//!
//! Ingredient names and preference entries are compared as sequences of
//! lowercase word tokens with a naive plural fold, so "Peanuts" matches
//! "peanut" and "tree nuts" matches "chopped tree nut".

use std::sync::LazyLock;

use regex::Regex;

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d+(?:\.\d+)?)(?:\s*(?:-|–|to)\s*(\d+(?:\.\d+)?))?\s*(hours?|hrs?|h|minutes?|mins?|m)\b",
    )
    .expect("Invalid duration pattern")
});

static BARE_NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*$").expect("Invalid number pattern"));

/// Words that qualify an ingredient without changing what it is
const DESCRIPTORS: &[&str] = &[
    "fresh", "freshly", "ground", "dried", "crushed", "cracked", "coarse", "fine", "flaky", "kosher", "sea",
    "extra", "virgin", "pinch", "of", "to", "taste", "a", "some", "optional",
];

/// Fold a single lowercase word to a crude singular
pub(crate) fn fold_plural(word: &str) -> String {
    if word.len() > 4 && word.ends_with("ies") {
        format!("{}y", &word[..word.len() - 3])
    } else if word.len() > 4 && (word.ends_with("oes") || word.ends_with("shes") || word.ends_with("ches")) {
        word[..word.len() - 2].to_string()
    } else if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

/// Split text into folded lowercase word tokens
pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(fold_plural)
        .collect()
}

/// True when `needle`'s tokens appear contiguously in `haystack`'s tokens
pub(crate) fn contains_phrase(haystack: &str, needle: &str) -> bool {
    let needle = tokens(needle);
    if needle.is_empty() {
        return false;
    }
    let haystack = tokens(haystack);
    haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}

/// Like `contains_phrase`, but an occurrence directly preceded by one of
/// `qualifiers`, or directly followed by "free", does not count
///
/// "coconut milk" contains "milk", yet with `coconut` as a qualifier it is
/// not a match; "milk and coconut milk" still is. "gluten-free" never
/// matches "gluten".
pub(crate) fn contains_unqualified(haystack: &str, needle: &str, qualifiers: &[&str]) -> bool {
    let needle = tokens(needle);
    if needle.is_empty() {
        return false;
    }
    let haystack = tokens(haystack);
    let qualifiers: Vec<Vec<String>> = qualifiers.iter().map(|q| tokens(q)).collect();
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, w)| *w == needle.as_slice())
        .any(|(start, _)| {
            let end = start + needle.len();
            let negated = haystack.get(end).is_some_and(|w| w == "free");
            let qualified = qualifiers
                .iter()
                .any(|q| !q.is_empty() && start >= q.len() && haystack[start - q.len()..start] == q[..]);
            !negated && !qualified
        })
}

/// Normalize a dietary label: case, spaces and hyphens ignored
pub(crate) fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// True for list entries that only say "nothing here"
pub(crate) fn is_placeholder(entry: &str) -> bool {
    matches!(normalize_label(entry).as_str(), "" | "none" | "n/a" | "na" | "nil")
}

/// Decide whether an ingredient is a seasoning that does not count as a main ingredient
///
/// Descriptor words are dropped first, so "freshly ground black pepper"
/// matches "black pepper" but "bell pepper" matches nothing. Names ending in
/// "oil" always count as seasoning. "salt and pepper" is split on "and".
pub(crate) fn is_seasoning(name: &str, seasonings: &[Vec<String>]) -> bool {
    let words = tokens(name);
    let parts: Vec<&[String]> = words.split(|w| w == "and").filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return false;
    }
    parts.iter().all(|part| {
        let core: Vec<String> = part
            .iter()
            .filter(|w| !DESCRIPTORS.contains(&w.as_str()))
            .cloned()
            .collect();
        if core.is_empty() {
            return false;
        }
        if core.last().map(String::as_str) == Some("oil") {
            return true;
        }
        seasonings.iter().any(|s| *s == core)
    })
}

/// Read a free-text duration as whole minutes
///
/// Each "<n> <unit>" group counts with the upper bound of ranges such as
/// "15-20 minutes". When the text names a total ("Total 20 minutes (5 prep,
/// 15 cook)", "20 min total") that figure wins; otherwise a group equal to
/// the sum of all the others is taken as the total, and failing that the
/// groups are added up. A bare number is read as minutes. Returns `None`
/// when nothing in the text looks like a duration.
pub(crate) fn parse_minutes(text: &str) -> Option<u32> {
    if let Some(caps) = BARE_NUMBER_PATTERN.captures(text) {
        return caps[1].parse::<f64>().ok().map(|m| m.ceil() as u32);
    }

    let mut durations: Vec<DurationMatch> = Vec::new();
    for caps in DURATION_PATTERN.captures_iter(text) {
        let low: f64 = caps[1].parse().ok()?;
        let amount = match caps.get(2) {
            Some(high) => high.as_str().parse().ok()?,
            None => low,
        };
        let unit = caps[3].to_lowercase();
        let minutes = if unit.starts_with('h') { amount * 60.0 } else { amount };
        let (start, end) = caps.get(0).map_or((0, 0), |m| (m.start(), m.end()));
        durations.push(DurationMatch { start, end, minutes });
    }
    if durations.is_empty() {
        return None;
    }

    let minutes = stated_total(text, &durations).unwrap_or_else(|| durations.iter().map(|d| d.minutes).sum());
    Some(minutes.ceil() as u32)
}

/// One "<n> <unit>" group and its byte span
struct DurationMatch {
    start: usize,
    end: usize,
    minutes: f64,
}

/// The duration the text presents as its total, if any
fn stated_total(text: &str, durations: &[DurationMatch]) -> Option<f64> {
    if let Some(pos) = text.to_lowercase().find("total") {
        // "Total: 20 min" and "20 min total" both name the figure next to the word
        let distance = |d: &DurationMatch| if d.start > pos { d.start - pos } else { pos.saturating_sub(d.end) };
        if let Some(nearest) = durations.iter().min_by_key(|d| distance(*d)) {
            return Some(nearest.minutes);
        }
    }

    if durations.len() < 3 {
        return None;
    }
    let sum: f64 = durations.iter().map(|d| d.minutes).sum();
    durations
        .iter()
        .map(|d| d.minutes)
        .find(|m| (sum - m - m).abs() < 1e-9)
}
