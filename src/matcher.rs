//! Fuzzy title matching.
//!
//! Titles are compared in a processed form (see [`process_name`]) using
//! normalized Levenshtein similarity expressed as a percentage. Callers
//! process both sides before matching; [`strings_match`] compares its inputs
//! as given.

use std::sync::OnceLock;

use regex::Regex;

/// Default minimum similarity for two titles to be considered the same name.
pub const DEFAULT_MIN_MATCH_PERCENTAGE: f64 = 70.0;

fn non_word() -> Option<&'static Regex> {
    static NON_WORD: OnceLock<Option<Regex>> = OnceLock::new();
    NON_WORD
        .get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").ok())
        .as_ref()
}

/// Reduces a name to its comparison form.
///
/// Case is folded, every run of punctuation and whitespace becomes a single
/// space, and the ends are trimmed.
///
/// # Examples
///
/// ```
/// use gig_reconcile::matcher::process_name;
///
/// assert_eq!(process_name("  ACME, Co. "), "acme co");
/// ```
#[must_use]
pub fn process_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    match non_word() {
        Some(re) => re.replace_all(&lowered, " ").trim().to_string(),
        None => lowered.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Similarity of two strings in `0.0..=100.0`.
///
/// Symmetric and deterministic. Two empty strings are identical.
#[must_use]
pub fn match_percentage(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// True if `a` and `b` are at least `min_percentage` similar.
#[must_use]
pub fn strings_match(a: &str, b: &str, min_percentage: f64) -> bool {
    match_percentage(a, b) >= min_percentage
}
