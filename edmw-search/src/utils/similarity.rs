//! String similarity scoring
//!
//! Manufacturer names use a token-sorted Levenshtein ratio so word order
//! ("Instruments Texas") does not matter; part-candidate similarity weights
//! part number 60% and manufacturer 40%.

use crate::models::{CandidatePart, PartQuery};

const PART_NUMBER_WEIGHT: f64 = 0.6;
const MANUFACTURER_WEIGHT: f64 = 0.4;

/// Lower-cased alphanumeric tokens, sorted and space-joined
fn token_sort_key(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Similarity of two manufacturer names on a 0-100 scale.
///
/// Best of the plain case-insensitive ratio and the token-sorted ratio.
pub fn name_score(a: &str, b: &str) -> u8 {
    let a_lower = a.trim().to_lowercase();
    let b_lower = b.trim().to_lowercase();
    if a_lower.is_empty() || b_lower.is_empty() {
        return 0;
    }

    let plain = strsim::normalized_levenshtein(&a_lower, &b_lower);
    let token_sorted = strsim::normalized_levenshtein(&token_sort_key(a), &token_sort_key(b));
    let best = plain.max(token_sorted);

    (best * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Reference names ranked by `name_score` against `subject`, best first.
///
/// Ties keep reference-list order. At most `limit` entries.
pub fn rank_names(subject: &str, reference: &[String], limit: usize) -> Vec<(String, u8)> {
    let mut scored: Vec<(String, u8)> = reference
        .iter()
        .map(|name| (name.clone(), name_score(subject, name)))
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.truncate(limit);
    scored
}

fn upper_ratio(a: &str, b: &str) -> f64 {
    let a = a.trim().to_uppercase();
    let b = b.trim().to_uppercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}

/// Weighted similarity (0.0-1.0) of a candidate to the query
pub fn candidate_similarity(query: &PartQuery, candidate: &CandidatePart) -> f64 {
    let pn = upper_ratio(query.part_number(), &candidate.part_number);
    let mfg = upper_ratio(query.manufacturer(), &candidate.manufacturer);
    pn * PART_NUMBER_WEIGHT + mfg * MANUFACTURER_WEIGHT
}
