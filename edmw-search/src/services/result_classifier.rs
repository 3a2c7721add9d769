//! Result Classifier
//!
//! Maps candidate counts to a match category, and disambiguates `Multiple`
//! results by similarity (optionally with an AI assist suggestion).

use crate::models::{CandidatePart, MatchResult, MatchType, PartQuery, Suggestion, SuggestionSource};
use crate::types::AiAssist;
use crate::utils::candidate_similarity;

/// 0 → `None`, 1 → `Found`, more → `Multiple`.
///
/// Transport faults never reach this function; they are classified `Error`
/// by the executor.
pub fn classify(candidates: &[CandidatePart]) -> MatchType {
    match candidates.len() {
        0 => MatchType::None,
        1 => MatchType::Found,
        _ => MatchType::Multiple,
    }
}

/// Disambiguate a `Multiple` result.
///
/// - A candidate whose part number equals the query (case-insensitive)
///   keeps the result `Multiple`, flagged auto-promotable via its suggestion.
/// - Otherwise the best weighted similarity is suggested; below `threshold`
///   the result becomes `NeedReview`.
///
/// Any other match type is returned unchanged.
pub fn disambiguate(query: &PartQuery, result: &MatchResult, threshold: f64) -> MatchResult {
    if result.match_type() != MatchType::Multiple {
        return result.clone();
    }

    let candidates = result.candidates();

    if let Some(index) = candidates
        .iter()
        .position(|c| c.part_number.trim().eq_ignore_ascii_case(query.part_number()))
    {
        let suggestion = Suggestion {
            index,
            score: candidate_similarity(query, &candidates[index]),
            exact_part_number: true,
            source: SuggestionSource::Similarity,
            reasoning: Some("Exact part number match".to_string()),
        };
        return result.reclassified(MatchType::Multiple, Some(suggestion));
    }

    let best = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, candidate_similarity(query, c)))
        .fold(None, |best: Option<(usize, f64)>, (i, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((i, score)),
        });

    let Some((index, score)) = best else {
        return result.clone();
    };

    let suggestion = Suggestion {
        index,
        score,
        exact_part_number: false,
        source: SuggestionSource::Similarity,
        reasoning: Some(format!("Best similarity {:.0}%", score * 100.0)),
    };

    let match_type = if score < threshold {
        MatchType::NeedReview
    } else {
        MatchType::Multiple
    };

    tracing::debug!(
        part_number = %query.part_number(),
        best_index = index,
        score,
        match_type = %match_type,
        "Disambiguated multiple candidates"
    );

    result.reclassified(match_type, Some(suggestion))
}

/// `disambiguate`, then ask the assist for a pick when no exact part-number
/// match exists. Assist failures keep the similarity suggestion.
pub async fn disambiguate_with_assist(
    query: &PartQuery,
    description: &str,
    result: &MatchResult,
    threshold: f64,
    assist: &dyn AiAssist,
) -> MatchResult {
    let base = disambiguate(query, result, threshold);
    if base.match_type() == MatchType::Found
        || base.candidates().len() <= 1
        || base.suggestion().is_some_and(|s| s.exact_part_number)
    {
        return base;
    }

    match assist
        .pick_candidate(
            query.part_number(),
            query.manufacturer(),
            description,
            base.candidates(),
        )
        .await
    {
        Ok(verdict) => match verdict.suggested_index {
            Some(index) if index < base.candidates().len() => {
                let suggestion = Suggestion {
                    index,
                    score: (verdict.confidence / 100.0).clamp(0.0, 1.0),
                    exact_part_number: false,
                    source: SuggestionSource::Ai,
                    reasoning: Some(verdict.reasoning),
                };
                base.reclassified(base.match_type(), Some(suggestion))
            }
            Some(index) => {
                tracing::warn!(
                    part_number = %query.part_number(),
                    index,
                    "AI suggested an out-of-range candidate, keeping similarity suggestion"
                );
                base
            }
            None => base,
        },
        Err(e) => {
            tracing::warn!(
                part_number = %query.part_number(),
                error = %e,
                "AI disambiguation unavailable, keeping similarity suggestion"
            );
            base
        }
    }
}
