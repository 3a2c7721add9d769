//! Search attempts and match results

use super::part::CandidatePart;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Match classification of one part query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    /// Exactly one candidate from the terminating attempt
    Found,
    /// More than one candidate, not yet disambiguated
    Multiple,
    /// Multiple candidates whose best similarity is below the review threshold
    #[serde(rename = "Need user review")]
    NeedReview,
    /// No attempt returned a candidate
    None,
    /// Transport failed irrecoverably
    Error,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Found => "Found",
            MatchType::Multiple => "Multiple",
            MatchType::NeedReview => "Need user review",
            MatchType::None => "None",
            MatchType::Error => "Error",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fallback search strategies, in the order the executor tries them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    Exact,
    Partial,
    AlphanumericOnly,
    ZeroSuppressed,
    PnOnly,
}

impl SearchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::Exact => "exact",
            SearchStrategy::Partial => "partial",
            SearchStrategy::AlphanumericOnly => "alphanumeric_only",
            SearchStrategy::ZeroSuppressed => "zero_suppressed",
            SearchStrategy::PnOnly => "pn_only",
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote-side matching mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    Exact,
    /// Substring/fuzzy matching performed by the remote service
    Partial,
}

/// One query variant issued to the remote search
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchAttempt {
    pub strategy: SearchStrategy,
    /// Part number text sent to the service
    pub query_text: String,
    /// Manufacturer constraint, `None` for part-number-only searches
    pub manufacturer: Option<String>,
    pub mode: QueryMode,
}

/// Audit record of an issued attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub attempt: SearchAttempt,
    /// Candidates returned, `None` if the attempt faulted
    pub candidates: Option<usize>,
}

/// Where a disambiguation suggestion came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Similarity,
    Ai,
}

/// Suggested candidate for a `Multiple`/`NeedReview` result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Index into `MatchResult::candidates`
    pub index: usize,
    /// 0.0-1.0
    pub score: f64,
    /// Candidate part number equals the query (case-insensitive); the caller
    /// may auto-promote the result to `Found`
    pub exact_part_number: bool,
    pub source: SuggestionSource,
    pub reasoning: Option<String>,
}

/// Outcome of searching one part query. Immutable once built; every
/// transformation returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    match_type: MatchType,
    candidates: Vec<CandidatePart>,
    strategy_used: Option<SearchStrategy>,
    attempts: Vec<AttemptOutcome>,
    fault: Option<String>,
    suggestion: Option<Suggestion>,
    accepted_manually: bool,
}

impl MatchResult {
    /// Result of a terminating attempt (or of the whole chain when no
    /// attempt returned anything). Classification follows `classify`.
    pub fn from_candidates(
        candidates: Vec<CandidatePart>,
        strategy_used: Option<SearchStrategy>,
        attempts: Vec<AttemptOutcome>,
    ) -> Self {
        let match_type = crate::services::result_classifier::classify(&candidates);
        Self {
            match_type,
            candidates,
            strategy_used,
            attempts,
            fault: None,
            suggestion: None,
            accepted_manually: false,
        }
    }

    /// Transport fault; the message is kept for the operator
    pub fn error(
        message: impl Into<String>,
        strategy_used: Option<SearchStrategy>,
        attempts: Vec<AttemptOutcome>,
    ) -> Self {
        Self {
            match_type: MatchType::Error,
            candidates: Vec::new(),
            strategy_used,
            attempts,
            fault: Some(message.into()),
            suggestion: None,
            accepted_manually: false,
        }
    }

    /// Query rejected before any attempt. Classified `None` (nothing was
    /// searched, so nothing was found) with the reason attached.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            match_type: MatchType::None,
            candidates: Vec::new(),
            strategy_used: None,
            attempts: Vec::new(),
            fault: Some(message.into()),
            suggestion: None,
            accepted_manually: false,
        }
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn candidates(&self) -> &[CandidatePart] {
        &self.candidates
    }

    pub fn strategy_used(&self) -> Option<SearchStrategy> {
        self.strategy_used
    }

    pub fn attempts(&self) -> &[AttemptOutcome] {
        &self.attempts
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    pub fn suggestion(&self) -> Option<&Suggestion> {
        self.suggestion.as_ref()
    }

    pub fn accepted_manually(&self) -> bool {
        self.accepted_manually
    }

    /// Rows worth retrying later (transport faults only)
    pub fn is_retryable(&self) -> bool {
        self.match_type == MatchType::Error
    }

    /// Copy with a new classification and suggestion (disambiguation)
    pub(crate) fn reclassified(&self, match_type: MatchType, suggestion: Option<Suggestion>) -> Self {
        Self {
            match_type,
            suggestion,
            ..self.clone()
        }
    }

    /// Accept/override: the chosen candidate replaces the candidate list and
    /// the result reads as `Found`.
    pub fn accept(&self, candidate: CandidatePart) -> Self {
        Self {
            match_type: MatchType::Found,
            candidates: vec![candidate],
            strategy_used: self.strategy_used,
            attempts: self.attempts.clone(),
            fault: None,
            suggestion: None,
            accepted_manually: true,
        }
    }
}
