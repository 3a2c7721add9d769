//! Data models for part search and manufacturer normalization

pub mod match_result;
pub mod normalization;
pub mod part;

pub use match_result::{AttemptOutcome, MatchResult, MatchType, QueryMode, SearchAttempt, SearchStrategy, Suggestion, SuggestionSource};
pub use normalization::{NormalizationResult, NormalizationSource};
pub use part::{CandidatePart, DistributorInfo, PartQuery, PartRow};
