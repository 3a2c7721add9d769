//! Error types for edmw-search
//!
//! Per-row search faults are captured into a row's `MatchResult`; these
//! types only travel between a component and its direct caller.

use thiserror::Error;

/// Part search errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Malformed input, rejected before any network call (never retried)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Network, timeout, or non-2xx failure of the remote search
    #[error("Transport fault: {0}")]
    TransportFault(String),

    /// Cooperative cancellation observed between attempts
    #[error("Search cancelled")]
    Cancelled,
}

/// AI assist errors. Never fatal: callers degrade to fuzzy-only behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssistError {
    /// No assist configured
    #[error("AI assist unavailable: {0}")]
    Unavailable(String),

    /// Request to the model failed
    #[error("AI request failed: {0}")]
    Request(String),

    /// Model answered with something that is not the requested JSON
    #[error("AI response parse error: {0}")]
    Parse(String),
}

/// OAuth token acquisition errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token request failed: {0}")]
    Request(String),

    #[error("Token endpoint returned {0}: {1}")]
    Rejected(u16, String),

    #[error("Token response parse error: {0}")]
    Parse(String),
}

impl From<TokenError> for SearchError {
    fn from(err: TokenError) -> Self {
        SearchError::TransportFault(err.to_string())
    }
}
