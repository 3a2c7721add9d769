//! Collaborator traits for edmw-search
//!
//! The executor and normalizer only see these seams:
//! - **PartSearch:** remote part lookup (HTTP client in production, in-memory doubles in tests)
//! - **AiAssist:** optional model-backed judgement for ambiguous cases

use crate::error::{AssistError, SearchError};
use crate::models::{CandidatePart, QueryMode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// Remote part search
// ============================================================================

/// One request to the remote part search
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchRequest {
    pub part_number: String,
    /// `None` searches by part number alone
    pub manufacturer: Option<String>,
    pub mode: QueryMode,
}

/// Remote part search.
///
/// An empty vector is a logical zero-result; `Err` is reserved for
/// transport faults.
#[async_trait]
pub trait PartSearch: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<CandidatePart>, SearchError>;
}

// ============================================================================
// AI assist
// ============================================================================

/// Assist verdict for a manufacturer name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistVerdict {
    /// Chosen reference name, `None` when no entry fits
    pub best_match: Option<String>,
    /// 0-100
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// Assist verdict for picking among search candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateVerdict {
    /// 0-based index into the candidate list, `None` when none is suitable
    pub suggested_index: Option<usize>,
    /// 0-100
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// Optional AI assist. Every failure is an `AssistError`; callers degrade.
#[async_trait]
pub trait AiAssist: Send + Sync {
    async fn pick_manufacturer(
        &self,
        subject: &str,
        candidates: &[String],
    ) -> Result<AssistVerdict, AssistError>;

    async fn pick_candidate(
        &self,
        part_number: &str,
        manufacturer: &str,
        description: &str,
        candidates: &[CandidatePart],
    ) -> Result<CandidateVerdict, AssistError>;
}
