//! Manufacturer normalization results

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationSource {
    Fuzzy,
    Ai,
    Unchanged,
}

/// Proposed canonical name for one observed manufacturer name.
///
/// `canonical_name` differs from `original_name` only when `source` is not
/// `Unchanged`; unchanged results carry the original as canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationResult {
    original_name: String,
    canonical_name: String,
    /// 0-100
    confidence: u8,
    source: NormalizationSource,
    reasoning: Option<String>,
}

impl NormalizationResult {
    pub fn unchanged(name: impl Into<String>, confidence: u8, reasoning: Option<String>) -> Self {
        let name = name.into();
        Self {
            canonical_name: name.clone(),
            original_name: name,
            confidence: confidence.min(100),
            source: NormalizationSource::Unchanged,
            reasoning,
        }
    }

    /// A rename proposal. Falls back to `unchanged` when the proposal is the
    /// original name itself.
    pub fn renamed(
        original: impl Into<String>,
        canonical: impl Into<String>,
        confidence: u8,
        source: NormalizationSource,
        reasoning: Option<String>,
    ) -> Self {
        let original = original.into();
        let canonical = canonical.into();
        if canonical == original || source == NormalizationSource::Unchanged {
            return Self::unchanged(original, confidence, reasoning);
        }
        Self {
            original_name: original,
            canonical_name: canonical,
            confidence: confidence.min(100),
            source,
            reasoning,
        }
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    pub fn source(&self) -> NormalizationSource {
        self.source
    }

    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }

    pub fn is_change(&self) -> bool {
        self.source != NormalizationSource::Unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_proposal_becomes_unchanged() {
        let result = NormalizationResult::renamed(
            "Murata",
            "Murata",
            95,
            NormalizationSource::Fuzzy,
            None,
        );
        assert_eq!(result.source(), NormalizationSource::Unchanged);
        assert!(!result.is_change());
    }

    #[test]
    fn test_confidence_is_capped() {
        let result = NormalizationResult::unchanged("Vishay", 250, None);
        assert_eq!(result.confidence(), 100);
        assert_eq!(result.canonical_name(), "Vishay");
    }
}
