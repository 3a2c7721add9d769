//! Manufacturer Normalizer
//!
//! Maps observed manufacturer names onto a reference (canonical) list:
//! exact case-insensitive hit, then fuzzy similarity, then an optional AI
//! pick for the ambiguous band. Mapping is always variant → canonical.

use crate::models::NormalizationResult;
use crate::models::NormalizationSource;
use crate::types::AiAssist;
use crate::utils::rank_names;
use edmw_common::config::NormalizerConfig;
use std::collections::HashSet;
use std::sync::Arc;

/// Score bands for fuzzy normalization (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizerThresholds {
    /// At or above: accept the best fuzzy match without asking
    pub high_confidence: u8,
    /// At or above (and below `high_confidence`): ask the assist
    pub ambiguous_floor: u8,
    /// Reference names offered to the assist
    pub top_n: usize,
}

impl Default for NormalizerThresholds {
    fn default() -> Self {
        Self {
            high_confidence: 90,
            ambiguous_floor: 60,
            top_n: 5,
        }
    }
}

impl From<&NormalizerConfig> for NormalizerThresholds {
    fn from(config: &NormalizerConfig) -> Self {
        Self {
            high_confidence: config.high_confidence,
            ambiguous_floor: config.ambiguous_floor,
            top_n: config.top_n.max(1),
        }
    }
}

/// Manufacturer normalizer
pub struct ManufacturerNormalizer {
    thresholds: NormalizerThresholds,
    assist: Option<Arc<dyn AiAssist>>,
}

impl ManufacturerNormalizer {
    pub fn new(thresholds: NormalizerThresholds, assist: Option<Arc<dyn AiAssist>>) -> Self {
        Self { thresholds, assist }
    }

    /// Fuzzy-only normalizer
    pub fn fuzzy_only(thresholds: NormalizerThresholds) -> Self {
        Self::new(thresholds, None)
    }

    pub fn thresholds(&self) -> NormalizerThresholds {
        self.thresholds
    }

    pub fn has_assist(&self) -> bool {
        self.assist.is_some()
    }

    /// Normalize one name against `reference`
    pub async fn normalize(&self, name: &str, reference: &[String]) -> NormalizationResult {
        let name = name.trim();

        // Canonical names (any casing) are never remapped
        if reference.iter().any(|r| r.trim().eq_ignore_ascii_case(name)) {
            return NormalizationResult::unchanged(name, 100, None);
        }

        let ranked = rank_names(name, reference, self.thresholds.top_n);
        let Some((best_name, best_score)) = ranked.first().cloned() else {
            return NormalizationResult::unchanged(name, 0, None);
        };

        if best_score >= self.thresholds.high_confidence {
            tracing::debug!(
                original = %name,
                canonical = %best_name,
                score = best_score,
                "Fuzzy normalization"
            );
            return NormalizationResult::renamed(
                name,
                best_name,
                best_score,
                NormalizationSource::Fuzzy,
                None,
            );
        }

        if best_score >= self.thresholds.ambiguous_floor {
            if let Some(assist) = &self.assist {
                return self.ask_assist(assist.as_ref(), name, &ranked, reference, best_score).await;
            }
        }

        NormalizationResult::unchanged(name, best_score, None)
    }

    async fn ask_assist(
        &self,
        assist: &dyn AiAssist,
        name: &str,
        ranked: &[(String, u8)],
        reference: &[String],
        best_score: u8,
    ) -> NormalizationResult {
        let candidates: Vec<String> = ranked.iter().map(|(n, _)| n.clone()).collect();

        let verdict = match assist.pick_manufacturer(name, &candidates).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(
                    original = %name,
                    error = %e,
                    "AI assist failed, leaving manufacturer unchanged"
                );
                return NormalizationResult::unchanged(name, best_score, None);
            }
        };

        let confidence = verdict.confidence.round().clamp(0.0, 100.0) as u8;
        let reasoning = Some(verdict.reasoning).filter(|r| !r.is_empty());

        let Some(proposal) = verdict.best_match.map(|p| p.trim().to_string()).filter(|p| !p.is_empty())
        else {
            return NormalizationResult::unchanged(name, best_score, reasoning);
        };

        // The proposal must be a reference entry; use its canonical spelling
        let Some(canonical) = reference
            .iter()
            .find(|r| r.trim().eq_ignore_ascii_case(&proposal))
            .map(|r| r.trim().to_string())
        else {
            tracing::warn!(
                original = %name,
                proposal = %proposal,
                "Skipping AI proposal outside the reference list"
            );
            return NormalizationResult::unchanged(name, best_score, reasoning);
        };

        if canonical.eq_ignore_ascii_case(name) {
            return NormalizationResult::unchanged(name, best_score, reasoning);
        }

        tracing::debug!(
            original = %name,
            canonical = %canonical,
            confidence,
            "AI normalization"
        );
        NormalizationResult::renamed(name, canonical, confidence, NormalizationSource::Ai, reasoning)
    }

    /// Normalize every distinct non-empty name, in first-seen order.
    ///
    /// Each name is normalized at most once.
    pub async fn normalize_all(&self, names: &[String], reference: &[String]) -> Vec<NormalizationResult> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut results = Vec::new();

        for name in names {
            let trimmed = name.trim();
            if trimmed.is_empty() || !seen.insert(trimmed) {
                continue;
            }
            results.push(self.normalize(trimmed, reference).await);
        }

        let normalized = results.iter().filter(|r| r.is_change()).count();
        tracing::info!(
            total = results.len(),
            normalized,
            unchanged = results.len() - normalized,
            "Manufacturer normalization complete"
        );

        results
    }
}
