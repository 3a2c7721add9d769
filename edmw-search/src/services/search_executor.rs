//! Fallback Search Executor (SearchAndAssign)
//!
//! Tries progressively looser query variants against the remote part search
//! and stops at the first attempt that returns any candidate:
//!
//! 1. `exact`             – manufacturer + part number, exact mode
//! 2. `partial`           – same fields, remote substring/fuzzy mode
//! 3. `alphanumeric_only` – punctuation stripped from the part number, exact mode
//! 4. `zero_suppressed`   – leading zeros stripped as well, exact mode
//! 5. `pn_only`           – part number alone (raw, then alphanumeric, then
//!    zero-suppressed), used when the manufacturer is empty/unknown or 1-4
//!    found nothing
//!
//! Variants identical to one already issued are skipped. A transport fault
//! ends the chain immediately with an `Error` result; there is no retry here.

use crate::error::SearchError;
use crate::models::{AttemptOutcome, MatchResult, PartQuery, QueryMode, SearchAttempt, SearchStrategy};
use crate::types::{PartSearch, SearchRequest};
use crate::utils::{strip_non_alphanumeric, suppress_leading_zeros};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Fallback search executor
#[derive(Clone)]
pub struct SearchExecutor {
    backend: Arc<dyn PartSearch>,
    unknown_sentinels: Vec<String>,
}

impl SearchExecutor {
    pub fn new(backend: Arc<dyn PartSearch>) -> Self {
        Self {
            backend,
            unknown_sentinels: vec!["Unknown".to_string()],
        }
    }

    /// Replace the manufacturer values treated as "no manufacturer"
    pub fn with_unknown_sentinels(mut self, sentinels: Vec<String>) -> Self {
        self.unknown_sentinels = sentinels;
        self
    }

    /// Ordered, de-duplicated attempts for a query
    pub fn plan(&self, query: &PartQuery) -> Vec<SearchAttempt> {
        let raw = query.part_number().to_string();
        let alphanumeric = strip_non_alphanumeric(&raw);
        let zero_suppressed = suppress_leading_zeros(&raw);

        let mut attempts: Vec<SearchAttempt> = Vec::with_capacity(7);
        let mut push = |strategy: SearchStrategy,
                        query_text: &str,
                        manufacturer: Option<&str>,
                        mode: QueryMode| {
            if query_text.is_empty() {
                return;
            }
            let attempt = SearchAttempt {
                strategy,
                query_text: query_text.to_string(),
                manufacturer: manufacturer.map(str::to_string),
                mode,
            };
            let duplicate = attempts.iter().any(|a| {
                a.query_text == attempt.query_text
                    && a.manufacturer == attempt.manufacturer
                    && a.mode == attempt.mode
            });
            if !duplicate {
                attempts.push(attempt);
            }
        };

        if query.has_usable_manufacturer(&self.unknown_sentinels) {
            let mfg = Some(query.manufacturer());
            push(SearchStrategy::Exact, &raw, mfg, QueryMode::Exact);
            push(SearchStrategy::Partial, &raw, mfg, QueryMode::Partial);
            push(SearchStrategy::AlphanumericOnly, &alphanumeric, mfg, QueryMode::Exact);
            push(SearchStrategy::ZeroSuppressed, &zero_suppressed, mfg, QueryMode::Exact);
        }

        push(SearchStrategy::PnOnly, &raw, None, QueryMode::Exact);
        push(SearchStrategy::PnOnly, &alphanumeric, None, QueryMode::Exact);
        push(SearchStrategy::PnOnly, &zero_suppressed, None, QueryMode::Exact);

        attempts
    }

    /// Run the fallback chain for one query.
    ///
    /// # Errors
    /// `InvalidQuery` for an empty part number (no attempt issued). Transport
    /// faults are not errors here: they come back as an `Error` result.
    pub async fn execute(&self, query: &PartQuery) -> Result<MatchResult, SearchError> {
        self.run(query, None).await
    }

    /// `execute`, checking `cancel` before each attempt.
    ///
    /// # Errors
    /// Additionally `Cancelled` when cancellation is observed between attempts.
    pub async fn execute_cancellable(
        &self,
        query: &PartQuery,
        cancel: &CancellationToken,
    ) -> Result<MatchResult, SearchError> {
        self.run(query, Some(cancel)).await
    }

    async fn run(
        &self,
        query: &PartQuery,
        cancel: Option<&CancellationToken>,
    ) -> Result<MatchResult, SearchError> {
        query.validate()?;

        let plan = self.plan(query);
        let mut outcomes: Vec<AttemptOutcome> = Vec::with_capacity(plan.len());

        for attempt in plan {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                return Err(SearchError::Cancelled);
            }

            let request = SearchRequest {
                part_number: attempt.query_text.clone(),
                manufacturer: attempt.manufacturer.clone(),
                mode: attempt.mode,
            };

            tracing::debug!(
                part_number = %query.part_number(),
                strategy = %attempt.strategy,
                query_text = %attempt.query_text,
                manufacturer = ?attempt.manufacturer,
                "Issuing search attempt"
            );

            match self.backend.search(&request).await {
                Ok(candidates) => {
                    let strategy = attempt.strategy;
                    outcomes.push(AttemptOutcome {
                        attempt,
                        candidates: Some(candidates.len()),
                    });

                    if !candidates.is_empty() {
                        let result = MatchResult::from_candidates(candidates, Some(strategy), outcomes);
                        tracing::debug!(
                            part_number = %query.part_number(),
                            strategy = %strategy,
                            match_type = %result.match_type(),
                            candidates = result.candidates().len(),
                            "Search attempt matched"
                        );
                        return Ok(result);
                    }
                }
                Err(SearchError::InvalidQuery(msg)) => {
                    return Err(SearchError::InvalidQuery(msg));
                }
                Err(SearchError::Cancelled) => return Err(SearchError::Cancelled),
                Err(SearchError::TransportFault(msg)) => {
                    let strategy = attempt.strategy;
                    outcomes.push(AttemptOutcome {
                        attempt,
                        candidates: None,
                    });
                    tracing::debug!(
                        part_number = %query.part_number(),
                        strategy = %strategy,
                        error = %msg,
                        "Search attempt faulted"
                    );
                    return Ok(MatchResult::error(msg, Some(strategy), outcomes));
                }
            }
        }

        tracing::debug!(
            part_number = %query.part_number(),
            attempts = outcomes.len(),
            "No search attempt returned candidates"
        );
        Ok(MatchResult::from_candidates(Vec::new(), None, outcomes))
    }
}
