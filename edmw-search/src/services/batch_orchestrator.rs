//! Batch Orchestrator
//!
//! Fans the fallback search out over a collection of rows with a bounded
//! number of concurrent workers. Each row writes its terminal result into
//! its own index slot, so results read back in input order no matter which
//! row finishes first.
//!
//! **Per-row error isolation:** a row's transport fault is retried as a
//! whole (fixed delay, bounded attempts) and then recorded as `Error`; it
//! never aborts the batch.

use crate::error::SearchError;
use crate::models::{MatchResult, MatchType, NormalizationResult, PartRow};
use crate::services::manufacturer_normalizer::ManufacturerNormalizer;
use crate::services::result_classifier::{disambiguate, disambiguate_with_assist};
use crate::services::search_executor::SearchExecutor;
use crate::tabular::unique_manufacturers;
use crate::types::AiAssist;
use edmw_common::config::SearchConfig;
use edmw_common::events::{EventBus, WizardEvent};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Batch tuning
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Concurrent rows in flight
    pub workers: usize,
    /// Whole-row attempts before recording `Error` (at least 1)
    pub max_row_attempts: u32,
    pub retry_delay: Duration,
    /// Similarity below which a `Multiple` result becomes `NeedReview`
    pub review_threshold: f64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: 10,
            max_row_attempts: 3,
            retry_delay: Duration::from_secs(3),
            review_threshold: 0.6,
        }
    }
}

impl From<&SearchConfig> for BatchOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            max_row_attempts: config.max_row_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            review_threshold: config.review_threshold,
        }
    }
}

/// Rows with a terminal result so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

/// A row that just reached its terminal result
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRow {
    pub index: usize,
    pub result: MatchResult,
}

/// Per-category counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub found: usize,
    pub multiple: usize,
    pub need_review: usize,
    pub none: usize,
    pub errors: usize,
    /// Rows never searched because the batch was cancelled first
    pub not_searched: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[Option<MatchResult>]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for slot in results {
            match slot.as_ref().map(MatchResult::match_type) {
                Some(MatchType::Found) => summary.found += 1,
                Some(MatchType::Multiple) => summary.multiple += 1,
                Some(MatchType::NeedReview) => summary.need_review += 1,
                Some(MatchType::None) => summary.none += 1,
                Some(MatchType::Error) => summary.errors += 1,
                None => summary.not_searched += 1,
            }
        }
        summary
    }

    pub fn searched(&self) -> usize {
        self.total - self.not_searched
    }
}

/// Final state of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    /// `results[i]` belongs to input row `i`; `None` only for rows skipped
    /// after cancellation
    pub results: Vec<Option<MatchResult>>,
    pub summary: BatchSummary,
    pub cancelled: bool,
}

/// Handle to a running batch
pub struct BatchHandle {
    batch_id: Uuid,
    progress: watch::Receiver<BatchProgress>,
    completed: mpsc::UnboundedReceiver<CompletedRow>,
    slots: Arc<RwLock<Vec<Option<MatchResult>>>>,
    cancel: CancellationToken,
    task: JoinHandle<BatchOutcome>,
}

impl BatchHandle {
    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    /// Latest progress; watch with `progress_receiver` for changes
    pub fn progress(&self) -> BatchProgress {
        *self.progress.borrow()
    }

    pub fn progress_receiver(&self) -> watch::Receiver<BatchProgress> {
        self.progress.clone()
    }

    /// Results computed so far, in input order
    pub async fn snapshot(&self) -> Vec<Option<MatchResult>> {
        self.slots.read().await.clone()
    }

    /// Next row to complete, in completion order. `None` once every worker
    /// has finished.
    pub async fn next_completed(&mut self) -> Option<CompletedRow> {
        self.completed.recv().await
    }

    /// Stop issuing new rows. In-flight requests finish or time out.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the batch to finish
    pub async fn wait(self) -> edmw_common::Result<BatchOutcome> {
        self.task
            .await
            .map_err(|e| edmw_common::Error::Internal(format!("Batch task failed: {}", e)))
    }
}

/// State shared by the workers of one batch
struct BatchContext {
    batch_id: Uuid,
    total: usize,
    executor: SearchExecutor,
    assist: Option<Arc<dyn AiAssist>>,
    options: BatchOptions,
    event_bus: Option<EventBus>,
    slots: Arc<RwLock<Vec<Option<MatchResult>>>>,
    progress: watch::Sender<BatchProgress>,
    completed: mpsc::UnboundedSender<CompletedRow>,
}

impl BatchContext {
    fn emit(&self, event: WizardEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(event);
        }
    }
}

/// Batch orchestrator
#[derive(Clone)]
pub struct BatchOrchestrator {
    executor: SearchExecutor,
    options: BatchOptions,
    assist: Option<Arc<dyn AiAssist>>,
    event_bus: Option<EventBus>,
}

impl BatchOrchestrator {
    pub fn new(executor: SearchExecutor, options: BatchOptions) -> Self {
        Self {
            executor,
            options,
            assist: None,
            event_bus: None,
        }
    }

    /// Use the assist to suggest a candidate for ambiguous rows
    pub fn with_assist(mut self, assist: Arc<dyn AiAssist>) -> Self {
        self.assist = Some(assist);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Start searching `rows` in the background.
    ///
    /// Cancelling `cancel` (or the handle) stops new rows from starting.
    pub fn spawn(&self, rows: Vec<PartRow>, cancel: CancellationToken) -> BatchHandle {
        let batch_id = Uuid::new_v4();
        let total = rows.len();
        let cancel = cancel.child_token();

        let slots = Arc::new(RwLock::new(vec![None; total]));
        let (progress_tx, progress_rx) = watch::channel(BatchProgress { completed: 0, total });
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();

        let ctx = Arc::new(BatchContext {
            batch_id,
            total,
            executor: self.executor.clone(),
            assist: self.assist.clone(),
            options: self.options.clone(),
            event_bus: self.event_bus.clone(),
            slots: Arc::clone(&slots),
            progress: progress_tx,
            completed: completed_tx,
        });

        let task = tokio::spawn(run_batch(ctx, rows, cancel.clone()));

        BatchHandle {
            batch_id,
            progress: progress_rx,
            completed: completed_rx,
            slots,
            cancel,
            task,
        }
    }

    /// Search `rows` and wait for the outcome
    pub async fn run(
        &self,
        rows: Vec<PartRow>,
        cancel: CancellationToken,
    ) -> edmw_common::Result<BatchOutcome> {
        self.spawn(rows, cancel).wait().await
    }

    /// Normalize the distinct manufacturers observed in `rows`
    pub async fn normalize_manufacturers(
        &self,
        normalizer: &ManufacturerNormalizer,
        rows: &[PartRow],
        reference: &[String],
    ) -> Vec<NormalizationResult> {
        let names = unique_manufacturers(rows);
        let results = normalizer.normalize_all(&names, reference).await;

        let normalized = results.iter().filter(|r| r.is_change()).count();
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(WizardEvent::NormalizationCompleted {
                normalized,
                unchanged: results.len() - normalized,
                timestamp: chrono::Utc::now(),
            });
        }

        results
    }
}

async fn run_batch(ctx: Arc<BatchContext>, rows: Vec<PartRow>, cancel: CancellationToken) -> BatchOutcome {
    tracing::info!(
        batch_id = %ctx.batch_id,
        total = ctx.total,
        workers = ctx.options.workers,
        "Batch search started"
    );
    ctx.emit(WizardEvent::SearchStarted {
        batch_id: ctx.batch_id,
        total: ctx.total,
        timestamp: chrono::Utc::now(),
    });

    stream::iter(rows.into_iter().enumerate())
        .map(|(index, row)| {
            let ctx = Arc::clone(&ctx);
            let cancel = cancel.clone();
            async move {
                // Check cancellation before starting the row
                if cancel.is_cancelled() {
                    return;
                }
                if let Some(result) = search_row(&ctx, index, &row, &cancel).await {
                    record(&ctx, index, &row, result).await;
                }
            }
        })
        .buffer_unordered(ctx.options.workers.max(1))
        .collect::<Vec<()>>()
        .await;

    let results = ctx.slots.read().await.clone();
    let summary = BatchSummary::from_results(&results);
    let cancelled = cancel.is_cancelled() && summary.not_searched > 0;

    if summary.searched() > 0 && summary.errors == summary.searched() {
        tracing::warn!(
            batch_id = %ctx.batch_id,
            errors = summary.errors,
            "Every searched row failed; check connectivity and credentials"
        );
    }

    tracing::info!(
        batch_id = %ctx.batch_id,
        found = summary.found,
        multiple = summary.multiple,
        need_review = summary.need_review,
        none = summary.none,
        errors = summary.errors,
        not_searched = summary.not_searched,
        cancelled,
        "Batch search completed"
    );
    ctx.emit(WizardEvent::SearchCompleted {
        batch_id: ctx.batch_id,
        found: summary.found,
        multiple: summary.multiple,
        need_review: summary.need_review,
        none: summary.none,
        errors: summary.errors,
        cancelled,
        timestamp: chrono::Utc::now(),
    });

    BatchOutcome {
        batch_id: ctx.batch_id,
        results,
        summary,
        cancelled,
    }
}

/// Terminal result for one row, or `None` if cancelled before any result
async fn search_row(
    ctx: &BatchContext,
    index: usize,
    row: &PartRow,
    cancel: &CancellationToken,
) -> Option<MatchResult> {
    let query = row.to_query();
    let max_attempts = ctx.options.max_row_attempts.max(1);
    let mut last_error: Option<MatchResult> = None;
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let result = match ctx.executor.execute_cancellable(&query, cancel).await {
            Ok(result) => result,
            Err(SearchError::InvalidQuery(msg)) => {
                tracing::warn!(
                    batch_id = %ctx.batch_id,
                    row = index,
                    error = %msg,
                    "Skipping invalid row"
                );
                return Some(MatchResult::invalid(msg));
            }
            Err(SearchError::TransportFault(msg)) => MatchResult::error(msg, None, Vec::new()),
            Err(SearchError::Cancelled) => return last_error,
        };

        if !result.is_retryable() {
            return Some(disambiguate_row(ctx, row, result).await);
        }

        let fault = result.fault().unwrap_or_default().to_string();
        if attempt >= max_attempts {
            tracing::error!(
                batch_id = %ctx.batch_id,
                row = index,
                part_number = %query.part_number(),
                attempts = attempt,
                error = %fault,
                "Row search failed"
            );
            return Some(result);
        }

        tracing::warn!(
            batch_id = %ctx.batch_id,
            row = index,
            part_number = %query.part_number(),
            attempt,
            error = %fault,
            "Row search faulted, retrying"
        );
        ctx.emit(WizardEvent::RowRetrying {
            batch_id: ctx.batch_id,
            index,
            attempt,
            error: fault,
        });

        tokio::select! {
            _ = cancel.cancelled() => return Some(result),
            _ = tokio::time::sleep(ctx.options.retry_delay) => {}
        }
        last_error = Some(result);
    }
}

async fn disambiguate_row(ctx: &BatchContext, row: &PartRow, result: MatchResult) -> MatchResult {
    if result.match_type() != MatchType::Multiple {
        return result;
    }
    let query = row.to_query();
    match &ctx.assist {
        Some(assist) => {
            disambiguate_with_assist(
                &query,
                &row.description,
                &result,
                ctx.options.review_threshold,
                assist.as_ref(),
            )
            .await
        }
        None => disambiguate(&query, &result, ctx.options.review_threshold),
    }
}

async fn record(ctx: &BatchContext, index: usize, row: &PartRow, result: MatchResult) {
    tracing::debug!(
        batch_id = %ctx.batch_id,
        row = index,
        part_number = %row.part_number,
        match_type = %result.match_type(),
        strategy = ?result.strategy_used(),
        "Row searched"
    );

    ctx.emit(WizardEvent::RowSearched {
        batch_id: ctx.batch_id,
        index,
        part_number: row.part_number.clone(),
        match_type: result.match_type().to_string(),
    });

    {
        let mut slots = ctx.slots.write().await;
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(result.clone());
        }
    }

    // Increment under the channel's own lock so updates never go backwards
    let mut completed = 0;
    ctx.progress.send_modify(|p| {
        p.completed += 1;
        completed = p.completed;
    });
    ctx.emit(WizardEvent::SearchProgress {
        batch_id: ctx.batch_id,
        completed,
        total: ctx.total,
    });

    let _ = ctx.completed.send(CompletedRow { index, result });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_config_clamps() {
        let config = SearchConfig {
            workers: 0,
            max_row_attempts: 0,
            retry_delay_ms: 250,
            unknown_manufacturer_sentinels: vec!["Unknown".to_string()],
            review_threshold: 0.7,
        };
        let options = BatchOptions::from(&config);
        assert_eq!(options.workers, 1);
        assert_eq!(options.max_row_attempts, 1);
        assert_eq!(options.retry_delay, Duration::from_millis(250));
        assert!((options.review_threshold - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_counts() {
        let results = vec![
            Some(MatchResult::from_candidates(
                vec![crate::models::CandidatePart::new("Murata", "GRM188")],
                None,
                Vec::new(),
            )),
            Some(MatchResult::error("timeout", None, Vec::new())),
            Some(MatchResult::invalid("empty part number")),
            None,
        ];
        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.found, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.none, 1);
        assert_eq!(summary.not_searched, 1);
        assert_eq!(summary.searched(), 3);
    }

    #[test]
    fn test_progress_complete() {
        assert!(BatchProgress { completed: 3, total: 3 }.is_complete());
        assert!(!BatchProgress { completed: 2, total: 3 }.is_complete());
    }
}
