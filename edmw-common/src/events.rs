//! Event types for the wizard event system
//!
//! Provides the shared `WizardEvent` definitions and the `EventBus` used to
//! observe long-running batch work without callbacks.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Wizard event types
///
/// Events are broadcast via EventBus and serialize with a `type` tag so a
/// review surface can forward them as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum WizardEvent {
    /// Batch part search started
    SearchStarted {
        batch_id: Uuid,
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Rows with a terminal result so far (monotonically non-decreasing)
    SearchProgress {
        batch_id: Uuid,
        completed: usize,
        total: usize,
    },

    /// One row reached a terminal match result
    RowSearched {
        batch_id: Uuid,
        index: usize,
        part_number: String,
        /// Display form of the match type ("Found", "Multiple", ...)
        match_type: String,
    },

    /// A whole row is being retried after a transport fault
    RowRetrying {
        batch_id: Uuid,
        index: usize,
        attempt: u32,
        error: String,
    },

    /// Batch finished (or stopped after cancellation)
    SearchCompleted {
        batch_id: Uuid,
        found: usize,
        multiple: usize,
        need_review: usize,
        none: usize,
        errors: usize,
        cancelled: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Manufacturer normalization pass finished
    NormalizationCompleted {
        normalized: usize,
        unchanged: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WizardEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<WizardEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: WizardEvent,
    ) -> Result<usize, broadcast::error::SendError<WizardEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: WizardEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
