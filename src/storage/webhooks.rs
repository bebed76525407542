//! Webhook Storage Module
//!
//! Two append-heavy structures back the webhook dispatcher:
//!
//! - `WebhookLogStore`: the immutable delivery audit trail. One row per
//!   attempt, written before the dispatcher returns or reschedules, never
//!   mutated afterwards.
//! - `WebhookOutbox`: the durable event-to-deliver queue. A status
//!   transition enqueues a row and a separate worker claims and delivers it,
//!   so delivery work is not tied to in-memory timers owned by the
//!   triggering request.

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

// ============================================================================
// DELIVERY LOG
// ============================================================================

/// One webhook delivery attempt. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDeliveryRecord {
    /// Logical event this attempt belongs to (groups the attempt sequence)
    pub event_id: String,
    /// Merchant the event was addressed to
    pub merchant_id: String,
    /// Related payment intent, if any
    pub intent_id: Option<String>,
    /// Event type (e.g. `payment_intent.succeeded`)
    pub event_type: String,
    /// Target URL at the time of the attempt
    pub url: String,
    /// Serialized request payload
    pub payload: serde_json::Value,
    /// HTTP response status, or None on a transport failure
    pub response_status: Option<u16>,
    /// Whether this attempt was answered with a 2xx
    pub delivered: bool,
    /// Attempt number within the logical event (1-based, no gaps)
    pub attempt: u32,
    /// Unix timestamp of the attempt
    pub timestamp: i64,
}

/// Aggregate delivery statistics, the surface through which permanently
/// undelivered events are discoverable.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryStats {
    /// Number of logical events with at least one delivered attempt
    pub delivered_events: usize,
    /// Total failed attempts across all events
    pub failed_attempts: usize,
    /// Number of logical events with no delivered attempt
    pub undelivered_events: usize,
}

/// Append-only store for webhook delivery attempts.
pub struct WebhookLogStore {
    records: RwLock<Vec<WebhookDeliveryRecord>>,
}

impl WebhookLogStore {
    /// Create an empty log store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Append one attempt record.
    pub async fn append(&self, record: WebhookDeliveryRecord) {
        let mut records = self.records.write().await;
        records.push(record);
    }

    /// All attempts for one logical event, in append order.
    pub async fn attempts_for_event(&self, event_id: &str) -> Vec<WebhookDeliveryRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|record| record.event_id == event_id)
            .cloned()
            .collect()
    }

    /// All attempts addressed to one merchant, in append order.
    pub async fn attempts_for_merchant(&self, merchant_id: &str) -> Vec<WebhookDeliveryRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|record| record.merchant_id == merchant_id)
            .cloned()
            .collect()
    }

    /// Latest attempt per undelivered logical event within the window that
    /// still has retry budget left. This is the input to the recovery sweep:
    /// events whose in-process retry timers were lost to a crash.
    ///
    /// An event whose latest attempt was answered `410 Gone` is terminal the
    /// same way it is for the primary delivery path and is excluded.
    ///
    /// # Arguments
    ///
    /// * `window_secs` - How far back to look
    /// * `max_attempts` - Retry bound; events at the bound are permanently
    ///   undelivered and excluded
    pub async fn undelivered_retryable(
        &self,
        window_secs: i64,
        max_attempts: u32,
    ) -> Vec<WebhookDeliveryRecord> {
        let cutoff = current_timestamp() - window_secs;
        let records = self.records.read().await;

        let mut latest: std::collections::HashMap<String, &WebhookDeliveryRecord> =
            std::collections::HashMap::new();
        let mut delivered: std::collections::HashSet<String> = std::collections::HashSet::new();

        for record in records.iter() {
            if record.delivered {
                delivered.insert(record.event_id.clone());
            }
            let entry = latest.entry(record.event_id.clone()).or_insert(record);
            if record.attempt >= entry.attempt {
                *entry = record;
            }
        }

        latest
            .into_values()
            .filter(|record| {
                !delivered.contains(&record.event_id)
                    && record.attempt < max_attempts
                    && record.timestamp >= cutoff
                    && record.response_status != Some(410)
            })
            .cloned()
            .collect()
    }

    /// Aggregate delivery statistics across all logged attempts.
    pub async fn delivery_stats(&self) -> DeliveryStats {
        let records = self.records.read().await;
        let mut delivered: std::collections::HashSet<&str> = std::collections::HashSet::new();
        let mut all_events: std::collections::HashSet<&str> = std::collections::HashSet::new();
        let mut failed_attempts = 0;

        for record in records.iter() {
            all_events.insert(record.event_id.as_str());
            if record.delivered {
                delivered.insert(record.event_id.as_str());
            } else {
                failed_attempts += 1;
            }
        }

        DeliveryStats {
            delivered_events: delivered.len(),
            failed_attempts,
            undelivered_events: all_events.len() - delivered.len(),
        }
    }
}

impl Default for WebhookLogStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// OUTBOX QUEUE
// ============================================================================

/// Claim state of an outbox entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    /// Waiting to be claimed by the delivery worker
    Pending,
    /// Claimed; delivery attempts in progress
    InFlight,
    /// Delivery attempts finished (outcome recorded in the delivery log)
    Done,
}

/// One event awaiting delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Logical event ID (reused as the webhook body `id`)
    pub event_id: String,
    /// Merchant to notify
    pub merchant_id: String,
    /// Related payment intent
    pub intent_id: String,
    /// Event type (e.g. `payment_intent.succeeded`)
    pub event_type: String,
    /// Full webhook body, snapshotted at transition time
    pub payload: serde_json::Value,
    /// Unix timestamp when the entry was enqueued
    pub created_at: i64,
    /// Claim state
    pub status: OutboxStatus,
}

/// Queue of events to deliver, fed by status transitions and drained by the
/// delivery worker.
pub struct WebhookOutbox {
    entries: RwLock<Vec<OutboxEntry>>,
}

impl WebhookOutbox {
    /// Create an empty outbox.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Enqueue an event for delivery. The caller supplies the event ID
    /// because the same ID is embedded in the payload body.
    ///
    /// # Returns
    ///
    /// The enqueued entry
    pub async fn enqueue(
        &self,
        event_id: &str,
        merchant_id: &str,
        intent_id: &str,
        event_type: &str,
        payload: serde_json::Value,
    ) -> OutboxEntry {
        let entry = OutboxEntry {
            event_id: event_id.to_string(),
            merchant_id: merchant_id.to_string(),
            intent_id: intent_id.to_string(),
            event_type: event_type.to_string(),
            payload,
            created_at: current_timestamp(),
            status: OutboxStatus::Pending,
        };

        let mut entries = self.entries.write().await;
        entries.push(entry.clone());
        entry
    }

    /// Claim all pending entries, marking them in-flight. Entries are
    /// returned in enqueue order.
    pub async fn claim_pending(&self) -> Vec<OutboxEntry> {
        let mut entries = self.entries.write().await;
        let mut claimed = Vec::new();
        for entry in entries.iter_mut() {
            if entry.status == OutboxStatus::Pending {
                entry.status = OutboxStatus::InFlight;
                claimed.push(entry.clone());
            }
        }
        claimed
    }

    /// Mark an entry finished. The delivery outcome lives in the log store.
    pub async fn mark_done(&self, event_id: &str) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.iter_mut().find(|e| e.event_id == event_id) {
            entry.status = OutboxStatus::Done;
        }
    }

    /// Number of entries still waiting to be claimed.
    pub async fn pending_count(&self) -> usize {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.status == OutboxStatus::Pending)
            .count()
    }
}

impl Default for WebhookOutbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
