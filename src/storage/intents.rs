//! Payment Intent Storage Module
//!
//! This module owns the payment intent entity and its append-only event log.
//! Intents are mutated exclusively through the transactional operations
//! defined here; every accepted transition appends one `PaymentEvent` row.
//! The store's write lock is the serialization point for a given intent, so
//! overlapping reconciliation sweeps cannot silently revert a more advanced
//! status: the current status is re-read inside the same critical section
//! that writes the new one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;

use crate::error::PaymentError;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Lifecycle status of a payment intent.
///
/// Statuses only move forward: `RequiresPayment -> Processing -> {Succeeded,
/// Failed}`, with `Canceled` reachable from any non-terminal state. A
/// confirmed deposit may also drive `RequiresPayment` directly to a terminal
/// state. `Succeeded`, `Failed` and `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    /// Intent created, waiting for a deposit
    RequiresPayment,
    /// Deposit observed on-chain, waiting for finality
    Processing,
    /// Deposit confirmed and settled
    Succeeded,
    /// Deposit terminally failed
    Failed,
    /// Intent canceled before reaching a settlement outcome
    Canceled,
}

impl IntentStatus {
    /// Returns true if no further transition is allowed from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Snake-case wire name, as used in event types and serialized records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequiresPayment => "requires_payment",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }

    /// Event type string recorded in the event log and sent in webhooks
    /// (e.g. `payment_intent.succeeded`).
    pub fn event_type(&self) -> String {
        format!("payment_intent.{}", self.as_str())
    }

    /// Checks whether the state machine allows moving to `next`.
    ///
    /// Re-applying the current status is handled separately by the store as
    /// a side-effect-free no-op and is not considered a transition.
    pub fn can_transition_to(&self, next: IntentStatus) -> bool {
        match self {
            Self::RequiresPayment => matches!(
                next,
                Self::Processing | Self::Succeeded | Self::Failed | Self::Canceled
            ),
            Self::Processing => {
                matches!(next, Self::Succeeded | Self::Failed | Self::Canceled)
            }
            // Terminal states admit no further transitions
            Self::Succeeded | Self::Failed | Self::Canceled => false,
        }
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment intent: one requested payment and its status lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Unique identifier (UUID)
    pub id: String,
    /// Merchant who owns this intent
    pub merchant_id: String,
    /// Amount in sats (smallest unit)
    pub amount_sats: i64,
    /// Current lifecycle status
    pub status: IntentStatus,
    /// Chain transaction reference for a direct deposit (if initiated)
    pub tx_ref: Option<String>,
    /// Transaction ID for a contract-call-initiated deposit (if initiated)
    pub contract_txid: Option<String>,
    /// Number of confirmations observed for the settling transaction
    pub confirmations: u32,
    /// Reason recorded when the intent was canceled
    pub cancel_reason: Option<String>,
    /// Unix timestamp after which the intent is considered expired
    pub expires_at: i64,
    /// Free-form merchant metadata
    pub metadata: serde_json::Value,
    /// Unix timestamp when the intent was created
    pub created_at: i64,
    /// Unix timestamp of the last accepted mutation
    pub updated_at: i64,
}

/// Append-only event log row. One row per accepted transition (plus the
/// `payment_intent.created` row written at creation). Never updated or
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Intent this event belongs to
    pub intent_id: String,
    /// Event type (e.g. `payment_intent.created`, `payment_intent.succeeded`)
    pub event_type: String,
    /// Event payload (intent snapshot and transition details)
    pub data: serde_json::Value,
    /// Unix timestamp when the event was recorded
    pub timestamp: i64,
}

/// Statically enumerated partial update applied alongside a status
/// transition. Only the fields the state machine recognizes can be set;
/// there is no dynamic column list.
#[derive(Debug, Clone, Default)]
pub struct IntentUpdate {
    /// Set the direct-deposit transaction reference
    pub tx_ref: Option<String>,
    /// Set the contract-call transaction ID
    pub contract_txid: Option<String>,
    /// Set the observed confirmation count
    pub confirmations: Option<u32>,
    /// Record a cancellation reason
    pub cancel_reason: Option<String>,
    /// Replace the merchant metadata
    pub metadata: Option<serde_json::Value>,
}

/// Result of a status-transition call.
///
/// `changed` is false when the requested status equals the previous one; a
/// no-op transition must not trigger a second webhook dispatch, so callers
/// schedule delivery only when `changed` is true.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The intent after the update was applied
    pub intent: PaymentIntent,
    /// Status before this call
    pub previous: IntentStatus,
    /// Whether the status actually moved
    pub changed: bool,
}

// ============================================================================
// STORE IMPLEMENTATION
// ============================================================================

/// Default intent lifetime when the caller does not provide an expiry (24 h).
pub const DEFAULT_EXPIRY_SECS: i64 = 24 * 60 * 60;

struct IntentState {
    intents: HashMap<String, PaymentIntent>,
    events: Vec<PaymentEvent>,
}

/// In-memory store for payment intents and their event log.
///
/// Uses a HashMap for O(1) lookup by intent ID. Thread-safe via RwLock; the
/// write section of `update_status` is the sole serialization point for a
/// given intent.
pub struct IntentStore {
    state: RwLock<IntentState>,
}

impl IntentStore {
    /// Create an empty intent store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(IntentState {
                intents: HashMap::new(),
                events: Vec::new(),
            }),
        }
    }

    /// Create a new payment intent in status `RequiresPayment`.
    ///
    /// # Arguments
    ///
    /// * `merchant_id` - Merchant who owns the intent
    /// * `amount_sats` - Amount in sats; must be positive
    /// * `expires_at` - Optional expiry timestamp; defaults to now + 24 h
    ///
    /// # Returns
    ///
    /// * `Ok(PaymentIntent)` - The created intent
    /// * `Err(PaymentError::InvalidAmount)` - Amount was zero or negative
    pub async fn create(
        &self,
        merchant_id: &str,
        amount_sats: i64,
        expires_at: Option<i64>,
    ) -> Result<PaymentIntent, PaymentError> {
        if amount_sats <= 0 {
            return Err(PaymentError::InvalidAmount(amount_sats));
        }

        let now = current_timestamp();
        let intent = PaymentIntent {
            id: uuid::Uuid::new_v4().to_string(),
            merchant_id: merchant_id.to_string(),
            amount_sats,
            status: IntentStatus::RequiresPayment,
            tx_ref: None,
            contract_txid: None,
            confirmations: 0,
            cancel_reason: None,
            expires_at: expires_at.unwrap_or(now + DEFAULT_EXPIRY_SECS),
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.write().await;
        state.events.push(PaymentEvent {
            intent_id: intent.id.clone(),
            event_type: "payment_intent.created".to_string(),
            data: serde_json::json!({
                "merchant_id": intent.merchant_id,
                "amount_sats": intent.amount_sats,
                "expires_at": intent.expires_at,
            }),
            timestamp: now,
        });
        state.intents.insert(intent.id.clone(), intent.clone());
        Ok(intent)
    }

    /// Get a payment intent by ID.
    pub async fn get(&self, id: &str) -> Option<PaymentIntent> {
        let state = self.state.read().await;
        state.intents.get(id).cloned()
    }

    /// Transactional read-modify-write of an intent's status.
    ///
    /// The previous status is read and the new status written inside the
    /// same critical section, so a stale read cannot revert a more advanced
    /// status. On a real status change one `PaymentEvent` of type
    /// `payment_intent.<new_status>` is appended; re-applying the current
    /// status is a complete no-op that leaves the record, including its
    /// columns, untouched.
    ///
    /// # Arguments
    ///
    /// * `id` - Intent ID
    /// * `new_status` - Target status
    /// * `update` - Statically enumerated field updates to apply
    ///
    /// # Returns
    ///
    /// * `Ok(TransitionOutcome)` - Updated intent, previous status, and
    ///   whether the status actually moved
    /// * `Err(PaymentError::IntentNotFound)` - Unknown intent ID
    /// * `Err(PaymentError::InvalidTransition)` - Disallowed by the state
    ///   machine (including any transition out of a terminal state)
    pub async fn update_status(
        &self,
        id: &str,
        new_status: IntentStatus,
        update: IntentUpdate,
    ) -> Result<TransitionOutcome, PaymentError> {
        let mut state = self.state.write().await;
        let intent = state
            .intents
            .get_mut(id)
            .ok_or_else(|| PaymentError::IntentNotFound(id.to_string()))?;

        let previous = intent.status;

        // Re-applying the current status leaves the record untouched, so a
        // late duplicate observation cannot rewrite a settled record's columns
        if previous == new_status {
            return Ok(TransitionOutcome {
                intent: intent.clone(),
                previous,
                changed: false,
            });
        }

        if !previous.can_transition_to(new_status) {
            return Err(PaymentError::InvalidTransition {
                from: previous,
                to: new_status,
            });
        }

        let now = current_timestamp();
        if let Some(tx_ref) = update.tx_ref {
            intent.tx_ref = Some(tx_ref);
        }
        if let Some(contract_txid) = update.contract_txid {
            intent.contract_txid = Some(contract_txid);
        }
        if let Some(confirmations) = update.confirmations {
            intent.confirmations = confirmations;
        }
        if let Some(reason) = update.cancel_reason {
            intent.cancel_reason = Some(reason);
        }
        if let Some(metadata) = update.metadata {
            intent.metadata = metadata;
        }
        intent.status = new_status;
        intent.updated_at = now;

        let snapshot = intent.clone();
        state.events.push(PaymentEvent {
            intent_id: snapshot.id.clone(),
            event_type: new_status.event_type(),
            data: serde_json::json!({
                "previous_status": previous.as_str(),
                "status": new_status.as_str(),
                "confirmations": snapshot.confirmations,
            }),
            timestamp: now,
        });

        Ok(TransitionOutcome {
            intent: snapshot,
            previous,
            changed: true,
        })
    }

    /// Cancel an intent. Only valid from non-terminal states; delegates to
    /// `update_status` with the cancellation reason recorded.
    pub async fn cancel(
        &self,
        id: &str,
        reason: Option<&str>,
    ) -> Result<TransitionOutcome, PaymentError> {
        self.update_status(
            id,
            IntentStatus::Canceled,
            IntentUpdate {
                cancel_reason: Some(reason.unwrap_or("canceled").to_string()),
                ..IntentUpdate::default()
            },
        )
        .await
    }

    /// Returns all intents whose expiry has passed and whose status is still
    /// open (`RequiresPayment` or `Processing`). Expiry enforcement (calling
    /// `cancel`) is performed by an external sweep; only the query is part
    /// of this store's contract.
    pub async fn find_expired(&self) -> Vec<PaymentIntent> {
        let now = current_timestamp();
        let state = self.state.read().await;
        state
            .intents
            .values()
            .filter(|intent| {
                intent.expires_at < now
                    && matches!(
                        intent.status,
                        IntentStatus::RequiresPayment | IntentStatus::Processing
                    )
            })
            .cloned()
            .collect()
    }

    /// Returns the event log rows for one intent, in append order.
    pub async fn events_for(&self, intent_id: &str) -> Vec<PaymentEvent> {
        let state = self.state.read().await;
        state
            .events
            .iter()
            .filter(|event| event.intent_id == intent_id)
            .cloned()
            .collect()
    }
}

impl Default for IntentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
