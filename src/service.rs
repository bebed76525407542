//! Payment Service Module
//!
//! Facade composing the stores and the webhook outbox into the public
//! operation surface the rest of the application calls: `create_intent`,
//! `update_status`, `cancel`, `find_expired`, plus deposit registration and
//! the expiry sweep helper. A committed status change enqueues the
//! corresponding webhook event; a no-op transition enqueues nothing.

use std::sync::Arc;
use tracing::info;

use crate::error::PaymentError;
use crate::storage::intents::{IntentStatus, IntentStore, IntentUpdate, PaymentIntent};
use crate::storage::merchants::MerchantDirectory;
use crate::storage::transactions::{ChainTransaction, ChainTxStore};
use crate::storage::webhooks::WebhookOutbox;
use crate::webhook::event_body;

/// Facade over the payment stores; the complete contract the excluded
/// CRUD/API layer is allowed to call.
pub struct PaymentService {
    intents: Arc<IntentStore>,
    chain_txs: Arc<ChainTxStore>,
    merchants: Arc<MerchantDirectory>,
    outbox: Arc<WebhookOutbox>,
}

impl PaymentService {
    /// Creates the service over the given stores.
    pub fn new(
        intents: Arc<IntentStore>,
        chain_txs: Arc<ChainTxStore>,
        merchants: Arc<MerchantDirectory>,
        outbox: Arc<WebhookOutbox>,
    ) -> Self {
        Self {
            intents,
            chain_txs,
            merchants,
            outbox,
        }
    }

    /// Creates a new payment intent in `requires_payment`.
    ///
    /// # Arguments
    ///
    /// * `merchant_id` - Owning merchant
    /// * `amount_sats` - Amount in sats; must be positive
    /// * `expires_at` - Optional expiry; defaults to now + 24 h
    pub async fn create_intent(
        &self,
        merchant_id: &str,
        amount_sats: i64,
        expires_at: Option<i64>,
    ) -> Result<PaymentIntent, PaymentError> {
        let intent = self.intents.create(merchant_id, amount_sats, expires_at).await?;
        info!(
            "Created payment intent {} for merchant {} ({} sats)",
            intent.id, merchant_id, amount_sats
        );
        Ok(intent)
    }

    /// Transitions an intent's status and, on a real change, enqueues the
    /// webhook event for delivery. Re-applying the current status is a
    /// no-op and enqueues nothing.
    ///
    /// # Returns
    ///
    /// * `Ok(PaymentIntent)` - The intent after the update
    /// * `Err(PaymentError)` - Unknown intent or disallowed transition
    pub async fn update_status(
        &self,
        id: &str,
        new_status: IntentStatus,
        update: IntentUpdate,
    ) -> Result<PaymentIntent, PaymentError> {
        let outcome = self.intents.update_status(id, new_status, update).await?;

        if outcome.changed {
            let event_id = uuid::Uuid::new_v4().to_string();
            let event_type = new_status.event_type();
            let created = chrono::Utc::now().timestamp();
            let intent_json = serde_json::to_value(&outcome.intent)
                .unwrap_or(serde_json::Value::Null);
            let payload = event_body(&event_id, &event_type, created, &intent_json);

            self.outbox
                .enqueue(
                    &event_id,
                    &outcome.intent.merchant_id,
                    &outcome.intent.id,
                    &event_type,
                    payload,
                )
                .await;

            info!(
                "Intent {} moved {} -> {}, webhook event {} enqueued",
                outcome.intent.id, outcome.previous, new_status, event_id
            );
        }

        Ok(outcome.intent)
    }

    /// Cancels an intent. Only valid from non-terminal states.
    pub async fn cancel(
        &self,
        id: &str,
        reason: Option<&str>,
    ) -> Result<PaymentIntent, PaymentError> {
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

    /// Returns open intents whose expiry has passed. Enforcement is the
    /// external sweep's job; this is only the query.
    pub async fn find_expired(&self) -> Vec<PaymentIntent> {
        self.intents.find_expired().await
    }

    /// Convenience sweep for the external expiry job: cancels every expired
    /// open intent with reason `expired`.
    ///
    /// # Returns
    ///
    /// The intents that were canceled
    pub async fn expire_overdue(&self) -> Vec<PaymentIntent> {
        let mut canceled = Vec::new();
        for intent in self.find_expired().await {
            if let Ok(updated) = self.cancel(&intent.id, Some("expired")).await {
                canceled.push(updated);
            }
        }
        canceled
    }

    /// Registers an initiated deposit: moves the intent to `processing` with
    /// its transaction references attached, then records the chain
    /// transaction for monitoring. The transition is applied first so a
    /// rejected one (unknown intent, terminal state) leaves no monitoring
    /// record behind for the reconciler to sweep.
    ///
    /// # Arguments
    ///
    /// * `intent_id` - Owning intent
    /// * `tx_ref` - Direct-deposit transaction reference, if known
    /// * `contract_txid` - Contract-call transaction ID, if known
    /// * `deposit_address` - Address the payer deposits to
    pub async fn attach_deposit(
        &self,
        intent_id: &str,
        tx_ref: Option<&str>,
        contract_txid: Option<&str>,
        deposit_address: &str,
    ) -> Result<ChainTransaction, PaymentError> {
        let intent = self
            .update_status(
                intent_id,
                IntentStatus::Processing,
                IntentUpdate {
                    tx_ref: tx_ref.map(|s| s.to_string()),
                    contract_txid: contract_txid.map(|s| s.to_string()),
                    ..IntentUpdate::default()
                },
            )
            .await?;

        let record = self
            .chain_txs
            .record_deposit(
                intent_id,
                tx_ref,
                contract_txid,
                deposit_address,
                intent.amount_sats,
            )
            .await;

        Ok(record)
    }

    /// The intent store (read access for callers and tests).
    pub fn intents(&self) -> &Arc<IntentStore> {
        &self.intents
    }

    /// The chain transaction store.
    pub fn chain_transactions(&self) -> &Arc<ChainTxStore> {
        &self.chain_txs
    }

    /// The merchant endpoint directory.
    pub fn merchants(&self) -> &Arc<MerchantDirectory> {
        &self.merchants
    }

    /// The webhook outbox.
    pub fn outbox(&self) -> &Arc<WebhookOutbox> {
        &self.outbox
    }
}
