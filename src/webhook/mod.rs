//! Webhook Dispatcher Module
//!
//! Signs, delivers, and retries event notifications to merchant endpoints.
//! Every attempt, successful or not, is written to the delivery log before
//! the dispatcher returns or reschedules; the audit trail is unconditional.
//!
//! Delivery work flows through the outbox: a status transition enqueues an
//! event, the `DeliveryWorker` claims it and drives the bounded retry loop.
//! The `retry_failed_webhooks` recovery sweep re-attempts events whose
//! in-process retry timers were lost to a crash; it is a compensating batch
//! job, not a substitute for the primary retry path.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::WebhookConfig;
use crate::storage::merchants::MerchantDirectory;
use crate::storage::webhooks::{WebhookDeliveryRecord, WebhookLogStore, WebhookOutbox};

pub mod signature;

pub use signature::{parse_signature_header, sign_payload, verify_signature};

// ============================================================================
// EVENT STRUCTURE
// ============================================================================

/// One logical webhook event: the unit the retry bound applies to.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Logical event ID, embedded in the payload `id` field
    pub event_id: String,
    /// Event type, sent in the `X-Event-Type` header and the payload `type`
    pub event_type: String,
    /// Related payment intent, recorded in the delivery log
    pub intent_id: Option<String>,
    /// Full JSON body to deliver
    pub payload: serde_json::Value,
}

/// Builds the webhook body for a payment-intent event:
/// `{id, object: "event", type, created, data: {object: <intent>}}`.
pub fn event_body(
    event_id: &str,
    event_type: &str,
    created: i64,
    intent: &serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "id": event_id,
        "object": "event",
        "type": event_type,
        "created": created,
        "data": { "object": intent },
    })
}

// ============================================================================
// DISPATCHER IMPLEMENTATION
// ============================================================================

/// Dispatcher that signs and delivers webhook events with bounded retry.
pub struct WebhookDispatcher {
    /// HTTP client for webhook POSTs
    client: reqwest::Client,
    /// Append-only delivery audit log
    logs: Arc<WebhookLogStore>,
    /// Delivery settings (timeout, retry bound, backoff schedule)
    config: WebhookConfig,
}

impl WebhookDispatcher {
    /// Creates a dispatcher with the given delivery log and settings.
    ///
    /// # Returns
    ///
    /// * `Ok(WebhookDispatcher)` - Successfully created dispatcher
    /// * `Err(anyhow::Error)` - Failed to create the HTTP client
    pub fn new(logs: Arc<WebhookLogStore>, config: &WebhookConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.delivery_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            logs,
            config: config.clone(),
        })
    }

    /// Delivers one logical event, retrying on failure up to the configured
    /// attempt bound with a fixed backoff indexed by attempt number.
    ///
    /// Each attempt is signed fresh (new timestamp, new signature) and
    /// logged before the next is scheduled. A 2xx response stops the loop; a
    /// `410 Gone` stops it early since the endpoint has declared itself
    /// permanently unregistered; exhausting the bound leaves the event
    /// permanently undelivered, discoverable via the log and stats.
    ///
    /// # Arguments
    ///
    /// * `merchant_id` - Merchant the event is addressed to
    /// * `url` - Merchant webhook endpoint
    /// * `secret` - Shared signing secret
    /// * `event` - The logical event to deliver
    /// * `first_attempt` - Attempt number to start at (1 for fresh events;
    ///   the recovery sweep resumes at the last logged attempt + 1)
    ///
    /// # Returns
    ///
    /// True if some attempt was answered with a 2xx
    pub async fn send_webhook(
        &self,
        merchant_id: &str,
        url: &str,
        secret: &str,
        event: &WebhookEvent,
        first_attempt: u32,
    ) -> bool {
        let body = event.payload.to_string();
        let mut attempt = first_attempt.max(1);

        loop {
            let timestamp = chrono::Utc::now().timestamp();
            let signature = sign_payload(secret, timestamp, &body);

            let result = self
                .client
                .post(url)
                .header("Content-Type", "application/json")
                .header("X-Event-Type", &event.event_type)
                .header("X-Timestamp", timestamp.to_string())
                .header("X-Signature", &signature)
                .body(body.clone())
                .send()
                .await;

            let (delivered, response_status) = match &result {
                Ok(response) => (response.status().is_success(), Some(response.status().as_u16())),
                Err(_) => (false, None),
            };

            // The audit trail is unconditional: log before returning or
            // scheduling the next attempt
            self.logs
                .append(WebhookDeliveryRecord {
                    event_id: event.event_id.clone(),
                    merchant_id: merchant_id.to_string(),
                    intent_id: event.intent_id.clone(),
                    event_type: event.event_type.clone(),
                    url: url.to_string(),
                    payload: event.payload.clone(),
                    response_status,
                    delivered,
                    attempt,
                    timestamp,
                })
                .await;

            if delivered {
                info!(
                    "Webhook {} delivered to merchant {} on attempt {}",
                    event.event_id, merchant_id, attempt
                );
                return true;
            }

            match &result {
                Ok(response) => {
                    if response.status() == reqwest::StatusCode::GONE {
                        warn!(
                            "Webhook {} endpoint for merchant {} is gone (410), not retrying",
                            event.event_id, merchant_id
                        );
                        return false;
                    }
                    warn!(
                        "Webhook {} attempt {} failed with status {}",
                        event.event_id,
                        attempt,
                        response.status()
                    );
                }
                Err(e) => {
                    warn!(
                        "Webhook {} attempt {} failed to send: {}",
                        event.event_id, attempt, e
                    );
                }
            }

            if attempt >= self.config.max_attempts {
                warn!(
                    "Webhook {} permanently undelivered after {} attempts",
                    event.event_id, attempt
                );
                return false;
            }

            tokio::time::sleep(self.backoff_for(attempt)).await;
            attempt += 1;
        }
    }

    /// Recovery sweep: re-attempts undelivered events from the retry window
    /// that still have retry budget, joined against the merchant directory
    /// for the current endpoint and secret.
    ///
    /// # Returns
    ///
    /// Number of events re-attempted
    pub async fn retry_failed_webhooks(&self, merchants: &MerchantDirectory) -> usize {
        let candidates = self
            .logs
            .undelivered_retryable(self.config.retry_window_secs, self.config.max_attempts)
            .await;

        let mut retried = 0;
        for record in candidates {
            let endpoint = match merchants.get(&record.merchant_id).await {
                Some(endpoint) => endpoint,
                None => {
                    warn!(
                        "Skipping webhook {} retry: merchant {} has no endpoint",
                        record.event_id, record.merchant_id
                    );
                    continue;
                }
            };

            let event = WebhookEvent {
                event_id: record.event_id.clone(),
                event_type: record.event_type.clone(),
                intent_id: record.intent_id.clone(),
                payload: record.payload.clone(),
            };

            self.send_webhook(
                &record.merchant_id,
                &endpoint.webhook_url,
                &endpoint.webhook_secret,
                &event,
                record.attempt + 1,
            )
            .await;
            retried += 1;
        }

        retried
    }

    /// Backoff to wait after the given attempt number. An empty schedule
    /// retries without waiting.
    fn backoff_for(&self, attempt: u32) -> Duration {
        let schedule = &self.config.retry_backoff_ms;
        let index = (attempt as usize)
            .saturating_sub(1)
            .min(schedule.len().saturating_sub(1));
        Duration::from_millis(schedule.get(index).copied().unwrap_or(0))
    }
}

// ============================================================================
// DELIVERY WORKER
// ============================================================================

/// Background worker that drains the outbox and drives delivery.
///
/// The worker is spawned by the bootstrap with an explicit task handle; a
/// single drain can also be driven directly (`drain_once`) so tests do not
/// wait on wall-clock intervals.
pub struct DeliveryWorker {
    dispatcher: Arc<WebhookDispatcher>,
    outbox: Arc<WebhookOutbox>,
    merchants: Arc<MerchantDirectory>,
    poll_interval: Duration,
}

impl DeliveryWorker {
    /// Creates a worker over the given outbox and merchant directory.
    pub fn new(
        dispatcher: Arc<WebhookDispatcher>,
        outbox: Arc<WebhookOutbox>,
        merchants: Arc<MerchantDirectory>,
        config: &WebhookConfig,
    ) -> Self {
        Self {
            dispatcher,
            outbox,
            merchants,
            poll_interval: Duration::from_millis(config.outbox_poll_interval_ms),
        }
    }

    /// Runs the worker loop: drain, sleep, repeat.
    pub async fn run(&self) {
        info!("Starting webhook delivery worker");
        loop {
            self.drain_once().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Claims and delivers all pending outbox entries.
    ///
    /// # Returns
    ///
    /// Number of entries processed
    pub async fn drain_once(&self) -> usize {
        let claimed = self.outbox.claim_pending().await;
        let mut processed = 0;

        for entry in claimed {
            let endpoint = match self.merchants.get(&entry.merchant_id).await {
                Some(endpoint) => endpoint,
                None => {
                    error!(
                        "Dropping webhook {}: merchant {} has no registered endpoint",
                        entry.event_id, entry.merchant_id
                    );
                    self.outbox.mark_done(&entry.event_id).await;
                    continue;
                }
            };

            let event = WebhookEvent {
                event_id: entry.event_id.clone(),
                event_type: entry.event_type.clone(),
                intent_id: Some(entry.intent_id.clone()),
                payload: entry.payload.clone(),
            };

            self.dispatcher
                .send_webhook(
                    &entry.merchant_id,
                    &endpoint.webhook_url,
                    &endpoint.webhook_secret,
                    &event,
                    1,
                )
                .await;

            // Outcome lives in the delivery log; the outbox entry is done
            // either way
            self.outbox.mark_done(&entry.event_id).await;
            processed += 1;
        }

        processed
    }
}
