//! Shared test helpers
//!
//! This module provides helper functions used by the integration tests.
//!
//! The module is organized into categories:
//! - **Constants**: Dummy identifiers shared across tests
//! - **Configuration Builders**: Fast-timing configs pointed at mock servers
//! - **Component Builders**: Wired service/monitor/dispatcher instances
//! - **Mock Response Builders**: Ledger indexer JSON bodies

use std::sync::Arc;

use payment_coordinator::config::{
    Config, LedgerConfig, MonitorConfig, ReconcilerConfig, WebhookConfig,
};
use payment_coordinator::ledger::LedgerClient;
use payment_coordinator::monitor::{ChainMonitor, StatusCache};
use payment_coordinator::service::PaymentService;
use payment_coordinator::storage::intents::IntentStore;
use payment_coordinator::storage::merchants::MerchantDirectory;
use payment_coordinator::storage::transactions::ChainTxStore;
use payment_coordinator::storage::webhooks::{WebhookLogStore, WebhookOutbox};
use payment_coordinator::webhook::WebhookDispatcher;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Dummy merchant ID
pub const DUMMY_MERCHANT_ID: &str = "merchant-0001";

/// Dummy direct-deposit transaction reference
pub const DUMMY_TX_REF: &str = "0x00000000000000000000000000000000000000000000000000000000000000a1";

/// Dummy contract-call transaction ID
#[allow(dead_code)]
pub const DUMMY_CONTRACT_TXID: &str =
    "0x00000000000000000000000000000000000000000000000000000000000000b2";

/// Dummy deposit address
pub const DUMMY_DEPOSIT_ADDR: &str = "dep1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqq";

/// Dummy webhook signing secret
pub const DUMMY_SECRET: &str = "whsec_test_0000000000000000";

/// Default intent amount used in tests (sats)
pub const DUMMY_AMOUNT_SATS: i64 = 100_000;

// ============================================================================
// CONFIGURATION BUILDERS
// ============================================================================

/// Webhook config with millisecond backoffs so retry loops finish fast.
pub fn fast_webhook_config() -> WebhookConfig {
    WebhookConfig {
        delivery_timeout_ms: 2_000,
        max_attempts: 3,
        retry_backoff_ms: vec![10, 10, 10],
        signature_tolerance_secs: 300,
        outbox_poll_interval_ms: 50,
        retry_window_secs: 24 * 60 * 60,
        retry_sweep_interval_ms: 60_000,
    }
}

/// Full config pointed at a mock ledger indexer.
#[allow(dead_code)]
pub fn build_test_config(ledger_url: &str) -> Config {
    Config {
        ledger: LedgerConfig {
            api_url: ledger_url.to_string(),
            request_timeout_ms: 2_000,
        },
        reconciler: ReconcilerConfig {
            poll_interval_ms: 50,
            scan_window_secs: 24 * 60 * 60,
        },
        monitor: MonitorConfig::default(),
        webhook: fast_webhook_config(),
    }
}

// ============================================================================
// COMPONENT BUILDERS
// ============================================================================

/// Builds a fully wired payment service over fresh in-memory stores.
pub fn build_service() -> Arc<PaymentService> {
    Arc::new(PaymentService::new(
        Arc::new(IntentStore::new()),
        Arc::new(ChainTxStore::new()),
        Arc::new(MerchantDirectory::new()),
        Arc::new(WebhookOutbox::new()),
    ))
}

/// Builds a chain monitor against the given mock indexer URL.
pub fn build_monitor(ledger_url: &str, cache_enabled: bool) -> Arc<ChainMonitor> {
    let ledger = Arc::new(
        LedgerClient::new(ledger_url, 2_000).expect("Failed to create ledger client"),
    );
    let cache = Arc::new(StatusCache::new(cache_enabled));
    Arc::new(ChainMonitor::new(ledger, cache, &MonitorConfig::default()))
}

/// Builds a dispatcher over a fresh delivery log, returning both.
pub fn build_dispatcher() -> (Arc<WebhookDispatcher>, Arc<WebhookLogStore>) {
    let logs = Arc::new(WebhookLogStore::new());
    let dispatcher = Arc::new(
        WebhookDispatcher::new(logs.clone(), &fast_webhook_config())
            .expect("Failed to create dispatcher"),
    );
    (dispatcher, logs)
}

// ============================================================================
// MOCK RESPONSE BUILDERS
// ============================================================================

/// Indexer transaction body: pending with the given confirmation count.
pub fn pending_tx_json(tx_ref: &str, confirmations: u32) -> serde_json::Value {
    serde_json::json!({
        "tx_id": tx_ref,
        "status": "pending",
        "confirmations": confirmations,
    })
}

/// Indexer transaction body: final at the given height.
pub fn final_tx_json(tx_ref: &str, confirmations: u32, block_height: u64) -> serde_json::Value {
    serde_json::json!({
        "tx_id": tx_ref,
        "status": "final",
        "confirmations": confirmations,
        "block_height": block_height,
    })
}

/// Indexer events body containing one mint event of the given amount.
pub fn mint_events_json(amount_sats: i64, recipient: &str) -> serde_json::Value {
    serde_json::json!({
        "events": [
            {
                "event_type": "mint",
                "amount": amount_sats,
                "recipient": recipient,
            }
        ]
    })
}

/// Indexer events body with no settlement events.
pub fn empty_events_json() -> serde_json::Value {
    serde_json::json!({ "events": [] })
}

/// Indexer execution status body for a contract call.
pub fn execution_status_json(result: &str, confirmations: u32) -> serde_json::Value {
    serde_json::json!({
        "result": result,
        "confirmations": confirmations,
    })
}
