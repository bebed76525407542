//! Payment Coordinator Service
//!
//! Standalone service wrapping the payment coordination core: the
//! reconciliation loop, the webhook delivery worker, and the recovery sweep
//! run as spawned background tasks with handles owned here, so the process
//! controls their whole lifecycle.
//!
//! ## Overview
//!
//! The coordinator:
//! 1. Monitors initiated deposits against the external ledger indexer
//! 2. Advances payment intents as deposits confirm or fail
//! 3. Signs and delivers webhook events to merchant endpoints with bounded
//!    retry and an unconditional audit trail
//! 4. Periodically re-attempts undelivered events that lost their in-process
//!    retry timers to a restart

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use payment_coordinator::config::Config;
use payment_coordinator::ledger::LedgerClient;
use payment_coordinator::monitor::{ChainMonitor, Reconciler, StatusCache};
use payment_coordinator::service::PaymentService;
use payment_coordinator::storage::intents::IntentStore;
use payment_coordinator::storage::merchants::MerchantDirectory;
use payment_coordinator::storage::transactions::ChainTxStore;
use payment_coordinator::storage::webhooks::{WebhookLogStore, WebhookOutbox};
use payment_coordinator::webhook::{DeliveryWorker, WebhookDispatcher};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

/// Main application entry point that initializes and runs the payment
/// coordinator service.
///
/// This function:
/// 1. Initializes logging and tracing
/// 2. Loads configuration from the TOML file
/// 3. Wires up stores, ledger client, monitor, and dispatcher
/// 4. Spawns the background tasks with explicit handles
/// 5. Runs until ctrl-c, then stops the tasks
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging for debugging and monitoring
    tracing_subscriber::fmt::init();

    info!("Starting Payment Coordinator Service");

    // Load configuration from config/payment-coordinator.toml
    let config = Config::load()?;
    info!("Configuration loaded successfully");

    // Stores (the persistence collaborator surface)
    let intents = Arc::new(IntentStore::new());
    let chain_txs = Arc::new(ChainTxStore::new());
    let merchants = Arc::new(MerchantDirectory::new());
    let outbox = Arc::new(WebhookOutbox::new());
    let logs = Arc::new(WebhookLogStore::new());

    // Ledger client and chain monitor
    let ledger = Arc::new(LedgerClient::new(
        &config.ledger.api_url,
        config.ledger.request_timeout_ms,
    )?);
    let cache = Arc::new(StatusCache::new(config.monitor.cache_enabled));
    let chain_monitor = Arc::new(ChainMonitor::new(ledger, cache, &config.monitor));

    // Service facade and webhook dispatch
    let service = Arc::new(PaymentService::new(
        intents,
        chain_txs,
        merchants.clone(),
        outbox.clone(),
    ));
    let dispatcher = Arc::new(WebhookDispatcher::new(logs, &config.webhook)?);
    let worker = Arc::new(DeliveryWorker::new(
        dispatcher.clone(),
        outbox,
        merchants.clone(),
        &config.webhook,
    ));
    let reconciler = Arc::new(Reconciler::new(service, chain_monitor, &config.reconciler));

    info!("All components initialized successfully");

    // Background tasks with explicit handles owned by the bootstrap
    let reconciler_handle = tokio::spawn({
        let reconciler = reconciler.clone();
        async move { reconciler.run().await }
    });

    let worker_handle = tokio::spawn({
        let worker = worker.clone();
        async move { worker.run().await }
    });

    // Recovery sweep: run once at startup (crash recovery), then on the
    // configured interval
    let sweep_interval =
        std::time::Duration::from_millis(config.webhook.retry_sweep_interval_ms);
    let sweep_handle = tokio::spawn({
        let dispatcher = dispatcher.clone();
        let merchants = merchants.clone();
        async move {
            loop {
                let retried = dispatcher.retry_failed_webhooks(&merchants).await;
                if retried > 0 {
                    info!("Recovery sweep re-attempted {} webhook events", retried);
                }
                tokio::time::sleep(sweep_interval).await;
            }
        }
    });

    info!("Background tasks started; press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    reconciler_handle.abort();
    worker_handle.abort();
    sweep_handle.abort();

    Ok(())
}
