//! Reconciliation Loop Module
//!
//! Periodic sweep synchronizing internal records with externally observed
//! ledger state. Each cycle selects the pending chain transactions inside
//! the scan window, classifies each through the chain monitor (preferring
//! the contract-call check over the direct-deposit check when both
//! references exist), and translates terminal observations into intent
//! transitions.
//!
//! Confirmation is inherently asynchronous and must never block the request
//! that initiated a deposit, so this loop runs as its own spawned task. Every
//! transition it applies is safe to re-apply: cycles can overlap or restart
//! mid-sweep without producing duplicate events or webhooks.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::ReconcilerConfig;
use crate::service::PaymentService;
use crate::storage::intents::{IntentStatus, IntentUpdate};
use crate::storage::transactions::ChainTransaction;

use super::deposit::{ChainMonitor, DepositStatus};

/// Periodic reconciliation sweep over pending chain transactions.
pub struct Reconciler {
    service: Arc<PaymentService>,
    monitor: Arc<ChainMonitor>,
    poll_interval: Duration,
    scan_window_secs: i64,
}

impl Reconciler {
    /// Creates a reconciler over the given service and monitor.
    pub fn new(
        service: Arc<PaymentService>,
        monitor: Arc<ChainMonitor>,
        config: &ReconcilerConfig,
    ) -> Self {
        Self {
            service,
            monitor,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            scan_window_secs: config.scan_window_secs,
        }
    }

    /// Runs the sweep loop. Spawned by the bootstrap with an explicit task
    /// handle; tests drive `run_once` directly instead of waiting on the
    /// interval.
    pub async fn run(&self) {
        info!(
            "Starting reconciliation loop (interval {:?})",
            self.poll_interval
        );
        loop {
            self.run_once().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Performs one sweep. A failure while processing one transaction is
    /// caught and logged and does not abort the remaining transactions.
    ///
    /// # Returns
    ///
    /// Number of transactions evaluated
    pub async fn run_once(&self) -> usize {
        let pending = self
            .service
            .chain_transactions()
            .pending_within(self.scan_window_secs)
            .await;

        let evaluated = pending.len();
        for tx in pending {
            if let Err(e) = self.reconcile_one(&tx).await {
                error!(
                    "Error reconciling transaction for intent {}: {}",
                    tx.intent_id, e
                );
            }
        }

        evaluated
    }

    /// Reconciles a single chain transaction: classify, persist the
    /// observation, and translate a terminal outcome into the owning
    /// intent's status.
    async fn reconcile_one(&self, tx: &ChainTransaction) -> anyhow::Result<()> {
        // Prefer the contract-call check when both references exist
        let observed = if let Some(txid) = &tx.contract_txid {
            self.monitor.transaction_status(txid).await
        } else if let Some(tx_ref) = &tx.tx_ref {
            self.monitor.monitor_deposit(tx_ref, tx.amount_sats).await
        } else {
            warn!(
                "Chain transaction for intent {} has no transaction reference, skipping",
                tx.intent_id
            );
            return Ok(());
        };

        self.service
            .chain_transactions()
            .apply_poll(&tx.intent_id, &observed)
            .await?;

        match observed {
            DepositStatus::Confirmed { confirmations, .. } => {
                self.service
                    .update_status(
                        &tx.intent_id,
                        IntentStatus::Succeeded,
                        IntentUpdate {
                            confirmations: Some(confirmations),
                            ..IntentUpdate::default()
                        },
                    )
                    .await?;
            }
            DepositStatus::Failed { ref reason } => {
                warn!(
                    "Deposit for intent {} failed terminally: {}",
                    tx.intent_id, reason
                );
                self.service
                    .update_status(
                        &tx.intent_id,
                        IntentStatus::Failed,
                        IntentUpdate::default(),
                    )
                    .await?;
            }
            DepositStatus::Pending { .. } => {
                // Confirmation count already persisted on the record; the
                // intent stays where it is until a terminal observation
            }
        }

        Ok(())
    }
}
