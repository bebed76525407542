//! Deposit Monitoring Module
//!
//! Maps raw ledger-indexer state to the three deposit outcomes the
//! reconciler understands. Classification rules:
//!
//! - not indexed -> pending (the transaction may not have propagated)
//! - indexed, not final -> pending with the observed confirmation count
//! - final with a matching mint/settlement event -> confirmed
//! - final but settlement events not (yet) matching -> pending (indexers
//!   lag on events; ambiguity never terminates a transaction)
//! - hard API failure -> failed, with the error detail
//!
//! Confirmed results are cached for minutes since they are authoritative;
//! pending and failed results are cached briefly so the next sweep
//! re-checks soon.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::MonitorConfig;
use crate::ledger::{ExecutionStatus, LedgerClient, LedgerEvent};

use super::cache::StatusCache;

// ============================================================================
// DEPOSIT STATUS
// ============================================================================

/// Observed outcome of a monitored deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DepositStatus {
    /// Not final yet (or not yet indexed)
    Pending {
        /// Confirmations observed so far
        confirmations: u32,
    },
    /// Final with a matching settlement event
    Confirmed {
        /// Confirmations at observation time
        confirmations: u32,
        /// Block height the transaction anchored at, if known
        block_height: Option<u64>,
    },
    /// Terminally failed
    Failed {
        /// Error detail for the audit trail
        reason: String,
    },
}

impl DepositStatus {
    /// Returns true for confirmed and failed outcomes.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }
}

// ============================================================================
// CHAIN MONITOR
// ============================================================================

/// Monitor that classifies deposits by querying the ledger indexer through a
/// best-effort cache.
pub struct ChainMonitor {
    ledger: Arc<LedgerClient>,
    cache: Arc<StatusCache>,
    pending_ttl: Duration,
    confirmed_ttl: Duration,
}

impl ChainMonitor {
    /// Creates a monitor over the given ledger client and cache.
    pub fn new(ledger: Arc<LedgerClient>, cache: Arc<StatusCache>, config: &MonitorConfig) -> Self {
        Self {
            ledger,
            cache,
            pending_ttl: Duration::from_millis(config.pending_ttl_ms),
            confirmed_ttl: Duration::from_millis(config.confirmed_ttl_ms),
        }
    }

    /// Classifies a direct deposit identified by its transaction reference.
    ///
    /// Checks the cache first; a cached result within its TTL is returned
    /// as-is. Otherwise the indexer is queried and the result cached:
    /// confirmed results for the long TTL, pending/failed for the short one.
    ///
    /// # Arguments
    ///
    /// * `tx_ref` - Transaction reference of the deposit
    /// * `expected_sats` - Amount the settlement event must credit
    pub async fn monitor_deposit(&self, tx_ref: &str, expected_sats: i64) -> DepositStatus {
        if let Some(cached) = self.cache.get(tx_ref).await {
            return cached;
        }

        let status = self.classify_deposit(tx_ref, expected_sats).await;

        let ttl = match &status {
            DepositStatus::Confirmed { .. } => self.confirmed_ttl,
            _ => self.pending_ttl,
        };
        self.cache.put(tx_ref, status.clone(), ttl).await;

        status
    }

    /// Classifies a contract-call-initiated deposit by its transaction ID.
    ///
    /// Maps the ledger-reported execution result: success -> confirmed,
    /// abort -> failed, anything else -> pending. Cached like
    /// `monitor_deposit`.
    pub async fn transaction_status(&self, txid: &str) -> DepositStatus {
        if let Some(cached) = self.cache.get(txid).await {
            return cached;
        }

        let status = match self.ledger.get_execution_status(txid).await {
            Ok((ExecutionStatus::Success, confirmations)) => {
                info!("Contract call {} succeeded on-chain", txid);
                DepositStatus::Confirmed {
                    confirmations,
                    block_height: None,
                }
            }
            Ok((ExecutionStatus::Abort, _)) => DepositStatus::Failed {
                reason: format!("contract call {} aborted on-chain", txid),
            },
            Ok((ExecutionStatus::Pending, confirmations)) => {
                DepositStatus::Pending { confirmations }
            }
            Err(e) => {
                warn!("Ledger execution status query failed for {}: {}", txid, e);
                DepositStatus::Failed {
                    reason: format!("ledger query failed: {}", e),
                }
            }
        };

        let ttl = match &status {
            DepositStatus::Confirmed { .. } => self.confirmed_ttl,
            _ => self.pending_ttl,
        };
        self.cache.put(txid, status.clone(), ttl).await;

        status
    }

    /// Uncached classification of a direct deposit.
    async fn classify_deposit(&self, tx_ref: &str, expected_sats: i64) -> DepositStatus {
        let tx = match self.ledger.get_transaction(tx_ref).await {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                // Not indexed yet; keep the record eligible for the next sweep
                return DepositStatus::Pending { confirmations: 0 };
            }
            Err(e) => {
                warn!("Ledger transaction query failed for {}: {}", tx_ref, e);
                return DepositStatus::Failed {
                    reason: format!("ledger query failed: {}", e),
                };
            }
        };

        if !tx.is_final() {
            return DepositStatus::Pending {
                confirmations: tx.confirmations,
            };
        }

        // Final transaction: require a matching mint/settlement event before
        // reporting confirmed. An event-query failure or a not-yet-indexed
        // event list is ambiguous and stays pending.
        match self.ledger.get_transaction_events(tx_ref).await {
            Ok(events) if has_matching_settlement(&events, expected_sats) => {
                info!(
                    "Deposit {} confirmed with {} confirmations",
                    tx_ref, tx.confirmations
                );
                DepositStatus::Confirmed {
                    confirmations: tx.confirmations,
                    block_height: tx.block_height,
                }
            }
            Ok(_) => DepositStatus::Pending {
                confirmations: tx.confirmations,
            },
            Err(e) => {
                warn!("Ledger event query failed for {}: {}", tx_ref, e);
                DepositStatus::Pending {
                    confirmations: tx.confirmations,
                }
            }
        }
    }
}

/// Whether the event list contains a mint or settlement event for the
/// expected amount.
fn has_matching_settlement(events: &[LedgerEvent], expected_sats: i64) -> bool {
    events.iter().any(|event| {
        matches!(event.event_type.as_str(), "mint" | "settlement")
            && event.amount == Some(expected_sats)
    })
}
