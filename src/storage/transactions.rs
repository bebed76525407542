//! Chain Transaction Storage Module
//!
//! Monitoring records for initiated deposits. One record per intent; created
//! when a deposit is initiated, updated transactionally as the reconciler
//! observes ledger state. Records stop being scanned once their status is
//! terminal or they age past the scan window, but the record itself persists.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::PaymentError;
use crate::monitor::deposit::DepositStatus;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Observed chain status of a monitored deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainTxStatus {
    /// Not yet final (or not yet indexed)
    Pending,
    /// Final with a matching settlement event
    Confirmed,
    /// Terminally failed (aborted contract call or hard ledger failure)
    Failed,
}

impl ChainTxStatus {
    /// Returns true once the record no longer needs scanning.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Monitoring record for one initiated deposit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTransaction {
    /// Owning payment intent
    pub intent_id: String,
    /// Direct-deposit transaction reference (if any)
    pub tx_ref: Option<String>,
    /// Contract-call transaction ID (if any); preferred over `tx_ref` when
    /// both are present
    pub contract_txid: Option<String>,
    /// Deposit address the payer was instructed to use
    pub deposit_address: String,
    /// Expected amount in sats
    pub amount_sats: i64,
    /// Last observed status
    pub status: ChainTxStatus,
    /// Last observed confirmation count
    pub confirmations: u32,
    /// Block height at confirmation (if known)
    pub block_height: Option<u64>,
    /// Last error detail recorded on a failed observation
    pub last_error: Option<String>,
    /// Unix timestamp when the deposit was initiated
    pub created_at: i64,
    /// Unix timestamp when the deposit was confirmed (if it was)
    pub confirmed_at: Option<i64>,
}

// ============================================================================
// STORE IMPLEMENTATION
// ============================================================================

/// In-memory store for chain transaction monitoring records, keyed by the
/// owning intent ID. Thread-safe via RwLock.
pub struct ChainTxStore {
    records: RwLock<HashMap<String, ChainTransaction>>,
}

impl ChainTxStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Record a newly initiated deposit for an intent.
    ///
    /// # Arguments
    ///
    /// * `intent_id` - Owning intent
    /// * `tx_ref` - Direct-deposit transaction reference, if known
    /// * `contract_txid` - Contract-call transaction ID, if known
    /// * `deposit_address` - Address the payer deposits to
    /// * `amount_sats` - Expected amount
    ///
    /// # Returns
    ///
    /// The created monitoring record
    pub async fn record_deposit(
        &self,
        intent_id: &str,
        tx_ref: Option<&str>,
        contract_txid: Option<&str>,
        deposit_address: &str,
        amount_sats: i64,
    ) -> ChainTransaction {
        let record = ChainTransaction {
            intent_id: intent_id.to_string(),
            tx_ref: tx_ref.map(|s| s.to_string()),
            contract_txid: contract_txid.map(|s| s.to_string()),
            deposit_address: deposit_address.to_string(),
            amount_sats,
            status: ChainTxStatus::Pending,
            confirmations: 0,
            block_height: None,
            last_error: None,
            created_at: current_timestamp(),
            confirmed_at: None,
        };

        let mut records = self.records.write().await;
        records.insert(record.intent_id.clone(), record.clone());
        record
    }

    /// Get the monitoring record for an intent.
    pub async fn get(&self, intent_id: &str) -> Option<ChainTransaction> {
        let records = self.records.read().await;
        records.get(intent_id).cloned()
    }

    /// Returns all pending records created within the scan window. Records
    /// older than the window are no longer scanned but remain stored.
    ///
    /// # Arguments
    ///
    /// * `window_secs` - Maximum age of a record to still be scanned
    pub async fn pending_within(&self, window_secs: i64) -> Vec<ChainTransaction> {
        let cutoff = current_timestamp() - window_secs;
        let records = self.records.read().await;
        records
            .values()
            .filter(|record| record.status == ChainTxStatus::Pending && record.created_at >= cutoff)
            .cloned()
            .collect()
    }

    /// Apply one poll observation to a record.
    ///
    /// Idempotent under repeated or overlapping sweeps: re-applying the same
    /// observation leaves the record unchanged, and a terminal record is
    /// never moved back to pending.
    ///
    /// # Returns
    ///
    /// * `Ok(ChainTransaction)` - The record after the observation
    /// * `Err(PaymentError::TransactionNotFound)` - No record for the intent
    pub async fn apply_poll(
        &self,
        intent_id: &str,
        observed: &DepositStatus,
    ) -> Result<ChainTransaction, PaymentError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(intent_id)
            .ok_or_else(|| PaymentError::TransactionNotFound(intent_id.to_string()))?;

        // Terminal records are not reopened by a stale pending observation
        if record.status.is_terminal() {
            return Ok(record.clone());
        }

        match observed {
            DepositStatus::Pending { confirmations } => {
                record.confirmations = *confirmations;
            }
            DepositStatus::Confirmed {
                confirmations,
                block_height,
            } => {
                record.status = ChainTxStatus::Confirmed;
                record.confirmations = *confirmations;
                record.block_height = *block_height;
                record.confirmed_at = Some(current_timestamp());
                record.last_error = None;
            }
            DepositStatus::Failed { reason } => {
                record.status = ChainTxStatus::Failed;
                record.last_error = Some(reason.clone());
            }
        }

        Ok(record.clone())
    }
}

impl Default for ChainTxStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
