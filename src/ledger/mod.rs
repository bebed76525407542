//! Ledger API Client Module
//!
//! This module provides a client for the external ledger-indexing API via
//! its HTTP REST interface. It covers the capability surface the monitor
//! needs: transaction lookup, transaction settlement events, address
//! balances, and contract-call execution status.
//!
//! A 404 from the indexer means "not indexed yet", not an error: the
//! transaction may simply not have propagated. Callers receive `Ok(None)` /
//! a pending execution status in that case and must treat it as ambiguous.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

// ============================================================================
// API RESPONSE STRUCTURES
// ============================================================================

/// Transaction summary from the ledger indexer.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerTransaction {
    /// Transaction identifier as reported by the indexer
    pub tx_id: String,
    /// Indexer status string (`pending` until final, `final` once anchored)
    pub status: String,
    /// Confirmation count at query time
    #[serde(default)]
    pub confirmations: u32,
    /// Block height the transaction was anchored at, if final
    #[serde(default)]
    pub block_height: Option<u64>,
}

impl LedgerTransaction {
    /// Whether the indexer considers this transaction final.
    pub fn is_final(&self) -> bool {
        self.status == "final"
    }
}

/// One settlement-side event attached to a transaction (e.g. a token mint
/// crediting the deposit address).
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerEvent {
    /// Event type as reported by the indexer (e.g. `mint`, `transfer`)
    pub event_type: String,
    /// Amount moved by the event, in sats
    #[serde(default)]
    pub amount: Option<i64>,
    /// Receiving address, if the event has one
    #[serde(default)]
    pub recipient: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    events: Vec<LedgerEvent>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: u64,
}

/// Execution result of a contract-call transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Call executed and committed
    Success,
    /// Call aborted on-chain
    Abort,
    /// Not yet executed or not yet indexed
    Pending,
}

#[derive(Debug, Deserialize)]
struct ExecutionStatusResponse {
    result: ExecutionStatus,
    #[serde(default)]
    confirmations: u32,
}

// ============================================================================
// LEDGER CLIENT IMPLEMENTATION
// ============================================================================

/// Client for the external ledger-indexing API.
pub struct LedgerClient {
    /// HTTP client for making requests
    client: Client,
    /// Base URL of the indexer (e.g. "https://api.example.org")
    base_url: String,
}

impl LedgerClient {
    /// Creates a new ledger client for the given indexer URL.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the ledger indexer
    /// * `timeout_ms` - Per-request timeout in milliseconds
    ///
    /// # Returns
    ///
    /// * `Ok(LedgerClient)` - Successfully created client
    /// * `Err(anyhow::Error)` - Failed to create the HTTP client
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Queries a transaction by reference.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(LedgerTransaction))` - Transaction is indexed
    /// * `Ok(None)` - Transaction is not (yet) indexed
    /// * `Err(anyhow::Error)` - Hard API failure (transport error or 5xx)
    pub async fn get_transaction(&self, tx_ref: &str) -> Result<Option<LedgerTransaction>> {
        let url = format!("{}/v1/tx/{}", self.base_url, tx_ref);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send transaction request")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response
            .error_for_status()
            .context("Transaction request failed")?;

        let tx: LedgerTransaction = response
            .json()
            .await
            .context("Failed to parse transaction response")?;

        Ok(Some(tx))
    }

    /// Queries the settlement events attached to a transaction.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<LedgerEvent>)` - Events indexed for the transaction (empty
    ///   if the transaction is unknown to the events endpoint)
    /// * `Err(anyhow::Error)` - Hard API failure
    pub async fn get_transaction_events(&self, tx_ref: &str) -> Result<Vec<LedgerEvent>> {
        let url = format!("{}/v1/tx/{}/events", self.base_url, tx_ref);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send transaction events request")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(vec![]);
        }

        let response = response
            .error_for_status()
            .context("Transaction events request failed")?;

        let events: EventsResponse = response
            .json()
            .await
            .context("Failed to parse transaction events response")?;

        Ok(events.events)
    }

    /// Queries the token balance of an address.
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - Balance in sats
    /// * `Err(anyhow::Error)` - Hard API failure
    pub async fn get_balance(&self, address: &str) -> Result<u64> {
        let url = format!("{}/v1/address/{}/balance", self.base_url, address);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send balance request")?
            .error_for_status()
            .context("Balance request failed")?;

        let balance: BalanceResponse = response
            .json()
            .await
            .context("Failed to parse balance response")?;

        Ok(balance.balance)
    }

    /// Queries the execution status of a contract-call transaction.
    ///
    /// # Returns
    ///
    /// * `Ok((ExecutionStatus, confirmations))` - Reported execution result;
    ///   an unindexed transaction reports `Pending` with 0 confirmations
    /// * `Err(anyhow::Error)` - Hard API failure
    pub async fn get_execution_status(&self, txid: &str) -> Result<(ExecutionStatus, u32)> {
        let url = format!("{}/v1/tx/{}/status", self.base_url, txid);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send execution status request")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok((ExecutionStatus::Pending, 0));
        }

        let response = response
            .error_for_status()
            .context("Execution status request failed")?;

        let status: ExecutionStatusResponse = response
            .json()
            .await
            .context("Failed to parse execution status response")?;

        Ok((status.result, status.confirmations))
    }
}
