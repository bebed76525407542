//! Merchant Endpoint Directory Module
//!
//! Read surface for the merchant profile data owned by the excluded CRUD
//! layer: the webhook endpoint URL and shared signing secret per merchant.
//! The dispatcher and recovery sweep join delivery records against this
//! directory so a merchant's endpoint change takes effect on the next
//! attempt.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Webhook endpoint configuration for one merchant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantEndpoint {
    /// Merchant identifier
    pub merchant_id: String,
    /// URL the merchant's server listens on for webhook POSTs
    pub webhook_url: String,
    /// Shared secret used for HMAC signing of webhook payloads
    pub webhook_secret: String,
}

/// In-memory directory of merchant webhook endpoints. Thread-safe via RwLock.
pub struct MerchantDirectory {
    endpoints: RwLock<HashMap<String, MerchantEndpoint>>,
}

impl MerchantDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
        }
    }

    /// Register or replace a merchant's endpoint. Called by the external
    /// merchant-profile layer.
    pub async fn upsert(&self, merchant_id: &str, webhook_url: &str, webhook_secret: &str) {
        let mut endpoints = self.endpoints.write().await;
        endpoints.insert(
            merchant_id.to_string(),
            MerchantEndpoint {
                merchant_id: merchant_id.to_string(),
                webhook_url: webhook_url.to_string(),
                webhook_secret: webhook_secret.to_string(),
            },
        );
    }

    /// Look up the current endpoint for a merchant.
    pub async fn get(&self, merchant_id: &str) -> Option<MerchantEndpoint> {
        let endpoints = self.endpoints.read().await;
        endpoints.get(merchant_id).cloned()
    }
}

impl Default for MerchantDirectory {
    fn default() -> Self {
        Self::new()
    }
}
