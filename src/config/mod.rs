//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the payment
//! coordinator service. Configuration includes the ledger indexer endpoint,
//! reconciliation timing, monitor cache TTLs, and webhook delivery settings.

use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ledger indexer connection details
    pub ledger: LedgerConfig,
    /// Reconciliation sweep timing
    pub reconciler: ReconcilerConfig,
    /// Chain monitor cache settings
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Webhook delivery settings
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Connection details for the external ledger-indexing API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Base URL of the ledger indexer
    pub api_url: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

/// Timing settings for the reconciliation sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Interval between sweeps in milliseconds
    pub poll_interval_ms: u64,
    /// Age cutoff for scanning pending chain transactions, in seconds.
    /// Records older than this stay stored but are no longer scanned.
    #[serde(default = "default_scan_window_secs")]
    pub scan_window_secs: i64,
}

/// Cache settings for the chain monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Whether the best-effort status cache is enabled. When disabled every
    /// classification queries the indexer directly.
    pub cache_enabled: bool,
    /// TTL for pending/failed observations in milliseconds
    pub pending_ttl_ms: u64,
    /// TTL for confirmed observations in milliseconds. Confirmed status is
    /// authoritative, so re-verification can wait much longer.
    pub confirmed_ttl_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            pending_ttl_ms: 30_000,
            confirmed_ttl_ms: 300_000,
        }
    }
}

/// Webhook delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Timeout for a single webhook POST in milliseconds
    pub delivery_timeout_ms: u64,
    /// Maximum delivery attempts per logical event
    pub max_attempts: u32,
    /// Backoff before each retry, indexed by attempt number (the wait after
    /// attempt 1 is `retry_backoff_ms[0]`, and so on)
    pub retry_backoff_ms: Vec<u64>,
    /// Anti-replay tolerance for signature verification, in seconds
    pub signature_tolerance_secs: i64,
    /// Interval between outbox worker drains in milliseconds
    pub outbox_poll_interval_ms: u64,
    /// How far back the recovery sweep looks for undelivered events, in
    /// seconds
    pub retry_window_secs: i64,
    /// Interval between recovery sweeps in milliseconds
    pub retry_sweep_interval_ms: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            delivery_timeout_ms: 10_000,
            max_attempts: 3,
            retry_backoff_ms: vec![1_000, 5_000, 15_000],
            signature_tolerance_secs: 300,
            outbox_poll_interval_ms: 1_000,
            retry_window_secs: 24 * 60 * 60,
            retry_sweep_interval_ms: 300_000,
        }
    }
}

fn default_scan_window_secs() -> i64 {
    24 * 60 * 60
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Configuration is valid
    /// - `Err(anyhow::Error)` - Invalid endpoint URL or timing settings
    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.ledger.api_url)
            .map_err(|e| anyhow::anyhow!("Invalid ledger api_url '{}': {}", self.ledger.api_url, e))?;

        if self.reconciler.poll_interval_ms == 0 {
            anyhow::bail!("reconciler.poll_interval_ms must be greater than zero");
        }
        if self.reconciler.scan_window_secs <= 0 {
            anyhow::bail!("reconciler.scan_window_secs must be greater than zero");
        }
        if self.webhook.max_attempts == 0 {
            anyhow::bail!("webhook.max_attempts must be at least 1");
        }
        if self.webhook.retry_backoff_ms.len() + 1 < self.webhook.max_attempts as usize {
            anyhow::bail!(
                "webhook.retry_backoff_ms must provide at least {} entries for {} attempts",
                self.webhook.max_attempts - 1,
                self.webhook.max_attempts
            );
        }
        if self.webhook.signature_tolerance_secs <= 0 {
            anyhow::bail!("webhook.signature_tolerance_secs must be greater than zero");
        }

        Ok(())
    }

    /// Loads configuration from the TOML file.
    ///
    /// The path can be overridden with the `PAYMENT_COORDINATOR_CONFIG_PATH`
    /// environment variable (used by tests); otherwise
    /// `config/payment-coordinator.toml` is used.
    ///
    /// # Returns
    ///
    /// - `Ok(Config)` - Successfully loaded and validated configuration
    /// - `Err(anyhow::Error)` - File missing, unparseable, or invalid
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("PAYMENT_COORDINATOR_CONFIG_PATH")
            .unwrap_or_else(|_| "config/payment-coordinator.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/payment-coordinator.template.toml config/payment-coordinator.toml\n\
                Then edit config/payment-coordinator.toml with your actual values.",
                config_path
            ))
        }
    }

    /// Creates a default configuration with local placeholder values.
    ///
    /// Suitable for local development and tests. For production use the
    /// ledger endpoint must point at a real indexer.
    pub fn default() -> Self {
        Self {
            ledger: LedgerConfig {
                api_url: "http://127.0.0.1:3999".to_string(),
                request_timeout_ms: 10_000,
            },
            reconciler: ReconcilerConfig {
                poll_interval_ms: 30_000,
                scan_window_secs: default_scan_window_secs(),
            },
            monitor: MonitorConfig::default(),
            webhook: WebhookConfig::default(),
        }
    }
}
