//! Payment Coordinator Library
//!
//! This crate provides the core of a chain-backed payment platform: it
//! reconciles asynchronous ledger confirmations with payment-intent status
//! and guarantees signed, retried, audit-logged delivery of status changes
//! to merchant webhook endpoints. Merchant CRUD, payment links, dashboards
//! and the HTTP API are external collaborators; their complete contract is
//! the `PaymentService` facade plus the webhook dispatcher operations.

pub mod config;
pub mod error;
pub mod ledger;
pub mod monitor;
pub mod service;
pub mod storage;
pub mod webhook;

// Re-export commonly used types
pub use config::{Config, LedgerConfig, MonitorConfig, ReconcilerConfig, WebhookConfig};
pub use error::PaymentError;
pub use monitor::{ChainMonitor, DepositStatus, Reconciler, StatusCache};
pub use service::PaymentService;
pub use storage::intents::{IntentStatus, IntentStore, IntentUpdate, PaymentIntent};
pub use webhook::{DeliveryWorker, WebhookDispatcher, WebhookEvent};
