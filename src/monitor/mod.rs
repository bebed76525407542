//! Chain Monitoring Module
//!
//! This module watches the external ledger for deposit outcomes and feeds
//! them back into payment intents:
//!
//! - `cache`: best-effort TTL cache in front of ledger queries
//! - `deposit`: maps raw indexer state to pending/confirmed/failed
//! - `reconcile`: the periodic sweep applying observations to intents

pub mod cache;
pub mod deposit;
pub mod reconcile;

pub use cache::StatusCache;
pub use deposit::{ChainMonitor, DepositStatus};
pub use reconcile::Reconciler;
