//! Storage Module
//!
//! In-memory, lock-serialized stores for payment intents, chain transaction
//! monitoring records, webhook delivery logs/outbox, and the merchant
//! endpoint directory. Each store guards its state behind a `RwLock`; the
//! write section of a store is the transactional serialization point for the
//! records it owns, so concurrent reconciliation sweeps cannot produce a
//! lost update on the same intent.

pub mod intents;
pub mod merchants;
pub mod transactions;
pub mod webhooks;
