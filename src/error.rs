//! Error Types Module
//!
//! This module defines the typed error taxonomy for the payment coordinator.
//! Validation and not-found errors are surfaced synchronously to the caller;
//! external-dependency failures are degraded inside the monitor/reconciler
//! and never propagate out of a sweep as a crash.

use thiserror::Error;

use crate::storage::intents::IntentStatus;

/// Errors surfaced by the payment coordinator's public operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Payment amount must be a positive number of sats
    #[error("invalid amount: {0} sats (must be > 0)")]
    InvalidAmount(i64),

    /// The requested status transition is not allowed by the state machine
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: IntentStatus,
        to: IntentStatus,
    },

    /// No payment intent exists with the given ID
    #[error("payment intent not found: {0}")]
    IntentNotFound(String),

    /// No chain transaction record exists for the given intent
    #[error("chain transaction not found for intent: {0}")]
    TransactionNotFound(String),
}
