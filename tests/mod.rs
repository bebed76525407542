//! Test module organization
//!
//! This module re-exports test helpers for use in test files.

mod helpers;

#[allow(unused_imports)]
pub use helpers::{
    build_dispatcher, build_monitor, build_service, build_test_config, empty_events_json,
    execution_status_json, fast_webhook_config, final_tx_json, mint_events_json, pending_tx_json,
    DUMMY_AMOUNT_SATS, DUMMY_CONTRACT_TXID, DUMMY_DEPOSIT_ADDR, DUMMY_MERCHANT_ID, DUMMY_SECRET,
    DUMMY_TX_REF,
};
