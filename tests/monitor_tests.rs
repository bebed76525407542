//! Unit tests for the chain monitor
//!
//! These tests verify deposit classification against a mock ledger indexer:
//! the ambiguous-means-pending rule, settlement-event matching, hard-failure
//! handling, cache behavior, and contract-call execution status mapping.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payment_coordinator::monitor::DepositStatus;

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{
    build_monitor, empty_events_json, execution_status_json, final_tx_json, mint_events_json,
    pending_tx_json, DUMMY_AMOUNT_SATS, DUMMY_CONTRACT_TXID, DUMMY_DEPOSIT_ADDR, DUMMY_TX_REF,
};

// ============================================================================
// DIRECT DEPOSIT CLASSIFICATION TESTS
// ============================================================================

/// Test that an unindexed transaction maps to pending
/// What is tested: indexer 404 -> pending, not failed
/// Why: A transaction that has not propagated must stay eligible for the
/// next sweep; premature failure would terminate it incorrectly
#[tokio::test]
async fn test_unindexed_transaction_is_pending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}", DUMMY_TX_REF)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let monitor = build_monitor(&server.uri(), false);
    let status = monitor.monitor_deposit(DUMMY_TX_REF, DUMMY_AMOUNT_SATS).await;

    assert_eq!(status, DepositStatus::Pending { confirmations: 0 });
}

/// Test that a non-final transaction maps to pending with its confirmations
/// Why: Confirmation counts propagate to the monitoring record
#[tokio::test]
async fn test_unconfirmed_transaction_is_pending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}", DUMMY_TX_REF)))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_tx_json(DUMMY_TX_REF, 2)))
        .mount(&server)
        .await;

    let monitor = build_monitor(&server.uri(), false);
    let status = monitor.monitor_deposit(DUMMY_TX_REF, DUMMY_AMOUNT_SATS).await;

    assert_eq!(status, DepositStatus::Pending { confirmations: 2 });
}

/// Test that a final transaction with a matching mint event is confirmed
/// What is tested: status final + mint event of the expected amount
/// Why: The core success path of deposit monitoring
#[tokio::test]
async fn test_final_with_matching_mint_is_confirmed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}", DUMMY_TX_REF)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(final_tx_json(DUMMY_TX_REF, 6, 812_345)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}/events", DUMMY_TX_REF)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(mint_events_json(DUMMY_AMOUNT_SATS, DUMMY_DEPOSIT_ADDR)),
        )
        .mount(&server)
        .await;

    let monitor = build_monitor(&server.uri(), false);
    let status = monitor.monitor_deposit(DUMMY_TX_REF, DUMMY_AMOUNT_SATS).await;

    assert_eq!(
        status,
        DepositStatus::Confirmed {
            confirmations: 6,
            block_height: Some(812_345),
        }
    );
}

/// Test that a final transaction without a matching settlement stays pending
/// What is tested: final transaction, events list empty
/// Why: Event indexing lags finality; ambiguity must not confirm or fail
#[tokio::test]
async fn test_final_without_settlement_is_pending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}", DUMMY_TX_REF)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(final_tx_json(DUMMY_TX_REF, 6, 812_345)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}/events", DUMMY_TX_REF)))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_events_json()))
        .mount(&server)
        .await;

    let monitor = build_monitor(&server.uri(), false);
    let status = monitor.monitor_deposit(DUMMY_TX_REF, DUMMY_AMOUNT_SATS).await;

    assert_eq!(status, DepositStatus::Pending { confirmations: 6 });
}

/// Test that a mint event with the wrong amount does not confirm
/// Why: The settlement must credit the expected amount
#[tokio::test]
async fn test_wrong_amount_mint_is_pending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}", DUMMY_TX_REF)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(final_tx_json(DUMMY_TX_REF, 6, 812_345)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}/events", DUMMY_TX_REF)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(mint_events_json(DUMMY_AMOUNT_SATS - 1, DUMMY_DEPOSIT_ADDR)),
        )
        .mount(&server)
        .await;

    let monitor = build_monitor(&server.uri(), false);
    let status = monitor.monitor_deposit(DUMMY_TX_REF, DUMMY_AMOUNT_SATS).await;

    assert_eq!(status, DepositStatus::Pending { confirmations: 6 });
}

/// Test that a hard API failure maps to failed with error detail
/// What is tested: indexer 500 on the transaction endpoint
/// Why: Hard failures are terminal for the transaction record
#[tokio::test]
async fn test_hard_api_failure_is_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}", DUMMY_TX_REF)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let monitor = build_monitor(&server.uri(), false);
    let status = monitor.monitor_deposit(DUMMY_TX_REF, DUMMY_AMOUNT_SATS).await;

    assert!(
        matches!(status, DepositStatus::Failed { ref reason } if !reason.is_empty()),
        "500 should map to failed, got {:?}",
        status
    );
}

/// Test that an event-endpoint failure after finality is ambiguous
/// Why: Only the transaction endpoint failing hard fails the deposit; a
/// flaky events endpoint leaves the outcome pending for the next sweep
#[tokio::test]
async fn test_event_query_failure_is_pending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}", DUMMY_TX_REF)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(final_tx_json(DUMMY_TX_REF, 4, 812_000)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}/events", DUMMY_TX_REF)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let monitor = build_monitor(&server.uri(), false);
    let status = monitor.monitor_deposit(DUMMY_TX_REF, DUMMY_AMOUNT_SATS).await;

    assert_eq!(status, DepositStatus::Pending { confirmations: 4 });
}

// ============================================================================
// CACHE BEHAVIOR TESTS
// ============================================================================

/// Test that a confirmed result is served from cache
/// What is tested: two monitor calls, one upstream query
/// Why: Confirmed status is authoritative; re-verification is unnecessary
#[tokio::test]
async fn test_confirmed_result_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}", DUMMY_TX_REF)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(final_tx_json(DUMMY_TX_REF, 6, 812_345)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}/events", DUMMY_TX_REF)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(mint_events_json(DUMMY_AMOUNT_SATS, DUMMY_DEPOSIT_ADDR)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let monitor = build_monitor(&server.uri(), true);
    let first = monitor.monitor_deposit(DUMMY_TX_REF, DUMMY_AMOUNT_SATS).await;
    let second = monitor.monitor_deposit(DUMMY_TX_REF, DUMMY_AMOUNT_SATS).await;

    assert_eq!(first, second);
    server.verify().await;
}

/// Test that a disabled cache queries the indexer every time
/// What is tested: two monitor calls, two upstream queries
/// Why: Cache absence is a normal code path, not an error
#[tokio::test]
async fn test_disabled_cache_always_queries_remote() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}", DUMMY_TX_REF)))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let monitor = build_monitor(&server.uri(), false);
    monitor.monitor_deposit(DUMMY_TX_REF, DUMMY_AMOUNT_SATS).await;
    monitor.monitor_deposit(DUMMY_TX_REF, DUMMY_AMOUNT_SATS).await;

    server.verify().await;
}

// ============================================================================
// CONTRACT-CALL EXECUTION STATUS TESTS
// ============================================================================

/// Test the execution status mapping for contract-call deposits
/// What is tested: success -> confirmed, abort -> failed, 404 -> pending
/// Why: Contract-call-initiated deposits use the execution result, not the
/// settlement-event path
#[tokio::test]
async fn test_execution_status_mapping() {
    // success -> confirmed
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}/status", DUMMY_CONTRACT_TXID)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(execution_status_json("success", 3)),
        )
        .mount(&server)
        .await;
    let monitor = build_monitor(&server.uri(), false);
    assert_eq!(
        monitor.transaction_status(DUMMY_CONTRACT_TXID).await,
        DepositStatus::Confirmed {
            confirmations: 3,
            block_height: None,
        }
    );

    // abort -> failed
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}/status", DUMMY_CONTRACT_TXID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(execution_status_json("abort", 0)))
        .mount(&server)
        .await;
    let monitor = build_monitor(&server.uri(), false);
    assert!(matches!(
        monitor.transaction_status(DUMMY_CONTRACT_TXID).await,
        DepositStatus::Failed { .. }
    ));

    // not indexed -> pending
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/tx/{}/status", DUMMY_CONTRACT_TXID)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let monitor = build_monitor(&server.uri(), false);
    assert_eq!(
        monitor.transaction_status(DUMMY_CONTRACT_TXID).await,
        DepositStatus::Pending { confirmations: 0 }
    );
}
