//! Unit tests for the webhook signature engine
//!
//! These tests verify signing, verification, tamper detection, anti-replay
//! tolerance, and fail-closed behavior on malformed headers.

use payment_coordinator::webhook::{parse_signature_header, sign_payload, verify_signature};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::DUMMY_SECRET;

/// Anti-replay tolerance used across these tests (seconds)
const TOLERANCE_SECS: i64 = 300;

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ============================================================================
// ROUND-TRIP TESTS
// ============================================================================

/// Test that a freshly signed payload verifies
/// What is tested: sign then verify with the same secret and body
/// Why: The core contract of the signature engine
#[test]
fn test_sign_verify_roundtrip() {
    let body = r#"{"id":"evt_1","object":"event"}"#;
    let header = sign_payload(DUMMY_SECRET, now(), body);

    assert!(verify_signature(body, &header, DUMMY_SECRET, TOLERANCE_SECS));
}

/// Test that the header carries the expected format
/// What is tested: `t=<ts>,v1=<hex>` with a 32-byte hex MAC
/// Why: Merchants parse this format; it is part of the wire contract
#[test]
fn test_signature_header_format() {
    let timestamp = now();
    let header = sign_payload(DUMMY_SECRET, timestamp, "body");

    let (parsed_ts, mac_hex) =
        parse_signature_header(&header).expect("header should parse");
    assert_eq!(parsed_ts, timestamp);
    assert_eq!(mac_hex.len(), 64, "HMAC-SHA256 is 32 bytes = 64 hex chars");
}

// ============================================================================
// TAMPER DETECTION TESTS
// ============================================================================

/// Test that a modified body fails verification
/// What is tested: signature over body A does not verify body B
/// Why: Tamper detection is the point of signing
#[test]
fn test_tampered_body_rejected() {
    let header = sign_payload(DUMMY_SECRET, now(), r#"{"amount":100}"#);

    assert!(!verify_signature(
        r#"{"amount":999}"#,
        &header,
        DUMMY_SECRET,
        TOLERANCE_SECS
    ));
}

/// Test that the wrong secret fails verification
/// Why: A signature must only verify under the secret that produced it
#[test]
fn test_wrong_secret_rejected() {
    let body = "payload";
    let header = sign_payload(DUMMY_SECRET, now(), body);

    assert!(!verify_signature(body, &header, "whsec_other", TOLERANCE_SECS));
}

// ============================================================================
// ANTI-REPLAY TESTS
// ============================================================================

/// Test that a stale timestamp is rejected even with a correct MAC
/// What is tested: signature generated at now-400s, tolerance 300s
/// Why: Anti-replay protection; old captured requests must not verify
#[test]
fn test_stale_timestamp_rejected() {
    let body = "payload";
    let header = sign_payload(DUMMY_SECRET, now() - 400, body);

    assert!(!verify_signature(body, &header, DUMMY_SECRET, TOLERANCE_SECS));
}

/// Test that a far-future timestamp is rejected
/// Why: Tolerance applies in both directions
#[test]
fn test_future_timestamp_rejected() {
    let body = "payload";
    let header = sign_payload(DUMMY_SECRET, now() + 400, body);

    assert!(!verify_signature(body, &header, DUMMY_SECRET, TOLERANCE_SECS));
}

/// Test that a timestamp just inside the tolerance still verifies
/// Why: The boundary must not reject legitimate slightly-delayed deliveries
#[test]
fn test_timestamp_within_tolerance_accepted() {
    let body = "payload";
    let header = sign_payload(DUMMY_SECRET, now() - 250, body);

    assert!(verify_signature(body, &header, DUMMY_SECRET, TOLERANCE_SECS));
}

// ============================================================================
// MALFORMED HEADER TESTS
// ============================================================================

/// Test that malformed headers fail closed
/// What is tested: empty, missing parts, non-numeric timestamp, junk parts
/// Why: A parse failure must never be treated as a valid signature
#[test]
fn test_malformed_headers_rejected() {
    let body = "payload";

    for header in [
        "",
        "t=123",
        "v1=abcdef",
        "t=abc,v1=abcdef",
        "t=123,v1=",
        "timestamp=123,sig=abcdef",
        "t=123,v1=abcdef,extra=1",
    ] {
        assert!(
            !verify_signature(body, header, DUMMY_SECRET, TOLERANCE_SECS),
            "header '{}' should be rejected",
            header
        );
    }
}

/// Test that a well-formed header with invalid hex in the MAC is rejected
/// Why: Invalid hex must not bypass the constant-time comparison
#[test]
fn test_invalid_hex_mac_rejected() {
    let body = "payload";
    let header = format!("t={},v1=zzzz-not-hex", now());

    assert!(!verify_signature(body, &header, DUMMY_SECRET, TOLERANCE_SECS));
}

/// Test parse_signature_header on valid and invalid inputs
/// Why: The parser is also exposed for merchant-side consumption
#[test]
fn test_parse_signature_header() {
    assert_eq!(
        parse_signature_header("t=1700000000,v1=deadbeef"),
        Some((1_700_000_000, "deadbeef".to_string()))
    );
    assert_eq!(parse_signature_header("t=,v1=deadbeef"), None);
    assert_eq!(parse_signature_header("garbage"), None);
}
