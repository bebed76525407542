//! Webhook Signature Engine Module
//!
//! Symmetric signing and verification for webhook payloads. Signatures are
//! HMAC-SHA256 over `"{timestamp}.{payload}"` with the merchant's shared
//! secret, carried in the header format `t=<timestamp>,v1=<hex>`.
//!
//! Verification fails closed: a malformed header, a timestamp outside the
//! anti-replay tolerance, or a MAC mismatch all return false. The MAC
//! comparison is constant-time via `Mac::verify_slice`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Default anti-replay tolerance in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Signs a payload with the merchant's shared secret.
///
/// # Arguments
///
/// * `secret` - Shared signing secret
/// * `timestamp` - Unix timestamp bound into the signature
/// * `payload` - Serialized payload being signed
///
/// # Returns
///
/// The signature header value, `t=<timestamp>,v1=<hex-hmac>`
pub fn sign_payload(secret: &str, timestamp: i64, payload: &str) -> String {
    let mac_hex = compute_mac_hex(secret, timestamp, payload);
    format!("t={},v1={}", timestamp, mac_hex)
}

/// Verifies a signature header against a received body.
///
/// # Arguments
///
/// * `body` - The raw request body as received
/// * `signature_header` - The `t=..,v1=..` header value
/// * `secret` - Shared signing secret
/// * `tolerance_secs` - Maximum allowed |now - t| before the signature is
///   rejected as a replay
///
/// # Returns
///
/// True only if the header parses, the timestamp is within tolerance, and
/// the recomputed MAC matches
pub fn verify_signature(
    body: &str,
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> bool {
    let (timestamp, mac_hex) = match parse_signature_header(signature_header) {
        Some(parts) => parts,
        None => return false,
    };

    let now = chrono::Utc::now().timestamp();
    if (now - timestamp).abs() > tolerance_secs {
        return false;
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(format!("{}.{}", timestamp, body).as_bytes());

    // Decode hex first; an invalid signature compares against zeros so the
    // constant-time verify still runs
    let expected = hex::decode(&mac_hex).unwrap_or_else(|_| vec![0u8; 32]);
    mac.verify_slice(&expected).is_ok()
}

/// Parses a `t=<timestamp>,v1=<hex>` signature header.
///
/// # Returns
///
/// * `Some((timestamp, hex_mac))` - Header is well-formed
/// * `None` - Any parse failure (missing part, bad prefix, non-numeric
///   timestamp, empty MAC)
pub fn parse_signature_header(header: &str) -> Option<(i64, String)> {
    let mut timestamp: Option<i64> = None;
    let mut mac_hex: Option<String> = None;

    for part in header.split(',') {
        if let Some(value) = part.strip_prefix("t=") {
            timestamp = value.parse::<i64>().ok();
        } else if let Some(value) = part.strip_prefix("v1=") {
            if !value.is_empty() {
                mac_hex = Some(value.to_string());
            }
        } else {
            return None;
        }
    }

    Some((timestamp?, mac_hex?))
}

/// Computes the hex-encoded HMAC-SHA256 over `"{timestamp}.{payload}"`.
fn compute_mac_hex(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
