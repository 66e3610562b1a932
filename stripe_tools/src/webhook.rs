//! Verification of signed webhook notifications.
//!
//! The processor signs every notification with the endpoint's shared secret and sends the signature in a header of the
//! form `t=<unix timestamp>,v1=<hex signature>[,v1=<hex signature>...]`. The signature is the HMAC-SHA256 of
//! `"<timestamp>.<raw body>"`. More than one `v1` entry may be present while secrets are being rolled; any one of them
//! matching is sufficient.
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

use crate::{WebhookEvent, WebhookSignatureError};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Default)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<SignatureHeader, WebhookSignatureError> {
    if header.trim().is_empty() {
        return Err(WebhookSignatureError::MissingHeader);
    }
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for pair in header.split(',') {
        let Some((key, value)) = pair.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                let t = value
                    .parse::<i64>()
                    .map_err(|e| WebhookSignatureError::InvalidTimestamp(format!("{value}. {e}")))?;
                timestamp = Some(t);
            },
            // Malformed hex can never match
            "v1" => match hex::decode(value) {
                Ok(sig) => signatures.push(sig),
                Err(e) => debug!("🔐️ Ignoring malformed v1 signature: {e}"),
            },
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or(WebhookSignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(WebhookSignatureError::MissingSignature);
    }
    Ok(SignatureHeader { timestamp, signatures })
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, WebhookSignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookSignatureError::InvalidSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Checks the signature header against the raw request body. `now` is the current unix time; notifications signed
/// more than `tolerance` seconds away from it are rejected to limit replays. A tolerance of zero or less disables the
/// check.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: i64,
    now: i64,
) -> Result<(), WebhookSignatureError> {
    let header = parse_header(header)?;
    if tolerance > 0 && (now - header.timestamp).abs() > tolerance {
        return Err(WebhookSignatureError::TimestampOutsideTolerance { timestamp: header.timestamp, now, tolerance });
    }
    for sig in &header.signatures {
        let mac = mac_for(secret, header.timestamp, payload)?;
        // verify_slice does a constant-time comparison
        if mac.verify_slice(sig).is_ok() {
            trace!("🔐️ Webhook signature verified ✅️");
            return Ok(());
        }
    }
    warn!("🔐️ Webhook signature did not match any of the {} signatures provided", header.signatures.len());
    Err(WebhookSignatureError::SignatureMismatch)
}

/// Verifies the signature and deserializes the event in one step.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: i64,
    now: i64,
) -> Result<WebhookEvent, WebhookSignatureError> {
    verify_signature(payload, header, secret, tolerance, now)?;
    serde_json::from_slice(payload).map_err(|e| WebhookSignatureError::InvalidPayload(e.to_string()))
}

/// Produces a header value in the same format the processor uses. Handy for tests and for replaying events locally.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, WebhookSignatureError> {
    let mac = mac_for(secret, timestamp, payload)?;
    let sig = hex::encode(mac.finalize().into_bytes());
    Ok(format!("t={timestamp},v1={sig}"))
}
