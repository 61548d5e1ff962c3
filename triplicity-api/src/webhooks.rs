use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use triplicity_core::payment::IntentEvent;

use crate::error::AppError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[derive(Debug, Deserialize)]
pub struct StripeWebhook {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: PaymentIntentObject,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    pub status: Option<String>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature header has no timestamp")]
    MissingTimestamp,
    #[error("signature header has no v1 signature")]
    MissingSignature,
    #[error("timestamp outside the tolerance window")]
    Expired,
    #[error("no signature matches the payload")]
    Mismatch,
    #[error("webhook secret cannot key an HMAC")]
    InvalidSecret,
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn compute_signature(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, SignatureError> {
    let mac = signed_payload_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn signed_payload_mac(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Checks a `t=...,v1=...[,v1=...]` header against the raw request body.
pub fn verify_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    tolerance_seconds: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    if (now - timestamp).abs() > tolerance_seconds {
        return Err(SignatureError::Expired);
    }

    let mac = signed_payload_mac(secret, timestamp, payload)?;
    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments/stripe", post(handle_stripe_webhook))
}

/// POST /v1/webhooks/payments/stripe
/// Receive payment status updates from Stripe
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let secret = state.payment.webhook_secret.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("Webhook verification is not configured".to_string())
    })?;

    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::ValidationError("Missing signature header".to_string()))?;

    if let Err(e) = verify_signature(
        header,
        &body,
        secret.expose(),
        state.payment.webhook_tolerance_seconds,
        chrono::Utc::now().timestamp(),
    ) {
        tracing::warn!("Rejected webhook: {}", e);
        return Err(AppError::ValidationError("Invalid signature".to_string()));
    }

    let payload: StripeWebhook = serde_json::from_slice(&body)
        .map_err(|e| AppError::ValidationError(format!("Malformed event: {}", e)))?;

    tracing::info!(
        "Received webhook {}: {} for intent {} ({})",
        payload.id,
        payload.type_,
        payload.data.object.id,
        payload.data.object.status.as_deref().unwrap_or("unknown")
    );
    state
        .metrics
        .webhook_events
        .with_label_values(&[payload.type_.as_str()])
        .inc();

    let Some(event) = IntentEvent::from_event_type(&payload.type_) else {
        tracing::debug!("Ignoring webhook type {}", payload.type_);
        return Ok(StatusCode::OK);
    };

    state
        .bookings
        .apply_provider_event(&payload.data.object.id, event)
        .await?;

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;

    #[test]
    fn test_accepts_valid_signature() {
        let sig = compute_signature(SECRET, 1_700_000_000, BODY).unwrap();
        let header = format!("t=1700000000,v1={}", sig);
        assert_eq!(verify_signature(&header, BODY, SECRET, 300, 1_700_000_100), Ok(()));
    }

    #[test]
    fn test_any_listed_signature_may_match() {
        let sig = compute_signature(SECRET, 1_700_000_000, BODY).unwrap();
        let header = format!("t=1700000000, v1=deadbeef, v0=ignored, v1={}", sig);
        assert_eq!(verify_signature(&header, BODY, SECRET, 300, 1_700_000_000), Ok(()));
    }

    #[test]
    fn test_rejects_tampered_payload_and_wrong_secret() {
        let sig = compute_signature(SECRET, 1_700_000_000, BODY).unwrap();
        let header = format!("t=1700000000,v1={}", sig);

        assert_eq!(
            verify_signature(&header, b"{}", SECRET, 300, 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature(&header, BODY, "whsec_other", 300, 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_rejects_stale_or_incomplete_headers() {
        let sig = compute_signature(SECRET, 1_700_000_000, BODY).unwrap();

        assert_eq!(
            verify_signature(&format!("t=1700000000,v1={}", sig), BODY, SECRET, 300, 1_700_000_301),
            Err(SignatureError::Expired)
        );
        assert_eq!(
            verify_signature(&format!("v1={}", sig), BODY, SECRET, 300, 1_700_000_000),
            Err(SignatureError::MissingTimestamp)
        );
        assert_eq!(
            verify_signature("t=1700000000", BODY, SECRET, 300, 1_700_000_000),
            Err(SignatureError::MissingSignature)
        );
    }
}
