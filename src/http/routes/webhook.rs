//! `POST /v1/billing/webhook/stripe` (spec §4.3, §6.1).
//!
//! Verification happens here, against the raw body, before any JSON
//! deserialization touches it — `serde_json` reformatting the body would
//! invalidate the HMAC the provider computed over the exact bytes sent.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};

use crate::billing::provider::WebhookEnvelope;
use crate::billing::state_machine::{process_event, Outcome};
use crate::billing::webhook::verify;
use crate::AppContext;

const SIGNATURE_HEADER: &str = "stripe-signature";

pub async fn stripe_webhook(State(ctx): State<Arc<AppContext>>, headers: HeaderMap, body: axum::body::Bytes) -> Response {
    let Some(secret) = Some(&ctx.config.billing_webhook_secret).filter(|s| !s.is_empty()) else {
        tracing::warn!("rejecting webhook: billing webhook secret is not configured");
        return (StatusCode::BAD_REQUEST, "invalid signature").into_response();
    };

    let Some(signature_header) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, "missing signature").into_response();
    };

    let body_str = match std::str::from_utf8(&body) {
        Ok(s) => s,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid body encoding").into_response(),
    };

    if verify(signature_header, body_str, secret).is_err() {
        return (StatusCode::BAD_REQUEST, "invalid signature").into_response();
    }

    let envelope: WebhookEnvelope = match serde_json::from_str(body_str) {
        Ok(e) => e,
        Err(_) => return (StatusCode::BAD_REQUEST, "malformed event").into_response(),
    };

    let payload_hash = hex::encode(Sha256::digest(body_str.as_bytes()));

    match process_event(&ctx.storage, &ctx.config, "stripe", &payload_hash, &envelope).await {
        Ok(Outcome::Processed | Outcome::AlreadyProcessed) => StatusCode::OK.into_response(),
        Err(e) => {
            tracing::error!(err = %e, event_id = %envelope.id, "failed to apply webhook event");
            (StatusCode::UNPROCESSABLE_ENTITY, "could not process event").into_response()
        }
    }
}
