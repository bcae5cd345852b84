//! Domain error taxonomy for the enforcement plane (spec §7).
//!
//! Every boundary — HTTP, JSON-RPC — converts a [`NerveError`] into a
//! response without leaking internal detail. Storage/IO failures are wrapped
//! with `anyhow::Context` at the call site and collapse into
//! [`NerveError::Internal`] here, the same separation the teacher keeps
//! between `tracing::warn!(err = %e, ...)` logging and the generic JSON it
//! actually returns.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum NerveError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: missing scope {required}")]
    Forbidden { required: String },

    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("subscription inactive")]
    SubscriptionInactive,

    #[error("rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("ownership mismatch: {0} does not belong to org")]
    OwnershipMismatch(String),

    #[error("invalid webhook signature")]
    WebhookSignatureInvalid,

    #[error("webhook event failed: {0}")]
    WebhookEventFailed(String),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

/// JSON-RPC error codes from spec §6.2/§7. Used by the MCP dispatcher
/// contract and by control-plane handlers that speak JSON-RPC semantics.
impl NerveError {
    pub fn json_rpc_code(&self) -> i32 {
        match self {
            NerveError::Unauthorized => -32001,
            NerveError::Forbidden { .. } => -32003,
            NerveError::QuotaExceeded => -32040,
            NerveError::SubscriptionInactive => -32041,
            NerveError::RateLimited { .. } => -32042,
            NerveError::OwnershipMismatch(_) => -32000,
            NerveError::WebhookSignatureInvalid => -32600,
            NerveError::WebhookEventFailed(_) => -32000,
            NerveError::Internal(_) => -32000,
        }
    }

    pub fn retryable(&self) -> bool {
        matches!(self, NerveError::RateLimited { .. } | NerveError::WebhookEventFailed(_))
    }

    /// Structured `data` payload for the JSON-RPC error object (spec §6.2).
    pub fn json_rpc_data(&self) -> serde_json::Value {
        match self {
            NerveError::RateLimited { retry_after_seconds } => json!({
                "retryable": true,
                "retry_after_seconds": retry_after_seconds,
            }),
            NerveError::QuotaExceeded | NerveError::SubscriptionInactive => json!({
                "retryable": false,
            }),
            _ => json!({ "retryable": self.retryable() }),
        }
    }

    /// The short machine-readable error string used as the JSON-RPC message
    /// (e.g. `"quota_exceeded"`), matching the literal values in spec §6.2.
    pub fn code_name(&self) -> &'static str {
        match self {
            NerveError::Unauthorized => "unauthorized",
            NerveError::Forbidden { .. } => "forbidden",
            NerveError::QuotaExceeded => "quota_exceeded",
            NerveError::SubscriptionInactive => "subscription_inactive",
            NerveError::RateLimited { .. } => "rate_limited",
            NerveError::OwnershipMismatch(_) => "ownership_mismatch",
            NerveError::WebhookSignatureInvalid => "webhook_signature_invalid",
            NerveError::WebhookEventFailed(_) => "webhook_event_failed",
            NerveError::Internal(_) => "internal",
        }
    }

    fn http_status(&self) -> StatusCode {
        match self {
            NerveError::Unauthorized => StatusCode::UNAUTHORIZED,
            NerveError::Forbidden { .. } => StatusCode::FORBIDDEN,
            NerveError::QuotaExceeded
            | NerveError::SubscriptionInactive
            | NerveError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            NerveError::OwnershipMismatch(_) => StatusCode::NOT_FOUND,
            NerveError::WebhookSignatureInvalid => StatusCode::BAD_REQUEST,
            NerveError::WebhookEventFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            NerveError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NerveError {
    fn into_response(self) -> Response {
        if let NerveError::Internal(ref e) = self {
            tracing::error!(err = %e, "internal error");
        } else {
            tracing::warn!(error = self.code_name(), "request rejected");
        }
        let status = self.http_status();
        let body = Json(json!({ "error": generic_message(&self) }));
        (status, body).into_response()
    }
}

/// Generic, non-leaking message for the HTTP boundary (spec §4.5, §7).
fn generic_message(e: &NerveError) -> &'static str {
    match e {
        NerveError::Unauthorized => "unauthorized",
        NerveError::Forbidden { .. } => "forbidden",
        NerveError::QuotaExceeded => "quota exceeded",
        NerveError::SubscriptionInactive => "subscription inactive",
        NerveError::RateLimited { .. } => "rate limited",
        NerveError::OwnershipMismatch(_) => "not found",
        NerveError::WebhookSignatureInvalid => "invalid signature",
        NerveError::WebhookEventFailed(_) => "could not process event",
        NerveError::Internal(_) => "internal error",
    }
}

pub type Result<T> = std::result::Result<T, NerveError>;
