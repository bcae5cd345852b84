//! `POST /v1/subscriptions/checkout`, `GET /v1/subscriptions/current` (spec §6.1).

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{NerveError, Result};
use crate::http::{authenticate, authenticate_billing_admin_for_org};
use crate::AppContext;

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub org_id: Uuid,
    /// Not in the minimal spec body, but a real checkout needs a plan;
    /// defaults to the entry-level plan when omitted.
    #[serde(default = "default_plan_code")]
    pub plan_code: String,
}

fn default_plan_code() -> String {
    "starter".to_string()
}

pub async fn checkout(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<Value>> {
    authenticate_billing_admin_for_org(&ctx, &headers, body.org_id).await?;
    let session = ctx
        .billing_provider
        .create_checkout_session(body.org_id, &body.plan_code)
        .await
        .map_err(NerveError::Internal)?;
    Ok(Json(json!({
        "checkout_url": session.checkout_url,
        "client_reference_id": session.client_reference_id,
    })))
}

pub async fn current(State(ctx): State<Arc<AppContext>>, headers: HeaderMap) -> Result<Json<Value>> {
    let principal = authenticate(&ctx, &headers).await?;
    let org_id = principal.require_org()?;
    let subscription = ctx
        .storage
        .get_subscription(org_id)
        .await
        .map_err(NerveError::Internal)?
        .ok_or(NerveError::SubscriptionInactive)?;
    Ok(Json(json!({
        "org_id": org_id,
        "provider": subscription.provider,
        "status": subscription.status,
        "current_period_start": subscription.current_period_start,
        "current_period_end": subscription.current_period_end,
        "cancel_at_period_end": subscription.cancel_at_period_end,
    })))
}
