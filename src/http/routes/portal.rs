//! `POST /v1/billing/portal` (spec §6.1).

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{NerveError, Result};
use crate::http::authenticate_billing_admin_for_org;
use crate::AppContext;

#[derive(Deserialize)]
pub struct PortalRequest {
    pub org_id: Uuid,
}

pub async fn create_portal_session(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<PortalRequest>,
) -> Result<Json<Value>> {
    authenticate_billing_admin_for_org(&ctx, &headers, body.org_id).await?;
    let subscription = ctx
        .storage
        .get_subscription(body.org_id)
        .await
        .map_err(NerveError::Internal)?
        .ok_or(NerveError::SubscriptionInactive)?;
    let customer_id = subscription.external_customer_id.ok_or(NerveError::SubscriptionInactive)?;
    let session = ctx
        .billing_provider
        .create_portal_session(&customer_id)
        .await
        .map_err(NerveError::Internal)?;
    Ok(Json(json!({ "portal_url": session.portal_url })))
}
