//! `POST /v1/tokens/service` (spec §4.4, §6.1).

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::credentials::service_token;
use crate::error::{NerveError, Result};
use crate::http::authenticate_billing_admin_for_org;
use crate::AppContext;

#[derive(Deserialize)]
pub struct IssueServiceTokenRequest {
    pub org_id: Uuid,
    pub actor: String,
    pub scopes: Vec<String>,
    pub ttl_seconds: i64,
    #[serde(default)]
    pub rotate: bool,
}

pub async fn issue_service_token(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<IssueServiceTokenRequest>,
) -> Result<Json<Value>> {
    authenticate_billing_admin_for_org(&ctx, &headers, body.org_id).await?;
    let issued = service_token::issue(
        &ctx.storage,
        &ctx.config.service_token_signing_key,
        body.org_id,
        &body.actor,
        &body.scopes,
        body.ttl_seconds,
        body.rotate,
    )
    .await
    .map_err(NerveError::Internal)?;

    Ok(Json(json!({
        "token": issued.jwt,
        "token_id": issued.token_id,
        "expires_at": issued.expires_at,
        "scopes": body.scopes,
    })))
}
