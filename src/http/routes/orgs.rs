//! `POST /v1/orgs` (spec §6.1).

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::Result;
use crate::http::authenticate_billing_admin;
use crate::AppContext;

#[derive(Deserialize)]
pub struct CreateOrgRequest {
    pub name: String,
}

pub async fn create_org(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<CreateOrgRequest>,
) -> Result<Json<Value>> {
    authenticate_billing_admin(&ctx, &headers).await?;
    let org = ctx.storage.create_org(&body.name).await.map_err(crate::error::NerveError::Internal)?;
    Ok(Json(json!({ "org_id": org.id })))
}
