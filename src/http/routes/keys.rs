//! `POST/GET /v1/keys`, `DELETE /v1/keys/{id}` (spec §4.4, §6.1).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::credentials::api_key;
use crate::error::{NerveError, Result};
use crate::http::authenticate_billing_admin_for_org;
use crate::AppContext;

#[derive(Deserialize)]
pub struct CreateKeyRequest {
    pub org_id: Uuid,
    pub label: String,
    pub scopes: Vec<String>,
}

pub async fn create_key(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<CreateKeyRequest>,
) -> Result<Json<Value>> {
    authenticate_billing_admin_for_org(&ctx, &headers, body.org_id).await?;
    let minted = api_key::mint(&ctx.storage, body.org_id, &body.label, &body.scopes)
        .await
        .map_err(NerveError::Internal)?;
    Ok(Json(json!({
        "key_id": minted.row.id,
        "key": minted.raw_key,
        "label": minted.row.label,
        "scopes": minted.row.scopes,
    })))
}

#[derive(Deserialize)]
pub struct ListKeysQuery {
    pub org_id: Uuid,
}

pub async fn list_keys(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    axum::extract::Query(query): axum::extract::Query<ListKeysQuery>,
) -> Result<Json<Value>> {
    authenticate_billing_admin_for_org(&ctx, &headers, query.org_id).await?;
    let keys = ctx.storage.list_cloud_api_keys(query.org_id).await.map_err(NerveError::Internal)?;
    let list: Vec<Value> = keys
        .iter()
        .map(|k| {
            json!({
                "key_id": k.id,
                "key_prefix": k.key_prefix,
                "label": k.label,
                "scopes": k.scopes,
                "revoked_at": k.revoked_at,
                "created_at": k.created_at,
            })
        })
        .collect();
    Ok(Json(json!({ "keys": list })))
}

#[derive(Deserialize)]
pub struct RevokeKeyQuery {
    pub org_id: Uuid,
}

pub async fn revoke_key(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(key_id): Path<Uuid>,
    axum::extract::Query(query): axum::extract::Query<RevokeKeyQuery>,
) -> Result<Json<Value>> {
    authenticate_billing_admin_for_org(&ctx, &headers, query.org_id).await?;
    let revoked = ctx
        .storage
        .revoke_cloud_api_key(query.org_id, key_id)
        .await
        .map_err(NerveError::Internal)?;
    if !revoked {
        return Err(NerveError::OwnershipMismatch(format!("cloud_api_key:{key_id}")));
    }
    Ok(Json(json!({ "revoked": true })))
}
