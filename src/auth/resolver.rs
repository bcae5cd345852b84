//! Principal resolution from `Authorization`/`X-Nerve-Cloud-Key` headers
//! (spec §4.1).
//!
//! The literal algorithm: if `Authorization` begins (case-insensitively)
//! with `Bearer `, take the bearer path (bootstrap admin key exact match,
//! constant-time, else a signed service-token JWT); else if
//! `X-Nerve-Cloud-Key` is non-empty, take the opaque cloud-API-key path
//! (hashed lookup); else fail Unauthorized. The JWT decode pipeline — parse
//! bearer, validate, extract claims — follows the same shape as the
//! reference `decode_jwt` pipeline this crate's JWT handling is grounded
//! on, minus JWKS support (Nerve only ever signs its own service tokens, so
//! a single static HMAC secret is the only decoding key it needs).

use chrono::Utc;
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::NerveConfig;
use crate::credentials::api_key::hash_key;
use crate::credentials::service_token::ServiceTokenClaims;
use crate::error::{NerveError, Result};
use crate::storage::Storage;

use super::principal::{Principal, PrincipalKind};

pub async fn resolve_principal(
    authorization_header: Option<&str>,
    cloud_key_header: Option<&str>,
    config: &NerveConfig,
    storage: &Storage,
) -> Result<Principal> {
    if let Some(header) = authorization_header {
        if let Some(token) = parse_bearer(header) {
            if let Some(admin_key) = config.bootstrap_admin_key.as_deref() {
                if constant_time_eq(token, admin_key) {
                    return Ok(Principal {
                        kind: PrincipalKind::Bootstrap,
                        org_id: None,
                        actor: "bootstrap".to_string(),
                        scopes: vec!["*".to_string()],
                    });
                }
            }
            return resolve_service_token(token, config, storage).await;
        }
    }

    if let Some(key) = cloud_key_header.filter(|k| !k.is_empty()) {
        return resolve_api_key(key, storage).await;
    }

    Err(NerveError::Unauthorized)
}

/// Returns the bearer token if `header` begins (case-insensitively) with
/// `Bearer `, per spec §4.1 step 1. `None` if the prefix doesn't match or
/// the remaining token is empty — the caller falls through to the API-key
/// path rather than erroring here.
fn parse_bearer(header: &str) -> Option<&str> {
    let trimmed = header.trim();
    let prefix = trimmed.get(0..7)?;
    if !prefix.eq_ignore_ascii_case("Bearer ") {
        return None;
    }
    let token = trimmed[7..].trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

async fn resolve_api_key(token: &str, storage: &Storage) -> Result<Principal> {
    let key_hash = hash_key(token);
    let row = storage
        .find_active_cloud_api_key_by_hash(&key_hash)
        .await
        .map_err(NerveError::Internal)?
        .ok_or(NerveError::Unauthorized)?;
    Ok(Principal {
        kind: PrincipalKind::ApiKey { key_id: row.id },
        org_id: Some(row.org_id),
        actor: format!("cloud_api_key:{}", row.id),
        scopes: row.scopes,
    })
}

async fn resolve_service_token(token: &str, config: &NerveConfig, storage: &Storage) -> Result<Principal> {
    if config.service_token_signing_key.is_empty() {
        return Err(NerveError::Unauthorized);
    }
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    if let Some(iss) = config.jwt_issuer.as_deref() {
        validation.set_issuer(&[iss]);
    }
    match config.jwt_audience.as_deref() {
        Some(aud) => validation.set_audience(&[aud]),
        None => validation.validate_aud = false,
    }
    let data = decode::<ServiceTokenClaims>(
        token,
        &DecodingKey::from_secret(config.service_token_signing_key.as_bytes()),
        &validation,
    )
    .map_err(|_| NerveError::Unauthorized)?;
    let claims = data.claims;

    let row = storage
        .get_service_token(claims.jti)
        .await
        .map_err(NerveError::Internal)?
        .ok_or(NerveError::Unauthorized)?;
    if row.revoked_at.is_some() || row.expires_at <= Utc::now() || row.org_id != claims.org_id {
        return Err(NerveError::Unauthorized);
    }

    Ok(Principal {
        kind: PrincipalKind::ServiceToken { token_id: row.id },
        org_id: Some(row.org_id),
        actor: row.actor,
        scopes: row.scopes,
    })
}

/// Re-exported so callers that only need HMAC primitives (webhook
/// verification) don't have to depend on the `hmac`/`sha2` crates directly.
pub type HmacSha256 = Hmac<Sha256>;
