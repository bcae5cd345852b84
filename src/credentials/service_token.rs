//! Service token issuance (spec §3: ServiceToken, §4.4).
//!
//! Tokens are signed HS256 JWTs with a bounded TTL. A `rotate` request
//! revokes every other still-live token for the org first — the storage
//! update runs before the new row is inserted so a crash between the two
//! leaves no live token rather than two.

use anyhow::{bail, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::storage::Storage;

fn hash_json(value: &serde_json::Value) -> String {
    hex::encode(Sha256::digest(value.to_string().as_bytes()))
}

/// Hard ceiling on requested TTL (spec §4.4: "bounded TTL ≤ 1h").
pub const MAX_TTL_SECS: i64 = 3600;

/// Allow-list for service-token scopes (spec §4.4).
pub const ALLOWED_SCOPES: &[&str] = &[
    "nerve:email.read",
    "nerve:email.search",
    "nerve:email.draft",
    "nerve:email.send",
    "nerve:email.inbox.create",
    "nerve:admin.billing",
];

pub fn validate_scopes(scopes: &[String]) -> Result<()> {
    for scope in scopes {
        if !ALLOWED_SCOPES.contains(&scope.as_str()) {
            bail!("scope {scope} is not on the service-token allow-list");
        }
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceTokenClaims {
    pub sub: String,
    pub org_id: Uuid,
    pub jti: Uuid,
    pub scopes: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

pub struct IssuedServiceToken {
    pub jwt: String,
    pub token_id: Uuid,
    pub expires_at: chrono::DateTime<Utc>,
}

#[allow(clippy::too_many_arguments)]
pub async fn issue(
    storage: &Storage,
    signing_key: &str,
    org_id: Uuid,
    actor: &str,
    scopes: &[String],
    requested_ttl_secs: i64,
    rotate: bool,
) -> Result<IssuedServiceToken> {
    if signing_key.is_empty() {
        bail!("service token signing key is not configured");
    }
    validate_scopes(scopes)?;
    let ttl_secs = requested_ttl_secs.clamp(1, MAX_TTL_SECS);
    let now = Utc::now();
    let expires_at = now + Duration::seconds(ttl_secs);
    let token_id = Uuid::new_v4();

    let input_hash = hash_json(&serde_json::json!({
        "org_id": org_id,
        "actor": actor,
        "scopes": scopes,
        "requested_ttl_secs": requested_ttl_secs,
        "rotate": rotate,
    }));

    // Revoke happens before the new row is inserted, so a crash between the
    // two leaves no live token for the org rather than two.
    if rotate {
        storage.revoke_service_tokens_for_org(org_id).await?;
    }
    storage
        .insert_service_token(token_id, org_id, actor, scopes, expires_at)
        .await?;

    let claims = ServiceTokenClaims {
        sub: actor.to_string(),
        org_id,
        jti: token_id,
        scopes: scopes.to_vec(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };
    let jwt = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(signing_key.as_bytes()),
    )?;

    let output_hash = hash_json(&serde_json::json!({
        "token_id": token_id,
        "expires_at": expires_at,
        "scopes": scopes,
    }));
    storage
        .insert_credential_audit_entry(org_id, "issue_service_token", &input_hash, &output_hash)
        .await?;

    Ok(IssuedServiceToken { jwt, token_id, expires_at })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_clamped_to_the_one_hour_ceiling() {
        assert_eq!(10_000i64.clamp(1, MAX_TTL_SECS), MAX_TTL_SECS);
        assert_eq!(0i64.clamp(1, MAX_TTL_SECS), 1);
    }

    #[test]
    fn rejects_scopes_off_the_allow_list() {
        assert!(validate_scopes(&["nerve:email.read".to_string()]).is_ok());
        assert!(validate_scopes(&["nerve:admin.root".to_string()]).is_err());
    }
}
