//! Cloud API key issuance (spec §3: CloudAPIKey, §4.4).
//!
//! Keys are 32 random bytes, hex-encoded behind a fixed prefix
//! (`nrv_live_<hex>`), and only ever stored as a SHA-256 hash — the raw key
//! is returned exactly once, at mint time, the same one-shot-secret pattern
//! the teacher uses for its update/auth tokens (`license/mod.rs` never
//! persists key material in the clear either).

use anyhow::Result;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::storage::models::CloudApiKeyRow;
use crate::storage::Storage;

pub const KEY_PREFIX: &str = "nrv_live_";

/// Characters of the generated hex body kept in the displayed `key_prefix`,
/// after `KEY_PREFIX` (spec §3: "key_prefix (first ~18 chars)"). Enough to
/// tell keys in the same org apart without showing the full secret.
const DISPLAY_PREFIX_LEN: usize = 12;

/// Allow-list for cloud API key scopes — narrower than service tokens,
/// excludes `nerve:admin.billing` (spec §4.4: "no admin").
pub const ALLOWED_SCOPES: &[&str] = &[
    "nerve:email.read",
    "nerve:email.search",
    "nerve:email.draft",
    "nerve:email.send",
    "nerve:email.inbox.create",
];

pub fn validate_scopes(scopes: &[String]) -> Result<()> {
    for scope in scopes {
        if !ALLOWED_SCOPES.contains(&scope.as_str()) {
            anyhow::bail!("scope {scope} is not on the cloud API key allow-list");
        }
    }
    Ok(())
}

pub struct MintedApiKey {
    /// The raw secret. Shown to the caller once; never stored.
    pub raw_key: String,
    pub row: CloudApiKeyRow,
}

pub fn hash_key(raw_key: &str) -> String {
    hex::encode(Sha256::digest(raw_key.as_bytes()))
}

fn generate_raw_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{KEY_PREFIX}{}", hex::encode(bytes))
}

pub async fn mint(
    storage: &Storage,
    org_id: Uuid,
    label: &str,
    scopes: &[String],
) -> Result<MintedApiKey> {
    validate_scopes(scopes)?;
    let raw_key = generate_raw_key();
    let key_hash = hash_key(&raw_key);
    let key_prefix = display_prefix(&raw_key);
    let row = storage
        .insert_cloud_api_key(org_id, &key_prefix, &key_hash, label, scopes)
        .await?;
    Ok(MintedApiKey { raw_key, row })
}

/// `nrv_live_<first DISPLAY_PREFIX_LEN hex chars>`, unique enough per key to
/// tell several keys in the same org apart in a listing.
fn display_prefix(raw_key: &str) -> String {
    let body = raw_key.strip_prefix(KEY_PREFIX).unwrap_or(raw_key);
    let cut = body.char_indices().nth(DISPLAY_PREFIX_LEN).map(|(i, _)| i).unwrap_or(body.len());
    format!("{KEY_PREFIX}{}", &body[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_carry_the_expected_prefix() {
        let key = generate_raw_key();
        assert!(key.starts_with(KEY_PREFIX));
        assert_eq!(key.len(), KEY_PREFIX.len() + 64);
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_key("abc"), hash_key("abc"));
        assert_ne!(hash_key("abc"), hash_key("abd"));
    }

    #[test]
    fn admin_scope_is_not_allowed_on_cloud_keys() {
        assert!(validate_scopes(&["nerve:email.read".to_string()]).is_ok());
        assert!(validate_scopes(&["nerve:admin.billing".to_string()]).is_err());
    }

    #[test]
    fn display_prefix_is_derived_from_the_raw_key_body() {
        let raw = format!("{KEY_PREFIX}0123456789abcdefextra");
        assert_eq!(display_prefix(&raw), format!("{KEY_PREFIX}0123456789ab"));
    }

    #[test]
    fn distinct_keys_get_distinct_display_prefixes() {
        let a = generate_raw_key();
        let b = generate_raw_key();
        assert_ne!(display_prefix(&a), display_prefix(&b));
    }
}
