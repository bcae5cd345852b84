//! Cloud API key and service token queries (spec §3, §4.4).

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{CloudApiKeyRow, ServiceTokenRow};
use super::Storage;

impl Storage {
    pub async fn insert_cloud_api_key(
        &self,
        org_id: Uuid,
        key_prefix: &str,
        key_hash: &str,
        label: &str,
        scopes: &[String],
    ) -> Result<CloudApiKeyRow> {
        Ok(sqlx::query_as::<_, CloudApiKeyRow>(
            "INSERT INTO cloud_api_keys (id, org_id, key_prefix, key_hash, label, scopes, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(key_prefix)
        .bind(key_hash)
        .bind(label)
        .bind(scopes)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?)
    }

    /// Looks up an active (non-revoked) key by its hash, across all orgs —
    /// the hash alone identifies the org at auth time (spec §4.1).
    pub async fn find_active_cloud_api_key_by_hash(&self, key_hash: &str) -> Result<Option<CloudApiKeyRow>> {
        Ok(sqlx::query_as::<_, CloudApiKeyRow>(
            "SELECT * FROM cloud_api_keys WHERE key_hash = $1 AND revoked_at IS NULL",
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn revoke_cloud_api_key(&self, org_id: Uuid, key_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE cloud_api_keys SET revoked_at = $1
              WHERE id = $2 AND org_id = $3 AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(key_id)
        .bind(org_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_cloud_api_keys(&self, org_id: Uuid) -> Result<Vec<CloudApiKeyRow>> {
        Ok(
            sqlx::query_as::<_, CloudApiKeyRow>("SELECT * FROM cloud_api_keys WHERE org_id = $1 ORDER BY created_at DESC")
                .bind(org_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    pub async fn insert_service_token(
        &self,
        id: Uuid,
        org_id: Uuid,
        actor: &str,
        scopes: &[String],
        expires_at: DateTime<Utc>,
    ) -> Result<ServiceTokenRow> {
        Ok(sqlx::query_as::<_, ServiceTokenRow>(
            "INSERT INTO service_tokens (id, org_id, actor, scopes, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(id)
        .bind(org_id)
        .bind(actor)
        .bind(scopes)
        .bind(expires_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn get_service_token(&self, id: Uuid) -> Result<Option<ServiceTokenRow>> {
        Ok(sqlx::query_as::<_, ServiceTokenRow>("SELECT * FROM service_tokens WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Revokes every still-live token across `org_id`. Used when issuance
    /// requests `rotate` (spec §4.4: "If rotate, revoke all non-expired
    /// service tokens for the org first").
    pub async fn revoke_service_tokens_for_org(&self, org_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE service_tokens SET revoked_at = $1
              WHERE org_id = $2 AND revoked_at IS NULL AND expires_at > $1",
        )
        .bind(Utc::now())
        .bind(org_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Records a hashed before/after pair for a credential-issuance call
    /// (spec §4.4: "record an audit entry hashing inputs and outputs").
    /// Only the hashes are kept — the log is for detecting tampering and
    /// replay, not for reconstructing secret material.
    pub async fn insert_credential_audit_entry(
        &self,
        org_id: Uuid,
        action: &str,
        input_hash: &str,
        output_hash: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO credential_audit_log (id, org_id, action, input_hash, output_hash, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(action)
        .bind(input_hash)
        .bind(output_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
