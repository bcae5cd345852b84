//! Billing webhook dedupe log (spec §3: WebhookEvent, §4.3).

use anyhow::Result;
use chrono::Utc;

use super::models::WebhookEventRow;
use super::Storage;

impl Storage {
    /// Inserts the `(provider, external_event_id)` pair if it hasn't been
    /// seen before. Returns `false` when the row already existed — the
    /// caller should treat that delivery as a no-op replay (spec §4.3,
    /// §8: "the same event id processed twice changes state once").
    pub async fn claim_webhook_event(
        &self,
        provider: &str,
        external_event_id: &str,
        event_type: &str,
        payload_hash: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO webhook_events (provider, external_event_id, event_type, payload_hash, status, created_at)
             VALUES ($1, $2, $3, $4, 'received', $5)
             ON CONFLICT (provider, external_event_id) DO NOTHING",
        )
        .bind(provider)
        .bind(external_event_id)
        .bind(event_type)
        .bind(payload_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_webhook_processed(&self, provider: &str, external_event_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE webhook_events SET status = 'processed', processed_at = $1
              WHERE provider = $2 AND external_event_id = $3",
        )
        .bind(Utc::now())
        .bind(provider)
        .bind(external_event_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_webhook_failed(
        &self,
        provider: &str,
        external_event_id: &str,
        error_message: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE webhook_events SET status = 'failed', error_message = $1
              WHERE provider = $2 AND external_event_id = $3",
        )
        .bind(error_message)
        .bind(provider)
        .bind(external_event_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_webhook_event(
        &self,
        provider: &str,
        external_event_id: &str,
    ) -> Result<Option<WebhookEventRow>> {
        Ok(sqlx::query_as::<_, WebhookEventRow>(
            "SELECT * FROM webhook_events WHERE provider = $1 AND external_event_id = $2",
        )
        .bind(provider)
        .bind(external_event_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}
