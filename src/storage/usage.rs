//! Usage event log (spec §3: UsageEvent, §4.2 finalize step).

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use super::models::UsageEventRow;
use super::Storage;

impl Storage {
    /// Records a finalized tool call. `replay_id`, when present, is unique
    /// so a duplicate delivery of the same call records once (spec §4.2,
    /// §8: idempotent replay). Returns `None` if `replay_id` already exists
    /// — callers should treat that as "already recorded", not an error.
    #[allow(clippy::too_many_arguments)]
    pub async fn record_usage_event(
        &self,
        org_id: Uuid,
        meter_name: &str,
        quantity: i64,
        tool_name: &str,
        replay_id: Option<&str>,
        audit_id: Option<Uuid>,
        status: &str,
    ) -> Result<Option<UsageEventRow>> {
        Ok(sqlx::query_as::<_, UsageEventRow>(
            "INSERT INTO usage_events (id, org_id, meter_name, quantity, tool_name, replay_id, audit_id, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (replay_id) WHERE replay_id IS NOT NULL DO NOTHING
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(meter_name)
        .bind(quantity)
        .bind(tool_name)
        .bind(replay_id)
        .bind(audit_id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn find_usage_event_by_replay_id(&self, replay_id: &str) -> Result<Option<UsageEventRow>> {
        Ok(
            sqlx::query_as::<_, UsageEventRow>("SELECT * FROM usage_events WHERE replay_id = $1")
                .bind(replay_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn list_usage_events(&self, org_id: Uuid, limit: i64) -> Result<Vec<UsageEventRow>> {
        Ok(sqlx::query_as::<_, UsageEventRow>(
            "SELECT * FROM usage_events WHERE org_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(org_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }
}
