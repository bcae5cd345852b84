//! Org and subscription queries (spec §3: Org, Subscription).

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use super::models::{OrgRow, SubscriptionRow};
use super::Storage;

impl Storage {
    pub async fn create_org(&self, name: &str) -> Result<OrgRow> {
        Ok(sqlx::query_as::<_, OrgRow>(
            "INSERT INTO orgs (id, name, created_at) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn get_org(&self, org_id: Uuid) -> Result<Option<OrgRow>> {
        Ok(sqlx::query_as::<_, OrgRow>("SELECT * FROM orgs WHERE id = $1")
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get_subscription(&self, org_id: Uuid) -> Result<Option<SubscriptionRow>> {
        Ok(
            sqlx::query_as::<_, SubscriptionRow>("SELECT * FROM subscriptions WHERE org_id = $1")
                .bind(org_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn find_subscription_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<SubscriptionRow>> {
        Ok(sqlx::query_as::<_, SubscriptionRow>(
            "SELECT * FROM subscriptions WHERE external_subscription_id = $1",
        )
        .bind(external_subscription_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn find_subscription_by_external_customer_id(
        &self,
        external_customer_id: &str,
    ) -> Result<Option<SubscriptionRow>> {
        Ok(sqlx::query_as::<_, SubscriptionRow>(
            "SELECT * FROM subscriptions WHERE external_customer_id = $1",
        )
        .bind(external_customer_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn upsert_subscription(
        &self,
        org_id: Uuid,
        provider: &str,
        external_customer_id: Option<&str>,
        external_subscription_id: Option<&str>,
        status: &str,
        current_period_start: Option<chrono::DateTime<Utc>>,
        current_period_end: Option<chrono::DateTime<Utc>>,
        cancel_at_period_end: bool,
    ) -> Result<SubscriptionRow> {
        Ok(sqlx::query_as::<_, SubscriptionRow>(
            "INSERT INTO subscriptions
                (org_id, provider, external_customer_id, external_subscription_id, status,
                 current_period_start, current_period_end, cancel_at_period_end, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (org_id) DO UPDATE SET
                provider = excluded.provider,
                external_customer_id = excluded.external_customer_id,
                external_subscription_id = excluded.external_subscription_id,
                status = excluded.status,
                current_period_start = excluded.current_period_start,
                current_period_end = excluded.current_period_end,
                cancel_at_period_end = excluded.cancel_at_period_end,
                updated_at = excluded.updated_at
             RETURNING *",
        )
        .bind(org_id)
        .bind(provider)
        .bind(external_customer_id)
        .bind(external_subscription_id)
        .bind(status)
        .bind(current_period_start)
        .bind(current_period_end)
        .bind(cancel_at_period_end)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn set_subscription_status(&self, org_id: Uuid, status: &str) -> Result<()> {
        sqlx::query("UPDATE subscriptions SET status = $1, updated_at = $2 WHERE org_id = $3")
            .bind(status)
            .bind(Utc::now())
            .bind(org_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
