//! Entitlement and usage-counter queries (spec §3, §4.2).
//!
//! `reserve_usage` is the storage-layer half of the gate's atomic quota
//! reservation: a single predicate `UPDATE` that only succeeds if the
//! reservation fits under the monthly cap, the same
//! check-and-mutate-in-one-statement shape as the teacher's
//! `claim_session_for_run` (`storage/mod.rs`), generalized from a boolean
//! status flip to a bounded counter increment.

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{OrgEntitlementRow, PlanEntitlementRow, UsageCounterRow};
use super::Storage;

impl Storage {
    pub async fn get_plan_entitlement(&self, plan_code: &str) -> Result<Option<PlanEntitlementRow>> {
        Ok(sqlx::query_as::<_, PlanEntitlementRow>(
            "SELECT * FROM plan_entitlements WHERE plan_code = $1",
        )
        .bind(plan_code)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn upsert_plan_entitlement(&self, plan: &PlanEntitlementRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO plan_entitlements (plan_code, mcp_rpm, monthly_units, max_inboxes, features)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (plan_code) DO UPDATE SET
                mcp_rpm = excluded.mcp_rpm,
                monthly_units = excluded.monthly_units,
                max_inboxes = excluded.max_inboxes,
                features = excluded.features",
        )
        .bind(&plan.plan_code)
        .bind(plan.mcp_rpm)
        .bind(plan.monthly_units)
        .bind(plan.max_inboxes)
        .bind(&plan.features)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_org_entitlement(&self, org_id: Uuid) -> Result<Option<OrgEntitlementRow>> {
        Ok(sqlx::query_as::<_, OrgEntitlementRow>(
            "SELECT * FROM org_entitlements WHERE org_id = $1",
        )
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_org_entitlement(
        &self,
        org_id: Uuid,
        plan_code: &str,
        subscription_status: &str,
        mcp_rpm: i32,
        monthly_units: i64,
        max_inboxes: i32,
        usage_period_start: DateTime<Utc>,
        usage_period_end: DateTime<Utc>,
        grace_until: Option<DateTime<Utc>>,
    ) -> Result<OrgEntitlementRow> {
        Ok(sqlx::query_as::<_, OrgEntitlementRow>(
            "INSERT INTO org_entitlements
                (org_id, plan_code, subscription_status, mcp_rpm, monthly_units, max_inboxes,
                 usage_period_start, usage_period_end, grace_until)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (org_id) DO UPDATE SET
                plan_code = excluded.plan_code,
                subscription_status = excluded.subscription_status,
                mcp_rpm = excluded.mcp_rpm,
                monthly_units = excluded.monthly_units,
                max_inboxes = excluded.max_inboxes,
                usage_period_start = excluded.usage_period_start,
                usage_period_end = excluded.usage_period_end,
                grace_until = excluded.grace_until
             RETURNING *",
        )
        .bind(org_id)
        .bind(plan_code)
        .bind(subscription_status)
        .bind(mcp_rpm)
        .bind(monthly_units)
        .bind(max_inboxes)
        .bind(usage_period_start)
        .bind(usage_period_end)
        .bind(grace_until)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn set_subscription_status_on_entitlement(
        &self,
        org_id: Uuid,
        subscription_status: &str,
        grace_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE org_entitlements SET subscription_status = $1, grace_until = $2 WHERE org_id = $3",
        )
        .bind(subscription_status)
        .bind(grace_until)
        .bind(org_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Rolls the usage period forward for `org_id`, creating a fresh
    /// zero-used counter row for `[period_start, period_end)` if one doesn't
    /// already exist (spec §4.2: lazy rollover, calendar-month aligned).
    pub async fn ensure_usage_counter(
        &self,
        org_id: Uuid,
        meter_name: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<UsageCounterRow> {
        sqlx::query(
            "INSERT INTO org_usage_counters (org_id, meter_name, period_start, period_end, used, updated_at)
             VALUES ($1, $2, $3, $4, 0, $5)
             ON CONFLICT (org_id, meter_name, period_start) DO NOTHING",
        )
        .bind(org_id)
        .bind(meter_name)
        .bind(period_start)
        .bind(period_end)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(sqlx::query_as::<_, UsageCounterRow>(
            "SELECT * FROM org_usage_counters WHERE org_id = $1 AND meter_name = $2 AND period_start = $3",
        )
        .bind(org_id)
        .bind(meter_name)
        .bind(period_start)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn advance_entitlement_period(
        &self,
        org_id: Uuid,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE org_entitlements SET usage_period_start = $1, usage_period_end = $2 WHERE org_id = $3",
        )
        .bind(period_start)
        .bind(period_end)
        .bind(org_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Atomically reserves `cost` units against the monthly cap. The
    /// predicate is evaluated and the row mutated in the same statement, so
    /// concurrent reservations against the same counter cannot both observe
    /// headroom that only exists once (spec §4.2, §8: "N concurrent calls
    /// each costing C units never let used exceed cap").
    ///
    /// Returns `true` if the reservation was granted.
    pub async fn reserve_usage(
        &self,
        org_id: Uuid,
        meter_name: &str,
        period_start: DateTime<Utc>,
        cost: i64,
        monthly_units: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE org_usage_counters
                SET used = used + $1, updated_at = $2
              WHERE org_id = $3 AND meter_name = $4 AND period_start = $5
                AND used + $1 <= $6",
        )
        .bind(cost)
        .bind(Utc::now())
        .bind(org_id)
        .bind(meter_name)
        .bind(period_start)
        .bind(monthly_units)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Releases a reservation previously granted by `reserve_usage`, used
    /// when the gated operation fails after reservation (spec §4.2: reserve
    /// happens before execute, so a failed execute must refund).
    pub async fn release_usage(
        &self,
        org_id: Uuid,
        meter_name: &str,
        period_start: DateTime<Utc>,
        cost: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE org_usage_counters
                SET used = GREATEST(used - $1, 0), updated_at = $2
              WHERE org_id = $3 AND meter_name = $4 AND period_start = $5",
        )
        .bind(cost)
        .bind(Utc::now())
        .bind(org_id)
        .bind(meter_name)
        .bind(period_start)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_usage_counter(
        &self,
        org_id: Uuid,
        meter_name: &str,
        period_start: DateTime<Utc>,
    ) -> Result<Option<UsageCounterRow>> {
        Ok(sqlx::query_as::<_, UsageCounterRow>(
            "SELECT * FROM org_usage_counters WHERE org_id = $1 AND meter_name = $2 AND period_start = $3",
        )
        .bind(org_id)
        .bind(meter_name)
        .bind(period_start)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Sum of `usage_events` for reconciliation against the counter (spec
    /// §4.6).
    pub async fn sum_usage_events(
        &self,
        org_id: Uuid,
        meter_name: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<i64> {
        let row: (Option<i64>,) = sqlx::query_as(
            "SELECT SUM(quantity) FROM usage_events
              WHERE org_id = $1 AND meter_name = $2 AND status = 'success'
                AND created_at >= $3 AND created_at < $4",
        )
        .bind(org_id)
        .bind(meter_name)
        .bind(period_start)
        .bind(period_end)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0.unwrap_or(0))
    }

    /// Overwrites the counter to an authoritative value computed elsewhere
    /// (spec §4.6 reconciliation — not a relative adjustment like
    /// `reserve_usage`/`release_usage`).
    pub async fn reconcile_usage_counter_value(
        &self,
        org_id: Uuid,
        meter_name: &str,
        period_start: DateTime<Utc>,
        value: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE org_usage_counters SET used = $1, updated_at = $2
              WHERE org_id = $3 AND meter_name = $4 AND period_start = $5",
        )
        .bind(value)
        .bind(Utc::now())
        .bind(org_id)
        .bind(meter_name)
        .bind(period_start)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn all_org_entitlements(&self) -> Result<Vec<OrgEntitlementRow>> {
        Ok(
            sqlx::query_as::<_, OrgEntitlementRow>("SELECT * FROM org_entitlements")
                .fetch_all(&self.pool)
                .await?,
        )
    }
}
