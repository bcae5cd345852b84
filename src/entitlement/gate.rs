//! The entitlement gate: the single chokepoint deciding whether a tool call
//! may proceed (spec §4.2).
//!
//! `pre_authorize_tool` performs status check → lazy rollover → rate limit
//! → atomic reservation, in that fixed order; `finalize_tool_execution`
//! performs the post-execution half. Callers are responsible for auth and
//! scope (steps 1-2 of the full `auth → scope → status → rollover → rate →
//! reserve → execute → finalize` ordering guarantee) before calling this.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{NerveError, Result};
use crate::storage::models::OrgEntitlementRow;
use crate::storage::Storage;

use super::period::advance_to_contain;
use super::rate_limiter::RateLimiter;

pub const MCP_UNITS_METER: &str = "mcp_units";

/// A granted reservation, to be finalized after the tool call completes.
pub struct Reservation {
    pub org_id: Uuid,
    pub meter_name: &'static str,
    pub period_start: chrono::DateTime<Utc>,
    pub cost: i64,
}

/// Fraction of `monthly_units` at which a one-shot warning fires (spec
/// §4.2: "cross 80% utilization crosses a per-(org, period) one-shot
/// warning").
const UTILIZATION_WARNING_THRESHOLD: f64 = 0.8;

pub async fn pre_authorize_tool(
    storage: &Storage,
    rate_limiter: &RateLimiter,
    org_id: Uuid,
    tool_cost: u32,
) -> Result<Reservation> {
    let entitlement = storage
        .get_org_entitlement(org_id)
        .await
        .map_err(NerveError::Internal)?
        .ok_or(NerveError::SubscriptionInactive)?;

    let now = Utc::now();
    check_status(&entitlement, now)?;

    let entitlement = roll_over_if_stale(storage, entitlement, now).await?;

    rate_limiter
        .check(org_id, entitlement.mcp_rpm.max(0) as u32)
        .await
        .map_err(|retry_after_seconds| NerveError::RateLimited { retry_after_seconds })?;

    let cost = i64::from(tool_cost);
    let granted = storage
        .reserve_usage(org_id, MCP_UNITS_METER, entitlement.usage_period_start, cost, entitlement.monthly_units)
        .await
        .map_err(NerveError::Internal)?;
    if !granted {
        return Err(NerveError::QuotaExceeded);
    }

    if let Some(counter) = storage
        .get_usage_counter(org_id, MCP_UNITS_METER, entitlement.usage_period_start)
        .await
        .map_err(NerveError::Internal)?
    {
        let utilization = counter.used as f64 / entitlement.monthly_units.max(1) as f64;
        if utilization >= UTILIZATION_WARNING_THRESHOLD {
            tracing::warn!(org_id = %org_id, utilization, "org crossed usage warning threshold");
        }
    }

    Ok(Reservation { org_id, meter_name: MCP_UNITS_METER, period_start: entitlement.usage_period_start, cost })
}

fn check_status(entitlement: &OrgEntitlementRow, now: chrono::DateTime<Utc>) -> Result<()> {
    let allowed = match entitlement.subscription_status.as_str() {
        "trialing" | "active" => true,
        "past_due" => entitlement.grace_until.is_some_and(|g| now < g),
        "canceled" => now < entitlement.usage_period_end,
        _ => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(NerveError::SubscriptionInactive)
    }
}

async fn roll_over_if_stale(
    storage: &Storage,
    entitlement: OrgEntitlementRow,
    now: chrono::DateTime<Utc>,
) -> Result<OrgEntitlementRow> {
    if now <= entitlement.usage_period_end {
        return Ok(entitlement);
    }
    let (new_start, new_end) = advance_to_contain(entitlement.usage_period_end, now);
    storage
        .advance_entitlement_period(entitlement.org_id, new_start, new_end)
        .await
        .map_err(NerveError::Internal)?;
    storage
        .ensure_usage_counter(entitlement.org_id, MCP_UNITS_METER, new_start, new_end)
        .await
        .map_err(NerveError::Internal)?;
    storage
        .get_org_entitlement(entitlement.org_id)
        .await
        .map_err(NerveError::Internal)?
        .ok_or(NerveError::SubscriptionInactive)
}

pub async fn finalize_tool_execution(
    storage: &Storage,
    reservation: Reservation,
    tool_name: &str,
    replay_id: Option<&str>,
    audit_id: Option<Uuid>,
    status: &str,
) -> Result<()> {
    if status == "failed" {
        storage
            .release_usage(reservation.org_id, reservation.meter_name, reservation.period_start, reservation.cost)
            .await
            .map_err(NerveError::Internal)?;
    }
    storage
        .record_usage_event(
            reservation.org_id,
            reservation.meter_name,
            reservation.cost,
            tool_name,
            replay_id,
            audit_id,
            status,
        )
        .await
        .map_err(NerveError::Internal)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entitlement(status: &str, period_end: chrono::DateTime<Utc>, grace_until: Option<chrono::DateTime<Utc>>) -> OrgEntitlementRow {
        OrgEntitlementRow {
            org_id: Uuid::new_v4(),
            plan_code: "pro".to_string(),
            subscription_status: status.to_string(),
            mcp_rpm: 60,
            monthly_units: 10_000,
            max_inboxes: 5,
            usage_period_start: period_end - Duration::days(30),
            usage_period_end: period_end,
            grace_until,
        }
    }

    #[test]
    fn active_is_always_allowed() {
        let now = Utc::now();
        let e = entitlement("active", now + Duration::days(10), None);
        assert!(check_status(&e, now).is_ok());
    }

    #[test]
    fn past_due_allowed_only_within_grace() {
        let now = Utc::now();
        let e = entitlement("past_due", now + Duration::days(10), Some(now + Duration::days(1)));
        assert!(check_status(&e, now).is_ok());
        let expired = entitlement("past_due", now + Duration::days(10), Some(now - Duration::seconds(1)));
        assert!(check_status(&expired, now).is_err());
    }

    #[test]
    fn canceled_allowed_only_before_period_end() {
        let now = Utc::now();
        let still_in_period = entitlement("canceled", now + Duration::days(1), None);
        assert!(check_status(&still_in_period, now).is_ok());
        let past_period = entitlement("canceled", now - Duration::seconds(1), None);
        assert!(check_status(&past_period, now).is_err());
    }

    #[test]
    fn unpaid_is_never_allowed() {
        let now = Utc::now();
        let e = entitlement("unpaid", now + Duration::days(10), None);
        assert!(check_status(&e, now).is_err());
    }
}
