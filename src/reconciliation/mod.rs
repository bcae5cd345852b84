//! Reconciliation worker (spec §4.6).
//!
//! Two idempotent passes, run on independent schedules by `src/main.rs`:
//! `reconcile_usage_counters` (hourly — fixes drift between the event log
//! and the fast counter) and `reconcile_stale_periods` (daily — backstop
//! rollover for orgs with no traffic in the new period).

use crate::entitlement::period::advance_to_contain;
use crate::entitlement::{Clock, MCP_UNITS_METER};
use crate::storage::Storage;

/// Recomputes `org_usage_counters.used` from `usage_events` for every org,
/// fixing any drift (spec §4.6: "if they diverge, update the counter to the
/// summed value").
pub async fn reconcile_usage_counters(storage: &Storage) -> anyhow::Result<u64> {
    let mut corrected = 0;
    for entitlement in storage.all_org_entitlements().await? {
        let summed = storage
            .sum_usage_events(
                entitlement.org_id,
                MCP_UNITS_METER,
                entitlement.usage_period_start,
                entitlement.usage_period_end,
            )
            .await?;
        let counter = storage
            .ensure_usage_counter(
                entitlement.org_id,
                MCP_UNITS_METER,
                entitlement.usage_period_start,
                entitlement.usage_period_end,
            )
            .await?;
        if counter.used != summed {
            storage
                .reconcile_usage_counter_value(
                    entitlement.org_id,
                    MCP_UNITS_METER,
                    entitlement.usage_period_start,
                    summed,
                )
                .await?;
            corrected += 1;
        }
    }
    Ok(corrected)
}

/// Advances every org whose usage period has already ended, even if no
/// traffic triggered the gate's lazy rollover (spec §4.6: backstop
/// rollover for idle orgs).
pub async fn reconcile_stale_periods(storage: &Storage, clock: &dyn Clock) -> anyhow::Result<u64> {
    let now = clock.now();
    let mut advanced = 0;
    for entitlement in storage.all_org_entitlements().await? {
        if entitlement.usage_period_end < now {
            let (start, end) = advance_to_contain(entitlement.usage_period_end, now);
            storage.advance_entitlement_period(entitlement.org_id, start, end).await?;
            storage.ensure_usage_counter(entitlement.org_id, MCP_UNITS_METER, start, end).await?;
            advanced += 1;
        }
    }
    Ok(advanced)
}
