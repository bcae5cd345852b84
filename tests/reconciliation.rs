//! Reconciliation worker integration tests (spec §4.6).

mod support;

use chrono::Duration;
use nerve::entitlement::clock::FixedClock;
use nerve::entitlement::MCP_UNITS_METER;
use nerve::reconciliation::{reconcile_stale_periods, reconcile_usage_counters};
use sqlx::PgPool;

#[sqlx::test(migrations = "src/storage/migrations")]
async fn usage_counters_are_recomputed_from_the_event_log(pool: PgPool) -> anyhow::Result<()> {
    let storage = support::storage_from(pool);
    support::seed_plan(&storage, "starter", 60, 1_000, 5).await;
    let (org_id, entitlement) = support::seed_active_org(&storage, "starter").await;

    storage
        .record_usage_event(org_id, MCP_UNITS_METER, 10, "send_email", None, None, "success")
        .await?;
    storage
        .reconcile_usage_counter_value(org_id, MCP_UNITS_METER, entitlement.usage_period_start, 999)
        .await?;

    let corrected = reconcile_usage_counters(&storage).await?;
    assert_eq!(corrected, 1);

    let counter = storage
        .get_usage_counter(org_id, MCP_UNITS_METER, entitlement.usage_period_start)
        .await?
        .expect("counter exists");
    assert_eq!(counter.used, 10);
    Ok(())
}

#[sqlx::test(migrations = "src/storage/migrations")]
async fn a_fresh_period_is_left_untouched_by_the_stale_period_backstop(pool: PgPool) -> anyhow::Result<()> {
    let storage = support::storage_from(pool);
    support::seed_plan(&storage, "starter", 60, 1_000, 5).await;
    let (org_id, entitlement) = support::seed_active_org(&storage, "starter").await;

    let clock = FixedClock(entitlement.usage_period_start);
    let advanced = reconcile_stale_periods(&storage, &clock).await?;
    assert_eq!(advanced, 0);

    let reloaded = storage.get_org_entitlement(org_id).await?.expect("entitlement exists");
    assert_eq!(reloaded.usage_period_start, entitlement.usage_period_start);
    Ok(())
}

#[sqlx::test(migrations = "src/storage/migrations")]
async fn an_idle_org_past_its_period_end_is_advanced(pool: PgPool) -> anyhow::Result<()> {
    let storage = support::storage_from(pool);
    support::seed_plan(&storage, "starter", 60, 1_000, 5).await;
    let (org_id, entitlement) = support::seed_active_org(&storage, "starter").await;

    let clock = FixedClock(entitlement.usage_period_end + Duration::days(5));
    let advanced = reconcile_stale_periods(&storage, &clock).await?;
    assert_eq!(advanced, 1);

    let reloaded = storage.get_org_entitlement(org_id).await?.expect("entitlement exists");
    assert!(reloaded.usage_period_end > entitlement.usage_period_end);
    assert!(reloaded.usage_period_start <= clock.0 && clock.0 < reloaded.usage_period_end);
    Ok(())
}
