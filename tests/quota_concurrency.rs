//! Spec §8: "N concurrent calls each costing C units never let used exceed
//! cap." Drives the gate's atomic reservation from many tasks at once and
//! checks the counter never overshoots, regardless of how the tasks
//! interleave.

mod support;

use std::sync::Arc;
use std::time::Duration;

use nerve::entitlement::{pre_authorize_tool, RateLimiter};
use sqlx::PgPool;

#[sqlx::test(migrations = "src/storage/migrations")]
async fn concurrent_reservations_never_exceed_the_monthly_cap(pool: PgPool) -> anyhow::Result<()> {
    let storage = Arc::new(support::storage_from(pool));
    support::seed_plan(&storage, "starter", 10_000, 100, 5).await;
    let (org_id, entitlement) = support::seed_active_org(&storage, "starter").await;

    // A generous rate limit so the rate limiter never becomes the bottleneck
    // being tested here — only the quota reservation should win or lose.
    let rate_limiter = Arc::new(RateLimiter::new(Duration::from_secs(600)));

    let cost = 3u32;
    let attempts = 50; // 50 * 3 = 150 units requested against a cap of 100
    let mut handles = Vec::with_capacity(attempts);
    for _ in 0..attempts {
        let storage = storage.clone();
        let rate_limiter = rate_limiter.clone();
        handles.push(tokio::spawn(async move {
            pre_authorize_tool(&storage, &rate_limiter, org_id, cost).await.is_ok()
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle.await? {
            granted += 1;
        }
    }

    // At most 33 reservations of 3 units fit under 100 (33*3 = 99).
    assert!(granted <= 33, "granted {granted} reservations, which would exceed the cap");

    let counter = storage
        .get_usage_counter(org_id, nerve::entitlement::MCP_UNITS_METER, entitlement.usage_period_start)
        .await?
        .expect("counter row exists");
    assert_eq!(counter.used, granted as i64 * cost as i64);
    assert!(counter.used <= entitlement.monthly_units);

    Ok(())
}

#[sqlx::test(migrations = "src/storage/migrations")]
async fn a_failed_execution_releases_its_reservation(pool: PgPool) -> anyhow::Result<()> {
    use nerve::entitlement::finalize_tool_execution;

    let storage = Arc::new(support::storage_from(pool));
    support::seed_plan(&storage, "starter", 10_000, 100, 5).await;
    let (org_id, entitlement) = support::seed_active_org(&storage, "starter").await;
    let rate_limiter = RateLimiter::new(Duration::from_secs(600));

    let reservation = pre_authorize_tool(&storage, &rate_limiter, org_id, 10).await?;
    finalize_tool_execution(&storage, reservation, "send_email", None, None, "failed").await?;

    let counter = storage
        .get_usage_counter(org_id, nerve::entitlement::MCP_UNITS_METER, entitlement.usage_period_start)
        .await?
        .expect("counter row exists");
    assert_eq!(counter.used, 0, "failed execution must refund its reservation");

    Ok(())
}
