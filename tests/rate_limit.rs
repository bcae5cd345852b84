//! Spec §5 / §8: once an org's per-minute budget is exhausted, further calls
//! are rejected with a retry-after hint rather than silently queued or
//! allowed through.

mod support;

use std::time::Duration;

use nerve::entitlement::{pre_authorize_tool, RateLimiter};
use nerve::error::NerveError;
use sqlx::PgPool;

#[sqlx::test(migrations = "src/storage/migrations")]
async fn exhausting_the_bucket_yields_a_retryable_rate_limited_error(pool: PgPool) -> anyhow::Result<()> {
    let storage = support::storage_from(pool);
    // mcp_rpm = 2 and plenty of monthly units, so the rate limiter — not the
    // quota reservation — is what trips.
    support::seed_plan(&storage, "starter", 2, 10_000, 5).await;
    let (org_id, _) = support::seed_active_org(&storage, "starter").await;
    let rate_limiter = RateLimiter::new(Duration::from_secs(600));

    assert!(pre_authorize_tool(&storage, &rate_limiter, org_id, 1).await.is_ok());
    assert!(pre_authorize_tool(&storage, &rate_limiter, org_id, 1).await.is_ok());

    let err = pre_authorize_tool(&storage, &rate_limiter, org_id, 1).await.unwrap_err();
    assert!(err.retryable());
    match err {
        NerveError::RateLimited { retry_after_seconds } => assert!(retry_after_seconds > 0),
        other => panic!("expected RateLimited, got {other:?}"),
    }

    Ok(())
}

#[sqlx::test(migrations = "src/storage/migrations")]
async fn distinct_orgs_are_rate_limited_independently(pool: PgPool) -> anyhow::Result<()> {
    let storage = support::storage_from(pool);
    support::seed_plan(&storage, "starter", 1, 10_000, 5).await;
    let (org_a, _) = support::seed_active_org(&storage, "starter").await;
    let (org_b, _) = support::seed_active_org(&storage, "starter").await;
    let rate_limiter = RateLimiter::new(Duration::from_secs(600));

    assert!(pre_authorize_tool(&storage, &rate_limiter, org_a, 1).await.is_ok());
    assert!(pre_authorize_tool(&storage, &rate_limiter, org_a, 1).await.is_err());
    // org_b's bucket is untouched by org_a's exhaustion.
    assert!(pre_authorize_tool(&storage, &rate_limiter, org_b, 1).await.is_ok());

    Ok(())
}
