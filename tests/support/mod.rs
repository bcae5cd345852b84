//! Shared fixtures for integration tests: seed a plan, an org, and an
//! active entitlement in one call so each test starts from a realistic
//! baseline instead of hand-rolling rows inline.

use chrono::{Duration, Utc};
use nerve::storage::models::OrgEntitlementRow;
use nerve::storage::Storage;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn seed_plan(storage: &Storage, plan_code: &str, mcp_rpm: i32, monthly_units: i64, max_inboxes: i32) {
    storage
        .upsert_plan_entitlement(&nerve::storage::models::PlanEntitlementRow {
            plan_code: plan_code.to_string(),
            mcp_rpm,
            monthly_units,
            max_inboxes,
            features: serde_json::json!({}),
        })
        .await
        .expect("seed plan");
}

/// Creates an org with an active entitlement on `plan_code`, period covering
/// `now`, no grace deadline pending.
pub async fn seed_active_org(storage: &Storage, plan_code: &str) -> (Uuid, OrgEntitlementRow) {
    let org = storage.create_org("acme").await.expect("create org");
    let now = Utc::now();
    let plan = storage
        .get_plan_entitlement(plan_code)
        .await
        .expect("load plan")
        .expect("plan must be seeded first");
    let entitlement = storage
        .upsert_org_entitlement(
            org.id,
            plan_code,
            "active",
            plan.mcp_rpm,
            plan.monthly_units,
            plan.max_inboxes,
            now - Duration::days(1),
            now + Duration::days(29),
            None,
        )
        .await
        .expect("seed org entitlement");
    storage
        .ensure_usage_counter(org.id, nerve::entitlement::MCP_UNITS_METER, entitlement.usage_period_start, entitlement.usage_period_end)
        .await
        .expect("seed usage counter");
    (org.id, entitlement)
}

pub fn storage_from(pool: PgPool) -> Storage {
    Storage::from_pool(pool)
}
