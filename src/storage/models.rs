//! Row structs for every persisted entity (spec §3).
//!
//! One `#[derive(sqlx::FromRow)]` struct per table, mirroring the teacher's
//! `SessionRow`/`MessageRow`/`AccountRow` convention in `storage/mod.rs`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OrgRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SubscriptionRow {
    pub org_id: Uuid,
    pub provider: String,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub status: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PlanEntitlementRow {
    pub plan_code: String,
    pub mcp_rpm: i32,
    pub monthly_units: i64,
    pub max_inboxes: i32,
    pub features: Value,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OrgEntitlementRow {
    pub org_id: Uuid,
    pub plan_code: String,
    pub subscription_status: String,
    pub mcp_rpm: i32,
    pub monthly_units: i64,
    pub max_inboxes: i32,
    pub usage_period_start: DateTime<Utc>,
    pub usage_period_end: DateTime<Utc>,
    pub grace_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UsageCounterRow {
    pub org_id: Uuid,
    pub meter_name: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub used: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UsageEventRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub meter_name: String,
    pub quantity: i64,
    pub tool_name: String,
    pub replay_id: Option<String>,
    pub audit_id: Option<Uuid>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WebhookEventRow {
    pub provider: String,
    pub external_event_id: String,
    pub event_type: String,
    pub payload_hash: String,
    pub status: String,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CloudApiKeyRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub key_prefix: String,
    pub key_hash: String,
    pub label: String,
    pub scopes: Vec<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServiceTokenRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub actor: String,
    pub scopes: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct InboxRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ThreadRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub inbox_id: Uuid,
    pub subject: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct MessageRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub thread_id: Uuid,
    pub sender: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OrgDomainRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub domain: String,
    pub created_at: DateTime<Utc>,
}
