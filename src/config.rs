//! Runtime configuration (spec §6.4).
//!
//! Priority: CLI / env var > built-in default. Modeled on the teacher's
//! `DaemonConfig` (env-first, `clap(env = "...")` on the CLI args, a single
//! struct constructed once at startup and shared via `Arc`).

use std::collections::HashMap;

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_LOG: &str = "info";
const DEFAULT_GRACE_DAYS: i64 = 3;
const DEFAULT_TOOL_COST: u32 = 1;
/// Idle eviction for per-org rate-limiter buckets (spec §5).
const DEFAULT_RATE_LIMITER_IDLE_SECS: u64 = 600;
/// Per-request abort budget (spec §5: "every handler carries a
/// cancellation token from the HTTP layer ... must abort promptly").
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct NerveConfig {
    /// When false, the runtime serves single-tenant with all gates disabled
    /// (spec §6.4). Defaults to true — cloud mode is the normal deployment.
    pub cloud_mode: bool,
    pub bind_addr: String,
    pub database_url: String,
    pub log: String,

    /// HMAC-SHA256 signing key for service tokens. Empty in cloud mode ⇒
    /// bearer auth is rejected outright (spec §4.1).
    pub service_token_signing_key: String,
    /// HMAC-SHA256 secret for billing webhook signatures. Empty in cloud
    /// mode ⇒ webhooks are rejected outright (spec §4.3).
    pub billing_webhook_secret: String,
    /// Optional out-of-band admin key enabling the bootstrap control-plane
    /// path (spec §4.1, break-glass only).
    pub bootstrap_admin_key: Option<String>,

    /// Expected `iss`/`aud` claims, if configured (spec §4.1). Empty means
    /// "do not validate this claim".
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,

    /// `tool_name -> units`; absent entries default to 1 (spec §4.2).
    pub tool_costs: HashMap<String, u32>,
    /// Days of grace after a failed invoice before a `past_due` org loses
    /// access (spec §4.3, §6.4).
    pub grace_days: i64,
    /// Idle TTL, in seconds, before an unused per-org rate-limiter bucket is
    /// evicted (spec §5).
    pub rate_limiter_idle_secs: u64,
    /// Wall-clock budget per HTTP request before the server aborts it and
    /// returns `408` (spec §5).
    pub request_timeout_secs: u64,

    /// Base URL of the billing provider's API, used for checkout/portal
    /// session creation (spec §4.5, ambient — see SPEC_FULL.md §4).
    pub billing_api_base_url: String,
    /// Secret API key for the outbound billing provider client. Distinct
    /// from `billing_webhook_secret`, which authenticates inbound events.
    pub billing_api_key: String,
}

impl NerveConfig {
    /// Build configuration from environment variables, matching the
    /// teacher's env-first precedence (`CLAWD_*` there, `NERVE_*` here).
    pub fn from_env() -> Self {
        Self {
            cloud_mode: env_bool("NERVE_CLOUD_MODE", true),
            bind_addr: std::env::var("NERVE_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND.to_string()),
            database_url: std::env::var("NERVE_DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/nerve".to_string()),
            log: std::env::var("NERVE_LOG").unwrap_or_else(|_| DEFAULT_LOG.to_string()),
            service_token_signing_key: std::env::var("NERVE_SIGNING_KEY").unwrap_or_default(),
            billing_webhook_secret: std::env::var("NERVE_WEBHOOK_SECRET").unwrap_or_default(),
            bootstrap_admin_key: std::env::var("NERVE_BOOTSTRAP_ADMIN_KEY").ok().filter(|s| !s.is_empty()),
            jwt_issuer: std::env::var("NERVE_JWT_ISSUER").ok().filter(|s| !s.is_empty()),
            jwt_audience: std::env::var("NERVE_JWT_AUDIENCE").ok().filter(|s| !s.is_empty()),
            tool_costs: parse_tool_costs(&std::env::var("NERVE_TOOL_COSTS").unwrap_or_default()),
            grace_days: std::env::var("NERVE_GRACE_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_GRACE_DAYS),
            rate_limiter_idle_secs: std::env::var("NERVE_RATE_LIMITER_IDLE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMITER_IDLE_SECS),
            request_timeout_secs: std::env::var("NERVE_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            billing_api_base_url: std::env::var("NERVE_BILLING_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            billing_api_key: std::env::var("NERVE_BILLING_API_KEY").unwrap_or_default(),
        }
    }

    /// Cost in meter units for a tool call (spec §4.2: "configurable per
    /// `tool_name`, default 1 unit").
    pub fn tool_cost(&self, tool_name: &str) -> u32 {
        self.tool_costs.get(tool_name).copied().unwrap_or(DEFAULT_TOOL_COST)
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

/// Parses `NERVE_TOOL_COSTS` as `name=cost,name=cost`.
fn parse_tool_costs(raw: &str) -> HashMap<String, u32> {
    raw.split(',')
        .filter_map(|pair| {
            let (name, cost) = pair.split_once('=')?;
            let cost: u32 = cost.trim().parse().ok()?;
            Some((name.trim().to_string(), cost))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_cost_map() {
        let costs = parse_tool_costs("send_email=5,search_inbox=2");
        assert_eq!(costs.get("send_email"), Some(&5));
        assert_eq!(costs.get("search_inbox"), Some(&2));
    }

    #[test]
    fn empty_tool_cost_map_defaults_to_one() {
        let costs = parse_tool_costs("");
        assert!(costs.is_empty());
    }
}
