//! Nerve: cloud control plane and MCP enforcement gateway for email
//! automation (spec §1-§2).
//!
//! [`AppContext`] bundles every shared subsystem behind `Arc`, mirroring the
//! teacher's `AppContext` (`lib.rs`) — one struct constructed once in
//! `main`, cloned cheaply into every request handler via axum's `State`.

pub mod auth;
pub mod billing;
pub mod config;
pub mod credentials;
pub mod entitlement;
pub mod error;
pub mod http;
pub mod reconciliation;
pub mod storage;
pub mod tenant;

use std::sync::Arc;
use std::time::Duration;

use crate::billing::provider::{BillingProvider, StripeLikeProvider};
use crate::config::NerveConfig;
use crate::entitlement::{Clock, RateLimiter, SessionCache, SystemClock};
use crate::storage::Storage;

pub struct AppContext {
    pub config: NerveConfig,
    pub storage: Storage,
    pub rate_limiter: RateLimiter,
    pub session_cache: SessionCache,
    pub clock: Box<dyn Clock>,
    pub billing_provider: Box<dyn BillingProvider>,
}

impl AppContext {
    pub async fn new(config: NerveConfig) -> anyhow::Result<Arc<Self>> {
        let storage = Storage::connect(&config.database_url, config.cloud_mode).await?;
        let rate_limiter = RateLimiter::new(Duration::from_secs(config.rate_limiter_idle_secs));
        let session_cache = SessionCache::new();
        let clock: Box<dyn Clock> = Box::new(SystemClock);
        let billing_provider: Box<dyn BillingProvider> = Box::new(StripeLikeProvider::new(
            config.billing_api_base_url.clone(),
            config.billing_api_key.clone(),
        ));
        Ok(Arc::new(Self { config, storage, rate_limiter, session_cache, clock, billing_provider }))
    }
}
