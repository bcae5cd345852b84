//! Control-plane HTTP API (spec §4.5, §6.1).
//!
//! Built the way the teacher builds `rest/mod.rs`: a single `build_router`
//! assembling routes under `State<Arc<AppContext>>`, plus a `start_server`
//! that binds and serves. Auth is per-handler (each reads `Authorization`
//! itself via [`authenticate`]) rather than global middleware, since a
//! couple of routes (webhook intake, health) are deliberately unauthenticated
//! or use a different scheme (provider signature, not a principal).

pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{BoxError, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::Principal;
use crate::error::{NerveError, Result};
use crate::AppContext;

/// Scope required on every mutating control-plane endpoint (spec §4.5:
/// "Every mutating endpoint requires either the `nerve:admin.billing`
/// scope ... or the bootstrap key").
pub const BILLING_ADMIN_SCOPE: &str = "nerve:admin.billing";

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let request_timeout = Duration::from_secs(ctx.config.request_timeout_secs);
    Router::new()
        .route("/v1/health", get(routes::health::health))
        .route("/v1/orgs", post(routes::orgs::create_org))
        .route("/v1/subscriptions/checkout", post(routes::subscriptions::checkout))
        .route("/v1/subscriptions/current", get(routes::subscriptions::current))
        .route("/v1/billing/webhook/stripe", post(routes::webhook::stripe_webhook))
        .route("/v1/billing/portal", post(routes::portal::create_portal_session))
        .route("/v1/tokens/service", post(routes::tokens::issue_service_token))
        .route("/v1/keys", get(routes::keys::list_keys).post(routes::keys::create_key))
        .route("/v1/keys/:id", delete(routes::keys::revoke_key))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        // Per-request abort budget (spec §5: "every handler carries a
        // cancellation token from the HTTP layer ... must abort promptly").
        // `HandleErrorLayer` must sit outside `TimeoutLayer` so the `Elapsed`
        // error it produces gets converted into a response instead of
        // propagating past axum's infallible-service boundary.
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(ctx)
}

async fn handle_timeout_error(_: BoxError) -> (StatusCode, &'static str) {
    (StatusCode::REQUEST_TIMEOUT, "request timed out")
}

pub async fn start_server(ctx: Arc<AppContext>) -> anyhow::Result<()> {
    let addr: SocketAddr = ctx.config.bind_addr.parse()?;
    let router = build_router(ctx);
    tracing::info!(%addr, "control-plane API listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

/// Resolves the caller's [`Principal`] from request headers (spec §4.1):
/// `Authorization: Bearer <token>` for the JWT/bootstrap path, or
/// `X-Nerve-Cloud-Key: <key>` for the opaque cloud-API-key path.
pub async fn authenticate(ctx: &AppContext, headers: &HeaderMap) -> Result<Principal> {
    let authorization = headers.get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    let cloud_key = headers.get("x-nerve-cloud-key").and_then(|v| v.to_str().ok());
    crate::auth::resolve_principal(authorization, cloud_key, &ctx.config, &ctx.storage).await
}

/// Resolves the caller and requires `nerve:admin.billing` (or bootstrap).
pub async fn authenticate_billing_admin(ctx: &AppContext, headers: &HeaderMap) -> Result<Principal> {
    let principal = authenticate(ctx, headers).await?;
    if principal.has_scope(BILLING_ADMIN_SCOPE) {
        Ok(principal)
    } else {
        Err(NerveError::Forbidden { required: BILLING_ADMIN_SCOPE.to_string() })
    }
}

/// Resolves a billing-admin caller and requires that the org it's scoped to
/// matches `requested_org_id` (spec §4.5: every mutating endpoint is
/// "org-scoped"). A bootstrap principal has no fixed org and is exempt — it
/// is the explicit break-glass path. Without this check, any billing-admin
/// key/token for one org could act on an arbitrary org simply by naming it
/// in the request body or query.
pub async fn authenticate_billing_admin_for_org(
    ctx: &AppContext,
    headers: &HeaderMap,
    requested_org_id: uuid::Uuid,
) -> Result<Principal> {
    let principal = authenticate_billing_admin(ctx, headers).await?;
    if principal.is_bootstrap() || principal.org_id == Some(requested_org_id) {
        Ok(principal)
    } else {
        Err(NerveError::Forbidden { required: BILLING_ADMIN_SCOPE.to_string() })
    }
}
