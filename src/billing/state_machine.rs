//! Billing event application (spec §4.3).
//!
//! `process_event` is the whole processor: verify happens one layer up (in
//! `src/http/routes/webhook.rs`, since it needs the raw body before
//! `serde_json` touches it), and everything from dedupe onward lives here so
//! it can be exercised directly in tests without an HTTP stack.

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::config::NerveConfig;
use crate::storage::Storage;

use super::provider::WebhookEnvelope;

pub enum Outcome {
    /// The event id had already been durably processed; no state changed.
    AlreadyProcessed,
    Processed,
}

pub async fn process_event(
    storage: &Storage,
    config: &NerveConfig,
    provider: &str,
    payload_hash: &str,
    envelope: &WebhookEnvelope,
) -> Result<Outcome> {
    let claimed = storage
        .claim_webhook_event(provider, &envelope.id, &envelope.event_type, payload_hash)
        .await?;

    if !claimed {
        let existing = storage
            .get_webhook_event(provider, &envelope.id)
            .await?
            .ok_or_else(|| anyhow!("webhook event vanished after failed claim"))?;
        if existing.status == "processed" {
            return Ok(Outcome::AlreadyProcessed);
        }
        // Fall through: a previously failed event is retried below.
    }

    match apply(storage, config, envelope).await {
        Ok(()) => {
            storage.mark_webhook_processed(provider, &envelope.id).await?;
            Ok(Outcome::Processed)
        }
        Err(e) => {
            storage.mark_webhook_failed(provider, &envelope.id, &e.to_string()).await?;
            Err(e)
        }
    }
}

async fn apply(storage: &Storage, config: &NerveConfig, envelope: &WebhookEnvelope) -> Result<()> {
    match envelope.event_type.as_str() {
        "checkout.session.completed" => apply_checkout_completed(storage, envelope).await,
        "customer.subscription.created" | "customer.subscription.updated" => {
            apply_subscription_upsert(storage, config, envelope, false).await
        }
        "customer.subscription.deleted" => apply_subscription_upsert(storage, config, envelope, true).await,
        "invoice.paid" => apply_invoice_paid(storage, envelope).await,
        "invoice.payment_failed" => apply_invoice_payment_failed(storage, config, envelope).await,
        _ => Ok(()),
    }
}

/// Resolves the org for an event: explicit `metadata.org_id`, else a lookup
/// by `external_subscription_id`, else by `external_customer_id` (spec
/// §4.3: "Org resolution order").
async fn resolve_org(storage: &Storage, envelope: &WebhookEnvelope) -> Result<Uuid> {
    if let Some(org_id) = envelope.metadata_org_id() {
        return Ok(org_id);
    }
    if let Some(sub_id) = envelope.external_subscription_id() {
        if let Some(row) = storage.find_subscription_by_external_id(sub_id).await? {
            return Ok(row.org_id);
        }
    }
    if let Some(customer_id) = envelope.external_customer_id() {
        if let Some(row) = storage.find_subscription_by_external_customer_id(customer_id).await? {
            return Ok(row.org_id);
        }
    }
    Err(anyhow!("could not resolve org for webhook event {}", envelope.id))
}

async fn apply_checkout_completed(storage: &Storage, envelope: &WebhookEnvelope) -> Result<()> {
    let org_id = envelope
        .client_reference_id()
        .ok_or_else(|| anyhow!("checkout.session.completed missing client_reference_id"))?;
    storage
        .upsert_subscription(
            org_id,
            "stripe",
            envelope.external_customer_id(),
            envelope.external_subscription_id(),
            "checkout_completed",
            None,
            None,
            false,
        )
        .await
        .context("upserting subscription for checkout.session.completed")?;
    Ok(())
}

/// Maps a provider's raw subscription status to the enum the rest of the
/// system understands (spec §4.3: "deleted ⇒ canceled; unknown ⇒ unpaid").
fn normalize_status(raw: Option<&str>, forced_canceled: bool) -> &'static str {
    if forced_canceled {
        return "canceled";
    }
    match raw {
        Some("trialing") => "trialing",
        Some("active") => "active",
        Some("past_due") => "past_due",
        Some("canceled") => "canceled",
        Some("unpaid") => "unpaid",
        _ => "unpaid",
    }
}

async fn apply_subscription_upsert(
    storage: &Storage,
    config: &NerveConfig,
    envelope: &WebhookEnvelope,
    forced_canceled: bool,
) -> Result<()> {
    let org_id = resolve_org(storage, envelope).await?;
    let status = normalize_status(envelope.raw_status(), forced_canceled);
    let period_start = envelope.current_period_start().unwrap_or_else(Utc::now);
    let period_end = envelope.current_period_end().unwrap_or_else(|| period_start + Duration::days(30));

    storage
        .upsert_subscription(
            org_id,
            "stripe",
            envelope.external_customer_id(),
            envelope.external_subscription_id(),
            status,
            Some(period_start),
            Some(period_end),
            envelope.cancel_at_period_end(),
        )
        .await
        .context("upserting subscription")?;

    let plan_code = envelope
        .plan_code()
        .ok_or_else(|| anyhow!("subscription event missing a resolvable plan code"))?;
    let plan = storage
        .get_plan_entitlement(plan_code)
        .await?
        .ok_or_else(|| anyhow!("unknown plan code {plan_code}"))?;

    let grace_until = if status == "past_due" { Some(period_end + Duration::days(config.grace_days)) } else { None };

    storage
        .upsert_org_entitlement(
            org_id,
            &plan.plan_code,
            status,
            plan.mcp_rpm,
            plan.monthly_units,
            plan.max_inboxes,
            period_start,
            period_end,
            grace_until,
        )
        .await
        .context("upserting org entitlement")?;
    Ok(())
}

async fn apply_invoice_paid(storage: &Storage, envelope: &WebhookEnvelope) -> Result<()> {
    let org_id = resolve_org(storage, envelope).await?;
    storage.set_subscription_status(org_id, "active").await?;
    storage.set_subscription_status_on_entitlement(org_id, "active", None).await?;
    Ok(())
}

async fn apply_invoice_payment_failed(storage: &Storage, config: &NerveConfig, envelope: &WebhookEnvelope) -> Result<()> {
    let org_id = resolve_org(storage, envelope).await?;
    let period_end = envelope.current_period_end().unwrap_or_else(Utc::now);
    let grace_until = period_end + Duration::days(config.grace_days);
    storage.set_subscription_status(org_id, "past_due").await?;
    storage
        .set_subscription_status_on_entitlement(org_id, "past_due", Some(grace_until))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_always_normalizes_to_canceled() {
        assert_eq!(normalize_status(Some("active"), true), "canceled");
    }

    #[test]
    fn unknown_status_normalizes_to_unpaid() {
        assert_eq!(normalize_status(Some("weird_new_status"), false), "unpaid");
        assert_eq!(normalize_status(None, false), "unpaid");
    }

    #[test]
    fn known_statuses_pass_through() {
        for s in ["trialing", "active", "past_due", "canceled", "unpaid"] {
            assert_eq!(normalize_status(Some(s), false), s);
        }
    }
}
