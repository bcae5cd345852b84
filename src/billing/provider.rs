//! Wire shape of an inbound billing provider event (spec §4.3).
//!
//! Deliberately loose (`serde_json::Value` for most fields) — the processor
//! only needs a handful of paths out of what is otherwise a large,
//! provider-defined payload, the same selective-deserialize approach the
//! teacher takes with `VerifyResponse` in `license/mod.rs` rather than
//! modeling the whole upstream schema.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: Value,
}

impl WebhookEnvelope {
    pub fn object(&self) -> &Value {
        &self.data.object
    }

    pub fn metadata_org_id(&self) -> Option<uuid::Uuid> {
        self.object()
            .get("metadata")
            .and_then(|m| m.get("org_id"))
            .and_then(Value::as_str)
            .and_then(|s| uuid::Uuid::parse_str(s).ok())
    }

    pub fn client_reference_id(&self) -> Option<uuid::Uuid> {
        self.object()
            .get("client_reference_id")
            .and_then(Value::as_str)
            .and_then(|s| uuid::Uuid::parse_str(s).ok())
    }

    pub fn external_subscription_id(&self) -> Option<&str> {
        self.object().get("id").and_then(Value::as_str).filter(|s| s.starts_with("sub_"))
            .or_else(|| self.object().get("subscription").and_then(Value::as_str))
    }

    pub fn external_customer_id(&self) -> Option<&str> {
        self.object().get("customer").and_then(Value::as_str)
    }

    /// First price's `lookup_key` (preferred) or `id`, from the subscription
    /// object's `items.data[0].price` (spec §4.3: "Entitlement projection").
    pub fn plan_code(&self) -> Option<&str> {
        let price = self
            .object()
            .get("items")?
            .get("data")?
            .as_array()?
            .first()?
            .get("price")?;
        price
            .get("lookup_key")
            .and_then(Value::as_str)
            .or_else(|| price.get("id").and_then(Value::as_str))
    }

    pub fn current_period_start(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.object().get("current_period_start").and_then(Value::as_i64).and_then(|ts| {
            chrono::DateTime::from_timestamp(ts, 0)
        })
    }

    pub fn current_period_end(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.object().get("current_period_end").and_then(Value::as_i64).and_then(|ts| {
            chrono::DateTime::from_timestamp(ts, 0)
        })
    }

    pub fn raw_status(&self) -> Option<&str> {
        self.object().get("status").and_then(Value::as_str)
    }

    pub fn cancel_at_period_end(&self) -> bool {
        self.object().get("cancel_at_period_end").and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Outbound collaborator for hosted checkout/portal sessions (ambient
/// supplement — see SPEC_FULL.md §4.3 note). The inbound webhook path never
/// calls this; only the control-plane checkout/portal endpoints do.
#[async_trait::async_trait]
pub trait BillingProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        org_id: uuid::Uuid,
        plan_code: &str,
    ) -> anyhow::Result<CheckoutSession>;

    async fn create_portal_session(&self, customer_id: &str) -> anyhow::Result<PortalSession>;
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckoutSession {
    pub checkout_url: String,
    pub client_reference_id: uuid::Uuid,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PortalSession {
    pub portal_url: String,
}

/// Talks to a Stripe-shaped checkout/portal API over `reqwest`, the same
/// client the teacher uses for its license-verify call (`license/mod.rs`
/// `call_verify`).
pub struct StripeLikeProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl StripeLikeProvider {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self { client: reqwest::Client::new(), base_url, api_key }
    }
}

#[async_trait::async_trait]
impl BillingProvider for StripeLikeProvider {
    async fn create_checkout_session(
        &self,
        org_id: uuid::Uuid,
        plan_code: &str,
    ) -> anyhow::Result<CheckoutSession> {
        let resp: Value = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.api_key)
            .form(&[("client_reference_id", org_id.to_string()), ("line_items[0][price]", plan_code.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let checkout_url = resp
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("checkout response missing url"))?
            .to_string();
        Ok(CheckoutSession { checkout_url, client_reference_id: org_id })
    }

    async fn create_portal_session(&self, customer_id: &str) -> anyhow::Result<PortalSession> {
        let resp: Value = self
            .client
            .post(format!("{}/v1/billing_portal/sessions", self.base_url))
            .bearer_auth(&self.api_key)
            .form(&[("customer", customer_id)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let portal_url = resp
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("portal response missing url"))?
            .to_string();
        Ok(PortalSession { portal_url })
    }
}
