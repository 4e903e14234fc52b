//! Contract with the hosted-checkout payment gateway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway request timed out")]
    Timeout,

    #[error("gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("gateway response could not be decoded: {0}")]
    Decode(String),
}

/// Checkout session request sent to the gateway's `init` endpoint.
///
/// Field names are the gateway's own form keys.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InitPaymentRequest {
    pub total_amount: f64,
    pub currency: String,
    pub tran_id: String,
    pub success_url: String,
    pub fail_url: String,
    pub cancel_url: String,

    pub cus_name: String,
    pub cus_email: String,
    pub cus_add1: String,
    pub cus_add2: String,
    pub cus_city: String,
    pub cus_state: String,
    pub cus_postcode: String,
    pub cus_country: String,
    pub cus_phone: String,
    pub cus_fax: String,

    pub ship_name: String,
    pub ship_add1: String,
    pub ship_add2: String,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_postcode: String,
    pub ship_country: String,

    pub product_name: String,
    pub product_category: String,
    pub product_profile: String,
    pub num_of_item: usize,
    pub shipping_method: String,
    pub multi_card_name: String,

    /// Customer email, echoed back on callbacks.
    pub value_a: String,
    /// JSON cart snapshot, echoed back on callbacks.
    pub value_b: String,
    pub value_c: String,
    pub value_d: String,
}

/// Outcome of `init`: a hosted page to send the customer to, or the raw body
/// explaining why none was issued.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InitPaymentResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "GatewayPageURL", default)]
    pub gateway_page_url: Option<String>,
    #[serde(rename = "failedreason", default)]
    pub failed_reason: Option<String>,
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl InitPaymentResponse {
    /// The redirect URL, if the gateway actually issued a usable one.
    pub fn redirect_url(&self) -> Option<&str> {
        self.gateway_page_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Result of asking the gateway whether a callback's `val_id` is genuine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidationResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tran_id: Option<String>,
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl ValidationResponse {
    /// Only these two statuses prove the payment happened.
    pub fn is_affirmative(&self) -> bool {
        matches!(self.status.as_str(), "VALID" | "VALIDATED")
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn init(&self, request: &InitPaymentRequest)
        -> Result<InitPaymentResponse, GatewayError>;

    async fn validate(&self, val_id: &str) -> Result<ValidationResponse, GatewayError>;
}
