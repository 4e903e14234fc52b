//! SSLCommerz hosted-checkout client.
//!
//! Implements session initiation (`gwprocess/v4`) and the order validation
//! API used to confirm success callbacks.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::config::GatewayConfig;
use crate::services::gateway::{
    GatewayError, InitPaymentRequest, InitPaymentResponse, PaymentGateway, ValidationResponse,
};

const INIT_PATH: &str = "/gwprocess/v4/api.php";
const VALIDATE_PATH: &str = "/validator/api/validationserverAPI.php";

#[derive(Clone)]
pub struct SslCommerzClient {
    client: Client,
    config: GatewayConfig,
}

#[derive(Serialize)]
struct AuthenticatedInit<'a> {
    store_id: &'a str,
    store_passwd: &'a str,
    #[serde(flatten)]
    request: &'a InitPaymentRequest,
}

impl SslCommerzClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client, config })
    }

    /// Check if the store credentials are set.
    pub fn is_configured(&self) -> bool {
        !self.config.store_id.is_empty() && !self.config.store_password.expose_secret().is_empty()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, GatewayError> {
        let status = response.status();
        let body = response.text().await.map_err(map_transport)?;

        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

fn map_transport(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(err)
    }
}

#[async_trait]
impl PaymentGateway for SslCommerzClient {
    async fn init(
        &self,
        request: &InitPaymentRequest,
    ) -> Result<InitPaymentResponse, GatewayError> {
        let form = AuthenticatedInit {
            store_id: &self.config.store_id,
            store_passwd: self.config.store_password.expose_secret(),
            request,
        };

        let response = self
            .client
            .post(self.url(INIT_PATH))
            .form(&form)
            .send()
            .await
            .map_err(map_transport)?;

        let raw = Self::read_json(response).await?;
        let mut parsed: InitPaymentResponse = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        parsed.raw = raw;

        tracing::debug!(
            tran_id = %request.tran_id,
            status = ?parsed.status,
            has_redirect = parsed.redirect_url().is_some(),
            "Gateway init response"
        );

        Ok(parsed)
    }

    async fn validate(&self, val_id: &str) -> Result<ValidationResponse, GatewayError> {
        let response = self
            .client
            .get(self.url(VALIDATE_PATH))
            .query(&[
                ("val_id", val_id),
                ("store_id", self.config.store_id.as_str()),
                ("store_passwd", self.config.store_password.expose_secret().as_str()),
                ("v", "1"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(map_transport)?;

        let raw = Self::read_json(response).await?;
        let mut parsed: ValidationResponse = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        parsed.raw = raw;

        tracing::debug!(
            val_id = %val_id,
            status = %parsed.status,
            "Gateway validation response"
        );

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn config(base: &str) -> GatewayConfig {
        GatewayConfig {
            store_id: "testbox".to_string(),
            store_password: Secret::new("qwerty".to_string()),
            api_base_url: base.to_string(),
            currency: "BDT".to_string(),
            validate_max_attempts: 2,
            validate_initial_backoff_ms: 10,
            request_timeout_secs: 5,
        }
    }

    #[test]
    fn test_is_configured() {
        let client = SslCommerzClient::new(config("https://sandbox.sslcommerz.com")).unwrap();
        assert!(client.is_configured());

        let mut empty = config("https://sandbox.sslcommerz.com");
        empty.store_id = String::new();
        let client = SslCommerzClient::new(empty).unwrap();
        assert!(!client.is_configured());
    }

    #[test]
    fn url_joins_without_double_slash() {
        let client = SslCommerzClient::new(config("https://sandbox.sslcommerz.com/")).unwrap();
        assert_eq!(
            client.url(INIT_PATH),
            "https://sandbox.sslcommerz.com/gwprocess/v4/api.php"
        );
    }
}
