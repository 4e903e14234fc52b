use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    pub urls: UrlConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct GatewayConfig {
    pub store_id: String,
    pub store_password: Secret<String>,
    /// Sandbox or live host, e.g. `https://sandbox.sslcommerz.com`.
    pub api_base_url: String,
    pub currency: String,
    pub validate_max_attempts: u32,
    pub validate_initial_backoff_ms: u64,
    pub request_timeout_secs: u64,
}

impl GatewayConfig {
    pub fn validate_initial_backoff(&self) -> Duration {
        Duration::from_millis(self.validate_initial_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct AuthConfig {
    pub token_secret: Secret<String>,
    pub token_expiry_minutes: i64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct UrlConfig {
    /// Where the gateway sends the browser back to (this service).
    pub backend_url: String,
    /// The storefront SPA that renders the payment outcome pages.
    pub frontend_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let gateway = GatewayConfig {
            store_id: get_env("SSLCOMMERZ_STORE_ID", Some("testbox"), is_prod)?,
            store_password: Secret::new(get_env(
                "SSLCOMMERZ_STORE_PASSWORD",
                Some("qwerty"),
                is_prod,
            )?),
            api_base_url: get_env(
                "SSLCOMMERZ_API_BASE_URL",
                Some("https://sandbox.sslcommerz.com"),
                is_prod,
            )?,
            currency: get_env("PAYMENT_CURRENCY", Some("BDT"), false)?,
            validate_max_attempts: parse_env("GATEWAY_VALIDATE_MAX_ATTEMPTS", 2)?,
            validate_initial_backoff_ms: parse_env("GATEWAY_VALIDATE_BACKOFF_MS", 200)?,
            request_timeout_secs: parse_env("GATEWAY_REQUEST_TIMEOUT_SECS", 15)?,
        };

        Ok(Self {
            common,
            database: DatabaseConfig {
                url: Secret::new(get_env(
                    "STOREFRONT_DATABASE_URL",
                    Some("mongodb://localhost:27017"),
                    is_prod,
                )?),
                db_name: get_env("STOREFRONT_DATABASE_NAME", Some("GripsNGears"), false)?,
            },
            gateway,
            auth: AuthConfig {
                token_secret: Secret::new(get_env(
                    "ACCESS_TOKEN_SECRET",
                    Some("dev-access-token-secret"),
                    is_prod,
                )?),
                token_expiry_minutes: parse_env("ACCESS_TOKEN_EXPIRY_MINUTES", 60)?,
            },
            urls: UrlConfig {
                backend_url: get_env("BACKEND_URL", Some("http://localhost:5000"), is_prod)?,
                frontend_url: get_env("FRONTEND_URL", Some("http://localhost:5173"), is_prod)?,
            },
            service_name: "storefront-service".to_string(),
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_env_falls_back_to_default_outside_prod() {
        let value = get_env("STOREFRONT_TEST_UNSET_KEY", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");
    }

    #[test]
    fn get_env_requires_value_in_prod() {
        let err = get_env("STOREFRONT_TEST_UNSET_KEY", Some("fallback"), true).unwrap_err();
        assert!(err.to_string().contains("required in production"));
    }

    #[test]
    fn parse_env_uses_default_when_unset() {
        let attempts: u32 = parse_env("STOREFRONT_TEST_UNSET_ATTEMPTS", 2).unwrap();
        assert_eq!(attempts, 2);
    }
}
