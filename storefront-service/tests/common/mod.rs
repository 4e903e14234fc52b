#![allow(dead_code)]

use async_trait::async_trait;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use storefront_service::config::{AuthConfig, Config, DatabaseConfig, GatewayConfig, UrlConfig};
use storefront_service::models::Role;
use storefront_service::services::gateway::{
    GatewayError, InitPaymentRequest, InitPaymentResponse, PaymentGateway, ValidationResponse,
};
use storefront_service::services::{
    CartStore, InMemoryCartStore, InMemoryCatalogStore, InMemoryOrderStore, InMemoryUserStore,
    JwtService, NewCartItem, UserStore,
};
use storefront_service::{AppState, Application, Stores};

pub const BACKEND_URL: &str = "http://backend.test";
pub const FRONTEND_URL: &str = "http://frontend.test";
pub const CHECKOUT_URL: &str = "https://sandbox.gateway.test/checkout/session-1";

/// How the fake gateway answers `init`.
#[derive(Clone)]
pub enum InitScript {
    Redirect,
    Reject(Value),
    Unreachable,
}

/// Scripted stand-in for the payment gateway that records every call.
pub struct FakeGateway {
    pub init_calls: AtomicUsize,
    pub validate_calls: AtomicUsize,
    pub init_requests: Mutex<Vec<InitPaymentRequest>>,
    init_script: Mutex<InitScript>,
    validation_status: Mutex<String>,
    /// Leading `validate` calls that time out before answers start.
    validate_timeouts: AtomicUsize,
    validate_delay: Mutex<Duration>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            init_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
            init_requests: Mutex::new(Vec::new()),
            init_script: Mutex::new(InitScript::Redirect),
            validation_status: Mutex::new("VALID".to_string()),
            validate_timeouts: AtomicUsize::new(0),
            validate_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn script_init(&self, script: InitScript) {
        *self.init_script.lock().unwrap() = script;
    }

    pub fn answer_validation_with(&self, status: &str) {
        *self.validation_status.lock().unwrap() = status.to_string();
    }

    pub fn time_out_validation(&self, times: usize) {
        self.validate_timeouts.store(times, Ordering::SeqCst);
    }

    pub fn delay_validation(&self, delay: Duration) {
        *self.validate_delay.lock().unwrap() = delay;
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn last_init_request(&self) -> Option<InitPaymentRequest> {
        self.init_requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn init(&self, request: &InitPaymentRequest) -> Result<InitPaymentResponse, GatewayError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        self.init_requests.lock().unwrap().push(request.clone());

        let script = self.init_script.lock().unwrap().clone();
        let raw = match script {
            InitScript::Redirect => json!({ "status": "SUCCESS", "GatewayPageURL": CHECKOUT_URL }),
            InitScript::Reject(raw) => raw,
            InitScript::Unreachable => return Err(GatewayError::Timeout),
        };

        let mut response: InitPaymentResponse = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        response.raw = raw;
        Ok(response)
    }

    async fn validate(&self, val_id: &str) -> Result<ValidationResponse, GatewayError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.validate_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let timed_out = self
            .validate_timeouts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if timed_out {
            return Err(GatewayError::Timeout);
        }

        let status = self.validation_status.lock().unwrap().clone();
        let raw = json!({ "status": status, "val_id": val_id, "amount": "1000.00" });
        Ok(ValidationResponse {
            status,
            tran_id: None,
            raw,
        })
    }
}

pub fn test_config() -> Config {
    Config {
        common: service_core::config::Config {
            port: 0,
            log_level: "warn".to_string(),
            otlp_endpoint: None,
        },
        database: DatabaseConfig {
            url: Secret::new("mongodb://unused".to_string()),
            db_name: "storefront_test".to_string(),
        },
        gateway: GatewayConfig {
            store_id: "testbox".to_string(),
            store_password: Secret::new("qwerty".to_string()),
            api_base_url: "http://gateway.invalid".to_string(),
            currency: "BDT".to_string(),
            validate_max_attempts: 2,
            validate_initial_backoff_ms: 10,
            request_timeout_secs: 5,
        },
        auth: AuthConfig {
            token_secret: Secret::new("test-access-token-secret".to_string()),
            token_expiry_minutes: 60,
        },
        urls: UrlConfig {
            backend_url: BACKEND_URL.to_string(),
            frontend_url: FRONTEND_URL.to_string(),
        },
        service_name: "storefront-service-test".to_string(),
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    pub orders: InMemoryOrderStore,
    pub carts: InMemoryCartStore,
    pub users: InMemoryUserStore,
    pub catalog: InMemoryCatalogStore,
    pub gateway: Arc<FakeGateway>,
    pub jwt: JwtService,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let config = test_config();

        let orders = InMemoryOrderStore::new();
        let carts = InMemoryCartStore::new();
        let users = InMemoryUserStore::new();
        let catalog = InMemoryCatalogStore::new();
        let gateway = Arc::new(FakeGateway::new());

        let stores = Stores {
            orders: Arc::new(orders.clone()),
            carts: Arc::new(carts.clone()),
            users: Arc::new(users.clone()),
            catalog: Arc::new(catalog.clone()),
        };
        let state = AppState::new(&config, stores, gateway.clone());

        let app = Application::with_state(&config, state)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Callbacks answer with redirects that must be inspected, not followed.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            client,
            orders,
            carts,
            users,
            catalog,
            gateway,
            jwt: JwtService::new(&config.auth),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn token_for(&self, email: &str) -> String {
        self.jwt.issue(email).expect("Failed to issue test token")
    }

    /// Register a user directly in the store, optionally as admin.
    pub async fn register(&self, email: &str, role: Role) -> String {
        let user = storefront_service::models::User {
            id: None,
            email: email.to_string(),
            name: Some("Test Rider".to_string()),
            photo_url: None,
            role: Some(role),
        };
        let id = self
            .users
            .register(&user)
            .await
            .expect("Failed to register test user")
            .expect("User already registered");
        id.to_hex()
    }

    pub async fn add_to_cart(&self, email: &str, product_id: &str, price: f64) {
        self.carts
            .add(&NewCartItem {
                email: email.to_string(),
                product_id: product_id.to_string(),
                name: format!("{} name", product_id),
                image: String::new(),
                price,
            })
            .await
            .expect("Failed to add cart item");
    }

    pub fn checkout_body(email: &str) -> Value {
        json!({
            "email": email,
            "cartItems": [{ "productId": "p1", "quantity": 2, "name": "Helmet", "price": 500 }],
            "totalAmount": 1000,
            "customerInfo": {
                "name": "Rider",
                "address": "12 Mirpur Road",
                "city": "Dhaka",
                "postcode": "1207",
                "phone": "01700000000"
            }
        })
    }

    pub async fn post_init(&self, email: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/payment/init"))
            .bearer_auth(self.token_for(email))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Seed a cart and open a checkout for it, returning the transaction id.
    pub async fn start_checkout(&self, email: &str) -> String {
        self.add_to_cart(email, "p1", 500.0).await;
        self.add_to_cart(email, "p1", 500.0).await;

        let response = self.post_init(email, &Self::checkout_body(email)).await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.expect("Failed to parse JSON");
        body["transactionId"]
            .as_str()
            .expect("transactionId missing")
            .to_string()
    }

    pub async fn callback(
        &self,
        outcome: &str,
        transaction_id: &str,
        form: &[(&str, &str)],
    ) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/payment/{}/{}", outcome, transaction_id)))
            .form(form)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
