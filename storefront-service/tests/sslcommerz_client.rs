use secrecy::Secret;
use serde_json::json;
use storefront_service::config::GatewayConfig;
use storefront_service::services::gateway::{GatewayError, InitPaymentRequest, PaymentGateway};
use storefront_service::services::SslCommerzClient;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> SslCommerzClient {
    SslCommerzClient::new(GatewayConfig {
        store_id: "testbox".to_string(),
        store_password: Secret::new("qwerty".to_string()),
        api_base_url: server.uri(),
        currency: "BDT".to_string(),
        validate_max_attempts: 2,
        validate_initial_backoff_ms: 10,
        request_timeout_secs: 5,
    })
    .expect("Failed to build gateway client")
}

fn init_request() -> InitPaymentRequest {
    InitPaymentRequest {
        total_amount: 1000.0,
        currency: "BDT".to_string(),
        tran_id: "txn_abc".to_string(),
        success_url: "http://backend.test/payment/success/txn_abc".to_string(),
        fail_url: "http://backend.test/payment/fail/txn_abc".to_string(),
        cancel_url: "http://backend.test/payment/cancel/txn_abc".to_string(),
        cus_name: "Rider".to_string(),
        cus_email: "rider@example.com".to_string(),
        cus_add1: "12 Mirpur Road".to_string(),
        cus_add2: String::new(),
        cus_city: "Dhaka".to_string(),
        cus_state: "Dhaka".to_string(),
        cus_postcode: "1207".to_string(),
        cus_country: "Bangladesh".to_string(),
        cus_phone: "01700000000".to_string(),
        cus_fax: String::new(),
        ship_name: "Rider".to_string(),
        ship_add1: "12 Mirpur Road".to_string(),
        ship_add2: String::new(),
        ship_city: "Dhaka".to_string(),
        ship_state: "Dhaka".to_string(),
        ship_postcode: "1207".to_string(),
        ship_country: "Bangladesh".to_string(),
        product_name: "Grips & Gears Order - 1 items".to_string(),
        product_category: "Motorcycle Parts".to_string(),
        product_profile: "physical-goods".to_string(),
        num_of_item: 1,
        shipping_method: "Courier".to_string(),
        multi_card_name: "mastercard,visacard,amexcard".to_string(),
        value_a: "rider@example.com".to_string(),
        value_b: "[]".to_string(),
        value_c: String::new(),
        value_d: String::new(),
    }
}

#[tokio::test]
async fn init_posts_credentials_and_parses_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gwprocess/v4/api.php"))
        .and(body_string_contains("store_id=testbox"))
        .and(body_string_contains("store_passwd=qwerty"))
        .and(body_string_contains("tran_id=txn_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "SUCCESS",
            "GatewayPageURL": "https://sandbox.sslcommerz.com/EasyCheckOut/abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server).init(&init_request()).await.unwrap();

    assert_eq!(
        response.redirect_url(),
        Some("https://sandbox.sslcommerz.com/EasyCheckOut/abc")
    );
    assert_eq!(response.raw["status"], "SUCCESS");
}

#[tokio::test]
async fn init_refusal_keeps_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gwprocess/v4/api.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "FAILED",
            "failedreason": "Store Credential Error Or Store is De-active"
        })))
        .mount(&server)
        .await;

    let response = client_for(&server).init(&init_request()).await.unwrap();

    assert!(response.redirect_url().is_none());
    assert_eq!(response.raw["status"], "FAILED");
}

#[tokio::test]
async fn validate_queries_by_val_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/validator/api/validationserverAPI.php"))
        .and(query_param("val_id", "val_abc123"))
        .and(query_param("store_id", "testbox"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "VALID",
            "tran_id": "txn_abc",
            "amount": "1000.00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server).validate("val_abc123").await.unwrap();

    assert!(response.is_affirmative());
    assert_eq!(response.tran_id.as_deref(), Some("txn_abc"));
    assert_eq!(response.raw["amount"], "1000.00");
}

#[tokio::test]
async fn server_error_surfaces_as_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/validator/api/validationserverAPI.php"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client_for(&server).validate("val_abc123").await.unwrap_err();

    match err {
        GatewayError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/validator/api/validationserverAPI.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).validate("val_abc123").await.unwrap_err();

    assert!(matches!(err, GatewayError::Decode(_)));
}
