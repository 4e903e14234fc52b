mod common;

use common::{InitScript, TestApp, BACKEND_URL, CHECKOUT_URL};
use serde_json::{json, Value};
use storefront_service::models::{OrderStatus, PaymentStatus};
use storefront_service::services::OrderStore;

const EMAIL: &str = "rider@example.com";

#[tokio::test]
async fn init_creates_pending_order_and_returns_gateway_url() {
    let app = TestApp::spawn().await;

    let response = app.post_init(EMAIL, &TestApp::checkout_body(EMAIL)).await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["success"], true);
    assert_eq!(body["paymentUrl"], CHECKOUT_URL);

    let transaction_id = body["transactionId"].as_str().unwrap();
    let order = app.orders.find(transaction_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.email, EMAIL);
    assert_eq!(order.total_amount, 1000.0);
    assert_eq!(order.cart_items.len(), 1);
    assert_eq!(order.cart_items[0].quantity, 2);
    assert!(order.paid_at.is_none());
}

#[tokio::test]
async fn init_sends_callback_urls_and_cart_snapshot_to_gateway() {
    let app = TestApp::spawn().await;

    let transaction_id = app.start_checkout(EMAIL).await;

    let request = app.gateway.last_init_request().expect("No init request captured");
    assert_eq!(request.tran_id, transaction_id);
    assert_eq!(request.total_amount, 1000.0);
    assert_eq!(request.currency, "BDT");
    assert_eq!(
        request.success_url,
        format!("{}/payment/success/{}", BACKEND_URL, transaction_id)
    );
    assert_eq!(
        request.fail_url,
        format!("{}/payment/fail/{}", BACKEND_URL, transaction_id)
    );
    assert_eq!(
        request.cancel_url,
        format!("{}/payment/cancel/{}", BACKEND_URL, transaction_id)
    );
    assert_eq!(request.cus_email, EMAIL);
    assert_eq!(request.cus_country, "Bangladesh");
    assert_eq!(request.num_of_item, 1);
    assert_eq!(request.multi_card_name, "mastercard,visacard,amexcard");
    assert_eq!(request.value_a, EMAIL);

    let snapshot: Value = serde_json::from_str(&request.value_b).unwrap();
    assert_eq!(snapshot, json!([{ "productId": "p1", "quantity": 2 }]));
}

#[tokio::test]
async fn consecutive_checkouts_get_distinct_transaction_ids() {
    let app = TestApp::spawn().await;

    let first = app.post_init(EMAIL, &TestApp::checkout_body(EMAIL)).await;
    let second = app.post_init(EMAIL, &TestApp::checkout_body(EMAIL)).await;

    let first: Value = first.json().await.unwrap();
    let second: Value = second.json().await.unwrap();
    assert_ne!(first["transactionId"], second["transactionId"]);
    assert_eq!(app.orders.len(), 2);
}

#[tokio::test]
async fn empty_cart_is_rejected_without_calling_gateway() {
    let app = TestApp::spawn().await;

    let mut body = TestApp::checkout_body(EMAIL);
    body["cartItems"] = json!([]);
    let response = app.post_init(EMAIL, &body).await;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Cart is empty");
    assert_eq!(app.gateway.init_calls(), 0);
    assert!(app.orders.is_empty());
}

#[tokio::test]
async fn malformed_checkout_payload_is_rejected() {
    let app = TestApp::spawn().await;

    let test_cases = vec![
        (json!({ "email": EMAIL }), "missing fields"),
        (
            {
                let mut body = TestApp::checkout_body(EMAIL);
                body["totalAmount"] = json!(-5);
                body
            },
            "negative total",
        ),
        (
            {
                let mut body = TestApp::checkout_body(EMAIL);
                body["cartItems"][0]["quantity"] = json!(0);
                body
            },
            "zero quantity",
        ),
    ];

    for (body, description) in test_cases {
        let response = app.post_init(EMAIL, &body).await;
        assert_eq!(
            response.status(),
            400,
            "Expected 400 for {}",
            description
        );
    }
    assert_eq!(app.gateway.init_calls(), 0);
}

#[tokio::test]
async fn gateway_refusal_returns_details_and_creates_no_order() {
    let app = TestApp::spawn().await;
    app.gateway.script_init(InitScript::Reject(json!({
        "status": "FAILED",
        "failedreason": "Store Credential Error Or Store is De-active"
    })));

    let response = app.post_init(EMAIL, &TestApp::checkout_body(EMAIL)).await;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Payment initialization failed");
    assert_eq!(body["details"]["status"], "FAILED");
    assert_eq!(app.gateway.init_calls(), 1);
    assert!(app.orders.is_empty());
}

#[tokio::test]
async fn blank_gateway_url_counts_as_refusal() {
    let app = TestApp::spawn().await;
    app.gateway.script_init(InitScript::Reject(json!({
        "status": "SUCCESS",
        "GatewayPageURL": ""
    })));

    let response = app.post_init(EMAIL, &TestApp::checkout_body(EMAIL)).await;

    assert_eq!(response.status(), 400);
    assert!(app.orders.is_empty());
}

#[tokio::test]
async fn unreachable_gateway_is_a_bad_gateway() {
    let app = TestApp::spawn().await;
    app.gateway.script_init(InitScript::Unreachable);

    let response = app.post_init(EMAIL, &TestApp::checkout_body(EMAIL)).await;

    assert_eq!(response.status(), 502);
    assert!(app.orders.is_empty());
}

#[tokio::test]
async fn init_requires_a_token() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url("/payment/init"))
        .json(&TestApp::checkout_body(EMAIL))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 401);
    assert_eq!(app.gateway.init_calls(), 0);
}

#[tokio::test]
async fn init_rejects_checkout_for_another_customer() {
    let app = TestApp::spawn().await;

    let response = app
        .post_init("someone.else@example.com", &TestApp::checkout_body(EMAIL))
        .await;

    assert_eq!(response.status(), 403);
    assert_eq!(app.gateway.init_calls(), 0);
}
