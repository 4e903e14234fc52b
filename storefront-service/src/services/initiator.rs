//! Opening a checkout session with the gateway.

use serde_json::json;
use uuid::Uuid;

use crate::error::{StorefrontError, StorefrontResult};
use crate::models::{CustomerInfo, Order, OrderItem};
use crate::services::gateway::InitPaymentRequest;
use crate::services::metrics;
use crate::services::payments::PaymentService;

const DEFAULT_COUNTRY: &str = "Bangladesh";
const PRODUCT_CATEGORY: &str = "Motorcycle Parts";
const ACCEPTED_CARDS: &str = "mastercard,visacard,amexcard";

/// Everything needed to start paying for a cart.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub email: String,
    pub customer_info: CustomerInfo,
    pub cart_items: Vec<OrderItem>,
    pub total_amount: f64,
}

/// Where to send the customer, and the id to poll afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub transaction_id: String,
    pub payment_url: String,
}

/// A fresh transaction id: `txn_` followed by a random UUIDv4 in hex.
pub fn new_transaction_id() -> String {
    format!("txn_{}", Uuid::new_v4().simple())
}

impl PaymentService {
    /// Ask the gateway for a hosted checkout page and record the pending
    /// order once it has issued one.
    ///
    /// Nothing is persisted unless the gateway returns a usable redirect, and
    /// the cart is left alone until the payment is confirmed.
    pub async fn initiate(&self, request: CheckoutRequest) -> StorefrontResult<CheckoutSession> {
        check_request(&request)?;

        let transaction_id = new_transaction_id();
        let gateway_request = self.build_gateway_request(&transaction_id, &request);

        tracing::info!(
            transaction_id = %transaction_id,
            email = %request.email,
            items = request.cart_items.len(),
            total_amount = request.total_amount,
            "Initiating payment"
        );

        let response = self.gateway.init(&gateway_request).await.map_err(|e| {
            tracing::error!(
                transaction_id = %transaction_id,
                error = %e,
                "Gateway init call failed"
            );
            metrics::record_payment_init("gateway_error");
            StorefrontError::from(e)
        })?;

        let Some(payment_url) = response.redirect_url().map(str::to_string) else {
            tracing::warn!(
                transaction_id = %transaction_id,
                status = ?response.status,
                reason = ?response.failed_reason,
                "Gateway did not issue a checkout page"
            );
            metrics::record_payment_init("rejected");
            return Err(StorefrontError::PaymentInitFailed {
                details: response.raw,
            });
        };

        let order = Order::pending(
            transaction_id.clone(),
            request.email,
            request.customer_info,
            request.cart_items,
            request.total_amount,
        );
        self.orders.insert(&order).await.map_err(|e| {
            tracing::error!(
                transaction_id = %transaction_id,
                error = %e,
                "Failed to persist pending order after gateway init"
            );
            e
        })?;

        metrics::record_payment_init("created");
        tracing::info!(transaction_id = %transaction_id, "Pending order created");

        Ok(CheckoutSession {
            transaction_id,
            payment_url,
        })
    }

    fn build_gateway_request(
        &self,
        transaction_id: &str,
        request: &CheckoutRequest,
    ) -> InitPaymentRequest {
        let callback = |outcome: &str| {
            format!(
                "{}/payment/{}/{}",
                self.settings.backend_url, outcome, transaction_id
            )
        };

        let customer = &request.customer_info;
        let address2 = customer.address2.clone().unwrap_or_default();
        let state = customer.state.clone().unwrap_or_else(|| customer.city.clone());
        let country = customer
            .country
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());

        let snapshot: Vec<_> = request
            .cart_items
            .iter()
            .map(|item| json!({ "productId": item.product_id, "quantity": item.quantity }))
            .collect();

        InitPaymentRequest {
            total_amount: request.total_amount,
            currency: self.settings.currency.clone(),
            tran_id: transaction_id.to_string(),
            success_url: callback("success"),
            fail_url: callback("fail"),
            cancel_url: callback("cancel"),

            cus_name: customer.name.clone(),
            cus_email: request.email.clone(),
            cus_add1: customer.address.clone(),
            cus_add2: address2.clone(),
            cus_city: customer.city.clone(),
            cus_state: state.clone(),
            cus_postcode: customer.postcode.clone(),
            cus_country: country.clone(),
            cus_phone: customer.phone.clone(),
            cus_fax: customer.phone.clone(),

            ship_name: customer.name.clone(),
            ship_add1: customer.address.clone(),
            ship_add2: address2,
            ship_city: customer.city.clone(),
            ship_state: state,
            ship_postcode: customer.postcode.clone(),
            ship_country: country,

            product_name: format!("Grips & Gears Order - {} items", request.cart_items.len()),
            product_category: PRODUCT_CATEGORY.to_string(),
            product_profile: "general".to_string(),
            num_of_item: request.cart_items.len(),
            shipping_method: "Courier".to_string(),
            multi_card_name: ACCEPTED_CARDS.to_string(),

            value_a: request.email.clone(),
            value_b: serde_json::Value::Array(snapshot).to_string(),
            value_c: String::new(),
            value_d: String::new(),
        }
    }
}

fn check_request(request: &CheckoutRequest) -> StorefrontResult<()> {
    if request.cart_items.is_empty() {
        return Err(StorefrontError::InvalidRequest("Cart is empty".to_string()));
    }
    if !request.total_amount.is_finite() || request.total_amount <= 0.0 {
        return Err(StorefrontError::InvalidRequest(
            "Total amount must be a positive number".to_string(),
        ));
    }
    if request.email.trim().is_empty() {
        return Err(StorefrontError::InvalidRequest(
            "Email is required".to_string(),
        ));
    }
    if let Some(item) = request
        .cart_items
        .iter()
        .find(|item| item.quantity == 0 || !item.price.is_finite() || item.price < 0.0)
    {
        return Err(StorefrontError::InvalidRequest(format!(
            "Invalid cart line for product {}",
            item.product_id
        )));
    }
    Ok(())
}
