use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::to_utc;
use crate::models::{CustomerInfo, Order, OrderItem, OrderStatus, PaymentStatus};
use crate::services::CheckoutRequest;

/// Body of `POST /payment/init`.
///
/// An empty `cartItems` passes validation on purpose; the initiator rejects
/// it with its own message.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(nested)]
    #[serde(default)]
    pub cart_items: Vec<OrderItem>,
    pub total_amount: f64,
    #[validate(nested)]
    pub customer_info: CustomerInfo,
}

impl From<PaymentInitRequest> for CheckoutRequest {
    fn from(req: PaymentInitRequest) -> Self {
        Self {
            email: req.email,
            customer_info: req.customer_info,
            cart_items: req.cart_items,
            total_amount: req.total_amount,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitResponse {
    pub success: bool,
    pub payment_url: String,
    pub transaction_id: String,
}

/// What the unauthenticated status endpoint may reveal about an order: no
/// cart, no customer details.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub transaction_id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: f64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<&Order> for PaymentStatusResponse {
    fn from(order: &Order) -> Self {
        Self {
            transaction_id: order.transaction_id.clone(),
            status: order.status,
            payment_status: order.payment_status,
            total_amount: order.total_amount,
            created_at: to_utc(order.created_at),
            paid_at: order.paid_at.map(to_utc),
            failed_at: order.failed_at.map(to_utc),
            cancelled_at: order.cancelled_at.map(to_utc),
        }
    }
}
