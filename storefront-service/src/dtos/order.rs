use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::to_utc;
use crate::models::{AdminOverride, CustomerInfo, Order, OrderItem, OrderStatus, PaymentStatus};

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrderQuery {
    pub status: Option<String>,
}

/// Body of `PATCH /admin/orders/{transactionId}`. Unknown status strings are
/// rejected while deserializing.
#[derive(Debug, Deserialize, Validate)]
pub struct StatusOverrideRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverrideView {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub by: String,
    pub at: DateTime<Utc>,
}

impl From<&AdminOverride> for AdminOverrideView {
    fn from(entry: &AdminOverride) -> Self {
        Self {
            from: entry.from,
            to: entry.to,
            by: entry.by.clone(),
            at: to_utc(entry.at),
        }
    }
}

/// Full order as returned to its owner and to admins.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub transaction_id: String,
    pub email: String,
    pub customer_info: CustomerInfo,
    pub cart_items: Vec<OrderItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub admin_overrides: Vec<AdminOverrideView>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.map(|id| id.to_hex()),
            transaction_id: order.transaction_id,
            email: order.email,
            customer_info: order.customer_info,
            cart_items: order.cart_items,
            total_amount: order.total_amount,
            status: order.status,
            payment_status: order.payment_status,
            payment_details: order.payment_details,
            validation_details: order.validation_details,
            created_at: to_utc(order.created_at),
            paid_at: order.paid_at.map(to_utc),
            failed_at: order.failed_at.map(to_utc),
            cancelled_at: order.cancelled_at.map(to_utc),
            updated_at: order.updated_at.map(to_utc),
            admin_overrides: order.admin_overrides.iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOverrideResponse {
    pub message: String,
    pub order: OrderResponse,
}
