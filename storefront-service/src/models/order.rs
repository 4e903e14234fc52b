//! Order documents and the payment lifecycle they move through.

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Lifecycle status of an order.
///
/// `Pending` is the only state automatic transitions leave. The fulfilment
/// states are reachable through the admin override only.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Failed,
    Cancelled,
    Processing,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = crate::error::StorefrontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase())).map_err(|_| {
            crate::error::StorefrontError::InvalidRequest(format!("Invalid order status: {}", s))
        })
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status in the gateway's vocabulary.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
}

/// Shipping and billing details captured at checkout.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[validate(length(min = 1, message = "postcode is required"))]
    pub postcode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
}

/// One line of the cart snapshot frozen into an order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[validate(length(min = 1, message = "productId is required"))]
    pub product_id: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: f64,
}

/// Audit entry appended whenever an operator forces an order's status.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverride {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub by: String,
    pub at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub transaction_id: String,
    pub email: String,
    pub customer_info: CustomerInfo,
    pub cart_items: Vec<OrderItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_details: Option<serde_json::Value>,
    pub created_at: DateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admin_overrides: Vec<AdminOverride>,
}

impl Order {
    /// A freshly initiated checkout awaiting the gateway's verdict.
    pub fn pending(
        transaction_id: String,
        email: String,
        customer_info: CustomerInfo,
        cart_items: Vec<OrderItem>,
        total_amount: f64,
    ) -> Self {
        Self {
            id: None,
            transaction_id,
            email,
            customer_info,
            cart_items,
            total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_details: None,
            validation_details: None,
            created_at: DateTime::now(),
            paid_at: None,
            failed_at: None,
            cancelled_at: None,
            updated_at: None,
            admin_overrides: Vec::new(),
        }
    }

    /// Apply a settlement in place. Returns `false` without touching anything
    /// when the order has already left `pending`.
    pub fn apply(&mut self, settlement: &Settlement) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        self.status = settlement.status;
        self.payment_status = settlement.payment_status();
        self.payment_details = Some(settlement.payment_details.clone());
        if settlement.validation_details.is_some() {
            self.validation_details = settlement.validation_details.clone();
        }
        match settlement.status {
            OrderStatus::Confirmed => self.paid_at = Some(settlement.at),
            OrderStatus::Cancelled => self.cancelled_at = Some(settlement.at),
            _ => self.failed_at = Some(settlement.at),
        }
        true
    }
}

/// The terminal transition a callback asks for, with its audit payloads.
#[derive(Debug, Clone)]
pub struct Settlement {
    status: OrderStatus,
    pub payment_details: serde_json::Value,
    pub validation_details: Option<serde_json::Value>,
    pub at: DateTime,
}

impl Settlement {
    pub fn confirmed(payment_details: serde_json::Value, validation: serde_json::Value) -> Self {
        Self {
            status: OrderStatus::Confirmed,
            payment_details,
            validation_details: Some(validation),
            at: DateTime::now(),
        }
    }

    pub fn failed(
        payment_details: serde_json::Value,
        validation: Option<serde_json::Value>,
    ) -> Self {
        Self {
            status: OrderStatus::Failed,
            payment_details,
            validation_details: validation,
            at: DateTime::now(),
        }
    }

    pub fn cancelled(payment_details: serde_json::Value) -> Self {
        Self {
            status: OrderStatus::Cancelled,
            payment_details,
            validation_details: None,
            at: DateTime::now(),
        }
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        match self.status {
            OrderStatus::Confirmed => PaymentStatus::Paid,
            OrderStatus::Cancelled => PaymentStatus::Cancelled,
            _ => PaymentStatus::Failed,
        }
    }

    /// Name of the timestamp field this settlement sets exactly once.
    pub fn timestamp_field(&self) -> &'static str {
        match self.status {
            OrderStatus::Confirmed => "paidAt",
            OrderStatus::Cancelled => "cancelledAt",
            _ => "failedAt",
        }
    }
}
