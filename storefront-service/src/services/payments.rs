//! The payment transaction lifecycle.
//!
//! [`PaymentService`] owns the collaborators every stage needs. Initiation
//! lives in `initiator`, callback handling in `reconciler`; the status query
//! is here.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{StorefrontError, StorefrontResult};
use crate::models::{Order, OrderStatus};
use crate::services::cart_store::CartStore;
use crate::services::gateway::PaymentGateway;
use crate::services::order_store::{OrderFilter, OrderStore};

const MAX_TRANSACTION_ID_LEN: usize = 128;

/// Knobs the payment flow reads from configuration.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// Public base URL of this service; callback URLs hang off it.
    pub backend_url: String,
    /// Storefront SPA; outcome redirects land here.
    pub frontend_url: String,
    pub currency: String,
    pub validate_max_attempts: u32,
    pub validate_initial_backoff: Duration,
}

impl PaymentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            backend_url: config.urls.backend_url.trim_end_matches('/').to_string(),
            frontend_url: config.urls.frontend_url.trim_end_matches('/').to_string(),
            currency: config.gateway.currency.clone(),
            validate_max_attempts: config.gateway.validate_max_attempts,
            validate_initial_backoff: config.gateway.validate_initial_backoff(),
        }
    }
}

#[derive(Clone)]
pub struct PaymentService {
    pub(crate) orders: Arc<dyn OrderStore>,
    pub(crate) carts: Arc<dyn CartStore>,
    pub(crate) gateway: Arc<dyn PaymentGateway>,
    pub(crate) settings: PaymentSettings,
}

impl PaymentService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        carts: Arc<dyn CartStore>,
        gateway: Arc<dyn PaymentGateway>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            orders,
            carts,
            gateway,
            settings,
        }
    }

    /// Current state of one checkout attempt. Callers project this before it
    /// leaves the service; see `PaymentStatusResponse`.
    pub async fn verify(&self, transaction_id: &str) -> StorefrontResult<Order> {
        let order = self.order(transaction_id).await?;
        tracing::debug!(
            transaction_id = %transaction_id,
            status = %order.status,
            "Payment status queried"
        );
        Ok(order)
    }

    pub async fn order(&self, transaction_id: &str) -> StorefrontResult<Order> {
        validate_transaction_id(transaction_id)?;
        self.orders
            .find(transaction_id)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(transaction_id.to_string()))
    }

    pub async fn orders_for(&self, email: &str) -> StorefrontResult<Vec<Order>> {
        self.orders
            .list(&OrderFilter {
                email: Some(email.to_string()),
                status: None,
            })
            .await
    }

    pub async fn all_orders(&self, status: Option<OrderStatus>) -> StorefrontResult<Vec<Order>> {
        self.orders.list(&OrderFilter { email: None, status }).await
    }

    /// Force an order into `status`, outside the automatic lifecycle.
    pub async fn override_status(
        &self,
        transaction_id: &str,
        status: OrderStatus,
        operator: &str,
    ) -> StorefrontResult<Order> {
        validate_transaction_id(transaction_id)?;
        // Pending is only ever the initial state; callbacks own the move out.
        if status == OrderStatus::Pending {
            return Err(StorefrontError::InvalidRequest(
                "Orders cannot be overridden back to pending".to_string(),
            ));
        }

        let order = self
            .orders
            .override_status(transaction_id, status, operator)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(transaction_id.to_string()))?;

        let from = order
            .admin_overrides
            .last()
            .map(|entry| entry.from.as_str())
            .unwrap_or("unknown");

        tracing::warn!(
            target: "audit",
            transaction_id = %transaction_id,
            from = %from,
            to = %status,
            operator = %operator,
            "Order status overridden by admin"
        );
        crate::services::metrics::record_admin_override(status.as_str());

        Ok(order)
    }
}

/// Transaction ids arrive in URL paths from untrusted callers; reject anything
/// that could not have been minted by `new_transaction_id`-style generators.
pub fn validate_transaction_id(transaction_id: &str) -> StorefrontResult<()> {
    let well_formed = !transaction_id.is_empty()
        && transaction_id.len() <= MAX_TRANSACTION_ID_LEN
        && transaction_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if well_formed {
        Ok(())
    } else {
        Err(StorefrontError::InvalidRequest(
            "Malformed transaction id".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_generated_style_ids() {
        assert!(validate_transaction_id("txn_3f2a9c0d1e8b4a7f9c6d5e4f3a2b1c0d").is_ok());
        assert!(validate_transaction_id("TXN-1712345678-ab12").is_ok());
    }

    #[test]
    fn rejects_malformed_ids() {
        for id in ["", "txn 1", "txn/../1", "txn_1?x=1", "ünïcode"] {
            assert!(validate_transaction_id(id).is_err(), "{id:?}");
        }
        assert!(validate_transaction_id(&"a".repeat(129)).is_err());
    }
}
