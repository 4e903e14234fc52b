//! Gateway callbacks: success, fail and cancel.
//!
//! Every callback ends in a browser redirect, so none of these methods return
//! errors. They return a [`CallbackOutcome`] and the handler turns it into a
//! frontend URL.
//!
//! All transitions go through `OrderStore::settle`, which only matches a
//! `pending` order. Whoever loses that race (a duplicate or late callback) is
//! sent to the page for whatever the order already settled as, and never
//! touches the cart.

use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::StorefrontResult;
use crate::models::{Order, OrderStatus, Settlement};
use crate::services::gateway::{GatewayError, ValidationResponse};
use crate::services::metrics;
use crate::services::payments::{validate_transaction_id, PaymentService};

/// Which callback endpoint the gateway hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Success,
    Fail,
    Cancel,
}

impl CallbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackKind::Success => "success",
            CallbackKind::Fail => "fail",
            CallbackKind::Cancel => "cancel",
        }
    }
}

/// Where the customer's browser should land after a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Confirmed(String),
    Failed(String),
    Cancelled(String),
    OrderNotFound,
    InvalidTransaction,
    ServerError,
}

impl CallbackOutcome {
    /// Path on the storefront frontend, starting with `/payment/`.
    pub fn frontend_path(&self) -> String {
        match self {
            CallbackOutcome::Confirmed(id) => format!("/payment/success/{}", id),
            CallbackOutcome::Failed(id) => format!("/payment/fail/{}", id),
            CallbackOutcome::Cancelled(id) => format!("/payment/cancel/{}", id),
            CallbackOutcome::OrderNotFound => "/payment/error?reason=order_not_found".to_string(),
            CallbackOutcome::InvalidTransaction => {
                "/payment/error?reason=invalid_transaction".to_string()
            }
            CallbackOutcome::ServerError => "/payment/error?reason=server_error".to_string(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            CallbackOutcome::Confirmed(_) => "confirmed",
            CallbackOutcome::Failed(_) => "failed",
            CallbackOutcome::Cancelled(_) => "cancelled",
            CallbackOutcome::OrderNotFound => "order_not_found",
            CallbackOutcome::InvalidTransaction => "invalid_transaction",
            CallbackOutcome::ServerError => "server_error",
        }
    }

    /// The page for an order's current status. Fulfilment states only follow a
    /// confirmed payment.
    fn for_order(order: &Order, requested: CallbackKind) -> Self {
        let id = order.transaction_id.clone();
        match order.status {
            OrderStatus::Confirmed
            | OrderStatus::Processing
            | OrderStatus::Shipped
            | OrderStatus::Delivered => CallbackOutcome::Confirmed(id),
            OrderStatus::Failed => CallbackOutcome::Failed(id),
            OrderStatus::Cancelled => CallbackOutcome::Cancelled(id),
            OrderStatus::Pending => Self::for_kind(requested, id),
        }
    }

    fn for_kind(kind: CallbackKind, id: String) -> Self {
        match kind {
            CallbackKind::Success => CallbackOutcome::Confirmed(id),
            CallbackKind::Fail => CallbackOutcome::Failed(id),
            CallbackKind::Cancel => CallbackOutcome::Cancelled(id),
        }
    }
}

/// What asking the gateway about a success callback established.
enum Verdict {
    Paid(ValidationResponse),
    NotPaid(Value),
}

impl PaymentService {
    /// Absolute frontend URL for an outcome.
    pub fn redirect_url(&self, outcome: &CallbackOutcome) -> String {
        format!("{}{}", self.settings.frontend_url, outcome.frontend_path())
    }

    pub async fn on_success(&self, transaction_id: &str, payload: Value) -> CallbackOutcome {
        self.handle(CallbackKind::Success, transaction_id, payload)
            .await
    }

    pub async fn on_fail(&self, transaction_id: &str, payload: Value) -> CallbackOutcome {
        self.handle(CallbackKind::Fail, transaction_id, payload).await
    }

    pub async fn on_cancel(&self, transaction_id: &str, payload: Value) -> CallbackOutcome {
        self.handle(CallbackKind::Cancel, transaction_id, payload)
            .await
    }

    async fn handle(
        &self,
        kind: CallbackKind,
        transaction_id: &str,
        payload: Value,
    ) -> CallbackOutcome {
        let outcome = if validate_transaction_id(transaction_id).is_err() {
            tracing::warn!(
                kind = kind.as_str(),
                transaction_id = %transaction_id,
                "Callback with malformed transaction id"
            );
            CallbackOutcome::InvalidTransaction
        } else {
            let result = match kind {
                CallbackKind::Success => self.reconcile_success(transaction_id, payload).await,
                CallbackKind::Fail => {
                    self.reconcile_unverified(kind, transaction_id, Settlement::failed(payload, None))
                        .await
                }
                CallbackKind::Cancel => {
                    self.reconcile_unverified(kind, transaction_id, Settlement::cancelled(payload))
                        .await
                }
            };

            result.unwrap_or_else(|e| {
                tracing::error!(
                    kind = kind.as_str(),
                    transaction_id = %transaction_id,
                    error = %e,
                    "Callback reconciliation failed"
                );
                CallbackOutcome::ServerError
            })
        };

        metrics::record_callback(kind.as_str(), outcome.label());
        outcome
    }

    /// Fail and cancel: the gateway is reporting the outcome itself, so there
    /// is nothing to validate.
    async fn reconcile_unverified(
        &self,
        kind: CallbackKind,
        transaction_id: &str,
        settlement: Settlement,
    ) -> StorefrontResult<CallbackOutcome> {
        if self.orders.settle(transaction_id, &settlement).await? {
            tracing::info!(
                transaction_id = %transaction_id,
                status = %settlement.status(),
                "Order settled from gateway callback"
            );
            return Ok(CallbackOutcome::for_kind(kind, transaction_id.to_string()));
        }

        self.already_settled(kind, transaction_id).await
    }

    async fn reconcile_success(
        &self,
        transaction_id: &str,
        payload: Value,
    ) -> StorefrontResult<CallbackOutcome> {
        let existing = self.orders.find(transaction_id).await?;
        if let Some(order) = existing.as_ref().filter(|o| o.status.is_terminal()) {
            tracing::info!(
                transaction_id = %transaction_id,
                status = %order.status,
                "Duplicate success callback for settled order"
            );
            return Ok(CallbackOutcome::for_order(order, CallbackKind::Success));
        }

        match self.verdict(transaction_id, &payload).await {
            Verdict::Paid(validation) => {
                let Some(order) = existing else {
                    tracing::warn!(
                        transaction_id = %transaction_id,
                        "Validated payment for unknown order"
                    );
                    return Ok(CallbackOutcome::OrderNotFound);
                };

                let settlement = Settlement::confirmed(payload, validation.raw);
                if !self.orders.settle(transaction_id, &settlement).await? {
                    return self.already_settled(CallbackKind::Success, transaction_id).await;
                }

                tracing::info!(
                    transaction_id = %transaction_id,
                    email = %order.email,
                    "Payment confirmed"
                );
                self.clear_cart(&order).await;
                Ok(CallbackOutcome::Confirmed(transaction_id.to_string()))
            }
            Verdict::NotPaid(evidence) => {
                let settlement = Settlement::failed(payload, Some(evidence));
                if self.orders.settle(transaction_id, &settlement).await? {
                    tracing::warn!(
                        transaction_id = %transaction_id,
                        "Success callback not confirmed by gateway, order failed"
                    );
                    return Ok(CallbackOutcome::Failed(transaction_id.to_string()));
                }
                match self.orders.find(transaction_id).await? {
                    Some(order) => Ok(CallbackOutcome::for_order(&order, CallbackKind::Fail)),
                    None => Ok(CallbackOutcome::Failed(transaction_id.to_string())),
                }
            }
        }
    }

    /// The conditional update matched nothing: report the order's current
    /// outcome, or the requested one if the order does not exist.
    async fn already_settled(
        &self,
        kind: CallbackKind,
        transaction_id: &str,
    ) -> StorefrontResult<CallbackOutcome> {
        match self.orders.find(transaction_id).await? {
            Some(order) => {
                tracing::info!(
                    kind = kind.as_str(),
                    transaction_id = %transaction_id,
                    status = %order.status,
                    "Callback ignored, order already settled"
                );
                Ok(CallbackOutcome::for_order(&order, kind))
            }
            None => {
                tracing::warn!(
                    kind = kind.as_str(),
                    transaction_id = %transaction_id,
                    "Callback for unknown order"
                );
                Ok(CallbackOutcome::for_kind(kind, transaction_id.to_string()))
            }
        }
    }

    /// Only an affirmative answer from the validation API counts. The callback
    /// body is reachable without the gateway and proves nothing.
    async fn verdict(&self, transaction_id: &str, payload: &Value) -> Verdict {
        let val_id = payload
            .get("val_id")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let Some(val_id) = val_id else {
            return Verdict::NotPaid(json!({ "error": "missing val_id" }));
        };

        match self.validate_with_retry(val_id).await {
            Ok(validation) if !validation.is_affirmative() => Verdict::NotPaid(validation.raw),
            Ok(validation) => match validation.tran_id.as_deref() {
                Some(tran_id) if tran_id != transaction_id => {
                    tracing::warn!(
                        transaction_id = %transaction_id,
                        validated_tran_id = %tran_id,
                        "Validation belongs to a different transaction"
                    );
                    Verdict::NotPaid(validation.raw)
                }
                _ => Verdict::Paid(validation),
            },
            Err(e) => {
                tracing::error!(
                    transaction_id = %transaction_id,
                    error = %e,
                    "Gateway validation unavailable, failing closed"
                );
                Verdict::NotPaid(json!({ "error": e.to_string() }))
            }
        }
    }

    async fn validate_with_retry(&self, val_id: &str) -> Result<ValidationResponse, GatewayError> {
        let max_attempts = self.settings.validate_max_attempts.max(1);
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.settings.validate_initial_backoff)
            .with_max_elapsed_time(None)
            .build();

        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let gateway = &self.gateway;

        retry(policy, || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            match gateway.validate(val_id).await {
                Ok(response) => {
                    metrics::record_validation_attempt("ok");
                    Ok(response)
                }
                Err(e) if attempt < max_attempts && is_transient(&e) => {
                    metrics::record_validation_attempt("retry");
                    tracing::warn!(attempt, error = %e, "Gateway validation failed, retrying");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => {
                    metrics::record_validation_attempt("error");
                    Err(backoff::Error::permanent(e))
                }
            }
        })
        .await
    }

    /// Cart clearing follows a confirmation that has already been committed;
    /// a failure here is logged, not surfaced to the customer.
    async fn clear_cart(&self, order: &Order) {
        match self.carts.clear(&order.email).await {
            Ok(removed) => tracing::info!(
                transaction_id = %order.transaction_id,
                removed,
                "Cart cleared after confirmed payment"
            ),
            Err(e) => tracing::error!(
                transaction_id = %order.transaction_id,
                email = %order.email,
                error = %e,
                "Failed to clear cart after confirmed payment"
            ),
        }
    }
}

fn is_transient(err: &GatewayError) -> bool {
    match err {
        GatewayError::Transport(_) | GatewayError::Timeout => true,
        GatewayError::Status { status, .. } => *status >= 500,
        GatewayError::Decode(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_map_to_frontend_pages() {
        assert_eq!(
            CallbackOutcome::Confirmed("txn_1".into()).frontend_path(),
            "/payment/success/txn_1"
        );
        assert_eq!(
            CallbackOutcome::Failed("txn_1".into()).frontend_path(),
            "/payment/fail/txn_1"
        );
        assert_eq!(
            CallbackOutcome::Cancelled("txn_1".into()).frontend_path(),
            "/payment/cancel/txn_1"
        );
        assert_eq!(
            CallbackOutcome::OrderNotFound.frontend_path(),
            "/payment/error?reason=order_not_found"
        );
        assert_eq!(
            CallbackOutcome::ServerError.frontend_path(),
            "/payment/error?reason=server_error"
        );
    }

    #[test]
    fn only_upstream_faults_are_retried() {
        assert!(is_transient(&GatewayError::Timeout));
        assert!(is_transient(&GatewayError::Status {
            status: 503,
            body: String::new()
        }));
        assert!(!is_transient(&GatewayError::Status {
            status: 400,
            body: String::new()
        }));
        assert!(!is_transient(&GatewayError::Decode("bad json".into())));
    }
}
