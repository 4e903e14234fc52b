//! Checkout initiation, gateway callbacks and the public status query.

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::Redirect,
    Json,
};
use serde_json::{Map, Value};
use service_core::error::AppError;

use crate::{
    dtos::payment::{PaymentInitRequest, PaymentInitResponse, PaymentStatusResponse},
    error::StorefrontError,
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

pub async fn init_payment(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<PaymentInitRequest>,
) -> Result<Json<PaymentInitResponse>, AppError> {
    if payload.email != user.email() {
        return Err(StorefrontError::Forbidden("Unauthorized access".to_string()).into());
    }

    let session = state.payments.initiate(payload.into()).await?;

    Ok(Json(PaymentInitResponse {
        success: true,
        payment_url: session.payment_url,
        transaction_id: session.transaction_id,
    }))
}

pub async fn payment_success(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    body: Bytes,
) -> Redirect {
    let outcome = state
        .payments
        .on_success(&transaction_id, callback_payload(&body))
        .await;
    Redirect::to(&state.payments.redirect_url(&outcome))
}

pub async fn payment_fail(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    body: Bytes,
) -> Redirect {
    let outcome = state
        .payments
        .on_fail(&transaction_id, callback_payload(&body))
        .await;
    Redirect::to(&state.payments.redirect_url(&outcome))
}

pub async fn payment_cancel(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    body: Bytes,
) -> Redirect {
    let outcome = state
        .payments
        .on_cancel(&transaction_id, callback_payload(&body))
        .await;
    Redirect::to(&state.payments.redirect_url(&outcome))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<PaymentStatusResponse>, AppError> {
    let order = state.payments.verify(&transaction_id).await?;
    Ok(Json(PaymentStatusResponse::from(&order)))
}

/// The gateway posts `application/x-www-form-urlencoded`; keep every field as
/// a JSON string for the audit trail. Anything unparseable is kept verbatim.
fn callback_payload(body: &[u8]) -> Value {
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(body) {
        Ok(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect::<Map<String, Value>>(),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Callback body is not form encoded");
            serde_json::json!({ "raw": String::from_utf8_lossy(body) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_body_becomes_json_object() {
        let payload = callback_payload(b"tran_id=txn_1&val_id=abc123&status=VALID&amount=1000.00");
        assert_eq!(payload["val_id"], "abc123");
        assert_eq!(payload["amount"], "1000.00");
    }

    #[test]
    fn empty_body_is_an_empty_object() {
        assert_eq!(callback_payload(b""), serde_json::json!({}));
    }
}
