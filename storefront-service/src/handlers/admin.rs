use axum::{
    extract::{Path, Query, State},
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::order::{AdminOrderQuery, OrderResponse, StatusOverrideRequest, StatusOverrideResponse},
    middleware::AuthUser,
    models::OrderStatus,
    utils::ValidatedJson,
    AppState,
};

/// Every order, newest first. `?status=pending` is how stale checkouts are
/// found for manual resolution.
pub async fn list_all_orders(
    State(state): State<AppState>,
    Query(query): Query<AdminOrderQuery>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;

    let orders = state.payments.all_orders(status).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

pub async fn override_order_status(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(transaction_id): Path<String>,
    ValidatedJson(payload): ValidatedJson<StatusOverrideRequest>,
) -> Result<Json<StatusOverrideResponse>, AppError> {
    let order = state
        .payments
        .override_status(&transaction_id, payload.status, admin.email())
        .await?;

    Ok(Json(StatusOverrideResponse {
        message: "Order status updated successfully".to_string(),
        order: order.into(),
    }))
}
