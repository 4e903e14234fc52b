use axum::{
    extract::{Path, Query, State},
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::order::{OrderListQuery, OrderResponse},
    error::StorefrontError,
    middleware::AuthUser,
    AppState,
};

/// An order is visible to the customer who placed it and to admins.
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(transaction_id): Path<String>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state.payments.order(&transaction_id).await?;

    if order.email != user.email() {
        let is_admin = state
            .users
            .find_by_email(user.email())
            .await?
            .is_some_and(|u| u.is_admin());
        if !is_admin {
            return Err(StorefrontError::Forbidden("Unauthorized access".to_string()).into());
        }
    }

    Ok(Json(order.into()))
}

pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let email = query
        .email
        .filter(|email| email == user.email())
        .ok_or_else(|| StorefrontError::Forbidden("Unauthorized access".to_string()))?;

    let orders = state.payments.orders_for(&email).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}
