//! Cart endpoints. Every operation is scoped to the caller's token email.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;

use crate::{
    dtos::cart::{
        AddCartItemRequest, AddCartItemResponse, CartItemResponse, CartQuery,
        UpdateCartItemRequest,
    },
    error::StorefrontError,
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

fn cart_item_id(raw: &str) -> Result<ObjectId, StorefrontError> {
    ObjectId::parse_str(raw)
        .map_err(|_| StorefrontError::InvalidRequest("Invalid cart item id".to_string()))
}

fn ensure_own_cart(user: &AuthUser, email: &str) -> Result<(), StorefrontError> {
    if email == user.email() {
        Ok(())
    } else {
        Err(StorefrontError::Forbidden("forbidden access".to_string()))
    }
}

pub async fn list_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CartQuery>,
) -> Result<Json<Vec<CartItemResponse>>, AppError> {
    let Some(email) = query.email.filter(|e| !e.is_empty()) else {
        return Ok(Json(Vec::new()));
    };
    ensure_own_cart(&user, &email)?;

    let items = state.carts.list(&email).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<AddCartItemRequest>,
) -> Result<(StatusCode, Json<AddCartItemResponse>), AppError> {
    ensure_own_cart(&user, &payload.email)?;

    let inserted = state.carts.add(&payload.into()).await?;
    let status = if inserted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(AddCartItemResponse {
            inserted,
            modified: !inserted,
        }),
    ))
}

pub async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateCartItemRequest>,
) -> Result<StatusCode, AppError> {
    let id = cart_item_id(&id)?;
    if !state
        .carts
        .set_quantity(user.email(), id, payload.quantity)
        .await?
    {
        return Err(StorefrontError::NotFound("Cart item").into());
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = cart_item_id(&id)?;
    if !state.carts.remove(user.email(), id).await? {
        return Err(StorefrontError::NotFound("Cart item").into());
    }
    Ok(StatusCode::NO_CONTENT)
}
