use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;

use crate::{
    dtos::user::{
        AdminCheckResponse, RegisterUserRequest, RegisterUserResponse, TokenRequest,
        TokenResponse, UserResponse,
    },
    error::StorefrontError,
    middleware::AuthUser,
    models::{Role, User},
    utils::ValidatedJson,
    AppState,
};

fn user_id(raw: &str) -> Result<ObjectId, StorefrontError> {
    ObjectId::parse_str(raw)
        .map_err(|_| StorefrontError::InvalidRequest("Invalid user id".to_string()))
}

pub async fn register_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterUserRequest>,
) -> Result<(StatusCode, Json<RegisterUserResponse>), AppError> {
    let user: User = payload.into();

    match state.users.register(&user).await? {
        Some(id) => {
            tracing::info!(email = %user.email, "User registered");
            Ok((
                StatusCode::CREATED,
                Json(RegisterUserResponse {
                    message: None,
                    inserted_id: Some(id.to_hex()),
                }),
            ))
        }
        None => Ok((
            StatusCode::OK,
            Json(RegisterUserResponse {
                message: Some("user already exists".to_string()),
                inserted_id: None,
            }),
        )),
    }
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

pub async fn check_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(email): Path<String>,
) -> Result<Json<AdminCheckResponse>, AppError> {
    if email != user.email() {
        return Err(StorefrontError::Forbidden("unauthorized access".to_string()).into());
    }

    let admin = state
        .users
        .find_by_email(&email)
        .await?
        .is_some_and(|u| u.is_admin());
    Ok(Json(AdminCheckResponse { admin }))
}

pub async fn make_admin(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = user_id(&id)?;
    if !state.users.set_role(id, Role::Admin).await? {
        return Err(StorefrontError::NotFound("User").into());
    }

    tracing::warn!(
        target: "audit",
        user_id = %id,
        granted_by = %admin.email(),
        "Admin role granted"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_user(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = user_id(&id)?;
    if !state.users.delete(id).await? {
        return Err(StorefrontError::NotFound("User").into());
    }

    tracing::warn!(
        target: "audit",
        user_id = %id,
        deleted_by = %admin.email(),
        "User deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Access tokens are only minted for registered users.
pub async fn issue_token(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if state.users.find_by_email(&payload.email).await?.is_none() {
        return Err(StorefrontError::Unauthorized("unauthorized access".to_string()).into());
    }

    let token = state.jwt.issue(&payload.email).map_err(|e| {
        tracing::error!(error = %e, "Failed to sign access token");
        AppError::InternalError(anyhow::anyhow!("Failed to issue token"))
    })?;
    Ok(Json(TokenResponse { token }))
}
