//! Bearer-token authentication and the admin role gate.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{services::Claims, AppState};

/// Require a valid access token and stash its claims for handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("unauthorized access")))?;

    let claims = state.jwt.validate(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AppError::Unauthorized(anyhow::anyhow!("unauthorized access"))
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Layered after [`require_auth`]: the token's user must hold the admin role.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("unauthorized access")))?;

    let user = state
        .users
        .find_by_email(&claims.email)
        .await
        .map_err(AppError::from)?;

    if !user.is_some_and(|u| u.is_admin()) {
        tracing::warn!(email = %claims.email, "Non-admin attempted admin route");
        return Err(AppError::Forbidden(anyhow::anyhow!("forbidden access")));
    }

    Ok(next.run(req).await)
}

/// Claims of the authenticated caller.
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn email(&self) -> &str {
        &self.0.email
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<Claims>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Auth claims missing from request extensions"
            ))
        })?;

        Ok(AuthUser(claims.clone()))
    }
}
