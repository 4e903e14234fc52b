//! Domain errors for the storefront.
//!
//! Business code returns [`StorefrontError`]; the `From` impl below is the
//! only place these become HTTP statuses (via `AppError: IntoResponse`).

use service_core::error::AppError;
use thiserror::Error;

use crate::services::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Order not found")]
    OrderNotFound(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// The gateway answered but refused to open a checkout session.
    #[error("Payment initialization failed")]
    PaymentInitFailed { details: serde_json::Value },

    #[error("Payment gateway unreachable: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Document encoding error: {0}")]
    Encoding(#[from] mongodb::bson::ser::Error),

    #[error("Document decoding error: {0}")]
    Decoding(#[from] mongodb::bson::de::Error),
}

pub type StorefrontResult<T> = Result<T, StorefrontError>;

impl From<StorefrontError> for AppError {
    fn from(err: StorefrontError) -> Self {
        match err {
            StorefrontError::InvalidRequest(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            StorefrontError::Unauthorized(msg) => AppError::Unauthorized(anyhow::anyhow!(msg)),
            StorefrontError::Forbidden(msg) => AppError::Forbidden(anyhow::anyhow!(msg)),
            StorefrontError::OrderNotFound(_) => {
                AppError::NotFound(anyhow::anyhow!("Order not found"))
            }
            StorefrontError::NotFound(what) => {
                AppError::NotFound(anyhow::anyhow!("{} not found", what))
            }
            StorefrontError::PaymentInitFailed { details } => AppError::BadRequestWithDetails(
                "Payment initialization failed".to_string(),
                details,
            ),
            StorefrontError::Gateway(e) => AppError::BadGateway(e.to_string()),
            StorefrontError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            StorefrontError::Encoding(e) => AppError::InternalError(anyhow::Error::new(e)),
            StorefrontError::Decoding(e) => AppError::InternalError(anyhow::Error::new(e)),
        }
    }
}
