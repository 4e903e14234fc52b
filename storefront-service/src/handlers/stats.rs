use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::{
    services::stats::{dashboard_stats, DashboardStats},
    AppState,
};

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    let stats = dashboard_stats(&*state.orders, &*state.users, &*state.catalog)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to compute dashboard stats");
            AppError::from(e)
        })?;
    Ok(Json(stats))
}
