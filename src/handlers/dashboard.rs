use crate::handlers::common::{map_service_error, success_response};
use crate::{errors::ApiError, services::dashboard::DashboardSummary, AppState};
use axum::{extract::State, response::IntoResponse, routing::get, Router};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/", get(get_dashboard))
}

/// Aggregate sales, customer, and product counts for the admin dashboard
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardSummary)
    ),
    tag = "Dashboard"
)]
pub async fn get_dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let summary = state.dashboard.summary().await.map_err(map_service_error)?;
    Ok(success_response(summary))
}
