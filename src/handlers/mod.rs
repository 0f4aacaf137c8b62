//! # API Handlers
//!
//! HTTP endpoint handlers for the rental review API.

use axum::{extract::State, http::StatusCode, response::Json};

use crate::db;
use crate::domain::{DomainError, EntityKind};
use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod admin;
pub mod entities;
pub mod me;
pub mod reviews;
pub mod types;
pub mod votes;

pub use types::HealthResponse;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness check that also pings the database
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service and database are healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    ),
    tag = "root"
)]
pub async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match db::health_check(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                database: "ok".to_string(),
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded".to_string(),
                    database: "unreachable".to_string(),
                }),
            )
        }
    }
}

/// Maps a `{kind}` path segment to an entity kind; unknown kinds are 404.
pub(crate) fn parse_kind(segment: &str) -> Result<EntityKind, ApiError> {
    EntityKind::from_path_segment(segment)
        .ok_or_else(|| DomainError::UnknownKind(segment.to_string()).into())
}
