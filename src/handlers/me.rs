//! # Own Review Handlers

use axum::{
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use super::types::{ReviewDetail, ReviewListResponse};
use crate::auth::{AuthenticatedUser, UserIdHeader};
use crate::error::ApiError;
use crate::repositories::ReviewRepository;
use crate::server::AppState;

/// List the caller's reviews in every status, newest first
#[utoipa::path(
    get,
    path = "/api/v1/me/reviews",
    params(UserIdHeader),
    responses(
        (status = 200, description = "The caller's reviews", body = ReviewListResponse),
        (status = 401, description = "Missing or unknown user", body = ApiError),
        (status = 403, description = "User is banned", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "me"
)]
pub async fn list_my_reviews(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ReviewListResponse>, ApiError> {
    let rows = ReviewRepository::new(&state.db)
        .list_for_user(user.id)
        .await?;

    let data = rows
        .iter()
        .map(|(review, entity)| ReviewDetail::from_models(review, entity.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ReviewListResponse { data }))
}

/// Delete one of the caller's reviews
#[utoipa::path(
    delete,
    path = "/api/v1/me/reviews/{review_id}",
    params(
        ("review_id" = Uuid, Path, description = "Review to delete"),
        UserIdHeader
    ),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 401, description = "Missing or unknown user", body = ApiError),
        (status = 403, description = "User is banned", body = ApiError),
        (status = 404, description = "No such review owned by the caller", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "me"
)]
pub async fn delete_my_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(review_id) = path?;
    ReviewRepository::new(&state.db)
        .delete_own(user.id, review_id)
        .await?;

    tracing::info!(review_id = %review_id, user_id = %user.id, "Review deleted by author");
    Ok(StatusCode::NO_CONTENT)
}
