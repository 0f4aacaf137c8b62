//! # Helpfulness Vote Handlers

use axum::{
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    response::Json,
};
use uuid::Uuid;

use super::types::{VoteRequest, VoteResponse};
use crate::auth::{AuthenticatedUser, UserIdHeader};
use crate::error::ApiError;
use crate::repositories::VoteRepository;
use crate::server::AppState;

/// Vote an approved review helpful or not helpful; re-voting replaces the vote
#[utoipa::path(
    put,
    path = "/api/v1/votes/{review_id}",
    params(
        ("review_id" = Uuid, Path, description = "Review to vote on"),
        UserIdHeader
    ),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded", body = VoteResponse),
        (status = 400, description = "Malformed body", body = ApiError),
        (status = 401, description = "Missing or unknown user", body = ApiError),
        (status = 403, description = "Own review or banned user", body = ApiError),
        (status = 404, description = "Review not found or not approved", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "votes"
)]
pub async fn cast_vote(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<VoteResponse>, ApiError> {
    let Path(review_id) = path?;
    let Json(request) = payload?;

    let review = VoteRepository::new(&state.db)
        .cast(review_id, user.id, request.helpful)
        .await?;

    metrics::counter!(
        "review_votes_total",
        "helpful" => if request.helpful { "true" } else { "false" }
    )
    .increment(1);
    tracing::debug!(review_id = %review_id, user_id = %user.id, helpful = request.helpful, "Vote cast");

    Ok(Json(VoteResponse::from(&review)))
}

/// Remove the caller's vote on a review
#[utoipa::path(
    delete,
    path = "/api/v1/votes/{review_id}",
    params(
        ("review_id" = Uuid, Path, description = "Review the vote belongs to"),
        UserIdHeader
    ),
    responses(
        (status = 200, description = "Vote removed (or there was none)", body = VoteResponse),
        (status = 401, description = "Missing or unknown user", body = ApiError),
        (status = 403, description = "User is banned", body = ApiError),
        (status = 404, description = "Review not found or not approved", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "votes"
)]
pub async fn retract_vote(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<VoteResponse>, ApiError> {
    let Path(review_id) = path?;
    let review = VoteRepository::new(&state.db)
        .retract(review_id, user.id)
        .await?;

    Ok(Json(VoteResponse::from(&review)))
}
