//! # Review Submission Handler

use axum::{
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::Json,
};

use super::parse_kind;
use super::types::{EntitySummary, ReviewDetail, SubmissionResponse};
use crate::auth::{AuthenticatedUser, UserIdHeader};
use crate::domain::ReviewDraft;
use crate::error::ApiError;
use crate::repositories::ReviewRepository;
use crate::server::AppState;

/// Create or replace the caller's review of an entity
///
/// The entity is identified by its natural key in the body and created on
/// first review. Reviews whose average reaches the auto-approve threshold
/// are published immediately; the rest wait for moderation.
#[utoipa::path(
    post,
    path = "/api/v1/reviews/{kind}",
    params(
        ("kind" = String, Path, description = "neighborhood, building, landlord or rent-company"),
        UserIdHeader
    ),
    request_body = ReviewDraft,
    responses(
        (status = 201, description = "Review created", body = SubmissionResponse),
        (status = 200, description = "Existing review replaced", body = SubmissionResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or unknown user", body = ApiError),
        (status = 403, description = "User is banned", body = ApiError),
        (status = 404, description = "Unknown entity kind", body = ApiError),
        (status = 409, description = "Concurrent submission conflict", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "reviews"
)]
pub async fn submit_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<ReviewDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    let Path(kind) = path?;
    let kind = parse_kind(&kind)?;
    let Json(draft) = payload?;

    let validated = draft.validate(kind, &state.config.submission_limits())?;
    let outcome = ReviewRepository::new(&state.db)
        .upsert(user.id, validated, state.config.auto_approve_threshold)
        .await?;

    let review = ReviewDetail::from_models(&outcome.review, Some(&outcome.entity))?;
    metrics::counter!(
        "reviews_submitted_total",
        "kind" => kind.as_str(),
        "status" => review.status.as_str()
    )
    .increment(1);
    tracing::info!(
        review_id = %review.id,
        entity_id = %outcome.entity.id,
        user_id = %user.id,
        status = %review.status,
        created = outcome.created,
        "Review submitted"
    );

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(SubmissionResponse {
            review,
            entity: EntitySummary::try_from(outcome.entity)?,
            created: outcome.created,
        }),
    ))
}
