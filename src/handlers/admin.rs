//! # Admin API Handlers
//!
//! Moderation queue and actions, user bans and deletion, and entity
//! deletion. Every route here sits behind the admin middleware.

use axum::{
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use utoipa::IntoParams;
use uuid::Uuid;

use super::parse_kind;
use super::types::{
    BanRequest, ModerationRequest, ReviewDetail, ReviewListResponse, UserDeletionResponse,
    UserProfileResponse,
};
use crate::auth::{AdminUser, UserIdHeader};
use crate::domain::{EntityKind, ModerationAction, ReviewStatus};
use crate::error::{ApiError, validation_error};
use crate::repositories::{EntityRepository, ReviewRepository, UserProfileRepository};
use crate::server::AppState;

/// Query parameters for the moderation queue
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ModerationQueueQuery {
    /// pending (default), approved or rejected
    pub status: Option<String>,
    /// Restrict to one entity kind
    pub kind: Option<String>,
}

/// Parses an optional JSON body; an empty body yields the default value.
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|err| {
        validation_error(
            "Invalid JSON payload",
            json!({ "body": err.to_string() }),
        )
    })
}

/// List reviews by moderation status, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/admin/reviews",
    security(("bearer_auth" = [])),
    params(ModerationQueueQuery, UserIdHeader),
    responses(
        (status = 200, description = "Reviews in the requested status", body = ReviewListResponse),
        (status = 400, description = "Unknown status or kind", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_moderation_queue(
    State(state): State<AppState>,
    _admin: AdminUser,
    query: Result<Query<ModerationQueueQuery>, QueryRejection>,
) -> Result<Json<ReviewListResponse>, ApiError> {
    let Query(query) = query?;
    let status = match query.status.as_deref() {
        Some(raw) => raw.parse::<ReviewStatus>()?,
        None => ReviewStatus::Pending,
    };
    let kind = query
        .kind
        .as_deref()
        .map(|raw| {
            EntityKind::from_path_segment(raw).ok_or_else(|| {
                validation_error("Unknown entity kind", json!({ "kind": raw }))
            })
        })
        .transpose()?;

    let rows = ReviewRepository::new(&state.db)
        .list_by_status(status, kind)
        .await?;
    let data = rows
        .iter()
        .map(|(review, entity)| ReviewDetail::from_models(review, entity.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ReviewListResponse { data }))
}

/// Apply a moderation action to a review
///
/// approve and reject act on pending reviews, hide on approved ones and
/// unhide on rejected ones.
#[utoipa::path(
    post,
    path = "/api/v1/admin/reviews/{review_id}/{action}",
    security(("bearer_auth" = [])),
    params(
        ("review_id" = Uuid, Path, description = "Review to moderate"),
        ("action" = ModerationAction, Path, description = "approve, reject, hide or unhide"),
        UserIdHeader
    ),
    request_body(content = ModerationRequest, description = "Optional admin note"),
    responses(
        (status = 200, description = "Review after the action", body = ReviewDetail),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Unknown review or action", body = ApiError),
        (status = 409, description = "Action not allowed from the current status, or a concurrent moderation won", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn moderate_review(
    State(state): State<AppState>,
    admin: AdminUser,
    path: Result<Path<(Uuid, String)>, PathRejection>,
    body: Bytes,
) -> Result<Json<ReviewDetail>, ApiError> {
    let Path((review_id, action)) = path?;
    let action: ModerationAction = action.parse()?;
    let request: ModerationRequest = optional_body(&body)?;
    let note = request
        .note
        .map(|note| note.trim().to_string())
        .filter(|note| !note.is_empty());

    let review = ReviewRepository::new(&state.db)
        .moderate(review_id, action, admin.id, note)
        .await?;

    metrics::counter!("reviews_moderated_total", "action" => action.as_str()).increment(1);

    Ok(Json(ReviewDetail::from_models(&review, None)?))
}

/// Ban a user from every user endpoint
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{user_id}/ban",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = Uuid, Path, description = "User to ban"),
        UserIdHeader
    ),
    request_body(content = BanRequest, description = "Optional reason"),
    responses(
        (status = 200, description = "User banned", body = UserProfileResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Admin role required, or target is the caller", body = ApiError),
        (status = 404, description = "User not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn ban_user(
    State(state): State<AppState>,
    admin: AdminUser,
    path: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let Path(user_id) = path?;
    let request: BanRequest = optional_body(&body)?;
    let reason = request
        .reason
        .map(|reason| reason.trim().to_string())
        .filter(|reason| !reason.is_empty());

    let profile = UserProfileRepository::new(&state.db)
        .ban(user_id, admin.id, reason)
        .await?;

    Ok(Json(UserProfileResponse::from(profile)))
}

/// Lift a ban
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{user_id}/unban",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = Uuid, Path, description = "User to unban"),
        UserIdHeader
    ),
    responses(
        (status = 200, description = "User unbanned", body = UserProfileResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "User not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn unban_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let Path(user_id) = path?;
    let profile = UserProfileRepository::new(&state.db)
        .unban(user_id)
        .await?;

    Ok(Json(UserProfileResponse::from(profile)))
}

/// Delete a user with their votes and reviews
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{user_id}",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = Uuid, Path, description = "User to delete"),
        UserIdHeader
    ),
    responses(
        (status = 200, description = "User deleted", body = UserDeletionResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Admin role required, or target is the caller", body = ApiError),
        (status = 404, description = "User not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<UserDeletionResponse>, ApiError> {
    let Path(user_id) = path?;
    let summary = UserProfileRepository::new(&state.db)
        .delete_user(user_id, admin.id)
        .await?;

    Ok(Json(UserDeletionResponse::new(user_id, summary)))
}

/// Delete an entity with its reviews and their votes
#[utoipa::path(
    delete,
    path = "/api/v1/admin/entities/{kind}/{entity_id}",
    security(("bearer_auth" = [])),
    params(
        ("kind" = String, Path, description = "neighborhood, building, landlord or rent-company"),
        ("entity_id" = Uuid, Path, description = "Entity to delete"),
        UserIdHeader
    ),
    responses(
        (status = 204, description = "Entity deleted"),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Unknown kind or entity", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn delete_entity(
    State(state): State<AppState>,
    admin: AdminUser,
    path: Result<Path<(String, Uuid)>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path((kind, entity_id)) = path?;
    let kind = parse_kind(&kind)?;
    EntityRepository::new(&state.db)
        .delete(kind, entity_id)
        .await?;

    tracing::info!(entity_id = %entity_id, admin_id = %admin.id, "Entity deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}
