//! # Authentication and Authorization
//!
//! User endpoints trust the `X-User-Id` header forwarded by the auth gateway
//! and check the referenced profile. Admin endpoints additionally require an
//! operator bearer token and a profile with the `admin` role.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, forbidden, unauthorized, validation_error};
use crate::models::user_profile;
use crate::repositories::UserProfileRepository;
use crate::server::AppState;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Authenticated, non-banned user placed in request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
}

/// Authenticated admin placed in request extensions
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: Uuid,
}

/// Middleware for user endpoints: resolves `X-User-Id` to an active profile.
pub async fn user_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let profile = load_active_profile(&state, request.headers()).await?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { id: profile.id });

    Ok(next.run(request).await)
}

/// Middleware for admin endpoints: bearer token, then an active profile with the admin role.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;
    validate_token(&state.config, token)?;

    let profile = load_active_profile(&state, request.headers()).await?;
    if !profile.is_admin() {
        tracing::warn!(user_id = %profile.id, "Non-admin profile presented an admin token");
        return Err(forbidden(Some("Admin role required")));
    }

    request.extensions_mut().insert(AdminUser { id: profile.id });

    Ok(next.run(request).await)
}

async fn load_active_profile(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<user_profile::Model, ApiError> {
    let user_id = extract_user_id(headers)?;

    let profile = UserProfileRepository::new(&state.db)
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| unauthorized(Some("Unknown user")))?;

    if profile.is_banned {
        return Err(forbidden(Some("User is banned")));
    }

    Ok(profile)
}

fn extract_user_id(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let value = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| unauthorized(Some("Missing X-User-Id header")))?;

    value
        .to_str()
        .ok()
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .ok_or_else(|| {
            validation_error(
                "Invalid user ID",
                serde_json::json!({ "X-User-Id": "Must be a valid UUID" }),
            )
        })
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

fn validate_token(config: &AppConfig, token: &str) -> Result<(), ApiError> {
    let is_valid = config
        .admin_tokens
        .iter()
        .any(|configured| ConstantTimeEq::ct_eq(token.as_bytes(), configured.as_bytes()).into());

    if is_valid {
        Ok(())
    } else {
        Err(unauthorized(Some("Invalid bearer token")))
    }
}

/// OpenAPI header parameter for X-User-Id
#[derive(Debug, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Header)]
pub struct UserIdHeader {
    /// Verified user identifier (UUID) forwarded by the auth gateway
    #[serde(rename = "X-User-Id")]
    #[param(rename = "X-User-Id", value_type = String)]
    pub user_id: String,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("User authentication required")))
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminUser>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("Admin authentication required")))
    }
}
