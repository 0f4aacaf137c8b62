//! # Server Configuration
//!
//! Router assembly, OpenAPI document and the serve loop for the rental
//! review API.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{admin_auth_middleware, user_auth_middleware};
use crate::config::AppConfig;
use crate::error::{ApiError, ErrorType};
use crate::handlers::{self, admin, entities, me, reviews, votes};
use crate::telemetry::trace_context_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/api/v1/entities/{kind}", get(entities::list_entities))
        .route("/api/v1/entities/{kind}/{key}", get(entities::get_entity))
        .route(
            "/api/v1/entities/{kind}/{key}/reviews",
            get(entities::list_entity_reviews),
        );

    let user = Router::new()
        .route("/api/v1/reviews/{kind}", post(reviews::submit_review))
        .route(
            "/api/v1/votes/{review_id}",
            put(votes::cast_vote).delete(votes::retract_vote),
        )
        .route("/api/v1/me/reviews", get(me::list_my_reviews))
        .route("/api/v1/me/reviews/{review_id}", delete(me::delete_my_review))
        .route_layer(from_fn_with_state(state.clone(), user_auth_middleware));

    let admin = Router::new()
        .route("/api/v1/admin/reviews", get(admin::list_moderation_queue))
        .route(
            "/api/v1/admin/reviews/{review_id}/{action}",
            post(admin::moderate_review),
        )
        .route("/api/v1/admin/users/{user_id}/ban", post(admin::ban_user))
        .route("/api/v1/admin/users/{user_id}/unban", post(admin::unban_user))
        .route("/api/v1/admin/users/{user_id}", delete(admin::delete_user))
        .route(
            "/api/v1/admin/entities/{kind}/{entity_id}",
            delete(admin::delete_entity),
        )
        .route_layer(from_fn_with_state(state.clone(), admin_auth_middleware));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(user)
        .merge(admin)
        .fallback(not_found)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn not_found() -> ApiError {
    ErrorType::NotFound.into()
}

/// Starts the server with the given configuration and serves until Ctrl-C
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .with_context(|| format!("Invalid server address: {}", config.api_bind_addr))?;
    let profile = config.profile.clone();

    let state = AppState {
        config: Arc::new(config),
        db,
    };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::entities::list_entities,
        crate::handlers::entities::get_entity,
        crate::handlers::entities::list_entity_reviews,
        crate::handlers::reviews::submit_review,
        crate::handlers::votes::cast_vote,
        crate::handlers::votes::retract_vote,
        crate::handlers::me::list_my_reviews,
        crate::handlers::me::delete_my_review,
        crate::handlers::admin::list_moderation_queue,
        crate::handlers::admin::moderate_review,
        crate::handlers::admin::ban_user,
        crate::handlers::admin::unban_user,
        crate::handlers::admin::delete_user,
        crate::handlers::admin::delete_entity,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::domain::EntityKind,
            crate::domain::ReviewStatus,
            crate::domain::ModerationAction,
            crate::domain::ReviewDraft,
            crate::domain::ranking::CategoryScore,
            crate::handlers::types::HealthResponse,
            crate::handlers::types::EntitySummary,
            crate::handlers::types::EntityListResponse,
            crate::handlers::types::PublicReview,
            crate::handlers::types::EntityReviewsResponse,
            crate::handlers::types::ReviewDetail,
            crate::handlers::types::ReviewListResponse,
            crate::handlers::types::SubmissionResponse,
            crate::handlers::types::VoteRequest,
            crate::handlers::types::VoteResponse,
            crate::handlers::types::ModerationRequest,
            crate::handlers::types::BanRequest,
            crate::handlers::types::UserProfileResponse,
            crate::handlers::types::UserDeletionResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "root", description = "Service information and health"),
        (name = "entities", description = "Public browsing of entities and their reviews"),
        (name = "reviews", description = "Review submission"),
        (name = "votes", description = "Helpfulness votes"),
        (name = "me", description = "The caller's own reviews"),
        (name = "admin", description = "Moderation and user administration"),
    ),
    info(
        title = "Rent Reviews API",
        description = "Reviews of neighborhoods, buildings, landlords and rent companies",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
