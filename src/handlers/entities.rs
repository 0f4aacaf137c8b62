//! # Entity API Handlers
//!
//! Public browsing: entity listings, entity lookup by id or slug, and the
//! approved reviews of an entity with their category breakdown.

use axum::{
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use super::parse_kind;
use super::types::{EntityListResponse, EntityReviewsResponse, EntitySummary, PublicReview};
use crate::cursor::{decode_cursor, encode_cursor};
use crate::domain::EntityKey;
use crate::domain::ranking::{category_breakdown, rating_bucket};
use crate::error::{ApiError, validation_error};
use crate::repositories::{EntityFilter, EntityRepository, ReviewRepository};
use crate::server::AppState;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// Query parameters for listing entities
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListEntitiesQuery {
    /// Exact city, case-insensitive
    pub city: Option<String>,
    /// Exact province, case-insensitive
    pub province: Option<String>,
    /// Case-insensitive substring of the name
    pub q: Option<String>,
    /// Page size, 1..=100 (default 20)
    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<u64>,
    /// Opaque cursor from a previous page
    pub cursor: Option<String>,
}

/// Query parameters for an entity's reviews
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EntityReviewsQuery {
    /// Only reviews whose rounded average equals this star count (1..=5)
    #[param(minimum = 1, maximum = 5)]
    pub rating: Option<u8>,
}

/// List entities of one kind
#[utoipa::path(
    get,
    path = "/api/v1/entities/{kind}",
    params(
        ("kind" = String, Path, description = "neighborhood, building, landlord or rent-company"),
        ListEntitiesQuery
    ),
    responses(
        (status = 200, description = "One page of entities ordered by name", body = EntityListResponse),
        (status = 400, description = "Invalid limit or cursor", body = ApiError),
        (status = 404, description = "Unknown entity kind", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "entities"
)]
pub async fn list_entities(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<ListEntitiesQuery>, QueryRejection>,
) -> Result<Json<EntityListResponse>, ApiError> {
    let Path(kind) = path?;
    let Query(query) = query?;
    let kind = parse_kind(&kind)?;

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(validation_error(
            "Invalid limit",
            json!({ "limit": format!("Must be between 1 and {MAX_PAGE_SIZE}") }),
        ));
    }

    let after = query.cursor.as_deref().map(decode_cursor).transpose()?;
    let filter = EntityFilter {
        city: query.city,
        province: query.province,
        search: query.q,
    };

    let page = EntityRepository::new(&state.db)
        .list(kind, &filter, after.as_ref(), limit)
        .await?;

    let data = page
        .items
        .into_iter()
        .map(EntitySummary::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let next_cursor = page.next.map(|next| encode_cursor(&next.name, &next.id));

    Ok(Json(EntityListResponse::new(data, next_cursor)))
}

/// Get one entity by id or slug
#[utoipa::path(
    get,
    path = "/api/v1/entities/{kind}/{key}",
    params(
        ("kind" = String, Path, description = "neighborhood, building, landlord or rent-company"),
        ("key" = String, Path, description = "Entity UUID or slug")
    ),
    responses(
        (status = 200, description = "Entity with aggregates", body = EntitySummary),
        (status = 404, description = "Unknown kind or entity", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "entities"
)]
pub async fn get_entity(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<EntitySummary>, ApiError> {
    let Path((kind, key)) = path?;
    let kind = parse_kind(&kind)?;
    let entity = EntityRepository::new(&state.db)
        .resolve(kind, &EntityKey::parse(&key))
        .await?;

    Ok(Json(EntitySummary::try_from(entity)?))
}

/// Approved reviews of an entity, most helpful first
#[utoipa::path(
    get,
    path = "/api/v1/entities/{kind}/{key}/reviews",
    params(
        ("kind" = String, Path, description = "neighborhood, building, landlord or rent-company"),
        ("key" = String, Path, description = "Entity UUID or slug"),
        EntityReviewsQuery
    ),
    responses(
        (status = 200, description = "Approved reviews and category breakdown", body = EntityReviewsResponse),
        (status = 400, description = "Rating filter out of range", body = ApiError),
        (status = 404, description = "Unknown kind or entity", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "entities"
)]
pub async fn list_entity_reviews(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    query: Result<Query<EntityReviewsQuery>, QueryRejection>,
) -> Result<Json<EntityReviewsResponse>, ApiError> {
    let Path((kind, key)) = path?;
    let Query(query) = query?;
    let kind = parse_kind(&kind)?;
    if let Some(rating) = query.rating
        && !(1..=5).contains(&rating)
    {
        return Err(validation_error(
            "Invalid rating filter",
            json!({ "rating": "Must be between 1 and 5" }),
        ));
    }

    let entity = EntityRepository::new(&state.db)
        .resolve(kind, &EntityKey::parse(&key))
        .await?;
    let approved = ReviewRepository::new(&state.db)
        .list_approved(entity.id)
        .await?;

    let rating_sets = approved
        .iter()
        .map(|review| review.rating_set())
        .collect::<Result<Vec<_>, _>>()?;
    let breakdown = category_breakdown(kind, &rating_sets);

    let reviews = approved
        .iter()
        .filter(|review| {
            query
                .rating
                .is_none_or(|stars| rating_bucket(review.average_rating) == stars)
        })
        .map(PublicReview::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(EntityReviewsResponse {
        entity: EntitySummary::try_from(entity)?,
        category_breakdown: breakdown,
        reviews,
    }))
}
