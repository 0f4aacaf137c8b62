//! # Common API Types
//!
//! Response bodies shared by the public, user and admin handlers, and the
//! conversions from database models into them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::ranking::CategoryScore;
use crate::domain::{DomainError, EntityKind, ReviewStatus};
use crate::models::{ratable_entity, review, user_profile};
use crate::repositories::DeletionSummary;

/// Paginated list of entities
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EntityListResponse {
    /// Entities on the current page
    pub data: Vec<EntitySummary>,
    /// Opaque cursor for fetching the next page (null if this is the last page)
    pub next_cursor: Option<String>,
    /// Convenience field indicating if more pages exist
    pub has_more: bool,
}

impl EntityListResponse {
    pub fn new(data: Vec<EntitySummary>, next_cursor: Option<String>) -> Self {
        let has_more = next_cursor.is_some();
        Self {
            data,
            next_cursor,
            has_more,
        }
    }
}

/// A ratable entity with its aggregates
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EntitySummary {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    pub kind: EntityKind,
    #[schema(example = "Maple Court")]
    pub name: String,
    #[schema(example = "maple-court-toronto")]
    pub slug: String,
    pub address: Option<String>,
    pub city: String,
    pub province: Option<String>,
    pub cover_image_url: Option<String>,
    /// Mean of approved review averages (0.0 with none)
    #[schema(example = 4.25)]
    pub overall_rating: f64,
    /// Number of approved reviews
    pub total_reviews: i32,
    /// ISO 8601
    pub created_at: String,
    /// ISO 8601
    pub updated_at: String,
}

impl TryFrom<ratable_entity::Model> for EntitySummary {
    type Error = DomainError;

    fn try_from(model: ratable_entity::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: model.entity_kind()?,
            id: model.id,
            name: model.name,
            slug: model.slug,
            address: model.address,
            city: model.city,
            province: model.province,
            cover_image_url: model.cover_image_url,
            overall_rating: model.overall_rating,
            total_reviews: model.total_reviews,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        })
    }
}

/// An approved review as shown to the public.
///
/// Anonymous reviews carry neither `display_name` nor `user_id`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicReview {
    pub id: Uuid,
    /// Sub-rating per category of the entity kind
    pub ratings: BTreeMap<String, u8>,
    #[schema(example = 4.5)]
    pub average_rating: f64,
    pub comment: Option<String>,
    pub image_urls: Vec<String>,
    pub is_anonymous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub helpful_count: i32,
    pub not_helpful_count: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<&review::Model> for PublicReview {
    type Error = DomainError;

    fn try_from(model: &review::Model) -> Result<Self, Self::Error> {
        let ratings = model
            .rating_set()?
            .iter()
            .map(|(category, score)| (category.to_string(), score))
            .collect();
        let (display_name, user_id) = if model.is_anonymous {
            (None, None)
        } else {
            (model.display_name.clone(), Some(model.user_id))
        };

        Ok(Self {
            id: model.id,
            ratings,
            average_rating: model.average_rating,
            comment: model.comment.clone(),
            image_urls: model.image_list(),
            is_anonymous: model.is_anonymous,
            display_name,
            user_id,
            helpful_count: model.helpful_count,
            not_helpful_count: model.not_helpful_count,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        })
    }
}

/// Approved reviews of one entity with the category breakdown
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EntityReviewsResponse {
    pub entity: EntitySummary,
    /// Per-category means over every approved review, ignoring the rating filter
    pub category_breakdown: Vec<CategoryScore>,
    /// Approved reviews, most helpful first
    pub reviews: Vec<PublicReview>,
}

/// Full view of a review, for its author and for admins
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReviewDetail {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub entity_kind: EntityKind,
    /// Present when the entity still exists
    pub entity_name: Option<String>,
    pub entity_slug: Option<String>,
    pub user_id: Uuid,
    pub ratings: BTreeMap<String, u8>,
    pub average_rating: f64,
    pub comment: Option<String>,
    pub image_urls: Vec<String>,
    pub is_anonymous: bool,
    pub display_name: Option<String>,
    pub status: ReviewStatus,
    pub helpful_count: i32,
    pub not_helpful_count: i32,
    pub admin_note: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ReviewDetail {
    pub fn from_models(
        model: &review::Model,
        entity: Option<&ratable_entity::Model>,
    ) -> Result<Self, DomainError> {
        let ratings = model
            .rating_set()?
            .iter()
            .map(|(category, score)| (category.to_string(), score))
            .collect();

        Ok(Self {
            id: model.id,
            entity_id: model.entity_id,
            entity_kind: model.kind()?,
            entity_name: entity.map(|e| e.name.clone()),
            entity_slug: entity.map(|e| e.slug.clone()),
            user_id: model.user_id,
            ratings,
            average_rating: model.average_rating,
            comment: model.comment.clone(),
            image_urls: model.image_list(),
            is_anonymous: model.is_anonymous,
            display_name: model.display_name.clone(),
            status: model.review_status()?,
            helpful_count: model.helpful_count,
            not_helpful_count: model.not_helpful_count,
            admin_note: model.admin_note.clone(),
            reviewed_by: model.reviewed_by,
            reviewed_at: model.reviewed_at.map(|at| at.to_rfc3339()),
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        })
    }
}

/// List of reviews in their full view
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReviewListResponse {
    pub data: Vec<ReviewDetail>,
}

/// Result of a review submission
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionResponse {
    pub review: ReviewDetail,
    pub entity: EntitySummary,
    /// `false` when an existing review was replaced
    pub created: bool,
}

/// Helpfulness vote payload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VoteRequest {
    /// `true` for helpful, `false` for not helpful
    pub helpful: bool,
}

/// Vote counts of a review after a vote change
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VoteResponse {
    pub review_id: Uuid,
    pub helpful_count: i32,
    pub not_helpful_count: i32,
}

impl From<&review::Model> for VoteResponse {
    fn from(model: &review::Model) -> Self {
        Self {
            review_id: model.id,
            helpful_count: model.helpful_count,
            not_helpful_count: model.not_helpful_count,
        }
    }
}

/// Optional note attached to a moderation action
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ModerationRequest {
    #[schema(example = "Contains personal information")]
    pub note: Option<String>,
}

/// Optional reason attached to a ban
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct BanRequest {
    #[schema(example = "Repeated spam")]
    pub reason: Option<String>,
}

/// User profile as seen by admins
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    #[schema(example = "user")]
    pub role: String,
    pub is_banned: bool,
    pub banned_at: Option<String>,
    pub banned_reason: Option<String>,
    pub banned_by: Option<Uuid>,
}

impl From<user_profile::Model> for UserProfileResponse {
    fn from(model: user_profile::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            display_name: model.display_name,
            role: model.role,
            is_banned: model.is_banned,
            banned_at: model.banned_at.map(|at| at.to_rfc3339()),
            banned_reason: model.banned_reason,
            banned_by: model.banned_by,
        }
    }
}

/// What a user deletion removed
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDeletionResponse {
    pub user_id: Uuid,
    pub votes_removed: u64,
    pub reviews_removed: u64,
    pub entities_recomputed: usize,
}

impl UserDeletionResponse {
    pub fn new(user_id: Uuid, summary: DeletionSummary) -> Self {
        Self {
            user_id,
            votes_removed: summary.votes_removed,
            reviews_removed: summary.reviews_removed,
            entities_recomputed: summary.entities_recomputed,
        }
    }
}

/// Liveness and database status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "ok")]
    pub database: String,
}
