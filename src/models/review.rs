//! Review entity model
//!
//! One row per (entity, user). `ratings` is a JSON object keyed by the
//! entity kind's categories; `image_urls` is a JSON array of strings.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

use crate::domain::ranking::Rankable;
use crate::domain::{DomainError, EntityKind, RatingSet, ReviewStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub entity_id: Uuid,

    /// Denormalized kind of the reviewed entity, used for queue filtering
    pub entity_kind: String,

    pub user_id: Uuid,

    #[sea_orm(column_type = "JsonBinary")]
    pub ratings: JsonValue,

    /// Unweighted mean of the sub-ratings
    pub average_rating: f64,

    pub comment: Option<String>,

    #[sea_orm(column_type = "JsonBinary")]
    pub image_urls: JsonValue,

    pub is_anonymous: bool,

    pub display_name: Option<String>,

    /// `pending`, `approved` or `rejected`
    pub status: String,

    pub helpful_count: i32,

    pub not_helpful_count: i32,

    pub admin_note: Option<String>,

    /// Admin who performed the last moderation action
    pub reviewed_by: Option<Uuid>,

    pub reviewed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ratable_entity::Entity",
        from = "Column::EntityId",
        to = "super::ratable_entity::Column::Id",
        on_delete = "Cascade"
    )]
    RatableEntity,
    #[sea_orm(
        belongs_to = "super::user_profile::Entity",
        from = "Column::UserId",
        to = "super::user_profile::Column::Id",
        on_delete = "Cascade"
    )]
    UserProfile,
    #[sea_orm(has_many = "super::review_vote::Entity")]
    Votes,
}

impl Related<super::ratable_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RatableEntity.def()
    }
}

impl Related<super::user_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserProfile.def()
    }
}

impl Related<super::review_vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn kind(&self) -> Result<EntityKind, DomainError> {
        self.entity_kind.parse()
    }

    pub fn review_status(&self) -> Result<ReviewStatus, DomainError> {
        self.status.parse()
    }

    pub fn rating_set(&self) -> Result<RatingSet, DomainError> {
        RatingSet::from_json(self.kind()?, &self.ratings)
    }

    /// Stored image URLs; non-string entries are skipped.
    pub fn image_list(&self) -> Vec<String> {
        self.image_urls
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Rankable for Model {
    fn helpful_count(&self) -> i32 {
        self.helpful_count
    }

    fn not_helpful_count(&self) -> i32 {
        self.not_helpful_count
    }

    fn created_at(&self) -> DateTimeWithTimeZone {
        self.created_at
    }
}
