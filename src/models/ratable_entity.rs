//! Ratable entity model
//!
//! A single table holds neighborhoods, buildings, landlords and rent
//! companies; `kind` selects the category set and natural key.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::domain::{DomainError, EntityKind};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ratable_entities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Entity kind as stored (`neighborhood`, `building`, `landlord`, `rent_company`)
    pub kind: String,

    pub name: String,

    /// URL-safe key, unique per kind
    pub slug: String,

    pub address: Option<String>,

    pub city: String,

    pub province: Option<String>,

    pub cover_image_url: Option<String>,

    /// Lowercased, whitespace-collapsed `name`, for search
    pub name_key: String,

    /// Lowercased, whitespace-collapsed `city`, for filtering
    pub city_key: String,

    /// Lowercased, whitespace-collapsed `province`; empty when absent
    pub province_key: String,

    /// Identifying fields joined per kind; unique per kind
    pub natural_key: String,

    /// Mean of approved review averages, two decimals; 0.0 with no approved reviews
    pub overall_rating: f64,

    /// Number of approved reviews
    pub total_reviews: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn entity_kind(&self) -> Result<EntityKind, DomainError> {
        self.kind.parse()
    }
}
