//! # Data Models
//!
//! SeaORM entity models for the rental review service plus small response
//! types shared across handlers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod ratable_entity;
pub mod review;
pub mod review_vote;
pub mod user_profile;

pub use ratable_entity::Entity as RatableEntity;
pub use review::Entity as Review;
pub use review_vote::Entity as ReviewVote;
pub use user_profile::Entity as UserProfile;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "rent-reviews".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
