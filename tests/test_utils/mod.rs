//! Test utilities for database testing.
//!
//! In-memory SQLite databases with migrations applied, plus fixtures for
//! profiles and review drafts.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use rent_reviews::config::AppConfig;
use rent_reviews::domain::{EntityKind, ReviewDraft, SubmissionLimits, ValidatedReview};
use rent_reviews::repositories::{ReviewRepository, SubmissionOutcome, UserProfileRepository};
use rent_reviews::server::AppState;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

pub const ADMIN_TOKEN: &str = "integration-admin-token";
pub const THRESHOLD: f64 = 3.0;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Application state over a fresh database with a known admin token.
pub async fn setup_test_state() -> Result<AppState> {
    Ok(AppState {
        config: Arc::new(AppConfig {
            profile: "test".to_string(),
            admin_tokens: vec![ADMIN_TOKEN.to_string()],
            ..Default::default()
        }),
        db: setup_test_db().await?,
    })
}

/// Creates a profile and returns its id.
pub async fn create_user(db: &DatabaseConnection, name: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    UserProfileRepository::new(db)
        .upsert_profile(id, &format!("{name}@example.com"), Some(name.to_string()), false)
        .await?;
    Ok(id)
}

/// Creates a profile with the admin role and returns its id.
pub async fn create_admin(db: &DatabaseConnection, name: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    UserProfileRepository::new(db)
        .upsert_profile(id, &format!("{name}@example.com"), Some(name.to_string()), true)
        .await?;
    Ok(id)
}

/// Every category of `kind` set to `score`.
pub fn uniform_ratings(kind: EntityKind, score: i64) -> BTreeMap<String, i64> {
    kind.categories()
        .iter()
        .map(|category| (category.to_string(), score))
        .collect()
}

pub fn building_draft(address: &str, city: &str, score: i64) -> ReviewDraft {
    ReviewDraft {
        address: Some(address.to_string()),
        city: Some(city.to_string()),
        ratings: uniform_ratings(EntityKind::Building, score),
        comment: Some("Decent place".to_string()),
        ..Default::default()
    }
}

pub fn landlord_draft(name: &str, score: i64) -> ReviewDraft {
    ReviewDraft {
        name: Some(name.to_string()),
        city: Some("Toronto".to_string()),
        province: Some("ON".to_string()),
        ratings: uniform_ratings(EntityKind::Landlord, score),
        ..Default::default()
    }
}

pub fn limits() -> SubmissionLimits {
    AppConfig::default().submission_limits()
}

pub fn validate(kind: EntityKind, draft: ReviewDraft) -> ValidatedReview {
    draft.validate(kind, &limits()).expect("draft is valid")
}

/// Validates and upserts a draft with the default threshold.
pub async fn submit(
    db: &DatabaseConnection,
    user_id: Uuid,
    kind: EntityKind,
    draft: ReviewDraft,
) -> Result<SubmissionOutcome> {
    Ok(ReviewRepository::new(db)
        .upsert(user_id, validate(kind, draft), THRESHOLD)
        .await?)
}
