//! # Review Repository
//!
//! Submission upsert, public listings, the moderation queue and the
//! moderation state transitions. Every mutation recomputes the aggregates of
//! the affected entity inside the same transaction.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::entity::{find_or_create, recompute_aggregates};
use crate::domain::ranking::sort_for_display;
use crate::domain::{EntityKind, ModerationAction, ReviewStatus, ValidatedReview};
use crate::error::{RepositoryError, is_unique_violation};
use crate::models::ratable_entity;
use crate::models::review::{self, Entity as Review};
use crate::models::review_vote::{self, Entity as ReviewVote};

/// Result of a submission
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub review: review::Model,
    pub entity: ratable_entity::Model,
    /// `false` when an existing review was updated in place
    pub created: bool,
}

/// A review joined with the entity it rates
pub type ReviewWithEntity = (review::Model, Option<ratable_entity::Model>);

/// Repository for review database operations
pub struct ReviewRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ReviewRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates or replaces the caller's review of the entity named by `draft`.
    ///
    /// The entity is created on first review. A new review is auto-approved
    /// when its mean reaches the threshold; see
    /// [`ReviewStatus::for_resubmission`] for updates.
    pub async fn upsert(
        &self,
        user_id: Uuid,
        draft: ValidatedReview,
        auto_approve_threshold: f64,
    ) -> Result<SubmissionOutcome, RepositoryError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let entity = find_or_create(&txn, &draft.identity).await?;

        let existing = find_by_entity_and_user(&txn, entity.id, user_id).await?;
        let (review, created) = match existing {
            Some(current) => (
                apply_submission(&txn, current, &draft, auto_approve_threshold).await?,
                false,
            ),
            None => {
                insert_or_resubmit(&txn, entity.id, user_id, &draft, auto_approve_threshold)
                    .await?
            }
        };

        recompute_aggregates(&txn, entity.id).await?;

        let entity = ratable_entity::Entity::find_by_id(entity.id)
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or(RepositoryError::EntityNotFound)?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(SubmissionOutcome {
            review,
            entity,
            created,
        })
    }

    /// Approved reviews of an entity in display order (net helpfulness, then newest).
    pub async fn list_approved(&self, entity_id: Uuid) -> Result<Vec<review::Model>, RepositoryError> {
        let mut reviews = Review::find()
            .filter(review::Column::EntityId.eq(entity_id))
            .filter(review::Column::Status.eq(ReviewStatus::Approved.as_str()))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        sort_for_display(&mut reviews);
        Ok(reviews)
    }

    /// All of a user's reviews, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ReviewWithEntity>, RepositoryError> {
        Review::find()
            .filter(review::Column::UserId.eq(user_id))
            .order_by_desc(review::Column::CreatedAt)
            .find_also_related(ratable_entity::Entity)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Moderation queue, oldest first.
    pub async fn list_by_status(
        &self,
        status: ReviewStatus,
        kind: Option<EntityKind>,
    ) -> Result<Vec<ReviewWithEntity>, RepositoryError> {
        let mut query = Review::find().filter(review::Column::Status.eq(status.as_str()));
        if let Some(kind) = kind {
            query = query.filter(review::Column::EntityKind.eq(kind.as_str()));
        }

        query
            .order_by_asc(review::Column::CreatedAt)
            .order_by_asc(review::Column::Id)
            .find_also_related(ratable_entity::Entity)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_id(&self, review_id: Uuid) -> Result<Option<review::Model>, RepositoryError> {
        Review::find_by_id(review_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Applies a moderation action.
    ///
    /// The status write is conditional on the status that was read, so two
    /// admins acting at once cannot both succeed.
    pub async fn moderate(
        &self,
        review_id: Uuid,
        action: ModerationAction,
        admin_id: Uuid,
        note: Option<String>,
    ) -> Result<review::Model, RepositoryError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let current = Review::find_by_id(review_id)
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or(RepositoryError::ReviewNotFound)?;

        let from = current.review_status()?;
        let to = action.apply(from)?;
        transition(&txn, review_id, from, to, admin_id, note).await?;

        recompute_aggregates(&txn, current.entity_id).await?;

        let updated = Review::find_by_id(review_id)
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or(RepositoryError::ReviewNotFound)?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(
            review_id = %review_id,
            admin_id = %admin_id,
            action = %action,
            from = %from,
            to = %to,
            "Review moderated"
        );
        Ok(updated)
    }

    /// Deletes one of the caller's own reviews.
    ///
    /// Someone else's review reports as not found.
    pub async fn delete_own(&self, user_id: Uuid, review_id: Uuid) -> Result<(), RepositoryError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let current = Review::find_by_id(review_id)
            .filter(review::Column::UserId.eq(user_id))
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or(RepositoryError::ReviewNotFound)?;

        ReviewVote::delete_many()
            .filter(review_vote::Column::ReviewId.eq(current.id))
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        Review::delete_by_id(current.id)
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        recompute_aggregates(&txn, current.entity_id).await?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }
}

async fn find_by_entity_and_user(
    txn: &DatabaseTransaction,
    entity_id: Uuid,
    user_id: Uuid,
) -> Result<Option<review::Model>, RepositoryError> {
    Review::find()
        .filter(review::Column::EntityId.eq(entity_id))
        .filter(review::Column::UserId.eq(user_id))
        .one(txn)
        .await
        .map_err(RepositoryError::database_error)
}

fn image_json(draft: &ValidatedReview) -> JsonValue {
    JsonValue::from(draft.image_urls.clone())
}

/// Inserts a new review; when a concurrent submission by the same user won
/// the unique index, updates that row instead.
async fn insert_or_resubmit(
    txn: &DatabaseTransaction,
    entity_id: Uuid,
    user_id: Uuid,
    draft: &ValidatedReview,
    auto_approve_threshold: f64,
) -> Result<(review::Model, bool), RepositoryError> {
    let status = ReviewStatus::for_submission(draft.ratings.average(), auto_approve_threshold);
    match insert_review(txn, entity_id, user_id, draft, status).await {
        Ok(inserted) => Ok((inserted, true)),
        Err(err) if is_unique_violation(&err) => {
            tracing::debug!(entity_id = %entity_id, user_id = %user_id, "Review insert raced; updating");
            let current = find_by_entity_and_user(txn, entity_id, user_id)
                .await?
                .ok_or_else(|| RepositoryError::Conflict("review changed concurrently".to_string()))?;
            let updated = apply_submission(txn, current, draft, auto_approve_threshold).await?;
            Ok((updated, false))
        }
        Err(err) => Err(RepositoryError::database_error(err)),
    }
}

async fn insert_review(
    txn: &DatabaseTransaction,
    entity_id: Uuid,
    user_id: Uuid,
    draft: &ValidatedReview,
    status: ReviewStatus,
) -> Result<review::Model, sea_orm::DbErr> {
    let now = Utc::now();
    let savepoint = txn.begin().await?;
    let result = review::ActiveModel {
        id: Set(Uuid::new_v4()),
        entity_id: Set(entity_id),
        entity_kind: Set(draft.identity.kind.as_str().to_string()),
        user_id: Set(user_id),
        ratings: Set(draft.ratings.to_json()),
        average_rating: Set(draft.ratings.average()),
        comment: Set(draft.comment.clone()),
        image_urls: Set(image_json(draft)),
        is_anonymous: Set(draft.is_anonymous),
        display_name: Set(draft.display_name.clone()),
        status: Set(status.as_str().to_string()),
        helpful_count: Set(0),
        not_helpful_count: Set(0),
        admin_note: Set(None),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&savepoint)
    .await;

    match result {
        Ok(model) => {
            savepoint.commit().await?;
            Ok(model)
        }
        Err(err) => {
            savepoint.rollback().await?;
            Err(err)
        }
    }
}

/// Overwrites the mutable fields of an existing review. Votes and the
/// moderation audit fields are kept.
async fn apply_submission(
    txn: &DatabaseTransaction,
    current: review::Model,
    draft: &ValidatedReview,
    auto_approve_threshold: f64,
) -> Result<review::Model, RepositoryError> {
    let average = draft.ratings.average();
    let status = current.review_status()?.for_resubmission(
        current.reviewed_by.is_some(),
        average,
        auto_approve_threshold,
    );

    let mut active = current.into_active_model();
    active.ratings = Set(draft.ratings.to_json());
    active.average_rating = Set(average);
    active.comment = Set(draft.comment.clone());
    active.image_urls = Set(image_json(draft));
    active.is_anonymous = Set(draft.is_anonymous);
    active.display_name = Set(draft.display_name.clone());
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());

    active
        .update(txn)
        .await
        .map_err(RepositoryError::database_error)
}

/// Moves a review from `from` to `to`, recording the moderator.
///
/// Matches no row when the status is no longer `from`, which means another
/// admin acted first.
async fn transition(
    txn: &DatabaseTransaction,
    review_id: Uuid,
    from: ReviewStatus,
    to: ReviewStatus,
    admin_id: Uuid,
    note: Option<String>,
) -> Result<(), RepositoryError> {
    let now = sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now());
    let result = Review::update_many()
        .col_expr(review::Column::Status, Expr::value(to.as_str()))
        .col_expr(review::Column::AdminNote, Expr::value(note))
        .col_expr(review::Column::ReviewedBy, Expr::value(Some(admin_id)))
        .col_expr(review::Column::ReviewedAt, Expr::value(Some(now)))
        .col_expr(review::Column::UpdatedAt, Expr::value(now))
        .filter(review::Column::Id.eq(review_id))
        .filter(review::Column::Status.eq(from.as_str()))
        .exec(txn)
        .await
        .map_err(RepositoryError::database_error)?;

    if result.rows_affected == 0 {
        return Err(RepositoryError::Conflict(
            "review was moderated concurrently; reload and retry".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    use super::*;
    use crate::config::AppConfig;
    use crate::domain::ReviewDraft;
    use crate::repositories::UserProfileRepository;

    async fn setup() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn profile(db: &DatabaseConnection, name: &str, admin: bool) -> Uuid {
        let id = Uuid::new_v4();
        UserProfileRepository::new(db)
            .upsert_profile(id, &format!("{name}@example.com"), None, admin)
            .await
            .unwrap();
        id
    }

    fn landlord_review(score: i64) -> ValidatedReview {
        let ratings: BTreeMap<String, i64> = EntityKind::Landlord
            .categories()
            .iter()
            .map(|category| (category.to_string(), score))
            .collect();
        ReviewDraft {
            name: Some("Race Co".to_string()),
            city: Some("Toronto".to_string()),
            province: Some("ON".to_string()),
            ratings,
            ..Default::default()
        }
        .validate(EntityKind::Landlord, &AppConfig::default().submission_limits())
        .unwrap()
    }

    #[tokio::test]
    async fn stale_moderation_write_is_a_conflict() {
        let db = setup().await;
        let user = profile(&db, "writer", false).await;
        let admin = profile(&db, "admin", true).await;
        let repo = ReviewRepository::new(&db);

        let outcome = repo.upsert(user, landlord_review(2), 3.0).await.unwrap();
        assert_eq!(outcome.review.review_status().unwrap(), ReviewStatus::Pending);

        // A second admin approves after the first one read `pending`
        repo.moderate(outcome.review.id, ModerationAction::Approve, admin, None)
            .await
            .unwrap();

        let txn = db.begin().await.unwrap();
        let err = transition(
            &txn,
            outcome.review.id,
            ReviewStatus::Pending,
            ReviewStatus::Rejected,
            admin,
            Some("late".to_string()),
        )
        .await
        .unwrap_err();
        txn.rollback().await.unwrap();

        assert!(matches!(err, RepositoryError::Conflict(_)));
        let current = repo.find_by_id(outcome.review.id).await.unwrap().unwrap();
        assert_eq!(current.review_status().unwrap(), ReviewStatus::Approved);
        assert!(current.admin_note.is_none());
    }

    #[tokio::test]
    async fn losing_insert_race_updates_the_existing_review() {
        let db = setup().await;
        let user = profile(&db, "racer", false).await;
        let repo = ReviewRepository::new(&db);
        let first = repo.upsert(user, landlord_review(4), 3.0).await.unwrap();

        // The lookup missed, but the other submission's row is already there
        let txn = db.begin().await.unwrap();
        let (review, created) =
            insert_or_resubmit(&txn, first.entity.id, user, &landlord_review(2), 3.0)
                .await
                .unwrap();
        txn.commit().await.unwrap();

        assert!(!created);
        assert_eq!(review.id, first.review.id);
        assert_eq!(review.average_rating, 2.0);
        assert_eq!(review.review_status().unwrap(), ReviewStatus::Pending);
        assert_eq!(repo.list_for_user(user).await.unwrap().len(), 1);
    }
}
