//! # Review Vote Repository
//!
//! Helpful / not-helpful votes. Votes only touch the counters on the review;
//! they never change its moderation status.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::domain::ReviewStatus;
use crate::error::{RepositoryError, is_unique_violation};
use crate::models::review::{self, Entity as Review};
use crate::models::review_vote::{self, Entity as ReviewVote};

/// Repository for review vote database operations
pub struct VoteRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> VoteRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records or replaces the caller's vote and returns the review with fresh counts.
    pub async fn cast(
        &self,
        review_id: Uuid,
        user_id: Uuid,
        helpful: bool,
    ) -> Result<review::Model, RepositoryError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let target = votable_review(&txn, review_id).await?;
        if target.user_id == user_id {
            return Err(RepositoryError::Forbidden(
                "You cannot vote on your own review".to_string(),
            ));
        }

        let existing = find_vote(&txn, review_id, user_id).await?;

        match existing {
            Some(vote) => set_vote(&txn, vote.id, helpful).await?,
            None => insert_or_replace_vote(&txn, review_id, user_id, helpful).await?,
        }

        let updated = recompute_vote_counts(&txn, review_id).await?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(updated)
    }

    /// Removes the caller's vote, if any, and returns the review with fresh counts.
    pub async fn retract(
        &self,
        review_id: Uuid,
        user_id: Uuid,
    ) -> Result<review::Model, RepositoryError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        votable_review(&txn, review_id).await?;

        ReviewVote::delete_many()
            .filter(review_vote::Column::ReviewId.eq(review_id))
            .filter(review_vote::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        let updated = recompute_vote_counts(&txn, review_id).await?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(updated)
    }
}

/// Only approved reviews are visible, so only they accept votes.
async fn votable_review(
    txn: &DatabaseTransaction,
    review_id: Uuid,
) -> Result<review::Model, RepositoryError> {
    Review::find_by_id(review_id)
        .filter(review::Column::Status.eq(ReviewStatus::Approved.as_str()))
        .one(txn)
        .await
        .map_err(RepositoryError::database_error)?
        .ok_or(RepositoryError::ReviewNotFound)
}

async fn find_vote(
    txn: &DatabaseTransaction,
    review_id: Uuid,
    user_id: Uuid,
) -> Result<Option<review_vote::Model>, RepositoryError> {
    ReviewVote::find()
        .filter(review_vote::Column::ReviewId.eq(review_id))
        .filter(review_vote::Column::UserId.eq(user_id))
        .one(txn)
        .await
        .map_err(RepositoryError::database_error)
}

/// Inserts a vote; when a concurrent request by the same user won the
/// unique index, overwrites that vote instead.
async fn insert_or_replace_vote(
    txn: &DatabaseTransaction,
    review_id: Uuid,
    user_id: Uuid,
    helpful: bool,
) -> Result<(), RepositoryError> {
    let Err(err) = insert_vote(txn, review_id, user_id, helpful).await else {
        return Ok(());
    };
    if !is_unique_violation(&err) {
        return Err(RepositoryError::database_error(err));
    }

    tracing::debug!(review_id = %review_id, user_id = %user_id, "Vote insert raced; updating");
    let raced = find_vote(txn, review_id, user_id)
        .await?
        .ok_or_else(|| RepositoryError::Conflict("vote changed concurrently".to_string()))?;
    set_vote(txn, raced.id, helpful).await
}

async fn insert_vote(
    txn: &DatabaseTransaction,
    review_id: Uuid,
    user_id: Uuid,
    helpful: bool,
) -> Result<(), sea_orm::DbErr> {
    let now = Utc::now();
    let savepoint = txn.begin().await?;
    let result = review_vote::ActiveModel {
        id: Set(Uuid::new_v4()),
        review_id: Set(review_id),
        user_id: Set(user_id),
        is_helpful: Set(helpful),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&savepoint)
    .await;

    match result {
        Ok(_) => savepoint.commit().await,
        Err(err) => {
            savepoint.rollback().await?;
            Err(err)
        }
    }
}

async fn set_vote(
    txn: &DatabaseTransaction,
    vote_id: Uuid,
    helpful: bool,
) -> Result<(), RepositoryError> {
    ReviewVote::update_many()
        .col_expr(review_vote::Column::IsHelpful, Expr::value(helpful))
        .col_expr(
            review_vote::Column::UpdatedAt,
            Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())),
        )
        .filter(review_vote::Column::Id.eq(vote_id))
        .exec(txn)
        .await
        .map_err(RepositoryError::database_error)?;
    Ok(())
}

/// Recounts the helpful / not-helpful votes of a review from the vote rows.
pub(crate) async fn recompute_vote_counts<C: ConnectionTrait>(
    conn: &C,
    review_id: Uuid,
) -> Result<review::Model, RepositoryError> {
    let helpful = ReviewVote::find()
        .filter(review_vote::Column::ReviewId.eq(review_id))
        .filter(review_vote::Column::IsHelpful.eq(true))
        .count(conn)
        .await
        .map_err(RepositoryError::database_error)?;
    let not_helpful = ReviewVote::find()
        .filter(review_vote::Column::ReviewId.eq(review_id))
        .filter(review_vote::Column::IsHelpful.eq(false))
        .count(conn)
        .await
        .map_err(RepositoryError::database_error)?;

    Review::update_many()
        .col_expr(review::Column::HelpfulCount, Expr::value(helpful as i32))
        .col_expr(review::Column::NotHelpfulCount, Expr::value(not_helpful as i32))
        .filter(review::Column::Id.eq(review_id))
        .exec(conn)
        .await
        .map_err(RepositoryError::database_error)?;

    Review::find_by_id(review_id)
        .one(conn)
        .await
        .map_err(RepositoryError::database_error)?
        .ok_or(RepositoryError::ReviewNotFound)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    use super::*;
    use crate::config::AppConfig;
    use crate::domain::{EntityKind, ReviewDraft};
    use crate::repositories::{ReviewRepository, UserProfileRepository};

    async fn setup() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn profile(db: &DatabaseConnection, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        UserProfileRepository::new(db)
            .upsert_profile(id, &format!("{name}@example.com"), None, false)
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn losing_insert_race_overwrites_the_existing_vote() {
        let db = setup().await;
        let author = profile(&db, "author").await;
        let reader = profile(&db, "reader").await;

        let ratings: BTreeMap<String, i64> = EntityKind::RentCompany
            .categories()
            .iter()
            .map(|category| (category.to_string(), 4))
            .collect();
        let draft = ReviewDraft {
            name: Some("Vote Props".to_string()),
            city: Some("Ottawa".to_string()),
            province: Some("ON".to_string()),
            ratings,
            ..Default::default()
        }
        .validate(EntityKind::RentCompany, &AppConfig::default().submission_limits())
        .unwrap();
        let review = ReviewRepository::new(&db)
            .upsert(author, draft, 3.0)
            .await
            .unwrap()
            .review;

        let votes = VoteRepository::new(&db);
        votes.cast(review.id, reader, true).await.unwrap();

        // The lookup missed, but the other request's vote is already there
        let txn = db.begin().await.unwrap();
        insert_or_replace_vote(&txn, review.id, reader, false)
            .await
            .unwrap();
        let counted = recompute_vote_counts(&txn, review.id).await.unwrap();
        txn.commit().await.unwrap();

        assert_eq!((counted.helpful_count, counted.not_helpful_count), (0, 1));
        assert_eq!(ReviewVote::find().count(&db).await.unwrap(), 1);
    }
}
