//! # User Profile Repository
//!
//! Profile lookup for authentication, role provisioning, bans and the
//! cascading user deletion.

use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use super::entity::recompute_aggregates;
use super::vote::recompute_vote_counts;
use crate::error::RepositoryError;
use crate::models::review::{self, Entity as Review};
use crate::models::review_vote::{self, Entity as ReviewVote};
use crate::models::user_profile::{self, Entity as UserProfile, ROLE_ADMIN, ROLE_USER};

/// What a user deletion removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionSummary {
    pub votes_removed: u64,
    pub reviews_removed: u64,
    /// Entities whose aggregates were recomputed
    pub entities_recomputed: usize,
}

/// Repository for user profile database operations
pub struct UserProfileRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserProfileRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<user_profile::Model>, RepositoryError> {
        UserProfile::find_by_id(user_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Creates the profile or updates its email, display name and role.
    pub async fn upsert_profile(
        &self,
        user_id: Uuid,
        email: &str,
        display_name: Option<String>,
        admin: bool,
    ) -> Result<user_profile::Model, RepositoryError> {
        let role = if admin { ROLE_ADMIN } else { ROLE_USER };
        let now = Utc::now();

        match self.find_by_id(user_id).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.email = Set(email.to_string());
                if display_name.is_some() {
                    active.display_name = Set(display_name);
                }
                active.role = Set(role.to_string());
                active.updated_at = Set(now.into());
                active
                    .update(self.db)
                    .await
                    .map_err(RepositoryError::database_error)
            }
            None => user_profile::ActiveModel {
                id: Set(user_id),
                email: Set(email.to_string()),
                display_name: Set(display_name),
                role: Set(role.to_string()),
                is_banned: Set(false),
                banned_at: Set(None),
                banned_reason: Set(None),
                banned_by: Set(None),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error),
        }
    }

    pub async fn ban(
        &self,
        target_id: Uuid,
        admin_id: Uuid,
        reason: Option<String>,
    ) -> Result<user_profile::Model, RepositoryError> {
        if target_id == admin_id {
            return Err(RepositoryError::Forbidden(
                "Admins cannot ban themselves".to_string(),
            ));
        }

        let target = self
            .find_by_id(target_id)
            .await?
            .ok_or(RepositoryError::UserNotFound)?;

        let now = Utc::now();
        let mut active = target.into_active_model();
        active.is_banned = Set(true);
        active.banned_at = Set(Some(now.into()));
        active.banned_reason = Set(reason);
        active.banned_by = Set(Some(admin_id));
        active.updated_at = Set(now.into());

        let updated = active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(user_id = %target_id, admin_id = %admin_id, "User banned");
        Ok(updated)
    }

    pub async fn unban(&self, target_id: Uuid) -> Result<user_profile::Model, RepositoryError> {
        let target = self
            .find_by_id(target_id)
            .await?
            .ok_or(RepositoryError::UserNotFound)?;

        let mut active = target.into_active_model();
        active.is_banned = Set(false);
        active.banned_at = Set(None);
        active.banned_reason = Set(None);
        active.banned_by = Set(None);
        active.updated_at = Set(Utc::now().into());

        let updated = active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(user_id = %target_id, "User unbanned");
        Ok(updated)
    }

    /// Deletes a user and everything they authored, in one transaction:
    /// their votes, their reviews (with the votes others cast on them), then
    /// the profile. Counters of every touched review and aggregates of every
    /// touched entity are recomputed before commit.
    pub async fn delete_user(
        &self,
        target_id: Uuid,
        admin_id: Uuid,
    ) -> Result<DeletionSummary, RepositoryError> {
        if target_id == admin_id {
            return Err(RepositoryError::Forbidden(
                "Admins cannot delete themselves".to_string(),
            ));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        UserProfile::find_by_id(target_id)
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or(RepositoryError::UserNotFound)?;

        // 1. The user's own votes
        let voted_reviews: BTreeSet<Uuid> = ReviewVote::find()
            .select_only()
            .column(review_vote::Column::ReviewId)
            .filter(review_vote::Column::UserId.eq(target_id))
            .into_tuple::<Uuid>()
            .all(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .collect();

        let votes_removed = ReviewVote::delete_many()
            .filter(review_vote::Column::UserId.eq(target_id))
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .rows_affected;

        // 2. The user's reviews, across all kinds
        let authored: Vec<(Uuid, Uuid)> = Review::find()
            .select_only()
            .column(review::Column::Id)
            .column(review::Column::EntityId)
            .filter(review::Column::UserId.eq(target_id))
            .into_tuple()
            .all(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        let authored_ids: BTreeSet<Uuid> = authored.iter().map(|(id, _)| *id).collect();
        let affected_entities: BTreeSet<Uuid> =
            authored.iter().map(|(_, entity_id)| *entity_id).collect();

        if !authored_ids.is_empty() {
            ReviewVote::delete_many()
                .filter(review_vote::Column::ReviewId.is_in(authored_ids.iter().copied()))
                .exec(&txn)
                .await
                .map_err(RepositoryError::database_error)?;
        }

        let reviews_removed = Review::delete_many()
            .filter(review::Column::UserId.eq(target_id))
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .rows_affected;

        for review_id in voted_reviews.difference(&authored_ids) {
            recompute_vote_counts(&txn, *review_id).await?;
        }
        for entity_id in &affected_entities {
            recompute_aggregates(&txn, *entity_id).await?;
        }

        // 3. The profile
        UserProfile::delete_by_id(target_id)
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        let summary = DeletionSummary {
            votes_removed,
            reviews_removed,
            entities_recomputed: affected_entities.len(),
        };
        tracing::info!(
            user_id = %target_id,
            admin_id = %admin_id,
            votes_removed = summary.votes_removed,
            reviews_removed = summary.reviews_removed,
            entities_recomputed = summary.entities_recomputed,
            "User deleted"
        );
        Ok(summary)
    }
}
