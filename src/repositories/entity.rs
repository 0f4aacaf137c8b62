//! # Ratable Entity Repository
//!
//! Lookup, creation, listing and deletion of ratable entities, plus the
//! aggregate recomputation shared by every review mutation.

use chrono::Utc;
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::cursor::CursorData;
use crate::domain::rating::aggregate;
use crate::domain::slug::{disambiguate, slugify};
use crate::domain::submission::match_key;
use crate::domain::{EntityIdentity, EntityKey, EntityKind, ReviewStatus};
use crate::error::{RepositoryError, is_unique_violation};
use crate::models::ratable_entity::{self, Entity as RatableEntity};
use crate::models::review::{self, Entity as Review};
use crate::models::review_vote::{self, Entity as ReviewVote};

/// Filters for [`EntityRepository::list`]
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    pub city: Option<String>,
    pub province: Option<String>,
    /// Case-insensitive substring of the name
    pub search: Option<String>,
}

/// One page of entities plus the position after its last row
#[derive(Debug, Clone)]
pub struct EntityPage {
    pub items: Vec<ratable_entity::Model>,
    pub next: Option<CursorData>,
}

/// Repository for ratable entity database operations
pub struct EntityRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> EntityRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Resolves a route key within `kind`: a UUID only by id, anything else
    /// only by exact slug.
    pub async fn resolve(
        &self,
        kind: EntityKind,
        key: &EntityKey,
    ) -> Result<ratable_entity::Model, RepositoryError> {
        let query = RatableEntity::find().filter(ratable_entity::Column::Kind.eq(kind.as_str()));
        let query = match key {
            EntityKey::Id(id) => query.filter(ratable_entity::Column::Id.eq(*id)),
            EntityKey::Slug(slug) => query.filter(ratable_entity::Column::Slug.eq(slug.as_str())),
        };

        query
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or(RepositoryError::EntityNotFound)
    }

    /// Lists entities of `kind` ordered by name then id, starting after `after`.
    ///
    /// Fetches one extra row to decide whether another page exists.
    pub async fn list(
        &self,
        kind: EntityKind,
        filter: &EntityFilter,
        after: Option<&CursorData>,
        limit: u64,
    ) -> Result<EntityPage, RepositoryError> {
        let mut query =
            RatableEntity::find().filter(ratable_entity::Column::Kind.eq(kind.as_str()));

        if let Some(city) = filter.city.as_deref().map(match_key).filter(|v| !v.is_empty()) {
            query = query.filter(ratable_entity::Column::CityKey.eq(city));
        }
        if let Some(province) = filter.province.as_deref().map(match_key).filter(|v| !v.is_empty()) {
            query = query.filter(ratable_entity::Column::ProvinceKey.eq(province));
        }
        if let Some(search) = filter.search.as_deref().map(match_key).filter(|v| !v.is_empty()) {
            let escaped = search
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            query = query.filter(
                Expr::col(ratable_entity::Column::NameKey)
                    .like(LikeExpr::new(format!("%{escaped}%")).escape('\\')),
            );
        }
        if let Some(cursor) = after {
            query = query.filter(
                Condition::any()
                    .add(ratable_entity::Column::Name.gt(cursor.name.clone()))
                    .add(
                        Condition::all()
                            .add(ratable_entity::Column::Name.eq(cursor.name.clone()))
                            .add(ratable_entity::Column::Id.gt(cursor.id)),
                    ),
            );
        }

        let mut items = query
            .order_by_asc(ratable_entity::Column::Name)
            .order_by_asc(ratable_entity::Column::Id)
            .limit(limit + 1)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let next = if items.len() as u64 > limit {
            items.truncate(limit as usize);
            items.last().map(|last| CursorData {
                name: last.name.clone(),
                id: last.id,
            })
        } else {
            None
        };

        Ok(EntityPage { items, next })
    }

    /// Deletes an entity together with its reviews and their votes.
    pub async fn delete(&self, kind: EntityKind, id: Uuid) -> Result<(), RepositoryError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let entity = RatableEntity::find_by_id(id)
            .filter(ratable_entity::Column::Kind.eq(kind.as_str()))
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or(RepositoryError::EntityNotFound)?;

        let review_ids: Vec<Uuid> = Review::find()
            .select_only()
            .column(review::Column::Id)
            .filter(review::Column::EntityId.eq(entity.id))
            .into_tuple()
            .all(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        if !review_ids.is_empty() {
            ReviewVote::delete_many()
                .filter(review_vote::Column::ReviewId.is_in(review_ids))
                .exec(&txn)
                .await
                .map_err(RepositoryError::database_error)?;
        }

        Review::delete_many()
            .filter(review::Column::EntityId.eq(entity.id))
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        RatableEntity::delete_by_id(entity.id)
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(entity_id = %entity.id, kind = %kind, "Deleted entity");
        Ok(())
    }
}

/// Finds the entity matching `identity` by its natural key, creating it when absent.
pub(crate) async fn find_or_create(
    txn: &DatabaseTransaction,
    identity: &EntityIdentity,
) -> Result<ratable_entity::Model, RepositoryError> {
    let natural_key = identity.natural_key();
    match find_by_natural_key(txn, identity.kind, &natural_key).await? {
        Some(existing) => Ok(existing),
        None => create_or_reuse(txn, identity, &natural_key).await,
    }
}

async fn find_by_natural_key(
    txn: &DatabaseTransaction,
    kind: EntityKind,
    natural_key: &str,
) -> Result<Option<ratable_entity::Model>, RepositoryError> {
    RatableEntity::find()
        .filter(ratable_entity::Column::Kind.eq(kind.as_str()))
        .filter(ratable_entity::Column::NaturalKey.eq(natural_key))
        .one(txn)
        .await
        .map_err(RepositoryError::database_error)
}

/// Inserts a new entity. When a concurrent submission created the same
/// entity first, returns that row; when only the slug collided, retries
/// once with the id suffix.
async fn create_or_reuse(
    txn: &DatabaseTransaction,
    identity: &EntityIdentity,
    natural_key: &str,
) -> Result<ratable_entity::Model, RepositoryError> {
    let kind = identity.kind;
    let id = Uuid::new_v4();
    let base_slug = slugify(&[identity.name.as_str(), identity.city.as_str()]);
    let slug_taken = base_slug.is_empty()
        || RatableEntity::find()
            .filter(ratable_entity::Column::Kind.eq(kind.as_str()))
            .filter(ratable_entity::Column::Slug.eq(base_slug.clone()))
            .one(txn)
            .await
            .map_err(RepositoryError::database_error)?
            .is_some();

    let slug = if slug_taken {
        disambiguate(&base_slug, id)
    } else {
        base_slug.clone()
    };

    let err = match insert_entity(txn, id, identity, natural_key, slug).await {
        Ok(created) => return Ok(created),
        Err(err) if is_unique_violation(&err) => err,
        Err(err) => return Err(RepositoryError::database_error(err)),
    };

    if let Some(existing) = find_by_natural_key(txn, kind, natural_key).await? {
        tracing::debug!(entity_id = %existing.id, kind = %kind, "Entity insert raced; reusing");
        return Ok(existing);
    }
    if slug_taken {
        return Err(RepositoryError::database_error(err));
    }
    insert_entity(txn, id, identity, natural_key, disambiguate(&base_slug, id))
        .await
        .map_err(RepositoryError::database_error)
}

async fn insert_entity(
    txn: &DatabaseTransaction,
    id: Uuid,
    identity: &EntityIdentity,
    natural_key: &str,
    slug: String,
) -> Result<ratable_entity::Model, sea_orm::DbErr> {
    let now = Utc::now();
    let savepoint = txn.begin().await?;
    let result = ratable_entity::ActiveModel {
        id: Set(id),
        kind: Set(identity.kind.as_str().to_string()),
        name: Set(identity.name.clone()),
        slug: Set(slug),
        address: Set(identity.address.clone()),
        city: Set(identity.city.clone()),
        province: Set(identity.province.clone()),
        cover_image_url: Set(None),
        name_key: Set(match_key(&identity.name)),
        city_key: Set(match_key(&identity.city)),
        province_key: Set(identity.province.as_deref().map(match_key).unwrap_or_default()),
        natural_key: Set(natural_key.to_string()),
        overall_rating: Set(0.0),
        total_reviews: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&savepoint)
    .await;

    match result {
        Ok(model) => {
            savepoint.commit().await?;
            tracing::info!(entity_id = %model.id, kind = %identity.kind, slug = %model.slug, "Created entity");
            Ok(model)
        }
        Err(err) => {
            savepoint.rollback().await?;
            Err(err)
        }
    }
}

/// Recomputes `overall_rating` and `total_reviews` from the approved reviews of an entity.
pub(crate) async fn recompute_aggregates<C: ConnectionTrait>(
    conn: &C,
    entity_id: Uuid,
) -> Result<(f64, i32), RepositoryError> {
    let averages: Vec<f64> = Review::find()
        .select_only()
        .column(review::Column::AverageRating)
        .filter(review::Column::EntityId.eq(entity_id))
        .filter(review::Column::Status.eq(ReviewStatus::Approved.as_str()))
        .into_tuple()
        .all(conn)
        .await
        .map_err(RepositoryError::database_error)?;

    let (overall, total) = aggregate(&averages);

    RatableEntity::update_many()
        .col_expr(ratable_entity::Column::OverallRating, Expr::value(overall))
        .col_expr(ratable_entity::Column::TotalReviews, Expr::value(total))
        .col_expr(
            ratable_entity::Column::UpdatedAt,
            Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())),
        )
        .filter(ratable_entity::Column::Id.eq(entity_id))
        .exec(conn)
        .await
        .map_err(RepositoryError::database_error)?;

    Ok((overall, total))
}

#[cfg(test)]
mod tests {
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, PaginatorTrait};

    use super::*;

    async fn setup() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    fn landlord(name: &str, city: &str) -> EntityIdentity {
        EntityIdentity {
            kind: EntityKind::Landlord,
            name: name.to_string(),
            address: None,
            city: city.to_string(),
            province: Some("ON".to_string()),
        }
    }

    #[tokio::test]
    async fn natural_key_is_unique_within_a_kind() {
        let db = setup().await;
        let acme = landlord("Acme", "Toronto");
        let key = acme.natural_key();

        let txn = db.begin().await.unwrap();
        insert_entity(&txn, Uuid::new_v4(), &acme, &key, "acme-toronto".to_string())
            .await
            .unwrap();
        let err = insert_entity(&txn, Uuid::new_v4(), &acme, &key, "acme-toronto-2".to_string())
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        // The same key under another kind is a different entity
        let company = EntityIdentity {
            kind: EntityKind::RentCompany,
            ..acme.clone()
        };
        insert_entity(&txn, Uuid::new_v4(), &company, &key, "acme-toronto".to_string())
            .await
            .unwrap();
        txn.commit().await.unwrap();

        assert_eq!(RatableEntity::find().count(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn losing_create_race_reuses_the_existing_entity() {
        let db = setup().await;

        let txn = db.begin().await.unwrap();
        let first = find_or_create(&txn, &landlord("Acme", "Toronto")).await.unwrap();
        txn.commit().await.unwrap();

        // The lookup missed, but the other submission's row is already there
        let late = landlord("ACME", "toronto");
        let txn = db.begin().await.unwrap();
        let reused = create_or_reuse(&txn, &late, &late.natural_key()).await.unwrap();
        txn.commit().await.unwrap();

        assert_eq!(reused.id, first.id);
        assert_eq!(reused.slug, "acme-toronto");
        assert_eq!(RatableEntity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn filters_fold_non_ascii_case() {
        let db = setup().await;
        let txn = db.begin().await.unwrap();
        find_or_create(&txn, &landlord("Gestion Béland", "Montréal")).await.unwrap();
        let again = find_or_create(&txn, &landlord("GESTION BÉLAND", "MONTRÉAL")).await.unwrap();
        txn.commit().await.unwrap();
        assert_eq!(RatableEntity::find().count(&db).await.unwrap(), 1);
        assert_eq!(again.name, "Gestion Béland");

        let page = EntityRepository::new(&db)
            .list(
                EntityKind::Landlord,
                &EntityFilter {
                    city: Some("MONTRÉAL".to_string()),
                    search: Some("béland".to_string()),
                    ..Default::default()
                },
                None,
                10,
            )
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn slug_lookup_is_exact() {
        let db = setup().await;
        let txn = db.begin().await.unwrap();
        find_or_create(&txn, &landlord("Acme", "Toronto")).await.unwrap();
        txn.commit().await.unwrap();
        let repo = EntityRepository::new(&db);

        repo.resolve(EntityKind::Landlord, &EntityKey::parse("acme-toronto"))
            .await
            .unwrap();
        let upper = repo
            .resolve(EntityKind::Landlord, &EntityKey::parse("ACME-Toronto"))
            .await;
        assert!(matches!(upper, Err(RepositoryError::EntityNotFound)));
    }
}
