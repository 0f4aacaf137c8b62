//! Integration tests for submission, resolution, moderation and aggregates.

use anyhow::Result;
use rent_reviews::cursor::{decode_cursor, encode_cursor};
use rent_reviews::domain::{EntityKey, EntityKind, ModerationAction, ReviewStatus};
use rent_reviews::error::RepositoryError;
use rent_reviews::repositories::{EntityFilter, EntityRepository, ReviewRepository};
use rent_reviews::domain::DomainError;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{building_draft, create_admin, create_user, landlord_draft, setup_test_db, submit};

#[tokio::test]
async fn resubmission_updates_the_same_review() -> Result<()> {
    let db = setup_test_db().await?;
    let user = create_user(&db, "alice").await?;

    let first = submit(&db, user, EntityKind::Building, building_draft("10 Main St", "Ottawa", 4)).await?;
    let second = submit(
        &db,
        user,
        EntityKind::Building,
        building_draft("  10 MAIN st ", "ottawa", 5),
    )
    .await?;

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.review.id, second.review.id);
    assert_eq!(first.entity.id, second.entity.id);
    assert_eq!(second.review.average_rating, 5.0);

    let mine = ReviewRepository::new(&db).list_for_user(user).await?;
    assert_eq!(mine.len(), 1);
    Ok(())
}

#[tokio::test]
async fn threshold_decides_initial_visibility() -> Result<()> {
    let db = setup_test_db().await?;
    let happy = create_user(&db, "happy").await?;
    let unhappy = create_user(&db, "unhappy").await?;

    let approved = submit(&db, happy, EntityKind::Building, building_draft("1 Elm St", "Calgary", 5)).await?;
    assert_eq!(approved.review.review_status()?, ReviewStatus::Approved);
    assert_eq!(approved.entity.total_reviews, 1);
    assert_eq!(approved.entity.overall_rating, 5.0);

    let pending = submit(&db, unhappy, EntityKind::Building, building_draft("1 Elm St", "Calgary", 1)).await?;
    assert_eq!(pending.review.review_status()?, ReviewStatus::Pending);
    assert_eq!(pending.entity.total_reviews, 1);
    assert_eq!(pending.entity.overall_rating, 5.0);

    let visible = ReviewRepository::new(&db).list_approved(pending.entity.id).await?;
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, approved.review.id);
    Ok(())
}

#[tokio::test]
async fn resolver_uses_id_or_slug_never_both() -> Result<()> {
    let db = setup_test_db().await?;
    let user = create_user(&db, "resolver").await?;
    let outcome = submit(&db, user, EntityKind::Landlord, landlord_draft("Acme Homes", 4)).await?;
    let repo = EntityRepository::new(&db);

    assert_eq!(outcome.entity.slug, "acme-homes-toronto");

    let by_slug = repo
        .resolve(EntityKind::Landlord, &EntityKey::parse("acme-homes-toronto"))
        .await?;
    assert_eq!(by_slug.id, outcome.entity.id);

    let by_id = repo
        .resolve(EntityKind::Landlord, &EntityKey::parse(&outcome.entity.id.to_string()))
        .await?;
    assert_eq!(by_id.id, outcome.entity.id);

    // A UUID-shaped key that is not an id never falls back to slug lookup
    let missing = repo
        .resolve(
            EntityKind::Landlord,
            &EntityKey::parse("00000000-0000-0000-0000-000000000000"),
        )
        .await;
    assert!(matches!(missing, Err(RepositoryError::EntityNotFound)));

    let wrong_kind = repo
        .resolve(EntityKind::RentCompany, &EntityKey::parse("acme-homes-toronto"))
        .await;
    assert!(matches!(wrong_kind, Err(RepositoryError::EntityNotFound)));
    Ok(())
}

#[tokio::test]
async fn colliding_slug_gets_id_suffix() -> Result<()> {
    let db = setup_test_db().await?;
    let user = create_user(&db, "slugger").await?;

    // Same name and city, different province: distinct entities, same base slug
    let first = submit(&db, user, EntityKind::Landlord, landlord_draft("Acme Homes", 4)).await?;
    let mut other = landlord_draft("Acme Homes", 4);
    other.province = Some("QC".to_string());
    let second = submit(&db, user, EntityKind::Landlord, other).await?;

    assert_ne!(first.entity.id, second.entity.id);
    assert_eq!(first.entity.slug, "acme-homes-toronto");
    let suffix = &second.entity.id.simple().to_string()[..8];
    assert_eq!(second.entity.slug, format!("acme-homes-toronto-{suffix}"));
    Ok(())
}

#[tokio::test]
async fn moderation_follows_the_state_machine() -> Result<()> {
    let db = setup_test_db().await?;
    let user = create_user(&db, "writer").await?;
    let admin = create_admin(&db, "moderator").await?;
    let repo = ReviewRepository::new(&db);

    let outcome = submit(&db, user, EntityKind::Building, building_draft("5 Oak Ave", "Halifax", 2)).await?;
    let review_id = outcome.review.id;
    let entity_id = outcome.entity.id;

    // hide and unhide do not apply to pending reviews
    let err = repo
        .moderate(review_id, ModerationAction::Hide, admin, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Domain(DomainError::InvalidTransition { .. })
    ));

    let approved = repo
        .moderate(review_id, ModerationAction::Approve, admin, Some("ok".to_string()))
        .await?;
    assert_eq!(approved.review_status()?, ReviewStatus::Approved);
    assert_eq!(approved.reviewed_by, Some(admin));
    assert_eq!(approved.admin_note.as_deref(), Some("ok"));
    assert_eq!(repo.list_approved(entity_id).await?.len(), 1);

    let hidden = repo
        .moderate(review_id, ModerationAction::Hide, admin, None)
        .await?;
    assert_eq!(hidden.review_status()?, ReviewStatus::Rejected);
    assert!(repo.list_approved(entity_id).await?.is_empty());

    // approve only applies to pending
    let err = repo
        .moderate(review_id, ModerationAction::Approve, admin, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Domain(DomainError::InvalidTransition { .. })
    ));

    let restored = repo
        .moderate(review_id, ModerationAction::Unhide, admin, None)
        .await?;
    assert_eq!(restored.review_status()?, ReviewStatus::Approved);

    let entity = EntityRepository::new(&db)
        .resolve(EntityKind::Building, &EntityKey::Id(entity_id))
        .await?;
    assert_eq!(entity.total_reviews, 1);
    assert_eq!(entity.overall_rating, 2.0);
    Ok(())
}

#[tokio::test]
async fn resubmission_cannot_undo_an_admin_hide() -> Result<()> {
    let db = setup_test_db().await?;
    let user = create_user(&db, "editor").await?;
    let admin = create_admin(&db, "mod").await?;
    let repo = ReviewRepository::new(&db);

    let outcome = submit(&db, user, EntityKind::Landlord, landlord_draft("Brick Co", 5)).await?;
    repo.moderate(outcome.review.id, ModerationAction::Hide, admin, Some("abusive".to_string()))
        .await?;

    let resubmitted = submit(&db, user, EntityKind::Landlord, landlord_draft("Brick Co", 5)).await?;
    assert_eq!(resubmitted.review.id, outcome.review.id);
    assert_eq!(resubmitted.review.review_status()?, ReviewStatus::Rejected);
    assert_eq!(resubmitted.review.admin_note.as_deref(), Some("abusive"));
    assert_eq!(resubmitted.review.reviewed_by, Some(admin));
    assert!(repo.list_approved(outcome.entity.id).await?.is_empty());
    assert_eq!(resubmitted.entity.total_reviews, 0);

    // Only the admin can bring it back
    let restored = repo
        .moderate(outcome.review.id, ModerationAction::Unhide, admin, None)
        .await?;
    assert_eq!(restored.review_status()?, ReviewStatus::Approved);
    Ok(())
}

#[tokio::test]
async fn resubmission_reruns_the_threshold_for_unrejected_reviews() -> Result<()> {
    let db = setup_test_db().await?;
    let user = create_user(&db, "flipper").await?;
    let admin = create_admin(&db, "mod").await?;
    let repo = ReviewRepository::new(&db);

    let outcome = submit(&db, user, EntityKind::Landlord, landlord_draft("Flip Co", 2)).await?;
    repo.moderate(outcome.review.id, ModerationAction::Approve, admin, Some("fair".to_string()))
        .await?;

    // An approved review edited below the threshold goes back to the queue
    let lowered = submit(&db, user, EntityKind::Landlord, landlord_draft("Flip Co", 1)).await?;
    assert_eq!(lowered.review.review_status()?, ReviewStatus::Pending);
    assert_eq!(lowered.review.reviewed_by, Some(admin));
    assert_eq!(lowered.entity.total_reviews, 0);

    let raised = submit(&db, user, EntityKind::Landlord, landlord_draft("Flip Co", 4)).await?;
    assert_eq!(raised.review.review_status()?, ReviewStatus::Approved);
    assert_eq!(raised.entity.overall_rating, 4.0);
    Ok(())
}

#[tokio::test]
async fn aggregates_track_approved_reviews() -> Result<()> {
    let db = setup_test_db().await?;
    let a = create_user(&db, "a").await?;
    let b = create_user(&db, "b").await?;
    let c = create_user(&db, "c").await?;

    submit(&db, a, EntityKind::Landlord, landlord_draft("Tri Prop", 5)).await?;
    submit(&db, b, EntityKind::Landlord, landlord_draft("Tri Prop", 4)).await?;
    let last = submit(&db, c, EntityKind::Landlord, landlord_draft("tri prop", 4)).await?;

    assert_eq!(last.entity.total_reviews, 3);
    assert_eq!(last.entity.overall_rating, 4.33);

    ReviewRepository::new(&db).delete_own(a, last.review.id).await.unwrap_err();
    let mine = ReviewRepository::new(&db).list_for_user(c).await?;
    ReviewRepository::new(&db).delete_own(c, mine[0].0.id).await?;

    let entity = EntityRepository::new(&db)
        .resolve(EntityKind::Landlord, &EntityKey::Id(last.entity.id))
        .await?;
    assert_eq!(entity.total_reviews, 2);
    assert_eq!(entity.overall_rating, 4.5);
    Ok(())
}

#[tokio::test]
async fn listing_pages_by_name_with_filters() -> Result<()> {
    let db = setup_test_db().await?;
    let user = create_user(&db, "lister").await?;
    for name in ["Delta Rentals", "Alpha Rentals", "Charlie Homes", "Bravo Rentals"] {
        submit(&db, user, EntityKind::Landlord, landlord_draft(name, 4)).await?;
    }
    let repo = EntityRepository::new(&db);

    let first = repo
        .list(EntityKind::Landlord, &EntityFilter::default(), None, 3)
        .await?;
    let names: Vec<_> = first.items.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Alpha Rentals", "Bravo Rentals", "Charlie Homes"]);

    // The cursor survives its opaque encoding
    let next = first.next.expect("more pages");
    let cursor = decode_cursor(&encode_cursor(&next.name, &next.id)).expect("cursor decodes");
    let second = repo
        .list(EntityKind::Landlord, &EntityFilter::default(), Some(&cursor), 3)
        .await?;
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].name, "Delta Rentals");
    assert!(second.next.is_none());

    let searched = repo
        .list(
            EntityKind::Landlord,
            &EntityFilter {
                city: Some("toronto".to_string()),
                province: Some("on".to_string()),
                search: Some("RENTALS".to_string()),
            },
            None,
            10,
        )
        .await?;
    assert_eq!(searched.items.len(), 3);

    let other_city = repo
        .list(
            EntityKind::Landlord,
            &EntityFilter {
                city: Some("Vancouver".to_string()),
                ..Default::default()
            },
            None,
            10,
        )
        .await?;
    assert!(other_city.items.is_empty());

    let other_kind = repo
        .list(EntityKind::Building, &EntityFilter::default(), None, 10)
        .await?;
    assert!(other_kind.items.is_empty());
    Ok(())
}
