//! Migration to create the reviews table.
//!
//! One row per (entity, user). Sub-ratings are stored as a JSON object keyed
//! by category; the category set is fixed per entity kind.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Reviews::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Reviews::EntityId).uuid().not_null())
                    .col(ColumnDef::new(Reviews::EntityKind).text().not_null())
                    .col(ColumnDef::new(Reviews::UserId).uuid().not_null())
                    .col(ColumnDef::new(Reviews::Ratings).json_binary().not_null())
                    .col(ColumnDef::new(Reviews::AverageRating).double().not_null())
                    .col(ColumnDef::new(Reviews::Comment).text().null())
                    .col(ColumnDef::new(Reviews::ImageUrls).json_binary().not_null())
                    .col(
                        ColumnDef::new(Reviews::IsAnonymous)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Reviews::DisplayName).text().null())
                    .col(
                        ColumnDef::new(Reviews::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Reviews::HelpfulCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Reviews::NotHelpfulCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Reviews::AdminNote).text().null())
                    .col(ColumnDef::new(Reviews::ReviewedBy).uuid().null())
                    .col(
                        ColumnDef::new(Reviews::ReviewedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Reviews::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Reviews::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_entity_id")
                            .from(Reviews::Table, Reviews::EntityId)
                            .to(RatableEntities::Table, RatableEntities::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_user_id")
                            .from(Reviews::Table, Reviews::UserId)
                            .to(UserProfiles::Table, UserProfiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one review per user and entity
        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_entity_user")
                    .table(Reviews::Table)
                    .col(Reviews::EntityId)
                    .col(Reviews::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_entity_status")
                    .table(Reviews::Table)
                    .col(Reviews::EntityId)
                    .col(Reviews::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_status_created")
                    .table(Reviews::Table)
                    .col(Reviews::Status)
                    .col(Reviews::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for index in [
            "idx_reviews_status_created",
            "idx_reviews_entity_status",
            "idx_reviews_entity_user",
        ] {
            manager
                .drop_index(Index::drop().name(index).to_owned())
                .await?;
        }

        manager
            .drop_table(Table::drop().table(Reviews::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Reviews {
    Table,
    Id,
    EntityId,
    EntityKind,
    UserId,
    Ratings,
    AverageRating,
    Comment,
    ImageUrls,
    IsAnonymous,
    DisplayName,
    Status,
    HelpfulCount,
    NotHelpfulCount,
    AdminNote,
    ReviewedBy,
    ReviewedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RatableEntities {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum UserProfiles {
    Table,
    Id,
}
