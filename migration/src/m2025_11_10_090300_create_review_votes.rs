//! Migration to create the review_votes table.
//!
//! Helpfulness votes; the counters on `reviews` are derived from these rows.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReviewVotes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReviewVotes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReviewVotes::ReviewId).uuid().not_null())
                    .col(ColumnDef::new(ReviewVotes::UserId).uuid().not_null())
                    .col(ColumnDef::new(ReviewVotes::IsHelpful).boolean().not_null())
                    .col(
                        ColumnDef::new(ReviewVotes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ReviewVotes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_votes_review_id")
                            .from(ReviewVotes::Table, ReviewVotes::ReviewId)
                            .to(Reviews::Table, Reviews::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_votes_user_id")
                            .from(ReviewVotes::Table, ReviewVotes::UserId)
                            .to(UserProfiles::Table, UserProfiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_review_votes_review_user")
                    .table(ReviewVotes::Table)
                    .col(ReviewVotes::ReviewId)
                    .col(ReviewVotes::UserId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_review_votes_review_user")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ReviewVotes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ReviewVotes {
    Table,
    Id,
    ReviewId,
    UserId,
    IsHelpful,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Reviews {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum UserProfiles {
    Table,
    Id,
}
