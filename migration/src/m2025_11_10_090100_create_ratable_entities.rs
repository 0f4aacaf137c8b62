//! Migration to create the ratable_entities table.
//!
//! Neighborhoods, buildings, landlords and rent companies share one table,
//! discriminated by `kind`. Aggregate columns are maintained by the service.
//! The `*_key` columns hold lowercased, whitespace-collapsed copies of the
//! identifying fields, computed by the service before insert.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RatableEntities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RatableEntities::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RatableEntities::Kind).text().not_null())
                    .col(ColumnDef::new(RatableEntities::Name).text().not_null())
                    .col(ColumnDef::new(RatableEntities::Slug).text().not_null())
                    .col(ColumnDef::new(RatableEntities::Address).text().null())
                    .col(ColumnDef::new(RatableEntities::City).text().not_null())
                    .col(ColumnDef::new(RatableEntities::Province).text().null())
                    .col(ColumnDef::new(RatableEntities::CoverImageUrl).text().null())
                    .col(ColumnDef::new(RatableEntities::NameKey).text().not_null())
                    .col(ColumnDef::new(RatableEntities::CityKey).text().not_null())
                    .col(
                        ColumnDef::new(RatableEntities::ProvinceKey)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(RatableEntities::NaturalKey).text().not_null())
                    .col(
                        ColumnDef::new(RatableEntities::OverallRating)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(RatableEntities::TotalReviews)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RatableEntities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RatableEntities::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Slugs are route keys, so they must be unique within a kind
        manager
            .create_index(
                Index::create()
                    .name("idx_ratable_entities_kind_slug")
                    .table(RatableEntities::Table)
                    .col(RatableEntities::Kind)
                    .col(RatableEntities::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // One entity per natural key: address + city for buildings,
        // name + city + province for the other kinds
        manager
            .create_index(
                Index::create()
                    .name("idx_ratable_entities_kind_natural_key")
                    .table(RatableEntities::Table)
                    .col(RatableEntities::Kind)
                    .col(RatableEntities::NaturalKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ratable_entities_kind_city_key")
                    .table(RatableEntities::Table)
                    .col(RatableEntities::Kind)
                    .col(RatableEntities::CityKey)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_ratable_entities_kind_city_key")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_ratable_entities_kind_natural_key")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_ratable_entities_kind_slug")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(RatableEntities::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RatableEntities {
    Table,
    Id,
    Kind,
    Name,
    Slug,
    Address,
    City,
    Province,
    CoverImageUrl,
    NameKey,
    CityKey,
    ProvinceKey,
    NaturalKey,
    OverallRating,
    TotalReviews,
    CreatedAt,
    UpdatedAt,
}
