//! Create `listing` table with FK to `user` (owner).
//!
//! The image is embedded as filename/url columns; `reviews` is a uuid array
//! pruned by the delete cascade.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Listing::Table)
                    .if_not_exists()
                    .col(uuid(Listing::Id).primary_key())
                    .col(string_len(Listing::Title, 256).not_null())
                    .col(text_null(Listing::Description))
                    .col(double(Listing::Price).not_null())
                    .col(string_len_null(Listing::Location, 256))
                    .col(string_len_null(Listing::Country, 128))
                    .col(string_len(Listing::ImageFilename, 256).not_null())
                    .col(string_len(Listing::ImageUrl, 1024).not_null())
                    .col(uuid(Listing::OwnerId).not_null())
                    .col(
                        array(Listing::Reviews, ColumnType::Uuid)
                            .not_null()
                            .default(Expr::cust("'{}'::uuid[]")),
                    )
                    .col(timestamp_with_time_zone(Listing::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Listing::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_listing_owner")
                            .from(Listing::Table, Listing::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Listing::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Listing {
    Table,
    Id,
    Title,
    Description,
    Price,
    Location,
    Country,
    ImageFilename,
    ImageUrl,
    OwnerId,
    Reviews,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }
