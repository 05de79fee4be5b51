use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Listing: index on owner_id
        manager
            .create_index(
                Index::create()
                    .name("idx_listing_owner")
                    .table(Listing::Table)
                    .col(Listing::OwnerId)
                    .to_owned(),
            )
            .await?;

        // Review: index on author_id for populate lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_review_author")
                    .table(Review::Table)
                    .col(Review::AuthorId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_listing_owner").table(Listing::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_review_author").table(Review::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Listing { Table, OwnerId }

#[derive(DeriveIden)]
enum Review { Table, AuthorId }
