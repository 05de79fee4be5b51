use std::collections::HashMap;

use sea_orm::{ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, TransactionTrait};
use uuid::Uuid;

use models::{listing, review, user};

use crate::errors::ServiceError;
use crate::listing::domain::{ImageRef, Listing, ListingDetails, ReviewView, UserSummary};
use crate::listing::repository::{ListingRepository, ReviewCollection};

pub struct SeaOrmListingRepository {
    pub db: DatabaseConnection,
}

/// Review deletes always run on the transaction opened by the listing repository.
pub struct SeaOrmReviewCollection;

fn to_domain(m: listing::Model) -> Listing {
    Listing {
        id: m.id,
        title: m.title,
        description: m.description,
        price: m.price,
        location: m.location,
        country: m.country,
        image: ImageRef { filename: m.image_filename, url: m.image_url },
        owner_id: m.owner_id,
        reviews: m.reviews,
    }
}

fn to_model(l: Listing) -> listing::Model {
    // timestamps are stamped by models::listing on write
    let now = chrono::Utc::now().into();
    listing::Model {
        id: l.id,
        title: l.title,
        description: l.description,
        price: l.price,
        location: l.location,
        country: l.country,
        image_filename: l.image.filename,
        image_url: l.image.url,
        owner_id: l.owner_id,
        reviews: l.reviews,
        created_at: now,
        updated_at: now,
    }
}

fn user_summary(u: user::Model) -> UserSummary {
    UserSummary { id: u.id, username: u.username, email: u.email }
}

#[async_trait::async_trait]
impl ListingRepository for SeaOrmListingRepository {
    type Tx = DatabaseTransaction;

    async fn list(&self) -> Result<Vec<Listing>, ServiceError> {
        let rows = listing::Entity::find()
            .order_by_asc(listing::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(to_domain).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>, ServiceError> {
        Ok(listing::Entity::find_by_id(id).one(&self.db).await?.map(to_domain))
    }

    async fn find_details(&self, id: Uuid) -> Result<Option<ListingDetails>, ServiceError> {
        let Some(found) = listing::Entity::find_by_id(id).one(&self.db).await? else { return Ok(None) };

        let owner = user::Entity::find_by_id(found.owner_id).one(&self.db).await?.map(user_summary);

        let mut by_id: HashMap<Uuid, ReviewView> = HashMap::new();
        if !found.reviews.is_empty() {
            let rows = review::Entity::find()
                .filter(review::Column::Id.is_in(found.reviews.iter().copied()))
                .find_also_related(user::Entity)
                .all(&self.db)
                .await?;
            for (r, author) in rows {
                by_id.insert(r.id, ReviewView { id: r.id, comment: r.comment, rating: r.rating, author: author.map(user_summary) });
            }
        }
        // keep the order stored on the listing; dangling refs are dropped
        let reviews = found.reviews.iter().filter_map(|rid| by_id.remove(rid)).collect();

        Ok(Some(ListingDetails { listing: to_domain(found), owner, reviews }))
    }

    async fn insert(&self, l: Listing) -> Result<Listing, ServiceError> {
        let created = listing::insert(&self.db, to_model(l)).await?;
        Ok(to_domain(created))
    }

    async fn save(&self, l: Listing) -> Result<Listing, ServiceError> {
        let saved = listing::save(&self.db, to_model(l))
            .await?
            .ok_or_else(|| ServiceError::not_found("listing"))?;
        Ok(to_domain(saved))
    }

    async fn begin(&self) -> Result<DatabaseTransaction, ServiceError> {
        Ok(self.db.begin().await?)
    }

    async fn delete_by_id(&self, txn: &DatabaseTransaction, id: Uuid) -> Result<Option<Listing>, ServiceError> {
        let Some(found) = listing::Entity::find_by_id(id).one(txn).await? else { return Ok(None) };
        listing::Entity::delete_by_id(id).exec(txn).await?;
        Ok(Some(to_domain(found)))
    }

    async fn commit(&self, txn: DatabaseTransaction) -> Result<(), ServiceError> {
        Ok(txn.commit().await?)
    }
}

#[async_trait::async_trait]
impl ReviewCollection<DatabaseTransaction> for SeaOrmReviewCollection {
    async fn delete_many(&self, txn: &DatabaseTransaction, ids: &[Uuid]) -> Result<u64, ServiceError> {
        Ok(review::delete_many(txn, ids).await?)
    }
}
