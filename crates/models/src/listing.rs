use sea_orm::{entity::prelude::*, Set, ConnectionTrait};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors, user};

/// Filename stored when no image was uploaded. Never sent to the asset store.
pub const DEFAULT_IMAGE_FILENAME: &str = "listingimage";
pub const DEFAULT_IMAGE_URL: &str =
    "https://images.pexels.com/photos/843168/pexels-photo-843168.jpeg?auto=compress&cs=tinysrgb&w=800";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "listing")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub location: Option<String>,
    pub country: Option<String>,
    pub image_filename: String,
    pub image_url: String,
    pub owner_id: Uuid,
    pub reviews: Vec<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Owner }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Owner => Entity::belongs_to(user::Entity)
                .from(Column::OwnerId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::Owner.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_title(t: &str) -> Result<(), errors::ModelError> {
    if t.trim().is_empty() {
        return Err(errors::ModelError::Validation("title required".into()));
    }
    Ok(())
}

pub fn validate_price(p: f64) -> Result<(), errors::ModelError> {
    if !p.is_finite() || p < 0.0 {
        return Err(errors::ModelError::Validation("price must be a non-negative number".into()));
    }
    Ok(())
}

/// A filename that came from a real upload, as opposed to the placeholder.
pub fn is_uploaded_image(filename: &str) -> bool {
    !filename.trim().is_empty() && filename != DEFAULT_IMAGE_FILENAME
}

pub fn validate(m: &Model) -> Result<(), errors::ModelError> {
    validate_title(&m.title)?;
    validate_price(m.price)?;
    let mut seen = std::collections::HashSet::with_capacity(m.reviews.len());
    if !m.reviews.iter().all(|id| seen.insert(*id)) {
        return Err(errors::ModelError::Validation("duplicate review reference".into()));
    }
    Ok(())
}

/// Insert a fully-built row after validation. Timestamps are stamped here.
pub async fn insert<C: ConnectionTrait>(db: &C, m: Model) -> Result<Model, errors::ModelError> {
    validate(&m)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(m.id),
        title: Set(m.title),
        description: Set(m.description),
        price: Set(m.price),
        location: Set(m.location),
        country: Set(m.country),
        image_filename: Set(m.image_filename),
        image_url: Set(m.image_url),
        owner_id: Set(m.owner_id),
        reviews: Set(m.reviews),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

/// Persist mutable columns of an existing row. `owner_id`, `reviews` and
/// `created_at` are left as stored. Returns `None` when the row is gone.
pub async fn save<C: ConnectionTrait>(db: &C, m: Model) -> Result<Option<Model>, errors::ModelError> {
    validate(&m)?;
    let Some(existing) = Entity::find_by_id(m.id)
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))?
    else {
        return Ok(None);
    };
    let mut found: ActiveModel = existing.into();
    found.title = Set(m.title);
    found.description = Set(m.description);
    found.price = Set(m.price);
    found.location = Set(m.location);
    found.country = Set(m.country);
    found.image_filename = Set(m.image_filename);
    found.image_url = Set(m.image_url);
    found.updated_at = Set(Utc::now().into());
    found.update(db).await.map(Some).map_err(|e| errors::ModelError::Db(e.to_string()))
}

/// Append a review reference, keeping the set unique.
pub async fn push_review<C: ConnectionTrait>(db: &C, id: Uuid, review_id: Uuid) -> Result<Model, errors::ModelError> {
    let existing = Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))?
        .ok_or_else(|| errors::ModelError::Validation("listing not found".into()))?;
    if existing.reviews.contains(&review_id) {
        return Ok(existing);
    }
    let mut reviews = existing.reviews.clone();
    reviews.push(review_id);
    let mut am: ActiveModel = existing.into();
    am.reviews = Set(reviews);
    am.update(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}
