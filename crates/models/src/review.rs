use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "review")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub comment: String,
    pub rating: i16,
    pub author_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Author }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Author => Entity::belongs_to(user::Entity)
                .from(Column::AuthorId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::Author.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_rating(rating: i16) -> Result<(), errors::ModelError> {
    if !(1..=5).contains(&rating) {
        return Err(errors::ModelError::Validation("rating must be between 1 and 5".into()));
    }
    Ok(())
}

/// Insert a review row. Linking it into `listing.reviews` is the caller's job.
pub async fn create(db: &DatabaseConnection, author_id: Uuid, comment: &str, rating: i16) -> Result<Model, errors::ModelError> {
    validate_rating(rating)?;
    if comment.trim().is_empty() { return Err(errors::ModelError::Validation("comment required".into())); }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        comment: Set(comment.to_string()),
        rating: Set(rating),
        author_id: Set(author_id),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

/// Bulk delete by id set; an empty set never reaches the database.
pub async fn delete_many<C: ConnectionTrait>(db: &C, ids: &[Uuid]) -> Result<u64, errors::ModelError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let res = Entity::delete_many()
        .filter(Column::Id.is_in(ids.iter().copied()))
        .exec(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(6).is_err());
    }
}
