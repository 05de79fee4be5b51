use thiserror::Error;

use models::errors::ModelError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("asset store error: {0}")]
    AssetStore(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 2001,
            ServiceError::Validation(_) => 2002,
            ServiceError::AssetStore(_) => 2101,
            ServiceError::Storage(_) => 2201,
        }
    }
}

impl From<ModelError> for ServiceError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Validation(msg) => ServiceError::Validation(msg),
            ModelError::Db(msg) => ServiceError::Storage(msg),
        }
    }
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self { ServiceError::Storage(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_errors_map_onto_service_taxonomy() {
        let v: ServiceError = ModelError::Validation("title required".into()).into();
        assert!(matches!(v, ServiceError::Validation(ref m) if m == "title required"));
        let s: ServiceError = ModelError::Db("connection reset".into()).into();
        assert_eq!(s.code(), 2201);
        assert_eq!(ServiceError::not_found("listing").to_string(), "not found: listing not found");
    }
}
