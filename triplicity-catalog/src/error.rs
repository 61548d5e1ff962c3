use triplicity_core::{BoxError, DuplicateKey};

/// Catalog-related errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<BoxError> for CatalogError {
    fn from(err: BoxError) -> Self {
        match err.downcast::<DuplicateKey>() {
            Ok(duplicate) => Self::Conflict(duplicate.0),
            Err(err) => Self::Storage(err.to_string()),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
