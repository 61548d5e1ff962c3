pub mod notify;
pub mod payment;

use rust_decimal::Decimal;

/// Error type returned by collaborator traits (repositories, payment bridge, notifier).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A repository write hit an existing unique key.
#[derive(Debug, thiserror::Error)]
#[error("Duplicate {0}")]
pub struct DuplicateKey(pub String);

impl DuplicateKey {
    pub fn boxed(what: impl Into<String>) -> BoxError {
        Box::new(Self(what.into()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Amount {0} cannot be expressed in minor currency units")]
    AmountOutOfRange(Decimal),
}

pub type CoreResult<T> = Result<T, CoreError>;
