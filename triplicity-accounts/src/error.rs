use triplicity_core::{BoxError, DuplicateKey};

/// Account-related errors
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("A user with this email already exists.")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<BoxError> for AccountError {
    fn from(err: BoxError) -> Self {
        // The only unique key on users is the email
        if err.is::<DuplicateKey>() {
            return Self::EmailTaken;
        }
        Self::Storage(err.to_string())
    }
}

pub type AccountResult<T> = Result<T, AccountError>;
