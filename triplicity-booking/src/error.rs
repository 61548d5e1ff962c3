use triplicity_core::BoxError;

/// Booking-related errors
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payment provider error: {0}")]
    ExternalService(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<BoxError> for BookingError {
    fn from(err: BoxError) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
