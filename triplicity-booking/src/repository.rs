use async_trait::async_trait;
use triplicity_core::BoxError;
use uuid::Uuid;

use crate::models::{Booking, NewBooking};

/// Repository trait for the booking ledger
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(&self, booking: NewBooking) -> Result<Booking, BoxError>;

    async fn get(&self, id: i64) -> Result<Option<Booking>, BoxError>;

    /// Booking matching both its id and the intent attached to it
    async fn get_by_intent(&self, id: i64, intent_id: &str) -> Result<Option<Booking>, BoxError>;

    async fn find_by_intent_id(&self, intent_id: &str) -> Result<Option<Booking>, BoxError>;

    async fn update(&self, booking: &Booking) -> Result<(), BoxError>;

    /// Newest first
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, BoxError>;

    /// Pending bookings whose intent creation failed fewer than `max_attempts` times, oldest first
    async fn list_orphaned(&self, max_attempts: i32, limit: i64) -> Result<Vec<Booking>, BoxError>;
}
