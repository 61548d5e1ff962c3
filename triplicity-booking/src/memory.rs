use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use triplicity_core::BoxError;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, IntentState, NewBooking};
use crate::repository::BookingRepository;

#[derive(Default)]
struct Ledger {
    bookings: BTreeMap<i64, Booking>,
    next_id: i64,
}

/// In-memory booking ledger with sequential ids.
#[derive(Default, Clone)]
pub struct InMemoryBookingRepository {
    ledger: Arc<RwLock<Ledger>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts id allocation after `last_id`.
    pub fn starting_after(last_id: i64) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(Ledger {
                bookings: BTreeMap::new(),
                next_id: last_id,
            })),
        }
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: NewBooking) -> Result<Booking, BoxError> {
        let mut ledger = self.ledger.write().await;
        ledger.next_id += 1;
        let booking = booking.into_booking(ledger.next_id);
        ledger.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get(&self, id: i64) -> Result<Option<Booking>, BoxError> {
        Ok(self.ledger.read().await.bookings.get(&id).cloned())
    }

    async fn get_by_intent(&self, id: i64, intent_id: &str) -> Result<Option<Booking>, BoxError> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .bookings
            .get(&id)
            .filter(|b| b.payment_intent_id.as_deref() == Some(intent_id))
            .cloned())
    }

    async fn find_by_intent_id(&self, intent_id: &str) -> Result<Option<Booking>, BoxError> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .bookings
            .values()
            .find(|b| b.payment_intent_id.as_deref() == Some(intent_id))
            .cloned())
    }

    async fn update(&self, booking: &Booking) -> Result<(), BoxError> {
        let mut ledger = self.ledger.write().await;
        match ledger.bookings.get_mut(&booking.id) {
            Some(existing) => {
                *existing = booking.clone();
                Ok(())
            }
            None => Err(format!("booking {} does not exist", booking.id).into()),
        }
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, BoxError> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .bookings
            .values()
            .rev()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_orphaned(&self, max_attempts: i32, limit: i64) -> Result<Vec<Booking>, BoxError> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .bookings
            .values()
            .filter(|b| {
                b.status == BookingStatus::Pending
                    && b.intent_state == IntentState::CreationFailed
                    && b.intent_attempts < max_attempts
            })
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_booking(user_id: Uuid) -> NewBooking {
        NewBooking {
            user_id,
            package_id: 1,
            person_count: 1,
            total_amount: dec!(1000),
            currency: "inr".to_string(),
        }
    }

    #[tokio::test]
    async fn test_lookup_by_id_and_intent_pair() {
        let repo = InMemoryBookingRepository::starting_after(41);
        let mut booking = repo.insert(new_booking(Uuid::new_v4())).await.unwrap();
        assert_eq!(booking.id, 42);

        booking.attach_intent("pi_a".to_string());
        repo.update(&booking).await.unwrap();

        assert!(repo.get_by_intent(42, "pi_a").await.unwrap().is_some());
        assert!(repo.get_by_intent(42, "pi_b").await.unwrap().is_none());
        assert!(repo.get_by_intent(43, "pi_a").await.unwrap().is_none());
        assert_eq!(repo.find_by_intent_id("pi_a").await.unwrap().map(|b| b.id), Some(42));
    }

    #[tokio::test]
    async fn test_list_for_user_newest_first() {
        let repo = InMemoryBookingRepository::new();
        let user = Uuid::new_v4();
        repo.insert(new_booking(user)).await.unwrap();
        repo.insert(new_booking(Uuid::new_v4())).await.unwrap();
        repo.insert(new_booking(user)).await.unwrap();

        let ids: Vec<i64> = repo.list_for_user(user).await.unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_list_orphaned_respects_attempt_limit() {
        let repo = InMemoryBookingRepository::new();
        let mut fresh = repo.insert(new_booking(Uuid::new_v4())).await.unwrap();
        fresh.record_intent_failure();
        repo.update(&fresh).await.unwrap();

        let mut exhausted = repo.insert(new_booking(Uuid::new_v4())).await.unwrap();
        for _ in 0..3 {
            exhausted.record_intent_failure();
        }
        repo.update(&exhausted).await.unwrap();

        repo.insert(new_booking(Uuid::new_v4())).await.unwrap();

        let orphans = repo.list_orphaned(3, 10).await.unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id, fresh.id);
        assert!(repo.list_orphaned(3, 0).await.unwrap().is_empty());
    }
}
