use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use triplicity_accounts::UserRepository;
use triplicity_catalog::CatalogRepository;
use triplicity_core::notify::NotificationDispatcher;
use triplicity_core::payment::{to_minor_units, CreateIntent, IntentEvent, IntentMetadata, PaymentAdapter};
use uuid::Uuid;

use crate::confirmation::confirmation_email;
use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, BookingStatus, NewBooking};
use crate::repository::BookingRepository;

/// Largest total a booking row holds, in hundredths.
const MAX_TOTAL_CENTS: i64 = 999_999_999_999;

#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Lowercase ISO code passed to the payment provider
    pub currency: String,
    pub brand_name: String,
    pub max_intent_attempts: i32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            currency: "inr".to_string(),
            brand_name: "Triplicity".to_string(),
            max_intent_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InitiatedBooking {
    pub booking: Booking,
    pub client_secret: String,
}

/// Orchestrates catalog lookup, the booking ledger, the payment provider and
/// confirmation mail for one booking at a time.
pub struct BookingFlow {
    catalog: Arc<dyn CatalogRepository>,
    bookings: Arc<dyn BookingRepository>,
    users: Arc<dyn UserRepository>,
    payments: Arc<dyn PaymentAdapter>,
    notifications: NotificationDispatcher,
    config: BookingConfig,
}

impl BookingFlow {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserRepository>,
        payments: Arc<dyn PaymentAdapter>,
        notifications: NotificationDispatcher,
        config: BookingConfig,
    ) -> Self {
        Self {
            catalog,
            bookings,
            users,
            payments,
            notifications,
            config,
        }
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    /// Creates a pending booking and a payment intent for it.
    ///
    /// If the provider call fails the booking is kept, marked `creation_failed`, and
    /// picked up later by [`BookingFlow::reconcile_orphans`].
    pub async fn initiate(
        &self,
        user_id: Uuid,
        package_slug: &str,
        person_count: i64,
    ) -> BookingResult<InitiatedBooking> {
        // 1. Validate input
        if person_count < 1 {
            return Err(BookingError::Validation(
                "person_count must be a positive integer".to_string(),
            ));
        }
        let persons = i32::try_from(person_count)
            .map_err(|_| BookingError::Validation("person_count is too large".to_string()))?;

        let package = self
            .catalog
            .get_package_by_slug(package_slug)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("package '{}'", package_slug)))?;

        // 2. Price is fixed here for the lifetime of the booking
        let total_amount = booking_total(package.price, persons)?;
        let amount_minor =
            to_minor_units(total_amount).map_err(|e| BookingError::Validation(e.to_string()))?;

        // 3. Persist pending booking
        let mut booking = self
            .bookings
            .insert(NewBooking {
                user_id,
                package_id: package.id,
                person_count: persons,
                total_amount,
                currency: self.config.currency.clone(),
            })
            .await?;
        info!(
            "Booking {} created for package {} ({} persons, total {})",
            booking.id, package.slug, persons, total_amount
        );

        // 4. Payment intent
        let request = self.intent_request(&booking, &package.title, amount_minor);
        match self.payments.create_intent(&request).await {
            Ok(intent) => {
                booking.attach_intent(intent.id.clone());
                self.bookings.update(&booking).await?;
                let client_secret = intent.client_secret.ok_or_else(|| {
                    BookingError::ExternalService(format!(
                        "payment intent {} has no client secret",
                        intent.id
                    ))
                })?;
                Ok(InitiatedBooking {
                    booking,
                    client_secret,
                })
            }
            Err(e) => {
                warn!("Payment intent creation failed for booking {}: {}", booking.id, e);
                booking.record_intent_failure();
                self.bookings.update(&booking).await?;
                Err(BookingError::ExternalService(e.to_string()))
            }
        }
    }

    /// Settles a booking from a client-reported completion.
    ///
    /// The reported pair only selects the booking. Its status always comes from the
    /// provider: succeeded means paid, anything else (including a provider error)
    /// means failed. Bookings that already left `pending` are returned unchanged.
    pub async fn complete(&self, booking_id: i64, intent_id: &str) -> BookingResult<Booking> {
        let mut booking = self
            .bookings
            .get_by_intent(booking_id, intent_id)
            .await?
            .ok_or_else(|| {
                BookingError::NotFound(format!("booking {} with intent {}", booking_id, intent_id))
            })?;

        let outcome = match self.payments.retrieve_intent(intent_id).await {
            Ok(intent) if intent.status.is_succeeded() => BookingStatus::Paid,
            Ok(intent) => {
                info!("Intent {} for booking {} is {:?}", intent_id, booking_id, intent.status);
                BookingStatus::Failed
            }
            Err(e) => {
                warn!("Could not retrieve intent {} for booking {}: {}", intent_id, booking_id, e);
                BookingStatus::Failed
            }
        };

        if booking.status.is_terminal() {
            if booking.status != outcome {
                warn!(
                    "Booking {} is already {} but provider reports {}",
                    booking.id, booking.status, outcome
                );
            }
            return Ok(booking);
        }

        booking.transition(outcome)?;
        self.bookings.update(&booking).await?;
        info!("Booking {} marked {}", booking.id, booking.status);

        if booking.status == BookingStatus::Paid {
            self.send_confirmation(&booking).await;
        }
        Ok(booking)
    }

    /// Returns the client secret of a pending booking so the payment UI can resume.
    pub async fn resume_payment(&self, user_id: Uuid, booking_id: i64) -> BookingResult<String> {
        let booking = self.get_for_user(user_id, booking_id).await?;
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::Validation(format!(
                "booking {} is {}, not awaiting payment",
                booking.id, booking.status
            )));
        }
        let intent_id = booking.payment_intent_id.as_deref().ok_or_else(|| {
            BookingError::Validation(format!("payment for booking {} is not set up yet", booking.id))
        })?;

        let intent = self
            .payments
            .retrieve_intent(intent_id)
            .await
            .map_err(|e| BookingError::ExternalService(e.to_string()))?;
        intent.client_secret.ok_or_else(|| {
            BookingError::ExternalService(format!("payment intent {} has no client secret", intent_id))
        })
    }

    /// Retries intent creation for orphaned bookings. Returns how many got an intent.
    pub async fn reconcile_orphans(&self, limit: i64) -> BookingResult<usize> {
        let orphans = self
            .bookings
            .list_orphaned(self.config.max_intent_attempts, limit)
            .await?;
        let mut reconciled = 0;

        for mut booking in orphans {
            let title = match self.catalog.get_package(booking.package_id).await {
                Ok(Some(package)) => package.title,
                Ok(None) => {
                    warn!("Booking {} references missing package {}", booking.id, booking.package_id);
                    booking.record_intent_failure();
                    self.bookings.update(&booking).await?;
                    continue;
                }
                Err(e) => {
                    warn!("Error loading package for booking {}: {}", booking.id, e);
                    booking.record_intent_failure();
                    self.bookings.update(&booking).await?;
                    continue;
                }
            };
            let amount_minor = match to_minor_units(booking.total_amount) {
                Ok(amount) => amount,
                Err(e) => {
                    warn!("Booking {} has an unpayable total: {}", booking.id, e);
                    booking.record_intent_failure();
                    self.bookings.update(&booking).await?;
                    continue;
                }
            };
            let request = self.intent_request(&booking, &title, amount_minor);

            match self.payments.create_intent(&request).await {
                Ok(intent) => {
                    booking.attach_intent(intent.id);
                    self.bookings.update(&booking).await?;
                    reconciled += 1;
                    info!(
                        "Booking {} reconciled after {} attempts",
                        booking.id, booking.intent_attempts
                    );
                }
                Err(e) => {
                    booking.record_intent_failure();
                    self.bookings.update(&booking).await?;
                    warn!(
                        "Retry {} of intent creation for booking {} failed: {}",
                        booking.intent_attempts, booking.id, e
                    );
                }
            }
        }

        Ok(reconciled)
    }

    /// Applies a signature-verified provider event. Unknown intents are ignored.
    pub async fn apply_provider_event(
        &self,
        intent_id: &str,
        event: IntentEvent,
    ) -> BookingResult<Option<Booking>> {
        let Some(mut booking) = self.bookings.find_by_intent_id(intent_id).await? else {
            info!("Ignoring {} event for unknown intent {}", event.as_str(), intent_id);
            return Ok(None);
        };

        let mut confirm = false;
        match event {
            IntentEvent::Succeeded => {
                if booking.status == BookingStatus::Pending {
                    booking.transition(BookingStatus::Paid)?;
                    confirm = true;
                }
                if booking.status == BookingStatus::Paid {
                    booking.mark_payment_verified(chrono::Utc::now());
                } else {
                    warn!(
                        "Provider reports intent {} succeeded but booking {} is {}",
                        intent_id, booking.id, booking.status
                    );
                }
            }
            IntentEvent::PaymentFailed | IntentEvent::Canceled => {
                if booking.status == BookingStatus::Pending {
                    booking.transition(BookingStatus::Failed)?;
                }
            }
        }

        self.bookings.update(&booking).await?;
        info!(
            "Provider event {} applied to booking {} ({})",
            event.as_str(),
            booking.id,
            booking.status
        );

        if confirm {
            self.send_confirmation(&booking).await;
        }
        Ok(Some(booking))
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> BookingResult<Vec<Booking>> {
        Ok(self.bookings.list_for_user(user_id).await?)
    }

    /// A booking owned by someone else is reported as not found.
    pub async fn get_for_user(&self, user_id: Uuid, booking_id: i64) -> BookingResult<Booking> {
        self.bookings
            .get(booking_id)
            .await?
            .filter(|b| b.user_id == user_id)
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", booking_id)))
    }

    fn intent_request(&self, booking: &Booking, package_title: &str, amount_minor: i64) -> CreateIntent {
        CreateIntent {
            amount_minor,
            currency: booking.currency.clone(),
            description: format!(
                "Booking {}: {} for {}x person",
                self.config.brand_name, package_title, booking.person_count
            ),
            metadata: IntentMetadata {
                booking_id: booking.id,
                user_id: booking.user_id,
            },
        }
    }

    /// Queues the confirmation mail. Lookup failures are logged and never fail the booking.
    async fn send_confirmation(&self, booking: &Booking) {
        let user = match self.users.get_user(booking.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!("No user {} for booking {} confirmation", booking.user_id, booking.id);
                return;
            }
            Err(e) => {
                warn!("Error loading user for booking {} confirmation: {}", booking.id, e);
                return;
            }
        };
        let title = match self.catalog.get_package(booking.package_id).await {
            Ok(Some(package)) => package.title,
            Ok(None) => format!("Package #{}", booking.package_id),
            Err(e) => {
                warn!("Error loading package for booking {} confirmation: {}", booking.id, e);
                format!("Package #{}", booking.package_id)
            }
        };

        let email = confirmation_email(&self.config.brand_name, &user, booking, &title);
        self.notifications.dispatch(email);
    }
}

/// `price * persons`, rejected when it overflows or exceeds what a booking can store.
fn booking_total(price: Decimal, persons: i32) -> BookingResult<Decimal> {
    price
        .checked_mul(Decimal::from(persons))
        .filter(|total| *total <= Decimal::new(MAX_TOTAL_CENTS, 2))
        .ok_or_else(|| {
            BookingError::Validation(format!(
                "total for {} persons exceeds the bookable maximum",
                persons
            ))
        })
}
