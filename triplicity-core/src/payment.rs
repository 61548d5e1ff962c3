use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{BoxError, CoreError, CoreResult};

/// Payment intent status as reported by the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded)
    }
}

/// Intent lifecycle events delivered by the provider's signed webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentEvent {
    Succeeded,
    PaymentFailed,
    Canceled,
}

impl IntentEvent {
    /// Maps a provider event type such as `payment_intent.succeeded`. Other types yield `None`.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "payment_intent.succeeded" => Some(Self::Succeeded),
            "payment_intent.payment_failed" => Some(Self::PaymentFailed),
            "payment_intent.canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::PaymentFailed => "payment_failed",
            Self::Canceled => "canceled",
        }
    }
}

/// Correlation data attached to every intent so provider-side records lead back to the booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMetadata {
    pub booking_id: i64,
    pub user_id: Uuid,
}

impl IntentMetadata {
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("booking_id".to_string(), self.booking_id.to_string()),
            ("user_id".to_string(), self.user_id.to_string()),
        ]
    }

    pub fn from_map(map: &HashMap<String, String>) -> Option<Self> {
        let booking_id = map.get("booking_id")?.parse().ok()?;
        let user_id = Uuid::parse_str(map.get("user_id")?).ok()?;
        Some(Self { booking_id, user_id })
    }
}

#[derive(Debug, Clone)]
pub struct CreateIntent {
    /// Amount in the currency's minor unit (paise, cents).
    pub amount_minor: i64,
    pub currency: String,
    pub description: String,
    pub metadata: IntentMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String, // Provider's ID (e.g., pi_123)
    pub amount_minor: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    /// Create a payment intent with the provider
    async fn create_intent(&self, request: &CreateIntent) -> Result<PaymentIntent, BoxError>;

    /// Retrieve the authoritative intent state
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, BoxError>;
}

/// Converts a two-decimal amount into minor units, rounding half away from zero.
pub fn to_minor_units(amount: Decimal) -> CoreResult<i64> {
    if amount.is_sign_negative() {
        return Err(CoreError::ValidationError(format!(
            "amount must not be negative, got {}",
            amount
        )));
    }
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| {
            minor
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
        })
        .ok_or(CoreError::AmountOutOfRange(amount))
}

/// In-process payment provider used in development mode and tests.
///
/// Intents live in memory. Status changes are driven through [`MockPaymentAdapter::set_status`],
/// or every retrieve succeeds when built with [`MockPaymentAdapter::auto_succeeding`].
#[derive(Default)]
pub struct MockPaymentAdapter {
    intents: RwLock<HashMap<String, PaymentIntent>>,
    sequence: AtomicU64,
    auto_succeed: bool,
    fail_create: AtomicBool,
    fail_retrieve: AtomicBool,
    create_calls: AtomicUsize,
    retrieve_calls: AtomicUsize,
}

impl MockPaymentAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_succeeding() -> Self {
        Self {
            auto_succeed: true,
            ..Self::default()
        }
    }

    pub async fn set_status(&self, intent_id: &str, status: PaymentStatus) -> bool {
        let mut intents = self.intents.write().await;
        match intents.get_mut(intent_id) {
            Some(intent) => {
                intent.status = status;
                true
            }
            None => false,
        }
    }

    pub async fn intent(&self, intent_id: &str) -> Option<PaymentIntent> {
        self.intents.read().await.get(intent_id).cloned()
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_retrieves(&self, fail: bool) {
        self.fail_retrieve.store(fail, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn retrieve_calls(&self) -> usize {
        self.retrieve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentAdapter for MockPaymentAdapter {
    async fn create_intent(&self, request: &CreateIntent) -> Result<PaymentIntent, BoxError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err("Simulated payment provider outage".into());
        }

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("pi_mock_{:06}", seq);
        let intent = PaymentIntent {
            client_secret: Some(format!("{}_secret_mock", id)),
            id: id.clone(),
            amount_minor: request.amount_minor,
            currency: request.currency.clone(),
            status: PaymentStatus::RequiresPaymentMethod,
            metadata: request.metadata.to_pairs().into_iter().collect(),
        };

        self.intents.write().await.insert(id, intent.clone());
        tracing::debug!("Mock intent {} created for booking {}", intent.id, request.metadata.booking_id);
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, BoxError> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_retrieve.load(Ordering::SeqCst) {
            return Err("Simulated payment provider outage".into());
        }

        let mut intent = self
            .intents
            .read()
            .await
            .get(intent_id)
            .cloned()
            .ok_or_else(|| format!("No such payment_intent: '{}'", intent_id))?;

        if self.auto_succeed {
            intent.status = PaymentStatus::Succeeded;
        }
        Ok(intent)
    }
}
