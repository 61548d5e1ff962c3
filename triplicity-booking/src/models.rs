use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::BookingError;

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown booking status '{}'", other)),
        }
    }
}

/// Where the booking stands with respect to its payment intent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntentState {
    Awaiting,
    Created,
    CreationFailed,
}

impl IntentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Awaiting => "awaiting",
            Self::Created => "created",
            Self::CreationFailed => "creation_failed",
        }
    }
}

impl FromStr for IntentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting" => Ok(Self::Awaiting),
            "created" => Ok(Self::Created),
            "creation_failed" => Ok(Self::CreationFailed),
            other => Err(format!("unknown intent state '{}'", other)),
        }
    }
}

/// A user's booking of one package.
///
/// `total_amount` is computed once from the package price at creation and never
/// recomputed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub user_id: Uuid,
    pub package_id: i64,
    pub person_count: i32,
    pub total_amount: Decimal,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_intent_id: Option<String>,
    pub intent_state: IntentState,
    pub intent_attempts: i32,
    pub payment_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Transition: Pending → Paid | Failed
    pub fn transition(&mut self, to: BookingStatus) -> Result<(), BookingError> {
        let allowed = self.status == BookingStatus::Pending
            && matches!(to, BookingStatus::Paid | BookingStatus::Failed);
        if !allowed {
            return Err(BookingError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn attach_intent(&mut self, intent_id: String) {
        self.payment_intent_id = Some(intent_id);
        self.intent_state = IntentState::Created;
        self.intent_attempts += 1;
        self.updated_at = Utc::now();
    }

    pub fn record_intent_failure(&mut self) {
        self.intent_state = IntentState::CreationFailed;
        self.intent_attempts += 1;
        self.updated_at = Utc::now();
    }

    pub fn mark_payment_verified(&mut self, at: DateTime<Utc>) {
        self.payment_verified_at = Some(at);
        self.updated_at = at;
    }

    /// Only a booking confirmed by a signed provider event counts as verified.
    pub fn payment_verified(&self) -> bool {
        self.payment_verified_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: Uuid,
    pub package_id: i64,
    pub person_count: i32,
    pub total_amount: Decimal,
    pub currency: String,
}

impl NewBooking {
    pub fn into_booking(self, id: i64) -> Booking {
        let now = Utc::now();
        Booking {
            id,
            user_id: self.user_id,
            package_id: self.package_id,
            person_count: self.person_count,
            total_amount: self.total_amount,
            currency: self.currency,
            status: BookingStatus::Pending,
            payment_intent_id: None,
            intent_state: IntentState::Awaiting,
            intent_attempts: 0,
            payment_verified_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
