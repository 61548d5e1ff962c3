use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use triplicity_booking::{Booking, BookingRepository, NewBooking};
use triplicity_core::BoxError;
use uuid::Uuid;

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = "id, user_id, package_id, person_count, total_amount, currency, \
     status, payment_intent_id, intent_state, intent_attempts, payment_verified_at, created_at, \
     updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    user_id: Uuid,
    package_id: i64,
    person_count: i32,
    total_amount: Decimal,
    currency: String,
    status: String,
    payment_intent_id: Option<String>,
    intent_state: String,
    intent_attempts: i32,
    payment_verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = BoxError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            package_id: row.package_id,
            person_count: row.person_count,
            total_amount: row.total_amount,
            currency: row.currency,
            status: row.status.parse()?,
            payment_intent_id: row.payment_intent_id,
            intent_state: row.intent_state.parse()?,
            intent_attempts: row.intent_attempts,
            payment_verified_at: row.payment_verified_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn map_rows(rows: Vec<BookingRow>) -> Result<Vec<Booking>, BoxError> {
    rows.into_iter().map(Booking::try_from).collect()
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn insert(&self, booking: NewBooking) -> Result<Booking, BoxError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (user_id, package_id, person_count, total_amount, currency)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(booking.user_id)
        .bind(booking.package_id)
        .bind(booking.person_count)
        .bind(booking.total_amount)
        .bind(&booking.currency)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get(&self, id: i64) -> Result<Option<Booking>, BoxError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn get_by_intent(&self, id: i64, intent_id: &str) -> Result<Option<Booking>, BoxError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1 AND payment_intent_id = $2",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .bind(intent_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn find_by_intent_id(&self, intent_id: &str) -> Result<Option<Booking>, BoxError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE payment_intent_id = $1",
            BOOKING_COLUMNS
        ))
        .bind(intent_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn update(&self, booking: &Booking) -> Result<(), BoxError> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $2, payment_intent_id = $3, intent_state = $4, intent_attempts = $5,
                payment_verified_at = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(booking.status.as_str())
        .bind(&booking.payment_intent_id)
        .bind(booking.intent_state.as_str())
        .bind(booking.intent_attempts)
        .bind(booking.payment_verified_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(format!("booking {} does not exist", booking.id).into());
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, BoxError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        map_rows(rows)
    }

    async fn list_orphaned(&self, max_attempts: i32, limit: i64) -> Result<Vec<Booking>, BoxError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {}
            FROM bookings
            WHERE status = 'pending' AND intent_state = 'creation_failed' AND intent_attempts < $1
            ORDER BY id
            LIMIT $2
            "#,
            BOOKING_COLUMNS
        ))
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        map_rows(rows)
    }
}
