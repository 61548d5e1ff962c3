use axum::{
    extract::{Path, State},
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use triplicity_booking::Booking;

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::auth::{customer_auth_middleware, Claims};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    /// Only a provider-verified payment entitles the traveller to the booking
    pub payment_verified: bool,
}

impl From<Booking> for BookingView {
    fn from(booking: Booking) -> Self {
        let payment_verified = booking.payment_verified();
        Self {
            booking,
            payment_verified,
        }
    }
}

/// Sent by the browser after the payment form returns. Treated as a hint only.
#[derive(Debug, Deserialize)]
pub struct CompleteBookingRequest {
    pub booking_id: i64,
    pub payment_intent_id: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentResume {
    pub booking_id: i64,
    pub client_secret: String,
    pub publishable_key: Option<String>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    // The (booking, intent) pair is the capability here
    let public = Router::new().route("/v1/bookings/complete", post(complete_booking));

    let protected = Router::new()
        .route("/v1/bookings", get(list_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/payment", post(resume_payment))
        .route_layer(from_fn_with_state(state, customer_auth_middleware));

    public.merge(protected)
}

/// POST /v1/bookings/complete
async fn complete_booking(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CompleteBookingRequest>,
) -> Result<Json<BookingView>, AppError> {
    let booking = state
        .bookings
        .complete(req.booking_id, &req.payment_intent_id)
        .await?;

    state
        .metrics
        .completions
        .with_label_values(&[booking.status.as_str()])
        .inc();
    Ok(Json(booking.into()))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let bookings = state.bookings.list_for_user(claims.user_id()?).await?;
    Ok(Json(bookings.into_iter().map(BookingView::from).collect()))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<i64>,
) -> Result<Json<BookingView>, AppError> {
    let booking = state.bookings.get_for_user(claims.user_id()?, booking_id).await?;
    Ok(Json(booking.into()))
}

/// POST /v1/bookings/{id}/payment
/// Hands the client secret back so an abandoned payment form can be reopened
async fn resume_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<i64>,
) -> Result<Json<PaymentResume>, AppError> {
    let client_secret = state
        .bookings
        .resume_payment(claims.user_id()?, booking_id)
        .await?;

    Ok(Json(PaymentResume {
        booking_id,
        client_secret,
        publishable_key: state.payment.publishable_key.clone(),
    }))
}
