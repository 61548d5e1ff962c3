use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use triplicity_core::notify::DispatchStats;

use crate::error::AppError;
use crate::state::AppState;

/// Counters exported at `/metrics`.
pub struct Metrics {
    registry: Registry,
    pub bookings_initiated: IntCounter,
    pub intent_creation_failures: IntCounter,
    /// label: outcome (paid, failed, cancelled, pending)
    pub completions: IntCounterVec,
    /// label: event type as sent by the provider
    pub webhook_events: IntCounterVec,
    pub bookings_reconciled: IntCounter,
    notifications: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let bookings_initiated = IntCounter::new(
            "triplicity_bookings_initiated_total",
            "Bookings created through the booking endpoint",
        )?;
        let intent_creation_failures = IntCounter::new(
            "triplicity_intent_creation_failures_total",
            "Payment intent creations that failed at initiation",
        )?;
        let completions = IntCounterVec::new(
            Opts::new("triplicity_booking_completions_total", "Booking completions by outcome"),
            &["outcome"],
        )?;
        let webhook_events = IntCounterVec::new(
            Opts::new("triplicity_webhook_events_total", "Verified payment webhook events by type"),
            &["type"],
        )?;
        let bookings_reconciled = IntCounter::new(
            "triplicity_bookings_reconciled_total",
            "Orphaned bookings that received a payment intent on retry",
        )?;
        let notifications = IntGaugeVec::new(
            Opts::new("triplicity_notifications", "Notification queue counters since start"),
            &["state"],
        )?;

        registry.register(Box::new(bookings_initiated.clone()))?;
        registry.register(Box::new(intent_creation_failures.clone()))?;
        registry.register(Box::new(completions.clone()))?;
        registry.register(Box::new(webhook_events.clone()))?;
        registry.register(Box::new(bookings_reconciled.clone()))?;
        registry.register(Box::new(notifications.clone()))?;

        Ok(Self {
            registry,
            bookings_initiated,
            intent_creation_failures,
            completions,
            webhook_events,
            bookings_reconciled,
            notifications,
        })
    }

    /// Text exposition format, with the dispatcher counters sampled at call time.
    pub fn render(&self, stats: DispatchStats) -> Result<String, prometheus::Error> {
        for (state, value) in [
            ("accepted", stats.accepted),
            ("dropped", stats.dropped),
            ("delivered", stats.delivered),
            ("failed", stats.failed),
        ] {
            self.notifications
                .with_label_values(&[state])
                .set(i64::try_from(value).unwrap_or(i64::MAX));
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state
        .metrics
        .render(state.notifications.stats())
        .map_err(|e| AppError::InternalServerError(format!("Metrics encoding failed: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
