use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use triplicity_booking::BookingFlow;

use crate::metrics::Metrics;

/// Periodically retries payment-intent creation for orphaned bookings.
pub async fn start_reconciliation_worker(
    bookings: Arc<BookingFlow>,
    metrics: Arc<Metrics>,
    interval: Duration,
    batch_size: i64,
) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
    // The first tick completes immediately
    ticker.tick().await;

    info!("Reconciliation worker started, every {:?}", interval);

    loop {
        ticker.tick().await;
        match bookings.reconcile_orphans(batch_size).await {
            Ok(0) => {}
            Ok(count) => {
                metrics.bookings_reconciled.inc_by(count as u64);
                info!("Reconciled {} orphaned bookings", count);
            }
            Err(e) => error!("Reconciliation pass failed: {}", e),
        }
    }
}
