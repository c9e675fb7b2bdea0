//! Async utilities
//!
//! The auth store has no network boundary; it imitates one with a fixed delay.

use tokio::time::{sleep, Duration};
use tracing::trace;

/// Suspend for the configured round-trip time of the pretend server.
///
/// A zero duration returns immediately without touching the timer.
pub async fn simulate_latency(delay: Duration, operation_name: &str) {
    if delay.is_zero() {
        return;
    }

    trace!(
        operation = operation_name,
        delay_ms = delay.as_millis() as u64,
        "Simulating request latency"
    );
    sleep(delay).await;
}
