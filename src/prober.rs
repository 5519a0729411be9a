//! Backend availability probe

use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(2000);

/// `/status` value meaning the backend accepts messages
pub const STATUS_AVAILABLE: &str = "available";

/// One-shot check of the backend's `/status` endpoint
pub struct AvailabilityProber<T: Transport> {
    transport: Arc<T>,
    timeout: Duration,
}

impl<T: Transport> AvailabilityProber<T> {
    pub fn new(transport: Arc<T>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// True only when the backend reports `available` within the timeout.
    /// Every failure collapses to false.
    pub async fn probe(&self) -> bool {
        match tokio::time::timeout(self.timeout, self.transport.status()).await {
            Ok(Ok(status)) if status.status == STATUS_AVAILABLE => true,
            Ok(Ok(status)) => {
                tracing::warn!(status = %status.status, "Backend reported unexpected status");
                false
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e.message, kind = ?e.kind, "Availability probe failed");
                false
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = %self.timeout.as_millis(),
                    "Availability probe timed out"
                );
                false
            }
        }
    }
}
