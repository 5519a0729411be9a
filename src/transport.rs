//! Backend transport abstraction
//!
//! The widget talks to its assistant backend through two calls: `/speak`
//! with the full history, and `/status` for the availability probe.

mod error;
mod http;
mod types;

pub use error::{TransportError, TransportErrorKind};
pub use http::HttpTransport;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Request/response exchanges with the assistant backend
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a user message with the conversation so far
    async fn speak(&self, request: &SpeakRequest) -> Result<SpeakResponse, TransportError>;

    /// Query backend status
    async fn status(&self) -> Result<StatusResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn speak(&self, request: &SpeakRequest) -> Result<SpeakResponse, TransportError> {
        (**self).speak(request).await
    }

    async fn status(&self) -> Result<StatusResponse, TransportError> {
        (**self).status().await
    }
}

/// Logging wrapper for transports
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T: Transport> LoggingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Transport> Transport for LoggingTransport<T> {
    async fn speak(&self, request: &SpeakRequest) -> Result<SpeakResponse, TransportError> {
        let start = Instant::now();
        let result = self.inner.speak(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    duration_ms = %duration.as_millis(),
                    history_len = request.history.len(),
                    reply_len = response.message.len(),
                    "Speak request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    duration_ms = %duration.as_millis(),
                    history_len = request.history.len(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Speak request failed"
                );
            }
        }

        result
    }

    async fn status(&self) -> Result<StatusResponse, TransportError> {
        let start = Instant::now();
        let result = self.inner.status().await;
        let duration = start.elapsed();

        match &result {
            Ok(status) => {
                tracing::debug!(
                    duration_ms = %duration.as_millis(),
                    status = %status.status,
                    "Status request completed"
                );
            }
            Err(e) => {
                tracing::debug!(
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Status request failed"
                );
            }
        }

        result
    }
}
