//! HTTP transport against the assistant backend

use super::{SpeakRequest, SpeakResponse, StatusResponse, Transport, TransportError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// reqwest-backed transport for `{endpoint}/speak` and `{endpoint}/status`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    speak_url: String,
    status_url: String,
}

impl HttpTransport {
    pub fn new(endpoint_url: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::unknown(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, endpoint_url))
    }

    pub fn with_client(client: Client, endpoint_url: &str) -> Self {
        let base = endpoint_url.trim_end_matches('/');
        Self {
            client,
            speak_url: format!("{base}/speak"),
            status_url: format!("{base}/status"),
        }
    }

    pub fn speak_url(&self) -> &str {
        &self.speak_url
    }

    pub fn status_url(&self) -> &str {
        &self.status_url
    }

    fn map_send_error(e: &reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::timeout(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            TransportError::network(format!("Connection failed: {e}"))
        } else {
            TransportError::unknown(format!("Request failed: {e}"))
        }
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(TransportError::from_status(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            TransportError::decode(format!("Failed to parse response: {e} - body: {body}"))
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn speak(&self, request: &SpeakRequest) -> Result<SpeakResponse, TransportError> {
        let response = self
            .client
            .post(&self.speak_url)
            .json(request)
            .send()
            .await
            .map_err(|e| Self::map_send_error(&e))?;

        Self::read_json(response).await
    }

    async fn status(&self) -> Result<StatusResponse, TransportError> {
        let response = self
            .client
            .get(&self.status_url)
            .send()
            .await
            .map_err(|e| Self::map_send_error(&e))?;

        Self::read_json(response).await
    }
}
