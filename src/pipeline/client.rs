// src/pipeline/client.rs
use std::time::Duration;

use reqwest::Client;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, error};

use crate::pipeline::retry::{with_retry, IsRetryable, RetryConfig};
use crate::pipeline::sender::{RecordSink, SinkResponse};
use crate::record::CanonicalHealthRecord;

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when submitting to the server
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("request timed out")]
    Timeout,
    #[error("HTTP {status} from {endpoint}: {body}")]
    Http {
        status: u16,
        endpoint: String,
        body: String,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("serialization error: {0}")]
    Serialize(String),
    #[error("client configuration error: {0}")]
    Config(String),
}

impl IsRetryable for SubmitError {
    fn is_retryable(&self) -> bool {
        match self {
            SubmitError::Timeout => true,
            SubmitError::Http { status, .. } => matches!(status, 502..=504),
            SubmitError::Network(_) => true,
            SubmitError::Serialize(_) | SubmitError::Config(_) => false,
        }
    }
}

/// HTTP client for the health-data endpoint
pub struct ServerClient {
    client: Client,
    endpoint: String,
    api_key: String,
    retry: RetryConfig,
}

impl ServerClient {
    /// Create a client for `{server_url}/health-data`.
    /// Returns an error if the HTTP client fails to build or no key is given.
    pub fn new(server_url: &str, api_key: impl Into<String>) -> Result<Self, SubmitError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SubmitError::Config("missing API key".to_string()));
        }
        if server_url.trim().is_empty() {
            return Err(SubmitError::Config("missing server URL".to_string()));
        }
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| SubmitError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!("{}/health-data", server_url.trim_end_matches('/')),
            api_key,
            retry: RetryConfig::exponential(3, 500, 4_000),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_once(&self, body: &[u8], record_count: usize) -> Result<SinkResponse, SubmitError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubmitError::Timeout
                } else {
                    SubmitError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "(failed to read body)".to_string());
        if !(200..300).contains(&status) {
            error!(
                endpoint = %self.endpoint,
                status,
                response_body = %text,
                "server returned error status"
            );
            return Err(SubmitError::Http {
                status,
                endpoint: self.endpoint.clone(),
                body: text,
            });
        }

        let body = serde_json::from_str(&text).unwrap_or(JsonValue::String(text));
        Ok(SinkResponse {
            status,
            submitted: record_count,
            body,
        })
    }
}

#[async_trait::async_trait]
impl RecordSink for ServerClient {
    #[tracing::instrument(
        name = "health_data_submit",
        skip(self, batch),
        fields(endpoint = %self.endpoint, record_count = batch.len())
    )]
    async fn submit(&self, batch: &[CanonicalHealthRecord]) -> Result<SinkResponse, SubmitError> {
        let body = serde_json::to_vec(batch).map_err(|e| SubmitError::Serialize(e.to_string()))?;
        debug!(bytes = body.len(), "submitting batch");
        let response = with_retry(&self.retry, || self.post_once(&body, batch.len())).await?;
        debug!(status = response.status, "batch accepted");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> SubmitError {
        SubmitError::Http {
            status,
            endpoint: "x".into(),
            body: String::new(),
        }
    }

    #[test]
    fn submit_error_retryable_classification() {
        assert!(SubmitError::Timeout.is_retryable());
        assert!(SubmitError::Network("conn reset".into()).is_retryable());
        assert!(http(502).is_retryable());
        assert!(http(503).is_retryable());
        assert!(http(504).is_retryable());
        assert!(!SubmitError::Serialize("bad json".into()).is_retryable());
        assert!(!http(400).is_retryable());
        assert!(!http(401).is_retryable());
        assert!(!http(500).is_retryable());
    }

    #[test]
    fn endpoint_is_derived_from_server_url() {
        let client = ServerClient::new("https://fitness.example.com/api/", "key").unwrap();
        assert_eq!(client.endpoint(), "https://fitness.example.com/api/health-data");
    }

    #[test]
    fn missing_key_is_a_config_error() {
        assert!(matches!(
            ServerClient::new("https://fitness.example.com", " "),
            Err(SubmitError::Config(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let client = ServerClient::new("http://127.0.0.1:9", "key")
            .unwrap()
            .with_retry_config(RetryConfig::fixed(1, Duration::from_millis(1)));
        let err = client.submit(&[]).await.unwrap_err();
        assert!(matches!(err, SubmitError::Network(_) | SubmitError::Timeout));
    }
}
