//! HTTP client for the remote registration endpoint

use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::secret::Credentials;
use super::types::{AttemptError, AttemptOutcome, DispatchRequest};
use crate::config::DispatchConfig;

const API_KEY_HEADER: &str = "Api-Key";
const API_SECRET_HEADER: &str = "Api-Secret";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Sends one registration request and reports how it went.
///
/// Implementations make exactly one call per `send`; retrying is left to the
/// caller.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, request: &DispatchRequest, credentials: &Credentials) -> AttemptOutcome;
}

/// Dispatcher backed by reqwest
pub struct HttpDispatcher {
    client: Client,
    endpoint: Url,
    request_timeout: Duration,
}

impl HttpDispatcher {
    pub fn new(config: &DispatchConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint_url)
            .map_err(|e| DispatchError::InvalidUrl(format!("{}: {}", config.endpoint_url, e)))?;

        let request_timeout = Duration::from_millis(config.request_timeout_ms);
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| DispatchError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            request_timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(
        &self,
        request: &DispatchRequest,
        credentials: &Credentials,
    ) -> std::result::Result<Value, AttemptError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, credentials.api_key.expose_secret().as_str())
            .header(API_SECRET_HEADER, credentials.api_secret.expose_secret().as_str())
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AttemptError::status(
                status.as_u16(),
                format!("Failed to read response body: {}", e),
                None,
            )
        })?;

        if !status.is_success() {
            return Err(AttemptError::status(
                status.as_u16(),
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
                Some(body).filter(|b| !b.trim().is_empty()),
            ));
        }

        debug!(status = status.as_u16(), size = body.len(), "Registration accepted");
        Ok(decode_body(&body))
    }

    fn transport_error(&self, error: reqwest::Error) -> AttemptError {
        if error.is_timeout() {
            AttemptError::transport(format!(
                "Request timed out after {}ms",
                self.request_timeout.as_millis()
            ))
        } else if error.is_connect() {
            AttemptError::transport(format!("Connection failed: {}", error))
        } else {
            AttemptError::transport(format!("HTTP request failed: {}", error))
        }
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn send(&self, request: &DispatchRequest, credentials: &Credentials) -> AttemptOutcome {
        match self.post(request, credentials).await {
            Ok(data) => AttemptOutcome::Success(data),
            Err(error) => AttemptOutcome::Failure(error),
        }
    }
}

/// JSON when the body parses, the raw text otherwise, `null` when empty
fn decode_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
