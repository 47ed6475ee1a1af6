use serde::Serialize;
use serde_json::Value;
use std::fmt;

use super::secret::Credentials;
use crate::records::Record;

/// Event and credentials shared by every record of one upload
#[derive(Debug, Clone)]
pub struct UploadContext {
    pub event_id: String,
    pub credentials: Credentials,
}

impl UploadContext {
    pub fn new(event_id: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            event_id: event_id.into(),
            credentials,
        }
    }

    /// Build the request for one attempt at registering `record`
    pub fn request_for(&self, record: &Record) -> DispatchRequest {
        DispatchRequest {
            event_id: self.event_id.clone(),
            name: record.name.clone(),
            email: record.email.clone(),
        }
    }
}

/// JSON body of a registration call: `{"id", "name", "email"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchRequest {
    #[serde(rename = "id")]
    pub event_id: String,
    pub name: String,
    pub email: String,
}

/// Why a single attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptError {
    pub message: String,
    /// HTTP status, when the remote answered at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Response body returned with a non-2xx status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl AttemptError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    pub fn status(status: u16, message: impl Into<String>, body: Option<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
            body,
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(body) = &self.body {
            write!(f, " (response: {})", body)?;
        }
        Ok(())
    }
}

impl std::error::Error for AttemptError {}

/// Result of exactly one call to the registration endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(Value),
    Failure(AttemptError),
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success(_))
    }
}
