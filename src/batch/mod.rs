//! Batch dispatch of an uploaded registrant list
//!
//! [`BatchOrchestrator::process_upload`] is the single entry point used by the
//! HTTP service and the CLI: it checks the upload context, parses the buffer,
//! runs each record through [`crate::retry::attempt`] and returns a
//! [`BatchReport`]. A caller gets either a complete report or one
//! [`BatchError`], never a partial report.

mod orchestrator;
mod report;

pub use orchestrator::BatchOrchestrator;
pub use report::BatchReport;

use bytes::Bytes;
use reqwest::header::HeaderValue;
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::dispatch::{Credentials, UploadContext};
use crate::records::ParseError;

/// Errors that fail a whole batch
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid field: {0} cannot be sent as a header value")]
    InvalidField(&'static str),

    #[error("unreadable upload: {0}")]
    UnreadableInput(#[from] ParseError),
}

/// An uploaded CSV buffer and the event/credentials it should be registered with
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub event_id: String,
    pub credentials: Credentials,
    pub buffer: Bytes,
}

impl RawUpload {
    pub fn new(
        event_id: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        buffer: impl Into<Bytes>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            credentials: Credentials::new(api_key, api_secret),
            buffer: buffer.into(),
        }
    }

    /// Context shared by every record, or the first blank or unsendable field.
    ///
    /// `eventId` is forwarded as uploaded; surrounding whitespace only counts
    /// towards the blank check.
    pub fn context(&self) -> Result<UploadContext, BatchError> {
        if self.event_id.trim().is_empty() {
            return Err(BatchError::MissingField("eventId"));
        }
        check_header_field("apiKey", self.credentials.api_key.expose_secret().as_str())?;
        check_header_field("apiSecret", self.credentials.api_secret.expose_secret().as_str())?;

        Ok(UploadContext::new(
            self.event_id.as_str(),
            self.credentials.clone(),
        ))
    }
}

fn check_header_field(field: &'static str, value: &str) -> Result<(), BatchError> {
    if value.trim().is_empty() {
        return Err(BatchError::MissingField(field));
    }
    if HeaderValue::from_str(value).is_err() {
        return Err(BatchError::InvalidField(field));
    }
    Ok(())
}
