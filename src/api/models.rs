//! Wire types of the upload service
//!
//! `POST /upload` takes `multipart/form-data`:
//!
//! | field       | kind | content                         |
//! |-------------|------|---------------------------------|
//! | `eventId`   | text | remote event identifier         |
//! | `apiKey`    | text | value of the `Api-Key` header    |
//! | `apiSecret` | text | value of the `Api-Secret` header |
//! | `csvFile`   | file | `name,email` lines              |
//!
//! and answers with the [`crate::batch::BatchReport`] as JSON.

use serde::Serialize;

use crate::observability::MetricsSnapshot;

pub const FIELD_EVENT_ID: &str = "eventId";
pub const FIELD_API_KEY: &str = "apiKey";
pub const FIELD_API_SECRET: &str = "apiSecret";
pub const FIELD_FILE: &str = "csvFile";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub metrics: MetricsSnapshot,
}
