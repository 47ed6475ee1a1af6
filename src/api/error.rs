use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use super::models::ErrorResponse;
use crate::batch::BatchError;
use crate::humanize::ByteSize;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payload invalid: {0}")]
    InvalidPayload(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid field: {0} cannot be sent as a header value")]
    InvalidField(&'static str),
    #[error("upload exceeds the {0} limit")]
    PayloadTooLarge(ByteSize),
    #[error("unreadable upload: {0}")]
    UnreadableUpload(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingField(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidField(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnreadableUpload(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::MissingField(_) => "MISSING_FIELD",
            ApiError::InvalidField(_) => "INVALID_FIELD",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::UnreadableUpload(_) => "UNREADABLE_UPLOAD",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<BatchError> for ApiError {
    fn from(value: BatchError) -> Self {
        match value {
            BatchError::MissingField(field) => ApiError::MissingField(field),
            BatchError::InvalidField(field) => ApiError::InvalidField(field),
            BatchError::UnreadableInput(e) => ApiError::UnreadableUpload(e.to_string()),
        }
    }
}
