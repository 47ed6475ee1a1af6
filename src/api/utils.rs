//! Pure helpers for upload request handling

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;

use crate::api::error::ApiError;
use crate::humanize::ByteSize;

/// Accept only `multipart/form-data` with a boundary parameter
pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::InvalidPayload(format!("invalid Content-Type: {}", content_type))
    })?;

    if media_type.type_() != mime::MULTIPART || media_type.subtype() != mime::FORM_DATA {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be multipart/form-data, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    if media_type.get_param(mime::BOUNDARY).is_none() {
        return Err(ApiError::InvalidPayload(
            "multipart/form-data without boundary".to_string(),
        ));
    }

    Ok(media_type)
}

/// Map a multipart read failure, keeping the body-limit case distinct
pub fn map_multipart_error(error: MultipartError, limit: ByteSize) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(limit)
    } else {
        ApiError::InvalidPayload(error.body_text())
    }
}
