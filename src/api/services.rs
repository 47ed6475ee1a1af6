use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::HeaderMap,
    response::IntoResponse,
};
use bytes::Bytes;
use tracing::{info, warn};

use super::{
    models::{FIELD_API_KEY, FIELD_API_SECRET, FIELD_EVENT_ID, FIELD_FILE, HealthResponse},
    state::AppState,
    utils::{map_multipart_error, parse_content_type},
};
use crate::api::error::ApiError;
use crate::batch::{BatchReport, RawUpload};

/// Upload endpoint (POST /upload)
///
/// Reads the multipart form, then registers every valid CSV line with the
/// remote API before answering. The response is the full [`BatchReport`],
/// also when some records failed. Missing fields, a non-multipart body or an
/// oversized upload are rejected without dispatching anything.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchReport>, ApiError> {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    parse_content_type(content_type)?;

    let multipart = multipart.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;

    let upload = match read_form(&state, multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            state.metrics.batch_rejected();
            return Err(e);
        }
    };

    info!(
        event_id = %upload.event_id,
        size = upload.buffer.len(),
        "Upload received"
    );

    match state.orchestrator.process_upload(upload, &state.shutdown).await {
        Ok(report) => {
            state.metrics.batch_completed(&report);
            Ok(Json(report))
        }
        Err(e) => {
            warn!(error = %e, "Upload rejected");
            state.metrics.batch_rejected();
            Err(e.into())
        }
    }
}

async fn read_form(state: &AppState, mut multipart: Multipart) -> Result<RawUpload, ApiError> {
    let limit = state.config.server.max_upload_bytes;
    let mut event_id = String::new();
    let mut api_key = String::new();
    let mut api_secret = String::new();
    let mut buffer: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| map_multipart_error(e, limit))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            FIELD_EVENT_ID => event_id = field.text().await.map_err(|e| map_multipart_error(e, limit))?,
            FIELD_API_KEY => api_key = field.text().await.map_err(|e| map_multipart_error(e, limit))?,
            FIELD_API_SECRET => {
                api_secret = field.text().await.map_err(|e| map_multipart_error(e, limit))?
            }
            FIELD_FILE => buffer = Some(field.bytes().await.map_err(|e| map_multipart_error(e, limit))?),
            _ => {}
        }
    }

    let buffer = buffer.ok_or(ApiError::MissingField(FIELD_FILE))?;
    Ok(RawUpload::new(event_id, api_key, api_secret, buffer))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        metrics: state.metrics.snapshot(),
    })
}
