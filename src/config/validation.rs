use super::models::Config;
use reqwest::Url;
use thiserror::Error;

/// Upper bound on `server.max_upload_bytes`; the whole upload is buffered in memory
const MAX_UPLOAD_LIMIT: u64 = 100 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid dispatch endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Unsupported endpoint scheme '{scheme}', expected 'http' or 'https'")]
    UnsupportedScheme { scheme: String },

    #[error("retry.max_attempts must be at least 1")]
    NoAttempts,

    #[error("batch.concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("Timeout must be positive: {field} = 0")]
    ZeroTimeout { field: &'static str },

    #[error("server.max_upload_bytes ({actual}) must be between 1 and {limit}")]
    InvalidUploadLimit { actual: u64, limit: u64 },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_dispatch(config)?;
    validate_retry(config)?;
    validate_batch(config)?;
    validate_server(config)?;
    Ok(())
}

fn validate_dispatch(config: &Config) -> Result<(), ValidationError> {
    let url = Url::parse(&config.dispatch.endpoint_url).map_err(|e| {
        ValidationError::InvalidEndpoint {
            url: config.dispatch.endpoint_url.clone(),
            reason: e.to_string(),
        }
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::UnsupportedScheme {
            scheme: url.scheme().to_string(),
        });
    }

    if config.dispatch.connect_timeout_ms == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "dispatch.connect_timeout_ms",
        });
    }

    if config.dispatch.request_timeout_ms == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "dispatch.request_timeout_ms",
        });
    }

    Ok(())
}

fn validate_retry(config: &Config) -> Result<(), ValidationError> {
    if config.retry.max_attempts == 0 {
        return Err(ValidationError::NoAttempts);
    }
    Ok(())
}

fn validate_batch(config: &Config) -> Result<(), ValidationError> {
    if config.batch.concurrency == 0 {
        return Err(ValidationError::ZeroConcurrency);
    }
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    let actual = config.server.max_upload_bytes.as_u64();
    if actual == 0 || actual > MAX_UPLOAD_LIMIT {
        return Err(ValidationError::InvalidUploadLimit {
            actual,
            limit: MAX_UPLOAD_LIMIT,
        });
    }
    Ok(())
}
