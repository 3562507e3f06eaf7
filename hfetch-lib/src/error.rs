use thiserror::Error;

/// Errors reported by the SideFX web services.
///
/// Both variants carry the HTTP status and the raw response body. All other
/// failures travel as plain [`anyhow::Error`]s; callers that care about the
/// status can `downcast_ref::<ServiceError>()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Failed to obtain an access token (HTTP {http_code}): {message}")]
    Authorization { http_code: u16, message: String },

    #[error("API call failed (HTTP {http_code}): {message}")]
    Api { http_code: u16, message: String },
}

impl ServiceError {
    pub fn http_code(&self) -> u16 {
        match self {
            ServiceError::Authorization { http_code, .. } | ServiceError::Api { http_code, .. } => {
                *http_code
            }
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ServiceError::Authorization { message, .. } | ServiceError::Api { message, .. } => {
                message
            }
        }
    }
}
