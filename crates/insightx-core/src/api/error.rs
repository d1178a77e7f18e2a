use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad client input, caught before anything is sent.
    #[error("{0}")]
    Validation(String),

    #[error("Session expired. Please log in again.")]
    Unauthenticated,

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Rate limit exceeded. Please try again later.{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<String> },

    #[error("Server error. Please try again later.")]
    ServerError { status: u16 },

    #[error("Network error. Please check your connection.")]
    Network(#[source] reqwest::Error),

    #[error("{0}")]
    NotFound(String),

    /// Any other non-success status, left for the call site to interpret.
    /// `body` is the full response body.
    #[error("Request failed with status {status}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Unknown(String),
}

/// Maximum length for error response bodies in log lines
const MAX_ERROR_BODY_LENGTH: usize = 500;

fn retry_hint(retry_after: &Option<String>) -> String {
    match retry_after {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    }
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Map a non-success status to an error. Server error bodies are dropped.
    pub fn from_status(status: StatusCode, body: &str, retry_after: Option<String>) -> Self {
        match status.as_u16() {
            401 => ApiError::AuthFailed(Self::detail_message(body).unwrap_or_else(|| "Unauthorized".to_string())),
            429 => ApiError::RateLimited { retry_after },
            code @ 500..=599 => ApiError::ServerError { status: code },
            code => ApiError::Status {
                status: code,
                body: body.to_string(),
            },
        }
    }

    /// Pull a human-readable message out of a FastAPI style error body:
    /// `{"detail": "..."}` or `{"detail": {"errors": ["...", ...]}}`.
    pub fn detail_message(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        let detail = value.get("detail")?;
        if let Some(text) = detail.as_str() {
            return Some(text.to_string());
        }
        detail
            .get("errors")
            .and_then(|errors| errors.get(0))
            .and_then(|first| first.as_str())
            .map(str::to_string)
    }

    /// Failures the request client already normalized. Call sites pass these
    /// through instead of replacing them with an endpoint-specific message.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthenticated
                | ApiError::AuthFailed(_)
                | ApiError::RateLimited { .. }
                | ApiError::ServerError { .. }
                | ApiError::Network(_)
        )
    }

    /// Replace an endpoint's raw status errors with display messages:
    /// 404 becomes `not_found`, other statuses become `fallback`.
    pub(crate) fn at_call_site(self, not_found: &str, fallback: &str) -> Self {
        match self {
            ApiError::Status { status: 404, .. } => ApiError::NotFound(not_found.to_string()),
            e if e.is_transport() => e,
            ApiError::Validation(_) | ApiError::NotFound(_) => self,
            _ => ApiError::Unknown(fallback.to_string()),
        }
    }
}
