#![forbid(unsafe_code)]

use ax_storage::StoreError;

/// Error taxonomy every surface translates from. The `code()` strings are
/// stable; production HTTP bodies carry them verbatim.
#[derive(Debug)]
pub enum CenterError {
    NotConfigured(String),
    Unauthorized(String),
    NotFound { entity: &'static str, id: String },
    Conflict(String),
    BadRequest(String),
    RateLimited(String),
    Store(StoreError),
}

impl CenterError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "NOT_CONFIGURED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl std::fmt::Display for CenterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured(message) => write!(f, "not configured: {message}"),
            Self::Unauthorized(message) => write!(f, "unauthorized: {message}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::BadRequest(message) => write!(f, "invalid input: {message}"),
            Self::RateLimited(message) => write!(f, "rate limited: {message}"),
            Self::Store(err) => write!(f, "store: {err}"),
        }
    }
}

impl std::error::Error for CenterError {}

impl From<StoreError> for CenterError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::InvalidInput(message) => Self::BadRequest(message.to_string()),
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::Conflict { entity, id, reason } => {
                Self::Conflict(format!("{entity} {id}: {reason}"))
            }
            StoreError::Unsupported(message) => Self::NotConfigured(message.to_string()),
            other => Self::Store(other),
        }
    }
}
