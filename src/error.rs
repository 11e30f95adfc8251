use serde_json::Value as JsonValue;

/// Error type returned by this crate.
///
/// Variants produced from an HTTP response carry the status code, the
/// message reported by the service and the decoded error payload.
#[derive(Debug, thiserror::Error)]
pub enum RiskRadarError {
    /// Non-success response that is not covered by a more specific variant.
    #[error("{message}")]
    Api {
        message: String,
        status: Option<u16>,
        details: JsonValue,
    },
    /// HTTP 401: missing, invalid or expired credential.
    #[error("authentication failed: {message}")]
    Authentication { message: String, details: JsonValue },
    /// HTTP 403: credential is valid but lacks the required role.
    #[error("permission denied: {message}")]
    Permission { message: String, details: JsonValue },
    /// HTTP 409 with a `duplicate_info` payload.
    #[error("duplicate file: {message}")]
    DuplicateFile {
        message: String,
        /// Copied verbatim from the `duplicate_info` field of the response.
        duplicate_info: JsonValue,
        details: JsonValue,
    },
    /// HTTP 429 after all retries were spent.
    #[error("rate limited: {message}")]
    RateLimited { message: String, details: JsonValue },
    /// HTTP 5xx after all retries were spent.
    #[error("server error {status}: {message}")]
    Server {
        message: String,
        status: u16,
        details: JsonValue,
    },
    /// No response arrived within the configured timeout on the last attempt.
    #[error("{message}")]
    Timeout { message: String },
    /// Connection or request execution error from `reqwest`.
    #[error("network error: {0}")]
    Network(reqwest::Error),
    /// A success response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// Caller supplied input that cannot be turned into a request.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl RiskRadarError {
    /// HTTP status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            Self::Authentication { .. } => Some(401),
            Self::Permission { .. } => Some(403),
            Self::DuplicateFile { .. } => Some(409),
            Self::RateLimited { .. } => Some(429),
            Self::Server { status, .. } => Some(*status),
            Self::Network(err) => err.status().map(|status| status.as_u16()),
            Self::Timeout { .. } | Self::Decode(_) | Self::InvalidInput(_) => None,
        }
    }

    /// Human-readable message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. }
            | Self::Authentication { message, .. }
            | Self::Permission { message, .. }
            | Self::DuplicateFile { message, .. }
            | Self::RateLimited { message, .. }
            | Self::Server { message, .. }
            | Self::Timeout { message } => message.clone(),
            Self::Network(err) => format!("Network error: {err}"),
            Self::Decode(message) | Self::InvalidInput(message) => message.clone(),
        }
    }

    /// Structured error payload returned by the service.
    pub fn details(&self) -> Option<&JsonValue> {
        match self {
            Self::Api { details, .. }
            | Self::Authentication { details, .. }
            | Self::Permission { details, .. }
            | Self::DuplicateFile { details, .. }
            | Self::RateLimited { details, .. }
            | Self::Server { details, .. } => Some(details),
            _ => None,
        }
    }

    /// Description of the already-imported file for duplicate conflicts.
    pub fn duplicate_info(&self) -> Option<&JsonValue> {
        match self {
            Self::DuplicateFile { duplicate_info, .. } => Some(duplicate_info),
            _ => None,
        }
    }

    /// Whether the condition is transient, i.e. one the executor retries
    /// while attempts remain.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::Timeout { .. } | Self::Network(_)
        )
    }

    /// Short variant name, handy for batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Api { .. } => "api",
            Self::Authentication { .. } => "authentication",
            Self::Permission { .. } => "permission",
            Self::DuplicateFile { .. } => "duplicate_file",
            Self::RateLimited { .. } => "rate_limited",
            Self::Server { .. } => "server",
            Self::Timeout { .. } => "timeout",
            Self::Network(_) => "network",
            Self::Decode(_) => "decode",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}
