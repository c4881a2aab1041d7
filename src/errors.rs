//! Standardized error types following the `error-oidp-<domain>-<number>` format.

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when a required environment variable is not set
    #[error("error-oidp-config-1 {0} must be set")]
    EnvVarRequired(String),

    /// Error when PORT cannot be parsed
    #[error("error-oidp-config-2 Parsing HTTP_PORT into u16 failed: {0:?}")]
    PortParsingFailed(std::num::ParseIntError),

    /// Error when version information is not available
    #[error("error-oidp-config-3 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when a duration string cannot be parsed
    #[error("error-oidp-config-4 Failed to parse duration '{0}': {1}")]
    DurationParsingFailed(String, String),

    /// Error when the ID token signing secret is unusable
    #[error("error-oidp-config-5 ID_TOKEN_SIGNING_SECRET must not be empty")]
    SigningSecretEmpty,
}

/// HTTP server errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Error when template rendering fails
    #[error("error-oidp-http-1 Template rendering failed: {0}")]
    TemplateRenderingFailed(String),

    /// Error when request processing fails
    #[error("error-oidp-http-2 Request processing failed: {0}")]
    RequestProcessingFailed(String),
}

/// OAuth protocol errors
///
/// Each variant corresponds to an RFC 6749 / OIDC error code; the payload is
/// the human-readable `error_description` sent on the wire. Protocol failures
/// are values carried in `Result`, never panics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OAuthError {
    /// Malformed or incomplete request
    #[error("{0}")]
    InvalidRequest(String),

    /// Unknown client, inactive client, or failed client authentication
    #[error("{0}")]
    InvalidClient(String),

    /// Invalid, expired, consumed, or mismatched grant material
    #[error("{0}")]
    InvalidGrant(String),

    /// Requested scope is missing, malformed, or exceeds what is allowed
    #[error("{0}")]
    InvalidScope(String),

    /// Missing, unknown, or expired access token on a protected endpoint
    #[error("{0}")]
    InvalidToken(String),

    /// Response type is not `code` or not supported by the client
    #[error("{0}")]
    UnsupportedResponseType(String),

    /// Grant type is unknown or not supported by the client
    #[error("{0}")]
    UnsupportedGrantType(String),

    /// The resource owner denied the request
    #[error("{0}")]
    AccessDenied(String),

    /// Backend failure surfaced to the caller
    #[error("{0}")]
    ServerError(String),
}

impl OAuthError {
    /// Wire-level `error` code for this failure
    pub fn code(&self) -> &'static str {
        match self {
            OAuthError::InvalidRequest(_) => "invalid_request",
            OAuthError::InvalidClient(_) => "invalid_client",
            OAuthError::InvalidGrant(_) => "invalid_grant",
            OAuthError::InvalidScope(_) => "invalid_scope",
            OAuthError::InvalidToken(_) => "invalid_token",
            OAuthError::UnsupportedResponseType(_) => "unsupported_response_type",
            OAuthError::UnsupportedGrantType(_) => "unsupported_grant_type",
            OAuthError::AccessDenied(_) => "access_denied",
            OAuthError::ServerError(_) => "server_error",
        }
    }

    /// HTTP status when the error is rendered as a JSON body
    pub fn status(&self) -> StatusCode {
        match self {
            OAuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            OAuthError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error when a backing-store operation fails
    #[error("error-oidp-storage-1 Query execution failed: {0}")]
    QueryFailed(String),

    /// Error when data serialization fails
    #[error("error-oidp-storage-2 Data serialization failed: {0}")]
    SerializationFailed(String),

    /// Error when data validation fails
    #[error("error-oidp-storage-3 Invalid data: {0}")]
    InvalidData(String),

    /// Error when requested resource is not found
    #[error("error-oidp-storage-4 Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, HttpError>;

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self, "internal server error");
        (StatusCode::INTERNAL_SERVER_ERROR).into_response()
    }
}
