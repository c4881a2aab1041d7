//! Bearer token authentication for protected endpoints.
//!
//! Validates OAuth 2.0 access tokens from the `Authorization` header and
//! hands the stored token record to request handlers.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use http::request::Parts;
use serde_json::json;

use crate::http::context::AppState;
use crate::oauth::types::AccessToken;
use crate::storage::traits::AccessTokenStore;

/// Authenticated access token extractor for protected endpoints
///
/// Rejections are `401` JSON bodies carrying the `invalid_token` error code.
#[derive(Clone, Debug)]
pub struct ExtractedAuth(pub AccessToken);

/// Create a standard OAuth 2.0 error response
fn create_oauth_error_response(
    status: StatusCode,
    error: &str,
    error_description: &str,
) -> Response {
    let body = json!({
        "error": error,
        "error_description": error_description
    });

    (status, axum::Json(body)).into_response()
}

fn invalid_token(description: &str) -> Response {
    create_oauth_error_response(StatusCode::UNAUTHORIZED, "invalid_token", description)
}

impl<S> FromRequestParts<S> for ExtractedAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| invalid_token("Missing or invalid Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| invalid_token("Missing or invalid Authorization header"))?;

        if token.is_empty() {
            return Err(invalid_token("Missing access token"));
        }

        let stored_token = app_state
            .storage
            .get_token(token)
            .await
            .map_err(|e| {
                create_oauth_error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server_error",
                    &format!("Storage error: {}", e),
                )
            })?
            .ok_or_else(|| invalid_token("Invalid access token"))?;

        // TTLs are evaluated lazily at read time
        if stored_token.is_expired(Utc::now()) {
            return Err(invalid_token("Access token has expired"));
        }

        Ok(ExtractedAuth(stored_token))
    }
}
