//! Handles POST /token - exchanges grants for access, refresh, and ID tokens.

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};

use super::context::AppState;
use crate::oauth::client_auth::extract_client_auth;
use crate::oauth::types::{TokenForm, TokenResponse};

/// Handle OAuth token requests
/// POST /token - Dispatches to the registered grant handler; failures are
/// JSON bodies with the RFC 6749 error code.
pub async fn post_token_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<TokenForm>,
) -> Result<Json<TokenResponse>, (StatusCode, Json<Value>)> {
    // Client credentials may arrive via Basic header or body parameters
    let client_auth = extract_client_auth(&headers, &form);

    match state.auth_server.token(form, client_auth).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::debug!(error_code = e.code(), "token request failed");
            let error_response = json!({
                "error": e.code(),
                "error_description": e.to_string()
            });
            Err((e.status(), Json(error_response)))
        }
    }
}
