//! Handles GET|POST /userinfo - OpenID Connect UserInfo endpoint

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};
use std::collections::HashSet;

use super::context::AppState;
use crate::http::middleware_auth::ExtractedAuth;
use crate::oauth::openid::OpenIDClaims;
use crate::oauth::types::parse_scope;
use crate::storage::traits::UserStore;

/// Get OpenID Connect UserInfo
/// GET|POST /userinfo
///
/// Returns claims about the authenticated end user as authorized by the
/// access token: always `sub`, plus profile and email claims gated by the
/// token's scopes.
pub async fn get_userinfo_handler(
    State(state): State<AppState>,
    ExtractedAuth(access_token): ExtractedAuth,
) -> Result<Json<OpenIDClaims>, (StatusCode, Json<Value>)> {
    let user_id = match access_token.user_id {
        Some(ref user_id) => user_id.clone(),
        None => {
            // Client-credentials tokens carry no subject
            let error_response = json!({
                "error": "invalid_token",
                "error_description": "Access token has no subject"
            });
            return Err((StatusCode::UNAUTHORIZED, Json(error_response)));
        }
    };

    let user = match state.storage.get_user(&user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!(%user_id, "access token references unknown user");
            let error_response = json!({
                "error": "invalid_token",
                "error_description": "Invalid access token"
            });
            return Err((StatusCode::UNAUTHORIZED, Json(error_response)));
        }
        Err(e) => {
            let error_response = json!({
                "error": "server_error",
                "error_description": format!("Storage error: {}", e)
            });
            return Err((StatusCode::INTERNAL_SERVER_ERROR, Json(error_response)));
        }
    };

    let scopes: HashSet<String> = match access_token.scope {
        Some(ref scope) => parse_scope(scope),
        None => HashSet::new(),
    };

    let claims = OpenIDClaims::new_userinfo(user.user_id.clone()).with_user_claims(&user, &scopes);

    Ok(Json(claims))
}
