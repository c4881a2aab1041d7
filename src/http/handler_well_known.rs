//! Handles OpenID Connect discovery and JWKS endpoints

use axum::{extract::State, response::Json};
use serde_json::{Value, json};

use super::context::AppState;
use crate::oauth::types::STANDARD_SCOPES;

/// OpenID Connect Configuration handler
/// GET /.well-known/openid-configuration
///
/// Returns OpenID Provider metadata as specified by OpenID Connect Discovery
/// 1.0. Endpoint URLs are the issuer with fixed suffixes appended.
pub async fn openid_configuration_handler(State(state): State<AppState>) -> Json<Value> {
    let issuer = &state.config.external_base;
    let metadata = json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{}/authorize", issuer),
        "token_endpoint": format!("{}/token", issuer),
        "userinfo_endpoint": format!("{}/userinfo", issuer),
        "jwks_uri": format!("{}/jwks", issuer),
        "end_session_endpoint": format!("{}/logout", issuer),
        "response_types_supported": ["code"],
        "subject_types_supported": ["public"],
        "id_token_signing_alg_values_supported": ["RS256"],
        "scopes_supported": STANDARD_SCOPES
    });

    Json(metadata)
}

/// JWKS (JSON Web Key Set) handler
/// GET /jwks
///
/// ID tokens are currently signed with a server-held symmetric key, which has
/// no publishable component, so the key set is empty. An asymmetric signing
/// deployment would expose its public keys here.
pub async fn jwks_handler() -> Json<Value> {
    Json(json!({ "keys": [] }))
}
