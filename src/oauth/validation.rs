//! Stateless request and client validation.
//!
//! Pure functions over explicit request data returning typed results; the
//! orchestrators decide how failures are rendered. Checks run in a fixed
//! order and the first failure wins.

use crate::errors::OAuthError;
use crate::oauth::types::{AuthorizationRequest, AuthorizeQuery, OAuthClient, ResponseType, TokenForm};

/// Validate an authorization request's parameters.
///
/// Presence of `client_id`, `redirect_uri`, and `response_type` is checked in
/// that order, then the response type value, then that the scope string is
/// non-blank and contains `openid`.
pub fn validate_authorization_request(
    query: &AuthorizeQuery,
) -> Result<AuthorizationRequest, OAuthError> {
    let client_id = require_param(query.client_id.as_deref(), "client_id")?;
    let redirect_uri = require_param(query.redirect_uri.as_deref(), "redirect_uri")?;
    let response_type = require_param(query.response_type.as_deref(), "response_type")?;

    if response_type != "code" {
        return Err(OAuthError::UnsupportedResponseType(format!(
            "Unsupported response_type: {}",
            response_type
        )));
    }

    let scope = query.scope.as_deref().unwrap_or_default().trim();
    if scope.is_empty() {
        return Err(OAuthError::InvalidScope("Missing scope".to_string()));
    }
    if !scope.split_whitespace().any(|s| s == "openid") {
        return Err(OAuthError::InvalidScope(
            "Scope must include openid".to_string(),
        ));
    }

    Ok(AuthorizationRequest {
        client_id: client_id.to_string(),
        redirect_uri: redirect_uri.to_string(),
        scope: scope.to_string(),
        state: query.state.clone(),
        nonce: query.nonce.clone(),
        code_challenge: query.code_challenge.clone(),
        code_challenge_method: query.code_challenge_method.clone(),
    })
}

/// Validate the client resolved for an authorization request.
///
/// Four checks in fixed order: client exists, client is active, the redirect
/// URI is registered (exact string match, no normalization), and the client
/// supports the `code` response type.
pub fn validate_client<'a>(
    client: Option<&'a OAuthClient>,
    redirect_uri: &str,
) -> Result<&'a OAuthClient, OAuthError> {
    let client =
        client.ok_or_else(|| OAuthError::InvalidClient("Invalid client_id".to_string()))?;

    if !client.active {
        return Err(OAuthError::InvalidClient(
            "Client is not active".to_string(),
        ));
    }

    if !client.redirect_uris.iter().any(|uri| uri == redirect_uri) {
        return Err(OAuthError::InvalidRequest(
            "Invalid redirect_uri".to_string(),
        ));
    }

    if !client.response_types.contains(&ResponseType::Code) {
        return Err(OAuthError::UnsupportedResponseType(
            "Client does not support the code response type".to_string(),
        ));
    }

    Ok(client)
}

/// Validate presence of `grant_type` on a token request
pub fn validate_token_request(form: &TokenForm) -> Result<&str, OAuthError> {
    require_param(form.grant_type.as_deref(), "grant_type")
}

/// Validate the parameters specific to the authorization_code grant, in
/// order: `code` then `redirect_uri`.
pub fn validate_authorization_code_params(form: &TokenForm) -> Result<(&str, &str), OAuthError> {
    let code = require_param(form.code.as_deref(), "code")?;
    let redirect_uri = require_param(form.redirect_uri.as_deref(), "redirect_uri")?;
    Ok((code, redirect_uri))
}

fn require_param<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, OAuthError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(OAuthError::InvalidRequest(format!("Missing {}", name))),
    }
}
