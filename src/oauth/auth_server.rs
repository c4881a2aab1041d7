//! Authorization and token endpoint orchestration.
//!
//! Drives the consent state machine for `/authorize`
//! (Requested -> Validated -> (AutoApproved | AwaitingConsent) -> Decided ->
//! Redirected) and the client-auth -> grant-validate -> grant-execute
//! pipeline for `/token`. Collaborators are injected at construction.

use chrono::{Duration, Utc};
use std::sync::Arc;
use url::Url;

use crate::errors::OAuthError;
use crate::oauth::client_auth::ClientAuthentication;
use crate::oauth::grants::{GrantContext, GrantTypeFactory};
use crate::oauth::issuer::TokenIssuer;
use crate::oauth::types::{
    AuthorizationCode, AuthorizationRequest, AuthorizeQuery, OAuthClient, TokenForm,
    TokenResponse, User, generate_token, parse_scope,
};
use crate::oauth::validation::{
    validate_authorization_request, validate_client, validate_token_request,
};
use crate::storage::traits::{
    AuthorizationCodeStore, ClientStore, ConsentStore, OAuthStorage, PendingAuthorizationStore,
    SessionStore, UserStore,
};

/// OAuth 2.0 / OpenID Connect authorization server core
pub struct AuthorizationServer {
    storage: Arc<dyn OAuthStorage>,
    issuer: Arc<TokenIssuer>,
    grants: GrantTypeFactory,
    /// Authorization code lifetime
    auth_code_ttl: Duration,
}

/// Outcome of an authorization-endpoint interaction.
///
/// `Error` failures happen before the redirect target is trusted and must be
/// rendered as JSON; `ErrorRedirect` failures happen after and are delivered
/// to the client's redirect URI.
pub enum AuthorizeOutcome {
    /// Success redirect carrying `code` and `state`
    Redirect(String),
    /// The user must be shown a consent prompt
    ConsentRequired {
        client: OAuthClient,
        request: AuthorizationRequest,
    },
    /// Error redirect to the validated redirect URI
    ErrorRedirect(String),
    /// Error rendered as a JSON body
    Error(OAuthError),
}

impl AuthorizationServer {
    pub fn new(storage: Arc<dyn OAuthStorage>, issuer: Arc<TokenIssuer>) -> Self {
        Self {
            storage,
            issuer,
            grants: GrantTypeFactory::new(),
            auth_code_ttl: Duration::minutes(10),
        }
    }

    pub fn with_auth_code_ttl(mut self, ttl: Duration) -> Self {
        self.auth_code_ttl = ttl;
        self
    }

    /// Handle `GET /authorize`.
    ///
    /// Validates the request parameters and the client, resolves the
    /// authenticated user from the browser session, then either auto-approves
    /// against recorded consent or parks the request pending a decision.
    pub async fn authorize(
        &self,
        query: AuthorizeQuery,
        session_id: Option<&str>,
    ) -> AuthorizeOutcome {
        // Phase 1: the redirect target is not yet trusted; failures are JSON
        let request = match validate_authorization_request(&query) {
            Ok(request) => request,
            Err(e) => return AuthorizeOutcome::Error(e),
        };

        let client = match self.storage.get_client(&request.client_id).await {
            Ok(client) => client,
            Err(e) => return AuthorizeOutcome::Error(OAuthError::ServerError(e.to_string())),
        };
        let client = match validate_client(client.as_ref(), &request.redirect_uri) {
            Ok(client) => client.clone(),
            Err(e) => return AuthorizeOutcome::Error(e),
        };

        // Phase 2: redirect URI is registered for the client; failures go back
        // through it
        let user = match self.resolve_session_user(session_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return self.error_redirect(
                    &request.redirect_uri,
                    &OAuthError::AccessDenied("User is not authenticated".to_string()),
                    request.state.as_deref(),
                );
            }
            Err(e) => return self.error_redirect(&request.redirect_uri, &e, request.state.as_deref()),
        };

        let requested_scopes = parse_scope(&request.scope);
        let consent = match self.storage.get_consent(&user.user_id, &client.client_id).await {
            Ok(consent) => consent,
            Err(e) => {
                let e = OAuthError::ServerError(e.to_string());
                return self.error_redirect(&request.redirect_uri, &e, request.state.as_deref());
            }
        };

        let covered = consent
            .filter(|c| c.expires_at.is_none_or(|expires_at| expires_at > Utc::now()))
            .is_some_and(|c| c.covers_scopes(&requested_scopes));

        if covered {
            tracing::debug!(
                client_id = %client.client_id,
                user_id = %user.user_id,
                "existing consent covers request, auto-approving"
            );
            return match self.issue_code_redirect(&user, &request).await {
                Ok(url) => AuthorizeOutcome::Redirect(url),
                Err(e) => self.error_redirect(&request.redirect_uri, &e, request.state.as_deref()),
            };
        }

        // Park the request until the user decides
        let session_id = session_id.unwrap_or_default();
        if let Err(e) = self
            .storage
            .store_pending_authorization(session_id, &request)
            .await
        {
            let e = OAuthError::ServerError(e.to_string());
            return self.error_redirect(&request.redirect_uri, &e, request.state.as_deref());
        }

        AuthorizeOutcome::ConsentRequired { client, request }
    }

    /// Handle `POST /authorize` - the user's consent decision.
    ///
    /// The pending parameters are cleared whichever way the decision goes.
    pub async fn decide(&self, session_id: Option<&str>, approved: bool) -> AuthorizeOutcome {
        let session_expired =
            || AuthorizeOutcome::Error(OAuthError::InvalidRequest("Session expired".to_string()));

        let Some(session_id) = session_id else {
            return session_expired();
        };

        let request = match self.storage.get_pending_authorization(session_id).await {
            Ok(Some(request)) => request,
            Ok(None) => return session_expired(),
            Err(e) => return AuthorizeOutcome::Error(OAuthError::ServerError(e.to_string())),
        };

        if let Err(e) = self.storage.remove_pending_authorization(session_id).await {
            return AuthorizeOutcome::Error(OAuthError::ServerError(e.to_string()));
        }

        let user = match self.resolve_session_user(Some(session_id)).await {
            Ok(Some(user)) => user,
            Ok(None) => return session_expired(),
            Err(e) => return AuthorizeOutcome::Error(e),
        };

        if !approved {
            tracing::info!(
                client_id = %request.client_id,
                user_id = %user.user_id,
                "user denied the authorization request"
            );
            let e = OAuthError::AccessDenied("The user denied the request".to_string());
            return self.error_redirect(&request.redirect_uri, &e, request.state.as_deref());
        }

        let redirect = match self.issue_code_redirect(&user, &request).await {
            Ok(url) => url,
            Err(e) => {
                return self.error_redirect(&request.redirect_uri, &e, request.state.as_deref());
            }
        };

        if let Err(e) = self
            .storage
            .record_consent(&user.user_id, &request.client_id, &request.scope)
            .await
        {
            let e = OAuthError::ServerError(e.to_string());
            return self.error_redirect(&request.redirect_uri, &e, request.state.as_deref());
        }

        AuthorizeOutcome::Redirect(redirect)
    }

    /// Handle `POST /token`.
    pub async fn token(
        &self,
        form: TokenForm,
        client_auth: Option<ClientAuthentication>,
    ) -> Result<TokenResponse, OAuthError> {
        // Unknown grant types fail before client authentication
        let grant_type = validate_token_request(&form)?.to_string();

        let ctx = GrantContext {
            storage: self.storage.clone(),
            issuer: self.issuer.clone(),
            form,
            client_auth,
        };

        let mut handler = self.grants.create(&grant_type, ctx)?;
        handler.validate().await?;
        handler.execute().await
    }

    /// Handle `GET /logout`: destroy the session and compute the redirect
    /// target.
    pub async fn logout(
        &self,
        session_id: Option<&str>,
        post_logout_redirect_uri: Option<&str>,
        state: Option<&str>,
    ) -> String {
        if let Some(session_id) = session_id {
            if let Err(e) = self.storage.remove_session(session_id).await {
                tracing::warn!(error = %e, "failed to remove session on logout");
            }
        }

        match post_logout_redirect_uri {
            Some(uri) => match Url::parse(uri) {
                Ok(mut url) => {
                    if let Some(state) = state {
                        url.query_pairs_mut().append_pair("state", state);
                    }
                    url.to_string()
                }
                Err(_) => "/".to_string(),
            },
            None => "/".to_string(),
        }
    }

    /// Generate, persist, and encode an authorization code into the success
    /// redirect.
    async fn issue_code_redirect(
        &self,
        user: &User,
        request: &AuthorizationRequest,
    ) -> Result<String, OAuthError> {
        let now = Utc::now();
        let auth_code = AuthorizationCode {
            code: generate_token(),
            client_id: request.client_id.clone(),
            user_id: user.user_id.clone(),
            redirect_uri: request.redirect_uri.clone(),
            scope: Some(request.scope.clone()),
            nonce: request.nonce.clone(),
            code_challenge: request.code_challenge.clone(),
            code_challenge_method: request.code_challenge_method.clone(),
            created_at: now,
            expires_at: now + self.auth_code_ttl,
            used: false,
            used_at: None,
        };

        self.storage
            .store_code(&auth_code)
            .await
            .map_err(|e| OAuthError::ServerError(format!("Failed to store auth code: {}", e)))?;

        let mut redirect_url = Url::parse(&request.redirect_uri)
            .map_err(|e| OAuthError::InvalidRequest(format!("Invalid redirect URI: {}", e)))?;

        // Percent-encoded pairs in insertion order; absent values are omitted
        redirect_url
            .query_pairs_mut()
            .append_pair("code", &auth_code.code);
        if let Some(ref state) = request.state {
            redirect_url.query_pairs_mut().append_pair("state", state);
        }

        Ok(redirect_url.to_string())
    }

    /// Build an error redirect; falls back to a JSON outcome when the
    /// redirect URL cannot be constructed.
    fn error_redirect(
        &self,
        redirect_uri: &str,
        error: &OAuthError,
        state: Option<&str>,
    ) -> AuthorizeOutcome {
        match Url::parse(redirect_uri) {
            Ok(mut url) => {
                {
                    let mut pairs = url.query_pairs_mut();
                    pairs.append_pair("error", error.code());
                    pairs.append_pair("error_description", &error.to_string());
                    if let Some(state) = state {
                        pairs.append_pair("state", state);
                    }
                }
                AuthorizeOutcome::ErrorRedirect(url.to_string())
            }
            Err(_) => AuthorizeOutcome::Error(error.clone()),
        }
    }

    async fn resolve_session_user(
        &self,
        session_id: Option<&str>,
    ) -> Result<Option<User>, OAuthError> {
        let Some(session_id) = session_id else {
            return Ok(None);
        };

        let session = self
            .storage
            .get_session(session_id)
            .await
            .map_err(|e| OAuthError::ServerError(e.to_string()))?;

        match session {
            Some(session) => self
                .storage
                .get_user(&session.user_id)
                .await
                .map_err(|e| OAuthError::ServerError(e.to_string())),
            None => Ok(None),
        }
    }
}
