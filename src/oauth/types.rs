//! OAuth 2.0 / OpenID Connect core types and data structures.
//!
//! Defines enums, structs, and helpers for clients, users, grants, tokens,
//! consents, and wire requests/responses.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// OAuth 2.0 Grant Types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    ClientCredentials,
    RefreshToken,
}

/// OAuth 2.0 Response Types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Code,
}

/// OAuth 2.0 Token Types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "Bearer")]
    Bearer,
}

/// OAuth Client Registration
///
/// Owned by the client registry; immutable for the duration of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClient {
    /// Unique client identifier
    pub client_id: String,
    /// Client secret (opaque, compared in constant time)
    pub client_secret: Option<String>,
    /// Client display name
    pub client_name: Option<String>,
    /// Registered redirect URIs (matched exactly, no normalization)
    pub redirect_uris: Vec<String>,
    /// Grant types allowed for this client
    pub grant_types: Vec<GrantType>,
    /// Response types allowed for this client
    pub response_types: Vec<ResponseType>,
    /// Scopes that can be requested by this client
    pub scope: Option<String>,
    /// Whether the client is active
    pub active: bool,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl OAuthClient {
    /// Whether the client may use the given grant type
    pub fn supports_grant(&self, grant_type: &GrantType) -> bool {
        self.grant_types.contains(grant_type)
    }
}

/// End user as seen by the protocol engine
///
/// User management is an external collaborator; the engine only reads these
/// fields when projecting claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Stable subject identifier exposed to relying parties
    pub user_id: String,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// OAuth Authorization Code
///
/// Redeemable at most once: the unused-to-used transition is atomic at the
/// storage layer, and a second redemption of the same code must fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// The authorization code
    pub code: String,
    /// Client ID that requested this code
    pub client_id: String,
    /// User ID that authorized this code
    pub user_id: String,
    /// Redirect URI used in the authorization request
    pub redirect_uri: String,
    /// Requested scope
    pub scope: Option<String>,
    /// Nonce passed through to the ID token
    pub nonce: Option<String>,
    /// Code challenge for PKCE
    pub code_challenge: Option<String>,
    /// Code challenge method for PKCE
    pub code_challenge_method: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Whether this code has been redeemed
    pub used: bool,
    /// When this code was redeemed
    pub used_at: Option<DateTime<Utc>>,
}

impl AuthorizationCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// OAuth Access Token
///
/// Opaque random string with server-side expiry bookkeeping; immutable after
/// creation and read until expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    /// The access token
    pub token: String,
    /// Client ID
    pub client_id: String,
    /// User ID (absent for client credentials)
    pub user_id: Option<String>,
    /// Granted scope
    pub scope: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// OAuth Refresh Token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    /// The refresh token
    pub token: String,
    /// Access token issued alongside this refresh token
    pub access_token: Option<String>,
    /// Client ID
    pub client_id: String,
    /// User ID
    pub user_id: String,
    /// Granted scope
    pub scope: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Whether this token has been revoked
    pub revoked: bool,
    /// When this token was revoked
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Durable per-(user, client) consent record
///
/// At most one live record exists per pair; re-approval replaces the scope
/// set and clears the expiry instead of duplicating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConsent {
    pub user_id: String,
    pub client_id: String,
    /// Granted scope set, space-delimited
    pub scope: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optional expiry; `None` means indefinite
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserConsent {
    /// True iff every requested scope is present in the granted set
    pub fn covers_scopes(&self, requested: &HashSet<String>) -> bool {
        let granted = parse_scope(&self.scope);
        requested.is_subset(&granted)
    }
}

/// Browser session established by the external login system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub session_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// OAuth Authorization Request, as persisted while awaiting the consent
/// decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

/// Query parameters for the authorization endpoint
///
/// All fields optional so presence can be validated in a fixed order.
#[derive(Deserialize, Default)]
#[cfg_attr(any(debug_assertions, test), derive(Debug))]
pub struct AuthorizeQuery {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

/// Form data for the token endpoint
#[derive(Debug, Deserialize, Default)]
pub struct TokenForm {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
}

/// Token Response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,
    /// Token type
    pub token_type: TokenType,
    /// Expires in seconds
    pub expires_in: u64,
    /// Signed ID token (authorization_code grant only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Refresh token (only when the client supports the refresh_token grant)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Granted scope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenResponse {
    pub fn new(access_token: String, expires_in: u64, scope: Option<String>) -> Self {
        Self {
            access_token,
            token_type: TokenType::Bearer,
            expires_in,
            id_token: None,
            refresh_token: None,
            scope,
        }
    }

    pub fn with_id_token(mut self, id_token: String) -> Self {
        self.id_token = Some(id_token);
        self
    }

    pub fn with_refresh_token(mut self, refresh_token: String) -> Self {
        self.refresh_token = Some(refresh_token);
        self
    }
}

/// Standard OpenID Connect scopes
pub const STANDARD_SCOPES: &[&str] = &["openid", "profile", "email"];

/// Generate a secure random token
pub fn generate_token() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.r#gen();
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a session identifier
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Parse a whitespace-delimited scope string into a set
pub fn parse_scope(scope: &str) -> HashSet<String> {
    scope.split_whitespace().map(|s| s.to_string()).collect()
}

/// Join scopes into a space-separated string
pub fn join_scopes(scopes: &HashSet<String>) -> String {
    let mut scopes: Vec<_> = scopes.iter().collect();
    scopes.sort();
    scopes.into_iter().cloned().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_uniqueness() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(!a.contains('='));
        assert!(!a.contains('+'));
        assert!(!a.contains('/'));
    }

    #[test]
    fn test_parse_scope_whitespace_delimited() {
        let scopes = parse_scope("openid  profile\temail");
        assert_eq!(scopes.len(), 3);
        assert!(scopes.contains("openid"));
        assert!(scopes.contains("profile"));
        assert!(scopes.contains("email"));
    }

    #[test]
    fn test_consent_covers_scopes_is_subset_test() {
        let consent = UserConsent {
            user_id: "u1".to_string(),
            client_id: "c1".to_string(),
            scope: "openid profile".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            expires_at: None,
        };

        assert!(consent.covers_scopes(&parse_scope("openid")));
        assert!(consent.covers_scopes(&parse_scope("profile openid")));
        assert!(!consent.covers_scopes(&parse_scope("openid profile email")));
    }

    #[test]
    fn test_token_response_serialization_omits_absent_fields() {
        let response = TokenResponse::new("tok".to_string(), 3600, None);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["token_type"], "Bearer");
        assert_eq!(value["expires_in"], 3600);
        assert!(value.get("refresh_token").is_none());
        assert!(value.get("id_token").is_none());
    }
}
