//! OpenID Connect claim projection and ID token generation.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::OAuthError;
use crate::oauth::types::User;

/// Unified OpenID Connect claims structure for both ID tokens and UserInfo
/// responses
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenIDClaims {
    /// Issuer - The URL of the authorization server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject - stable identifier of the end user
    pub sub: String,

    /// Audience - Client ID that this token is intended for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Expiration time - Unix timestamp when token expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued at - Unix timestamp when token was issued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Nonce - opaque value binding the token to the authorization request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

impl OpenIDClaims {
    /// Create new claims for an ID token
    pub fn new_id_token(
        issuer: String,
        subject: String,
        audience: String,
        lifetime: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            iss: Some(issuer),
            sub: subject,
            aud: Some(audience),
            exp: Some((now + lifetime).timestamp()),
            iat: Some(now.timestamp()),
            ..Default::default()
        }
    }

    /// Create new claims for a UserInfo response
    pub fn new_userinfo(subject: String) -> Self {
        Self {
            sub: subject,
            ..Default::default()
        }
    }

    /// Set the nonce value (for ID tokens)
    pub fn with_nonce(mut self, nonce: Option<String>) -> Self {
        self.nonce = nonce;
        self
    }

    /// Project user fields into the claim set, gated by scope.
    ///
    /// `profile` adds `name`/`given_name`/`family_name`/`picture` when
    /// non-empty on the user; `email` adds `email`/`email_verified`. Without
    /// either scope only `sub` (and any token-level claims already present)
    /// is carried.
    pub fn with_user_claims(mut self, user: &User, scopes: &HashSet<String>) -> Self {
        if scopes.contains("profile") {
            self.name = non_empty(user.name.as_deref());
            self.given_name = non_empty(user.given_name.as_deref());
            self.family_name = non_empty(user.family_name.as_deref());
            self.picture = non_empty(user.picture.as_deref());
        }

        if scopes.contains("email") {
            if let Some(email) = non_empty(user.email.as_deref()) {
                self.email = Some(email);
                self.email_verified = Some(user.email_verified);
            }
        }

        self
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(|v| v.to_string())
}

/// Sign claims into a compact ID token.
///
/// Signing is symmetric (HS256) with a server-held secret configured out of
/// band. Discovery advertises RS256 and `/jwks` answers an empty key set; an
/// asymmetric deployment would swap this one function and publish its public
/// keys there.
pub fn mint_id_token(claims: &OpenIDClaims, secret: &str) -> Result<String, OAuthError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| OAuthError::ServerError(format!("Failed to sign ID token: {}", e)))
}

/// Decode and verify a compact ID token signed with [`mint_id_token`]
pub fn decode_id_token(token: &str, secret: &str) -> Result<OpenIDClaims, OAuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;
    jsonwebtoken::decode::<OpenIDClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| OAuthError::InvalidToken(format!("Invalid ID token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::types::parse_scope;

    fn test_user() -> User {
        User {
            user_id: "u1".to_string(),
            name: Some("Ada Lovelace".to_string()),
            given_name: Some("Ada".to_string()),
            family_name: Some("Lovelace".to_string()),
            picture: Some("https://example.com/ada.png".to_string()),
            email: Some("ada@example.com".to_string()),
            email_verified: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_openid_scope_alone_projects_only_sub() {
        let claims = OpenIDClaims::new_userinfo("u1".to_string())
            .with_user_claims(&test_user(), &parse_scope("openid"));

        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["sub"], "u1");
        assert!(value.get("name").is_none());
        assert!(value.get("email").is_none());
        assert!(value.get("email_verified").is_none());
    }

    #[test]
    fn test_profile_scope_skips_empty_fields() {
        let mut user = test_user();
        user.picture = None;
        user.family_name = Some("".to_string());

        let claims = OpenIDClaims::new_userinfo("u1".to_string())
            .with_user_claims(&user, &parse_scope("openid profile"));

        assert_eq!(claims.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(claims.given_name.as_deref(), Some("Ada"));
        assert!(claims.family_name.is_none());
        assert!(claims.picture.is_none());
        assert!(claims.email.is_none());
    }

    #[test]
    fn test_email_scope_projects_email_claims() {
        let claims = OpenIDClaims::new_userinfo("u1".to_string())
            .with_user_claims(&test_user(), &parse_scope("openid email"));

        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
        assert_eq!(claims.email_verified, Some(true));
        assert!(claims.name.is_none());
    }

    #[test]
    fn test_id_token_round_trip() {
        let now = Utc::now();
        let claims = OpenIDClaims::new_id_token(
            "https://idp.example.com".to_string(),
            "u1".to_string(),
            "c1".to_string(),
            chrono::Duration::hours(1),
            now,
        )
        .with_nonce(Some("n-0S6_WzA2Mj".to_string()));

        let token = mint_id_token(&claims, "signing-secret").unwrap();
        assert_eq!(token.split('.').count(), 3);

        let decoded = decode_id_token(&token, "signing-secret").unwrap();
        assert_eq!(decoded.iss.as_deref(), Some("https://idp.example.com"));
        assert_eq!(decoded.sub, "u1");
        assert_eq!(decoded.aud.as_deref(), Some("c1"));
        assert_eq!(decoded.nonce.as_deref(), Some("n-0S6_WzA2Mj"));
        assert_eq!(decoded.exp, Some((now + chrono::Duration::hours(1)).timestamp()));

        assert!(decode_id_token(&token, "wrong-secret").is_err());
    }
}
