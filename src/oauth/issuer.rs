//! Token minting: opaque access/refresh tokens and signed ID tokens.

use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::OAuthError;
use crate::oauth::openid::{OpenIDClaims, mint_id_token};
use crate::oauth::types::{
    AccessToken, GrantType, OAuthClient, RefreshToken, User, generate_token,
};
use crate::storage::traits::{AccessTokenStore, OAuthStorage, RefreshTokenStore};

/// Mints and persists tokens.
///
/// Access and refresh tokens are opaque unique random strings with
/// server-side expiry bookkeeping; the ID token is a signed claim set that is
/// never persisted. All derived fields are computed here before anything is
/// stored.
pub struct TokenIssuer {
    storage: Arc<dyn OAuthStorage>,
    /// Issuer URL baked into ID tokens
    issuer: String,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
    id_token_ttl: Duration,
    signing_secret: String,
}

impl TokenIssuer {
    pub fn new(
        storage: Arc<dyn OAuthStorage>,
        issuer: String,
        access_token_ttl: Duration,
        refresh_token_ttl: Duration,
        id_token_ttl: Duration,
        signing_secret: String,
    ) -> Self {
        Self {
            storage,
            issuer,
            access_token_ttl,
            refresh_token_ttl,
            id_token_ttl,
            signing_secret,
        }
    }

    /// Access token lifetime in seconds, for `expires_in`
    pub fn access_token_lifetime_secs(&self) -> u64 {
        self.access_token_ttl.num_seconds().max(0) as u64
    }

    /// Mint and persist an access token.
    ///
    /// `user_id` is absent for the client_credentials grant.
    pub async fn issue_access_token(
        &self,
        user_id: Option<String>,
        client_id: &str,
        scope: Option<String>,
    ) -> Result<AccessToken, OAuthError> {
        let now = Utc::now();
        let access_token = AccessToken {
            token: generate_token(),
            client_id: client_id.to_string(),
            user_id,
            scope,
            created_at: now,
            expires_at: now + self.access_token_ttl,
        };

        self.storage
            .store_token(&access_token)
            .await
            .map_err(|e| OAuthError::ServerError(format!("Failed to store access token: {}", e)))?;

        Ok(access_token)
    }

    /// Mint and persist a refresh token, but only when the client supports
    /// the refresh_token grant. Returns `None` otherwise.
    pub async fn issue_refresh_token(
        &self,
        client: &OAuthClient,
        user_id: &str,
        access_token: &str,
        scope: Option<String>,
    ) -> Result<Option<RefreshToken>, OAuthError> {
        if !client.supports_grant(&GrantType::RefreshToken) {
            return Ok(None);
        }

        let now = Utc::now();
        let refresh_token = RefreshToken {
            token: generate_token(),
            access_token: Some(access_token.to_string()),
            client_id: client.client_id.clone(),
            user_id: user_id.to_string(),
            scope,
            created_at: now,
            expires_at: now + self.refresh_token_ttl,
            revoked: false,
            revoked_at: None,
        };

        self.storage
            .store_refresh_token(&refresh_token)
            .await
            .map_err(|e| {
                OAuthError::ServerError(format!("Failed to store refresh token: {}", e))
            })?;

        Ok(Some(refresh_token))
    }

    /// Build and sign an ID token for the user/client pair.
    ///
    /// Claim projection is scope-gated; the nonce is the opaque passthrough
    /// from the original authorization request.
    pub fn issue_id_token(
        &self,
        user: &User,
        client_id: &str,
        scopes: &HashSet<String>,
        nonce: Option<String>,
    ) -> Result<String, OAuthError> {
        let claims = OpenIDClaims::new_id_token(
            self.issuer.clone(),
            user.user_id.clone(),
            client_id.to_string(),
            self.id_token_ttl,
            Utc::now(),
        )
        .with_nonce(nonce)
        .with_user_claims(user, scopes);

        mint_id_token(&claims, &self.signing_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::openid::decode_id_token;
    use crate::oauth::types::{ResponseType, parse_scope};
    use crate::storage::MemoryOAuthStorage;

    fn test_issuer(storage: Arc<MemoryOAuthStorage>) -> TokenIssuer {
        TokenIssuer::new(
            storage,
            "https://idp.example.com".to_string(),
            Duration::hours(1),
            Duration::days(30),
            Duration::hours(1),
            "signing-secret".to_string(),
        )
    }

    fn test_client(grant_types: Vec<GrantType>) -> OAuthClient {
        OAuthClient {
            client_id: "c1".to_string(),
            client_secret: Some("secret".to_string()),
            client_name: None,
            redirect_uris: vec!["https://a/cb".to_string()],
            grant_types,
            response_types: vec![ResponseType::Code],
            scope: Some("openid profile email".to_string()),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_user() -> User {
        User {
            user_id: "u1".to_string(),
            name: Some("Ada Lovelace".to_string()),
            given_name: None,
            family_name: None,
            picture: None,
            email: Some("ada@example.com".to_string()),
            email_verified: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_access_token_is_persisted_with_expiry() {
        let storage = Arc::new(MemoryOAuthStorage::new());
        let issuer = test_issuer(storage.clone());

        let token = issuer
            .issue_access_token(Some("u1".to_string()), "c1", Some("openid".to_string()))
            .await
            .unwrap();

        assert!(!token.token.is_empty());
        assert_eq!(issuer.access_token_lifetime_secs(), 3600);

        let stored = storage.get_token(&token.token).await.unwrap().unwrap();
        assert_eq!(stored.user_id.as_deref(), Some("u1"));
        assert_eq!(stored.client_id, "c1");
        assert!(!stored.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn test_refresh_token_gated_on_client_grant_set() {
        let storage = Arc::new(MemoryOAuthStorage::new());
        let issuer = test_issuer(storage.clone());
        let user = test_user();

        let without = test_client(vec![GrantType::AuthorizationCode]);
        let refresh = issuer
            .issue_refresh_token(&without, &user.user_id, "at-1", None)
            .await
            .unwrap();
        assert!(refresh.is_none());

        let with = test_client(vec![GrantType::AuthorizationCode, GrantType::RefreshToken]);
        let refresh = issuer
            .issue_refresh_token(&with, &user.user_id, "at-1", Some("openid".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refresh.access_token.as_deref(), Some("at-1"));
        assert!(!refresh.revoked);

        let stored = storage
            .get_refresh_token(&refresh.token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_id, "u1");
    }

    #[tokio::test]
    async fn test_id_token_carries_scoped_claims_and_nonce() {
        let storage = Arc::new(MemoryOAuthStorage::new());
        let issuer = test_issuer(storage);
        let user = test_user();

        let token = issuer
            .issue_id_token(
                &user,
                "c1",
                &parse_scope("openid email"),
                Some("nonce-1".to_string()),
            )
            .unwrap();

        let claims = decode_id_token(&token, "signing-secret").unwrap();
        assert_eq!(claims.iss.as_deref(), Some("https://idp.example.com"));
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.aud.as_deref(), Some("c1"));
        assert_eq!(claims.nonce.as_deref(), Some("nonce-1"));
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
        // profile scope was not granted
        assert!(claims.name.is_none());
    }
}
