//! In-memory OAuth storage implementation
//!
//! Single-process backend for development and tests. The authorization-code
//! redemption contract is met by performing the check-and-set inside one
//! mutex critical section; multi-instance deployments need a backend whose
//! redemption is a conditional update in the shared store.

use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::traits::*;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

pub type Result<T> = std::result::Result<T, StorageError>;

/// In-memory implementation for OAuth storage
#[derive(Default)]
pub struct MemoryOAuthStorage {
    clients: Mutex<HashMap<String, OAuthClient>>,
    users: Mutex<HashMap<String, User>>,
    auth_codes: Mutex<HashMap<String, AuthorizationCode>>,
    access_tokens: Mutex<HashMap<String, AccessToken>>,
    refresh_tokens: Mutex<HashMap<String, RefreshToken>>,
    consents: Mutex<HashMap<String, UserConsent>>, // "user_id:client_id" -> consent
    sessions: Mutex<HashMap<String, UserSession>>,
    pending_authorizations: Mutex<HashMap<String, AuthorizationRequest>>, // session_id -> request
}

impl MemoryOAuthStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a unique consent key from user ID and client ID
    fn consent_key(user_id: &str, client_id: &str) -> String {
        format!("{}:{}", user_id, client_id)
    }
}

fn lock_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::QueryFailed(format!("Lock error: {}", e))
}

#[async_trait]
impl ClientStore for MemoryOAuthStorage {
    async fn store_client(&self, client: &OAuthClient) -> Result<()> {
        let mut clients = self.clients.lock().map_err(lock_err)?;
        clients.insert(client.client_id.clone(), client.clone());
        Ok(())
    }

    async fn get_client(&self, client_id: &str) -> Result<Option<OAuthClient>> {
        let clients = self.clients.lock().map_err(lock_err)?;
        Ok(clients.get(client_id).cloned())
    }
}

#[async_trait]
impl UserStore for MemoryOAuthStorage {
    async fn store_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.lock().map_err(lock_err)?;
        users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let users = self.users.lock().map_err(lock_err)?;
        Ok(users.get(user_id).cloned())
    }
}

#[async_trait]
impl AuthorizationCodeStore for MemoryOAuthStorage {
    async fn store_code(&self, code: &AuthorizationCode) -> Result<()> {
        let mut codes = self.auth_codes.lock().map_err(lock_err)?;
        codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn get_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        let codes = self.auth_codes.lock().map_err(lock_err)?;
        Ok(codes.get(code).cloned())
    }

    async fn redeem_code(&self, code: &str) -> Result<CodeRedemption> {
        // The whole check-and-set runs under one lock so concurrent
        // redemptions of the same code serialize and exactly one succeeds.
        let mut codes = self.auth_codes.lock().map_err(lock_err)?;

        let Some(auth_code) = codes.get_mut(code) else {
            return Ok(CodeRedemption::NotFound);
        };

        if auth_code.is_expired(Utc::now()) {
            return Ok(CodeRedemption::Expired);
        }

        if auth_code.used {
            return Ok(CodeRedemption::AlreadyUsed);
        }

        auth_code.used = true;
        auth_code.used_at = Some(Utc::now());

        Ok(CodeRedemption::Redeemed(auth_code.clone()))
    }

    async fn cleanup_expired_codes(&self) -> Result<usize> {
        let mut codes = self.auth_codes.lock().map_err(lock_err)?;

        let now = Utc::now();
        let initial_count = codes.len();
        codes.retain(|_, code| code.expires_at > now);

        Ok(initial_count - codes.len())
    }
}

#[async_trait]
impl AccessTokenStore for MemoryOAuthStorage {
    async fn store_token(&self, token: &AccessToken) -> Result<()> {
        let mut tokens = self.access_tokens.lock().map_err(lock_err)?;
        tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn get_token(&self, token: &str) -> Result<Option<AccessToken>> {
        let tokens = self.access_tokens.lock().map_err(lock_err)?;
        Ok(tokens.get(token).cloned())
    }

    async fn cleanup_expired_tokens(&self) -> Result<usize> {
        let mut tokens = self.access_tokens.lock().map_err(lock_err)?;

        let now = Utc::now();
        let initial_count = tokens.len();
        tokens.retain(|_, token| token.expires_at > now);

        Ok(initial_count - tokens.len())
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryOAuthStorage {
    async fn store_refresh_token(&self, token: &RefreshToken) -> Result<()> {
        let mut tokens = self.refresh_tokens.lock().map_err(lock_err)?;
        tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let tokens = self.refresh_tokens.lock().map_err(lock_err)?;
        Ok(tokens.get(token).cloned())
    }

    async fn revoke_refresh_token(&self, token: &str) -> Result<()> {
        let mut tokens = self.refresh_tokens.lock().map_err(lock_err)?;
        match tokens.get_mut(token) {
            Some(refresh_token) => {
                refresh_token.revoked = true;
                refresh_token.revoked_at = Some(Utc::now());
                Ok(())
            }
            None => Err(StorageError::NotFound("Refresh token not found".to_string())),
        }
    }

    async fn cleanup_expired_refresh_tokens(&self) -> Result<usize> {
        let mut tokens = self.refresh_tokens.lock().map_err(lock_err)?;

        let now = Utc::now();
        let initial_count = tokens.len();
        tokens.retain(|_, token| token.expires_at > now);

        Ok(initial_count - tokens.len())
    }
}

#[async_trait]
impl ConsentStore for MemoryOAuthStorage {
    async fn record_consent(
        &self,
        user_id: &str,
        client_id: &str,
        scope: &str,
    ) -> Result<UserConsent> {
        let mut consents = self.consents.lock().map_err(lock_err)?;
        let key = Self::consent_key(user_id, client_id);
        let now = Utc::now();

        let consent = match consents.get(&key) {
            Some(existing) => UserConsent {
                scope: scope.to_string(),
                updated_at: now,
                expires_at: None,
                ..existing.clone()
            },
            None => UserConsent {
                user_id: user_id.to_string(),
                client_id: client_id.to_string(),
                scope: scope.to_string(),
                created_at: now,
                updated_at: now,
                expires_at: None,
            },
        };

        consents.insert(key, consent.clone());
        Ok(consent)
    }

    async fn get_consent(&self, user_id: &str, client_id: &str) -> Result<Option<UserConsent>> {
        let consents = self.consents.lock().map_err(lock_err)?;
        let key = Self::consent_key(user_id, client_id);
        Ok(consents.get(&key).cloned())
    }
}

#[async_trait]
impl SessionStore for MemoryOAuthStorage {
    async fn store_session(&self, session: &UserSession) -> Result<()> {
        let mut sessions = self.sessions.lock().map_err(lock_err)?;
        sessions.insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<UserSession>> {
        let sessions = self.sessions.lock().map_err(lock_err)?;
        Ok(sessions.get(session_id).cloned())
    }

    async fn remove_session(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().map_err(lock_err)?;
        sessions.remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl PendingAuthorizationStore for MemoryOAuthStorage {
    async fn store_pending_authorization(
        &self,
        session_id: &str,
        request: &AuthorizationRequest,
    ) -> Result<()> {
        let mut pending = self.pending_authorizations.lock().map_err(lock_err)?;
        pending.insert(session_id.to_string(), request.clone());
        Ok(())
    }

    async fn get_pending_authorization(
        &self,
        session_id: &str,
    ) -> Result<Option<AuthorizationRequest>> {
        let pending = self.pending_authorizations.lock().map_err(lock_err)?;
        Ok(pending.get(session_id).cloned())
    }

    async fn remove_pending_authorization(&self, session_id: &str) -> Result<()> {
        let mut pending = self.pending_authorizations.lock().map_err(lock_err)?;
        pending.remove(session_id);
        Ok(())
    }
}

impl OAuthStorage for MemoryOAuthStorage {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn test_code(code: &str, expires_in: Duration) -> AuthorizationCode {
        AuthorizationCode {
            code: code.to_string(),
            client_id: "c1".to_string(),
            user_id: "u1".to_string(),
            redirect_uri: "https://a/cb".to_string(),
            scope: Some("openid".to_string()),
            nonce: None,
            code_challenge: None,
            code_challenge_method: None,
            created_at: Utc::now(),
            expires_at: Utc::now() + expires_in,
            used: false,
            used_at: None,
        }
    }

    #[tokio::test]
    async fn test_authorization_code_single_use() {
        let storage = MemoryOAuthStorage::new();
        storage
            .store_code(&test_code("code-1", Duration::minutes(10)))
            .await
            .unwrap();

        let first = storage.redeem_code("code-1").await.unwrap();
        let redeemed = match first {
            CodeRedemption::Redeemed(code) => code,
            other => panic!("expected Redeemed, got {:?}", other),
        };
        assert!(redeemed.used);
        assert!(redeemed.used_at.is_some());

        let second = storage.redeem_code("code-1").await.unwrap();
        assert!(matches!(second, CodeRedemption::AlreadyUsed));
    }

    #[tokio::test]
    async fn test_redeem_unknown_and_expired_codes() {
        let storage = MemoryOAuthStorage::new();

        let missing = storage.redeem_code("nope").await.unwrap();
        assert!(matches!(missing, CodeRedemption::NotFound));

        storage
            .store_code(&test_code("stale", Duration::minutes(-1)))
            .await
            .unwrap();
        let expired = storage.redeem_code("stale").await.unwrap();
        assert!(matches!(expired, CodeRedemption::Expired));

        // An expired code stays expired; it never becomes redeemable again
        let expired = storage.redeem_code("stale").await.unwrap();
        assert!(matches!(expired, CodeRedemption::Expired));
    }

    #[tokio::test]
    async fn test_concurrent_redemption_yields_one_success() {
        let storage = Arc::new(MemoryOAuthStorage::new());
        storage
            .store_code(&test_code("contested", Duration::minutes(10)))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                storage.redeem_code("contested").await.unwrap()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), CodeRedemption::Redeemed(_)) {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_access_token_returned_even_when_expired() {
        let storage = MemoryOAuthStorage::new();

        let token = AccessToken {
            token: "t1".to_string(),
            client_id: "c1".to_string(),
            user_id: Some("u1".to_string()),
            scope: Some("openid".to_string()),
            created_at: Utc::now(),
            expires_at: Utc::now() - Duration::minutes(1),
        };
        storage.store_token(&token).await.unwrap();

        // Expiry is the caller's responsibility; the store just reads
        let stored = storage.get_token("t1").await.unwrap().unwrap();
        assert!(stored.is_expired(Utc::now()));

        assert_eq!(storage.cleanup_expired_tokens().await.unwrap(), 1);
        assert!(storage.get_token("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_sweeps_only_expired_records() {
        let storage = MemoryOAuthStorage::new();

        storage
            .store_code(&test_code("live", Duration::minutes(10)))
            .await
            .unwrap();
        storage
            .store_code(&test_code("dead", Duration::minutes(-10)))
            .await
            .unwrap();
        assert_eq!(storage.cleanup_expired_codes().await.unwrap(), 1);
        assert!(storage.get_code("live").await.unwrap().is_some());
        assert!(storage.get_code("dead").await.unwrap().is_none());

        let refresh = RefreshToken {
            token: "dead-refresh".to_string(),
            access_token: None,
            client_id: "c1".to_string(),
            user_id: "u1".to_string(),
            scope: None,
            created_at: Utc::now(),
            expires_at: Utc::now() - Duration::days(1),
            revoked: false,
            revoked_at: None,
        };
        storage.store_refresh_token(&refresh).await.unwrap();
        assert_eq!(storage.cleanup_expired_refresh_tokens().await.unwrap(), 1);
        assert!(storage.get_refresh_token("dead-refresh").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_consent_upsert_replaces_scope_and_clears_expiry() {
        let storage = MemoryOAuthStorage::new();

        let first = storage.record_consent("u1", "c1", "openid").await.unwrap();
        assert_eq!(first.scope, "openid");

        let second = storage
            .record_consent("u1", "c1", "openid profile")
            .await
            .unwrap();
        assert_eq!(second.scope, "openid profile");
        assert_eq!(second.created_at, first.created_at);
        assert!(second.expires_at.is_none());

        // Exactly one record per pair: the read reflects the latest call
        let stored = storage.get_consent("u1", "c1").await.unwrap().unwrap();
        assert_eq!(stored.scope, "openid profile");

        assert!(storage.get_consent("u1", "c2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_revocation() {
        let storage = MemoryOAuthStorage::new();

        let token = RefreshToken {
            token: "r1".to_string(),
            access_token: Some("t1".to_string()),
            client_id: "c1".to_string(),
            user_id: "u1".to_string(),
            scope: Some("openid".to_string()),
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::days(30),
            revoked: false,
            revoked_at: None,
        };
        storage.store_refresh_token(&token).await.unwrap();

        storage.revoke_refresh_token("r1").await.unwrap();
        let stored = storage.get_refresh_token("r1").await.unwrap().unwrap();
        assert!(stored.revoked);
        assert!(stored.revoked_at.is_some());

        assert!(storage.revoke_refresh_token("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_session_and_pending_authorization_lifecycle() {
        let storage = MemoryOAuthStorage::new();

        let session = UserSession {
            session_id: "s1".to_string(),
            user_id: "u1".to_string(),
            created_at: Utc::now(),
        };
        storage.store_session(&session).await.unwrap();
        assert!(storage.get_session("s1").await.unwrap().is_some());

        let request = AuthorizationRequest {
            client_id: "c1".to_string(),
            redirect_uri: "https://a/cb".to_string(),
            scope: "openid".to_string(),
            state: Some("xyz".to_string()),
            nonce: None,
            code_challenge: None,
            code_challenge_method: None,
        };
        storage
            .store_pending_authorization("s1", &request)
            .await
            .unwrap();
        let pending = storage.get_pending_authorization("s1").await.unwrap().unwrap();
        assert_eq!(pending.client_id, "c1");

        storage.remove_pending_authorization("s1").await.unwrap();
        assert!(storage.get_pending_authorization("s1").await.unwrap().is_none());

        storage.remove_session("s1").await.unwrap();
        assert!(storage.get_session("s1").await.unwrap().is_none());
    }
}
