//! Storage trait definitions for OAuth protocol data.
//!
//! Defines async storage interfaces for clients, users, codes, tokens,
//! consents, and browser sessions that can be implemented by various backend
//! providers. The engine is stateless across requests; these seams are the
//! only shared state.

use crate::errors::StorageError;
use crate::oauth::types::*;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Trait for looking up and storing OAuth clients
///
/// Client administration is an external collaborator; the engine only needs
/// lookup plus registration for seeding.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Store a client registration
    async fn store_client(&self, client: &OAuthClient) -> Result<()>;

    /// Retrieve a client by ID
    async fn get_client(&self, client_id: &str) -> Result<Option<OAuthClient>>;
}

/// Trait for looking up end users
#[async_trait]
pub trait UserStore {
    /// Store a user record
    async fn store_user(&self, user: &User) -> Result<()>;

    /// Retrieve a user by subject identifier
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;
}

/// Outcome of an authorization-code redemption attempt
#[derive(Debug, Clone)]
pub enum CodeRedemption {
    /// The unused-to-used transition succeeded; the record is returned as it
    /// was at redemption time.
    Redeemed(AuthorizationCode),
    /// No code with that value exists
    NotFound,
    /// The code exists but its TTL has elapsed
    Expired,
    /// The code was already redeemed
    AlreadyUsed,
}

/// Trait for storing and redeeming one-time authorization codes
#[async_trait]
pub trait AuthorizationCodeStore {
    /// Store a new authorization code
    async fn store_code(&self, code: &AuthorizationCode) -> Result<()>;

    /// Read an authorization code without side effects
    async fn get_code(&self, code: &str) -> Result<Option<AuthorizationCode>>;

    /// Atomically redeem an authorization code.
    ///
    /// The not-expired/not-used check and the used-flag transition must be a
    /// single atomicity boundary keyed on the code value (conditional update
    /// affecting exactly one row, or an equivalent serialized critical
    /// section). Two concurrent redemptions of the same code must yield
    /// exactly one `Redeemed`.
    async fn redeem_code(&self, code: &str) -> Result<CodeRedemption>;

    /// Clean up expired codes
    async fn cleanup_expired_codes(&self) -> Result<usize>;
}

/// Trait for storing and retrieving access tokens
#[async_trait]
pub trait AccessTokenStore {
    /// Store a new access token
    async fn store_token(&self, token: &AccessToken) -> Result<()>;

    /// Retrieve an access token.
    ///
    /// Expired tokens are still returned; expiry is evaluated lazily by the
    /// caller so it can distinguish unknown from expired.
    async fn get_token(&self, token: &str) -> Result<Option<AccessToken>>;

    /// Clean up expired tokens
    async fn cleanup_expired_tokens(&self) -> Result<usize>;
}

/// Trait for storing and retrieving refresh tokens
#[async_trait]
pub trait RefreshTokenStore {
    /// Store a new refresh token
    async fn store_refresh_token(&self, token: &RefreshToken) -> Result<()>;

    /// Retrieve a refresh token
    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>>;

    /// Set the revoked flag and timestamp on a refresh token
    async fn revoke_refresh_token(&self, token: &str) -> Result<()>;

    /// Clean up expired refresh tokens
    async fn cleanup_expired_refresh_tokens(&self) -> Result<usize>;
}

/// Trait for durable per-(user, client) consent records
#[async_trait]
pub trait ConsentStore {
    /// Record consent for a (user, client) pair.
    ///
    /// Find-or-create keyed on the pair: the granted scope set is replaced
    /// (not unioned) and any expiry is cleared, so at most one live record
    /// exists per pair.
    async fn record_consent(&self, user_id: &str, client_id: &str, scope: &str) -> Result<UserConsent>;

    /// Retrieve the consent record for a (user, client) pair
    async fn get_consent(&self, user_id: &str, client_id: &str) -> Result<Option<UserConsent>>;
}

/// Trait for browser sessions established by the external login system
#[async_trait]
pub trait SessionStore {
    /// Store a session
    async fn store_session(&self, session: &UserSession) -> Result<()>;

    /// Retrieve a session by ID
    async fn get_session(&self, session_id: &str) -> Result<Option<UserSession>>;

    /// Remove a session
    async fn remove_session(&self, session_id: &str) -> Result<()>;
}

/// Trait for authorization parameters pending a consent decision
#[async_trait]
pub trait PendingAuthorizationStore {
    /// Store pending authorization parameters by session ID
    async fn store_pending_authorization(
        &self,
        session_id: &str,
        request: &AuthorizationRequest,
    ) -> Result<()>;

    /// Get pending authorization parameters by session ID
    async fn get_pending_authorization(
        &self,
        session_id: &str,
    ) -> Result<Option<AuthorizationRequest>>;

    /// Remove pending authorization parameters by session ID
    async fn remove_pending_authorization(&self, session_id: &str) -> Result<()>;
}

/// Combined OAuth storage trait
pub trait OAuthStorage:
    ClientStore
    + UserStore
    + AuthorizationCodeStore
    + AccessTokenStore
    + RefreshTokenStore
    + ConsentStore
    + SessionStore
    + PendingAuthorizationStore
    + Send
    + Sync
{
}
