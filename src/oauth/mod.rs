//! OAuth 2.0 / OpenID Connect authorization server core.

pub mod auth_server;
pub mod client_auth;
pub mod grants;
pub mod issuer;
pub mod openid;
pub mod pkce;
pub mod types;
pub mod validation;

// Re-export frequently used items from each module
pub use crate::storage::{
    inmemory::MemoryOAuthStorage,
    traits::{
        AccessTokenStore, AuthorizationCodeStore, ClientStore, CodeRedemption, ConsentStore,
        OAuthStorage, RefreshTokenStore, SessionStore, UserStore,
    },
};
pub use auth_server::{AuthorizationServer, AuthorizeOutcome};
pub use client_auth::{ClientAuthentication, authenticate_client, extract_client_auth};
pub use grants::{GrantHandler, GrantTypeFactory};
pub use issuer::TokenIssuer;
pub use openid::OpenIDClaims;
pub use types::{
    AccessToken, AuthorizationCode, AuthorizationRequest, AuthorizeQuery, GrantType, OAuthClient,
    RefreshToken, ResponseType, TokenForm, TokenResponse, TokenType, User, UserConsent,
    UserSession, parse_scope,
};
