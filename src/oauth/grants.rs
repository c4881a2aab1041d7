//! Grant-type handlers and the registry that dispatches them.
//!
//! Each grant variant implements [`GrantHandler`]: `validate` runs the
//! grant's precondition ladder, `execute` performs issuance. The factory maps
//! grant-type names to constructors and fails unknown names before any client
//! authentication happens.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::OAuthError;
use crate::oauth::client_auth::{ClientAuthentication, authenticate_client};
use crate::oauth::issuer::TokenIssuer;
use crate::oauth::pkce::verify_pkce;
use crate::oauth::types::{
    AuthorizationCode, GrantType, OAuthClient, TokenForm, TokenResponse, parse_scope,
};
use crate::oauth::validation::validate_authorization_code_params;
use crate::storage::traits::{
    AuthorizationCodeStore, ClientStore, CodeRedemption, OAuthStorage, UserStore,
};

/// Collaborators and request material handed to a grant handler at
/// construction
pub struct GrantContext {
    pub storage: Arc<dyn OAuthStorage>,
    pub issuer: Arc<TokenIssuer>,
    pub form: TokenForm,
    pub client_auth: Option<ClientAuthentication>,
}

/// A token-endpoint grant variant
#[async_trait]
pub trait GrantHandler: Send {
    /// Run the grant's validation ladder; first failure wins
    async fn validate(&mut self) -> Result<(), OAuthError>;

    /// Issue tokens. Must be called after a successful `validate`.
    async fn execute(&mut self) -> Result<TokenResponse, OAuthError>;
}

type GrantConstructor = fn(GrantContext) -> Box<dyn GrantHandler>;

/// Registry mapping grant-type name to handler constructor
pub struct GrantTypeFactory {
    registry: HashMap<&'static str, GrantConstructor>,
}

impl GrantTypeFactory {
    pub fn new() -> Self {
        let mut factory = Self {
            registry: HashMap::new(),
        };
        factory.register("authorization_code", |ctx| {
            Box::new(AuthorizationCodeGrant::new(ctx))
        });
        factory.register("client_credentials", |ctx| {
            Box::new(ClientCredentialsGrant::new(ctx))
        });
        factory
    }

    /// Register a constructor for a grant-type name
    pub fn register(&mut self, name: &'static str, constructor: GrantConstructor) {
        self.registry.insert(name, constructor);
    }

    /// Construct the handler for a grant-type name.
    ///
    /// Unknown names fail here, before client authentication.
    pub fn create(
        &self,
        grant_type: &str,
        ctx: GrantContext,
    ) -> Result<Box<dyn GrantHandler>, OAuthError> {
        match self.registry.get(grant_type) {
            Some(constructor) => Ok(constructor(ctx)),
            None => Err(OAuthError::UnsupportedGrantType(format!(
                "Unsupported grant type: {}",
                grant_type
            ))),
        }
    }
}

impl Default for GrantTypeFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Authorization code grant (RFC 6749 section 4.1)
pub struct AuthorizationCodeGrant {
    ctx: GrantContext,
    client: Option<OAuthClient>,
    auth_code: Option<AuthorizationCode>,
}

impl AuthorizationCodeGrant {
    pub fn new(ctx: GrantContext) -> Self {
        Self {
            ctx,
            client: None,
            auth_code: None,
        }
    }
}

#[async_trait]
impl GrantHandler for AuthorizationCodeGrant {
    async fn validate(&mut self) -> Result<(), OAuthError> {
        let (code, redirect_uri) = validate_authorization_code_params(&self.ctx.form)?;
        let code = code.to_string();
        let redirect_uri = redirect_uri.to_string();

        let clients: &dyn ClientStore = self.ctx.storage.as_ref();
        let client = authenticate_client(clients, self.ctx.client_auth.as_ref()).await?;

        if !client.supports_grant(&GrantType::AuthorizationCode) {
            return Err(OAuthError::UnsupportedGrantType(
                "Client does not support the authorization_code grant type".to_string(),
            ));
        }

        // Checks run against a plain read; the code is only consumed by the
        // atomic redemption in execute, so a failure here leaves it
        // redeemable.
        let auth_code = self
            .ctx
            .storage
            .get_code(&code)
            .await
            .map_err(|e| OAuthError::ServerError(e.to_string()))?
            .ok_or_else(|| OAuthError::InvalidGrant("Invalid authorization code".to_string()))?;

        if auth_code.is_expired(chrono::Utc::now()) {
            return Err(OAuthError::InvalidGrant(
                "Authorization code has expired".to_string(),
            ));
        }

        if auth_code.used {
            return Err(OAuthError::InvalidGrant(
                "Authorization code has already been used".to_string(),
            ));
        }

        if auth_code.client_id != client.client_id {
            return Err(OAuthError::InvalidGrant(
                "Authorization code was issued to another client".to_string(),
            ));
        }

        if auth_code.redirect_uri != redirect_uri {
            return Err(OAuthError::InvalidGrant(
                "Redirect URI does not match".to_string(),
            ));
        }

        if let Some(ref challenge) = auth_code.code_challenge {
            verify_pkce(
                challenge,
                auth_code.code_challenge_method.as_deref(),
                self.ctx.form.code_verifier.as_deref(),
            )?;
        }

        self.client = Some(client);
        self.auth_code = Some(auth_code);
        Ok(())
    }

    async fn execute(&mut self) -> Result<TokenResponse, OAuthError> {
        let client = self
            .client
            .take()
            .ok_or_else(|| OAuthError::ServerError("execute called before validate".to_string()))?;
        let validated = self
            .auth_code
            .take()
            .ok_or_else(|| OAuthError::ServerError("execute called before validate".to_string()))?;

        // Atomic unused-to-used transition; under concurrent redemption of
        // the same code exactly one request reaches the minting below.
        let auth_code = match self
            .ctx
            .storage
            .redeem_code(&validated.code)
            .await
            .map_err(|e| OAuthError::ServerError(e.to_string()))?
        {
            CodeRedemption::Redeemed(code) => code,
            CodeRedemption::NotFound => {
                return Err(OAuthError::InvalidGrant(
                    "Invalid authorization code".to_string(),
                ));
            }
            CodeRedemption::Expired => {
                return Err(OAuthError::InvalidGrant(
                    "Authorization code has expired".to_string(),
                ));
            }
            CodeRedemption::AlreadyUsed => {
                return Err(OAuthError::InvalidGrant(
                    "Authorization code has already been used".to_string(),
                ));
            }
        };

        let user = self
            .ctx
            .storage
            .get_user(&auth_code.user_id)
            .await
            .map_err(|e| OAuthError::ServerError(e.to_string()))?
            .ok_or_else(|| OAuthError::InvalidGrant("Invalid authorization code".to_string()))?;

        let access_token = self
            .ctx
            .issuer
            .issue_access_token(
                Some(user.user_id.clone()),
                &client.client_id,
                auth_code.scope.clone(),
            )
            .await?;

        let scopes = parse_scope(auth_code.scope.as_deref().unwrap_or_default());
        let id_token = self.ctx.issuer.issue_id_token(
            &user,
            &client.client_id,
            &scopes,
            auth_code.nonce.clone(),
        )?;

        let refresh_token = self
            .ctx
            .issuer
            .issue_refresh_token(
                &client,
                &user.user_id,
                &access_token.token,
                auth_code.scope.clone(),
            )
            .await?;

        let mut response = TokenResponse::new(
            access_token.token,
            self.ctx.issuer.access_token_lifetime_secs(),
            auth_code.scope,
        )
        .with_id_token(id_token);

        if let Some(refresh_token) = refresh_token {
            response = response.with_refresh_token(refresh_token.token);
        }

        tracing::info!(
            client_id = %client.client_id,
            user_id = %user.user_id,
            "issued tokens for authorization_code grant"
        );

        Ok(response)
    }
}

/// Client credentials grant (RFC 6749 section 4.4)
pub struct ClientCredentialsGrant {
    ctx: GrantContext,
    client: Option<OAuthClient>,
}

impl ClientCredentialsGrant {
    pub fn new(ctx: GrantContext) -> Self {
        Self { ctx, client: None }
    }
}

#[async_trait]
impl GrantHandler for ClientCredentialsGrant {
    async fn validate(&mut self) -> Result<(), OAuthError> {
        let clients: &dyn ClientStore = self.ctx.storage.as_ref();
        let client = authenticate_client(clients, self.ctx.client_auth.as_ref()).await?;

        if !client.supports_grant(&GrantType::ClientCredentials) {
            return Err(OAuthError::UnsupportedGrantType(
                "Client does not support the client_credentials grant type".to_string(),
            ));
        }

        self.client = Some(client);
        Ok(())
    }

    async fn execute(&mut self) -> Result<TokenResponse, OAuthError> {
        let client = self
            .client
            .take()
            .ok_or_else(|| OAuthError::ServerError("execute called before validate".to_string()))?;

        let granted_scope = match (&self.ctx.form.scope, &client.scope) {
            (Some(requested), Some(allowed)) => {
                if !parse_scope(requested).is_subset(&parse_scope(allowed)) {
                    return Err(OAuthError::InvalidScope(
                        "Requested scope exceeds allowed scope".to_string(),
                    ));
                }
                Some(requested.clone())
            }
            (Some(requested), None) => Some(requested.clone()),
            (None, allowed) => allowed.clone(),
        };

        // User-less token; no ID token, no refresh token
        let access_token = self
            .ctx
            .issuer
            .issue_access_token(None, &client.client_id, granted_scope.clone())
            .await?;

        tracing::info!(client_id = %client.client_id, "issued token for client_credentials grant");

        Ok(TokenResponse::new(
            access_token.token,
            self.ctx.issuer.access_token_lifetime_secs(),
            granted_scope,
        ))
    }
}
