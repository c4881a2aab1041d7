//! Client credential extraction and verification.

use axum::http::HeaderMap;
use base64::prelude::*;
use subtle::ConstantTimeEq;

use crate::errors::OAuthError;
use crate::oauth::types::{OAuthClient, TokenForm};
use crate::storage::traits::ClientStore;

/// Client authentication material extracted from a token request
#[derive(Debug, Clone)]
pub struct ClientAuthentication {
    pub client_id: String,
    pub client_secret: Option<String>,
}

/// Extract client credentials from an HTTP Basic `Authorization` header if
/// present, otherwise from the `client_id`/`client_secret` body parameters.
///
/// The Basic payload is base64 `id:secret`, split on the first colon.
pub fn extract_client_auth(headers: &HeaderMap, form: &TokenForm) -> Option<ClientAuthentication> {
    if let Some(auth_header) = headers.get("authorization").and_then(|h| h.to_str().ok()) {
        if let Some(encoded) = auth_header.strip_prefix("Basic ") {
            if let Ok(decoded) = BASE64_STANDARD.decode(encoded) {
                if let Ok(credentials) = String::from_utf8(decoded) {
                    let (client_id, client_secret) = match credentials.split_once(':') {
                        Some((id, secret)) => (id.to_string(), Some(secret.to_string())),
                        None => (credentials, None),
                    };
                    return Some(ClientAuthentication {
                        client_id,
                        client_secret,
                    });
                }
            }
        }
    }

    form.client_id.as_ref().map(|client_id| ClientAuthentication {
        client_id: client_id.clone(),
        client_secret: form.client_secret.clone(),
    })
}

/// Authenticate a client against the registry.
///
/// Looks the client up by id and verifies the presented secret with a
/// constant-time comparison. All failures map to `invalid_client`.
pub async fn authenticate_client(
    clients: &dyn ClientStore,
    auth: Option<&ClientAuthentication>,
) -> Result<OAuthClient, OAuthError> {
    let auth = auth
        .ok_or_else(|| OAuthError::InvalidClient("Missing client credentials".to_string()))?;

    let client = clients
        .get_client(&auth.client_id)
        .await
        .map_err(|e| OAuthError::ServerError(e.to_string()))?
        .ok_or_else(|| OAuthError::InvalidClient("Invalid client_id".to_string()))?;

    if !client.active {
        return Err(OAuthError::InvalidClient(
            "Client is not active".to_string(),
        ));
    }

    let expected = client
        .client_secret
        .as_deref()
        .ok_or_else(|| OAuthError::InvalidClient("Invalid client secret".to_string()))?;
    let presented = auth
        .client_secret
        .as_deref()
        .ok_or_else(|| OAuthError::InvalidClient("Invalid client secret".to_string()))?;

    if presented.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() != 1 {
        return Err(OAuthError::InvalidClient(
            "Invalid client secret".to_string(),
        ));
    }

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::types::{GrantType, ResponseType};
    use crate::storage::inmemory::MemoryOAuthStorage;
    use axum::http::HeaderValue;
    use chrono::Utc;

    fn test_client(client_id: &str, secret: &str) -> OAuthClient {
        OAuthClient {
            client_id: client_id.to_string(),
            client_secret: Some(secret.to_string()),
            client_name: None,
            redirect_uris: vec!["https://a/cb".to_string()],
            grant_types: vec![GrantType::AuthorizationCode],
            response_types: vec![ResponseType::Code],
            scope: Some("openid".to_string()),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_extract_prefers_basic_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Basic {}", BASE64_STANDARD.encode("c1:s3cret")))
                .unwrap(),
        );
        let form = TokenForm {
            client_id: Some("other".to_string()),
            client_secret: Some("other-secret".to_string()),
            ..Default::default()
        };

        let auth = extract_client_auth(&headers, &form).unwrap();
        assert_eq!(auth.client_id, "c1");
        assert_eq!(auth.client_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_extract_splits_on_first_colon() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!(
                "Basic {}",
                BASE64_STANDARD.encode("c1:secret:with:colons")
            ))
            .unwrap(),
        );

        let auth = extract_client_auth(&headers, &TokenForm::default()).unwrap();
        assert_eq!(auth.client_id, "c1");
        assert_eq!(auth.client_secret.as_deref(), Some("secret:with:colons"));
    }

    #[test]
    fn test_extract_falls_back_to_body_params() {
        let form = TokenForm {
            client_id: Some("c1".to_string()),
            client_secret: Some("s3cret".to_string()),
            ..Default::default()
        };

        let auth = extract_client_auth(&HeaderMap::new(), &form).unwrap();
        assert_eq!(auth.client_id, "c1");
        assert_eq!(auth.client_secret.as_deref(), Some("s3cret"));

        assert!(extract_client_auth(&HeaderMap::new(), &TokenForm::default()).is_none());
    }

    #[tokio::test]
    async fn test_authenticate_client_failures() {
        let storage = MemoryOAuthStorage::new();
        storage.store_client(&test_client("c1", "s3cret")).await.unwrap();
        let mut inactive = test_client("c2", "s3cret");
        inactive.active = false;
        storage.store_client(&inactive).await.unwrap();

        let err = authenticate_client(&storage, None).await.unwrap_err();
        assert_eq!(err.code(), "invalid_client");

        let auth = ClientAuthentication {
            client_id: "nope".to_string(),
            client_secret: Some("s3cret".to_string()),
        };
        let err = authenticate_client(&storage, Some(&auth)).await.unwrap_err();
        assert_eq!(err, OAuthError::InvalidClient("Invalid client_id".to_string()));

        let auth = ClientAuthentication {
            client_id: "c2".to_string(),
            client_secret: Some("s3cret".to_string()),
        };
        let err = authenticate_client(&storage, Some(&auth)).await.unwrap_err();
        assert_eq!(err, OAuthError::InvalidClient("Client is not active".to_string()));

        let auth = ClientAuthentication {
            client_id: "c1".to_string(),
            client_secret: Some("wrong".to_string()),
        };
        let err = authenticate_client(&storage, Some(&auth)).await.unwrap_err();
        assert_eq!(err, OAuthError::InvalidClient("Invalid client secret".to_string()));

        let auth = ClientAuthentication {
            client_id: "c1".to_string(),
            client_secret: Some("s3cret".to_string()),
        };
        let client = authenticate_client(&storage, Some(&auth)).await.unwrap();
        assert_eq!(client.client_id, "c1");
    }
}
