//! Shared fixtures for HTTP handler tests.

use std::sync::Arc;

use crate::config::Config;
use crate::http::context::{AppEngine, AppState};
use crate::oauth::auth_server::AuthorizationServer;
use crate::oauth::issuer::TokenIssuer;
use crate::storage::MemoryOAuthStorage;

pub(crate) const TEST_SIGNING_SECRET: &str = "test-signing-secret";

fn add_test_templates(env: &mut minijinja::Environment<'_>) {
    env.add_template(
        "index.html",
        "<!DOCTYPE html><html><body>OIDP</body></html>",
    )
    .unwrap();
    env.add_template(
        "consent.html",
        "<!DOCTYPE html><html><body><h1>Authorize {{ client_name }}</h1>\
         <form method=\"post\" action=\"/authorize\">\
         <button name=\"approve\" value=\"true\">Approve</button>\
         <button name=\"approve\" value=\"false\">Deny</button>\
         </form></body></html>",
    )
    .unwrap();
}

fn test_template_env() -> AppEngine {
    #[cfg(feature = "reload")]
    {
        use minijinja_autoreload::AutoReloader;
        AppEngine::from(AutoReloader::new(|_| {
            let mut env = minijinja::Environment::new();
            add_test_templates(&mut env);
            Ok(env)
        }))
    }

    #[cfg(not(feature = "reload"))]
    {
        let mut env = minijinja::Environment::new();
        add_test_templates(&mut env);
        AppEngine::from(env)
    }
}

pub(crate) fn create_test_config() -> Config {
    Config {
        version: "test".to_string(),
        http_port: "3000".to_string().try_into().unwrap(),
        http_templates_path: "templates".to_string(),
        external_base: "https://localhost".to_string(),
        id_token_signing_secret: TEST_SIGNING_SECRET.to_string().try_into().unwrap(),
        auth_code_ttl: "10m".to_string().try_into().unwrap(),
        access_token_ttl: "1h".to_string().try_into().unwrap(),
        refresh_token_ttl: "30d".to_string().try_into().unwrap(),
        id_token_ttl: "1h".to_string().try_into().unwrap(),
        storage_backend: "memory".to_string(),
        seed_demo: false,
    }
}

pub(crate) fn create_test_app_state() -> AppState {
    let config = Arc::new(create_test_config());
    let storage = Arc::new(MemoryOAuthStorage::new());

    let issuer = Arc::new(TokenIssuer::new(
        storage.clone(),
        config.external_base.clone(),
        *config.access_token_ttl.as_ref(),
        *config.refresh_token_ttl.as_ref(),
        *config.id_token_ttl.as_ref(),
        config.id_token_signing_secret.as_ref().to_string(),
    ));

    let auth_server = Arc::new(
        AuthorizationServer::new(storage.clone(), issuer)
            .with_auth_code_ttl(*config.auth_code_ttl.as_ref()),
    );

    AppState {
        config,
        template_env: test_template_env(),
        storage,
        auth_server,
    }
}
