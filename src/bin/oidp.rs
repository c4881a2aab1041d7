//! OpenID Provider server binary.
//!
//! Main application entry point that configures the OAuth/OIDC authorization
//! server and starts the HTTP server with graceful shutdown.

use anyhow::Result;
use oidp::{
    config::Config,
    http::{AppEngine, AppState, build_router},
    oauth::auth_server::AuthorizationServer,
    oauth::issuer::TokenIssuer,
    oauth::types::{
        GrantType, OAuthClient, ResponseType, User, UserSession, generate_session_id,
        generate_token,
    },
    storage::{
        create_storage_backend, parse_storage_backend,
        traits::{
            AccessTokenStore, AuthorizationCodeStore, ClientStore, OAuthStorage,
            RefreshTokenStore, SessionStore, UserStore,
        },
    },
};
use std::{env, sync::Arc};

use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing_subscriber::prelude::*;

#[cfg(feature = "embed")]
use oidp::templates::build_env;

#[cfg(feature = "reload")]
use oidp::templates::build_env;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "oidp=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();

    let version = oidp::config::version()?;

    env::args().for_each(|arg| {
        if arg == "--version" {
            println!("{version}");
            std::process::exit(0);
        }
    });

    tracing::info!(?version, "Starting OIDP");

    let config = Config::new()?;

    // Setup template engine
    let template_env = {
        #[cfg(feature = "embed")]
        {
            AppEngine::from(build_env(
                config.external_base.clone(),
                env!("CARGO_PKG_VERSION").to_string(),
            ))
        }

        #[cfg(feature = "reload")]
        {
            AppEngine::from(build_env())
        }

        #[cfg(not(any(feature = "reload", feature = "embed")))]
        {
            use minijinja::Environment;
            let mut env = Environment::new();
            env.add_template(
                "index.html",
                "<!DOCTYPE html><html><body>OIDP</body></html>",
            )
            .unwrap();
            env.add_template(
                "consent.html",
                "<!DOCTYPE html><html><body>Consent</body></html>",
            )
            .unwrap();
            AppEngine::from(env)
        }
    };

    // Initialize storage
    let storage_backend = parse_storage_backend(&config.storage_backend)?;
    let storage = create_storage_backend(storage_backend).await?;

    if config.seed_demo {
        seed_demo_data(storage.as_ref()).await?;
    }

    // Wire up the protocol core
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

    // Create application context
    let app_context = AppState {
        config: Arc::new(config.clone()),
        template_env,
        storage,
        auth_server,
    };

    // Build the router
    let sweep_storage = app_context.storage.clone();
    let app = build_router(app_context);

    // Setup graceful shutdown
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    {
        let tracker = tracker.clone();
        let inner_token = token.clone();

        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::spawn(async move {
            tokio::select! {
                () = inner_token.cancelled() => { },
                _ = terminate => {},
                _ = ctrl_c => {},
            }

            tracker.close();
            inner_token.cancel();
        });
    }

    // Sweep expired codes and tokens; expiry is still enforced lazily at
    // read time, this only reclaims space
    {
        let storage = sweep_storage;
        let inner_token = token.clone();
        tracker.spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
            loop {
                tokio::select! {
                    () = inner_token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let codes = storage.cleanup_expired_codes().await.unwrap_or(0);
                let access_tokens = storage.cleanup_expired_tokens().await.unwrap_or(0);
                let refresh_tokens = storage.cleanup_expired_refresh_tokens().await.unwrap_or(0);
                if codes + access_tokens + refresh_tokens > 0 {
                    tracing::debug!(codes, access_tokens, refresh_tokens, "swept expired records");
                }
            }
        });
    }

    // Start HTTP server
    {
        let http_port = *config.http_port.as_ref();
        let inner_token = token.clone();
        tracker.spawn(async move {
            let bind_address = format!("0.0.0.0:{http_port}");
            tracing::info!("Starting server on {bind_address}");
            let listener = TcpListener::bind(&bind_address).await.unwrap();

            let shutdown_token = inner_token.clone();
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    tokio::select! {
                        () = shutdown_token.cancelled() => { }
                    }
                    tracing::info!("axum graceful shutdown complete");
                })
                .await;
            if let Err(err) = result {
                tracing::error!("axum task failed: {}", err);
            }

            inner_token.cancel();
        });
    }

    tracker.wait().await;

    Ok(())
}

/// Seed one demo user, client, and session so the flow is drivable out of
/// the box.
async fn seed_demo_data(storage: &dyn OAuthStorage) -> Result<()> {
    let now = chrono::Utc::now();
    let client_secret = generate_token();
    let session_id = generate_session_id();

    storage
        .store_client(&OAuthClient {
            client_id: "demo-app".to_string(),
            client_secret: Some(client_secret.clone()),
            client_name: Some("Demo Application".to_string()),
            redirect_uris: vec!["http://localhost:3001/callback".to_string()],
            grant_types: vec![
                GrantType::AuthorizationCode,
                GrantType::ClientCredentials,
                GrantType::RefreshToken,
            ],
            response_types: vec![ResponseType::Code],
            scope: Some("openid profile email".to_string()),
            active: true,
            created_at: now,
            updated_at: now,
        })
        .await?;

    storage
        .store_user(&User {
            user_id: "demo-user".to_string(),
            name: Some("Demo User".to_string()),
            given_name: Some("Demo".to_string()),
            family_name: Some("User".to_string()),
            picture: None,
            email: Some("demo@example.com".to_string()),
            email_verified: true,
            created_at: now,
        })
        .await?;

    storage
        .store_session(&UserSession {
            session_id: session_id.clone(),
            user_id: "demo-user".to_string(),
            created_at: now,
        })
        .await?;

    tracing::info!(
        client_id = "demo-app",
        %client_secret,
        %session_id,
        "seeded demo data; authenticate by sending the session id in the oidp_sid cookie"
    );

    Ok(())
}
