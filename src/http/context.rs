//! Application state and request context management.

use axum_template::engine::Engine;
use std::sync::Arc;

use crate::config::Config;
use crate::oauth::auth_server::AuthorizationServer;
use crate::storage::traits::OAuthStorage;

#[cfg(feature = "reload")]
use minijinja_autoreload::AutoReloader;

#[cfg(feature = "reload")]
/// Template engine with auto-reloading support for development.
pub type AppEngine = Engine<AutoReloader>;

#[cfg(feature = "embed")]
use minijinja::Environment;

#[cfg(feature = "embed")]
pub type AppEngine = Engine<Environment<'static>>;

#[cfg(not(any(feature = "reload", feature = "embed")))]
pub type AppEngine = Engine<minijinja::Environment<'static>>;

/// Name of the cookie carrying the browser session identifier
pub const SESSION_COOKIE: &str = "oidp_sid";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Template engine for rendering HTML responses.
    pub template_env: AppEngine,
    /// Storage for clients, users, codes, tokens, consents, and sessions
    pub storage: Arc<dyn OAuthStorage>,
    /// Authorization and token endpoint orchestration
    pub auth_server: Arc<AuthorizationServer>,
}
