//! Axum HTTP server handlers and middleware for the OAuth/OIDC endpoints.

pub mod context;
mod handler_authorize;
mod handler_index;
mod handler_logout;
mod handler_token;
mod handler_userinfo;
mod handler_well_known;
pub mod middleware_auth;
pub mod server;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::{AppEngine, AppState, SESSION_COOKIE};
pub use server::build_router;
