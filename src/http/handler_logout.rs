//! Handles GET /logout - end-session endpoint

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use serde::Deserialize;

use super::context::{AppState, SESSION_COOKIE};

#[derive(Debug, Deserialize)]
pub struct LogoutQuery {
    pub post_logout_redirect_uri: Option<String>,
    pub state: Option<String>,
}

/// Clear the browser session and redirect.
///
/// With a `post_logout_redirect_uri` the user is sent there (with `state`
/// appended when present); otherwise to the landing page.
pub async fn get_logout_handler(
    State(state): State<AppState>,
    Query(query): Query<LogoutQuery>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let session_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    let target = state
        .auth_server
        .logout(
            session_id.as_deref(),
            query.post_logout_redirect_uri.as_deref(),
            query.state.as_deref(),
        )
        .await;

    let jar = jar.remove(Cookie::from(SESSION_COOKIE));

    (jar, Redirect::to(&target))
}
