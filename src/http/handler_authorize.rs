//! Handles GET/POST /authorize - the OAuth authorization endpoint with its
//! consent prompt.

use axum::{
    Form,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use axum_template::TemplateEngine;
use serde::Deserialize;
use serde_json::json;

use super::context::{AppState, SESSION_COOKIE};
use crate::oauth::auth_server::AuthorizeOutcome;
use crate::oauth::types::AuthorizeQuery;

/// Consent decision form body
#[derive(Debug, Deserialize)]
pub struct ConsentForm {
    pub approve: Option<String>,
}

/// Handle OAuth authorization requests
/// GET /authorize - Validates the request and either redirects immediately
/// (recorded consent covers the requested scopes) or renders the consent
/// prompt.
pub async fn get_authorize_handler(
    State(state): State<AppState>,
    Query(query): Query<AuthorizeQuery>,
    jar: CookieJar,
) -> Response {
    let session_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    let outcome = state
        .auth_server
        .authorize(query, session_id.as_deref())
        .await;

    render_outcome(&state, outcome)
}

/// Handle the user's consent decision
/// POST /authorize - `approve=true` issues the code and records consent;
/// anything else denies the request.
pub async fn post_authorize_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ConsentForm>,
) -> Response {
    let session_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let approved = form.approve.as_deref() == Some("true");

    let outcome = state.auth_server.decide(session_id.as_deref(), approved).await;

    render_outcome(&state, outcome)
}

fn render_outcome(state: &AppState, outcome: AuthorizeOutcome) -> Response {
    match outcome {
        AuthorizeOutcome::Redirect(url) | AuthorizeOutcome::ErrorRedirect(url) => {
            Redirect::to(&url).into_response()
        }
        AuthorizeOutcome::ConsentRequired { client, request } => {
            let scopes: Vec<&str> = request.scope.split_whitespace().collect();
            let client_name = client
                .client_name
                .clone()
                .unwrap_or_else(|| client.client_id.clone());
            let template_data = json!({
                "title": "OIDP - Authorize Application",
                "version": state.config.version,
                "client_name": client_name,
                "client_id": client.client_id,
                "scopes": scopes,
            });

            match state.template_env.render("consent.html", &template_data) {
                Ok(html) => Html(html).into_response(),
                Err(e) => {
                    tracing::error!(error = %e, "failed to render consent template");
                    let body = json!({
                        "error": "server_error",
                        "error_description": "Template rendering failed"
                    });
                    (http::StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
                }
            }
        }
        AuthorizeOutcome::Error(e) => {
            let body = json!({
                "error": e.code(),
                "error_description": e.to_string()
            });
            (e.status(), axum::Json(body)).into_response()
        }
    }
}
