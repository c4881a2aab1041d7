//! Handles GET / - landing page

use axum::extract::State;
use axum::response::IntoResponse;
use axum_template::RenderHtml;
use serde_json::json;

use super::context::AppState;
use crate::errors::Result;

pub async fn handle_index(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(RenderHtml(
        "index.html",
        state.template_env.clone(),
        json!({
            "title": "OIDP - OpenID Provider",
            "version": state.config.version,
        }),
    ))
}
