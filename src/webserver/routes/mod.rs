use std::sync::Arc;

use axum::extract::Extension;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::core::constants::CSRF_TOKEN_LENGTH;
use crate::webserver::middleware::{generate_token, CspNonce};
use crate::webserver::{state::AppState, templates};

pub mod analyze;
pub mod status;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .nest("/api", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new().merge(analyze::routes()).merge(status::routes())
}

/// Demo page handler
///
/// Embeds a fresh CSRF token into the page; the client echoes it on
/// analyze requests.
async fn index_page(Extension(CspNonce(nonce)): Extension<CspNonce>) -> Response {
    let csrf_token = generate_token(CSRF_TOKEN_LENGTH);
    let page = templates::index_page(&nonce, &csrf_token);

    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        page,
    )
        .into_response()
}
