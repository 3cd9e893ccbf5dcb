use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::state::AppState;

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "request handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "Internal Server Error" })),
    )
        .into_response()
}

/// Assembles the full router under the configured base path. Debug mode
/// additionally registers the destructive delete endpoints.
pub fn build_app(state: AppState, api_prefix: &str, debug: bool) -> Router {
    let mut routes = Router::new()
        .route("/health", get(api::health))
        .merge(api::orgs::routes())
        .merge(api::report::routes())
        .merge(api::feedback::routes())
        .merge(api::toggle::routes());
    if debug {
        routes = routes
            .merge(api::orgs::debug_routes())
            .merge(api::toggle::debug_routes());
    }

    let router = if api_prefix.is_empty() || api_prefix == "/" {
        routes
    } else {
        Router::new().nest(api_prefix, routes)
    };

    router
        .fallback(api::unknown_route)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
