//! # Web API Middleware
//!
//! Router-wide layers (request id, tracing, CORS, timeout) plus the session guard applied
//! to the task routes.

pub mod auth;
pub mod request_id;

use axum::middleware;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::HttpServerConfig;
use crate::web::state::AppState;

/// Apply the middleware stack, outermost first:
/// 1. Request ID generation
/// 2. Tracing and logging
/// 3. CORS handling (when enabled)
/// 4. Request timeout
pub fn apply_middleware_stack(
    router: Router<AppState>,
    config: &HttpServerConfig,
) -> Router<AppState> {
    let mut router = router.layer(TimeoutLayer::new(config.request_timeout()));

    if config.cors_enabled {
        router = router.layer(create_cors_layer());
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::add_request_id))
}

fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
