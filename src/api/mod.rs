//! REST API module using Axum
//!
//! Read-only view over the most recently published store snapshot. Disabled
//! unless `server.enabled` is set or `--api` is passed.

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::ApiState;
pub use routes::api_routes;

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `AIRSPOTTR_CORS_ORIGINS` to a comma-separated list of allowed origins.
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);
    match std::env::var("AIRSPOTTR_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Create the complete application router.
pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}
