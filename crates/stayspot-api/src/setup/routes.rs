//! Route configuration and setup

use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use stayspot_core::Config;
use stayspot_infra::{request_id_middleware, security_headers_middleware};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let max_concurrent = config.max_concurrent_requests().max(1);
    tracing::info!(
        max_concurrent_requests = max_concurrent,
        "HTTP concurrency limit layer enabled"
    );

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(file_routes())
        .merge(owner_image_routes())
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}

fn file_routes() -> Router<Arc<AppState>> {
    Router::new().route("/files/{name}", get(handlers::files::get_file))
}

fn owner_image_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users/{id}/profile-image",
            get(handlers::owner_images::get_profile_image),
        )
        .route(
            "/listings/{id}/images/{index}",
            get(handlers::owner_images::get_listing_image),
        )
        .route(
            "/blogs/{id}/images/{index}",
            get(handlers::owner_images::get_blog_image),
        )
}
