pub mod handlers;
pub mod types;

use crate::{
    Result,
    config::Config,
    relay::Relay,
    schema::SchemaValidator,
    upstream::HttpUpstreamClient,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(state: handlers::AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/extract-image-info", post(handlers::extract_image_info))
        .route("/openapi.json", get(handlers::openapi_spec))
        .route("/docs", get(handlers::docs))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    // Compiled once, shared read-only by every request
    let validator = Arc::new(SchemaValidator::new()?);
    let upstream = Arc::new(HttpUpstreamClient::new(config.upstream.clone())?);

    let relay = Relay::new(validator, upstream)
        .with_idle_timeout(Duration::from_secs(config.upstream.idle_timeout_secs));

    let app_state = handlers::AppState {
        relay: Arc::new(relay),
    };

    let app = router(app_state, config.server.max_body_bytes);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on http://{}", addr);
    info!("API documentation available at http://{}/docs", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
