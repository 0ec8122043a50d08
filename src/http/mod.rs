use crate::config::Config;
use anyhow::Context;
use axum::Router;
use axum::http::header::HeaderValue;
use http::{Method, header};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod error;
mod routers;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let origin = config
        .allowed_origin
        .parse::<HeaderValue>()
        .context("ALLOWED_ORIGIN is not a valid header value")?;
    let bind_addr = config.bind_addr.clone();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(origin)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN]);

    let app = create_router(config).layer(cors);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("could not bind {}", bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Error running the server")
}

/// The full service without transport concerns; handy for driving it in tests.
pub fn create_router(config: Config) -> Router {
    let shared_state = Arc::new(AppState {
        config: Arc::new(config),
    });
    Router::new().merge(routers::compiler::router(shared_state))
}
