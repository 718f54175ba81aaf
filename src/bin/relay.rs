//! Standalone chat relay. Runs the /api/ai/chat endpoint by itself so the
//! assistant can be deployed apart from the main API server.

use std::net::SocketAddr;

use axum::routing::post;
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trailhub::ai_relay::{self, RelayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "relay=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelayConfig::from_env()?;

    let app = Router::new()
        .route("/api/ai/chat", post(ai_relay::chat))
        .layer(Extension(config))
        .layer(Extension(reqwest::Client::new()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let port = std::env::var("RELAY_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("relay listening on {addr}");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
