//! Dive decompression planner - Rust/Axum service
//!
//! Serves dive plans calculated with the Bühlmann ZH-L16 gradient factor
//! decompression engine.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use diveops_deco::config::AppConfig;
use diveops_deco::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "diveops_deco=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        model = config.engine.model.name(),
        gf_low = config.engine.gf_low,
        gf_high = config.engine.gf_high,
        "Deco engine configured"
    );

    let state = AppState {
        defaults: Arc::new(config.engine),
    };
    let app = app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
