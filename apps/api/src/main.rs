mod auth;
mod config;
mod db;
mod errors;
mod extractor;
mod interpreter;
mod models;
mod pipeline;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::tokens::TokenManager;
use crate::config::Config;
use crate::db::{create_pool, init_schema};
use crate::interpreter::OpenAiInterpreter;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Contract Clause Extractor API v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    init_schema(&db).await?;

    // Initialize the clause interpreter
    let interpreter = Arc::new(OpenAiInterpreter::new(config.openai_api_key.clone()));
    info!(
        "Clause interpreter initialized (model: {})",
        crate::interpreter::MODEL
    );

    // Initialize the token manager
    let tokens = TokenManager::new(&config.jwt_secret, config.jwt_expiry_minutes);

    // Build app state
    let state = AppState {
        db,
        interpreter,
        tokens,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
