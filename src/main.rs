use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use lounge::config::AppConfig;
use lounge::db;
use lounge::handlers;
use lounge::services::clock::SystemClock;
use lounge::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    if config.admin_password == "changeme" {
        tracing::warn!("ADMIN_PASSWORD is not set, using the default password");
    }
    tracing::info!(
        initial_status = %config.initial_status,
        cutoff_minutes = config.cancellation_cutoff_minutes,
        "booking policy"
    );

    let conn = db::init_db(&config.database_url)?;
    let state = Arc::new(AppState::new(conn, config.clone(), Box::new(SystemClock)));
    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
