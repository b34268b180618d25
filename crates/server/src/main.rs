use std::process::ExitCode;

use server::config::load_config;
use server::db::{build_state, AppState};
use shared_types::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = load_config();

    server::telemetry::init_tracing(&config.logging);
    server::health::record_start_time();

    let state = match build_state(config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    seed_admin(config, &state).await;

    let router = server::openapi::app_router(state, config.uploads.max_body_bytes);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Could not bind listener");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "Listening");

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Create the configured admin when `SEED_ADMIN_PASSWORD` is set. Failures
/// are logged; the server still starts.
async fn seed_admin(config: &AppConfig, state: &AppState) {
    let Some(seed) = &config.seed_admin else {
        return;
    };
    let Ok(password) = std::env::var("SEED_ADMIN_PASSWORD") else {
        tracing::warn!(email = %seed.email, "seed_admin configured but SEED_ADMIN_PASSWORD is unset");
        return;
    };
    if let Err(e) = state.engine.ensure_seed_admin(seed, &password).await {
        tracing::error!(error = %e, email = %seed.email, "Could not create seed admin");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Could not listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
