// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FitTrack session companion server
//!
//! Serves the current session state and the auth commands to the FitTrack
//! frontend, backed by the hosted auth provider and the profile store.

use fittrack_session::{
    config::{Config, ProfileBackend},
    db::{FileStore, FirestoreDb, LocalStore, MemoryProfileStore, ProfileStore},
    services::{AuthClient, AuthProvider},
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often the stored session is checked for an upcoming expiry.
const SESSION_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, auth_url = %config.auth_url, "Starting FitTrack session server");

    // Client-local storage (session + demo flag)
    let store_path = config.local_store_path();
    let local_store: Arc<dyn LocalStore> =
        Arc::new(FileStore::open(&store_path).expect("Failed to open local store"));
    tracing::info!(path = %store_path.display(), "Local store opened");

    // Auth provider
    let auth_client = Arc::new(AuthClient::new(
        &config.auth_url,
        &config.auth_anon_key,
        local_store.clone(),
    ));
    let refresh_task = auth_client.spawn_auto_refresh(SESSION_REFRESH_INTERVAL);
    let provider: Arc<dyn AuthProvider> = auth_client;

    // Profile storage
    let profiles: Arc<dyn ProfileStore> = match config.profile_backend {
        ProfileBackend::Firestore => Arc::new(
            FirestoreDb::new(&config.gcp_project_id)
                .await
                .expect("Failed to connect to Firestore"),
        ),
        ProfileBackend::Memory => {
            tracing::warn!("Using in-memory profile store, profiles are lost on restart");
            Arc::new(MemoryProfileStore::new())
        }
    };

    // Build shared state and resolve the first identity
    let state = Arc::new(AppState::new(
        config.clone(),
        provider,
        profiles,
        local_store,
    ));
    state.initialize().await;

    // Build router
    let app = fittrack_session::routes::create_router(state.clone());

    // Start server
    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresh_task.abort();
    state.shutdown();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fittrack_session=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
