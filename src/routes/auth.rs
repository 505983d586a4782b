// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth command routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::services::{CommandResult, LoginRequest, RegisterRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/demo", post(login_demo))
        .route("/api/account", delete(delete_account))
}

/// Result of an auth command.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CommandResponse {
    pub success: bool,
    /// Failure text for a toast
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Path the UI should navigate to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

fn respond(result: CommandResult) -> (StatusCode, Json<CommandResponse>) {
    match result {
        Ok(redirect) => (
            StatusCode::OK,
            Json(CommandResponse {
                success: true,
                message: None,
                redirect: redirect.map(|entry| entry.path().to_string()),
            }),
        ),
        Err(failure) => (
            StatusCode::BAD_REQUEST,
            Json(CommandResponse {
                success: false,
                message: Some(failure.message),
                redirect: None,
            }),
        ),
    }
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> (StatusCode, Json<CommandResponse>) {
    respond(state.gateway.login(&request).await)
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> (StatusCode, Json<CommandResponse>) {
    respond(state.gateway.register(&request).await)
}

async fn logout(State(state): State<Arc<AppState>>) -> (StatusCode, Json<CommandResponse>) {
    respond(state.gateway.logout().await)
}

async fn login_demo(State(state): State<Arc<AppState>>) -> (StatusCode, Json<CommandResponse>) {
    respond(state.gateway.login_demo().await)
}

/// Delete the signed-in account.
async fn delete_account(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<CommandResponse>) {
    tracing::info!("User-initiated account deletion");
    respond(state.gateway.delete_account().await)
}
