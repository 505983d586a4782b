// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the hosted auth provider (GoTrue-compatible REST API).
//!
//! Handles:
//! - Password sign-in and sign-up
//! - Session persistence in the local store
//! - Access token refresh when close to expiry
//! - Auth state notifications for subscribers

use crate::db::LocalStore;
use crate::error::AppError;
use crate::models::{AuthEvent, AuthUser, Session, UserMetadata};
use crate::services::AuthProvider;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// Local store key holding the serialized session.
pub const SESSION_STORAGE_KEY: &str = "fittrack-auth-token";

/// Margin before expiry when we proactively refresh.
const SESSION_REFRESH_MARGIN_SECS: i64 = 60;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Provider client with session management.
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    store: Arc<dyn LocalStore>,
    events: broadcast::Sender<AuthEvent>,
    /// Serializes refresh-token exchanges.
    refresh_lock: Mutex<()>,
}

impl AuthClient {
    pub fn new(base_url: &str, anon_key: &str, store: Arc<dyn LocalStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            store,
            events,
            refresh_lock: Mutex::new(()),
        }
    }

    // ─── Session Persistence ─────────────────────────────────────────────────

    /// Read the stored session. A corrupt entry is dropped.
    fn load_session(&self) -> Result<Option<Session>, AppError> {
        let Some(raw) = self.store.get(SESSION_STORAGE_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable stored session");
                self.store.remove(SESSION_STORAGE_KEY)?;
                Ok(None)
            }
        }
    }

    fn save_session(&self, session: &Session) -> Result<(), AppError> {
        let json = serde_json::to_string(session)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Session encode failed: {}", e)))?;
        self.store.set(SESSION_STORAGE_KEY, &json)
    }

    fn clear_session(&self) -> Result<(), AppError> {
        self.store.remove(SESSION_STORAGE_KEY)
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
        tracing::debug!(?event, "Auth event emitted");
    }

    // ─── Token Refresh ───────────────────────────────────────────────────────

    /// Refresh the stored session if it is about to expire.
    ///
    /// The check is repeated after taking the lock; another caller may
    /// already have refreshed.
    async fn refresh_if_needed(&self) -> Result<Option<Session>, AppError> {
        let margin = Duration::seconds(SESSION_REFRESH_MARGIN_SECS);

        let _guard = self.refresh_lock.lock().await;

        let Some(current) = self.load_session()? else {
            return Ok(None);
        };
        if !current.expires_within(margin, Utc::now()) {
            return Ok(Some(current));
        }

        tracing::info!(user_id = %current.user.id, "Access token expiring, refreshing");

        match self.refresh_token(&current.refresh_token).await {
            Ok(session) => {
                self.save_session(&session)?;
                self.emit(AuthEvent::TokenRefreshed);
                tracing::info!(user_id = %session.user.id, "Session refreshed");
                Ok(Some(session))
            }
            Err(e) if e.is_invalid_session() => {
                tracing::warn!(error = %e, "Refresh rejected, dropping stored session");
                self.clear_session()?;
                self.emit(AuthEvent::SignedOut);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Keep the stored session fresh in the background.
    pub fn spawn_auto_refresh(self: &Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = client.refresh_if_needed().await {
                    tracing::warn!(error = %e, "Background session refresh failed");
                }
            }
        })
    }

    // ─── HTTP ────────────────────────────────────────────────────────────────

    async fn refresh_token(&self, refresh_token: &str) -> Result<Session, AppError> {
        let response = self
            .http
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| AppError::AuthProvider(format!("Token refresh request failed: {}", e)))?;

        let token: TokenResponse = self.check_response_json(response).await?;
        Ok(token.into_session(Utc::now()))
    }

    async fn post_authed(&self, path: &str, access_token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| AppError::AuthProvider(e.to_string()))?;

        self.check_response(response).await
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(error_from_status(status, &body))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_status(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::AuthProvider(format!("Unexpected provider response: {}", e)))
    }
}

#[async_trait]
impl AuthProvider for AuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let response = self
            .http
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AppError::AuthProvider(format!("Sign-in request failed: {}", e)))?;

        let token: TokenResponse = self.check_response_json(response).await?;
        let session = token.into_session(Utc::now());

        self.save_session(&session)?;
        tracing::info!(user_id = %session.user.id, "Signed in");
        self.emit(AuthEvent::SignedIn);

        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<AuthUser, AppError> {
        let response = self
            .http
            .post(format!("{}/auth/v1/signup", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await
            .map_err(|e| AppError::AuthProvider(format!("Sign-up request failed: {}", e)))?;

        let outcome: SignUpResponse = self.check_response_json(response).await?;
        match outcome {
            SignUpResponse::Session(token) => {
                // Auto-confirmed accounts come back signed in.
                let session = token.into_session(Utc::now());
                self.save_session(&session)?;
                let user = session.user.clone();
                tracing::info!(user_id = %user.id, "Account created and signed in");
                self.emit(AuthEvent::SignedIn);
                Ok(user)
            }
            SignUpResponse::User(user) => {
                tracing::info!(user_id = %user.id, "Account created, confirmation pending");
                Ok(user)
            }
        }
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        if let Some(session) = self.load_session()? {
            match self.post_authed("/auth/v1/logout", &session.access_token).await {
                Ok(()) => {}
                // Already gone on the provider side.
                Err(e) if e.is_invalid_session() => {
                    tracing::debug!("Session already invalid at provider");
                }
                Err(e) => return Err(e),
            }
        }

        self.clear_session()?;
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn delete_user(&self) -> Result<(), AppError> {
        let session = self
            .get_session()
            .await?
            .ok_or_else(|| AppError::AuthProvider("Not signed in".to_string()))?;

        self.post_authed("/rest/v1/rpc/delete_user", &session.access_token)
            .await?;

        tracing::info!(user_id = %session.user.id, "Account deleted at provider");
        self.clear_session()?;
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, AppError> {
        let margin = Duration::seconds(SESSION_REFRESH_MARGIN_SECS);
        match self.load_session()? {
            Some(session) if !session.expires_within(margin, Utc::now()) => Ok(Some(session)),
            Some(_) => self.refresh_if_needed().await,
            None => Ok(None),
        }
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

/// Token grant response (sign-in, refresh, auto-confirmed sign-up).
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now.timestamp() + secs))
            .unwrap_or_else(|| now.timestamp() + 3600);

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Sign-up answers with a session when auto-confirm is on, else the bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

/// Map a failed provider response to an error carrying its human message.
fn error_from_status(status: reqwest::StatusCode, body: &str) -> AppError {
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return AppError::AuthProvider(AppError::AUTH_SESSION_INVALID.to_string());
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!("Auth provider rate limit hit (429)");
    }

    let message = provider_message(body).unwrap_or_else(|| format!("HTTP {}", status));
    AppError::AuthProvider(message)
}

/// Extract the human-readable message from a provider error body.
fn provider_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}
