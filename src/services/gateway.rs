// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth command gateway: user intents → provider calls and demo flag changes.
//!
//! Commands never return raw provider errors. Every failure is reduced to an
//! [`AuthFailure`] carrying text fit for a toast notification.
//!
//! Provider-mutating commands (login, register) never publish an identity
//! themselves; the synchronizer picks the change up from the provider's
//! notification channel. They only ask it to re-derive when leaving demo
//! mode, and register does so once the profile has been written.

use crate::db::{DemoFlag, ProfileStore};
use crate::error::AppError;
use crate::models::{UserMetadata, UserProfile};
use crate::services::{AuthProvider, SessionSynchronizer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use validator::{Validate, ValidationErrors};

/// Default pause between profile write attempts (multiplied by attempt number).
const PROFILE_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Where the caller should navigate after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPoint {
    Login,
    Home,
}

impl EntryPoint {
    pub fn path(self) -> &'static str {
        match self {
            EntryPoint::Login => "/login",
            EntryPoint::Home => "/",
        }
    }
}

/// Failed command, with a message for the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub message: String,
}

impl AuthFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<AppError> for AuthFailure {
    fn from(err: AppError) -> Self {
        Self::new(err.user_message())
    }
}

/// Outcome of a gateway command: an optional redirect, or a failure.
pub type CommandResult = Result<Option<EntryPoint>, AuthFailure>;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    pub username: String,
}

/// Imperative auth operations.
#[derive(Clone)]
pub struct AuthGateway {
    provider: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    demo: DemoFlag,
    sync: Arc<SessionSynchronizer>,
    profile_write_attempts: u32,
    retry_backoff: Duration,
}

impl AuthGateway {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        demo: DemoFlag,
        sync: Arc<SessionSynchronizer>,
        profile_write_attempts: u32,
    ) -> Self {
        Self {
            provider,
            profiles,
            demo,
            sync,
            profile_write_attempts: profile_write_attempts.max(1),
            retry_backoff: PROFILE_RETRY_BACKOFF,
        }
    }

    /// Override the pause between profile write attempts.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Sign in with email and password.
    pub async fn login(&self, request: &LoginRequest) -> CommandResult {
        check(request)?;

        let session = self
            .provider
            .sign_in(request.email.trim(), &request.password)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Login rejected");
                AuthFailure::from(e)
            })?;

        // A real session replaces demo mode. The sign-in event may already
        // have been handled while the flag was still set.
        if self.clear_demo_flag()? {
            self.sync.refresh().await;
        }

        tracing::info!(user_id = %session.user.id, "Login accepted, awaiting auth event");
        Ok(None)
    }

    /// Create an account and its profile.
    ///
    /// If the account is created but the profile cannot be written after
    /// all attempts, the account is left in place and the failure is
    /// reported.
    pub async fn register(&self, request: &RegisterRequest) -> CommandResult {
        check(request)?;

        let email = request.email.trim();
        let username = request.username.trim();
        let metadata = UserMetadata {
            username: Some(username.to_string()),
        };

        let user = self
            .provider
            .sign_up(email, &request.password, &metadata)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Registration rejected");
                AuthFailure::from(e)
            })?;

        self.clear_demo_flag()?;

        let profile = UserProfile::new(&user.id, username, email, chrono::Utc::now().to_rfc3339());
        let written = self.write_profile_with_retry(&profile).await;

        // The sign-in event can arrive before the profile exists.
        self.sync.refresh().await;

        if let Err(e) = written {
            tracing::error!(
                error = %e,
                user_id = %user.id,
                "Account created but profile write failed"
            );
            return Err(AuthFailure::new(format!(
                "Your account was created but your profile could not be saved: {}",
                e.user_message()
            )));
        }

        tracing::info!(user_id = %user.id, "Account registered");
        Ok(None)
    }

    /// Clear the demo flag if set. Returns whether it was set.
    fn clear_demo_flag(&self) -> Result<bool, AuthFailure> {
        let was_set = self.demo.is_set().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Demo flag unreadable, clearing anyway");
            true
        });
        if !was_set {
            return Ok(false);
        }

        self.demo.clear().map_err(|e| {
            tracing::error!(error = %e, "Could not clear demo flag");
            AuthFailure::from(e)
        })?;
        tracing::info!("Leaving demo mode for a real session");
        Ok(true)
    }

    async fn write_profile_with_retry(&self, profile: &UserProfile) -> Result<(), AppError> {
        let mut attempt = 1;
        loop {
            match self.profiles.upsert_profile(profile).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= self.profile_write_attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        attempt,
                        user_id = %profile.id,
                        "Profile write failed, retrying"
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    /// End the session (real or demo) and go to the login page.
    pub async fn logout(&self) -> CommandResult {
        self.provider.sign_out().await.map_err(|e| {
            tracing::warn!(error = %e, "Logout failed");
            AuthFailure::from(e)
        })?;

        self.finish_sign_out().await
    }

    /// Enter demo mode without contacting the provider.
    pub async fn login_demo(&self) -> CommandResult {
        self.demo.set().map_err(|e| {
            tracing::error!(error = %e, "Could not persist demo flag");
            AuthFailure::from(e)
        })?;
        self.sync.enter_demo().await;

        tracing::info!("Demo mode entered");
        Ok(Some(EntryPoint::Home))
    }

    /// Delete the account at the provider, then sign out locally.
    ///
    /// In demo mode there is no account to delete, so this is a logout.
    pub async fn delete_account(&self) -> CommandResult {
        if self.demo.is_set().unwrap_or(false) {
            tracing::info!("Account deletion requested in demo mode, signing out");
            return self.logout().await;
        }

        let user_id = match self.provider.get_session().await {
            Ok(session) => session.map(|s| s.user.id),
            Err(e) => {
                tracing::debug!(error = %e, "No session available before account deletion");
                None
            }
        };

        self.provider.delete_user().await.map_err(|e| {
            tracing::warn!(error = %e, "Account deletion failed");
            AuthFailure::from(e)
        })?;

        if let Some(user_id) = user_id.as_deref() {
            if let Err(e) = self.profiles.delete_profile(user_id).await {
                tracing::warn!(error = %e, user_id, "Profile cleanup failed after account deletion");
            }
        }

        tracing::info!(user_id = ?user_id, "Account deleted");
        self.finish_sign_out().await
    }

    async fn finish_sign_out(&self) -> CommandResult {
        self.demo.clear().map_err(|e| {
            tracing::error!(error = %e, "Could not clear demo flag");
            AuthFailure::from(e)
        })?;
        self.sync.clear().await;
        Ok(Some(EntryPoint::Login))
    }
}

/// Validate a request, reducing field errors to one message.
fn check<T: Validate>(request: &T) -> Result<(), AuthFailure> {
    request
        .validate()
        .map_err(|errors| AuthFailure::new(validation_message(&errors)))
}

fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| {
                err.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid {}", field))
            })
        })
        .collect::<Vec<_>>()
        .join(". ")
}
