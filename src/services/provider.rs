// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contract of the external auth provider.

use crate::error::AppError;
use crate::models::{AuthEvent, AuthUser, Session, UserMetadata};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Hosted authentication service.
///
/// Mutating calls report completion only; the resulting identity change is
/// announced on the channel returned by [`AuthProvider::on_auth_state_change`].
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Verify credentials and start a session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError>;

    /// Create an account. Returns the new provider user.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<AuthUser, AppError>;

    async fn sign_out(&self) -> Result<(), AppError>;

    /// Delete the currently signed-in account.
    async fn delete_user(&self) -> Result<(), AppError>;

    /// The active session, if any.
    async fn get_session(&self) -> Result<Option<Session>, AppError>;

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent>;
}
