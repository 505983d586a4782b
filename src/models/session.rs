// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider-issued session and auth notification types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Metadata attached to the provider account at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// The provider's view of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Provider user ID (UUID string)
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// An authenticated session.
///
/// Persisted as JSON in the local store so it survives restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token expires (Unix timestamp, seconds)
    pub expires_at: i64,
    pub user: AuthUser,
}

impl Session {
    /// Whether the access token is expired or will expire within `margin`.
    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        let expires_at = DateTime::from_timestamp(self.expires_at, 0).unwrap_or_default();
        now + margin >= expires_at
    }
}

/// Notification kinds emitted on the provider's auth channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    UserUpdated,
    TokenRefreshed,
    PasswordRecovery,
}

impl AuthEvent {
    /// Events after which the current identity must be re-derived.
    pub fn triggers_refresh(self) -> bool {
        matches!(
            self,
            AuthEvent::SignedIn | AuthEvent::SignedOut | AuthEvent::UserUpdated
        )
    }
}
