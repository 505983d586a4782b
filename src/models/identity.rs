// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The derived "who is logged in" value and the view handed to the UI.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{FitnessGoal, Preferences, Session, UserProfile};

/// ID of the fixed demo placeholder identity.
pub const DEMO_USER_ID: &str = "demo-user";

/// A user as the rest of the application sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub fitness_goal: Option<FitnessGoal>,
    #[cfg_attr(feature = "binding-generation", ts(type = "Record<string, unknown>"))]
    pub preferences: Preferences,
}

impl Identity {
    /// The hard-coded demo placeholder.
    pub fn demo() -> Self {
        Self {
            id: DEMO_USER_ID.to_string(),
            username: "Demo User".to_string(),
            email: Some("demo@fittrack.app".to_string()),
            fitness_goal: Some(FitnessGoal::GeneralFitness),
            preferences: Preferences::default(),
        }
    }

    /// Compose an identity from a session, enriched by the stored profile.
    ///
    /// Profile fields win; absent ones fall back to the session's metadata
    /// username and email.
    pub fn from_session(session: &Session, profile: Option<&UserProfile>) -> Self {
        let user = &session.user;
        let profile_username = profile
            .and_then(|p| p.username.as_deref())
            .filter(|name| !name.trim().is_empty());
        let profile_email = profile.and_then(|p| p.email.as_deref());

        let email = profile_email.or(user.email.as_deref()).map(str::to_string);
        let username = profile_username
            .or(user.user_metadata.username.as_deref())
            .or(email.as_deref())
            .unwrap_or(&user.id)
            .to_string();

        Self {
            id: user.id.clone(),
            username,
            email,
            fitness_goal: profile.and_then(|p| p.fitness_goal),
            preferences: profile.map(|p| p.preferences.clone()).unwrap_or_default(),
        }
    }
}

/// Exactly one of: nobody, the demo placeholder, or a real user.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CurrentIdentity {
    #[default]
    LoggedOut,
    Demo,
    User(Identity),
}

impl CurrentIdentity {
    pub fn identity(&self) -> Option<Identity> {
        match self {
            CurrentIdentity::LoggedOut => None,
            CurrentIdentity::Demo => Some(Identity::demo()),
            CurrentIdentity::User(identity) => Some(identity.clone()),
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, CurrentIdentity::Demo)
    }

    pub fn is_logged_out(&self) -> bool {
        matches!(self, CurrentIdentity::LoggedOut)
    }
}

/// Coarse auth phase, mostly for logging and UI routing.
///
/// A login in flight is not a phase: the identity stays as it was until
/// the provider reports the sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Loading,
    LoggedOut,
    LoggedIn,
    DemoActive,
}

/// Value published by the session synchronizer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub identity: CurrentIdentity,
    /// True until the first identity has been resolved
    pub is_loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: CurrentIdentity::LoggedOut,
            is_loading: true,
        }
    }
}

impl SessionState {
    pub fn settled(identity: CurrentIdentity) -> Self {
        Self {
            identity,
            is_loading: false,
        }
    }

    pub fn phase(&self) -> AuthPhase {
        if self.is_loading {
            return AuthPhase::Loading;
        }
        match self.identity {
            CurrentIdentity::LoggedOut => AuthPhase::LoggedOut,
            CurrentIdentity::Demo => AuthPhase::DemoActive,
            CurrentIdentity::User(_) => AuthPhase::LoggedIn,
        }
    }
}

/// Session state as consumed by the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionView {
    pub current_identity: Option<Identity>,
    pub is_loading: bool,
    pub is_demo: bool,
}

impl From<&SessionState> for SessionView {
    fn from(state: &SessionState) -> Self {
        Self {
            current_identity: state.identity.identity(),
            is_loading: state.is_loading,
            is_demo: state.identity.is_demo(),
        }
    }
}
