// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod identity;
pub mod session;
pub mod user;

pub use identity::{AuthPhase, CurrentIdentity, Identity, SessionState, SessionView};
pub use session::{AuthEvent, AuthUser, Session, UserMetadata};
pub use user::{FitnessGoal, Preferences, UserProfile};
