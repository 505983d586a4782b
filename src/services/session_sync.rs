// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session synchronizer: derives the current identity.
//!
//! The identity combines two sources:
//! - the provider session, enriched with the stored profile
//! - the local demo flag, which wins whenever it is set
//!
//! Every derivation and every direct write runs under one lock, so the
//! published value always reflects the most recent completed resolution.
//! Subscribers observe it through a `watch` channel and are only woken
//! when the value actually changes.

use crate::db::{DemoFlag, ProfileStore};
use crate::models::{AuthEvent, CurrentIdentity, Identity, SessionState};
use crate::services::AuthProvider;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Owner of the current identity value.
pub struct SessionSynchronizer {
    provider: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    demo: DemoFlag,
    state: watch::Sender<SessionState>,
    update_lock: Mutex<()>,
    listener: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SessionSynchronizer {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        demo: DemoFlag,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::default());
        Arc::new(Self {
            provider,
            profiles,
            demo,
            state,
            update_lock: Mutex::new(()),
            listener: std::sync::Mutex::new(None),
        })
    }

    /// Receiver for the published session state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Snapshot of the published session state.
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    // ─── Lifecycle ───────────────────────────────────────────────

    /// Subscribe to provider notifications, then resolve the first identity.
    ///
    /// The listener is attached before resolving so no notification is lost;
    /// any that arrive meanwhile queue behind the initial resolution.
    pub async fn initialize(self: &Arc<Self>) {
        self.start_listener();
        self.refresh().await;
        tracing::info!(phase = ?self.current().phase(), "Session initialized");
    }

    /// Detach from the provider's notification channel.
    pub fn shutdown(&self) {
        let handle = match self.listener.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!("Auth listener stopped");
        }
    }

    fn start_listener(self: &Arc<Self>) {
        let mut events = self.provider.on_auth_state_change();
        let sync: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => Some(event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth listener lagged, resynchronizing");
                        None
                    }
                    Err(RecvError::Closed) => break,
                };

                let Some(sync) = sync.upgrade() else {
                    break;
                };
                match event {
                    Some(event) => sync.on_auth_event(event).await,
                    None => {
                        sync.refresh().await;
                    }
                }
            }
        });

        if let Ok(mut slot) = self.listener.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    // ─── Derivation ──────────────────────────────────────────────

    /// React to a provider notification.
    pub async fn on_auth_event(&self, event: AuthEvent) {
        if !event.triggers_refresh() {
            tracing::debug!(?event, "Ignoring auth event");
            return;
        }
        tracing::debug!(?event, "Auth event, refreshing identity");
        self.refresh().await;
    }

    /// Re-derive and publish the current identity.
    pub async fn refresh(&self) -> CurrentIdentity {
        let _guard = self.update_lock.lock().await;
        let identity = self.resolve().await;
        self.publish(identity.clone());
        identity
    }

    async fn resolve(&self) -> CurrentIdentity {
        match self.demo.is_set() {
            Ok(true) => return CurrentIdentity::Demo,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Demo flag unreadable, treating as unset");
            }
        }

        let session = match self.provider.get_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return CurrentIdentity::LoggedOut,
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed, treating user as logged out");
                return CurrentIdentity::LoggedOut;
            }
        };

        match self.profiles.get_profile(&session.user.id).await {
            Ok(profile) => {
                if profile.is_none() {
                    tracing::debug!(user_id = %session.user.id, "No profile record, using session fields");
                }
                CurrentIdentity::User(Identity::from_session(&session, profile.as_ref()))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    user_id = %session.user.id,
                    "Profile fetch failed, treating user as logged out"
                );
                CurrentIdentity::LoggedOut
            }
        }
    }

    fn publish(&self, identity: CurrentIdentity) {
        let next = SessionState::settled(identity);
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next.clone();
            true
        });

        if changed {
            tracing::info!(phase = ?next.phase(), "Current identity changed");
        }
    }

    // ─── Direct Writes ───────────────────────────────────────────

    /// Publish the demo placeholder.
    pub async fn enter_demo(&self) {
        let _guard = self.update_lock.lock().await;
        self.publish(CurrentIdentity::Demo);
    }

    /// Publish "nobody logged in".
    pub async fn clear(&self) {
        let _guard = self.update_lock.lock().await;
        self.publish(CurrentIdentity::LoggedOut);
    }
}

impl Drop for SessionSynchronizer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
