// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FitTrack session core.
//!
//! Derives "who is logged in" from the hosted auth provider and the local
//! demo flag, exposes it as a reactive value, and provides the auth commands
//! (login, register, logout, demo login, account deletion) the fitness UI
//! calls. A small HTTP surface serves both to the frontend.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::{DemoFlag, LocalStore, ProfileStore};
use services::{AuthGateway, AuthProvider, SessionSynchronizer};
use std::sync::Arc;

/// Shared application state, built once at the application root.
pub struct AppState {
    pub config: Config,
    pub sync: Arc<SessionSynchronizer>,
    pub gateway: AuthGateway,
}

impl AppState {
    /// Wire the synchronizer and gateway to their collaborators.
    pub fn new(
        config: Config,
        provider: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        local_store: Arc<dyn LocalStore>,
    ) -> Self {
        let demo = DemoFlag::new(local_store);
        let sync = SessionSynchronizer::new(provider.clone(), profiles.clone(), demo.clone());
        let gateway = AuthGateway::new(
            provider,
            profiles,
            demo,
            sync.clone(),
            config.profile_write_attempts,
        );

        Self {
            config,
            sync,
            gateway,
        }
    }

    /// Resolve the first identity and start following provider events.
    pub async fn initialize(&self) {
        self.sync.initialize().await;
    }

    pub fn shutdown(&self) {
        self.sync.shutdown();
    }
}
