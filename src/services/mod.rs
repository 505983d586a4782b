// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - session logic layer.

pub mod auth_client;
pub mod gateway;
pub mod provider;
pub mod session_sync;

pub use auth_client::AuthClient;
pub use gateway::{AuthFailure, AuthGateway, CommandResult, EntryPoint, LoginRequest, RegisterRequest};
pub use provider::AuthProvider;
pub use session_sync::SessionSynchronizer;
