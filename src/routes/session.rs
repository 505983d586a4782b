// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session state routes: snapshot and live updates.

use crate::models::SessionView;
use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures_util::stream::{self, Stream};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/events", get(session_events))
}

/// Current session state.
async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    Json(SessionView::from(&state.sync.current()))
}

/// Server-sent events: the current state first, then one event per change.
async fn session_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.sync.subscribe();

    let updates = stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            // Synchronizer dropped
            return None;
        }
        let view = SessionView::from(&*rx.borrow_and_update());
        let event = Event::default().event("session").json_data(view);
        Some((event, (rx, false)))
    });

    Sse::new(updates).keep_alive(KeepAlive::default())
}
