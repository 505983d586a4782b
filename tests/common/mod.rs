// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use fittrack_session::config::Config;
use fittrack_session::db::{FirestoreDb, LocalStore, MemoryProfileStore, MemoryStore, ProfileStore};
use fittrack_session::error::AppError;
use fittrack_session::models::{AuthEvent, AuthUser, Session, SessionState, UserMetadata, UserProfile};
use fittrack_session::routes::create_router;
use fittrack_session::services::AuthProvider;
use fittrack_session::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

// ─── Fake Auth Provider ──────────────────────────────────────────

struct Account {
    password: String,
    user: AuthUser,
}

/// In-memory auth provider that behaves like the hosted one.
#[allow(dead_code)]
pub struct FakeAuthProvider {
    accounts: Mutex<HashMap<String, Account>>,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    next_id: AtomicUsize,
    pub fail_session_lookup: AtomicBool,
    pub fail_sign_out: AtomicBool,
    pub fail_delete: AtomicBool,
    pub session_lookups: AtomicUsize,
}

#[allow(dead_code)]
impl FakeAuthProvider {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(32);
        Arc::new(Self {
            accounts: Mutex::new(HashMap::new()),
            session: Mutex::new(None),
            events,
            next_id: AtomicUsize::new(1),
            fail_session_lookup: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            session_lookups: AtomicUsize::new(0),
        })
    }

    /// Register an account directly (no events).
    pub fn add_account(&self, email: &str, password: &str, username: Option<&str>) -> AuthUser {
        let id = format!("user-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let user = AuthUser {
            id,
            email: Some(email.to_string()),
            user_metadata: UserMetadata {
                username: username.map(str::to_string),
            },
        };
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Install a session as if restored from storage (no events).
    pub fn restore_session(&self, email: &str) -> Session {
        let user = self.accounts.lock().unwrap()[email].user.clone();
        let session = session_for(user);
        *self.session.lock().unwrap() = Some(session.clone());
        session
    }

    pub fn has_account(&self, email: &str) -> bool {
        self.accounts.lock().unwrap().contains_key(email)
    }

    pub fn has_session(&self) -> bool {
        self.session.lock().unwrap().is_some()
    }

    pub fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }
}

fn session_for(user: AuthUser) -> Session {
    Session {
        access_token: format!("access-{}", user.id),
        refresh_token: format!("refresh-{}", user.id),
        expires_at: chrono::Utc::now().timestamp() + 3600,
        user,
    }
}

#[async_trait]
impl AuthProvider for FakeAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let user = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => {
                    return Err(AppError::AuthProvider(
                        "Invalid login credentials".to_string(),
                    ))
                }
            }
        };

        let session = session_for(user);
        *self.session.lock().unwrap() = Some(session.clone());
        self.emit(AuthEvent::SignedIn);
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<AuthUser, AppError> {
        if self.has_account(email) {
            return Err(AppError::AuthProvider(
                "User already registered".to_string(),
            ));
        }

        let user = self.add_account(email, password, metadata.username.as_deref());
        *self.session.lock().unwrap() = Some(session_for(user.clone()));
        self.emit(AuthEvent::SignedIn);
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AppError::AuthProvider("Network request failed".to_string()));
        }
        *self.session.lock().unwrap() = None;
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn delete_user(&self) -> Result<(), AppError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::AuthProvider(
                "Account deletion is temporarily unavailable".to_string(),
            ));
        }
        let Some(session) = self.session.lock().unwrap().take() else {
            return Err(AppError::AuthProvider("Not signed in".to_string()));
        };
        self.accounts
            .lock()
            .unwrap()
            .retain(|_, account| account.user.id != session.user.id);
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, AppError> {
        self.session_lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_session_lookup.load(Ordering::SeqCst) {
            return Err(AppError::AuthProvider("Network request failed".to_string()));
        }
        Ok(self.session.lock().unwrap().clone())
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

// ─── Fault-injecting stores ──────────────────────────────────────

/// Profile store with switchable failures and call counters.
#[allow(dead_code)]
pub struct FlakyProfileStore {
    inner: MemoryProfileStore,
    pub fail_reads: AtomicBool,
    /// Number of upcoming writes that fail
    pub failing_writes: AtomicU32,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

#[allow(dead_code)]
impl FlakyProfileStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryProfileStore::new(),
            fail_reads: AtomicBool::new(false),
            failing_writes: AtomicU32::new(0),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        })
    }

    pub async fn seed(&self, profile: UserProfile) {
        self.inner.upsert_profile(&profile).await.unwrap();
    }

    pub async fn stored(&self, user_id: &str) -> Option<UserProfile> {
        self.inner.get_profile(user_id).await.unwrap()
    }
}

#[async_trait]
impl ProfileStore for FlakyProfileStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Database("connection reset".to_string()));
        }
        self.inner.get_profile(user_id).await
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(AppError::Database("permission denied for table profiles".to_string()));
        }
        self.inner.upsert_profile(profile).await
    }

    async fn delete_profile(&self, user_id: &str) -> Result<(), AppError> {
        self.inner.delete_profile(user_id).await
    }
}

/// Local store whose writes can be switched off.
#[allow(dead_code)]
pub struct ReadOnlyStore {
    inner: MemoryStore,
    pub reject_writes: AtomicBool,
}

#[allow(dead_code)]
impl ReadOnlyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            reject_writes: AtomicBool::new(false),
        })
    }
}

impl LocalStore for ReadOnlyStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(AppError::LocalStorage("Storage quota exceeded".to_string()));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(AppError::LocalStorage("Storage quota exceeded".to_string()));
        }
        self.inner.remove(key)
    }
}

// ─── Harness ─────────────────────────────────────────────────────

/// Application wired to fakes, with handles to every collaborator.
#[allow(dead_code)]
pub struct TestHarness {
    pub provider: Arc<FakeAuthProvider>,
    pub profiles: Arc<FlakyProfileStore>,
    pub store: Arc<ReadOnlyStore>,
    pub state: Arc<AppState>,
}

#[allow(dead_code)]
pub fn harness() -> TestHarness {
    let provider = FakeAuthProvider::new();
    let profiles = FlakyProfileStore::new();
    let store = ReadOnlyStore::new();

    let mut state = AppState::new(
        Config::default(),
        provider.clone(),
        profiles.clone(),
        store.clone(),
    );
    state.gateway = state.gateway.clone().with_retry_backoff(Duration::ZERO);

    TestHarness {
        provider,
        profiles,
        store,
        state: Arc::new(state),
    }
}

/// Create a test app with fake dependencies, already initialized.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, TestHarness) {
    let harness = harness();
    harness.state.initialize().await;
    (create_router(harness.state.clone()), harness)
}

/// Wait until the published state satisfies `pred`.
#[allow(dead_code)]
pub async fn wait_for<F>(rx: &mut watch::Receiver<SessionState>, pred: F) -> SessionState
where
    F: FnMut(&SessionState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(pred))
        .await
        .expect("timed out waiting for session state")
        .expect("synchronizer dropped")
        .clone()
}

#[allow(dead_code)]
pub fn profile(id: &str, username: &str, email: &str) -> UserProfile {
    UserProfile::new(id, username, email, "2026-01-01T00:00:00Z".to_string())
}
