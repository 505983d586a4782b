//! Storage layer: profile records and client-local state.

pub mod firestore;
pub mod local;
pub mod memory;

pub use firestore::FirestoreDb;
pub use local::{DemoFlag, FileStore, LocalStore, MemoryStore, DEMO_FLAG_KEY};
pub use memory::MemoryProfileStore;

use crate::error::AppError;
use crate::models::UserProfile;
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// User profiles (keyed by provider user id)
    pub const PROFILES: &str = "profiles";
}

/// Keyed access to user profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError>;
    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), AppError>;
    async fn delete_profile(&self, user_id: &str) -> Result<(), AppError>;
}
