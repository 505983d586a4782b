//! In-process profile store.

use crate::db::ProfileStore;
use crate::error::AppError;
use crate::models::UserProfile;
use async_trait::async_trait;
use dashmap::DashMap;

/// Profile store backed by a concurrent map. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: DashMap<String, UserProfile>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        Ok(self.profiles.get(user_id).map(|p| p.value().clone()))
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn delete_profile(&self, user_id: &str) -> Result<(), AppError> {
        self.profiles.remove(user_id);
        Ok(())
    }
}
