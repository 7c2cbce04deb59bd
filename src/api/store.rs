//! In-memory profile store keyed by profile id.
//!
//! Loads hand out owned copies, so a caller can run speculative analysis on a
//! profile without holding the lock or aliasing the stored value.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::core::FinancialProfile;

#[derive(Clone, Default)]
pub struct ProfileStore {
    profiles: Arc<RwLock<HashMap<String, FinancialProfile>>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the profile previously stored under `id`, if any.
    pub async fn save(
        &self,
        id: impl Into<String>,
        profile: FinancialProfile,
    ) -> Option<FinancialProfile> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(id.into(), profile)
    }

    pub async fn load(&self, id: &str) -> Option<FinancialProfile> {
        let profiles = self.profiles.read().await;
        profiles.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> Option<FinancialProfile> {
        let mut profiles = self.profiles.write().await;
        profiles.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }
}
