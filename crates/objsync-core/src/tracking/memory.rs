// # Memory Tracked Store
//
// In-memory implementation of TrackedStateStore.
//
// ## Crash Behavior
//
// - All tracked state is lost on restart
// - The next pass treats every configured object as untracked: owned
//   objects that still exist remotely are re-created (and the store
//   reports a conflict), adopted ones are simply re-adopted
//
// ## When to Use
//
// - Tests
// - One-shot runs where the remote store is also ephemeral

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;

use crate::identity::ObjectIdentity;
use crate::traits::tracked_store::{TrackedRecord, TrackedStateStore};
use crate::Error;

/// In-memory tracked state store
///
/// Cloning shares the underlying map.
///
/// # Example
///
/// ```rust,no_run
/// use objsync_core::tracking::MemoryTrackedStore;
/// use objsync_core::traits::{TrackedRecord, TrackedStateStore};
/// use objsync_core::{ObjectIdentity, ObservedState, Ownership};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryTrackedStore::new();
///     let id = ObjectIdentity::unscoped("backend", "b1");
///
///     let record = TrackedRecord::new(id.clone(), Ownership::Owned, ObservedState::default());
///     store.put(&record).await?;
///     assert!(store.get(&id).await?.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTrackedStore {
    inner: Arc<RwLock<HashMap<ObjectIdentity, TrackedRecord>>>,
}

impl MemoryTrackedStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked objects
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if nothing is tracked
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl TrackedStateStore for MemoryTrackedStore {
    async fn get(&self, identity: &ObjectIdentity) -> Result<Option<TrackedRecord>, Error> {
        Ok(self.inner.read().await.get(identity).cloned())
    }

    async fn put(&self, record: &TrackedRecord) -> Result<(), Error> {
        self.inner
            .write()
            .await
            .insert(record.identity.clone(), record.clone());
        Ok(())
    }

    async fn remove(&self, identity: &ObjectIdentity) -> Result<(), Error> {
        self.inner.write().await.remove(identity);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ObjectIdentity>, Error> {
        let mut identities: Vec<_> = self.inner.read().await.keys().cloned().collect();
        identities.sort();
        Ok(identities)
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
