// # Tracked State Store Trait
//
// Defines the interface for persisting what the engine last observed for
// every managed object.
//
// ## Purpose
//
// The tracked store is what makes reconciliation incremental across runs:
// - An identity with no record is created (or adopted) on the next pass
// - An identity with a record is read and patched
// - A record is dropped when the object is deleted, released, or found
//   missing out of band
//
// ## Implementations
//
// - Memory: `MemoryTrackedStore`
// - File: `FileTrackedStore` (JSON, atomic writes)

use crate::attributes::ObservedState;
use crate::identity::ObjectIdentity;
use crate::lifecycle::Ownership;
use async_trait::async_trait;

/// Tracked state for one managed object
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackedRecord {
    /// Object identity
    pub identity: ObjectIdentity,
    /// Ownership mode the object is managed under
    pub ownership: Ownership,
    /// Last normalized observed state
    pub observed: ObservedState,
    /// Timestamp of the last successful read or write
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

impl TrackedRecord {
    /// Create a record stamped with the current time
    pub fn new(identity: ObjectIdentity, ownership: Ownership, observed: ObservedState) -> Self {
        Self {
            identity,
            ownership,
            observed,
            last_updated: chrono::Utc::now(),
        }
    }
}

/// Trait for tracked state store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Cache state in memory (with explicit flush)
///
/// ## Forbidden Capabilities
/// - ❌ Call the remote object store (owned by `LifecycleController`)
/// - ❌ Decide what to reconcile (owned by `Reconciler`)
#[async_trait]
pub trait TrackedStateStore: Send + Sync {
    /// Get the tracked record for an identity
    ///
    /// # Returns
    ///
    /// - `Ok(Some(TrackedRecord))`: The object is tracked
    /// - `Ok(None)`: The object is not tracked
    /// - `Err(Error)`: Storage error
    async fn get(&self, identity: &ObjectIdentity) -> Result<Option<TrackedRecord>, crate::Error>;

    /// Create or replace the tracked record for its identity
    async fn put(&self, record: &TrackedRecord) -> Result<(), crate::Error>;

    /// Stop tracking an identity
    ///
    /// Removing an identity that is not tracked succeeds.
    async fn remove(&self, identity: &ObjectIdentity) -> Result<(), crate::Error>;

    /// List all tracked identities
    async fn list(&self) -> Result<Vec<ObjectIdentity>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
