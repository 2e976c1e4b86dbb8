// # Remote Object Store Trait
//
// Defines the interface the engine uses to reach the remote configuration
// server. Transport, authentication and wire serialization all live behind
// this trait.
//
// ## Implementations
//
// - In-memory: `objsync_core::store::InMemoryObjectStore`
// - HTTP/REST clients live outside this crate
//
// ## Usage
//
// ```rust,ignore
// use objsync_core::{ObjectIdentity, RemoteObjectStore};
//
// async fn show(store: &dyn RemoteObjectStore) -> objsync_core::Result<()> {
//     let id = ObjectIdentity::new("index", vec!["b1".into()], "idx1");
//     let raw = store.get(&id).await?;
//     println!("{}", raw);
//     Ok(())
// }
// ```

use crate::config::StoreConfig;
use crate::identity::ObjectIdentity;
use crate::operation::Operation;
use async_trait::async_trait;
use serde_json::Value;

/// Raw remote object as returned by the store
pub type RawObject = Value;

/// Optional filter for [`RemoteObjectStore::list`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Only return objects whose name starts with this prefix
    pub name_prefix: Option<String>,
}

impl ListFilter {
    /// Filter by name prefix
    pub fn name_prefix(prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: Some(prefix.into()),
        }
    }

    /// Check whether an object name passes the filter
    pub fn matches(&self, name: &str) -> bool {
        self.name_prefix
            .as_deref()
            .is_none_or(|prefix| name.starts_with(prefix))
    }
}

/// Trait for remote object store implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe: distinct object instances may be
/// reconciled concurrently by independent callers.
///
/// ## Allowed Capabilities
/// - ✅ Perform network calls to the configuration server
/// - ✅ Serialize operations to the server's patch format
/// - ✅ Map HTTP statuses to [`crate::Error`] variants
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (errors are surfaced immediately)
/// - ❌ Decide whether a patch is needed (owned by the operation builder)
/// - ❌ Interpret "not found" (owned by the lifecycle controller)
///
/// A missing object must be reported as [`crate::Error::NotFound`]; every
/// other failure propagates to the caller unmodified.
#[async_trait]
pub trait RemoteObjectStore: Send + Sync {
    /// Fetch one object
    ///
    /// # Returns
    ///
    /// - `Ok(RawObject)`: The object's current remote representation
    /// - `Err(Error::NotFound)`: The object does not exist
    /// - `Err(Error)`: Transport or authentication failure
    async fn get(&self, identity: &ObjectIdentity) -> Result<RawObject, crate::Error>;

    /// Create one object from its initial attributes
    ///
    /// # Returns
    ///
    /// The created object as the server reports it.
    async fn create(
        &self,
        identity: &ObjectIdentity,
        initial_attributes: RawObject,
    ) -> Result<RawObject, crate::Error>;

    /// Apply an ordered batch of operations atomically
    ///
    /// Callers never send an empty batch.
    ///
    /// # Returns
    ///
    /// The patched object as the server reports it.
    async fn patch(
        &self,
        identity: &ObjectIdentity,
        operations: &[Operation],
    ) -> Result<RawObject, crate::Error>;

    /// Delete one object
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Deleted
    /// - `Err(Error::NotFound)`: The object was already gone
    /// - `Err(Error)`: Transport or authentication failure
    async fn delete(&self, identity: &ObjectIdentity) -> Result<(), crate::Error>;

    /// List objects of `object_type` under the given parent scopes
    async fn list(
        &self,
        object_type: &str,
        scopes: &[String],
        filter: Option<&ListFilter>,
    ) -> Result<Vec<(ObjectIdentity, RawObject)>, crate::Error>;

    /// Store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}

/// Helper trait for constructing remote object stores from configuration
pub trait RemoteObjectStoreFactory: Send + Sync {
    /// Create a RemoteObjectStore instance from configuration
    fn create(&self, config: &StoreConfig) -> Result<Box<dyn RemoteObjectStore>, crate::Error>;
}
