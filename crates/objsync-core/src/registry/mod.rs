//! Plugin-based store and schema registry
//!
//! The registry maps store type names to factories and object type names
//! to attribute schemas, so the engine never hardcodes either.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use objsync_core::registry::Registry;
//! use objsync_core::schema::{AttributeSpec, ObjectSchema};
//! use std::sync::Arc;
//!
//! let registry = Registry::with_builtin_stores();
//!
//! registry.register_schema(Arc::new(
//!     ObjectSchema::new("backend").with_attribute(AttributeSpec::scalar("label")),
//! ));
//!
//! let store = registry.create_store(&StoreConfig::default())?;
//! ```
//!
//! ## Registration
//!
//! Store crates register themselves during initialization:
//!
//! ```rust,ignore
//! // In a hypothetical objsync-store-http crate
//! pub fn register(registry: &Registry) {
//!     registry.register_store("http", Box::new(HttpStoreFactory));
//! }
//! ```

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::schema::AttributeSpecProvider;
use crate::traits::{RemoteObjectStore, RemoteObjectStoreFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registry of store factories and object schemas
///
/// ## Thread Safety
///
/// Interior mutability with RwLock: concurrent reads, exclusive writes.
/// Registration takes `&self` so a shared registry can still be extended.
#[derive(Default)]
pub struct Registry {
    /// Registered remote store factories
    stores: RwLock<HashMap<String, Box<dyn RemoteObjectStoreFactory>>>,

    /// Registered schemas, keyed by object type
    schemas: RwLock<HashMap<String, Arc<dyn AttributeSpecProvider>>>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the in-memory store already registered
    pub fn with_builtin_stores() -> Self {
        let registry = Self::new();
        crate::store::memory::register(&registry);
        registry
    }

    /// Register a remote store factory
    ///
    /// # Parameters
    ///
    /// - `name`: Store type name (e.g., "memory", "http")
    /// - `factory`: Factory object for creating store instances
    pub fn register_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn RemoteObjectStoreFactory>,
    ) {
        write(&self.stores).insert(name.into(), factory);
    }

    /// Register the schema for one object type
    ///
    /// A later registration for the same object type replaces the earlier.
    pub fn register_schema(&self, schema: Arc<dyn AttributeSpecProvider>) {
        let object_type = schema.object_type().to_string();
        write(&self.schemas).insert(object_type, schema);
    }

    /// Create a remote store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn RemoteObjectStore>)`: Created store instance
    /// - `Err(Error)`: If the store type is not registered or creation fails
    pub fn create_store(&self, config: &StoreConfig) -> Result<Box<dyn RemoteObjectStore>> {
        let store_type = config.type_name();
        let stores = read(&self.stores);

        let factory = stores
            .get(store_type)
            .ok_or_else(|| Error::config(format!("Unknown store type: {}", store_type)))?;

        factory.create(config)
    }

    /// Look up the schema for an object type
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn AttributeSpecProvider>)`: The registered schema
    /// - `Err(Error::Schema)`: No schema registered for `object_type`
    pub fn schema(&self, object_type: &str) -> Result<Arc<dyn AttributeSpecProvider>> {
        read(&self.schemas).get(object_type).cloned().ok_or_else(|| {
            Error::schema(format!("No schema registered for object type {}", object_type))
        })
    }

    /// List all registered store types
    pub fn list_stores(&self) -> Vec<String> {
        let mut names: Vec<_> = read(&self.stores).keys().cloned().collect();
        names.sort();
        names
    }

    /// List all object types with a registered schema
    pub fn list_schemas(&self) -> Vec<String> {
        let mut names: Vec<_> = read(&self.schemas).keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a store type is registered
    pub fn has_store(&self, name: &str) -> bool {
        read(&self.stores).contains_key(name)
    }

    /// Check if an object type has a schema
    pub fn has_schema(&self, object_type: &str) -> bool {
        read(&self.schemas).contains_key(object_type)
    }
}

// Registration never panics while holding a lock, so a poisoned lock still
// guards a consistent map.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
