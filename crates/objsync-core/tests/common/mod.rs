//! Test doubles and common utilities for contract tests
//!
//! `RecordingStore` wraps the in-memory store and counts every remote call,
//! so tests can assert not only on results but on which writes happened.

#![allow(dead_code)]

use objsync_core::error::{Error, Result};
use objsync_core::registry::Registry;
use objsync_core::schema::{AttributeSpec, ObjectSchema};
use objsync_core::store::InMemoryObjectStore;
use objsync_core::traits::{ListFilter, RawObject, RemoteObjectStore};
use objsync_core::{DesiredState, ObjectIdentity, Operation};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Remote call kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Get,
    Create,
    Patch,
    Delete,
}

#[derive(Default)]
struct CallCounts {
    get: AtomicUsize,
    create: AtomicUsize,
    patch: AtomicUsize,
    delete: AtomicUsize,
}

/// A RemoteObjectStore that records calls
///
/// Clones share counters and objects.
#[derive(Clone, Default)]
pub struct RecordingStore {
    inner: InMemoryObjectStore,
    counts: Arc<CallCounts>,
    patches: Arc<Mutex<Vec<Vec<Operation>>>>,
    failure: Arc<Mutex<Option<(Call, String)>>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding pre-existing objects
    pub fn with_objects<I>(objects: I) -> Self
    where
        I: IntoIterator<Item = (ObjectIdentity, Value)>,
    {
        Self {
            inner: InMemoryObjectStore::with_objects(objects),
            ..Self::default()
        }
    }

    /// Underlying store, for out-of-band changes
    pub fn inner(&self) -> &InMemoryObjectStore {
        &self.inner
    }

    /// Make the next call of the given kind fail with a transport error
    pub fn fail_next(&self, call: Call, message: &str) {
        *self.failure.lock().unwrap() = Some((call, message.to_string()));
    }

    pub fn gets(&self) -> usize {
        self.counts.get.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.counts.create.load(Ordering::SeqCst)
    }

    pub fn patch_calls(&self) -> usize {
        self.counts.patch.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.counts.delete.load(Ordering::SeqCst)
    }

    /// Number of write calls (create + patch + delete)
    pub fn writes(&self) -> usize {
        self.creates() + self.patch_calls() + self.deletes()
    }

    /// Number of remote calls of any kind
    pub fn total_calls(&self) -> usize {
        self.gets() + self.writes()
    }

    /// Every operation batch sent so far
    pub fn sent_patches(&self) -> Vec<Vec<Operation>> {
        self.patches.lock().unwrap().clone()
    }

    fn enter(&self, call: Call) -> Result<()> {
        let counter = match call {
            Call::Get => &self.counts.get,
            Call::Create => &self.counts.create,
            Call::Patch => &self.counts.patch,
            Call::Delete => &self.counts.delete,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let mut failure = self.failure.lock().unwrap();
        if failure.as_ref().is_some_and(|(c, _)| *c == call) {
            let (_, message) = failure.take().unwrap();
            return Err(Error::transport(message));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RemoteObjectStore for RecordingStore {
    async fn get(&self, identity: &ObjectIdentity) -> Result<RawObject> {
        self.enter(Call::Get)?;
        self.inner.get(identity).await
    }

    async fn create(
        &self,
        identity: &ObjectIdentity,
        initial_attributes: RawObject,
    ) -> Result<RawObject> {
        self.enter(Call::Create)?;
        self.inner.create(identity, initial_attributes).await
    }

    async fn patch(
        &self,
        identity: &ObjectIdentity,
        operations: &[Operation],
    ) -> Result<RawObject> {
        self.enter(Call::Patch)?;
        self.patches.lock().unwrap().push(operations.to_vec());
        self.inner.patch(identity, operations).await
    }

    async fn delete(&self, identity: &ObjectIdentity) -> Result<()> {
        self.enter(Call::Delete)?;
        self.inner.delete(identity).await
    }

    async fn list(
        &self,
        object_type: &str,
        scopes: &[String],
        filter: Option<&ListFilter>,
    ) -> Result<Vec<(ObjectIdentity, RawObject)>> {
        self.inner.list(object_type, scopes, filter).await
    }

    fn store_name(&self) -> &'static str {
        "recording"
    }
}

/// Search index scoped under a backend
pub fn index_schema() -> ObjectSchema {
    ObjectSchema::new("index")
        .scoped_under("backend")
        .with_attribute(AttributeSpec::scalar("name").required())
        .with_attribute(AttributeSpec::scalar("cacheMode"))
        .with_attribute(AttributeSpec::set("tags"))
}

/// Top-level backend
pub fn backend_schema() -> ObjectSchema {
    ObjectSchema::new("backend").with_attribute(AttributeSpec::scalar("label"))
}

/// Singleton settings object (always adopted)
pub fn settings_schema() -> ObjectSchema {
    ObjectSchema::new("settings")
        .with_attribute(AttributeSpec::scalar("label"))
        .with_attribute(AttributeSpec::scalar("retention"))
        .with_attribute(AttributeSpec::set("tags"))
}

/// Registry with every test schema
pub fn registry() -> Arc<Registry> {
    let registry = Registry::with_builtin_stores();
    registry.register_schema(Arc::new(index_schema()));
    registry.register_schema(Arc::new(backend_schema()));
    registry.register_schema(Arc::new(settings_schema()));
    Arc::new(registry)
}

/// Decode a desired state from a JSON object literal
pub fn desired(schema: &ObjectSchema, attributes: Value) -> DesiredState {
    DesiredState::from_json(schema, attributes.as_object().expect("object literal"))
        .expect("desired state decodes")
}

pub fn idx1() -> ObjectIdentity {
    ObjectIdentity::new("index", vec!["b1".into()], "idx1")
}

pub fn global_settings() -> ObjectIdentity {
    ObjectIdentity::unscoped("settings", "global")
}
