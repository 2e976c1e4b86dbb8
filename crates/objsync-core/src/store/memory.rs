// # In-Memory Object Store
//
// A `RemoteObjectStore` that keeps objects in a process-local map and
// applies operations the way a configuration server would.
//
// ## Semantics
//
// - `create` fails with `Conflict` if the identity already exists
// - `patch` applies the whole batch or nothing; an empty batch is rejected
// - Attributes set to `null`, `""` or `[]` are dropped from the stored
//   object, like a server that does not echo empty fields
// - Every successful write bumps the object's revision

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::StoreConfig;
use crate::identity::ObjectIdentity;
use crate::operation::{OpKind, Operation};
use crate::registry::Registry;
use crate::traits::{ListFilter, RawObject, RemoteObjectStore, RemoteObjectStoreFactory};
use crate::Error;

const STORE_NAME: &str = "memory";

#[derive(Debug, Clone)]
struct StoredObject {
    attributes: Value,
    revision: u64,
}

/// In-process remote object store
///
/// Cloning shares the underlying objects, so a test can keep a handle for
/// out-of-band changes while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<HashMap<ObjectIdentity, StoredObject>>>,
}

impl InMemoryObjectStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding pre-existing objects
    ///
    /// # Parameters
    ///
    /// - `objects`: identity and raw attributes of each object
    pub fn with_objects<I>(objects: I) -> Self
    where
        I: IntoIterator<Item = (ObjectIdentity, Value)>,
    {
        let objects = objects
            .into_iter()
            .map(|(identity, mut attributes)| {
                prune(&mut attributes);
                (identity, StoredObject { attributes, revision: 1 })
            })
            .collect();

        Self {
            objects: Arc::new(RwLock::new(objects)),
        }
    }

    /// Insert or overwrite an object out of band
    pub async fn seed(&self, identity: ObjectIdentity, mut attributes: Value) {
        prune(&mut attributes);
        let mut objects = self.objects.write().await;
        let revision = objects.get(&identity).map_or(1, |o| o.revision + 1);
        objects.insert(identity, StoredObject { attributes, revision });
    }

    /// Remove an object out of band
    pub async fn evict(&self, identity: &ObjectIdentity) -> bool {
        self.objects.write().await.remove(identity).is_some()
    }

    /// Stored attributes of an object, if it exists
    pub async fn snapshot(&self, identity: &ObjectIdentity) -> Option<Value> {
        self.objects.read().await.get(identity).map(|o| o.attributes.clone())
    }

    /// Current revision of an object
    pub async fn revision(&self, identity: &ObjectIdentity) -> Option<u64> {
        self.objects.read().await.get(identity).map(|o| o.revision)
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Check if the store holds no objects
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl RemoteObjectStore for InMemoryObjectStore {
    async fn get(&self, identity: &ObjectIdentity) -> Result<RawObject, Error> {
        self.objects
            .read()
            .await
            .get(identity)
            .map(|o| o.attributes.clone())
            .ok_or_else(|| Error::not_found(identity.to_string()))
    }

    async fn create(
        &self,
        identity: &ObjectIdentity,
        initial_attributes: RawObject,
    ) -> Result<RawObject, Error> {
        if !initial_attributes.is_object() {
            return Err(Error::store(STORE_NAME, "initial attributes must be a JSON object"));
        }

        let mut objects = self.objects.write().await;
        if objects.contains_key(identity) {
            return Err(Error::conflict(format!("{} already exists", identity)));
        }

        let mut attributes = initial_attributes;
        prune(&mut attributes);
        objects.insert(
            identity.clone(),
            StoredObject {
                attributes: attributes.clone(),
                revision: 1,
            },
        );

        tracing::debug!("memory: created {}", identity);
        Ok(attributes)
    }

    async fn patch(
        &self,
        identity: &ObjectIdentity,
        operations: &[Operation],
    ) -> Result<RawObject, Error> {
        if operations.is_empty() {
            return Err(Error::store(STORE_NAME, format!("empty patch for {}", identity)));
        }

        let mut objects = self.objects.write().await;
        let stored = objects
            .get_mut(identity)
            .ok_or_else(|| Error::not_found(identity.to_string()))?;

        let mut attributes = stored.attributes.clone();
        for op in operations {
            apply(&mut attributes, op)?;
        }
        prune(&mut attributes);

        stored.attributes = attributes.clone();
        stored.revision += 1;

        tracing::debug!(
            "memory: patched {} with {} operation(s), revision {}",
            identity,
            operations.len(),
            stored.revision
        );
        Ok(attributes)
    }

    async fn delete(&self, identity: &ObjectIdentity) -> Result<(), Error> {
        match self.objects.write().await.remove(identity) {
            Some(_) => {
                tracing::debug!("memory: deleted {}", identity);
                Ok(())
            }
            None => Err(Error::not_found(identity.to_string())),
        }
    }

    async fn list(
        &self,
        object_type: &str,
        scopes: &[String],
        filter: Option<&ListFilter>,
    ) -> Result<Vec<(ObjectIdentity, RawObject)>, Error> {
        let objects = self.objects.read().await;
        let mut found: Vec<_> = objects
            .iter()
            .filter(|(id, _)| id.is_under(object_type, scopes))
            .filter(|(id, _)| filter.is_none_or(|f| f.matches(&id.name)))
            .map(|(id, o)| (id.clone(), o.attributes.clone()))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }

    fn store_name(&self) -> &'static str {
        STORE_NAME
    }
}

/// Apply one operation to a working copy
fn apply(attributes: &mut Value, op: &Operation) -> Result<(), Error> {
    let (path, member) = op.target();

    match (op.op, member) {
        (OpKind::Replace, None) => {
            let value = op.value.clone().ok_or_else(|| {
                Error::store(STORE_NAME, format!("replace of {} carries no value", path))
            })?;
            path.set(attributes, value);
        }
        (OpKind::Remove, None) => {
            path.remove(attributes);
        }
        (OpKind::Add, Some(member)) => {
            let mut members = members_at(attributes, &path)?;
            if !members.iter().any(|m| m.as_str() == Some(member)) {
                members.push(Value::String(member.to_string()));
            }
            path.set(attributes, Value::Array(members));
        }
        (OpKind::Remove, Some(member)) => {
            let mut members = members_at(attributes, &path)?;
            members.retain(|m| m.as_str() != Some(member));
            path.set(attributes, Value::Array(members));
        }
        (kind, _) => {
            return Err(Error::store(
                STORE_NAME,
                format!("unsupported operation {} on {}", kind, op.path),
            ));
        }
    }

    Ok(())
}

fn members_at(attributes: &Value, path: &crate::path::AttributePath) -> Result<Vec<Value>, Error> {
    match path.get(attributes) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(members)) => Ok(members.clone()),
        Some(other) => Err(Error::store(
            STORE_NAME,
            format!("{} is not a set (found {})", path, other),
        )),
    }
}

/// Drop empty fields, recursing into nested objects
fn prune(value: &mut Value) {
    if let Value::Object(map) = value {
        for nested in map.values_mut() {
            prune(nested);
        }
        map.retain(|_, v| match v {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
            _ => true,
        });
    }
}

/// Factory for [`InMemoryObjectStore`]
pub struct MemoryStoreFactory;

impl RemoteObjectStoreFactory for MemoryStoreFactory {
    fn create(&self, config: &StoreConfig) -> Result<Box<dyn RemoteObjectStore>, Error> {
        match config {
            StoreConfig::Memory { objects } => Ok(Box::new(InMemoryObjectStore::with_objects(
                objects
                    .iter()
                    .map(|seed| (seed.identity.clone(), seed.attributes.clone())),
            ))),
            other => Err(Error::config(format!(
                "memory store factory cannot build a {} store",
                other.type_name()
            ))),
        }
    }
}

/// Register the in-memory store with a registry
pub fn register(registry: &Registry) {
    registry.register_store(STORE_NAME, Box::new(MemoryStoreFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::AttributePath;
    use serde_json::json;

    fn idx() -> ObjectIdentity {
        ObjectIdentity::new("index", vec!["b1".into()], "idx1")
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let store = InMemoryObjectStore::new();
        let created = store
            .create(&idx(), json!({"name": "idx1", "cacheMode": ""}))
            .await
            .unwrap();
        assert_eq!(created, json!({"name": "idx1"}));
        assert_eq!(store.get(&idx()).await.unwrap(), json!({"name": "idx1"}));
        assert_eq!(store.revision(&idx()).await, Some(1));

        store.delete(&idx()).await.unwrap();
        assert!(store.get(&idx()).await.unwrap_err().is_not_found());
        assert!(store.delete(&idx()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_create_existing_conflicts() {
        let store = InMemoryObjectStore::with_objects([(idx(), json!({"name": "idx1"}))]);
        let err = store.create(&idx(), json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_patch_applies_members_and_scalars() {
        let store = InMemoryObjectStore::with_objects([(
            idx(),
            json!({"name": "idx1", "cacheMode": "lru", "tags": ["y", "z"]}),
        )]);
        let tags = AttributePath::new("tags");
        let ops = vec![
            Operation::remove(&AttributePath::new("cacheMode")),
            Operation::add_member(&tags, "x"),
            Operation::remove_member(&tags, "z"),
        ];

        let patched = store.patch(&idx(), &ops).await.unwrap();
        assert_eq!(patched, json!({"name": "idx1", "tags": ["y", "x"]}));
        assert_eq!(store.revision(&idx()).await, Some(2));
    }

    #[tokio::test]
    async fn test_patch_nested_replace() {
        let store = InMemoryObjectStore::with_objects([(idx(), json!({"name": "idx1"}))]);
        let ops = vec![Operation::replace(&AttributePath::new("settings/cacheMode"), json!("lru"))];

        let patched = store.patch(&idx(), &ops).await.unwrap();
        assert_eq!(patched["settings"]["cacheMode"], json!("lru"));
    }

    #[tokio::test]
    async fn test_removing_last_member_drops_set() {
        let store = InMemoryObjectStore::with_objects([(idx(), json!({"tags": ["z"]}))]);
        let ops = vec![Operation::remove_member(&AttributePath::new("tags"), "z")];
        assert_eq!(store.patch(&idx(), &ops).await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_empty_patch_rejected() {
        let store = InMemoryObjectStore::with_objects([(idx(), json!({}))]);
        let err = store.patch(&idx(), &[]).await.unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
        assert_eq!(store.revision(&idx()).await, Some(1));
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_object_untouched() {
        let store = InMemoryObjectStore::with_objects([(idx(), json!({"name": "idx1"}))]);
        let ops = vec![
            Operation::replace(&AttributePath::new("label"), json!("a")),
            Operation::add_member(&AttributePath::new("name"), "x"),
        ];
        assert!(store.patch(&idx(), &ops).await.is_err());
        assert_eq!(store.get(&idx()).await.unwrap(), json!({"name": "idx1"}));
    }

    #[tokio::test]
    async fn test_list_by_scope_and_prefix() {
        let store = InMemoryObjectStore::with_objects([
            (idx(), json!({})),
            (ObjectIdentity::new("index", vec!["b1".into()], "other"), json!({})),
            (ObjectIdentity::new("index", vec!["b2".into()], "idx9"), json!({})),
            (ObjectIdentity::unscoped("backend", "b1"), json!({})),
        ]);

        let all = store.list("index", &["b1".to_string()], None).await.unwrap();
        assert_eq!(all.len(), 2);

        let filter = ListFilter::name_prefix("idx");
        let some = store
            .list("index", &["b1".to_string()], Some(&filter))
            .await
            .unwrap();
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].0, idx());
    }

    #[test]
    fn test_factory_builds_seeded_store() {
        let config = StoreConfig::Memory {
            objects: vec![crate::config::SeedObject {
                identity: ObjectIdentity::unscoped("settings", "global"),
                attributes: json!({"label": "x"}),
            }],
        };
        let store = MemoryStoreFactory.create(&config).unwrap();
        assert_eq!(store.store_name(), "memory");

        let id = ObjectIdentity::unscoped("settings", "global");
        let raw = tokio_test::block_on(store.get(&id)).unwrap();
        assert_eq!(raw, json!({"label": "x"}));
    }
}
