//! Desired and observed attribute states
//!
//! Both sides of a reconciliation pass are attribute-path → typed value
//! maps. A missing entry is equivalent to `Unset` of the attribute's kind.

use crate::error::{Error, Result};
use crate::path::AttributePath;
use crate::schema::{AttributeKind, AttributeSpec, AttributeSpecProvider};
use crate::value::{desired_scalar, desired_set, AttributeValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Attribute path → typed value mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<AttributePath, AttributeValue>);

impl AttributeMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert or replace an attribute value
    pub fn insert(&mut self, path: AttributePath, value: AttributeValue) -> Option<AttributeValue> {
        self.0.insert(path, value)
    }

    /// Get an attribute value
    pub fn get(&self, path: &AttributePath) -> Option<&AttributeValue> {
        self.0.get(path)
    }

    /// Iterate over all attributes in path order
    pub fn iter(&self) -> impl Iterator<Item = (&AttributePath, &AttributeValue)> {
        self.0.iter()
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builder-style insert
    pub fn with(mut self, path: impl Into<AttributePath>, value: AttributeValue) -> Self {
        self.insert(path.into(), value);
        self
    }
}

impl FromIterator<(AttributePath, AttributeValue)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (AttributePath, AttributeValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Target configuration for one object instance
///
/// Immutable input to a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredState(AttributeMap);

impl DesiredState {
    /// Wrap an attribute map
    pub fn new(attributes: AttributeMap) -> Self {
        Self(attributes)
    }

    /// Decode a JSON object using the three-way rule
    ///
    /// A missing key is `Unset`; `null`, `""` and `[]` are `Cleared`.
    /// Keys at any depth that match no managed attribute path are rejected.
    pub fn from_json(
        schema: &dyn AttributeSpecProvider,
        object: &Map<String, Value>,
    ) -> Result<Self> {
        let specs = schema.attributes();
        reject_unknown_keys(schema, specs, &mut Vec::new(), object)?;

        let root = Value::Object(object.clone());
        let mut map = AttributeMap::new();
        for spec in specs {
            let field = spec.path.get(&root);
            let value = match spec.kind {
                AttributeKind::Scalar => desired_scalar(field).map(AttributeValue::Scalar),
                AttributeKind::Set => desired_set(field).map(AttributeValue::Set),
            }
            .map_err(|e| Error::schema(format!("attribute {}: {}", spec.path, e)))?;
            map.insert(spec.path.clone(), value);
        }

        Ok(Self(map))
    }

    /// Borrow the underlying attributes
    pub fn attributes(&self) -> &AttributeMap {
        &self.0
    }

    /// Get one desired attribute
    pub fn get(&self, path: &AttributePath) -> Option<&AttributeValue> {
        self.0.get(path)
    }
}

/// Walk `object` and fail on any key that is neither a managed attribute
/// nor a parent object of one
fn reject_unknown_keys<'a>(
    schema: &dyn AttributeSpecProvider,
    specs: &[AttributeSpec],
    prefix: &mut Vec<&'a str>,
    object: &'a Map<String, Value>,
) -> Result<()> {
    for (key, value) in object {
        prefix.push(key.as_str());

        let mut is_leaf = false;
        let mut is_parent = false;
        for spec in specs {
            let segments: Vec<&str> = spec.path.segments().collect();
            if segments.len() < prefix.len() || segments[..prefix.len()] != prefix[..] {
                continue;
            }
            if segments.len() == prefix.len() {
                is_leaf = true;
            } else {
                is_parent = true;
            }
        }

        let location = prefix.join("/");
        match value {
            _ if is_leaf => {}
            Value::Object(nested) if is_parent => {
                reject_unknown_keys(schema, specs, prefix, nested)?;
            }
            _ if is_parent => {
                return Err(Error::schema(format!(
                    "'{}' for object type {} must be an object",
                    location,
                    schema.object_type()
                )));
            }
            _ => {
                return Err(Error::schema(format!(
                    "unknown attribute '{}' for object type {}",
                    location,
                    schema.object_type()
                )));
            }
        }

        prefix.pop();
    }

    Ok(())
}

/// Last-known remote configuration for one object instance
///
/// Replaced wholesale after every successful read or write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservedState(AttributeMap);

impl ObservedState {
    /// Wrap an attribute map
    pub fn new(attributes: AttributeMap) -> Self {
        Self(attributes)
    }

    /// Borrow the underlying attributes
    pub fn attributes(&self) -> &AttributeMap {
        &self.0
    }

    /// Get one observed attribute
    pub fn get(&self, path: &AttributePath) -> Option<&AttributeValue> {
        self.0.get(path)
    }
}
