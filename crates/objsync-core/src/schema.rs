//! Attribute schemas
//!
//! The per-object-type schema layer supplies the ordered attribute list the
//! operation builder walks, plus the mapping from a raw remote object to a
//! typed attribute map. [`ObjectSchema`] covers the common case of a JSON
//! object addressed by attribute path; object types with unusual wire
//! shapes implement [`AttributeSpecProvider`] themselves.

use crate::attributes::AttributeMap;
use crate::error::Result;
use crate::path::AttributePath;
use crate::value::{remote_scalar, remote_set, AttributeValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a managed attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    /// Optional scalar (string/int/bool)
    Scalar,
    /// Multi-valued set of strings
    Set,
}

/// One managed attribute of an object type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    /// Attribute path
    pub path: AttributePath,
    /// Attribute kind
    pub kind: AttributeKind,
    /// Whether the attribute must be present in a create payload
    #[serde(default)]
    pub required_at_create: bool,
}

impl AttributeSpec {
    /// Optional scalar attribute
    pub fn scalar(path: impl Into<AttributePath>) -> Self {
        Self {
            path: path.into(),
            kind: AttributeKind::Scalar,
            required_at_create: false,
        }
    }

    /// Set attribute
    pub fn set(path: impl Into<AttributePath>) -> Self {
        Self {
            path: path.into(),
            kind: AttributeKind::Set,
            required_at_create: false,
        }
    }

    /// Mark the attribute as required in create payloads
    pub fn required(mut self) -> Self {
        self.required_at_create = true;
        self
    }
}

/// Schema source for one object type
///
/// # Thread Safety
///
/// Providers are shared across reconciliation passes and must be usable
/// from several tasks at once.
pub trait AttributeSpecProvider: Send + Sync {
    /// Object type name (e.g. "index")
    fn object_type(&self) -> &str;

    /// Names of the parent scopes, outermost first (e.g. `["backend"]`)
    fn parent_scopes(&self) -> &[String];

    /// Managed attributes, in the order operations are emitted
    fn attributes(&self) -> &[AttributeSpec];

    /// Map a raw remote object into a typed attribute map
    ///
    /// Remote "absent" values (missing, `null`, empty) decode as `Unset`.
    fn decode(&self, raw: &Value) -> Result<AttributeMap>;
}

/// Declarative schema for a JSON-shaped object type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSchema {
    /// Object type name
    pub object_type: String,
    /// Parent scope names, outermost first
    #[serde(default)]
    pub parent_scopes: Vec<String>,
    /// Managed attributes in emission order
    pub attributes: Vec<AttributeSpec>,
}

impl ObjectSchema {
    /// Create a schema with no parent scopes and no attributes
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            parent_scopes: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Add a parent scope level
    pub fn scoped_under(mut self, scope: impl Into<String>) -> Self {
        self.parent_scopes.push(scope.into());
        self
    }

    /// Append a managed attribute
    pub fn with_attribute(mut self, spec: AttributeSpec) -> Self {
        self.attributes.push(spec);
        self
    }
}

impl AttributeSpecProvider for ObjectSchema {
    fn object_type(&self) -> &str {
        &self.object_type
    }

    fn parent_scopes(&self) -> &[String] {
        &self.parent_scopes
    }

    fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }

    fn decode(&self, raw: &Value) -> Result<AttributeMap> {
        let mut map = AttributeMap::new();
        for spec in &self.attributes {
            let field = spec.path.get(raw);
            let value = match spec.kind {
                AttributeKind::Scalar => AttributeValue::Scalar(remote_scalar(field)?),
                AttributeKind::Set => AttributeValue::Set(remote_set(field)?),
            };
            map.insert(spec.path.clone(), value);
        }
        Ok(map)
    }
}
