//! Object identities
//!
//! An identity is the composite key a remote store routes on: the object
//! type, one identifier per parent scope (outermost first), and the
//! instance name. An index `idx1` under backend `b1` is
//! `index:b1/idx1`.

use crate::error::{Error, Result};
use crate::schema::AttributeSpecProvider;
use serde::{Deserialize, Serialize};

/// Composite key addressing one remote object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectIdentity {
    /// Object type name
    pub object_type: String,
    /// Parent scope identifiers, outermost first
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Instance name
    pub name: String,
}

impl ObjectIdentity {
    /// Create a new identity
    pub fn new(
        object_type: impl Into<String>,
        scopes: Vec<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            scopes,
            name: name.into(),
        }
    }

    /// Create an identity for an unscoped object
    pub fn unscoped(object_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(object_type, Vec::new(), name)
    }

    /// Parse an import id such as `b1/idx1`
    ///
    /// The id must carry exactly one component per parent scope plus the
    /// instance name. Anything else is a usage error, reported before any
    /// remote call is made.
    pub fn parse_import(
        schema: &dyn AttributeSpecProvider,
        import_id: &str,
        separator: &str,
    ) -> Result<Self> {
        let scope_names = schema.parent_scopes();
        let expected = scope_names.len() + 1;
        let components: Vec<&str> = import_id.split(separator).collect();

        if components.len() != expected || components.iter().any(|c| c.trim().is_empty()) {
            let layout = scope_names
                .iter()
                .map(String::as_str)
                .chain(std::iter::once("name"))
                .collect::<Vec<_>>()
                .join(separator);
            return Err(Error::usage(format!(
                "import id '{}' for {} must have the form {} ({} component{})",
                import_id,
                schema.object_type(),
                layout,
                expected,
                if expected == 1 { "" } else { "s" }
            )));
        }

        let (name, scopes) = components
            .split_last()
            .ok_or_else(|| Error::usage("empty import id"))?;

        Ok(Self::new(
            schema.object_type(),
            scopes.iter().map(|s| s.to_string()).collect(),
            *name,
        ))
    }

    /// Check that this identity has one scope per parent level of `schema`
    pub fn validate_against(&self, schema: &dyn AttributeSpecProvider) -> Result<()> {
        if self.object_type != schema.object_type() {
            return Err(Error::usage(format!(
                "identity {} does not belong to object type {}",
                self,
                schema.object_type()
            )));
        }
        if self.scopes.len() != schema.parent_scopes().len() {
            return Err(Error::usage(format!(
                "identity {} needs {} parent scope(s) ({}), got {}",
                self,
                schema.parent_scopes().len(),
                schema.parent_scopes().join(", "),
                self.scopes.len()
            )));
        }
        if self.name.is_empty() || self.scopes.iter().any(String::is_empty) {
            return Err(Error::usage(format!("identity {} has an empty component", self)));
        }
        Ok(())
    }

    /// Stable key for tracked-state storage
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Check whether this object lives under the given parent scopes
    pub fn is_under(&self, object_type: &str, scopes: &[String]) -> bool {
        self.object_type == object_type && self.scopes == scopes
    }
}

impl std::fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", self.object_type)?;
        for scope in &self.scopes {
            write!(f, "{}/", scope)?;
        }
        f.write_str(&self.name)
    }
}
