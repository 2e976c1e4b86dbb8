//! Configuration types for the reconciliation engine
//!
//! All settings are passed explicitly; the engine keeps no process-wide
//! defaults or switches.

use crate::identity::ObjectIdentity;
use crate::lifecycle::Ownership;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Top-level configuration for a [`crate::Reconciler`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Remote object store configuration
    pub store: StoreConfig,

    /// Tracked state store configuration
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Managed objects, in the order they are created
    pub resources: Vec<ResourceConfig>,

    /// Engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl ReconcilerConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            store: StoreConfig::default(),
            state_store: StateStoreConfig::default(),
            resources: Vec::new(),
            engine: EngineConfig::default(),
        }
    }

    /// Parse a JSON configuration document
    pub fn from_json_str(input: &str) -> Result<Self, crate::Error> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.resources.is_empty() {
            return Err(crate::Error::config("No resources configured"));
        }

        self.store.validate()?;
        self.engine.validate()?;

        let mut seen = HashSet::new();
        for resource in &self.resources {
            resource.validate(&self.engine.identity_separator)?;
            if !seen.insert(resource.identity()) {
                return Err(crate::Error::config(format!(
                    "Resource {} is configured more than once",
                    resource.identity()
                )));
            }
        }

        Ok(())
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Remote object store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-process store, optionally seeded with pre-existing objects
    Memory {
        /// Objects that exist before the first pass (adoption targets)
        #[serde(default)]
        objects: Vec<SeedObject>,
    },

    /// Custom store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: Value,
    },
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::Memory { objects } => {
                for seed in objects {
                    if !seed.attributes.is_object() {
                        return Err(crate::Error::config(format!(
                            "Seed object {} must be a JSON object",
                            seed.identity
                        )));
                    }
                }
                Ok(())
            }
            StoreConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom store factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom store config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::Memory { .. } => "memory",
            StoreConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory { objects: Vec::new() }
    }
}

/// A pre-existing remote object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedObject {
    /// Object identity
    pub identity: ObjectIdentity,
    /// Raw attributes
    pub attributes: Value,
}

/// Tracked state store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// File-based tracked state
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory tracked state (not persistent)
    #[default]
    Memory,
}

/// One managed object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Object type name
    pub object_type: String,

    /// Parent scope identifiers, outermost first
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Instance name
    pub name: String,

    /// Whether the engine creates the object or adopts an existing one
    #[serde(default)]
    pub ownership: Ownership,

    /// Desired attributes: a missing key is left alone, `null`/`""`/`[]`
    /// clears the remote value
    #[serde(default)]
    pub attributes: Map<String, Value>,

    /// Whether this resource is reconciled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ResourceConfig {
    /// Create an owned resource configuration
    pub fn new(
        object_type: impl Into<String>,
        scopes: Vec<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            scopes,
            name: name.into(),
            ownership: Ownership::Owned,
            attributes: Map::new(),
            enabled: true,
        }
    }

    /// Set the ownership mode
    pub fn with_ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = ownership;
        self
    }

    /// Set one desired attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Enable or disable the resource
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Identity of the configured object
    pub fn identity(&self) -> ObjectIdentity {
        ObjectIdentity::new(self.object_type.clone(), self.scopes.clone(), self.name.clone())
    }

    fn validate(&self, separator: &str) -> Result<(), crate::Error> {
        if self.object_type.is_empty() {
            return Err(crate::Error::config("Resource object_type cannot be empty"));
        }
        if self.name.is_empty() {
            return Err(crate::Error::config(format!(
                "Resource of type {} has an empty name",
                self.object_type
            )));
        }
        for component in self.scopes.iter().chain(std::iter::once(&self.name)) {
            if component.is_empty() || component.contains(separator) {
                return Err(crate::Error::config(format!(
                    "Resource {} has an invalid identity component '{}'",
                    self.identity(),
                    component
                )));
            }
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Separator between components of an import id (`backend/name`)
    #[serde(default = "default_identity_separator")]
    pub identity_separator: String,

    /// Capacity of the reconcile event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Abort a pass on the first failing resource instead of moving on
    #[serde(default)]
    pub stop_on_error: bool,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.identity_separator.is_empty() {
            return Err(crate::Error::config("identity_separator cannot be empty"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            identity_separator: default_identity_separator(),
            event_channel_capacity: default_event_channel_capacity(),
            stop_on_error: false,
        }
    }
}

fn default_identity_separator() -> String {
    "/".to_string()
}

fn default_event_channel_capacity() -> usize {
    1000
}
