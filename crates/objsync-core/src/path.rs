//! Attribute paths
//!
//! An attribute path names one field of a remote object, e.g. `name` or
//! `settings/cacheMode`. Nested objects are separated by `/`. Set members
//! are addressed with a membership-qualified target: `tags[x]`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const SEGMENT_SEPARATOR: char = '/';

/// Path of one attribute in the remote store's addressing scheme
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributePath(String);

impl AttributePath {
    /// Create a new attribute path
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The path as used verbatim in operations
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Nested object segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEGMENT_SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Membership-qualified target for one set member
    pub fn member(&self, member: &str) -> String {
        format!("{}[{}]", self.0, member)
    }

    /// Look up this attribute in a raw JSON object
    pub fn get<'a>(&self, object: &'a Value) -> Option<&'a Value> {
        self.segments()
            .try_fold(object, |current, segment| current.get(segment))
    }

    /// Write this attribute into a raw JSON object, creating parents
    pub fn set(&self, object: &mut Value, value: Value) {
        let segments: Vec<&str> = self.segments().collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut current = object;
        for segment in parents {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            current = match current {
                Value::Object(map) => map
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Map::new())),
                _ => return,
            };
        }

        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        if let Value::Object(map) = current {
            map.insert(last.to_string(), value);
        }
    }

    /// Remove this attribute from a raw JSON object
    pub fn remove(&self, object: &mut Value) -> Option<Value> {
        let segments: Vec<&str> = self.segments().collect();
        let (last, parents) = segments.split_last()?;

        let mut current = object;
        for segment in parents {
            current = current.get_mut(*segment)?;
        }
        current.as_object_mut()?.remove(*last)
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttributePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AttributePath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Split an operation target into its attribute path and optional member
///
/// `tags[x]` ⇒ (`tags`, Some(`x`)); `name` ⇒ (`name`, None)
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    match (target.find('['), target.strip_suffix(']')) {
        (Some(open), Some(trimmed)) => (&target[..open], Some(&trimmed[open + 1..])),
        _ => (target, None),
    }
}
