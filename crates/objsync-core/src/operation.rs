//! Patch operations
//!
//! A patch operation is a `(verb, target, value?)` triple. Scalars are
//! replaced or removed at their attribute path; set members are added or
//! removed one at a time at a membership-qualified target so that
//! concurrent out-of-band additions to the same set survive.

use crate::path::{split_target, AttributePath};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operation verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    /// Replace a scalar value
    Replace,
    /// Remove a scalar value or one set member
    Remove,
    /// Add one set member
    Add,
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self {
            OpKind::Replace => "replace",
            OpKind::Remove => "remove",
            OpKind::Add => "add",
        };
        f.write_str(verb)
    }
}

/// One patch operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// The verb
    pub op: OpKind,
    /// Attribute path or membership-qualified target
    pub path: String,
    /// Value for `replace` and member `add`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Operation {
    /// Replace a scalar attribute with `value`
    pub fn replace(path: &AttributePath, value: Value) -> Self {
        Self {
            op: OpKind::Replace,
            path: path.as_str().to_string(),
            value: Some(value),
        }
    }

    /// Remove a scalar attribute
    pub fn remove(path: &AttributePath) -> Self {
        Self {
            op: OpKind::Remove,
            path: path.as_str().to_string(),
            value: None,
        }
    }

    /// Add one member to a set attribute
    pub fn add_member(path: &AttributePath, member: &str) -> Self {
        Self {
            op: OpKind::Add,
            path: path.member(member),
            value: Some(Value::String(member.to_string())),
        }
    }

    /// Remove one member from a set attribute
    pub fn remove_member(path: &AttributePath, member: &str) -> Self {
        Self {
            op: OpKind::Remove,
            path: path.member(member),
            value: None,
        }
    }

    /// Attribute path and optional set member this operation addresses
    pub fn target(&self) -> (AttributePath, Option<&str>) {
        let (path, member) = split_target(&self.path);
        (AttributePath::new(path), member)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} = {}", self.op, self.path, value),
            None => write!(f, "{} {}", self.op, self.path),
        }
    }
}
