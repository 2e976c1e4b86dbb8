//! Typed attribute values
//!
//! Remote objects only know two states per field: present-with-value and
//! absent. Desired state needs three, so that an operator can explicitly
//! clear a field instead of simply not mentioning it:
//!
//! - [`Tristate::Unset`]: no opinion, the attribute is skipped
//! - [`Tristate::Cleared`]: explicitly empty/null, the remote value is cleared
//! - [`Tristate::Value`]: a concrete value
//!
//! On the observed side `Unset` means "absent on the remote".

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Values whose "empty" form is indistinguishable from absent on the remote
pub trait EmptyValue {
    /// `true` when the remote store would collapse this value to absent
    fn is_empty_value(&self) -> bool;
}

/// Three-way attribute state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tristate<T> {
    /// No opinion (desired) / absent (observed)
    Unset,
    /// Explicitly empty or null
    Cleared,
    /// A concrete value
    Value(T),
}

impl<T> Default for Tristate<T> {
    fn default() -> Self {
        Tristate::Unset
    }
}

impl<T> Tristate<T> {
    /// Check whether the caller expressed no opinion
    pub fn is_unset(&self) -> bool {
        matches!(self, Tristate::Unset)
    }

    /// Check whether the value was explicitly cleared
    pub fn is_cleared(&self) -> bool {
        matches!(self, Tristate::Cleared)
    }

    /// Borrow the concrete value, if any
    pub fn value(&self) -> Option<&T> {
        match self {
            Tristate::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: EmptyValue> Tristate<T> {
    /// Check whether the remote would hold nothing for this value
    ///
    /// `Unset`, `Cleared` and an empty `Value` all collapse to absent.
    pub fn is_absent(&self) -> bool {
        self.present().is_none()
    }

    /// Borrow the value only when it is present and non-empty
    pub fn present(&self) -> Option<&T> {
        self.value().filter(|v| !v.is_empty_value())
    }
}

/// A single scalar attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// String value
    Str(String),
}

impl ScalarValue {
    /// Convert a JSON scalar; `null` and non-scalars are rejected
    fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(ScalarValue::Bool(*b)),
            Value::String(s) => Ok(ScalarValue::Str(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(ScalarValue::Int)
                .ok_or_else(|| Error::schema(format!("unsupported number {}", n))),
            other => Err(Error::schema(format!("expected a scalar, got {}", other))),
        }
    }

    /// Render as JSON
    pub fn to_json(&self) -> Value {
        match self {
            ScalarValue::Bool(b) => Value::Bool(*b),
            ScalarValue::Int(i) => Value::from(*i),
            ScalarValue::Str(s) => Value::String(s.clone()),
        }
    }
}

impl EmptyValue for ScalarValue {
    fn is_empty_value(&self) -> bool {
        matches!(self, ScalarValue::Str(s) if s.is_empty())
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Str(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Str(s)
    }
}

impl From<i64> for ScalarValue {
    fn from(i: i64) -> Self {
        ScalarValue::Int(i)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Int(i) => write!(f, "{}", i),
            ScalarValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Ordered set of string members
///
/// Insertion order is kept so that set diffs are deterministic;
/// duplicates are dropped on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberSet(Vec<String>);

impl MemberSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a member, returning `false` if it was already present
    pub fn insert(&mut self, member: impl Into<String>) -> bool {
        let member = member.into();
        if self.contains(&member) {
            return false;
        }
        self.0.push(member);
        true
    }

    /// Remove a member, returning `false` if it was not present
    pub fn remove(&mut self, member: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|m| m != member);
        before != self.0.len()
    }

    /// Check membership
    pub fn contains(&self, member: &str) -> bool {
        self.0.iter().any(|m| m == member)
    }

    /// Iterate members in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the set has no members
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn from_json(value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::schema(format!("expected an array, got {}", value)))?;

        let mut set = MemberSet::new();
        for item in items {
            match item {
                Value::String(s) => {
                    set.insert(s.clone());
                }
                other => {
                    return Err(Error::schema(format!(
                        "set members must be strings, got {}",
                        other
                    )));
                }
            }
        }
        Ok(set)
    }

    /// Render as a JSON array
    pub fn to_json(&self) -> Value {
        Value::Array(self.0.iter().cloned().map(Value::String).collect())
    }
}

impl EmptyValue for MemberSet {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for MemberSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = MemberSet::new();
        for member in iter {
            set.insert(member);
        }
        set
    }
}

/// One typed attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "state", rename_all = "snake_case")]
pub enum AttributeValue {
    /// Optional scalar
    Scalar(Tristate<ScalarValue>),
    /// Multi-valued set of strings
    Set(Tristate<MemberSet>),
}

impl AttributeValue {
    /// Present scalar value
    pub fn scalar(value: impl Into<ScalarValue>) -> Self {
        AttributeValue::Scalar(Tristate::Value(value.into()))
    }

    /// Explicitly cleared scalar
    pub fn cleared_scalar() -> Self {
        AttributeValue::Scalar(Tristate::Cleared)
    }

    /// Present set value
    pub fn set<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttributeValue::Set(Tristate::Value(members.into_iter().collect()))
    }

    /// Check whether the caller expressed no opinion
    pub fn is_unset(&self) -> bool {
        match self {
            AttributeValue::Scalar(t) => t.is_unset(),
            AttributeValue::Set(t) => t.is_unset(),
        }
    }

    /// Check whether the value was explicitly cleared
    pub fn is_cleared(&self) -> bool {
        match self {
            AttributeValue::Scalar(t) => t.is_cleared(),
            AttributeValue::Set(t) => t.is_cleared(),
        }
    }

    /// Check whether the remote would hold nothing for this value
    pub fn is_absent(&self) -> bool {
        match self {
            AttributeValue::Scalar(t) => t.is_absent(),
            AttributeValue::Set(t) => t.is_absent(),
        }
    }

    /// Render the present value as JSON (`None` when absent)
    pub fn to_json(&self) -> Option<Value> {
        match self {
            AttributeValue::Scalar(t) => t.present().map(ScalarValue::to_json),
            AttributeValue::Set(t) => t.present().map(MemberSet::to_json),
        }
    }
}

/// Decode a desired scalar: missing ⇒ Unset, `null`/`""` ⇒ Cleared
pub fn desired_scalar(value: Option<&Value>) -> Result<Tristate<ScalarValue>> {
    match value {
        None => Ok(Tristate::Unset),
        Some(Value::Null) => Ok(Tristate::Cleared),
        Some(Value::String(s)) if s.is_empty() => Ok(Tristate::Cleared),
        Some(v) => ScalarValue::from_json(v).map(Tristate::Value),
    }
}

/// Decode a desired set: missing ⇒ Unset, `null`/`[]` ⇒ Cleared
pub fn desired_set(value: Option<&Value>) -> Result<Tristate<MemberSet>> {
    match value {
        None => Ok(Tristate::Unset),
        Some(Value::Null) => Ok(Tristate::Cleared),
        Some(v) => {
            let set = MemberSet::from_json(v)?;
            if set.is_empty() {
                Ok(Tristate::Cleared)
            } else {
                Ok(Tristate::Value(set))
            }
        }
    }
}

/// Decode a remote scalar: missing, `null` and `""` are all absent
pub fn remote_scalar(value: Option<&Value>) -> Result<Tristate<ScalarValue>> {
    match value {
        None | Some(Value::Null) => Ok(Tristate::Unset),
        Some(Value::String(s)) if s.is_empty() => Ok(Tristate::Unset),
        Some(v) => ScalarValue::from_json(v).map(Tristate::Value),
    }
}

/// Decode a remote set: missing, `null` and `[]` are all absent
pub fn remote_set(value: Option<&Value>) -> Result<Tristate<MemberSet>> {
    match value {
        None | Some(Value::Null) => Ok(Tristate::Unset),
        Some(v) => {
            let set = MemberSet::from_json(v)?;
            if set.is_empty() {
                Ok(Tristate::Unset)
            } else {
                Ok(Tristate::Value(set))
            }
        }
    }
}
