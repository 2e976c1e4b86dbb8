//! Operation sequence builder
//!
//! Walks an object type's attribute list in order and concatenates the
//! diff primitives' output. An empty result means "already in desired
//! state": callers must skip the patch call entirely instead of sending a
//! zero-length operation list.

use crate::attributes::{DesiredState, ObservedState};
use crate::diff::{diff_scalar, diff_set};
use crate::error::{Error, Result};
use crate::operation::Operation;
use crate::schema::{AttributeKind, AttributeSpec};
use crate::value::{AttributeValue, MemberSet, ScalarValue, Tristate};
use serde::Serialize;
use serde_json::{Map, Value};

/// What a reconciliation step would do, without doing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Plan {
    /// Create the object with this initial payload
    Create {
        /// Present-valued desired attributes
        payload: Value,
    },
    /// Patch the object with these operations
    Update {
        /// Ordered operation list (never empty)
        operations: Vec<Operation>,
    },
    /// Nothing to do
    NoChange,
}

impl Plan {
    /// Build an update plan, collapsing an empty list to `NoChange`
    pub fn from_operations(operations: Vec<Operation>) -> Self {
        if operations.is_empty() {
            Plan::NoChange
        } else {
            Plan::Update { operations }
        }
    }

    /// Check whether applying this plan would touch the remote
    pub fn has_changes(&self) -> bool {
        !matches!(self, Plan::NoChange)
    }
}

/// Compute the ordered operation list turning `observed` into `desired`
pub fn build_operations(
    desired: &DesiredState,
    observed: &ObservedState,
    specs: &[AttributeSpec],
) -> Vec<Operation> {
    let mut operations = Vec::new();

    for spec in specs {
        match spec.kind {
            AttributeKind::Scalar => {
                let want = scalar_of(desired.get(&spec.path));
                let have = scalar_of(observed.get(&spec.path));
                operations.extend(diff_scalar(want, have, &spec.path));
            }
            AttributeKind::Set => {
                let want = set_of(desired.get(&spec.path));
                let have = set_of(observed.get(&spec.path));
                operations.extend(diff_set(want, have, &spec.path));
            }
        }
    }

    operations
}

/// Build the create payload from desired's present-valued attributes
///
/// Fails with a usage error, before any remote call, when an attribute
/// required at create is not present.
pub fn initial_payload(desired: &DesiredState, specs: &[AttributeSpec]) -> Result<Value> {
    let mut payload = Value::Object(Map::new());

    for spec in specs {
        let value = desired.get(&spec.path).and_then(AttributeValue::to_json);
        match value {
            Some(value) => spec.path.set(&mut payload, value),
            None if spec.required_at_create => {
                return Err(Error::usage(format!(
                    "attribute {} is required to create the object",
                    spec.path
                )));
            }
            None => {}
        }
    }

    Ok(payload)
}

// A value of the wrong kind is treated as no opinion; decoding through the
// schema never produces one.
fn scalar_of(value: Option<&AttributeValue>) -> &Tristate<ScalarValue> {
    const UNSET: &Tristate<ScalarValue> = &Tristate::Unset;
    match value {
        Some(AttributeValue::Scalar(t)) => t,
        _ => UNSET,
    }
}

fn set_of(value: Option<&AttributeValue>) -> &Tristate<MemberSet> {
    const UNSET: &Tristate<MemberSet> = &Tristate::Unset;
    match value {
        Some(AttributeValue::Set(t)) => t,
        _ => UNSET,
    }
}
