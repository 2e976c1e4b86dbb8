//! Null/empty normalization
//!
//! The remote store collapses "null" and "empty" into one absent value.
//! After every read or write the observed attributes are rewritten so that
//! an absent remote value uses the same representation the desired state
//! used for it: `Cleared` when the operator explicitly cleared the field,
//! `Unset` otherwise. Without this every cleared field shows perpetual drift
//! against tracked state.

use crate::attributes::{AttributeMap, DesiredState, ObservedState};
use crate::value::{AttributeValue, Tristate};

/// Normalize a freshly decoded remote object against the desired state
///
/// Attributes the desired state cleared but the raw object does not
/// mention at all are filled in as `Cleared`.
pub fn normalize(raw_observed: AttributeMap, desired: &DesiredState) -> ObservedState {
    let mut normalized: AttributeMap = raw_observed
        .iter()
        .map(|(path, value)| {
            let value = if value.is_absent() {
                absent_like(value, desired.get(path))
            } else {
                value.clone()
            };
            (path.clone(), value)
        })
        .collect();

    for (path, value) in desired.attributes().iter() {
        if value.is_cleared() && raw_observed.get(path).is_none() {
            normalized.insert(path.clone(), value.clone());
        }
    }

    ObservedState::new(normalized)
}

fn absent_like(observed: &AttributeValue, desired: Option<&AttributeValue>) -> AttributeValue {
    let cleared = desired.is_some_and(AttributeValue::is_cleared);
    match observed {
        AttributeValue::Scalar(_) if cleared => AttributeValue::Scalar(Tristate::Cleared),
        AttributeValue::Scalar(_) => AttributeValue::Scalar(Tristate::Unset),
        AttributeValue::Set(_) if cleared => AttributeValue::Set(Tristate::Cleared),
        AttributeValue::Set(_) => AttributeValue::Set(Tristate::Unset),
    }
}
