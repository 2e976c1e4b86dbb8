//! Attribute diff primitives
//!
//! Pure functions comparing one desired attribute against its observed
//! counterpart. "Absent" on the remote and "explicitly cleared" in the
//! desired state compare equal, so a cleared field never produces a
//! perpetual `remove`.

use crate::operation::Operation;
use crate::path::AttributePath;
use crate::value::{MemberSet, ScalarValue, Tristate};

/// Diff one scalar attribute
///
/// - desired `Unset` ⇒ nothing (the observed value wins silently)
/// - desired present and different ⇒ `replace`
/// - desired cleared and observed present ⇒ `remove`
/// - desired cleared and observed absent ⇒ nothing
pub fn diff_scalar(
    desired: &Tristate<ScalarValue>,
    observed: &Tristate<ScalarValue>,
    path: &AttributePath,
) -> Option<Operation> {
    if desired.is_unset() {
        return None;
    }

    match (desired.present(), observed.present()) {
        (Some(want), Some(have)) if want == have => None,
        (Some(want), _) => Some(Operation::replace(path, want.to_json())),
        (None, Some(_)) => Some(Operation::remove(path)),
        (None, None) => None,
    }
}

/// Diff one set attribute by membership
///
/// Adds come first in desired order, then removes in observed order. A
/// desired `Unset` emits nothing regardless of observed members; a cleared
/// desired set removes every observed member.
pub fn diff_set(
    desired: &Tristate<MemberSet>,
    observed: &Tristate<MemberSet>,
    path: &AttributePath,
) -> Vec<Operation> {
    if desired.is_unset() {
        return Vec::new();
    }

    let empty = MemberSet::new();
    let want = desired.value().unwrap_or(&empty);
    let have = observed.value().unwrap_or(&empty);

    let adds = want
        .iter()
        .filter(|member| !have.contains(member))
        .map(|member| Operation::add_member(path, member));
    let removes = have
        .iter()
        .filter(|member| !want.contains(member))
        .map(|member| Operation::remove_member(path, member));

    adds.chain(removes).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OpKind;
    use serde_json::json;

    fn path(p: &str) -> AttributePath {
        AttributePath::new(p)
    }

    fn val(s: &str) -> Tristate<ScalarValue> {
        Tristate::Value(ScalarValue::from(s))
    }

    fn set(members: &[&str]) -> Tristate<MemberSet> {
        Tristate::Value(members.iter().copied().collect())
    }

    #[test]
    fn test_unset_desired_never_diffs() {
        assert_eq!(diff_scalar(&Tristate::Unset, &val("x"), &path("a")), None);
        assert_eq!(diff_scalar(&Tristate::Unset, &Tristate::Unset, &path("a")), None);
    }

    #[test]
    fn test_equal_values_do_not_diff() {
        assert_eq!(diff_scalar(&val("x"), &val("x"), &path("a")), None);
    }

    #[test]
    fn test_changed_value_replaces() {
        let op = diff_scalar(&val("new"), &val("old"), &path("a")).unwrap();
        assert_eq!(op, Operation::replace(&path("a"), json!("new")));

        let op = diff_scalar(&val("new"), &Tristate::Unset, &path("a")).unwrap();
        assert_eq!(op.op, OpKind::Replace);

        let op = diff_scalar(
            &Tristate::Value(ScalarValue::Int(3)),
            &Tristate::Value(ScalarValue::Int(2)),
            &path("replicas"),
        )
        .unwrap();
        assert_eq!(op.value, Some(json!(3)));
    }

    #[test]
    fn test_cleared_removes_present_value() {
        let op = diff_scalar(&Tristate::Cleared, &val("old"), &path("a")).unwrap();
        assert_eq!(op, Operation::remove(&path("a")));
    }

    #[test]
    fn test_cleared_matches_absent() {
        assert_eq!(diff_scalar(&Tristate::Cleared, &Tristate::Unset, &path("a")), None);
        assert_eq!(diff_scalar(&Tristate::Cleared, &Tristate::Cleared, &path("a")), None);
        assert_eq!(diff_scalar(&val(""), &Tristate::Unset, &path("a")), None);
        assert_eq!(diff_scalar(&Tristate::Cleared, &val(""), &path("a")), None);
    }

    #[test]
    fn test_set_symmetric_difference() {
        let ops = diff_set(&set(&["a", "b"]), &set(&["b", "c"]), &path("tags"));
        assert_eq!(
            ops,
            vec![
                Operation::add_member(&path("tags"), "a"),
                Operation::remove_member(&path("tags"), "c"),
            ]
        );
        assert!(ops.iter().all(|op| !op.path.contains("[b]")));
    }

    #[test]
    fn test_set_order_is_deterministic() {
        let ops = diff_set(&set(&["q", "p", "r"]), &set(&["z", "r", "y"]), &path("tags"));
        let targets: Vec<_> = ops.iter().map(|op| op.to_string()).collect();
        assert_eq!(
            targets,
            vec![
                "add tags[q] = \"q\"",
                "add tags[p] = \"p\"",
                "remove tags[z]",
                "remove tags[y]",
            ]
        );
    }

    #[test]
    fn test_unset_set_ignores_observed_members() {
        assert!(diff_set(&Tristate::Unset, &set(&["a", "b"]), &path("tags")).is_empty());
    }

    #[test]
    fn test_cleared_set_removes_all_members() {
        let ops = diff_set(&Tristate::Cleared, &set(&["a", "b"]), &path("tags"));
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| op.op == OpKind::Remove));
    }

    #[test]
    fn test_set_against_absent_adds_everything() {
        let ops = diff_set(&set(&["a"]), &Tristate::Unset, &path("tags"));
        assert_eq!(ops, vec![Operation::add_member(&path("tags"), "a")]);
    }
}
