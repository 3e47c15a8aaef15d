//! Branch path resolution.
//!
//! A set of sibling paths attaches to the end of a workflow's main sequence;
//! each path guards its step list with a condition group. Matching is not
//! exclusive and preserves input-list order, which callers rely on for
//! deterministic logs and result ordering.

use relay_types::BranchPath;
use serde_json::Value;
use tracing::debug;

use crate::condition::evaluate_group;

/// Select every path whose guard is satisfied by `record`, in input order.
///
/// Zero matches is a valid outcome and produces no work.
pub fn resolve_paths<'a>(paths: &'a [BranchPath], record: &Value) -> Vec<&'a BranchPath> {
    let matched: Vec<&BranchPath> = paths.iter().filter(|path| evaluate_group(&path.conditions, record)).collect();
    debug!(total = paths.len(), matched = matched.len(), "resolved branch paths");
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::{Condition, ConditionGroup, ConditionOperator, GroupCombinator};
    use serde_json::json;

    fn guarded_path(id: &str, field: &str, value: &str) -> BranchPath {
        BranchPath {
            id: id.into(),
            name: id.into(),
            conditions: ConditionGroup {
                id: String::new(),
                combinator: GroupCombinator::All,
                conditions: vec![Condition {
                    field: field.into(),
                    operator: ConditionOperator::Equals,
                    value: value.into(),
                }],
                nested_groups: vec![],
            },
            steps: vec![],
        }
    }

    fn open_path(id: &str) -> BranchPath {
        BranchPath {
            id: id.into(),
            name: id.into(),
            conditions: ConditionGroup::match_all(),
            steps: vec![],
        }
    }

    #[test]
    fn matching_is_not_exclusive_and_preserves_order() {
        let paths = vec![open_path("first"), guarded_path("second", "kind", "alert"), open_path("third")];
        let record = json!({"kind": "alert"});

        let matched = resolve_paths(&paths, &record);
        let ids: Vec<&str> = matched.iter().map(|path| path.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn unmatched_guards_are_filtered_out() {
        let paths = vec![guarded_path("alerts", "kind", "alert"), guarded_path("digests", "kind", "digest")];
        let matched = resolve_paths(&paths, &json!({"kind": "digest"}));
        let ids: Vec<&str> = matched.iter().map(|path| path.id.as_str()).collect();
        assert_eq!(ids, vec!["digests"]);
    }

    #[test]
    fn zero_matches_is_valid() {
        let paths = vec![guarded_path("alerts", "kind", "alert")];
        assert!(resolve_paths(&paths, &json!({"kind": "other"})).is_empty());
        assert!(resolve_paths(&[], &json!({})).is_empty());
    }

    #[test]
    fn empty_any_guard_never_matches() {
        let mut path = open_path("never");
        path.conditions.combinator = GroupCombinator::Any;
        assert!(resolve_paths(&[path], &json!({"k": 1})).is_empty());
    }
}
