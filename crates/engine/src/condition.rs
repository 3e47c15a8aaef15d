//! Condition and condition-group evaluation.
//!
//! Predicates compare the string representation of a record field against the
//! condition's value; numeric operators parse both sides as numbers. Every
//! failure mode (missing field, type mismatch, unparseable number) degrades to
//! `false` rather than raising, so evaluation is total and side-effect free.

use relay_types::{Condition, ConditionGroup, ConditionOperator};
use relay_util::{is_empty_value, lookup_field, value_to_string};
use serde_json::Value;
use tracing::warn;

/// Nesting depth past which groups stop recursing and evaluate to their
/// combinator's identity value. Caller-authored trees are expected to stay
/// far below this.
pub const MAX_GROUP_DEPTH: usize = 16;

/// Evaluate a single predicate against a record.
pub fn evaluate_condition(condition: &Condition, record: &Value) -> bool {
    let field = lookup_field(record, &condition.field);

    match condition.operator {
        ConditionOperator::IsEmpty => is_empty_value(field),
        ConditionOperator::IsNotEmpty => !is_empty_value(field),
        ConditionOperator::Equals => stringified(field) == condition.value,
        ConditionOperator::NotEquals => stringified(field) != condition.value,
        ConditionOperator::Contains => stringified(field).contains(&condition.value),
        ConditionOperator::StartsWith => stringified(field).starts_with(&condition.value),
        ConditionOperator::EndsWith => stringified(field).ends_with(&condition.value),
        ConditionOperator::GreaterThan => compare_numeric(field, &condition.value, |left, right| left > right),
        ConditionOperator::LessThan => compare_numeric(field, &condition.value, |left, right| left < right),
    }
}

/// Evaluate a condition group against a record.
///
/// Direct conditions and nested groups contribute to one combined result
/// under the group's combinator. An empty group yields the combinator's
/// identity: `true` for `all`, `false` for `any`.
pub fn evaluate_group(group: &ConditionGroup, record: &Value) -> bool {
    evaluate_group_at(group, record, 0)
}

fn evaluate_group_at(group: &ConditionGroup, record: &Value, depth: usize) -> bool {
    if depth >= MAX_GROUP_DEPTH {
        warn!(group_id = %group.id, depth, "condition group nesting exceeds cap; using combinator identity");
        return group.combinator.identity();
    }

    if group.conditions.is_empty() && group.nested_groups.is_empty() {
        return group.combinator.identity();
    }

    let mut direct = group.conditions.iter().map(|condition| evaluate_condition(condition, record));
    let mut nested = group.nested_groups.iter().map(|child| evaluate_group_at(child, record, depth + 1));

    match group.combinator {
        relay_types::GroupCombinator::All => direct.all(|matched| matched) && nested.all(|matched| matched),
        relay_types::GroupCombinator::Any => direct.any(|matched| matched) || nested.any(|matched| matched),
    }
}

fn stringified(field: Option<&Value>) -> String {
    field.map(value_to_string).unwrap_or_default()
}

fn compare_numeric(field: Option<&Value>, value: &str, compare: impl Fn(f64, f64) -> bool) -> bool {
    let left: f64 = match stringified(field).parse() {
        Ok(number) => number,
        Err(_) => return false,
    };
    let right: f64 = match value.parse() {
        Ok(number) => number,
        Err(_) => return false,
    };
    compare(left, right)
}
