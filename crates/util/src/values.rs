//! JSON value coercion used by condition evaluation.
//!
//! Predicates compare the *string representation* of record fields, so the
//! coercion rules live here in one place: null and missing values stringify to
//! the empty string, scalars use their natural rendering, and composite values
//! fall back to compact JSON.

use serde_json::Value;

/// Resolve a dot-path into a record (for example `user.email` or `items.0`).
///
/// Returns `None` when any segment is missing. An empty path resolves to the
/// record itself.
pub fn lookup_field<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(record);
    }

    let mut current = record;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// String representation of a JSON value for predicate comparison.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Whether a resolved field counts as empty: missing, null, or `""`.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_resolves_nested_paths() {
        let record = json!({"user": {"email": "a@b.c", "tags": ["vip", "beta"]}});
        assert_eq!(lookup_field(&record, "user.email"), Some(&json!("a@b.c")));
        assert_eq!(lookup_field(&record, "user.tags.1"), Some(&json!("beta")));
        assert_eq!(lookup_field(&record, "user.missing"), None);
        assert_eq!(lookup_field(&record, "user.tags.9"), None);
    }

    #[test]
    fn empty_path_resolves_to_record() {
        let record = json!({"k": 1});
        assert_eq!(lookup_field(&record, ""), Some(&record));
    }

    #[test]
    fn stringifies_scalars_naturally() {
        assert_eq!(value_to_string(&json!(null)), "");
        assert_eq!(value_to_string(&json!("hi")), "hi");
        assert_eq!(value_to_string(&json!(17)), "17");
        assert_eq!(value_to_string(&json!(true)), "true");
    }

    #[test]
    fn stringifies_composites_as_compact_json() {
        assert_eq!(value_to_string(&json!([1, 2])), "[1,2]");
        assert_eq!(value_to_string(&json!({"a": 1})), "{\"a\":1}");
    }

    #[test]
    fn emptiness_covers_missing_null_and_blank() {
        assert!(is_empty_value(None));
        assert!(is_empty_value(Some(&json!(null))));
        assert!(is_empty_value(Some(&json!(""))));
        assert!(!is_empty_value(Some(&json!("x"))));
        assert!(!is_empty_value(Some(&json!(0))));
        assert!(!is_empty_value(Some(&json!([]))));
    }
}
