//! Declarative workflow schema: steps, condition trees, and branch paths.
//!
//! A workflow is an ordered list of steps (one trigger followed by actions and
//! filters), optionally extended with guarded branch paths that fan out after
//! the main sequence. Documents are authored in YAML or JSON and deserialize
//! into [`WorkflowDefinition`].

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub mod validation;

/// Kind of a workflow node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Entry point of a workflow; exactly one per workflow, always first.
    Trigger,
    /// A unit of work delegated to an app adapter.
    Action,
    /// A step that inspects the payload and may short-circuit downstream work.
    Filter,
}

/// One node in a workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Stable identifier, unique within the document.
    pub id: String,
    /// Node kind (trigger, action, or filter).
    pub kind: StepKind,
    /// Identifier of the app adapter to invoke; empty means unconfigured.
    #[serde(default)]
    pub app_id: String,
    /// Human-readable label; not behaviorally significant.
    #[serde(default)]
    pub display_name: String,
    /// Human-readable action label; passed to the adapter as a hint.
    #[serde(default)]
    pub action_name: String,
    /// Whether the step has been fully configured. Unconfigured steps are
    /// rejected before execution starts.
    #[serde(default)]
    pub configured: bool,
    /// Open configuration mapping interpreted only by the app adapter, with
    /// the exception of the `stopOnError` failure-policy key.
    #[serde(default)]
    pub config: serde_json::Map<String, JsonValue>,
}

impl Step {
    /// Returns `true` unless the step explicitly opts into skip-and-continue
    /// failure handling with `stopOnError: false`. The default is to stop.
    pub fn stop_on_error(&self) -> bool {
        !matches!(self.config.get("stopOnError"), Some(JsonValue::Bool(false)))
    }

    /// Label used in logs and result records: the action name when present,
    /// falling back to the display name and finally the step id.
    pub fn label(&self) -> &str {
        if !self.action_name.is_empty() {
            &self.action_name
        } else if !self.display_name.is_empty() {
            &self.display_name
        } else {
            &self.id
        }
    }
}

/// Comparison operators available to a [`Condition`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    StartsWith,
    EndsWith,
    /// True when the field is missing, null, or the empty string. The
    /// condition's `value` is ignored.
    IsEmpty,
    /// Negation of `is_empty`; the condition's `value` is ignored.
    IsNotEmpty,
}

/// A single field predicate evaluated against a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    /// Dot-path into the record (for example `user.email`).
    #[serde(default)]
    pub field: String,
    /// Comparison operator.
    pub operator: ConditionOperator,
    /// Right-hand operand, compared against the field's string representation.
    #[serde(default)]
    pub value: String,
}

/// How a group combines its predicate results.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupCombinator {
    /// Logical AND; an empty group evaluates to `true`.
    All,
    /// Logical OR; an empty group evaluates to `false`.
    Any,
}

impl GroupCombinator {
    /// Identity value of the combinator, used when a group is empty.
    pub fn identity(self) -> bool {
        match self {
            GroupCombinator::All => true,
            GroupCombinator::Any => false,
        }
    }
}

/// A boolean predicate tree combining conditions and nested groups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionGroup {
    /// Stable identifier for UI bookkeeping; not behaviorally significant.
    #[serde(default)]
    pub id: String,
    /// AND/OR semantics applied across conditions and nested groups.
    pub combinator: GroupCombinator,
    /// Ordered direct predicates.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Ordered child groups, evaluated recursively.
    #[serde(default)]
    pub nested_groups: Vec<ConditionGroup>,
}

impl ConditionGroup {
    /// An empty `all` group, the neutral guard that matches every record.
    pub fn match_all() -> Self {
        Self {
            id: String::new(),
            combinator: GroupCombinator::All,
            conditions: Vec::new(),
            nested_groups: Vec::new(),
        }
    }
}

/// A guarded sub-sequence of steps selected when its condition group is
/// satisfied by the parent output. Sibling paths are not exclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BranchPath {
    /// Stable identifier, unique within the document.
    pub id: String,
    /// Human-readable path name surfaced in logs and results.
    #[serde(default)]
    pub name: String,
    /// Guard evaluated against the parent step output.
    pub conditions: ConditionGroup,
    /// Ordered steps dispatched when the guard matches.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A fully authored workflow document: metadata, the main step sequence, and
/// optional branch paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    /// Canonical workflow identifier used for lookups and history records.
    #[serde(default)]
    pub id: String,
    /// Optional human-readable name.
    #[serde(default)]
    pub name: String,
    /// Ordered main sequence; the first step must be the trigger.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Guarded branch paths resolved against the main sequence output.
    #[serde(default)]
    pub branch_paths: Vec<BranchPath>,
    /// Optional sample trigger payload used when no runtime input is supplied.
    #[serde(default)]
    pub trigger_data: Option<JsonValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_basic_workflow() {
        let yaml_text = r##"
id: email_alerts
name: Email alerts
steps:
  - id: s1
    kind: trigger
    appId: gmail
    actionName: "New email"
    configured: true
  - id: s2
    kind: action
    appId: slack
    configured: true
    config:
      channel: "#alerts"
      stopOnError: false
"##;

        let definition: WorkflowDefinition = serde_yaml::from_str(yaml_text).expect("deserialize workflow");
        assert_eq!(definition.id, "email_alerts");
        assert_eq!(definition.steps.len(), 2);
        assert_eq!(definition.steps[0].kind, StepKind::Trigger);
        assert_eq!(definition.steps[0].app_id, "gmail");
        assert!(definition.steps[0].stop_on_error());
        assert!(!definition.steps[1].stop_on_error());
    }

    #[test]
    fn repository_sample_workflow_parses() {
        let yaml_text = include_str!("../../../workflows/email_triage.yaml");
        let definition: WorkflowDefinition = serde_yaml::from_str(yaml_text).expect("parse sample workflow");
        assert_eq!(definition.id, "email_triage");
        assert_eq!(definition.steps[0].kind, StepKind::Trigger);
        assert!(!definition.branch_paths.is_empty());
    }

    #[test]
    fn step_serializes_with_camel_case_field_names() {
        let step = Step {
            id: "s1".into(),
            kind: StepKind::Action,
            app_id: "slack".into(),
            display_name: "Notify".into(),
            action_name: "Send message".into(),
            configured: true,
            config: serde_json::Map::new(),
        };

        let text = serde_json::to_string(&step).expect("serialize step");
        assert!(text.contains("\"appId\""));
        assert!(text.contains("\"displayName\""));
        assert!(text.contains("\"actionName\""));
        assert!(text.contains("\"kind\":\"action\""));
    }

    #[test]
    fn condition_group_round_trips_nested_groups() {
        let group = ConditionGroup {
            id: "g1".into(),
            combinator: GroupCombinator::Any,
            conditions: vec![Condition {
                field: "subject".into(),
                operator: ConditionOperator::Contains,
                value: "urgent".into(),
            }],
            nested_groups: vec![ConditionGroup::match_all()],
        };

        let text = serde_json::to_string(&group).expect("serialize group");
        assert!(text.contains("\"nestedGroups\""));
        assert!(text.contains("\"combinator\":\"any\""));
        assert!(text.contains("\"operator\":\"contains\""));

        let parsed: ConditionGroup = serde_json::from_str(&text).expect("round trip");
        assert_eq!(parsed, group);
    }

    #[test]
    fn step_label_prefers_action_name() {
        let mut step = Step {
            id: "s1".into(),
            kind: StepKind::Action,
            app_id: String::new(),
            display_name: "Display".into(),
            action_name: "Action".into(),
            configured: false,
            config: serde_json::Map::new(),
        };
        assert_eq!(step.label(), "Action");

        step.action_name.clear();
        assert_eq!(step.label(), "Display");

        step.display_name.clear();
        assert_eq!(step.label(), "s1");
    }

    #[test]
    fn stop_on_error_only_disabled_by_explicit_false() {
        let mut step = Step {
            id: "s1".into(),
            kind: StepKind::Action,
            app_id: "slack".into(),
            display_name: String::new(),
            action_name: String::new(),
            configured: true,
            config: serde_json::Map::new(),
        };
        assert!(step.stop_on_error());

        step.config.insert("stopOnError".into(), json!(true));
        assert!(step.stop_on_error());

        // A non-boolean value does not opt the step out of the default policy.
        step.config.insert("stopOnError".into(), json!("false"));
        assert!(step.stop_on_error());

        step.config.insert("stopOnError".into(), json!(false));
        assert!(!step.stop_on_error());
    }
}
