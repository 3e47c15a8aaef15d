//! Execution records produced by the engine.
//!
//! An [`Execution`] is one run of a workflow against a given input, with full
//! per-step history. These records are exclusively mutated by the engine while
//! a run is live and become immutable once a terminal status is reached; the
//! serialized field names are part of the host-facing contract.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::workflow::Step;

/// Status of a single step within an execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepResultStatus {
    /// Seeded but not yet dispatched.
    Pending,
    /// Dispatched to the app adapter.
    Running,
    /// Adapter returned success; output recorded.
    Completed,
    /// Adapter returned failure under the stop-on-error policy.
    Failed,
    /// Adapter returned failure but the step opted into skip-and-continue.
    Skipped,
}

/// Status of a whole execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Paused,
}

impl ExecutionStatus {
    /// `completed` and `failed` are terminal; no transition leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

/// Result of one step execution, in step-definition order within the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Identifier of the step definition this result belongs to.
    pub step_id: String,
    /// Step label at execution time.
    pub step_name: String,
    /// Current status.
    pub status: StepResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Wall-clock duration of the step in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    /// Payload the step was invoked with.
    #[serde(default)]
    pub input_data: JsonValue,
    /// Payload returned by the adapter; feeds the next step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Log lines captured while running the step.
    #[serde(default)]
    pub logs: Vec<String>,
}

impl StepResult {
    /// Seed a pending result for a step definition.
    pub fn pending(step: &Step) -> Self {
        Self {
            step_id: step.id.clone(),
            step_name: step.label().to_string(),
            status: StepResultStatus::Pending,
            start_time: None,
            end_time: None,
            execution_time_ms: None,
            input_data: JsonValue::Null,
            output_data: None,
            error: None,
            logs: Vec::new(),
        }
    }

    /// Mark the step running and record its input payload and start time.
    pub fn begin(&mut self, input: JsonValue) {
        self.status = StepResultStatus::Running;
        self.start_time = Some(Utc::now());
        self.input_data = input;
    }

    /// Mark the step completed with the adapter's output.
    pub fn complete(&mut self, output: JsonValue) {
        self.output_data = Some(output);
        self.close(StepResultStatus::Completed);
    }

    /// Mark the step failed with the adapter's error.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.close(StepResultStatus::Failed);
    }

    /// Mark the step skipped; the failure that caused the skip is retained.
    pub fn skip(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.close(StepResultStatus::Skipped);
    }

    fn close(&mut self, status: StepResultStatus) {
        let ended = Utc::now();
        self.status = status;
        self.end_time = Some(ended);
        if let Some(started) = self.start_time {
            let elapsed = ended.signed_duration_since(started).num_milliseconds().max(0);
            self.execution_time_ms = Some(elapsed as u64);
        }
    }
}

/// Per-branch step results produced by path fan-out, keyed by path id in the
/// order paths matched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BranchResult {
    /// Path name at execution time.
    pub path_name: String,
    /// Ordered results for the path's step list.
    pub steps: Vec<StepResult>,
}

/// One run of a workflow: overall status, timing, payloads, and the full
/// per-step result history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    /// Unique execution identifier.
    pub id: String,
    /// Identifier of the workflow this run belongs to.
    pub workflow_id: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_execution_time_ms: Option<u64>,
    /// Trigger payload the run started with.
    #[serde(default)]
    pub input_data: JsonValue,
    /// Final pipeline output when the run completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Main-sequence results in step-definition order.
    pub steps: Vec<StepResult>,
    /// Branch fan-out results keyed by path id, in matched order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub path_results: IndexMap<String, BranchResult>,
    /// Number of times this run has been retried from a failed predecessor.
    #[serde(default)]
    pub retry_count: u32,
}

impl Execution {
    /// Create a pending execution with one seeded pending result per step.
    pub fn new(id: impl Into<String>, workflow_id: impl Into<String>, steps: &[Step], input_data: JsonValue, retry_count: u32) -> Self {
        Self {
            id: id.into(),
            workflow_id: workflow_id.into(),
            status: ExecutionStatus::Pending,
            start_time: None,
            end_time: None,
            total_execution_time_ms: None,
            input_data,
            output_data: None,
            error: None,
            steps: steps.iter().map(StepResult::pending).collect(),
            path_results: IndexMap::new(),
            retry_count,
        }
    }

    /// Transition to `running` and record the start time.
    pub fn begin(&mut self) {
        self.status = ExecutionStatus::Running;
        self.start_time = Some(Utc::now());
    }

    /// Terminal success: record the final pipeline output and timing.
    pub fn finish_completed(&mut self, output: JsonValue) {
        self.output_data = Some(output);
        self.close(ExecutionStatus::Completed);
    }

    /// Terminal failure: record the error and timing.
    pub fn finish_failed(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.close(ExecutionStatus::Failed);
    }

    fn close(&mut self, status: ExecutionStatus) {
        let ended = Utc::now();
        self.status = status;
        self.end_time = Some(ended);
        if let Some(started) = self.start_time {
            let elapsed = ended.signed_duration_since(started).num_milliseconds().max(0);
            self.total_execution_time_ms = Some(elapsed as u64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::StepKind;
    use serde_json::json;

    fn step(id: &str) -> Step {
        Step {
            id: id.into(),
            kind: StepKind::Action,
            app_id: "demo".into(),
            display_name: format!("Step {id}"),
            action_name: String::new(),
            configured: true,
            config: serde_json::Map::new(),
        }
    }

    #[test]
    fn new_execution_seeds_pending_results_in_order() {
        let steps = vec![step("a"), step("b"), step("c")];
        let execution = Execution::new("exec-1", "wf-1", &steps, json!({"k": 1}), 0);

        assert_eq!(execution.status, ExecutionStatus::Pending);
        assert_eq!(execution.steps.len(), 3);
        let ids: Vec<&str> = execution.steps.iter().map(|result| result.step_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(execution.steps.iter().all(|result| result.status == StepResultStatus::Pending));
    }

    #[test]
    fn step_lifecycle_records_timing_and_output() {
        let mut result = StepResult::pending(&step("a"));
        result.begin(json!({"in": true}));
        assert_eq!(result.status, StepResultStatus::Running);
        assert!(result.start_time.is_some());

        result.complete(json!({"out": true}));
        assert_eq!(result.status, StepResultStatus::Completed);
        assert!(result.end_time.is_some());
        assert!(result.execution_time_ms.is_some());
        assert_eq!(result.output_data, Some(json!({"out": true})));
    }

    #[test]
    fn skipped_step_retains_error() {
        let mut result = StepResult::pending(&step("a"));
        result.begin(JsonValue::Null);
        result.skip("boom");
        assert_eq!(result.status, StepResultStatus::Skipped);
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn execution_serializes_with_contract_field_names() {
        let steps = vec![step("a")];
        let mut execution = Execution::new("exec-1", "wf-1", &steps, json!({}), 0);
        execution.begin();
        execution.steps[0].begin(json!({}));
        execution.steps[0].complete(json!({"ok": true}));
        execution.finish_completed(json!({"ok": true}));

        let text = serde_json::to_string(&execution).expect("serialize execution");
        assert!(text.contains("\"workflowId\""));
        assert!(text.contains("\"totalExecutionTimeMs\""));
        assert!(text.contains("\"inputData\""));
        assert!(text.contains("\"outputData\""));
        assert!(text.contains("\"retryCount\""));
        assert!(text.contains("\"stepId\""));
        assert!(text.contains("\"executionTimeMs\""));
        assert!(text.contains("\"status\":\"completed\""));
    }

    #[test]
    fn terminal_statuses_are_terminal() {
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(!ExecutionStatus::Paused.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(!ExecutionStatus::Pending.is_terminal());
    }
}
