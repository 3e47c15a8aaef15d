//! Single-step execution against the app adapter.
//!
//! The executor is a thin, total boundary: whatever the adapter does, the
//! caller gets back a [`StepOutcome`] describing success or failure. Errors
//! never cross this boundary as `Err`.

use relay_types::Step;
use serde_json::Value;
use tracing::{debug, warn};

use crate::adapter::AppAdapter;

/// Outcome of running one step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub success: bool,
    /// Adapter output on success; `Null` on failure.
    pub data: Value,
    pub error: Option<String>,
    /// Log lines produced while running the step.
    pub logs: Vec<String>,
}

impl StepOutcome {
    fn succeeded(data: Value, logs: Vec<String>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            logs,
        }
    }

    fn failed(error: String, logs: Vec<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error),
            logs,
        }
    }
}

/// Run a single step's app behavior and capture the result.
///
/// Unconfigured steps fail without reaching the adapter. Adapter errors are
/// converted into failure outcomes with the full error chain in the message.
pub async fn run_step(step: &Step, input: &Value, adapter: &dyn AppAdapter) -> StepOutcome {
    let label = step.label();
    let mut logs = vec![format!("Executing step '{label}' (app: {})", step.app_id)];

    if !step.configured {
        let error = format!("step '{}' is not configured", step.id);
        warn!(step_id = %step.id, "refusing to execute unconfigured step");
        logs.push(format!("Step '{label}' rejected: not configured"));
        return StepOutcome::failed(error, logs);
    }

    match adapter.invoke(&step.app_id, label, &step.config, input).await {
        Ok(data) => {
            debug!(step_id = %step.id, app_id = %step.app_id, "step executed");
            logs.push(format!("Step '{label}' executed successfully"));
            StepOutcome::succeeded(data, logs)
        }
        Err(err) => {
            let error = format!("{err:#}");
            debug!(step_id = %step.id, app_id = %step.app_id, %error, "step failed");
            logs.push(format!("Step '{label}' failed: {error}"));
            StepOutcome::failed(error, logs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ScriptedAdapter;
    use relay_types::StepKind;
    use serde_json::json;

    fn step(id: &str, app_id: &str, configured: bool) -> Step {
        Step {
            id: id.into(),
            kind: StepKind::Action,
            app_id: app_id.into(),
            display_name: String::new(),
            action_name: String::new(),
            configured,
            config: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn unconfigured_step_fails_without_reaching_the_adapter() {
        let adapter = ScriptedAdapter::new().respond("slack", json!({"ok": true}));
        let outcome = run_step(&step("s1", "slack", false), &json!({}), &adapter).await;

        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("step 's1' is not configured"));
        // The scripted response is still queued because the adapter never ran.
        let next = run_step(&step("s2", "slack", true), &json!({}), &adapter).await;
        assert_eq!(next.data, json!({"ok": true}));
    }

    #[tokio::test]
    async fn success_carries_adapter_output_and_logs() {
        let adapter = ScriptedAdapter::new().respond("gmail", json!({"emails": []}));
        let outcome = run_step(&step("s1", "gmail", true), &json!({}), &adapter).await;

        assert!(outcome.success);
        assert_eq!(outcome.data, json!({"emails": []}));
        assert!(outcome.error.is_none());
        assert!(outcome.logs.iter().any(|line| line.contains("executed successfully")));
    }

    #[tokio::test]
    async fn adapter_errors_become_failure_outcomes() {
        let adapter = ScriptedAdapter::new().fail("slack", "channel not found");
        let outcome = run_step(&step("s1", "slack", true), &json!({}), &adapter).await;

        assert!(!outcome.success);
        assert_eq!(outcome.data, Value::Null);
        assert_eq!(outcome.error.as_deref(), Some("channel not found"));
        assert!(outcome.logs.iter().any(|line| line.contains("failed: channel not found")));
    }
}
