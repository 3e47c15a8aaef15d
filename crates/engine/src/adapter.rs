//! The app-adapter boundary.
//!
//! An adapter is the only external collaborator the engine depends on: it
//! receives the step's app id, action hint, configuration, and current
//! payload, and returns either an output payload or an error. The engine is
//! agnostic to what app ids mean; hosts supply real integrations by
//! implementing [`AppAdapter`].

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use rand::Rng;
use serde_json::{Value, json};
use tracing::debug;

/// Pluggable integration boundary invoked by the step executor.
#[async_trait]
pub trait AppAdapter: Send + Sync {
    /// Execute one step's app behavior.
    ///
    /// `action` is a human-oriented hint (the step's action label); `config`
    /// is the step's open configuration mapping; `input` is the current
    /// pipeline payload. Errors returned here are captured per step and never
    /// escape the engine.
    async fn invoke(&self, app_id: &str, action: &str, config: &serde_json::Map<String, Value>, input: &Value) -> Result<Value>;
}

/// Simulated latency range for unmapped app ids, in milliseconds.
const SIMULATED_LATENCY_MS: std::ops::RangeInclusive<u64> = 100..=500;
/// Default failure probability for unmapped app ids.
const DEFAULT_FAILURE_RATE: f64 = 0.1;

/// Development adapter: deterministic canned responses for the known app ids,
/// randomized latency and failure for everything else.
///
/// Production hosts replace this adapter, not the engine.
pub struct SimulatedAdapter {
    failure_rate: f64,
}

impl SimulatedAdapter {
    pub fn new() -> Self {
        Self {
            failure_rate: DEFAULT_FAILURE_RATE,
        }
    }

    /// Override the failure probability applied to unmapped app ids.
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate.clamp(0.0, 1.0);
        self
    }

    fn canned_response(app_id: &str, config: &serde_json::Map<String, Value>, input: &Value) -> Option<Value> {
        match app_id {
            "gmail" => Some(json!({
                "emails": [
                    {"subject": "Weekly report", "from": "reports@example.com"},
                    {"subject": "Invoice #1042", "from": "billing@example.com"},
                ],
                "count": 2,
            })),
            "slack" => {
                let channel = config.get("channel").cloned().unwrap_or_else(|| json!("#general"));
                Some(json!({"ok": true, "channel": channel, "messageId": "sim-0001"}))
            }
            "sheets" => Some(json!({"spreadsheetId": "sim-sheet", "updatedRows": 1})),
            "webhook" => Some(json!({"status": 200, "body": input.clone()})),
            "delay" => Some(input.clone()),
            _ => None,
        }
    }
}

impl Default for SimulatedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppAdapter for SimulatedAdapter {
    async fn invoke(&self, app_id: &str, action: &str, config: &serde_json::Map<String, Value>, input: &Value) -> Result<Value> {
        if let Some(response) = Self::canned_response(app_id, config, input) {
            debug!(app_id, action, "simulated adapter returning canned response");
            return Ok(response);
        }

        // Draw latency and failure before the await so the RNG handle does
        // not live across a suspension point.
        let (latency_ms, failed) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(SIMULATED_LATENCY_MS), rng.gen_bool(self.failure_rate))
        };
        tokio::time::sleep(Duration::from_millis(latency_ms)).await;

        if failed {
            bail!("simulated failure for app '{}'", app_id);
        }
        Ok(json!({"appId": app_id, "action": action, "echo": input.clone()}))
    }
}

/// One scripted adapter outcome.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Succeed(Value),
    Fail(String),
}

/// Deterministic fake adapter for tests and chaos runs.
///
/// Outcomes are queued per app id and consumed in order; the final queued
/// outcome repeats for any further invocations. App ids with no script echo
/// their input deterministically. Latency is injectable for exercising the
/// engine's step-boundary suspension points.
#[derive(Default)]
pub struct ScriptedAdapter {
    outcomes: Mutex<HashMap<String, VecDeque<ScriptedOutcome>>>,
    latency: Option<Duration>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a fixed latency to every invocation.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a success outcome for `app_id`.
    pub fn respond(self, app_id: impl Into<String>, response: Value) -> Self {
        self.push(app_id.into(), ScriptedOutcome::Succeed(response));
        self
    }

    /// Queue a failure outcome for `app_id`.
    pub fn fail(self, app_id: impl Into<String>, message: impl Into<String>) -> Self {
        self.push(app_id.into(), ScriptedOutcome::Fail(message.into()));
        self
    }

    fn push(&self, app_id: String, outcome: ScriptedOutcome) {
        let mut outcomes = self.outcomes.lock().expect("script lock poisoned");
        outcomes.entry(app_id).or_default().push_back(outcome);
    }

    fn take(&self, app_id: &str) -> Option<ScriptedOutcome> {
        let mut outcomes = self.outcomes.lock().expect("script lock poisoned");
        let queue = outcomes.get_mut(app_id)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl AppAdapter for ScriptedAdapter {
    async fn invoke(&self, app_id: &str, action: &str, _config: &serde_json::Map<String, Value>, input: &Value) -> Result<Value> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.take(app_id) {
            Some(ScriptedOutcome::Succeed(response)) => Ok(response),
            Some(ScriptedOutcome::Fail(message)) => bail!(message),
            None => Ok(json!({"appId": app_id, "action": action, "echo": input.clone()})),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_config() -> serde_json::Map<String, Value> {
        serde_json::Map::new()
    }

    #[tokio::test]
    async fn scripted_outcomes_consume_in_order_and_last_repeats() {
        let adapter = ScriptedAdapter::new()
            .fail("slack", "channel not found")
            .respond("slack", json!({"ok": true}));

        let first = adapter.invoke("slack", "send", &empty_config(), &json!({})).await;
        assert!(first.is_err());

        let second = adapter.invoke("slack", "send", &empty_config(), &json!({})).await.unwrap();
        assert_eq!(second, json!({"ok": true}));

        let third = adapter.invoke("slack", "send", &empty_config(), &json!({})).await.unwrap();
        assert_eq!(third, json!({"ok": true}));
    }

    #[tokio::test]
    async fn scripted_adapter_echoes_unscripted_apps() {
        let adapter = ScriptedAdapter::new();
        let output = adapter.invoke("gmail", "fetch", &empty_config(), &json!({"k": 1})).await.unwrap();
        assert_eq!(output["appId"], "gmail");
        assert_eq!(output["echo"], json!({"k": 1}));
    }

    #[tokio::test]
    async fn simulated_adapter_returns_canned_gmail_payload() {
        let adapter = SimulatedAdapter::new();
        let output = adapter.invoke("gmail", "fetch", &empty_config(), &json!({})).await.unwrap();
        assert!(output["emails"].is_array());
    }

    #[tokio::test]
    async fn simulated_adapter_respects_slack_channel_config() {
        let adapter = SimulatedAdapter::new();
        let mut config = empty_config();
        config.insert("channel".into(), json!("#oncall"));
        let output = adapter.invoke("slack", "send", &config, &json!({})).await.unwrap();
        assert_eq!(output["channel"], json!("#oncall"));
    }

    #[tokio::test]
    async fn simulated_adapter_failure_rate_bounds() {
        let always = SimulatedAdapter::new().with_failure_rate(1.0);
        assert!(always.invoke("unknown", "noop", &empty_config(), &json!({})).await.is_err());

        let never = SimulatedAdapter::new().with_failure_rate(0.0);
        assert!(never.invoke("unknown", "noop", &empty_config(), &json!({})).await.is_ok());
    }
}
