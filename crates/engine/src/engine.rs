//! The execution engine: orchestrates a full workflow run.
//!
//! The engine walks the main step sequence, delegates each step to the
//! executor, applies the per-step failure policy, fans out into matched
//! branch paths, and records the finished run in the history store. Control
//! commands (pause, resume, stop) travel over a Tokio channel and are drained
//! at step boundaries only; a step that is already in flight always finishes.
//!
//! Lifecycle events stream over a second channel whose receiver is handed to
//! the caller at construction time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use relay_types::{BranchPath, BranchResult, Execution, ExecutionStatus, Step, StepResult, WorkflowDefinition, validate_steps};
use relay_util::{ExecutionHistory, InMemoryHistory, execution_id};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, error::TryRecvError, unbounded_channel};
use tracing::{info, warn};

use crate::adapter::AppAdapter;
use crate::executor::{StepOutcome, run_step};
use crate::paths::resolve_paths;

/// Error message recorded when a run is stopped by request.
pub const STOPPED_BY_USER: &str = "stopped by user";

/// Synchronous rejections raised before or outside a run. Failures *within* a
/// run never surface here; they land on the Execution record instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("an execution is already running")]
    AlreadyRunning,
    #[error("workflow has no steps")]
    EmptySteps,
    #[error("step '{0}' is not configured")]
    UnconfiguredStep(String),
    #[error("workflow is invalid: {0}")]
    InvalidWorkflow(String),
    #[error("no active execution")]
    NoActiveExecution,
    #[error("execution is not paused")]
    NotPaused,
    #[error("no failed execution to retry")]
    NothingToRetry,
}

/// Control commands accepted while a run is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionControl {
    Pause,
    Resume,
    Stop,
}

/// Lifecycle events emitted while a run progresses.
///
/// `Finished` is emitted exactly once per run, after the terminal record has
/// been pushed into history.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    Started {
        execution_id: String,
        workflow_id: String,
    },
    StatusChanged {
        status: ExecutionStatus,
    },
    StepStarted {
        index: usize,
        step_id: String,
        /// Branch path the step belongs to; `None` for the main sequence.
        path_id: Option<String>,
    },
    StepFinished {
        index: usize,
        result: StepResult,
        path_id: Option<String>,
    },
    Finished {
        execution: Execution,
    },
}

/// Everything needed to run one workflow: the step list, optional branch
/// paths, and the trigger payload.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub workflow_id: String,
    pub steps: Vec<Step>,
    pub branch_paths: Vec<BranchPath>,
    pub input_data: Value,
}

impl ExecutionRequest {
    /// Build a request from an authored workflow document. `input` overrides
    /// the document's sample trigger payload when supplied.
    pub fn from_definition(definition: &WorkflowDefinition, input: Option<Value>) -> Self {
        let input_data = input.or_else(|| definition.trigger_data.clone()).unwrap_or(Value::Null);
        Self {
            workflow_id: definition.id.clone(),
            steps: definition.steps.clone(),
            branch_paths: definition.branch_paths.clone(),
            input_data,
        }
    }
}

#[derive(Clone)]
struct FailedRun {
    request: ExecutionRequest,
    retry_count: u32,
}

/// Workflow execution engine bound to one app adapter.
///
/// At most one execution is active per engine instance; a second
/// `start_execution` while one is live is rejected synchronously.
pub struct ExecutionEngine {
    adapter: Arc<dyn AppAdapter>,
    history: Arc<dyn ExecutionHistory>,
    event_tx: UnboundedSender<ExecutionEvent>,
    control_tx: Mutex<Option<UnboundedSender<ExecutionControl>>>,
    /// Mirrors the run loop's pause flag so control calls can check it
    /// without waiting for a step boundary.
    paused: AtomicBool,
    last_failed: Mutex<Option<FailedRun>>,
}

impl ExecutionEngine {
    /// Create an engine with the default in-memory history store. Returns the
    /// engine together with the lifecycle event receiver.
    pub fn new(adapter: Arc<dyn AppAdapter>) -> (Self, UnboundedReceiver<ExecutionEvent>) {
        Self::with_history(adapter, Arc::new(InMemoryHistory::default()))
    }

    /// Create an engine backed by a caller-supplied history store.
    pub fn with_history(adapter: Arc<dyn AppAdapter>, history: Arc<dyn ExecutionHistory>) -> (Self, UnboundedReceiver<ExecutionEvent>) {
        let (event_tx, event_rx) = unbounded_channel();
        let engine = Self {
            adapter,
            history,
            event_tx,
            control_tx: Mutex::new(None),
            paused: AtomicBool::new(false),
            last_failed: Mutex::new(None),
        };
        (engine, event_rx)
    }

    /// Run a workflow to a terminal state and return the finished record.
    ///
    /// Rejects synchronously, before any state mutation, when the request is
    /// structurally invalid, contains an unconfigured step, or another
    /// execution is already active.
    pub async fn start_execution(&self, request: ExecutionRequest) -> Result<Execution, EngineError> {
        self.run(request, 0).await
    }

    /// Re-run the most recent failed request with a fresh execution id and an
    /// incremented retry count.
    pub async fn retry_execution(&self) -> Result<Execution, EngineError> {
        let failed = self
            .last_failed
            .lock()
            .expect("retry lock poisoned")
            .clone()
            .ok_or(EngineError::NothingToRetry)?;
        self.run(failed.request, failed.retry_count + 1).await
    }

    /// Request a pause; takes effect at the next step boundary.
    pub fn pause_execution(&self) -> Result<(), EngineError> {
        self.send_control(ExecutionControl::Pause)
    }

    /// Resume a paused run from its next unexecuted step. Rejected with
    /// [`EngineError::NotPaused`] while the run is executing normally.
    pub fn resume_execution(&self) -> Result<(), EngineError> {
        let guard = self.control_tx.lock().expect("control lock poisoned");
        let sender = guard.as_ref().ok_or(EngineError::NoActiveExecution)?;
        if !self.paused.load(Ordering::Acquire) {
            return Err(EngineError::NotPaused);
        }
        sender.send(ExecutionControl::Resume).map_err(|_| EngineError::NoActiveExecution)
    }

    /// Stop the active run; it finishes `failed` with [`STOPPED_BY_USER`].
    pub fn stop_execution(&self) -> Result<(), EngineError> {
        self.send_control(ExecutionControl::Stop)
    }

    /// Terminal executions recorded so far, most recent first.
    pub fn recent_executions(&self) -> Vec<Execution> {
        self.history.recent()
    }

    /// The history store backing this engine.
    pub fn history(&self) -> Arc<dyn ExecutionHistory> {
        Arc::clone(&self.history)
    }

    fn send_control(&self, command: ExecutionControl) -> Result<(), EngineError> {
        let guard = self.control_tx.lock().expect("control lock poisoned");
        let sender = guard.as_ref().ok_or(EngineError::NoActiveExecution)?;
        sender.send(command).map_err(|_| EngineError::NoActiveExecution)
    }

    async fn run(&self, request: ExecutionRequest, retry_count: u32) -> Result<Execution, EngineError> {
        validate_request(&request)?;
        let mut control_rx = self.acquire_run_slot()?;

        let mut execution = Execution::new(execution_id(), &request.workflow_id, &request.steps, request.input_data.clone(), retry_count);
        info!(execution_id = %execution.id, workflow_id = %execution.workflow_id, retry_count, "starting execution");
        self.emit(ExecutionEvent::Started {
            execution_id: execution.id.clone(),
            workflow_id: execution.workflow_id.clone(),
        });

        self.drive(&mut execution, &request, &mut control_rx).await;
        self.release_run_slot();

        self.emit(ExecutionEvent::StatusChanged { status: execution.status });
        self.history.record(execution.clone());
        self.remember_failure(&execution, &request, retry_count);
        self.emit(ExecutionEvent::Finished {
            execution: execution.clone(),
        });
        info!(execution_id = %execution.id, status = ?execution.status, "execution finished");
        Ok(execution)
    }

    async fn drive(&self, execution: &mut Execution, request: &ExecutionRequest, control_rx: &mut UnboundedReceiver<ExecutionControl>) {
        let mut control = ControlState::default();
        execution.begin();
        self.emit(ExecutionEvent::StatusChanged {
            status: ExecutionStatus::Running,
        });

        let mut current_data = request.input_data.clone();

        for index in 0..request.steps.len() {
            if !self.checkpoint(&mut control, control_rx, execution).await {
                execution.finish_failed(STOPPED_BY_USER);
                return;
            }

            let step = &request.steps[index];
            execution.steps[index].begin(current_data.clone());
            self.emit(ExecutionEvent::StepStarted {
                index,
                step_id: step.id.clone(),
                path_id: None,
            });

            let outcome = run_step(step, &current_data, self.adapter.as_ref()).await;
            let halt_error = apply_outcome(step, outcome, &mut execution.steps[index], &mut current_data, index);
            self.emit(ExecutionEvent::StepFinished {
                index,
                result: execution.steps[index].clone(),
                path_id: None,
            });

            if let Some(error) = halt_error {
                execution.finish_failed(error);
                return;
            }
        }

        if !self.run_branch_paths(execution, request, control_rx, &mut control, &current_data).await {
            return;
        }

        execution.finish_completed(current_data);
    }

    /// Fan out into every matched branch path, in matched order. Returns
    /// `false` when the run reached a terminal failure.
    async fn run_branch_paths(
        &self,
        execution: &mut Execution,
        request: &ExecutionRequest,
        control_rx: &mut UnboundedReceiver<ExecutionControl>,
        control: &mut ControlState,
        parent_data: &Value,
    ) -> bool {
        let matched: Vec<BranchPath> = resolve_paths(&request.branch_paths, parent_data).into_iter().cloned().collect();

        for path in matched {
            let mut branch = BranchResult {
                path_name: path.name.clone(),
                steps: Vec::new(),
            };
            let mut path_data = parent_data.clone();
            let mut halt_error = None;

            for (index, step) in path.steps.iter().enumerate() {
                if !self.checkpoint(control, control_rx, execution).await {
                    halt_error = Some(STOPPED_BY_USER.to_string());
                    break;
                }

                let mut result = StepResult::pending(step);
                result.begin(path_data.clone());
                self.emit(ExecutionEvent::StepStarted {
                    index,
                    step_id: step.id.clone(),
                    path_id: Some(path.id.clone()),
                });

                let outcome = run_step(step, &path_data, self.adapter.as_ref()).await;
                let error = apply_outcome(step, outcome, &mut result, &mut path_data, index);
                self.emit(ExecutionEvent::StepFinished {
                    index,
                    result: result.clone(),
                    path_id: Some(path.id.clone()),
                });
                branch.steps.push(result);

                if let Some(cause) = error {
                    halt_error = Some(format!("Path '{}' {cause}", path.name));
                    break;
                }
            }

            execution.path_results.insert(path.id.clone(), branch);
            if let Some(error) = halt_error {
                execution.finish_failed(error);
                return false;
            }
        }
        true
    }

    /// Drain pending control commands and park while paused. Returns `false`
    /// when a stop was requested.
    async fn checkpoint(&self, control: &mut ControlState, control_rx: &mut UnboundedReceiver<ExecutionControl>, execution: &mut Execution) -> bool {
        loop {
            match control_rx.try_recv() {
                Ok(command) => self.process_command(control, command, execution),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }

        while control.paused && !control.stop_requested {
            match control_rx.recv().await {
                Some(command) => self.process_command(control, command, execution),
                None => break,
            }
        }

        !control.stop_requested
    }

    fn process_command(&self, control: &mut ControlState, command: ExecutionControl, execution: &mut Execution) {
        match command {
            ExecutionControl::Pause => {
                if !control.paused && !control.stop_requested {
                    control.paused = true;
                    self.paused.store(true, Ordering::Release);
                    execution.status = ExecutionStatus::Paused;
                    info!(execution_id = %execution.id, "execution paused");
                    self.emit(ExecutionEvent::StatusChanged {
                        status: ExecutionStatus::Paused,
                    });
                }
            }
            ExecutionControl::Resume => {
                if control.paused {
                    control.paused = false;
                    self.paused.store(false, Ordering::Release);
                    execution.status = ExecutionStatus::Running;
                    info!(execution_id = %execution.id, "execution resumed");
                    self.emit(ExecutionEvent::StatusChanged {
                        status: ExecutionStatus::Running,
                    });
                }
            }
            ExecutionControl::Stop => {
                if !control.stop_requested {
                    control.stop_requested = true;
                    control.paused = false;
                    self.paused.store(false, Ordering::Release);
                    warn!(execution_id = %execution.id, "execution stop requested");
                }
            }
        }
    }

    fn acquire_run_slot(&self) -> Result<UnboundedReceiver<ExecutionControl>, EngineError> {
        let mut guard = self.control_tx.lock().expect("control lock poisoned");
        if guard.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        let (control_tx, control_rx) = unbounded_channel();
        *guard = Some(control_tx);
        Ok(control_rx)
    }

    fn release_run_slot(&self) {
        self.control_tx.lock().expect("control lock poisoned").take();
        self.paused.store(false, Ordering::Release);
    }

    fn remember_failure(&self, execution: &Execution, request: &ExecutionRequest, retry_count: u32) {
        let mut guard = self.last_failed.lock().expect("retry lock poisoned");
        if execution.status == ExecutionStatus::Failed {
            *guard = Some(FailedRun {
                request: request.clone(),
                retry_count,
            });
        } else {
            *guard = None;
        }
    }

    fn emit(&self, event: ExecutionEvent) {
        // A dropped receiver must not break the run itself.
        let _ = self.event_tx.send(event);
    }
}

#[derive(Default)]
struct ControlState {
    paused: bool,
    stop_requested: bool,
}

/// Fold a step outcome into its result record and the flowing payload.
/// Returns the halting error message when the failure policy says to stop.
fn apply_outcome(step: &Step, outcome: StepOutcome, result: &mut StepResult, current_data: &mut Value, index: usize) -> Option<String> {
    result.logs.extend(outcome.logs);

    if outcome.success {
        result.complete(outcome.data.clone());
        *current_data = outcome.data;
        return None;
    }

    let cause = outcome.error.unwrap_or_else(|| "unknown error".to_string());
    if step.stop_on_error() {
        result.fail(cause.clone());
        // 1-based index so the message matches what operators see in the UI.
        Some(format!("Step {} failed: {cause}", index + 1))
    } else {
        result.skip(cause);
        None
    }
}

fn validate_request(request: &ExecutionRequest) -> Result<(), EngineError> {
    if request.steps.is_empty() {
        return Err(EngineError::EmptySteps);
    }
    for step in request.steps.iter().chain(request.branch_paths.iter().flat_map(|path| path.steps.iter())) {
        if !step.configured {
            return Err(EngineError::UnconfiguredStep(step.id.clone()));
        }
    }
    validate_steps(&request.steps, &request.branch_paths).map_err(|problems| EngineError::InvalidWorkflow(problems.join("; ")))
}
