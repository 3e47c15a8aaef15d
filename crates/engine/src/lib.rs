//! # Relay Engine
//!
//! The Relay Engine validates and executes declarative automation workflows:
//! an ordered trigger/action/filter sequence, optionally fanned out into
//! guarded branch paths, run against a JSON payload.
//!
//! ## Key pieces
//!
//! - **`adapter`**: the pluggable [`AppAdapter`] boundary plus simulated and
//!   scripted implementations
//! - **`condition`**: total evaluation of condition groups against a record
//! - **`paths`**: order-preserving, non-exclusive branch path resolution
//! - **`executor`**: single-step execution with failure capture
//! - **`engine`**: the orchestrating [`ExecutionEngine`] with pause, resume,
//!   stop, and retry controls and a streamed event surface
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use relay_engine::{ExecutionEngine, ExecutionRequest, SimulatedAdapter, parse_workflow_file};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let definition = parse_workflow_file("workflows/email_triage.yaml")?;
//! let (engine, _events) = ExecutionEngine::new(Arc::new(SimulatedAdapter::new()));
//! let execution = engine
//!     .start_execution(ExecutionRequest::from_definition(&definition, None))
//!     .await?;
//! println!("{:?}", execution.status);
//! # Ok(())
//! # }
//! ```

use std::{fs, path::Path};

use anyhow::{Context, Result};
use relay_types::{WorkflowDefinition, validate_document};

pub mod adapter;
pub mod condition;
pub mod engine;
pub mod executor;
pub mod paths;

pub use adapter::{AppAdapter, ScriptedAdapter, SimulatedAdapter};
pub use condition::{evaluate_condition, evaluate_group};
pub use engine::{EngineError, ExecutionControl, ExecutionEngine, ExecutionEvent, ExecutionRequest, STOPPED_BY_USER};
pub use executor::{StepOutcome, run_step};
pub use paths::resolve_paths;

/// Parse a workflow document from a YAML or JSON file and validate its
/// structure.
///
/// YAML is the primary authoring format; JSON parses through the same
/// deserializer since YAML is a superset.
pub fn parse_workflow_file(file_path: impl AsRef<Path>) -> Result<WorkflowDefinition> {
    let file_path = file_path.as_ref();
    let content = fs::read_to_string(file_path).with_context(|| format!("failed to read workflow file: {}", file_path.display()))?;

    let definition: WorkflowDefinition =
        serde_yaml::from_str(&content).with_context(|| format!("failed to parse workflow file: {}", file_path.display()))?;

    validate_document(&definition)
        .map_err(|problems| anyhow::anyhow!("workflow '{}' is invalid: {}", definition.id, problems.join("; ")))?;
    Ok(definition)
}
