//! Strongly typed workflow and execution-record definitions shared across the
//! Relay engine and CLI.
//!
//! The execution-record types serialize with the exact field names hosts
//! already consume (`stepId`, `executionTimeMs`, `inputData`, …) so a history
//! snapshot can be handed to existing tooling verbatim. Ordered collections
//! preserve authoring/matching order so renderers can present steps and branch
//! results in a predictable sequence.

pub mod execution;
pub mod workflow;

pub use execution::{BranchResult, Execution, ExecutionStatus, StepResult, StepResultStatus};
pub use workflow::{
    BranchPath, Condition, ConditionGroup, ConditionOperator, GroupCombinator, Step, StepKind, WorkflowDefinition,
};
pub use workflow::validation::{validate_document, validate_steps};
