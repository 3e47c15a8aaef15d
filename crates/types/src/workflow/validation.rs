//! Structural validation shared across workflow consumers.
//!
//! These routines enforce the invariants a document must satisfy before the
//! engine will accept it: the main sequence opens with the workflow's single
//! trigger, branch paths carry no triggers of their own, and step identifiers
//! are unique across the whole document.

use std::collections::HashSet;

use super::{BranchPath, Step, StepKind, WorkflowDefinition};

/// Validate a full workflow document.
///
/// Returns every violation found rather than stopping at the first, so
/// authoring surfaces can present a complete report.
pub fn validate_document(definition: &WorkflowDefinition) -> Result<(), Vec<String>> {
    validate_steps(&definition.steps, &definition.branch_paths)
}

/// Validate a step sequence plus its branch paths.
pub fn validate_steps(steps: &[Step], branch_paths: &[BranchPath]) -> Result<(), Vec<String>> {
    let mut issues = Vec::new();

    if steps.is_empty() {
        issues.push("workflow has no steps".to_string());
    } else if steps[0].kind != StepKind::Trigger {
        issues.push(format!("first step '{}' must be a trigger", steps[0].id));
    }

    let trigger_count = steps.iter().filter(|step| step.kind == StepKind::Trigger).count();
    if trigger_count > 1 {
        issues.push(format!("workflow declares {} triggers; exactly one is allowed", trigger_count));
    }

    for path in branch_paths {
        for step in &path.steps {
            if step.kind == StepKind::Trigger {
                issues.push(format!("branch path '{}' contains trigger step '{}'", path.id, step.id));
            }
        }
    }

    let mut seen = HashSet::new();
    let all_steps = steps.iter().chain(branch_paths.iter().flat_map(|path| path.steps.iter()));
    for step in all_steps {
        if !seen.insert(step.id.as_str()) {
            issues.push(format!("duplicate step identifier '{}'", step.id));
        }
    }

    let mut seen_paths = HashSet::new();
    for path in branch_paths {
        if !seen_paths.insert(path.id.as_str()) {
            issues.push(format!("duplicate branch path identifier '{}'", path.id));
        }
    }

    if issues.is_empty() { Ok(()) } else { Err(issues) }
}
