//! Human-readable summary of a finished run.
//!
//! Pure formatting over [`ExecutionResult`]; all counts and statuses were
//! already computed by the orchestrator.

use tagforge_types::ResourceKind;

use crate::result::{ExecutionResult, ItemOutcome};

/// Render the run summary: status, per-kind counts, workspace coordinates,
/// and one line per resource that was not created.
pub fn render(result: &ExecutionResult) -> String {
    let variables = result.tally(ResourceKind::Variable);
    let triggers = result.tally(ResourceKind::Trigger);
    let tags = result.tally(ResourceKind::Tag);
    let totals = result.totals();

    let mut lines = Vec::new();
    lines.push(format!(
        "Status: {} (took {:.2}s)",
        result.status(),
        result.duration.as_secs_f64()
    ));
    lines.push(format!(
        "Created => Variables: {}, Triggers: {}, Tags: {}",
        variables.created, triggers.created, tags.created
    ));
    if totals.failed > 0 || totals.skipped > 0 {
        lines.push(format!("Failed: {}, Skipped: {}", totals.failed, totals.skipped));
    }
    lines.push(format!(
        "Workspace => {} (ID: {})",
        result.workspace_name, result.workspace_id
    ));
    lines.push(format!("Workspace URL: {}", result.workspace_url));

    for kind in [ResourceKind::Variable, ResourceKind::Trigger, ResourceKind::Tag] {
        for item in result.items(kind) {
            match &item.outcome {
                ItemOutcome::Created { .. } => {}
                ItemOutcome::Skipped { reason } => {
                    lines.push(format!("- {} '{}' skipped: {}", kind, item.name, reason));
                }
                ItemOutcome::Failed { error } => {
                    lines.push(format!("- {} '{}' failed: {}", kind, item.name, error));
                }
            }
        }
    }

    lines.join("\n")
}
