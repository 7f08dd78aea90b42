//! Per-item outcome accumulation for one pipeline run.
//!
//! Every outcome is a first-class value here, never a swallowed error: the
//! orchestrator records one [`ItemResult`] per input descriptor, in input
//! order, and the aggregate [`RunStatus`] is derived from the full set once
//! the run finalizes.

use std::time::Duration;

use tagforge_types::ResourceKind;

/// What happened to one resource descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Created remotely; carries the server-assigned id.
    Created { id: String },
    /// Never attempted, with the reason (for example an unresolved trigger
    /// reference).
    Skipped { reason: String },
    /// Attempted and rejected; carries the error text.
    Failed { error: String },
}

/// One descriptor paired with its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    pub name: String,
    pub outcome: ItemOutcome,
}

impl ItemResult {
    pub fn created(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: ItemOutcome::Created { id: id.into() },
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: ItemOutcome::Skipped { reason: reason.into() },
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: ItemOutcome::Failed { error: error.into() },
        }
    }
}

/// Aggregate outcome of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every resource was created.
    Success,
    /// At least one resource was created, but some failed or were skipped.
    Partial,
    /// The workspace exists but nothing else succeeded.
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => f.write_str("SUCCESS"),
            RunStatus::Partial => f.write_str("PARTIAL"),
            RunStatus::Failed => f.write_str("FAILED"),
        }
    }
}

/// Created/failed/skipped counts for one resource kind (or the whole run).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub created: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Tally {
    fn add(&mut self, other: Tally) {
        self.created += other.created;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Everything one run produced, immutable once the orchestrator finalizes it.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub workspace_name: String,
    pub workspace_id: String,
    pub workspace_url: String,
    pub variables: Vec<ItemResult>,
    pub triggers: Vec<ItemResult>,
    pub tags: Vec<ItemResult>,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn new(workspace_name: impl Into<String>, workspace_id: impl Into<String>, workspace_url: impl Into<String>) -> Self {
        Self {
            workspace_name: workspace_name.into(),
            workspace_id: workspace_id.into(),
            workspace_url: workspace_url.into(),
            variables: Vec::new(),
            triggers: Vec::new(),
            tags: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn items(&self, kind: ResourceKind) -> &[ItemResult] {
        match kind {
            ResourceKind::Variable => &self.variables,
            ResourceKind::Trigger => &self.triggers,
            ResourceKind::Tag => &self.tags,
        }
    }

    pub fn tally(&self, kind: ResourceKind) -> Tally {
        let mut tally = Tally::default();
        for item in self.items(kind) {
            match item.outcome {
                ItemOutcome::Created { .. } => tally.created += 1,
                ItemOutcome::Skipped { .. } => tally.skipped += 1,
                ItemOutcome::Failed { .. } => tally.failed += 1,
            }
        }
        tally
    }

    pub fn totals(&self) -> Tally {
        let mut totals = Tally::default();
        for kind in [ResourceKind::Variable, ResourceKind::Trigger, ResourceKind::Tag] {
            totals.add(self.tally(kind));
        }
        totals
    }

    /// `Success` needs zero failures and zero skips; `Partial` needs at least
    /// one creation; everything else is `Failed`.
    pub fn status(&self) -> RunStatus {
        let totals = self.totals();
        if totals.failed == 0 && totals.skipped == 0 {
            RunStatus::Success
        } else if totals.created > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(variables: Vec<ItemResult>, tags: Vec<ItemResult>) -> ExecutionResult {
        let mut result = ExecutionResult::new("WS", "1", "https://example/ws/1");
        result.variables = variables;
        result.tags = tags;
        result
    }

    #[test]
    fn all_created_is_success() {
        let result = result_with(vec![ItemResult::created("A", "1")], vec![ItemResult::created("T", "2")]);
        assert_eq!(result.status(), RunStatus::Success);
        assert_eq!(result.totals().created, 2);
    }

    #[test]
    fn empty_run_counts_as_success() {
        let result = result_with(vec![], vec![]);
        assert_eq!(result.status(), RunStatus::Success);
    }

    #[test]
    fn mixed_outcomes_are_partial() {
        let result = result_with(
            vec![ItemResult::created("A", "1")],
            vec![ItemResult::skipped("T", "missing trigger: X")],
        );
        assert_eq!(result.status(), RunStatus::Partial);
    }

    #[test]
    fn nothing_created_is_failed() {
        let result = result_with(vec![ItemResult::failed("A", "409")], vec![ItemResult::skipped("T", "missing")]);
        assert_eq!(result.status(), RunStatus::Failed);
    }

    #[test]
    fn tallies_are_per_kind() {
        let result = result_with(
            vec![ItemResult::created("A", "1"), ItemResult::failed("B", "boom")],
            vec![ItemResult::skipped("T", "missing")],
        );

        assert_eq!(
            result.tally(tagforge_types::ResourceKind::Variable),
            Tally {
                created: 1,
                failed: 1,
                skipped: 0
            }
        );
        assert_eq!(result.tally(tagforge_types::ResourceKind::Tag).skipped, 1);
        assert_eq!(result.tally(tagforge_types::ResourceKind::Trigger), Tally::default());
    }
}
