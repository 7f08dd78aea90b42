//! The batch orchestrator: one linear, reference-resolving run.
//!
//! The run advances through a fixed phase sequence: workspace preparation,
//! then variables, triggers, and tags in input order. Failures before any
//! resource is created (authentication, workspace creation) are fatal;
//! failures on individual resources are recorded and the run continues.
//! Triggers are fully processed, and the name→id map fully populated, before
//! the first tag is attempted: that map is the one causal dependency in the
//! model.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use tagforge_api::{ApiError, ContainerClient, Workspace};
use tagforge_types::{ContainerSeed, TagSpec, TriggerSpec, VariableSpec};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::result::{ExecutionResult, ItemResult};

/// Workspace name used by `--reuse` when no explicit name is given.
const REUSE_WORKSPACE_NAME: &str = "Automation Workspace";

/// Seam between the orchestrator and the remote resource client, so tests can
/// script outcomes without a network.
#[async_trait]
pub trait WorkspaceApi: Send + Sync {
    async fn create_workspace(&self, name: &str, description: &str) -> Result<Workspace, ApiError>;
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, ApiError>;
    async fn clear_workspace(&self, workspace: &Workspace) -> Result<(), ApiError>;
    async fn create_variable(&self, workspace: &Workspace, spec: &VariableSpec) -> Result<String, ApiError>;
    async fn create_trigger(&self, workspace: &Workspace, spec: &TriggerSpec) -> Result<String, ApiError>;
    async fn create_tag(
        &self,
        workspace: &Workspace,
        spec: &TagSpec,
        firing_ids: &[String],
        blocking_ids: &[String],
    ) -> Result<String, ApiError>;
    fn workspace_url(&self, workspace_id: &str) -> String;
}

#[async_trait]
impl WorkspaceApi for ContainerClient {
    async fn create_workspace(&self, name: &str, description: &str) -> Result<Workspace, ApiError> {
        ContainerClient::create_workspace(self, name, description).await
    }

    async fn list_workspaces(&self) -> Result<Vec<Workspace>, ApiError> {
        ContainerClient::list_workspaces(self).await
    }

    async fn clear_workspace(&self, workspace: &Workspace) -> Result<(), ApiError> {
        ContainerClient::clear_workspace(self, workspace).await
    }

    async fn create_variable(&self, workspace: &Workspace, spec: &VariableSpec) -> Result<String, ApiError> {
        ContainerClient::create_variable(self, workspace, spec).await
    }

    async fn create_trigger(&self, workspace: &Workspace, spec: &TriggerSpec) -> Result<String, ApiError> {
        ContainerClient::create_trigger(self, workspace, spec).await
    }

    async fn create_tag(
        &self,
        workspace: &Workspace,
        spec: &TagSpec,
        firing_ids: &[String],
        blocking_ids: &[String],
    ) -> Result<String, ApiError> {
        ContainerClient::create_tag(self, workspace, spec, firing_ids, blocking_ids).await
    }

    fn workspace_url(&self, workspace_id: &str) -> String {
        ContainerClient::workspace_url(self, workspace_id)
    }
}

/// Pipeline phases, in order. `Failed` outcomes are only reachable before
/// `WorkspaceReady`; from there on, failures are per-item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunPhase {
    Idle,
    Authenticated,
    WorkspaceReady,
    VariablesDone,
    TriggersDone,
    TagsDone,
    Finalized,
}

impl RunPhase {
    fn follows(self, prior: RunPhase) -> bool {
        self as u8 == prior as u8 + 1
    }
}

fn advance(phase: &mut RunPhase, next: RunPhase) {
    debug_assert!(next.follows(*phase), "phase {next:?} cannot follow {phase:?}");
    debug!(from = ?phase, to = ?next, "pipeline phase");
    *phase = next;
}

/// The run aborted before any resource list was attempted.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("authentication rejected before any resource was created")]
    Auth(#[source] ApiError),

    #[error("could not prepare workspace '{name}'")]
    Workspace {
        name: String,
        #[source]
        source: ApiError,
    },
}

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Explicit workspace name; a prefix+timestamp name is generated when
    /// absent (or the fixed reuse name when `reuse` is set).
    pub workspace_name: Option<String>,
    /// Prefix for generated workspace names.
    pub workspace_prefix: String,
    /// Workspace description.
    pub description: String,
    /// Reuse (and clear) an existing workspace by name instead of creating a
    /// fresh one.
    pub reuse: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workspace_name: None,
            workspace_prefix: "AutoGen".to_string(),
            description: "Auto-generated workspace".to_string(),
            reuse: false,
        }
    }
}

/// Replay a validated seed against the remote workspace API.
///
/// Returns the accumulated [`ExecutionResult`] unless authentication or
/// workspace preparation failed, which aborts the run with zero creation
/// attempts.
pub async fn run(seed: &ContainerSeed, api: &dyn WorkspaceApi, options: &RunOptions) -> Result<ExecutionResult, FatalError> {
    let started = Instant::now();
    let mut phase = RunPhase::Idle;

    // A constructed client means credentials were discovered; a rejection by
    // the service still surfaces below as a fatal auth error.
    advance(&mut phase, RunPhase::Authenticated);

    let workspace = prepare_workspace(api, options).await.map_err(|(name, source)| match source {
        ApiError::Auth { .. } | ApiError::MissingCredentials { .. } => FatalError::Auth(source),
        _ => FatalError::Workspace { name, source },
    })?;
    advance(&mut phase, RunPhase::WorkspaceReady);

    let mut result = ExecutionResult::new(
        workspace.name.clone(),
        workspace.id.clone(),
        api.workspace_url(&workspace.id),
    );

    info!(count = seed.variables.len(), "creating variables");
    for spec in &seed.variables {
        match api.create_variable(&workspace, spec).await {
            Ok(id) => {
                info!(variable = %spec.name, id = %id, "variable created");
                result.variables.push(ItemResult::created(&spec.name, id));
            }
            Err(error) => {
                warn!(variable = %spec.name, error = %error, "variable creation failed");
                result.variables.push(ItemResult::failed(&spec.name, error.to_string()));
            }
        }
    }
    advance(&mut phase, RunPhase::VariablesDone);

    info!(count = seed.triggers.len(), "creating triggers");
    let mut trigger_ids: IndexMap<String, String> = IndexMap::new();
    for spec in &seed.triggers {
        match api.create_trigger(&workspace, spec).await {
            Ok(id) => {
                info!(trigger = %spec.name, id = %id, "trigger created");
                trigger_ids.insert(spec.name.clone(), id.clone());
                result.triggers.push(ItemResult::created(&spec.name, id));
            }
            Err(error) => {
                // not inserted into the map: dependent tags must skip, not
                // bind to a stale or fabricated id
                warn!(trigger = %spec.name, error = %error, "trigger creation failed");
                result.triggers.push(ItemResult::failed(&spec.name, error.to_string()));
            }
        }
    }
    advance(&mut phase, RunPhase::TriggersDone);

    info!(count = seed.tags.len(), "creating tags");
    for spec in &seed.tags {
        match resolve_trigger_references(spec, &trigger_ids) {
            Ok((firing_ids, blocking_ids)) => {
                match api.create_tag(&workspace, spec, &firing_ids, &blocking_ids).await {
                    Ok(id) => {
                        info!(tag = %spec.name, id = %id, "tag created");
                        result.tags.push(ItemResult::created(&spec.name, id));
                    }
                    Err(error) => {
                        warn!(tag = %spec.name, error = %error, "tag creation failed");
                        result.tags.push(ItemResult::failed(&spec.name, error.to_string()));
                    }
                }
            }
            Err(reason) => {
                warn!(tag = %spec.name, reason = %reason, "tag skipped");
                result.tags.push(ItemResult::skipped(&spec.name, reason));
            }
        }
    }
    advance(&mut phase, RunPhase::TagsDone);

    result.duration = started.elapsed();
    advance(&mut phase, RunPhase::Finalized);
    info!(status = %result.status(), "run finalized");
    Ok(result)
}

/// Resolve every firing and blocking trigger name through the id map.
///
/// A tag with any unresolvable reference is skipped entirely; it must never
/// be created with a partial trigger binding.
fn resolve_trigger_references(
    spec: &TagSpec,
    trigger_ids: &IndexMap<String, String>,
) -> Result<(Vec<String>, Vec<String>), String> {
    let missing: Vec<&String> = spec
        .firing_trigger_names
        .iter()
        .chain(spec.blocking_trigger_names.iter())
        .filter(|name| !trigger_ids.contains_key(name.as_str()))
        .collect();

    if !missing.is_empty() {
        let reason = missing
            .iter()
            .map(|name| format!("missing trigger: {name}"))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(reason);
    }

    let lookup = |names: &[String]| names.iter().map(|name| trigger_ids[name.as_str()].clone()).collect();
    Ok((lookup(&spec.firing_trigger_names), lookup(&spec.blocking_trigger_names)))
}

async fn prepare_workspace(api: &dyn WorkspaceApi, options: &RunOptions) -> Result<Workspace, (String, ApiError)> {
    if options.reuse {
        let name = options
            .workspace_name
            .clone()
            .unwrap_or_else(|| REUSE_WORKSPACE_NAME.to_string());

        let existing = api.list_workspaces().await.map_err(|error| (name.clone(), error))?;
        let workspace = match existing.into_iter().find(|workspace| workspace.name == name) {
            Some(workspace) => {
                info!(workspace = %workspace.name, id = %workspace.id, "reusing existing workspace");
                workspace
            }
            None => {
                info!(workspace = %name, "workspace not found, creating it");
                api.create_workspace(&name, &options.description)
                    .await
                    .map_err(|error| (name.clone(), error))?
            }
        };

        if let Err(error) = api.clear_workspace(&workspace).await {
            warn!(workspace = %workspace.name, error = %error, "could not clear reused workspace, continuing");
        }
        Ok(workspace)
    } else {
        let name = options
            .workspace_name
            .clone()
            .unwrap_or_else(|| generate_workspace_name(&options.workspace_prefix, Local::now()));
        api.create_workspace(&name, &options.description)
            .await
            .map_err(|error| (name, error))
    }
}

/// Timestamped workspace name; second granularity keeps concurrent manual
/// runs from colliding in practice.
pub fn generate_workspace_name(prefix: &str, timestamp: DateTime<Local>) -> String {
    format!("{prefix}_{}", timestamp.format("%Y%m%d_%H%M%S"))
}

/// Retain only resources of one template type across all three lists.
pub fn filter_by_type(seed: &ContainerSeed, type_name: &str) -> ContainerSeed {
    ContainerSeed {
        variables: seed.variables.iter().filter(|v| v.r#type == type_name).cloned().collect(),
        triggers: seed.triggers.iter().filter(|t| t.r#type == type_name).cloned().collect(),
        tags: seed.tags.iter().filter(|t| t.r#type == type_name).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{ItemOutcome, RunStatus};
    use chrono::TimeZone;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct ScriptedApi {
        fail_workspace_with: Option<u16>,
        fail_variables: Vec<String>,
        fail_triggers: Vec<String>,
        fail_tags: Vec<String>,
        existing_workspaces: Vec<Workspace>,
        calls: Mutex<Vec<String>>,
        next_id: AtomicUsize,
    }

    impl ScriptedApi {
        fn record(&self, entry: String) {
            self.calls.lock().expect("call log").push(entry);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("call log").clone()
        }

        fn assign_id(&self, prefix: &str) -> String {
            format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    #[async_trait]
    impl WorkspaceApi for ScriptedApi {
        async fn create_workspace(&self, name: &str, _description: &str) -> Result<Workspace, ApiError> {
            self.record(format!("create_workspace {name}"));
            if let Some(status) = self.fail_workspace_with {
                return Err(ApiError::from_status(status, "workspace refused".into()));
            }
            Ok(Workspace {
                id: "100".into(),
                path: "accounts/1/containers/2/workspaces/100".into(),
                name: name.to_string(),
            })
        }

        async fn list_workspaces(&self) -> Result<Vec<Workspace>, ApiError> {
            self.record("list_workspaces".into());
            Ok(self.existing_workspaces.clone())
        }

        async fn clear_workspace(&self, workspace: &Workspace) -> Result<(), ApiError> {
            self.record(format!("clear_workspace {}", workspace.name));
            Ok(())
        }

        async fn create_variable(&self, _workspace: &Workspace, spec: &VariableSpec) -> Result<String, ApiError> {
            self.record(format!("create_variable {}", spec.name));
            if self.fail_variables.contains(&spec.name) {
                return Err(ApiError::from_status(400, "bad variable".into()));
            }
            Ok(self.assign_id("variable"))
        }

        async fn create_trigger(&self, _workspace: &Workspace, spec: &TriggerSpec) -> Result<String, ApiError> {
            self.record(format!("create_trigger {}", spec.name));
            if self.fail_triggers.contains(&spec.name) {
                return Err(ApiError::from_status(400, "bad trigger".into()));
            }
            Ok(self.assign_id("trigger"))
        }

        async fn create_tag(
            &self,
            _workspace: &Workspace,
            spec: &TagSpec,
            firing_ids: &[String],
            blocking_ids: &[String],
        ) -> Result<String, ApiError> {
            self.record(format!(
                "create_tag {} firing=[{}] blocking=[{}]",
                spec.name,
                firing_ids.join(","),
                blocking_ids.join(",")
            ));
            if self.fail_tags.contains(&spec.name) {
                return Err(ApiError::from_status(400, "bad tag".into()));
            }
            Ok(self.assign_id("tag"))
        }

        fn workspace_url(&self, workspace_id: &str) -> String {
            format!("https://example.test/workspaces/{workspace_id}")
        }
    }

    fn seed(json_text: &str) -> ContainerSeed {
        serde_json::from_str(json_text).expect("seed json")
    }

    fn scenario_seed() -> ContainerSeed {
        seed(
            r#"{
                "variables": [],
                "triggers": [{"name": "All Pages", "type": "PAGEVIEW"}],
                "tags": [{"name": "T1", "type": "html", "firingTriggerId": ["All Pages"]}]
            }"#,
        )
    }

    #[tokio::test]
    async fn resolves_trigger_names_into_server_ids() {
        let api = ScriptedApi::default();
        let result = run(&scenario_seed(), &api, &RunOptions::default()).await.expect("run");

        assert_eq!(result.status(), RunStatus::Success);
        assert_eq!(result.triggers[0].outcome, ItemOutcome::Created { id: "trigger-1".into() });
        assert_eq!(result.tags[0].outcome, ItemOutcome::Created { id: "tag-2".into() });
        assert!(
            api.calls().contains(&"create_tag T1 firing=[trigger-1] blocking=[]".to_string()),
            "tag payload must carry the resolved trigger id: {:?}",
            api.calls()
        );
    }

    #[tokio::test]
    async fn failed_trigger_causes_dependent_tag_skip() {
        let api = ScriptedApi {
            fail_triggers: vec!["Purchase".into()],
            ..Default::default()
        };
        let seed = seed(
            r#"{
                "triggers": [
                    {"name": "All Pages", "type": "PAGEVIEW"},
                    {"name": "Purchase", "type": "CUSTOM_EVENT"}
                ],
                "tags": [
                    {"name": "Ok Tag", "type": "html", "firingTriggerId": ["All Pages"]},
                    {"name": "Orphan", "type": "html", "firingTriggerId": ["Purchase"]}
                ]
            }"#,
        );

        let result = run(&seed, &api, &RunOptions::default()).await.expect("run");

        assert_eq!(result.status(), RunStatus::Partial);
        match &result.tags[1].outcome {
            ItemOutcome::Skipped { reason } => {
                assert_eq!(reason, "missing trigger: Purchase");
            }
            other => panic!("expected skip, got {other:?}"),
        }
        assert!(
            !api.calls().iter().any(|call| call.starts_with("create_tag Orphan")),
            "skipped tags must never reach the client"
        );
        assert!(matches!(result.tags[0].outcome, ItemOutcome::Created { .. }));
    }

    #[tokio::test]
    async fn workspace_failure_is_fatal_with_zero_creation_attempts() {
        let api = ScriptedApi {
            fail_workspace_with: Some(500),
            ..Default::default()
        };

        let error = run(&scenario_seed(), &api, &RunOptions::default())
            .await
            .expect_err("workspace failure");

        assert!(matches!(error, FatalError::Workspace { .. }));
        let calls = api.calls();
        assert_eq!(calls.len(), 1, "only the workspace call may have happened: {calls:?}");
    }

    #[tokio::test]
    async fn auth_rejection_surfaces_as_auth_fatal() {
        let api = ScriptedApi {
            fail_workspace_with: Some(401),
            ..Default::default()
        };

        let error = run(&scenario_seed(), &api, &RunOptions::default())
            .await
            .expect_err("auth failure");
        assert!(matches!(error, FatalError::Auth(_)));
    }

    #[tokio::test]
    async fn variable_failure_does_not_block_later_variables() {
        let api = ScriptedApi {
            fail_variables: vec!["Broken".into()],
            ..Default::default()
        };
        let seed = seed(
            r#"{
                "variables": [
                    {"name": "Broken", "type": "v"},
                    {"name": "Fine", "type": "c"}
                ]
            }"#,
        );

        let result = run(&seed, &api, &RunOptions::default()).await.expect("run");

        assert!(matches!(result.variables[0].outcome, ItemOutcome::Failed { .. }));
        assert!(matches!(result.variables[1].outcome, ItemOutcome::Created { .. }));
        assert_eq!(result.status(), RunStatus::Partial);
    }

    #[tokio::test]
    async fn multiple_missing_references_are_all_named() {
        let api = ScriptedApi::default();
        let seed = seed(
            r#"{
                "tags": [{"name": "T", "type": "html", "firingTriggerId": ["A"], "blockingTriggerId": ["B"]}]
            }"#,
        );

        let result = run(&seed, &api, &RunOptions::default()).await.expect("run");
        match &result.tags[0].outcome {
            ItemOutcome::Skipped { reason } => {
                assert_eq!(reason, "missing trigger: A; missing trigger: B");
            }
            other => panic!("expected skip, got {other:?}"),
        }
        assert_eq!(result.status(), RunStatus::Failed);
    }

    #[tokio::test]
    async fn reuse_finds_and_clears_an_existing_workspace() {
        let api = ScriptedApi {
            existing_workspaces: vec![Workspace {
                id: "55".into(),
                path: "accounts/1/containers/2/workspaces/55".into(),
                name: "Automation Workspace".into(),
            }],
            ..Default::default()
        };
        let options = RunOptions {
            reuse: true,
            ..Default::default()
        };

        let result = run(&scenario_seed(), &api, &options).await.expect("run");

        assert_eq!(result.workspace_id, "55");
        let calls = api.calls();
        assert!(calls.contains(&"list_workspaces".to_string()));
        assert!(calls.contains(&"clear_workspace Automation Workspace".to_string()));
        assert!(!calls.iter().any(|call| call.starts_with("create_workspace")));
    }

    #[tokio::test]
    async fn explicit_workspace_name_is_used_verbatim() {
        let api = ScriptedApi::default();
        let options = RunOptions {
            workspace_name: Some("Release 42".into()),
            ..Default::default()
        };

        run(&scenario_seed(), &api, &options).await.expect("run");
        assert!(api.calls().contains(&"create_workspace Release 42".to_string()));
    }

    #[test]
    fn generated_workspace_names_embed_the_timestamp() {
        let timestamp = Local.with_ymd_and_hms(2026, 8, 6, 10, 15, 0).single().expect("timestamp");
        assert_eq!(generate_workspace_name("AutoGen", timestamp), "AutoGen_20260806_101500");
    }

    #[test]
    fn filter_by_type_retains_only_matching_resources() {
        let seed = seed(
            r#"{
                "variables": [{"name": "V", "type": "v"}],
                "triggers": [{"name": "T", "type": "PAGEVIEW"}],
                "tags": [
                    {"name": "Html Tag", "type": "html"},
                    {"name": "Image Tag", "type": "img"}
                ]
            }"#,
        );

        let filtered = filter_by_type(&seed, "html");
        assert!(filtered.variables.is_empty());
        assert!(filtered.triggers.is_empty());
        assert_eq!(filtered.tags.len(), 1);
        assert_eq!(filtered.tags[0].name, "Html Tag");
    }
}
