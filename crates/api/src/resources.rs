//! Resource operations scoped to one account/container pair.
//!
//! Every create operation returns the server-assigned identifier. Ids are
//! treated as opaque strings even when the service encodes them as JSON
//! numbers. Payload schema correctness is the validator's responsibility;
//! this module only assembles and transports documents.

use reqwest::Method;
use serde_json::{Value, json};
use tagforge_types::{TagSpec, TriggerSpec, VariableSpec};
use tracing::{info, warn};

use crate::{ApiError, TagManagerClient};

/// Web UI base for workspace review links.
const WORKSPACE_UI_BASE: &str = "https://tagmanager.google.com/#/container";

/// A workspace created (or found) in the remote container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Server-assigned workspace id.
    pub id: String,
    /// Full API resource path (`accounts/.../containers/.../workspaces/...`).
    pub path: String,
    /// Display name.
    pub name: String,
}

/// A [`TagManagerClient`] bound to one account/container pair.
#[derive(Debug, Clone)]
pub struct ContainerClient {
    client: TagManagerClient,
    account_id: String,
    container_id: String,
}

impl ContainerClient {
    pub fn new(client: TagManagerClient, account_id: impl Into<String>, container_id: impl Into<String>) -> Self {
        Self {
            client,
            account_id: account_id.into(),
            container_id: container_id.into(),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    fn parent(&self) -> String {
        format!("accounts/{}/containers/{}", self.account_id, self.container_id)
    }

    /// Review URL for a workspace in the service's web UI.
    pub fn workspace_url(&self, workspace_id: &str) -> String {
        format!(
            "{WORKSPACE_UI_BASE}/accounts/{}/containers/{}/workspaces/{}",
            self.account_id, self.container_id, workspace_id
        )
    }

    /// Create a new workspace under the container.
    pub async fn create_workspace(&self, name: &str, description: &str) -> Result<Workspace, ApiError> {
        let payload = json!({ "name": name, "description": description });
        let response = self
            .client
            .send(Method::POST, &format!("/{}/workspaces", self.parent()), Some(&payload))
            .await?;

        let workspace = workspace_from_value(&self.parent(), &response)?;
        info!(workspace = %workspace.name, id = %workspace.id, "workspace created");
        Ok(workspace)
    }

    /// List every workspace in the container.
    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>, ApiError> {
        let response = self
            .client
            .send(Method::GET, &format!("/{}/workspaces", self.parent()), None)
            .await?;

        response
            .get("workspace")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(|item| workspace_from_value(&self.parent(), item)).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// Delete every tag, trigger, and variable in the workspace, tags first
    /// since they depend on the other two kinds. Individual delete failures
    /// are logged and skipped; a reused workspace with leftovers is still
    /// usable.
    pub async fn clear_workspace(&self, workspace: &Workspace) -> Result<(), ApiError> {
        for (collection, item_key) in [("tags", "tag"), ("triggers", "trigger"), ("variables", "variable")] {
            let listing = self
                .client
                .send(Method::GET, &format!("/{}/{collection}", workspace.path), None)
                .await?;
            let items = listing.get(item_key).and_then(Value::as_array).cloned().unwrap_or_default();
            info!(workspace = %workspace.name, resource = item_key, count = items.len(), "clearing workspace resources");

            for item in items {
                let Some(resource_path) = item.get("path").and_then(Value::as_str) else {
                    warn!(resource = item_key, "listed resource has no path, skipping delete");
                    continue;
                };
                if let Err(error) = self.client.send(Method::DELETE, &format!("/{resource_path}"), None).await {
                    warn!(resource = item_key, path = resource_path, error = %error, "failed to delete resource");
                }
            }
        }
        Ok(())
    }

    /// Create a variable in the workspace, returning its id.
    pub async fn create_variable(&self, workspace: &Workspace, spec: &VariableSpec) -> Result<String, ApiError> {
        let payload = to_payload(spec)?;
        let response = self
            .client
            .send(Method::POST, &format!("/{}/variables", workspace.path), Some(&payload))
            .await?;
        extract_id(&response, "variableId")
    }

    /// Create a trigger in the workspace, returning its id.
    pub async fn create_trigger(&self, workspace: &Workspace, spec: &TriggerSpec) -> Result<String, ApiError> {
        let payload = to_payload(spec)?;
        let response = self
            .client
            .send(Method::POST, &format!("/{}/triggers", workspace.path), Some(&payload))
            .await?;
        extract_id(&response, "triggerId")
    }

    /// Create a tag in the workspace with its trigger references already
    /// resolved to server ids, returning the tag id.
    pub async fn create_tag(
        &self,
        workspace: &Workspace,
        spec: &TagSpec,
        firing_ids: &[String],
        blocking_ids: &[String],
    ) -> Result<String, ApiError> {
        let payload = tag_payload(spec, firing_ids, blocking_ids);
        let response = self
            .client
            .send(Method::POST, &format!("/{}/tags", workspace.path), Some(&payload))
            .await?;
        extract_id(&response, "tagId")
    }
}

/// Assemble the tag create payload. Trigger binding keys are only included
/// when non-empty, and they carry resolved ids, never input names.
fn tag_payload(spec: &TagSpec, firing_ids: &[String], blocking_ids: &[String]) -> Value {
    let mut payload = json!({
        "name": spec.name,
        "type": spec.r#type,
        "parameter": spec.parameter,
    });
    if !firing_ids.is_empty() {
        payload["firingTriggerId"] = json!(firing_ids);
    }
    if !blocking_ids.is_empty() {
        payload["blockingTriggerId"] = json!(blocking_ids);
    }
    payload
}

fn to_payload<T: serde::Serialize>(spec: &T) -> Result<Value, ApiError> {
    serde_json::to_value(spec).map_err(|error| ApiError::UnexpectedPayload {
        detail: error.to_string(),
    })
}

fn workspace_from_value(parent: &str, value: &Value) -> Result<Workspace, ApiError> {
    let id = extract_id(value, "workspaceId")?;
    let name = value.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
    let path = value
        .get("path")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{parent}/workspaces/{id}"));

    Ok(Workspace { id, path, name })
}

/// Pull a server-assigned id out of a response, accepting both string and
/// numeric encodings.
pub(crate) fn extract_id(value: &Value, field: &str) -> Result<String, ApiError> {
    id_string(value.get(field)).ok_or_else(|| ApiError::UnexpectedPayload {
        detail: format!("response is missing '{field}'"),
    })
}

pub(crate) fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
