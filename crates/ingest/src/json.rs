//! JSON seed reader.
//!
//! Accepts the plain `{variables, triggers, tags}` document. A top-level
//! `containerVersion` key marks a container export instead; exports carry
//! numeric trigger ids in `firingTriggerId`/`blockingTriggerId`, so the
//! converter maps those ids back to trigger names using the export's own
//! trigger table before handing the document to the shared seed schema.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tagforge_types::{ContainerSeed, Parameter, TagSpec, TriggerFilter, TriggerSpec, VariableSpec};
use tracing::debug;

use crate::ParseError;

pub(crate) fn parse_json(path: &Path) -> Result<ContainerSeed, ParseError> {
    let text = fs::read_to_string(path).map_err(|source| ParseError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;

    let document: Value = serde_json::from_str(&text).map_err(|source| ParseError::MalformedJson {
        path: path.display().to_string(),
        source,
    })?;

    if let Some(container_version) = document.get("containerVersion") {
        debug!(path = %path.display(), "container export format detected, converting");
        return convert_export(path, container_version);
    }

    serde_json::from_value(document).map_err(|source| ParseError::MalformedJson {
        path: path.display().to_string(),
        source,
    })
}

/// Convert the `containerVersion` section of an export into a plain seed.
fn convert_export(path: &Path, container_version: &Value) -> Result<ContainerSeed, ParseError> {
    let export_triggers = array_field(container_version, "trigger");
    let id_to_name: Vec<(String, String)> = export_triggers
        .iter()
        .filter_map(|trigger| {
            let id = opaque_string(trigger.get("triggerId")?)?;
            let name = trigger.get("name")?.as_str()?.to_string();
            Some((id, name))
        })
        .collect();

    let variables = array_field(container_version, "variable")
        .iter()
        .map(|variable| VariableSpec {
            name: string_field(variable, "name"),
            r#type: string_field(variable, "type"),
            parameter: convert_parameters(variable.get("parameter")),
        })
        .collect();

    let triggers = export_triggers
        .iter()
        .map(|trigger| {
            Ok(TriggerSpec {
                name: string_field(trigger, "name"),
                r#type: string_field(trigger, "type"),
                filter: convert_filters(path, trigger.get("filter"))?,
                custom_event_filter: convert_filters(path, trigger.get("customEventFilter"))?,
                auto_event_filter: convert_filters(path, trigger.get("autoEventFilter"))?,
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    let tags = array_field(container_version, "tag")
        .iter()
        .map(|tag| TagSpec {
            name: string_field(tag, "name"),
            r#type: string_field(tag, "type"),
            parameter: convert_parameters(tag.get("parameter")),
            firing_trigger_names: trigger_ids_to_names(tag.get("firingTriggerId"), &id_to_name),
            blocking_trigger_names: trigger_ids_to_names(tag.get("blockingTriggerId"), &id_to_name),
        })
        .collect();

    Ok(ContainerSeed {
        variables,
        triggers,
        tags,
    })
}

/// Export parameters may carry extra metadata; the seed keeps the
/// key/value pair and normalizes the parameter type to `template`.
fn convert_parameters(parameters: Option<&Value>) -> Vec<Parameter> {
    parameters
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|parameter| Parameter {
                    key: string_field(parameter, "key"),
                    r#type: "template".to_string(),
                    value: string_field(parameter, "value"),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn convert_filters(path: &Path, filters: Option<&Value>) -> Result<Vec<TriggerFilter>, ParseError> {
    match filters {
        None => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|source| ParseError::MalformedJson {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Replace exported trigger ids with the trigger names the seed format uses.
/// Ids with no matching trigger pass through verbatim; validation will report
/// them as unknown references rather than the parse silently dropping them.
fn trigger_ids_to_names(ids: Option<&Value>, id_to_name: &[(String, String)]) -> Vec<String> {
    ids.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(opaque_string)
                .map(|id| {
                    id_to_name
                        .iter()
                        .find(|(known_id, _)| *known_id == id)
                        .map(|(_, name)| name.clone())
                        .unwrap_or(id)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn array_field<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

fn string_field(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Ids appear as JSON strings or numbers depending on the export source.
fn opaque_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
