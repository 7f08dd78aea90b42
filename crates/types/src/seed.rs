//! Strongly typed container-seed schema shared across the ingest, engine, and
//! API crates.
//!
//! Field names mirror the remote tag-management wire format (`parameter`,
//! `firingTriggerId`, `customEventFilter`, ...) so a seed document round-trips
//! through serde without a translation layer. One deliberate asymmetry: at the
//! input boundary `firingTriggerId`/`blockingTriggerId` carry trigger *names*,
//! never server ids; resolution into ids is the orchestrator's job.

use serde::{Deserialize, Serialize};

pub mod validation;

/// One key/value/parameter-type triple attached to a variable, tag, or
/// trigger filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter key understood by the resource template (for example `html`
    /// or `value`).
    pub key: String,
    /// Parameter kind; seeds authored by hand almost always use `template`.
    #[serde(rename = "type")]
    pub r#type: String,
    /// Literal or templated value.
    #[serde(default)]
    pub value: String,
}

/// A user-defined variable to create in the workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariableSpec {
    /// Display name, unique among variables.
    pub name: String,
    /// Variable template type (`v`, `c`, `jsm`, ...).
    #[serde(rename = "type")]
    pub r#type: String,
    /// Template parameters, in authoring order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter: Vec<Parameter>,
}

/// A single filter condition attached to a trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerFilter {
    /// Comparison operator (`equals`, `contains`, ...).
    #[serde(rename = "type")]
    pub r#type: String,
    /// Operator arguments, conventionally `arg0`/`arg1` parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter: Vec<Parameter>,
}

/// A trigger to create in the workspace. Tags reference triggers by `name`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerSpec {
    /// Display name, unique among triggers; the key of the name→id map built
    /// during the run.
    pub name: String,
    /// Trigger event type (`PAGEVIEW`, `CLICK`, `CUSTOM_EVENT`, ...).
    #[serde(rename = "type")]
    pub r#type: String,
    /// Plain filter conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<TriggerFilter>,
    /// Event-name conditions for `CUSTOM_EVENT` triggers.
    #[serde(default, rename = "customEventFilter", skip_serializing_if = "Vec::is_empty")]
    pub custom_event_filter: Vec<TriggerFilter>,
    /// Auto-event conditions for click-style triggers.
    #[serde(default, rename = "autoEventFilter", skip_serializing_if = "Vec::is_empty")]
    pub auto_event_filter: Vec<TriggerFilter>,
}

/// A tag to create in the workspace once its trigger references resolve.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagSpec {
    /// Display name, unique among tags.
    pub name: String,
    /// Tag template type (`html`, `ua`, `img`, ...).
    #[serde(rename = "type")]
    pub r#type: String,
    /// Template parameters, in authoring order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter: Vec<Parameter>,
    /// Names of triggers that fire this tag. Carries *names* at the input
    /// boundary even though the wire key says `Id`.
    #[serde(default, rename = "firingTriggerId", alias = "firingTriggerNames")]
    pub firing_trigger_names: Vec<String>,
    /// Names of triggers that suppress this tag.
    #[serde(default, rename = "blockingTriggerId", alias = "blockingTriggerNames")]
    pub blocking_trigger_names: Vec<String>,
}

/// Canonical parsed form of one input file: three ordered resource lists.
///
/// Built once by the ingest crate, validated by [`validation::validate_seed`],
/// then consumed read-only by the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerSeed {
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
    #[serde(default)]
    pub triggers: Vec<TriggerSpec>,
    #[serde(default)]
    pub tags: Vec<TagSpec>,
}

impl ContainerSeed {
    /// Total number of resources across all three lists.
    pub fn resource_count(&self) -> usize {
        self.variables.len() + self.triggers.len() + self.tags.len()
    }
}

/// The three creatable resource kinds, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Variable,
    Trigger,
    Tag,
}

impl ResourceKind {
    /// Lowercase singular label used in log lines and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Variable => "variable",
            ResourceKind::Trigger => "trigger",
            ResourceKind::Tag => "tag",
        }
    }

    /// Plural heading used by the summary reporter.
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Variable => "Variables",
            ResourceKind::Trigger => "Triggers",
            ResourceKind::Tag => "Tags",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_basic_seed() {
        let json_text = r#"
        {
            "variables": [
                {"name": "Page URL", "type": "v", "parameter": [{"key": "name", "type": "template", "value": "page_url"}]}
            ],
            "triggers": [
                {"name": "All Pages", "type": "PAGEVIEW"}
            ],
            "tags": [
                {"name": "T1", "type": "html", "firingTriggerId": ["All Pages"]}
            ]
        }"#;

        let seed: ContainerSeed = serde_json::from_str(json_text).expect("deserialize seed");

        assert_eq!(seed.variables.len(), 1);
        assert_eq!(seed.variables[0].parameter[0].key, "name");
        assert_eq!(seed.triggers[0].r#type, "PAGEVIEW");
        assert_eq!(seed.tags[0].firing_trigger_names, vec!["All Pages"]);
        assert_eq!(seed.resource_count(), 3);
    }

    #[test]
    fn accepts_explicit_name_aliases_for_trigger_references() {
        let json_text = r#"
        {
            "tags": [
                {"name": "T1", "type": "html", "firingTriggerNames": ["All Pages"], "blockingTriggerNames": ["Opt Out"]}
            ]
        }"#;

        let seed: ContainerSeed = serde_json::from_str(json_text).expect("deserialize seed");
        assert_eq!(seed.tags[0].firing_trigger_names, vec!["All Pages"]);
        assert_eq!(seed.tags[0].blocking_trigger_names, vec!["Opt Out"]);
    }

    #[test]
    fn custom_event_filter_round_trips() {
        let json_text = r#"
        {
            "triggers": [
                {
                    "name": "Purchase",
                    "type": "CUSTOM_EVENT",
                    "customEventFilter": [
                        {
                            "type": "equals",
                            "parameter": [
                                {"key": "arg0", "type": "template", "value": "{{_event}}"},
                                {"key": "arg1", "type": "template", "value": "purchase"}
                            ]
                        }
                    ]
                }
            ]
        }"#;

        let seed: ContainerSeed = serde_json::from_str(json_text).expect("deserialize seed");
        let trigger = &seed.triggers[0];
        assert_eq!(trigger.custom_event_filter.len(), 1);

        let serialized = serde_json::to_value(trigger).expect("serialize trigger");
        assert_eq!(serialized["customEventFilter"][0]["type"], "equals");
        assert!(
            serialized.get("filter").is_none(),
            "empty filter lists must not appear in payloads"
        );
    }
}
