//! Structural and referential validation for parsed container seeds.
//!
//! Validation is a pure function over [`ContainerSeed`]: it performs no I/O
//! and never talks to the remote service. Every problem is collected into one
//! list so the caller can report all of them at once; the pipeline refuses to
//! make any remote call while this list is non-empty.

use std::collections::HashSet;

use thiserror::Error;

use super::{ContainerSeed, ResourceKind};

/// Trigger event types accepted for web containers.
pub const TRIGGER_TYPES: &[&str] = &[
    "PAGEVIEW",
    "CLICK",
    "LINK_CLICK",
    "CUSTOM_EVENT",
    "DOM_READY",
    "WINDOW_LOADED",
    "FORM_SUBMISSION",
    "HISTORY_CHANGE",
    "TIMER",
    "SCROLL_DEPTH",
    "ELEMENT_VISIBILITY",
    "JS_ERROR",
];

/// Variable template types accepted for web containers.
pub const VARIABLE_TYPES: &[&str] = &[
    "v", "c", "jsm", "j", "k", "u", "gas", "d", "f", "e", "r", "smm", "remm", "aev", "cid", "dbg", "ctv", "vis",
];

/// Tag template types accepted for web containers.
pub const TAG_TYPES: &[&str] = &[
    "html",
    "img",
    "ua",
    "gaawe",
    "gaawc",
    "sp",
    "awct",
    "fls",
    "pntr",
    "twitter_website_tag",
    "cvt_temp",
];

/// Where a trigger reference appears on a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerRole {
    Firing,
    Blocking,
}

impl std::fmt::Display for TriggerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerRole::Firing => f.write_str("firing"),
            TriggerRole::Blocking => f.write_str("blocking"),
        }
    }
}

/// A single structural or referential problem found in a seed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A descriptor has an empty or whitespace-only name.
    #[error("{kind} at position {index} has an empty name")]
    EmptyName { kind: ResourceKind, index: usize },

    /// A descriptor's `type` is not in the enumerated set for its kind.
    #[error("{kind} '{name}' has unrecognized type '{found}'")]
    UnknownType { kind: ResourceKind, name: String, found: String },

    /// Two descriptors in the same list share one name.
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: ResourceKind, name: String },

    /// A tag references a trigger name that no trigger declares.
    #[error("tag '{tag}' references unknown {role} trigger '{trigger}'")]
    UnknownTriggerReference { tag: String, role: TriggerRole, trigger: String },
}

/// All problems found in one seed, packaged as an error value.
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    pub errors: Vec<ValidationError>,
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "seed validation failed with {} error(s):", self.errors.len())?;
        for (index, error) in self.errors.iter().enumerate() {
            writeln!(f, "  {}: {}", index + 1, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

/// Validate a parsed seed. An empty result means the seed is ready to replay.
///
/// Checks, per resource list:
/// - every descriptor has a non-empty name;
/// - every `type` belongs to the fixed set for its kind;
/// - names are unique within their list (a duplicate trigger name would make
///   the name→id map ambiguous; the remote service rejects duplicates of the
///   other kinds anyway);
/// - every firing/blocking trigger name on every tag exists among the
///   declared triggers, reported once per offending name per tag.
pub fn validate_seed(seed: &ContainerSeed) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    check_list(
        ResourceKind::Variable,
        seed.variables.iter().map(|v| (v.name.as_str(), v.r#type.as_str())),
        VARIABLE_TYPES,
        &mut errors,
    );
    check_list(
        ResourceKind::Trigger,
        seed.triggers.iter().map(|t| (t.name.as_str(), t.r#type.as_str())),
        TRIGGER_TYPES,
        &mut errors,
    );
    check_list(
        ResourceKind::Tag,
        seed.tags.iter().map(|t| (t.name.as_str(), t.r#type.as_str())),
        TAG_TYPES,
        &mut errors,
    );

    let trigger_names: HashSet<&str> = seed.triggers.iter().map(|t| t.name.as_str()).collect();
    for tag in &seed.tags {
        for referenced in &tag.firing_trigger_names {
            if !trigger_names.contains(referenced.as_str()) {
                errors.push(ValidationError::UnknownTriggerReference {
                    tag: tag.name.clone(),
                    role: TriggerRole::Firing,
                    trigger: referenced.clone(),
                });
            }
        }
        for referenced in &tag.blocking_trigger_names {
            if !trigger_names.contains(referenced.as_str()) {
                errors.push(ValidationError::UnknownTriggerReference {
                    tag: tag.name.clone(),
                    role: TriggerRole::Blocking,
                    trigger: referenced.clone(),
                });
            }
        }
    }

    errors
}

fn check_list<'a>(
    kind: ResourceKind,
    descriptors: impl Iterator<Item = (&'a str, &'a str)>,
    allowed_types: &[&str],
    errors: &mut Vec<ValidationError>,
) {
    let mut seen_names: HashSet<String> = HashSet::new();
    for (index, (name, type_name)) in descriptors.enumerate() {
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyName { kind, index });
        } else if !seen_names.insert(name.to_string()) {
            errors.push(ValidationError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }

        if !allowed_types.contains(&type_name) {
            errors.push(ValidationError::UnknownType {
                kind,
                name: name.to_string(),
                found: type_name.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{TagSpec, TriggerSpec, VariableSpec};

    fn seed_with_reference(reference: &str) -> ContainerSeed {
        serde_json::from_str(&format!(
            r#"{{
                "variables": [],
                "triggers": [{{"name": "All Pages", "type": "PAGEVIEW"}}],
                "tags": [{{"name": "T1", "type": "html", "firingTriggerId": ["{reference}"]}}]
            }}"#
        ))
        .expect("seed json")
    }

    #[test]
    fn valid_seed_produces_no_errors() {
        let seed = seed_with_reference("All Pages");
        assert!(validate_seed(&seed).is_empty());
    }

    #[test]
    fn missing_firing_reference_is_reported_once_per_name() {
        let seed = seed_with_reference("Missing Trigger");
        let errors = validate_seed(&seed);

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0],
            ValidationError::UnknownTriggerReference {
                tag: "T1".into(),
                role: TriggerRole::Firing,
                trigger: "Missing Trigger".into(),
            }
        );
    }

    #[test]
    fn blocking_references_are_checked_too() {
        let mut seed = seed_with_reference("All Pages");
        seed.tags[0].blocking_trigger_names = vec!["Opt Out".into()];

        let errors = validate_seed(&seed);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("blocking trigger 'Opt Out'"));
    }

    #[test]
    fn empty_names_and_unknown_types_are_both_reported() {
        let seed = ContainerSeed {
            variables: vec![VariableSpec {
                name: "  ".into(),
                r#type: "v".into(),
                parameter: vec![],
            }],
            triggers: vec![TriggerSpec {
                name: "Odd".into(),
                r#type: "TELEPORT".into(),
                filter: vec![],
                custom_event_filter: vec![],
                auto_event_filter: vec![],
            }],
            tags: vec![],
        };

        let errors = validate_seed(&seed);
        assert!(errors.contains(&ValidationError::EmptyName {
            kind: ResourceKind::Variable,
            index: 0
        }));
        assert!(errors.contains(&ValidationError::UnknownType {
            kind: ResourceKind::Trigger,
            name: "Odd".into(),
            found: "TELEPORT".into(),
        }));
    }

    #[test]
    fn duplicate_trigger_names_are_rejected() {
        let trigger = TriggerSpec {
            name: "All Pages".into(),
            r#type: "PAGEVIEW".into(),
            filter: vec![],
            custom_event_filter: vec![],
            auto_event_filter: vec![],
        };
        let seed = ContainerSeed {
            variables: vec![],
            triggers: vec![trigger.clone(), trigger],
            tags: vec![],
        };

        let errors = validate_seed(&seed);
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateName {
                kind: ResourceKind::Trigger,
                name: "All Pages".into(),
            }]
        );
    }

    #[test]
    fn duplicate_tag_names_are_rejected() {
        let tag = TagSpec {
            name: "T1".into(),
            r#type: "html".into(),
            parameter: vec![],
            firing_trigger_names: vec![],
            blocking_trigger_names: vec![],
        };
        let seed = ContainerSeed {
            variables: vec![],
            triggers: vec![],
            tags: vec![tag.clone(), tag],
        };

        let errors = validate_seed(&seed);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("duplicate tag name 'T1'"));
    }

    #[test]
    fn validation_is_deterministic() {
        let mut seed = seed_with_reference("Missing Trigger");
        seed.tags.push(TagSpec {
            name: "T2".into(),
            r#type: "sled".into(),
            parameter: vec![],
            firing_trigger_names: vec!["Missing Trigger".into(), "Also Missing".into()],
            blocking_trigger_names: vec![],
        });

        let first = validate_seed(&seed);
        let second = validate_seed(&seed);
        assert_eq!(first, second);
        // one unknown tag type + one reference error per offending name per tag
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn failure_display_enumerates_every_error() {
        let seed = seed_with_reference("Missing Trigger");
        let failure = ValidationFailure {
            errors: validate_seed(&seed),
        };

        let rendered = failure.to_string();
        assert!(rendered.contains("1 error(s)"));
        assert!(rendered.contains("Missing Trigger"));
    }
}
