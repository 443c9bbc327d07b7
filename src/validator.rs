//! Static validation of a command against the indexed tool documentation.
//!
//! Filter-graph commands are checked component by component, with targeted
//! option probes; companion-tool commands are checked switch by switch.
//! Anything that cannot be confirmed becomes a warning, never an error.

use crate::tool::{ProbeOutcome, ToolDocs};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// Prefix marking the companion muxing tool's grammar
const MP4BOX_PREFIX: &str = "MP4Box";

/// Input/output flags that share the `name:` shape but are not components
const RESERVED_TOKENS: &[&str] = &["i", "o"];

lazy_static! {
    /// `component:opt[=v][:opt[=v]...]` starting a whitespace-delimited token
    static ref RE_COMPONENT_TOKEN: Regex =
        Regex::new(r"(?:^|\s)([A-Za-z_][\w-]*):(\S+)").unwrap();
    static ref RE_OPTION_NAME: Regex = Regex::new(r"^[A-Za-z_][\w-]*$").unwrap();
    /// Filter-graph option syntax, rejected in companion-tool commands
    static ref RE_GRAPH_SYNTAX: Regex =
        Regex::new(r"(?:^|\s)([A-Za-z_][\w-]*:[A-Za-z_][\w-]*=)").unwrap();
    /// Single-dash switch starting a token
    static ref RE_SWITCH: Regex = Regex::new(r"(?:^|\s)-([a-z][a-z-]*)").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Filter,
    Option,
    Switch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn from_parts(errors: Vec<ValidationIssue>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// Remaining option probes for one query
#[derive(Debug, Clone, Copy)]
pub struct ProbeBudget {
    remaining: usize,
}

impl ProbeBudget {
    pub fn new(probes: usize) -> Self {
        Self { remaining: probes }
    }

    pub fn unlimited() -> Self {
        Self::new(usize::MAX)
    }

    /// Spend one probe; false once the budget is gone.
    pub fn take(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

/// One `component:options` unit found in a filter-graph command
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComponentRef {
    name: String,
    options: Vec<String>,
}

pub fn validate_command(docs: &ToolDocs, command: &str, budget: &mut ProbeBudget) -> ValidationResult {
    if command.trim().starts_with(MP4BOX_PREFIX) {
        validate_switches(docs, command)
    } else {
        validate_filter_graph(docs, command, budget)
    }
}

fn validate_filter_graph(docs: &ToolDocs, command: &str, budget: &mut ProbeBudget) -> ValidationResult {
    let refs = component_refs(command);
    if refs.is_empty() {
        return ValidationResult::from_parts(Vec::new(), Vec::new());
    }

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if docs.filters().is_empty() {
        warnings.push(format!(
            "Filter documentation unavailable, cannot confirm {} component(s)",
            refs.len()
        ));
        return ValidationResult::from_parts(errors, warnings);
    }

    let mut checked: HashSet<(String, String)> = HashSet::new();
    for component in refs {
        if !docs.is_component(&component.name) {
            errors.push(ValidationIssue {
                kind: IssueKind::Filter,
                component: Some(component.name.clone()),
                option: None,
                switch: None,
                message: format!("Unknown filter: {}", component.name),
                suggestion: None,
            });
            continue;
        }

        for option in component.options {
            if !checked.insert((component.name.clone(), option.clone())) {
                continue;
            }
            if let Some(issue) =
                check_option(docs, &component.name, &option, budget, &mut warnings)
            {
                errors.push(issue);
            }
        }
    }

    ValidationResult::from_parts(errors, warnings)
}

fn check_option(
    docs: &ToolDocs,
    component: &str,
    option: &str,
    budget: &mut ProbeBudget,
    warnings: &mut Vec<String>,
) -> Option<ValidationIssue> {
    // Already documented under this component: no probe needed
    if docs
        .options_named(option)
        .iter()
        .any(|doc| doc.component == component)
    {
        return None;
    }

    if !budget.take() {
        warnings.push(format!(
            "Probe budget exhausted, {}.{} not checked",
            component, option
        ));
        return None;
    }

    debug!("Probing {}.{}", component, option);
    match docs.probe_option(component, option) {
        ProbeOutcome::Found => None,
        ProbeOutcome::Unconfirmed(reason) => {
            warnings.push(format!("Cannot confirm {}.{}: {}", component, option, reason));
            None
        }
        ProbeOutcome::NotFound {
            message,
            suggestion,
        } => Some(ValidationIssue {
            kind: IssueKind::Option,
            component: Some(component.to_string()),
            option: Some(option.to_string()),
            switch: None,
            message,
            suggestion: other_components(docs, component, option).or(suggestion),
        }),
    }
}

/// "Option 'x' exists in: a, b" when other components carry the option.
fn other_components(docs: &ToolDocs, component: &str, option: &str) -> Option<String> {
    let owners: Vec<&str> = docs
        .options_named(option)
        .iter()
        .map(|doc| doc.component.as_str())
        .filter(|name| *name != component)
        .collect();
    if owners.is_empty() {
        None
    } else {
        Some(format!("Option '{}' exists in: {}", option, owners.join(", ")))
    }
}

fn component_refs(command: &str) -> Vec<ComponentRef> {
    RE_COMPONENT_TOKEN
        .captures_iter(command)
        .filter(|caps| !RESERVED_TOKENS.contains(&&caps[1]))
        // URLs are sources, not components
        .filter(|caps| !caps[2].starts_with("//"))
        .map(|caps| ComponentRef {
            name: caps[1].to_string(),
            options: option_names(&caps[2]),
        })
        .collect()
}

fn option_names(options: &str) -> Vec<String> {
    options
        .split(':')
        .filter_map(|part| part.split('=').next())
        .map(|name| name.trim_start_matches('!'))
        .filter(|name| RE_OPTION_NAME.is_match(name))
        .map(str::to_string)
        .collect()
}

fn validate_switches(docs: &ToolDocs, command: &str) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let documented = !docs.switches().is_empty();

    for caps in RE_GRAPH_SYNTAX.captures_iter(command) {
        let message = format!(
            "Filter syntax '{}' is not valid in an MP4Box command",
            &caps[1]
        );
        if !documented {
            warnings.push(message);
            continue;
        }
        errors.push(ValidationIssue {
            kind: IssueKind::Switch,
            component: None,
            option: None,
            switch: Some(caps[1].to_string()),
            message,
            suggestion: Some("Use MP4Box switches, or run the filter chain with gpac".to_string()),
        });
    }

    let switches: Vec<String> = {
        let mut seen = HashSet::new();
        RE_SWITCH
            .captures_iter(command)
            .map(|caps| format!("-{}", &caps[1]))
            .filter(|s| seen.insert(s.clone()))
            .collect()
    };
    if switches.is_empty() {
        return ValidationResult::from_parts(errors, warnings);
    }

    if !documented {
        warnings.push(format!(
            "MP4Box documentation unavailable, cannot confirm {} switch(es)",
            switches.len()
        ));
        return ValidationResult::from_parts(errors, warnings);
    }

    for switch in switches {
        if !docs.is_switch(&switch) {
            errors.push(ValidationIssue {
                kind: IssueKind::Switch,
                component: None,
                option: None,
                message: format!("Unknown MP4Box switch: {}", switch),
                switch: Some(switch),
                suggestion: Some("Check 'MP4Box -h import/dash/hint'".to_string()),
            });
        }
    }

    ValidationResult::from_parts(errors, warnings)
}
