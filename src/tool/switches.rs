//! Companion muxing tool documentation: switches per help group.

use super::runner::{normalize_whitespace, strip_ansi};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

/// Help groups that together cover the companion tool's switches
pub const SWITCH_GROUPS: &[&str] = &["import", "dash", "hint"];

lazy_static! {
    /// `-switch description` or `:modifier description`
    static ref RE_SWITCH: Regex = Regex::new(r"^\s*(-[\w-]+|:[\w-]+)\s+(.+)").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchDoc {
    pub switch: String,
    pub group: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct SwitchIndex {
    switches: HashMap<String, Vec<SwitchDoc>>,
}

impl SwitchIndex {
    /// Register every switch line of one group's help text.
    pub fn add_group(&mut self, text: &str, group: &str) {
        for line in strip_ansi(text).lines() {
            if let Some(caps) = RE_SWITCH.captures(line) {
                let switch = caps[1].to_string();
                self.switches.entry(switch.clone()).or_default().push(SwitchDoc {
                    switch,
                    group: group.to_string(),
                    description: normalize_whitespace(&caps[2]),
                });
            }
        }
    }

    pub fn contains(&self, switch: &str) -> bool {
        self.switches.contains_key(switch)
    }

    pub fn info(&self, switch: &str) -> &[SwitchDoc] {
        self.switches.get(switch).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.switches.len()
    }
}
