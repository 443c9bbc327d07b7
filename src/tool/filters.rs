//! Filter-graph tool documentation: components, their options, global options.
//!
//! Parsing is kept separate from the process calls so that it can be tested
//! against captured help text.

use super::runner::{normalize_whitespace, strip_ansi};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

lazy_static! {
    /// `name: description` opens a component scope
    static ref RE_COMPONENT: Regex = Regex::new(r"^([\w-]+):\s*(.*)").unwrap();
    /// ` -option (type): description` registers an option
    static ref RE_OPTION: Regex = Regex::new(r"^\s+-?([\w-]+)\s*\([^)]+\):\s*(.*)").unwrap();
    static ref RE_CONTINUATION: Regex = Regex::new(r"^\s+\S").unwrap();
    static ref RE_OPTION_MARKER: Regex = Regex::new(r"^\s+-").unwrap();
    /// `  --option  description` in the global option listing
    static ref RE_GLOBAL: Regex = Regex::new(r"^\s+(--[\w-]+)\s+(.+)").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDoc {
    pub component: String,
    pub option: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct FilterIndex {
    /// Option name -> every component carrying it
    options: HashMap<String, Vec<OptionDoc>>,
    components: HashSet<String>,
    /// `--option` -> description
    global_options: HashMap<String, String>,
}

/// Option being accumulated while walking the listing
struct PendingOption {
    component: String,
    option: String,
    description: String,
}

impl FilterIndex {
    /// Parse the full component/option listing.
    pub fn parse_listing(text: &str) -> Self {
        let mut index = Self::default();
        let cleaned = strip_ansi(text);

        let mut component: Option<String> = None;
        let mut pending: Option<PendingOption> = None;

        for raw in cleaned.lines() {
            let line = raw.trim_end();

            if let Some(caps) = RE_COMPONENT.captures(line) {
                index.save(pending.take());
                let name = caps[1].to_string();
                index.components.insert(name.clone());
                component = Some(name);
                continue;
            }

            if let (Some(caps), Some(current)) = (RE_OPTION.captures(line), component.as_ref()) {
                index.save(pending.take());
                pending = Some(PendingOption {
                    component: current.clone(),
                    option: caps[1].to_string(),
                    description: caps[2].to_string(),
                });
                continue;
            }

            if let Some(p) = pending.as_mut() {
                if RE_CONTINUATION.is_match(line) && !RE_OPTION_MARKER.is_match(line) {
                    p.description.push(' ');
                    p.description.push_str(line.trim());
                }
            }
        }
        index.save(pending);

        index
    }

    /// Parse the global option listing into this index.
    pub fn add_global_options(&mut self, text: &str) {
        for line in strip_ansi(text).lines() {
            if let Some(caps) = RE_GLOBAL.captures(line) {
                self.global_options
                    .insert(caps[1].to_string(), normalize_whitespace(&caps[2]));
            }
        }
    }

    fn save(&mut self, pending: Option<PendingOption>) {
        if let Some(p) = pending {
            self.options.entry(p.option.clone()).or_default().push(OptionDoc {
                component: p.component,
                option: p.option,
                description: normalize_whitespace(&p.description),
            });
        }
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains(name)
    }

    /// Every component documenting an option with this name.
    pub fn options_named(&self, option: &str) -> &[OptionDoc] {
        self.options.get(option).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn global_option(&self, name: &str) -> Option<&str> {
        self.global_options.get(name).map(String::as_str)
    }

    /// No component known: nothing can be confirmed against this index.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    pub fn global_option_count(&self) -> usize {
        self.global_options.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
reframer: Media Reframer
 -exporter (bool, default: false): compatibility with old exporter,
    displays export results
 -rt (enum, default: off): real-time regulation mode
 -xs (strl): start times
dasher: DASH and HLS segmenter
 -segdur (frac, default: 0/0): target segment duration
    in seconds
 -rt (bool): real-time dashing
\x1b[1minspect\x1b[0m: Inspect packets
 deep (bool, default: false): dump packets along with PIDs state
   -not an option line
";

    #[test]
    fn test_parse_components() {
        let index = FilterIndex::parse_listing(LISTING);
        assert_eq!(index.component_count(), 3);
        assert!(index.has_component("reframer"));
        assert!(index.has_component("inspect"));
        assert!(!index.has_component("segdur"));
    }

    #[test]
    fn test_parse_options_with_continuations() {
        let index = FilterIndex::parse_listing(LISTING);
        let exporter = index.options_named("exporter");
        assert_eq!(exporter.len(), 1);
        assert_eq!(exporter[0].component, "reframer");
        assert_eq!(
            exporter[0].description,
            "compatibility with old exporter, displays export results"
        );

        let segdur = index.options_named("segdur");
        assert_eq!(segdur[0].description, "target segment duration in seconds");

        let deep = index.options_named("deep");
        assert_eq!(deep[0].component, "inspect");
        assert_eq!(deep[0].description, "dump packets along with PIDs state");
    }

    #[test]
    fn test_ambiguous_option_names_keep_all_components() {
        let index = FilterIndex::parse_listing(LISTING);
        let components: Vec<_> = index
            .options_named("rt")
            .iter()
            .map(|o| o.component.as_str())
            .collect();
        assert_eq!(components, vec!["reframer", "dasher"]);
    }

    #[test]
    fn test_options_before_any_component_are_ignored() {
        let index = FilterIndex::parse_listing(" -orphan (bool): nobody owns me\n");
        assert!(index.is_empty());
        assert!(index.options_named("orphan").is_empty());
    }

    #[test]
    fn test_global_options() {
        let mut index = FilterIndex::default();
        index.add_global_options("Global options\n  --block_size   block size used\n     to read files\n  --threads  number of threads\n");
        assert_eq!(index.global_option_count(), 2);
        assert_eq!(index.global_option("--block_size"), Some("block size used"));
        assert!(index.global_option("--missing").is_none());
    }
}
