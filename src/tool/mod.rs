//! Documentation indexes built by introspecting the installed tools.
//!
//! Both indexes are built on first use, at most once per process. An
//! introspection failure leaves the index empty and is logged; callers
//! treat an empty index as "cannot confirm", never as "invalid".

pub mod filters;
pub mod runner;
pub mod switches;

use crate::config::{Config, HelpTimeouts};
use filters::{FilterIndex, OptionDoc};
use lazy_static::lazy_static;
use regex::Regex;
use runner::{HelpSource, ProbeError};
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use switches::{SwitchDoc, SwitchIndex, SWITCH_GROUPS};
use tracing::{info, warn};

lazy_static! {
    static ref RE_CLOSEST: Regex = Regex::new(r"(?i)closest match(?:es)?:\s*([^\n]+)").unwrap();
}

/// Marker the tool prints when a probed name does not exist
const NOT_FOUND_MARKER: &str = "not found";

/// Answer of a targeted component.option probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found,
    NotFound {
        message: String,
        suggestion: Option<String>,
    },
    /// The tool could not be asked
    Unconfirmed(String),
}

pub struct ToolDocs {
    source: Box<dyn HelpSource>,
    gpac_bin: String,
    mp4box_bin: String,
    timeouts: HelpTimeouts,
    filters: OnceCell<FilterIndex>,
    switches: OnceCell<SwitchIndex>,
    help_cache: RefCell<HashMap<String, String>>,
}

impl ToolDocs {
    pub fn new(source: Box<dyn HelpSource>, config: &Config) -> Self {
        Self {
            source,
            gpac_bin: config.gpac_bin.clone(),
            mp4box_bin: config.mp4box_bin.clone(),
            timeouts: config.timeouts,
            filters: OnceCell::new(),
            switches: OnceCell::new(),
            help_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Component/option index, introspected on first call.
    pub fn filters(&self) -> &FilterIndex {
        self.filters.get_or_init(|| self.build_filter_index())
    }

    /// Companion-tool switch index, introspected on first call.
    pub fn switches(&self) -> &SwitchIndex {
        self.switches.get_or_init(|| self.build_switch_index())
    }

    fn build_filter_index(&self) -> FilterIndex {
        let mut index = match self.source.help(
            &self.gpac_bin,
            &["-ha", "filters"],
            self.timeouts.full_listing,
        ) {
            Ok(text) => FilterIndex::parse_listing(&text),
            Err(e) => {
                warn!("[GPAC-DOCS] Failed to index filters: {}", e);
                return FilterIndex::default();
            }
        };

        match self
            .source
            .help(&self.gpac_bin, &["-h", "doc"], self.timeouts.section)
        {
            Ok(text) => index.add_global_options(&text),
            Err(e) => warn!("[GPAC-DOCS] Failed to parse global options: {}", e),
        }

        info!(
            "[GPAC-DOCS] Indexed {} options, {} filters, {} global opts",
            index.option_count(),
            index.component_count(),
            index.global_option_count()
        );
        index
    }

    fn build_switch_index(&self) -> SwitchIndex {
        let mut index = SwitchIndex::default();
        for &group in SWITCH_GROUPS {
            match self
                .source
                .help(&self.mp4box_bin, &["-h", group], self.timeouts.section)
            {
                Ok(text) => index.add_group(&text, group),
                Err(e) => warn!("[MP4BOX-DOCS] Failed to index {}: {}", group, e),
            }
        }
        info!("[MP4BOX-DOCS] Indexed {} flags", index.len());
        index
    }

    pub fn is_component(&self, name: &str) -> bool {
        self.filters().has_component(name)
    }

    pub fn options_named(&self, option: &str) -> &[OptionDoc] {
        self.filters().options_named(option)
    }

    pub fn is_switch(&self, switch: &str) -> bool {
        self.switches().contains(switch)
    }

    pub fn switch_info(&self, switch: &str) -> &[SwitchDoc] {
        self.switches().info(switch)
    }

    /// Full help text of one component, cached after the first success.
    pub fn component_help(&self, name: &str) -> String {
        if let Some(text) = self.help_cache.borrow().get(name) {
            return text.clone();
        }
        match self
            .source
            .help(&self.gpac_bin, &["-h", name], self.timeouts.section)
        {
            Ok(text) => {
                self.help_cache
                    .borrow_mut()
                    .insert(name.to_string(), text.clone());
                text
            }
            Err(ProbeError::Failed { stderr, .. }) if !stderr.trim().is_empty() => stderr,
            Err(_) => format!("Error: filter '{}' not found", name),
        }
    }

    /// Ask the tool whether `component` has an option named `option`.
    pub fn probe_option(&self, component: &str, option: &str) -> ProbeOutcome {
        let target = format!("{}.{}", component, option);
        match self
            .source
            .help(&self.gpac_bin, &["-h", target.as_str()], self.timeouts.probe)
        {
            Ok(text) if !text.to_lowercase().contains(NOT_FOUND_MARKER) => ProbeOutcome::Found,
            Ok(text) => ProbeOutcome::NotFound {
                message: format!("{} not found", target),
                suggestion: closest_match(&text),
            },
            Err(e) if e.is_unavailable() => ProbeOutcome::Unconfirmed(e.to_string()),
            Err(e) => {
                let suggestion = match &e {
                    ProbeError::Failed { stderr, .. } => closest_match(stderr),
                    _ => None,
                };
                ProbeOutcome::NotFound {
                    message: format!("{} not found", target),
                    suggestion,
                }
            }
        }
    }
}

fn closest_match(text: &str) -> Option<String> {
    RE_CLOSEST
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::runner::{HelpSource, ProbeError};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::time::Duration;

    /// Canned help answers keyed by the joined argument list.
    #[derive(Default, Clone)]
    pub struct FakeHelpSource {
        pub answers: HashMap<String, Result<String, i32>>,
        pub calls: Rc<RefCell<Vec<String>>>,
    }

    impl FakeHelpSource {
        pub fn answer(mut self, args: &str, text: &str) -> Self {
            self.answers.insert(args.to_string(), Ok(text.to_string()));
            self
        }

        /// Make `args` exit non-zero with a closest-match hint on stderr.
        pub fn fail(mut self, args: &str, code: i32) -> Self {
            self.answers.insert(args.to_string(), Err(code));
            self
        }
    }

    impl HelpSource for FakeHelpSource {
        fn help(&self, program: &str, args: &[&str], _timeout: Duration) -> Result<String, ProbeError> {
            let key = args.join(" ");
            self.calls.borrow_mut().push(format!("{} {}", program, key));
            match self.answers.get(&key) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(code)) => Err(ProbeError::Failed {
                    program: program.to_string(),
                    code: Some(*code),
                    stderr: format!("Filter {} not found, closest matches: reframer.xs, reframer.xe", key),
                }),
                None => Err(ProbeError::Spawn {
                    program: program.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no canned answer"),
                }),
            }
        }
    }
}
