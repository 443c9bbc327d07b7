//! Test corpus loader.
//!
//! Reads the test-suite description document (XML) into an ordered table of
//! tests. Each test field may be given as an attribute or as a child element
//! of the same name. Subtests without a command are dropped here so that
//! nothing downstream has to filter them again.

use crate::error::FinderError;
use roxmltree::{Document, Node};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Subtest name used when the document omits one
const DEFAULT_SUBTEST_NAME: &str = "sub";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusSubtest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusTest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub keywords: Vec<String>,
    /// Script file the test was generated from (e.g. `aac-sbr.sh`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub subtests: Vec<CorpusSubtest>,
}

/// Ordered, name-unique collection of corpus tests.
///
/// A later test with an already seen name replaces the earlier one in place.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    tests: Vec<CorpusTest>,
    positions: HashMap<String, usize>,
}

impl Corpus {
    pub fn from_tests(tests: impl IntoIterator<Item = CorpusTest>) -> Self {
        let mut corpus = Self::default();
        for test in tests {
            corpus.insert(test);
        }
        corpus
    }

    /// Parse a corpus document.
    pub fn parse(xml: &str) -> Result<Self, roxmltree::Error> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();

        let mut corpus = Self::default();
        for node in element_children(root, &["Test", "test"]) {
            match parse_test(node) {
                Some(test) => corpus.insert(test),
                None => debug!("Skipping unnamed test element"),
            }
        }
        Ok(corpus)
    }

    /// Read and parse the corpus document at `path`.
    pub fn load(path: &Path) -> Result<Self, FinderError> {
        let xml = fs::read_to_string(path).map_err(|e| FinderError::CorpusRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&xml).map_err(|e| FinderError::CorpusParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load the corpus, degrading to an empty table when it cannot be read.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(corpus) => corpus,
            Err(e) => {
                warn!("{}; serving with an empty corpus", e);
                Self::default()
            }
        }
    }

    pub fn tests(&self) -> &[CorpusTest] {
        &self.tests
    }

    pub fn get(&self, name: &str) -> Option<&CorpusTest> {
        self.positions.get(name).map(|&i| &self.tests[i])
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    fn insert(&mut self, test: CorpusTest) {
        match self.positions.get(&test.name) {
            Some(&i) => {
                debug!("Duplicate test name {}, keeping the later entry", test.name);
                self.tests[i] = test;
            }
            None => {
                self.positions.insert(test.name.clone(), self.tests.len());
                self.tests.push(test);
            }
        }
    }
}

// ============================================================================
// Element helpers
// ============================================================================

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
    tags: &'static [&'static str],
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |n| n.is_element() && tags.contains(&n.tag_name().name()))
}

/// Attribute value, or the text of a child element with the same name.
fn field(node: Node, name: &str) -> Option<String> {
    if let Some(value) = node.attribute(name) {
        return Some(value.to_string());
    }
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .map(|n| n.text().unwrap_or_default().to_string())
}

fn split_keywords(raw: Option<String>) -> Vec<String> {
    raw.map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn parse_test(node: Node) -> Option<CorpusTest> {
    let name = field(node, "name").filter(|n| !n.is_empty())?;

    let direct = element_children(node, &["Subtest", "subtest"]);
    let wrapped = element_children(node, &["Subtests"])
        .flat_map(|w| element_children(w, &["Subtest", "subtest"]));

    let subtests = direct.chain(wrapped).filter_map(parse_subtest).collect();

    Some(CorpusTest {
        name,
        description: field(node, "desc"),
        keywords: split_keywords(field(node, "keywords")),
        file: field(node, "file"),
        subtests,
    })
}

fn parse_subtest(node: Node) -> Option<CorpusSubtest> {
    let command = field(node, "Command")
        .or_else(|| field(node, "command"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())?;

    Some(CorpusSubtest {
        name: field(node, "name").unwrap_or_else(|| DEFAULT_SUBTEST_NAME.to_string()),
        description: field(node, "desc"),
        keywords: split_keywords(field(node, "keywords")),
        command,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<TestSuiteDescription>
  <Test name="aac-sbr" desc="AAC SBR signalling" keywords="aac  sbr" file="aac-sbr.sh">
    <Subtest name="dash" desc="dash the file">
      <Command>MP4Box -dash 1000 counter.264</Command>
    </Subtest>
    <Subtest name="nocmd" desc="no command here"/>
  </Test>
  <Test>
    <name>wrapped</name>
    <desc>child element fields</desc>
    <Subtests>
      <Subtest name="a" keywords="x y" command="gpac -i a.mp4 inspect"/>
    </Subtests>
  </Test>
  <Test desc="nameless"/>
  <Test name="aac-sbr" desc="second definition">
    <Subtest><Command><![CDATA[gpac -i in.mp4 -o out.mpd]]></Command></Subtest>
  </Test>
</TestSuiteDescription>"#;

    #[test]
    fn test_parse_reads_attributes_and_children() {
        let corpus = Corpus::parse(SAMPLE).unwrap();
        assert_eq!(corpus.len(), 2);

        let wrapped = corpus.get("wrapped").unwrap();
        assert_eq!(wrapped.description.as_deref(), Some("child element fields"));
        assert_eq!(wrapped.subtests.len(), 1);
        assert_eq!(wrapped.subtests[0].keywords, vec!["x", "y"]);
        assert_eq!(wrapped.subtests[0].command, "gpac -i a.mp4 inspect");
    }

    #[test]
    fn test_duplicate_names_last_write_wins_in_place() {
        let corpus = Corpus::parse(SAMPLE).unwrap();
        assert_eq!(corpus.tests()[0].name, "aac-sbr");

        let test = corpus.get("aac-sbr").unwrap();
        assert_eq!(test.description.as_deref(), Some("second definition"));
        assert_eq!(test.subtests[0].name, DEFAULT_SUBTEST_NAME);
        assert_eq!(test.subtests[0].command, "gpac -i in.mp4 -o out.mpd");
        assert!(test.file.is_none());
    }

    #[test]
    fn test_commandless_subtests_are_dropped() {
        let xml = r#"<TestSuiteDescription>
            <Test name="t" keywords="a">
              <Subtest name="keep"><Command>gpac -h</Command></Subtest>
              <Subtest name="drop"><Command>   </Command></Subtest>
              <Subtest name="drop2"/>
            </Test></TestSuiteDescription>"#;
        let corpus = Corpus::parse(xml).unwrap();
        let test = corpus.get("t").unwrap();
        assert_eq!(test.subtests.len(), 1);
        assert_eq!(test.subtests[0].name, "keep");
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(Corpus::parse("<TestSuiteDescription><Test name=").is_err());
    }

    #[test]
    fn test_load_or_empty_degrades() {
        let corpus = Corpus::load_or_empty(Path::new("/nonexistent/corpus.xml"));
        assert!(corpus.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let corpus = Corpus::load(file.path()).unwrap();
        assert_eq!(corpus.len(), 2);
    }
}
