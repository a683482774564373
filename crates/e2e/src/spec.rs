//! Declarative YAML suites
//!
//! One file describes one suite: shared route mocks, steps run before each
//! test, and the tests themselves. Every test gets a fresh page.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::Viewport;
use crate::error::{E2eError, E2eResult};
use crate::language::Language;
use crate::route::RouteMock;

/// A suite parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite {
    /// Unique name for this suite
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Tags for filtering; apply to every test in the suite
    #[serde(default)]
    pub tags: Vec<String>,

    /// Overrides the configured viewport
    #[serde(default)]
    pub viewport: Option<Viewport>,

    /// Requests answered from fixtures instead of the network
    #[serde(default)]
    pub routes: Vec<RouteMock>,

    /// Steps run at the start of every test
    #[serde(default)]
    pub before_each: Vec<TestStep>,

    pub tests: Vec<TestCase>,

    /// File the suite was loaded from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,

    #[serde(default)]
    pub tags: Vec<String>,

    pub steps: Vec<TestStep>,
}

/// A single step in a test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a path relative to the base URL
    Goto {
        url: String,
        #[serde(default)]
        wait_for: Option<String>,
    },

    /// Wait for an element to reach a state
    WaitFor {
        selector: String,
        #[serde(default)]
        state: WaitState,
    },

    Click {
        selector: String,
    },

    /// Open the language menu and pick a language
    SelectLanguage {
        lang: Language,
        #[serde(default = "default_lang_trigger")]
        trigger: String,
        #[serde(default = "default_lang_item")]
        item: String,
    },

    /// Press a key on the page, or on an element when a selector is given
    Press {
        #[serde(default)]
        selector: Option<String>,
        key: String,
    },

    ExpectVisible {
        selector: String,
    },

    ExpectEnabled {
        selector: String,
    },

    /// Element text matches a JavaScript regular expression
    ExpectText {
        selector: String,
        pattern: String,
        /// `RegExp` flags such as `i`
        #[serde(default)]
        flags: Option<String>,
    },

    ExpectCount {
        selector: String,
        count: Count,
    },

    /// Query parameters of the page URL
    ExpectUrlParams {
        params: BTreeMap<String, String>,
    },

    /// Query parameters of a URL held in an element attribute
    ExpectShareParams {
        selector: String,
        #[serde(default = "default_share_attribute")]
        attribute: String,
        params: BTreeMap<String, String>,
        /// Also require the same values in the page URL
        #[serde(default = "default_true")]
        match_page: bool,
    },

    /// Element's horizontal centre lies within `tolerance_px` of the
    /// viewport centre
    ExpectCentered {
        selector: String,
        #[serde(default = "default_center_tolerance")]
        tolerance_px: f64,
    },

    /// Computed style values
    ExpectStyle {
        selector: String,
        styles: BTreeMap<String, String>,
        /// Check every match instead of the first
        #[serde(default)]
        all: bool,
    },

    /// Computed style values equal those of `reference`
    ExpectStyleMatches {
        selector: String,
        reference: String,
        properties: Vec<String>,
        #[serde(default)]
        all: bool,
    },

    /// Quote, page URL and share link agree with the reading model after
    /// the preceding steps
    ExpectReading {
        #[serde(default = "default_quote_selector")]
        quote_selector: String,
        #[serde(default)]
        share_selector: Option<String>,
        #[serde(default = "default_share_attribute")]
        share_attribute: String,
    },

    Log {
        message: String,
    },
}

/// Expected element count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Exact(usize),
    /// As many as the named fixture has excerpts
    Fixture { fixture: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

fn default_lang_trigger() -> String {
    "#lang-trigger".to_string()
}

fn default_lang_item() -> String {
    ".lang-menu-item".to_string()
}

fn default_share_attribute() -> String {
    "data-share-url".to_string()
}

fn default_quote_selector() -> String {
    ".reading-quote".to_string()
}

fn default_center_tolerance() -> f64 {
    8.0
}

fn default_true() -> bool {
    true
}

impl TestStep {
    /// Short label used in reports
    pub fn label(&self) -> String {
        match self {
            TestStep::Goto { url, .. } => format!("goto:{}", url),
            TestStep::WaitFor { selector, .. } => format!("wait_for:{}", selector),
            TestStep::Click { selector } => format!("click:{}", selector),
            TestStep::SelectLanguage { lang, .. } => format!("select_language:{}", lang),
            TestStep::Press { key, .. } => format!("press:{}", key),
            TestStep::ExpectVisible { selector } => format!("expect_visible:{}", selector),
            TestStep::ExpectEnabled { selector } => format!("expect_enabled:{}", selector),
            TestStep::ExpectText { selector, .. } => format!("expect_text:{}", selector),
            TestStep::ExpectCount { selector, .. } => format!("expect_count:{}", selector),
            TestStep::ExpectUrlParams { .. } => "expect_url_params".to_string(),
            TestStep::ExpectShareParams { selector, .. } => {
                format!("expect_share_params:{}", selector)
            }
            TestStep::ExpectCentered { selector, .. } => format!("expect_centered:{}", selector),
            TestStep::ExpectStyle { selector, .. } => format!("expect_style:{}", selector),
            TestStep::ExpectStyleMatches { selector, .. } => {
                format!("expect_style_matches:{}", selector)
            }
            TestStep::ExpectReading { .. } => "expect_reading".to_string(),
            TestStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }
}

impl TestSuite {
    /// Parse a suite from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let suite: Self = serde_yaml::from_str(yaml)?;
        suite.validate()?;
        Ok(suite)
    }

    /// Parse a suite from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut suite = Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))?;
        suite.source = Some(path.to_path_buf());
        Ok(suite)
    }

    /// Load every suite under a directory, sorted by file name
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(E2eError::SpecParse(format!(
                "test directory not found: {}",
                dir.display()
            )));
        }

        let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut suites = Vec::with_capacity(paths.len());
        let mut names = HashSet::new();
        for path in paths {
            let suite = Self::from_file(&path)?;
            if !names.insert(suite.name.clone()) {
                return Err(E2eError::SpecParse(format!(
                    "duplicate suite name '{}' in {}",
                    suite.name,
                    path.display()
                )));
            }
            suites.push(suite);
        }

        Ok(suites)
    }

    fn validate(&self) -> E2eResult<()> {
        if self.tests.is_empty() {
            return Err(E2eError::SpecParse(format!("suite '{}' has no tests", self.name)));
        }
        let mut names = HashSet::new();
        for case in &self.tests {
            if !names.insert(case.name.as_str()) {
                return Err(E2eError::SpecParse(format!(
                    "suite '{}' repeats test '{}'",
                    self.name, case.name
                )));
            }
        }
        Ok(())
    }

    /// Whether a test carries `tag` directly or through its suite
    pub fn has_tag(&self, case: &TestCase, tag: &str) -> bool {
        self.tags.iter().chain(&case.tags).any(|t| t == tag)
    }
}
