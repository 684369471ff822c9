//! Wire schema of a finished report.
//!
//! These are plain data: the trackers produce them with `snapshot()` and
//! [`crate::Recorder::finish`], report consumers read them. Field names,
//! nesting and array order are the contract with report renderers.
//!
//! ```text
//! ReportData
//! ├── test_session_setup: HookData
//! ├── suites: [SuiteData]
//! │   ├── suite_setup?: HookData
//! │   ├── tests: [TestData]
//! │   │   └── steps: [StepData]
//! │   │       └── entries: [StepEntry]
//! │   ├── suites: [SuiteData]   (recursive)
//! │   └── suite_teardown?: HookData
//! └── test_session_teardown: HookData
//! ```

use crate::clock::Timestamp;
use crate::entry::StepEntry;
use crate::node::NodeKind;
use crate::result::{RecorderError, RecorderResult};
use crate::stats::ReportStats;
use serde::{Deserialize, Serialize};

/// Well-known test statuses. The status field itself is free-form.
pub mod status {
    /// Test passed
    pub const PASSED: &str = "passed";
    /// Test failed
    pub const FAILED: &str = "failed";
    /// Test was skipped at run time
    pub const SKIPPED: &str = "skipped";
    /// Test was disabled and not run
    pub const DISABLED: &str = "disabled";

    /// Statuses always present in the stats summary
    pub const KNOWN: [&str; 4] = [PASSED, FAILED, SKIPPED, DISABLED];
}

/// A free-form property object attached to a test or suite
pub type Property = serde_json::Map<String, serde_json::Value>;

/// Info or stats row, re-emitted verbatim
pub type Row = Vec<String>;

/// Named link attached to a test or suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Link label
    pub name: String,
    /// Link target
    pub url: String,
}

impl Link {
    /// Create a link
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Metadata shared by tests and suites.
///
/// Built with chained setters:
///
/// ```
/// use probar_recorder::NodeMeta;
///
/// let meta = NodeMeta::new("login_success")
///     .with_description("User can log in")
///     .with_tag("smoke")
///     .with_property("priority", "high")
///     .with_link("TICKET-42", "https://tracker.example.com/42");
/// assert_eq!(meta.tags, vec!["smoke".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeMeta {
    /// Name, unique among siblings by convention
    pub name: String,
    /// Human readable description
    pub description: String,
    /// Tags, duplicates kept as given
    pub tags: Vec<String>,
    /// Property objects
    pub properties: Vec<Property>,
    /// Links
    pub links: Vec<Link>,
}

impl NodeMeta {
    /// Metadata with only a name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add a single-key property object `{key: value}`
    #[must_use]
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        let mut property = Property::new();
        property.insert(key.into(), value.into());
        self.properties.push(property);
        self
    }

    /// Add a link
    #[must_use]
    pub fn with_link(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.links.push(Link::new(name, url));
        self
    }

    /// Check the metadata before a node is opened with it
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::InvalidMetadata`] for an empty name, an empty
    /// link name or an empty link url
    pub fn validate(&self) -> RecorderResult<()> {
        if self.name.trim().is_empty() {
            return Err(RecorderError::invalid_metadata("name must not be empty"));
        }
        for link in &self.links {
            if link.name.trim().is_empty() {
                return Err(RecorderError::invalid_metadata(format!(
                    "link to '{}' of '{}' has an empty name",
                    link.url, self.name
                )));
            }
            if link.url.trim().is_empty() {
                return Err(RecorderError::invalid_metadata(format!(
                    "link '{}' of '{}' has an empty url",
                    link.name, self.name
                )));
            }
        }
        Ok(())
    }
}

/// A step and its entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepData {
    /// Step title
    pub description: String,
    /// When the step was opened
    #[serde(with = "crate::clock::timestamp")]
    pub start_time: Timestamp,
    /// When the step was closed, `null` while open
    #[serde(with = "crate::clock::timestamp::option")]
    pub end_time: Option<Timestamp>,
    /// Entries in append order
    pub entries: Vec<StepEntry>,
}

impl StepData {
    /// Elapsed time, `None` while open
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// True when no entry is a failed check or an error log
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.entries.iter().all(StepEntry::is_successful)
    }

    /// Outcomes of the check entries, in order
    pub fn check_outcomes(&self) -> impl Iterator<Item = bool> + '_ {
        self.entries.iter().filter_map(StepEntry::check_outcome)
    }
}

/// A setup or teardown hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookData {
    /// When the hook was opened
    #[serde(with = "crate::clock::timestamp")]
    pub start_time: Timestamp,
    /// When the hook was closed, `null` while open
    #[serde(with = "crate::clock::timestamp::option")]
    pub end_time: Option<Timestamp>,
    /// Explicit or derived outcome
    pub outcome: bool,
    /// Steps in creation order
    pub steps: Vec<StepData>,
}

impl HookData {
    /// A hook that did nothing, closed at `at`
    #[must_use]
    pub const fn empty_at(at: Timestamp) -> Self {
        Self {
            start_time: at,
            end_time: Some(at),
            outcome: true,
            steps: Vec::new(),
        }
    }

    /// Elapsed time, `None` while open
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// True when the hook recorded no step
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestData {
    /// Name, description, tags, properties, links
    #[serde(flatten)]
    pub meta: NodeMeta,
    /// When the test was opened
    #[serde(with = "crate::clock::timestamp")]
    pub start_time: Timestamp,
    /// When the test was closed, `null` while open
    #[serde(with = "crate::clock::timestamp::option")]
    pub end_time: Option<Timestamp>,
    /// Steps in creation order
    pub steps: Vec<StepData>,
    /// Caller-supplied status, `null` while open
    pub status: Option<String>,
    /// Caller-supplied explanation of the status
    pub status_details: Option<String>,
}

impl TestData {
    /// Test name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Elapsed time, `None` while open
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// True when the status is `passed` or `disabled`
    #[must_use]
    pub fn is_successful(&self) -> bool {
        matches!(
            self.status.as_deref(),
            Some(status::PASSED | status::DISABLED)
        )
    }
}

/// A suite: tests, child suites and optional hooks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteData {
    /// Name, description, tags, properties, links
    #[serde(flatten)]
    pub meta: NodeMeta,
    /// Tests in insertion order
    pub tests: Vec<TestData>,
    /// Child suites in insertion order
    pub suites: Vec<SuiteData>,
    /// Setup hook, omitted when the suite has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_setup: Option<HookData>,
    /// Teardown hook, omitted when the suite has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_teardown: Option<HookData>,
}

impl SuiteData {
    /// Suite name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Start of the setup hook, or of the first test
    #[must_use]
    pub fn start_time(&self) -> Option<Timestamp> {
        self.suite_setup
            .as_ref()
            .map(|hook| hook.start_time)
            .or_else(|| self.tests.first().map(|test| test.start_time))
    }

    /// End of the teardown hook, or of the last test
    #[must_use]
    pub fn end_time(&self) -> Option<Timestamp> {
        match &self.suite_teardown {
            Some(hook) => hook.end_time,
            None => self.tests.last().and_then(|test| test.end_time),
        }
    }

    /// True when the suite and its descendants hold no test
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty() && self.suites.iter().all(Self::is_empty)
    }

    /// Convenience rollup: every hook succeeded and every test in the subtree
    /// is successful. Not part of the wire format.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        let hooks_ok = [&self.suite_setup, &self.suite_teardown]
            .into_iter()
            .flatten()
            .all(|hook| hook.outcome);
        hooks_ok
            && self.tests.iter().all(TestData::is_successful)
            && self.suites.iter().all(Self::is_successful)
    }
}

/// The report root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    /// Report title
    pub title: String,
    /// Start of the execution window
    #[serde(with = "crate::clock::timestamp")]
    pub start_time: Timestamp,
    /// End of the execution window
    #[serde(with = "crate::clock::timestamp")]
    pub end_time: Timestamp,
    /// When the report was serialized
    #[serde(with = "crate::clock::timestamp")]
    pub generation_time: Timestamp,
    /// Free-form info rows
    pub info: Vec<Row>,
    /// Free-form stats rows
    pub stats: Vec<Row>,
    /// Session setup hook
    pub test_session_setup: HookData,
    /// Session teardown hook
    pub test_session_teardown: HookData,
    /// Top-level suites in insertion order
    pub suites: Vec<SuiteData>,
}

impl ReportData {
    /// Serialize to a compact JSON document
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::Json`] if serialization fails
    pub fn to_json(&self) -> RecorderResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to an indented JSON document
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::Json`] if serialization fails
    pub fn to_json_pretty(&self) -> RecorderResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a JSON document produced by [`ReportData::to_json`]
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::InvalidReport`] if the document does not
    /// match the schema
    pub fn from_json(json: &str) -> RecorderResult<Self> {
        serde_json::from_str(json).map_err(|e| RecorderError::InvalidReport {
            message: e.to_string(),
        })
    }

    /// Elapsed execution window
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }

    /// All suites, depth first, in serialization order
    #[must_use]
    pub fn all_suites(&self) -> Vec<&SuiteData> {
        let mut out = Vec::new();
        collect_suites(&self.suites, &mut out);
        out
    }

    /// All tests, depth first, in serialization order
    #[must_use]
    pub fn all_tests(&self) -> Vec<&TestData> {
        self.all_suites()
            .into_iter()
            .flat_map(|suite| suite.tests.iter())
            .collect()
    }

    /// Every hook and test, in execution order: session setup, then per
    /// suite (setup, tests, teardown, child suites), then session teardown
    #[must_use]
    pub fn results(&self) -> Vec<ResultRef<'_>> {
        let mut out = vec![ResultRef::Hook(&self.test_session_setup)];
        for suite in self.all_suites() {
            if let Some(hook) = &suite.suite_setup {
                out.push(ResultRef::Hook(hook));
            }
            out.extend(suite.tests.iter().map(ResultRef::Test));
            if let Some(hook) = &suite.suite_teardown {
                out.push(ResultRef::Hook(hook));
            }
        }
        out.push(ResultRef::Hook(&self.test_session_teardown));
        out
    }

    /// Find a suite by dotted path, e.g. `"auth.oauth"`
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::NodeNotFound`] if any path segment is missing
    pub fn find_suite(&self, path: &str) -> RecorderResult<&SuiteData> {
        let not_found = || RecorderError::NodeNotFound {
            kind: NodeKind::Suite,
            path: path.to_string(),
        };
        let mut candidates = &self.suites;
        let mut found = None;
        for segment in path.split('.') {
            let suite = candidates
                .iter()
                .find(|s| s.meta.name == segment)
                .ok_or_else(not_found)?;
            candidates = &suite.suites;
            found = Some(suite);
        }
        found.ok_or_else(not_found)
    }

    /// Find a test by dotted path, e.g. `"auth.login_success"`
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::NodeNotFound`] if the suite or test is missing
    pub fn find_test(&self, path: &str) -> RecorderResult<&TestData> {
        let not_found = || RecorderError::NodeNotFound {
            kind: NodeKind::Test,
            path: path.to_string(),
        };
        let (suite_path, test_name) = path.rsplit_once('.').ok_or_else(not_found)?;
        let suite = self.find_suite(suite_path).map_err(|_| not_found())?;
        suite
            .tests
            .iter()
            .find(|t| t.meta.name == test_name)
            .ok_or_else(not_found)
    }

    /// True when every test passed or was disabled
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.all_tests().into_iter().all(TestData::is_successful)
    }

    /// Aggregate counts over the whole report
    #[must_use]
    pub fn stats_summary(&self) -> ReportStats {
        ReportStats::from_report(self)
    }
}

/// A hook or a test: anything with steps and timing
#[derive(Debug, Clone, Copy)]
pub enum ResultRef<'a> {
    /// A hook
    Hook(&'a HookData),
    /// A test
    Test(&'a TestData),
}

impl<'a> ResultRef<'a> {
    /// Steps of the result
    #[must_use]
    pub fn steps(self) -> &'a [StepData] {
        match self {
            Self::Hook(hook) => &hook.steps,
            Self::Test(test) => &test.steps,
        }
    }

    /// Elapsed time, `None` while open
    #[must_use]
    pub fn duration(self) -> Option<chrono::Duration> {
        match self {
            Self::Hook(hook) => hook.duration(),
            Self::Test(test) => test.duration(),
        }
    }
}

fn collect_suites<'a>(suites: &'a [SuiteData], out: &mut Vec<&'a SuiteData>) {
    for suite in suites {
        out.push(suite);
        collect_suites(&suite.suites, out);
    }
}
