//! Aggregate statistics over a finished report.

use crate::clock::{format_timestamp, Timestamp};
use crate::entry::LogLevel;
use crate::schema::{status, ReportData, ResultRef, Row, SuiteData};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts and durations rolled up from a report or a set of suites
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportStats {
    /// Start of the report, if computed from a report
    pub start_time: Option<Timestamp>,
    /// End of the report, if computed from a report
    pub end_time: Option<Timestamp>,
    /// Number of tests
    pub tests: usize,
    /// Tests that are not disabled
    pub enabled_tests: usize,
    /// Number of tests per status; well-known statuses are always present
    pub statuses: BTreeMap<String, usize>,
    /// `passed / enabled_tests * 100`, 0 when nothing is enabled
    pub successful_tests_percentage: f64,
    /// Number of check entries
    pub checks: usize,
    /// Check entries with outcome true
    pub check_successes: usize,
    /// Check entries with outcome false
    pub check_failures: usize,
    /// Log entries at level error
    pub error_logs: usize,
    /// Log entries at level warn
    pub warning_logs: usize,
    /// Report duration
    #[serde(skip)]
    pub duration: Option<chrono::Duration>,
    /// Sum of the durations of every hook and test
    #[serde(skip)]
    pub cumulative_duration: chrono::Duration,
}

impl ReportStats {
    fn empty() -> Self {
        Self {
            start_time: None,
            end_time: None,
            tests: 0,
            enabled_tests: 0,
            statuses: status::KNOWN.iter().map(|s| ((*s).to_string(), 0)).collect(),
            successful_tests_percentage: 0.0,
            checks: 0,
            check_successes: 0,
            check_failures: 0,
            error_logs: 0,
            warning_logs: 0,
            duration: None,
            cumulative_duration: chrono::Duration::zero(),
        }
    }

    /// Stats of a whole report, session hooks included
    #[must_use]
    pub fn from_report(report: &ReportData) -> Self {
        let mut stats = Self::empty();
        stats.start_time = Some(report.start_time);
        stats.end_time = Some(report.end_time);
        stats.duration = Some(report.duration());
        stats.add_results(report.results());
        stats.add_tests(report.all_tests().into_iter().map(|t| t.status.as_deref()));
        stats
    }

    /// Stats of a set of suites, without session hooks or report timing
    #[must_use]
    pub fn from_suites(suites: &[SuiteData]) -> Self {
        let mut results = Vec::new();
        let mut statuses = Vec::new();
        let mut pending: Vec<&SuiteData> = suites.iter().rev().collect();
        while let Some(suite) = pending.pop() {
            if let Some(hook) = &suite.suite_setup {
                results.push(ResultRef::Hook(hook));
            }
            for test in &suite.tests {
                results.push(ResultRef::Test(test));
                statuses.push(test.status.as_deref());
            }
            if let Some(hook) = &suite.suite_teardown {
                results.push(ResultRef::Hook(hook));
            }
            pending.extend(suite.suites.iter().rev());
        }
        let mut stats = Self::empty();
        stats.add_results(results);
        stats.add_tests(statuses);
        stats
    }

    fn add_results<'a>(&mut self, results: impl IntoIterator<Item = ResultRef<'a>>) {
        for result in results {
            if let Some(duration) = result.duration() {
                self.cumulative_duration = self.cumulative_duration + duration;
            }
            for entry in result.steps().iter().flat_map(|step| &step.entries) {
                if let Some(outcome) = entry.check_outcome() {
                    self.checks += 1;
                    if outcome {
                        self.check_successes += 1;
                    } else {
                        self.check_failures += 1;
                    }
                }
                match entry.log_level() {
                    Some(LogLevel::Warn) => self.warning_logs += 1,
                    Some(LogLevel::Error) => self.error_logs += 1,
                    _ => {}
                }
            }
        }
    }

    fn add_tests<'a>(&mut self, statuses: impl IntoIterator<Item = Option<&'a str>>) {
        for status in statuses {
            self.tests += 1;
            if let Some(status) = status {
                *self.statuses.entry(status.to_string()).or_insert(0) += 1;
            }
        }
        self.enabled_tests = self.tests - self.status_count(status::DISABLED);
        self.successful_tests_percentage = if self.enabled_tests == 0 {
            0.0
        } else {
            self.status_count(status::PASSED) as f64 / self.enabled_tests as f64 * 100.0
        };
    }

    /// Number of tests with `status`
    #[must_use]
    pub fn status_count(&self, status: &str) -> usize {
        self.statuses.get(status).copied().unwrap_or(0)
    }

    /// Render the summary as report stats rows
    #[must_use]
    pub fn to_rows(&self) -> Vec<Row> {
        let na = || "n/a".to_string();
        let rows = [
            ("Start time", self.start_time.as_ref().map_or_else(na, format_timestamp)),
            ("End time", self.end_time.as_ref().map_or_else(na, format_timestamp)),
            ("Duration", self.duration.map_or_else(na, format_duration)),
            ("Tests", self.tests.to_string()),
            ("Successful tests", self.status_count(status::PASSED).to_string()),
            (
                "Successful tests in %",
                format!("{}%", self.successful_tests_percentage as u64),
            ),
            ("Failed tests", self.status_count(status::FAILED).to_string()),
            ("Skipped tests", self.status_count(status::SKIPPED).to_string()),
            ("Disabled tests", self.status_count(status::DISABLED).to_string()),
        ];
        rows.into_iter()
            .map(|(name, value)| vec![name.to_string(), value])
            .collect()
    }
}

/// Human readable duration: `1.250s`, `2m05s`, `1h02m05s`
#[must_use]
pub fn format_duration(duration: chrono::Duration) -> String {
    let total_ms = duration.num_milliseconds().max(0);
    let secs = total_ms / 1000;
    if secs >= 3600 {
        format!("{}h{:02}m{:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}.{:03}s", secs, total_ms % 1000)
    }
}
