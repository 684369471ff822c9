//! Probar Recorder: structured test execution reports.
//!
//! A harness opens a report, then suites, tests, hooks and steps inside it,
//! appends evidence (logs, checks, attachments, links) to steps, and closes
//! everything bottom-up. [`Recorder::finish`] freezes the tree into a
//! [`ReportData`] ready for JSON serialization.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    RECORDER Architecture                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐             │
//! │   │ Recorder   │───►│ Suite      │───►│ Test /     │             │
//! │   │ (report)   │    │ Handle     │    │ Hook       │             │
//! │   └────────────┘    └─────┬──────┘    └─────┬──────┘             │
//! │         │                 │ (recursive)     ▼                    │
//! │         │                 ▼           ┌────────────┐             │
//! │         │           child suites      │ Step       │──► entries  │
//! │         ▼                             └────────────┘             │
//! │   finish() ──► ReportData ──► JSON / stats / navigation          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every node has its own lock, so workers recording into disjoint subtrees
//! never contend. Handles are cheap to clone and can be moved across threads.
//!
//! # Example
//!
//! ```
//! use probar_recorder::{LogLevel, NodeMeta, Recorder, RecorderConfig};
//!
//! let recorder = Recorder::new(RecorderConfig::default());
//! recorder.begin("Nightly Run", vec![], vec![]).unwrap();
//!
//! let suite = recorder.add_suite(NodeMeta::new("auth")).unwrap();
//! let test = suite.add_test(NodeMeta::new("login_success").with_tag("smoke")).unwrap();
//! let step = test.add_step("submit form").unwrap();
//! step.log(LogLevel::Info, "posting credentials").unwrap();
//! step.check("status code", true).unwrap();
//! step.close().unwrap();
//! test.pass().unwrap();
//! suite.close().unwrap();
//!
//! let report = recorder.finish().unwrap();
//! assert!(report.is_successful());
//! let json = report.to_json().unwrap();
//! assert!(json.contains("\"test_session_setup\""));
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod clock;
mod config;
mod entry;
mod hook;
mod node;
mod report;
mod result;
mod schema;
mod stats;
mod step;
mod suite;
mod test_case;

pub use clock::{
    format_timestamp, parse_timestamp, Clock, FakeClock, SystemClock, Timestamp,
    TIMESTAMP_FORMAT,
};
pub use config::{RecorderConfig, UnclosedPolicy, DEFAULT_INCOMPLETE_STATUS};
pub use entry::{LogLevel, StepEntry};
pub use hook::HookHandle;
pub use node::{HookRole, NodeKind, NodeState};
pub use report::Recorder;
pub use result::{RecorderError, RecorderResult};
pub use schema::{
    status, HookData, Link, NodeMeta, Property, ReportData, ResultRef, Row, StepData,
    SuiteData, TestData,
};
pub use stats::{format_duration, ReportStats};
pub use step::StepHandle;
pub use suite::SuiteHandle;
pub use test_case::TestHandle;
