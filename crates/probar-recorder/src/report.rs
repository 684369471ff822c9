//! Report builder: the root of one recorded run.
//!
//! A [`Recorder`] is created by the harness at run start and passed (cloned)
//! into every worker. Clones share the same report; separate recorders never
//! share anything, so several runs can be recorded side by side.

use crate::clock::{Clock, SystemClock};
use crate::config::RecorderConfig;
use crate::hook::HookHandle;
use crate::node::{
    settle_children, Context, Guarded, HookRole, Lifecycle, NodeKind, NodeState, SharedContext,
};
use crate::result::{RecorderError, RecorderResult};
use crate::schema::{HookData, NodeMeta, ReportData, Row};
use crate::suite::SuiteHandle;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug)]
struct ReportNode {
    id: Uuid,
    title: String,
    lifecycle: Lifecycle,
    info: Vec<Row>,
    stats: Vec<Row>,
    session_setup: Option<HookHandle>,
    session_teardown: Option<HookHandle>,
    suites: Vec<SuiteHandle>,
    finished: Option<Arc<ReportData>>,
}

/// Records one test run into a report tree.
///
/// ```
/// use probar_recorder::{NodeMeta, Recorder, RecorderConfig};
///
/// let recorder = Recorder::new(RecorderConfig::default());
/// recorder.begin("Nightly Run", vec![], vec![]).unwrap();
/// let suite = recorder.add_suite(NodeMeta::new("auth")).unwrap();
/// let test = suite.add_test(NodeMeta::new("login_success")).unwrap();
/// let step = test.add_step("submit form").unwrap();
/// step.check("status code", true).unwrap();
/// step.close().unwrap();
/// test.pass().unwrap();
/// suite.close().unwrap();
///
/// let report = recorder.finish().unwrap();
/// assert_eq!(report.suites[0].tests[0].status.as_deref(), Some("passed"));
/// ```
#[derive(Debug, Clone)]
pub struct Recorder {
    node: Guarded<ReportNode>,
    ctx: SharedContext,
}

impl Recorder {
    /// Create an unopened recorder using the system clock
    #[must_use]
    pub fn new(config: RecorderConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create an unopened recorder with an explicit time source
    #[must_use]
    pub fn with_clock(config: RecorderConfig, clock: Arc<dyn Clock>) -> Self {
        let node = ReportNode {
            id: Uuid::new_v4(),
            title: String::new(),
            lifecycle: Lifecycle::unopened(),
            info: Vec::new(),
            stats: Vec::new(),
            session_setup: None,
            session_teardown: None,
            suites: Vec::new(),
            finished: None,
        };
        Self {
            node: Guarded::new(node),
            ctx: Context::shared(config, clock),
        }
    }

    /// Configuration the recorder was created with
    #[must_use]
    pub fn config(&self) -> &RecorderConfig {
        &self.ctx.config
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> NodeState {
        self.node.with(|node| node.lifecycle.state())
    }

    /// Report title
    #[must_use]
    pub fn title(&self) -> String {
        self.node.with(|node| node.title.clone())
    }

    /// Start recording. `info` and `stats` rows are kept verbatim.
    ///
    /// # Errors
    ///
    /// - [`RecorderError::AlreadyOpen`] if the report has already begun
    /// - [`RecorderError::ClosedNode`] if it has finished
    pub fn begin(
        &self,
        title: impl Into<String>,
        info: Vec<Row>,
        stats: Vec<Row>,
    ) -> RecorderResult<()> {
        let title = title.into();
        let at = self.ctx.now();
        let mut guard = self.node.lock();
        let node = &mut *guard;
        node.lifecycle.open(NodeKind::Report, &title, at)?;
        debug!(kind = %NodeKind::Report, node = %node.id, title = %title, "opened");
        node.title = title;
        node.info = info;
        node.stats = stats;
        Ok(())
    }

    fn with_open<R>(&self, f: impl FnOnce(&mut ReportNode) -> R) -> RecorderResult<R> {
        let mut node = self.node.lock();
        node.lifecycle.ensure_open(NodeKind::Report, &node.title)?;
        Ok(f(&mut *node))
    }

    /// Replace the title
    ///
    /// # Errors
    ///
    /// [`RecorderError::NotOpen`] or [`RecorderError::ClosedNode`] outside
    /// the open state
    pub fn set_title(&self, title: impl Into<String>) -> RecorderResult<()> {
        let title = title.into();
        self.with_open(|node| node.title = title)
    }

    /// Append an info row `[name, value]`
    ///
    /// # Errors
    ///
    /// [`RecorderError::NotOpen`] or [`RecorderError::ClosedNode`] outside
    /// the open state
    pub fn add_info(&self, name: impl Into<String>, value: impl Into<String>) -> RecorderResult<()> {
        let row = vec![name.into(), value.into()];
        self.with_open(|node| node.info.push(row))
    }

    /// Replace the stats rows
    ///
    /// # Errors
    ///
    /// [`RecorderError::NotOpen`] or [`RecorderError::ClosedNode`] outside
    /// the open state
    pub fn set_stats(&self, stats: Vec<Row>) -> RecorderResult<()> {
        self.with_open(|node| node.stats = stats)
    }

    /// Open the session setup hook
    ///
    /// # Errors
    ///
    /// - [`RecorderError::DuplicateHook`] on a second call
    /// - [`RecorderError::NotOpen`] or [`RecorderError::ClosedNode`] outside
    ///   the open state
    pub fn session_setup(&self) -> RecorderResult<HookHandle> {
        self.open_hook(HookRole::TestSessionSetup)
    }

    /// Open the session teardown hook
    ///
    /// # Errors
    ///
    /// - [`RecorderError::DuplicateHook`] on a second call
    /// - [`RecorderError::NotOpen`] or [`RecorderError::ClosedNode`] outside
    ///   the open state
    pub fn session_teardown(&self) -> RecorderResult<HookHandle> {
        self.open_hook(HookRole::TestSessionTeardown)
    }

    fn open_hook(&self, role: HookRole) -> RecorderResult<HookHandle> {
        let mut guard = self.node.lock();
        let node = &mut *guard;
        node.lifecycle.ensure_open(NodeKind::Report, &node.title)?;
        let slot = match role {
            HookRole::TestSessionSetup => &mut node.session_setup,
            _ => &mut node.session_teardown,
        };
        if slot.is_some() {
            return Err(RecorderError::DuplicateHook {
                owner: node.title.clone(),
                role,
            });
        }
        let hook = HookHandle::open(self.ctx.clone(), role);
        *slot = Some(hook.clone());
        Ok(hook)
    }

    /// Open a top-level suite
    ///
    /// # Errors
    ///
    /// - [`RecorderError::InvalidMetadata`] for an empty name
    /// - [`RecorderError::NotOpen`] or [`RecorderError::ClosedNode`] outside
    ///   the open state
    pub fn add_suite(&self, meta: NodeMeta) -> RecorderResult<SuiteHandle> {
        let mut node = self.node.lock();
        node.lifecycle.ensure_open(NodeKind::Report, &node.title)?;
        let suite = SuiteHandle::open(self.ctx.clone(), meta)?;
        node.suites.push(suite.clone());
        Ok(suite)
    }

    /// Close the report and produce the frozen tree.
    ///
    /// Session hooks that were never opened are emitted as empty hooks at the
    /// report's end time. A second call returns the same report without
    /// re-stamping `generation_time`.
    ///
    /// # Errors
    ///
    /// - [`RecorderError::NotOpen`] if [`Recorder::begin`] was never called
    /// - [`RecorderError::UnclosedChild`] if a session hook or top-level suite
    ///   is still open (fail-fast policy); the report stays open
    pub fn finish(&self) -> RecorderResult<Arc<ReportData>> {
        let mut guard = self.node.lock();
        let node = &mut *guard;
        if let Some(report) = &node.finished {
            return Ok(Arc::clone(report));
        }
        node.lifecycle.ensure_open(NodeKind::Report, &node.title)?;

        let at = self.ctx.now();
        let hooks = node.session_setup.iter().chain(node.session_teardown.iter());
        settle_children(&self.ctx, NodeKind::Report, &node.title, hooks, at)?;
        settle_children(&self.ctx, NodeKind::Report, &node.title, &node.suites, at)?;
        let end_time = node.lifecycle.close(NodeKind::Report, &node.title, at)?;
        let generation_time = self.ctx.now().max(end_time);

        let session_hook = |hook: &Option<HookHandle>| {
            hook.as_ref()
                .map_or_else(|| HookData::empty_at(end_time), HookHandle::snapshot)
        };
        let mut report = ReportData {
            title: node.title.clone(),
            start_time: node.lifecycle.start_time().unwrap_or(end_time),
            end_time,
            generation_time,
            info: node.info.clone(),
            stats: node.stats.clone(),
            test_session_setup: session_hook(&node.session_setup),
            test_session_teardown: session_hook(&node.session_teardown),
            suites: node.suites.iter().map(SuiteHandle::snapshot).collect(),
        };
        if self.ctx.config.auto_stats && report.stats.is_empty() {
            report.stats = report.stats_summary().to_rows();
        }

        info!(
            node = %node.id,
            title = %report.title,
            suites = report.all_suites().len(),
            tests = report.all_tests().len(),
            duration_ms = report.duration().num_milliseconds(),
            "report finished"
        );
        let report = Arc::new(report);
        node.finished = Some(Arc::clone(&report));
        Ok(report)
    }

    /// The frozen report, once [`Recorder::finish`] has succeeded
    #[must_use]
    pub fn finished(&self) -> Option<Arc<ReportData>> {
        self.node.with(|node| node.finished.clone())
    }
}
