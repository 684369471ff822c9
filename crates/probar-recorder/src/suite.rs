//! Suite tracker.
//!
//! A suite owns its tests, child suites and optional setup/teardown hooks.
//! Children are only ever created through their parent, so the tree cannot
//! contain a cycle and every child has exactly one owner.

use crate::clock::Timestamp;
use crate::hook::HookHandle;
use crate::node::{
    settle_children, warn_forced_close, ChildNode, Guarded, HookRole, Lifecycle, NodeKind,
    NodeState, SharedContext,
};
use crate::result::{RecorderError, RecorderResult};
use crate::schema::{NodeMeta, SuiteData};
use crate::test_case::TestHandle;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug)]
struct SuiteNode {
    id: Uuid,
    meta: NodeMeta,
    lifecycle: Lifecycle,
    tests: Vec<TestHandle>,
    suites: Vec<SuiteHandle>,
    setup: Option<HookHandle>,
    teardown: Option<HookHandle>,
}

impl SuiteNode {
    fn hooks(&self) -> impl Iterator<Item = &HookHandle> {
        self.setup.iter().chain(self.teardown.iter())
    }

    /// Check or settle every direct child before the suite closes at `at`
    fn settle(&self, ctx: &crate::node::Context, at: Timestamp) -> RecorderResult<()> {
        let name = &self.meta.name;
        settle_children(ctx, NodeKind::Suite, name, self.hooks(), at)?;
        settle_children(ctx, NodeKind::Suite, name, &self.tests, at)?;
        settle_children(ctx, NodeKind::Suite, name, &self.suites, at)
    }
}

/// Handle to an open suite.
#[derive(Debug, Clone)]
pub struct SuiteHandle {
    node: Guarded<SuiteNode>,
    ctx: SharedContext,
}

impl SuiteHandle {
    pub(crate) fn open(ctx: SharedContext, meta: NodeMeta) -> RecorderResult<Self> {
        meta.validate()?;
        let node = SuiteNode {
            id: Uuid::new_v4(),
            meta,
            lifecycle: Lifecycle::opened(ctx.now()),
            tests: Vec::new(),
            suites: Vec::new(),
            setup: None,
            teardown: None,
        };
        debug!(kind = %NodeKind::Suite, node = %node.id, name = %node.meta.name, "opened");
        Ok(Self {
            node: Guarded::new(node),
            ctx,
        })
    }

    /// Suite name
    #[must_use]
    pub fn name(&self) -> String {
        self.node.lock().meta.name.clone()
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> NodeState {
        self.node.lock().lifecycle.state()
    }

    /// Open a test at the end of this suite's test list
    ///
    /// # Errors
    ///
    /// - [`RecorderError::InvalidMetadata`] for an empty name
    /// - [`RecorderError::ClosedNode`] if the suite is closed
    pub fn add_test(&self, meta: NodeMeta) -> RecorderResult<TestHandle> {
        let mut node = self.node.lock();
        node.lifecycle.ensure_open(NodeKind::Suite, &node.meta.name)?;
        let test = TestHandle::open(self.ctx.clone(), meta)?;
        node.tests.push(test.clone());
        Ok(test)
    }

    /// Open a child suite at the end of this suite's child list
    ///
    /// # Errors
    ///
    /// - [`RecorderError::InvalidMetadata`] for an empty name
    /// - [`RecorderError::ClosedNode`] if the suite is closed
    pub fn add_suite(&self, meta: NodeMeta) -> RecorderResult<Self> {
        let mut node = self.node.lock();
        node.lifecycle.ensure_open(NodeKind::Suite, &node.meta.name)?;
        let suite = Self::open(self.ctx.clone(), meta)?;
        node.suites.push(suite.clone());
        Ok(suite)
    }

    /// Open the suite's setup hook
    ///
    /// # Errors
    ///
    /// - [`RecorderError::DuplicateHook`] on a second call
    /// - [`RecorderError::ClosedNode`] if the suite is closed
    pub fn setup_hook(&self) -> RecorderResult<HookHandle> {
        self.open_hook(HookRole::SuiteSetup)
    }

    /// Open the suite's teardown hook
    ///
    /// # Errors
    ///
    /// - [`RecorderError::DuplicateHook`] on a second call
    /// - [`RecorderError::ClosedNode`] if the suite is closed
    pub fn teardown_hook(&self) -> RecorderResult<HookHandle> {
        self.open_hook(HookRole::SuiteTeardown)
    }

    fn open_hook(&self, role: HookRole) -> RecorderResult<HookHandle> {
        let mut guard = self.node.lock();
        let node = &mut *guard;
        node.lifecycle.ensure_open(NodeKind::Suite, &node.meta.name)?;
        let slot = match role {
            HookRole::SuiteSetup => &mut node.setup,
            _ => &mut node.teardown,
        };
        if slot.is_some() {
            return Err(RecorderError::DuplicateHook {
                owner: node.meta.name.clone(),
                role,
            });
        }
        let hook = HookHandle::open(self.ctx.clone(), role);
        *slot = Some(hook.clone());
        Ok(hook)
    }

    /// Close the suite.
    ///
    /// Every test, child suite and hook must be closed first (fail-fast
    /// policy); under the lenient policy open descendants are closed at the
    /// suite's close time.
    ///
    /// # Errors
    ///
    /// - [`RecorderError::UnclosedChild`] naming the first open child
    /// - [`RecorderError::ClosedNode`] if already closed
    pub fn close(&self) -> RecorderResult<Timestamp> {
        let at = self.ctx.now();
        let mut guard = self.node.lock();
        let node = &mut *guard;
        node.lifecycle.ensure_open(NodeKind::Suite, &node.meta.name)?;
        node.settle(&self.ctx, at)?;
        let end = node.lifecycle.close(NodeKind::Suite, &node.meta.name, at)?;
        debug!(
            kind = %NodeKind::Suite,
            node = %node.id,
            name = %node.meta.name,
            tests = node.tests.len(),
            suites = node.suites.len(),
            "closed"
        );
        Ok(end)
    }

    /// Current data of the suite and its whole subtree
    #[must_use]
    pub fn snapshot(&self) -> SuiteData {
        let node = self.node.lock();
        SuiteData {
            meta: node.meta.clone(),
            tests: node.tests.iter().map(TestHandle::snapshot).collect(),
            suites: node.suites.iter().map(Self::snapshot).collect(),
            suite_setup: node.setup.as_ref().map(HookHandle::snapshot),
            suite_teardown: node.teardown.as_ref().map(HookHandle::snapshot),
        }
    }
}

impl ChildNode for SuiteHandle {
    const KIND: NodeKind = NodeKind::Suite;

    fn label(&self) -> String {
        self.name()
    }

    fn is_open(&self) -> bool {
        self.node.lock().lifecycle.is_open()
    }

    fn force_close(&self, at: Timestamp) {
        let mut guard = self.node.lock();
        let node = &mut *guard;
        if !node.lifecycle.is_open() {
            return;
        }
        warn_forced_close(NodeKind::Suite, &node.meta.name, at);
        for hook in node.hooks() {
            hook.force_close(at);
        }
        for test in &node.tests {
            test.force_close(at);
        }
        for suite in &node.suites {
            suite.force_close(at);
        }
        let _ = node.lifecycle.close(NodeKind::Suite, &node.meta.name, at);
    }
}
