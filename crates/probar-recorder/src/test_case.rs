//! Test tracker.
//!
//! The recorder never infers a test's status from its checks: status and
//! status details are whatever the harness passes to [`TestHandle::close`].

use crate::clock::Timestamp;
use crate::node::{
    settle_children, warn_forced_close, ChildNode, Guarded, Lifecycle, NodeKind, NodeState,
    SharedContext,
};
use crate::result::{RecorderError, RecorderResult};
use crate::schema::{status, NodeMeta, TestData};
use crate::step::StepHandle;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug)]
struct TestNode {
    id: Uuid,
    meta: NodeMeta,
    lifecycle: Lifecycle,
    steps: Vec<StepHandle>,
    status: Option<String>,
    status_details: Option<String>,
}

/// Handle to an open test.
#[derive(Debug, Clone)]
pub struct TestHandle {
    node: Guarded<TestNode>,
    ctx: SharedContext,
}

impl TestHandle {
    pub(crate) fn open(ctx: SharedContext, meta: NodeMeta) -> RecorderResult<Self> {
        meta.validate()?;
        let node = TestNode {
            id: Uuid::new_v4(),
            meta,
            lifecycle: Lifecycle::opened(ctx.now()),
            steps: Vec::new(),
            status: None,
            status_details: None,
        };
        debug!(kind = %NodeKind::Test, node = %node.id, name = %node.meta.name, "opened");
        Ok(Self {
            node: Guarded::new(node),
            ctx,
        })
    }

    /// Test name
    #[must_use]
    pub fn name(&self) -> String {
        self.node.lock().meta.name.clone()
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> NodeState {
        self.node.lock().lifecycle.state()
    }

    /// Open a step in this test
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::ClosedNode`] if the test is closed
    pub fn add_step(&self, description: impl Into<String>) -> RecorderResult<StepHandle> {
        let mut node = self.node.lock();
        node.lifecycle.ensure_open(NodeKind::Test, &node.meta.name)?;
        let step = StepHandle::open(self.ctx.clone(), description);
        node.steps.push(step.clone());
        Ok(step)
    }

    /// Close the test with a caller-defined status
    ///
    /// # Errors
    ///
    /// - [`RecorderError::InvalidMetadata`] if `status` is empty
    /// - [`RecorderError::UnclosedChild`] if a step is still open
    ///   (fail-fast policy)
    /// - [`RecorderError::ClosedNode`] if already closed
    pub fn close(
        &self,
        status: impl Into<String>,
        status_details: Option<String>,
    ) -> RecorderResult<Timestamp> {
        let status = status.into();
        let at = self.ctx.now();
        let mut guard = self.node.lock();
        let node = &mut *guard;
        node.lifecycle.ensure_open(NodeKind::Test, &node.meta.name)?;
        if status.trim().is_empty() {
            return Err(RecorderError::invalid_metadata("test status must not be empty"));
        }
        settle_children(&self.ctx, NodeKind::Test, &node.meta.name, &node.steps, at)?;
        let end = node.lifecycle.close(NodeKind::Test, &node.meta.name, at)?;
        debug!(kind = %NodeKind::Test, node = %node.id, name = %node.meta.name, status = %status, "closed");
        node.status = Some(status);
        node.status_details = status_details;
        Ok(end)
    }

    /// Close with status `passed`
    ///
    /// # Errors
    ///
    /// See [`TestHandle::close`]
    pub fn pass(&self) -> RecorderResult<Timestamp> {
        self.close(status::PASSED, None)
    }

    /// Close with status `failed` and an explanation
    ///
    /// # Errors
    ///
    /// See [`TestHandle::close`]
    pub fn fail(&self, details: impl Into<String>) -> RecorderResult<Timestamp> {
        self.close(status::FAILED, Some(details.into()))
    }

    /// Close with status `skipped` and the reason
    ///
    /// # Errors
    ///
    /// See [`TestHandle::close`]
    pub fn skip(&self, reason: impl Into<String>) -> RecorderResult<Timestamp> {
        self.close(status::SKIPPED, Some(reason.into()))
    }

    /// Current data of the test
    #[must_use]
    pub fn snapshot(&self) -> TestData {
        let node = self.node.lock();
        TestData {
            meta: node.meta.clone(),
            start_time: node.lifecycle.start_time().unwrap_or_default(),
            end_time: node.lifecycle.end_time(),
            steps: node.steps.iter().map(StepHandle::snapshot).collect(),
            status: node.status.clone(),
            status_details: node.status_details.clone(),
        }
    }
}

impl ChildNode for TestHandle {
    const KIND: NodeKind = NodeKind::Test;

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
        warn_forced_close(NodeKind::Test, &node.meta.name, at);
        for step in &node.steps {
            step.force_close(at);
        }
        let _ = node.lifecycle.close(NodeKind::Test, &node.meta.name, at);
        node.status = Some(self.ctx.config.incomplete_status.clone());
        node.status_details = Some("test was still running when its parent was closed".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::config::RecorderConfig;
    use crate::node::Context;
    use std::sync::Arc;

    fn open_test(config: RecorderConfig, meta: NodeMeta) -> RecorderResult<TestHandle> {
        let ctx = Context::shared(config, Arc::new(FakeClock::ticking(1_000, 10)));
        TestHandle::open(ctx, meta)
    }

    mod open_tests {
        use super::*;

        #[test]
        fn test_metadata_is_kept() {
            let meta = NodeMeta::new("login_success")
                .with_description("valid credentials")
                .with_tag("smoke")
                .with_property("priority", 1)
                .with_link("JIRA-1", "https://jira.example.com/JIRA-1");
            let test = open_test(RecorderConfig::default(), meta.clone()).unwrap();
            let data = test.snapshot();
            assert_eq!(data.meta, meta);
            assert!(data.end_time.is_none());
            assert!(data.status.is_none());
        }

        #[test]
        fn test_empty_name_rejected() {
            let err = open_test(RecorderConfig::default(), NodeMeta::new("")).unwrap_err();
            assert!(matches!(err, RecorderError::InvalidMetadata { .. }));
        }
    }

    mod close_tests {
        use super::*;

        #[test]
        fn test_status_is_caller_supplied() {
            let test = open_test(RecorderConfig::default(), NodeMeta::new("t")).unwrap();
            let step = test.add_step("s").unwrap();
            step.check("failing check", false).unwrap();
            step.close().unwrap();
            test.close("passed", Some("harness decided".to_string())).unwrap();
            let data = test.snapshot();
            assert_eq!(data.status.as_deref(), Some("passed"));
            assert_eq!(data.status_details.as_deref(), Some("harness decided"));
        }

        #[test]
        fn test_end_after_start() {
            let test = open_test(RecorderConfig::default(), NodeMeta::new("t")).unwrap();
            test.pass().unwrap();
            let data = test.snapshot();
            assert!(data.end_time.unwrap() >= data.start_time);
        }

        #[test]
        fn test_empty_status_rejected() {
            let test = open_test(RecorderConfig::default(), NodeMeta::new("t")).unwrap();
            let err = test.close(" ", None).unwrap_err();
            assert!(matches!(err, RecorderError::InvalidMetadata { .. }));
            assert_eq!(test.state(), NodeState::Open);
        }

        #[test]
        fn test_closed_state_reported_before_status() {
            let test = open_test(RecorderConfig::default(), NodeMeta::new("t")).unwrap();
            test.pass().unwrap();
            assert!(matches!(
                test.close(" ", None),
                Err(RecorderError::ClosedNode { kind: NodeKind::Test, .. })
            ));
        }

        #[test]
        fn test_open_step_fails_fast() {
            let test = open_test(RecorderConfig::default(), NodeMeta::new("t")).unwrap();
            let _step = test.add_step("never closed").unwrap();
            let err = test.fail("boom").unwrap_err();
            assert!(matches!(err, RecorderError::UnclosedChild { kind: NodeKind::Test, .. }));
            assert_eq!(test.state(), NodeState::Open);
        }

        #[test]
        fn test_open_step_auto_closed_when_lenient() {
            let test = open_test(RecorderConfig::default().lenient(), NodeMeta::new("t")).unwrap();
            let step = test.add_step("never closed").unwrap();
            let end = test.skip("no backend").unwrap();
            assert_eq!(step.snapshot().end_time, Some(end));
            assert_eq!(test.snapshot().status.as_deref(), Some("skipped"));
        }

        #[test]
        fn test_close_twice_fails() {
            let test = open_test(RecorderConfig::default(), NodeMeta::new("t")).unwrap();
            test.pass().unwrap();
            assert!(matches!(test.fail("again"), Err(RecorderError::ClosedNode { .. })));
            assert_eq!(test.snapshot().status.as_deref(), Some("passed"));
        }

        #[test]
        fn test_add_step_after_close_fails() {
            let test = open_test(RecorderConfig::default(), NodeMeta::new("t")).unwrap();
            test.pass().unwrap();
            assert!(matches!(test.add_step("late"), Err(RecorderError::ClosedNode { .. })));
        }
    }

    #[test]
    fn test_force_close_marks_incomplete() {
        let config = RecorderConfig::default().with_incomplete_status("interrupted");
        let test = open_test(config, NodeMeta::new("t")).unwrap();
        let step = test.add_step("s").unwrap();
        test.force_close(chrono::DateTime::default());
        let data = test.snapshot();
        assert_eq!(data.status.as_deref(), Some("interrupted"));
        assert!(data.status_details.is_some());
        assert_eq!(step.state(), NodeState::Closed);
        assert_eq!(data.end_time, Some(data.start_time));
    }
}
