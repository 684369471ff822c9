//! Hook tracker: suite and session setup/teardown.
//!
//! A hook's outcome is either given at close time or derived from its steps:
//! the AND of every check entry, vacuously true when there is none.

use crate::clock::Timestamp;
use crate::node::{
    settle_children, warn_forced_close, ChildNode, Guarded, HookRole, Lifecycle, NodeKind,
    NodeState, SharedContext,
};
use crate::result::RecorderResult;
use crate::schema::HookData;
use crate::step::StepHandle;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug)]
struct HookNode {
    id: Uuid,
    role: HookRole,
    lifecycle: Lifecycle,
    outcome: Option<bool>,
    steps: Vec<StepHandle>,
}

/// Handle to a setup or teardown hook.
#[derive(Debug, Clone)]
pub struct HookHandle {
    node: Guarded<HookNode>,
    ctx: SharedContext,
}

fn derive_outcome(steps: &[StepHandle]) -> bool {
    steps.iter().all(StepHandle::checks_passed)
}

impl HookHandle {
    pub(crate) fn open(ctx: SharedContext, role: HookRole) -> Self {
        let node = HookNode {
            id: Uuid::new_v4(),
            role,
            lifecycle: Lifecycle::opened(ctx.now()),
            outcome: None,
            steps: Vec::new(),
        };
        debug!(kind = %NodeKind::Hook, node = %node.id, role = %role, "opened");
        Self {
            node: Guarded::new(node),
            ctx,
        }
    }

    /// Position of the hook in the tree
    #[must_use]
    pub fn role(&self) -> HookRole {
        self.node.lock().role
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> NodeState {
        self.node.lock().lifecycle.state()
    }

    /// Open a step in this hook
    ///
    /// # Errors
    ///
    /// Returns [`crate::RecorderError::ClosedNode`] if the hook is closed
    pub fn add_step(&self, description: impl Into<String>) -> RecorderResult<StepHandle> {
        let mut node = self.node.lock();
        node.lifecycle.ensure_open(NodeKind::Hook, node.role.as_str())?;
        let step = StepHandle::open(self.ctx.clone(), description);
        node.steps.push(step.clone());
        Ok(step)
    }

    /// Close the hook.
    ///
    /// With `Some(outcome)` the given outcome is recorded; with `None` it is
    /// derived from the check entries of the hook's steps. Returns the
    /// recorded outcome.
    ///
    /// # Errors
    ///
    /// - [`crate::RecorderError::UnclosedChild`] if a step is still open
    ///   (fail-fast policy)
    /// - [`crate::RecorderError::ClosedNode`] if already closed
    pub fn close(&self, outcome: Option<bool>) -> RecorderResult<bool> {
        let at = self.ctx.now();
        let mut guard = self.node.lock();
        let node = &mut *guard;
        let label = node.role.as_str();
        node.lifecycle.ensure_open(NodeKind::Hook, label)?;
        settle_children(&self.ctx, NodeKind::Hook, label, &node.steps, at)?;
        node.lifecycle.close(NodeKind::Hook, label, at)?;
        let outcome = outcome.unwrap_or_else(|| derive_outcome(&node.steps));
        node.outcome = Some(outcome);
        debug!(kind = %NodeKind::Hook, node = %node.id, role = %node.role, outcome, "closed");
        Ok(outcome)
    }

    /// Current data of the hook. An open hook reports its provisional
    /// derived outcome.
    #[must_use]
    pub fn snapshot(&self) -> HookData {
        let node = self.node.lock();
        HookData {
            start_time: node.lifecycle.start_time().unwrap_or_default(),
            end_time: node.lifecycle.end_time(),
            outcome: node.outcome.unwrap_or_else(|| derive_outcome(&node.steps)),
            steps: node.steps.iter().map(StepHandle::snapshot).collect(),
        }
    }
}

impl ChildNode for HookHandle {
    const KIND: NodeKind = NodeKind::Hook;

    fn label(&self) -> String {
        self.role().to_string()
    }

    fn is_open(&self) -> bool {
        self.node.lock().lifecycle.is_open()
    }

    /// An interrupted hook did not complete, so its outcome is false.
    fn force_close(&self, at: Timestamp) {
        let mut guard = self.node.lock();
        let node = &mut *guard;
        if !node.lifecycle.is_open() {
            return;
        }
        warn_forced_close(NodeKind::Hook, node.role.as_str(), at);
        for step in &node.steps {
            step.force_close(at);
        }
        let _ = node.lifecycle.close(NodeKind::Hook, node.role.as_str(), at);
        node.outcome = Some(false);
    }
}
