//! Step tracker.

use crate::clock::Timestamp;
use crate::entry::{LogLevel, StepEntry};
use crate::node::{
    warn_forced_close, ChildNode, Guarded, Lifecycle, NodeKind, NodeState, SharedContext,
};
use crate::result::RecorderResult;
use crate::schema::StepData;
use tracing::{debug, trace};
use uuid::Uuid;

#[derive(Debug)]
struct StepNode {
    id: Uuid,
    description: String,
    lifecycle: Lifecycle,
    entries: Vec<StepEntry>,
}

/// Handle to an open step.
///
/// Cloning the handle shares the step; appends from several clones are
/// serialized by the step's lock. Steps hold entries only and cannot nest.
#[derive(Debug, Clone)]
pub struct StepHandle {
    node: Guarded<StepNode>,
    ctx: SharedContext,
}

impl StepHandle {
    pub(crate) fn open(ctx: SharedContext, description: impl Into<String>) -> Self {
        let node = StepNode {
            id: Uuid::new_v4(),
            description: description.into(),
            lifecycle: Lifecycle::opened(ctx.now()),
            entries: Vec::new(),
        };
        debug!(kind = %NodeKind::Step, node = %node.id, description = %node.description, "opened");
        Self {
            node: Guarded::new(node),
            ctx,
        }
    }

    /// Step description
    #[must_use]
    pub fn description(&self) -> String {
        self.node.lock().description.clone()
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> NodeState {
        self.node.lock().lifecycle.state()
    }

    /// Number of entries appended so far
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.node.lock().entries.len()
    }

    /// Append an entry
    ///
    /// # Errors
    ///
    /// - [`crate::RecorderError::InvalidEntry`] if a required field is empty;
    ///   nothing is stored
    /// - [`crate::RecorderError::ClosedNode`] if the step is closed
    pub fn append(&self, entry: StepEntry) -> RecorderResult<()> {
        entry.validate()?;
        let mut node = self.node.lock();
        node.lifecycle.ensure_open(NodeKind::Step, &node.description)?;
        trace!(node = %node.id, entry = entry.kind(), "append");
        node.entries.push(entry);
        Ok(())
    }

    /// Append an entry given as loosely-typed JSON
    ///
    /// # Errors
    ///
    /// Same as [`StepHandle::append`], plus `InvalidEntry` for data that does
    /// not match any entry variant
    pub fn append_json(&self, value: serde_json::Value) -> RecorderResult<()> {
        self.append(StepEntry::from_json(value)?)
    }

    /// Log a message stamped with the current time
    ///
    /// # Errors
    ///
    /// See [`StepHandle::append`]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> RecorderResult<()> {
        self.append(StepEntry::log(level, message, self.ctx.now()))
    }

    /// Record a check
    ///
    /// # Errors
    ///
    /// See [`StepHandle::append`]
    pub fn check(&self, description: impl Into<String>, outcome: bool) -> RecorderResult<()> {
        self.append(StepEntry::check(description, outcome))
    }

    /// Record a check with details
    ///
    /// # Errors
    ///
    /// See [`StepHandle::append`]
    pub fn check_with_details(
        &self,
        description: impl Into<String>,
        outcome: bool,
        details: impl Into<String>,
    ) -> RecorderResult<()> {
        self.append(StepEntry::check_with_details(description, outcome, details))
    }

    /// Reference an attachment
    ///
    /// # Errors
    ///
    /// See [`StepHandle::append`]
    pub fn attach(
        &self,
        filename: impl Into<String>,
        description: impl Into<String>,
    ) -> RecorderResult<()> {
        self.append(StepEntry::attachment(filename, description))
    }

    /// Record a link
    ///
    /// # Errors
    ///
    /// See [`StepHandle::append`]
    pub fn link(&self, url: impl Into<String>, description: impl Into<String>) -> RecorderResult<()> {
        self.append(StepEntry::url(url, description))
    }

    /// Close the step and freeze its entries
    ///
    /// # Errors
    ///
    /// Returns [`crate::RecorderError::ClosedNode`] if already closed
    pub fn close(&self) -> RecorderResult<Timestamp> {
        let at = self.ctx.now();
        let mut guard = self.node.lock();
        let node = &mut *guard;
        let end = node.lifecycle.close(NodeKind::Step, &node.description, at)?;
        debug!(kind = %NodeKind::Step, node = %node.id, entries = node.entries.len(), "closed");
        Ok(end)
    }

    /// AND of every check outcome, true when there is no check
    pub(crate) fn checks_passed(&self) -> bool {
        self.node
            .lock()
            .entries
            .iter()
            .filter_map(StepEntry::check_outcome)
            .all(|outcome| outcome)
    }

    /// Current data of the step
    #[must_use]
    pub fn snapshot(&self) -> StepData {
        let node = self.node.lock();
        StepData {
            description: node.description.clone(),
            start_time: node.lifecycle.start_time().unwrap_or_default(),
            end_time: node.lifecycle.end_time(),
            entries: node.entries.clone(),
        }
    }
}

impl ChildNode for StepHandle {
    const KIND: NodeKind = NodeKind::Step;

    fn label(&self) -> String {
        self.description()
    }

    fn is_open(&self) -> bool {
        self.node.lock().lifecycle.is_open()
    }

    fn force_close(&self, at: Timestamp) {
        let mut guard = self.node.lock();
        let node = &mut *guard;
        if node.lifecycle.is_open() {
            warn_forced_close(NodeKind::Step, &node.description, at);
            let _ = node.lifecycle.close(NodeKind::Step, &node.description, at);
        }
    }
}
