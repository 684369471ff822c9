//! Node lifecycle and per-node locking.
//!
//! Every node (step, hook, test, suite, report) follows the same state machine:
//!
//! ```text
//!   Unopened ──open()──► Open ──close()──► Closed
//!                         │
//!                         └─ append / add_step / add_test / add_suite / hooks
//! ```
//!
//! Each node owns its own lock ([`Guarded`]). Locks are only ever taken top
//! down (a parent may lock its children while closing or snapshotting, a child
//! never locks its parent), so recording into a deeply nested step never
//! contends with a sibling subtree and lock order cannot cycle.

use crate::clock::{Clock, Timestamp};
use crate::config::{RecorderConfig, UnclosedPolicy};
use crate::result::{RecorderError, RecorderResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Kind of report node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A step inside a test or hook
    Step,
    /// A setup or teardown hook
    Hook,
    /// A test
    Test,
    /// A suite
    Suite,
    /// The report root
    Report,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Step => "step",
            Self::Hook => "hook",
            Self::Test => "test",
            Self::Suite => "suite",
            Self::Report => "report",
        })
    }
}

/// Position of a hook in the tree, named after its wire field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookRole {
    /// `suite_setup`
    SuiteSetup,
    /// `suite_teardown`
    SuiteTeardown,
    /// `test_session_setup`
    TestSessionSetup,
    /// `test_session_teardown`
    TestSessionTeardown,
}

impl HookRole {
    /// Wire field name of the hook
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuiteSetup => "suite_setup",
            Self::SuiteTeardown => "suite_teardown",
            Self::TestSessionSetup => "test_session_setup",
            Self::TestSessionTeardown => "test_session_teardown",
        }
    }
}

impl fmt::Display for HookRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    /// Created but not yet started
    Unopened,
    /// Recording
    Open,
    /// Frozen
    Closed,
}

/// Start/end bookkeeping shared by every node type.
#[derive(Debug, Clone)]
pub(crate) struct Lifecycle {
    state: NodeState,
    start_time: Option<Timestamp>,
    end_time: Option<Timestamp>,
}

impl Lifecycle {
    pub(crate) const fn unopened() -> Self {
        Self {
            state: NodeState::Unopened,
            start_time: None,
            end_time: None,
        }
    }

    pub(crate) const fn opened(at: Timestamp) -> Self {
        Self {
            state: NodeState::Open,
            start_time: Some(at),
            end_time: None,
        }
    }

    pub(crate) fn open(&mut self, kind: NodeKind, label: &str, at: Timestamp) -> RecorderResult<()> {
        match self.state {
            NodeState::Unopened => {
                self.state = NodeState::Open;
                self.start_time = Some(at);
                Ok(())
            }
            NodeState::Open => Err(RecorderError::AlreadyOpen {
                kind,
                label: label.to_string(),
            }),
            NodeState::Closed => Err(RecorderError::ClosedNode {
                kind,
                label: label.to_string(),
            }),
        }
    }

    pub(crate) fn ensure_open(&self, kind: NodeKind, label: &str) -> RecorderResult<()> {
        match self.state {
            NodeState::Open => Ok(()),
            NodeState::Unopened => Err(RecorderError::NotOpen {
                kind,
                label: label.to_string(),
            }),
            NodeState::Closed => Err(RecorderError::ClosedNode {
                kind,
                label: label.to_string(),
            }),
        }
    }

    /// Close at `at`, clamped so the end never precedes the start.
    pub(crate) fn close(
        &mut self,
        kind: NodeKind,
        label: &str,
        at: Timestamp,
    ) -> RecorderResult<Timestamp> {
        self.ensure_open(kind, label)?;
        let end = self.start_time.map_or(at, |start| at.max(start));
        self.state = NodeState::Closed;
        self.end_time = Some(end);
        Ok(end)
    }

    pub(crate) const fn state(&self) -> NodeState {
        self.state
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state == NodeState::Open
    }

    pub(crate) const fn start_time(&self) -> Option<Timestamp> {
        self.start_time
    }

    pub(crate) const fn end_time(&self) -> Option<Timestamp> {
        self.end_time
    }
}

/// Exclusive lock around one node's mutable fields.
#[derive(Debug)]
pub(crate) struct Guarded<T>(Arc<Mutex<T>>);

impl<T> Guarded<T> {
    pub(crate) fn new(value: T) -> Self {
        Self(Arc::new(Mutex::new(value)))
    }

    /// Lock the node. A panicking worker cannot leave an entry half-written,
    /// so a poisoned lock still guards consistent data.
    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock())
    }
}

impl<T> Clone for Guarded<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// Clock and configuration shared by all nodes of one report.
#[derive(Debug)]
pub(crate) struct Context {
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: RecorderConfig,
}

pub(crate) type SharedContext = Arc<Context>;

impl Context {
    pub(crate) fn shared(config: RecorderConfig, clock: Arc<dyn Clock>) -> SharedContext {
        Arc::new(Self { clock, config })
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }
}

/// A node that can be found open when its parent closes.
pub(crate) trait ChildNode {
    const KIND: NodeKind;

    fn label(&self) -> String;

    fn is_open(&self) -> bool;

    /// Close with a synthesized end time; no-op if already closed.
    fn force_close(&self, at: Timestamp);
}

/// Log a close synthesized by the lenient policy. Every node that
/// `force_close` actually closes reports here, descendants included.
pub(crate) fn warn_forced_close(kind: NodeKind, label: &str, at: Timestamp) {
    tracing::warn!(
        kind = %kind,
        node = label,
        end_time = %crate::clock::format_timestamp(&at),
        "auto-closing node left open"
    );
}

/// Apply the unclosed policy to `children` before their parent closes.
///
/// Under [`UnclosedPolicy::FailFast`] nothing is mutated and the first open
/// child is reported. Under [`UnclosedPolicy::Lenient`] open children and
/// their open descendants are closed at `at`.
pub(crate) fn settle_children<'a, C>(
    ctx: &Context,
    kind: NodeKind,
    label: &str,
    children: impl IntoIterator<Item = &'a C>,
    at: Timestamp,
) -> RecorderResult<()>
where
    C: ChildNode + 'a,
{
    for child in children {
        if !child.is_open() {
            continue;
        }
        match ctx.config.unclosed_policy {
            UnclosedPolicy::FailFast => {
                return Err(RecorderError::UnclosedChild {
                    kind,
                    label: label.to_string(),
                    child_kind: C::KIND,
                    child_label: child.label(),
                });
            }
            UnclosedPolicy::Lenient => child.force_close(at),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;

    fn ts(ms: i64) -> Timestamp {
        FakeClock::fixed(ms).now()
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn test_unopened_to_open_to_closed() {
            let mut lc = Lifecycle::unopened();
            assert_eq!(lc.state(), NodeState::Unopened);
            lc.open(NodeKind::Report, "r", ts(10)).unwrap();
            assert_eq!(lc.state(), NodeState::Open);
            let end = lc.close(NodeKind::Report, "r", ts(20)).unwrap();
            assert_eq!(end, ts(20));
            assert_eq!(lc.state(), NodeState::Closed);
        }

        #[test]
        fn test_open_twice_fails() {
            let mut lc = Lifecycle::opened(ts(0));
            let err = lc.open(NodeKind::Report, "r", ts(1)).unwrap_err();
            assert!(matches!(err, RecorderError::AlreadyOpen { .. }));
        }

        #[test]
        fn test_close_unopened_fails() {
            let mut lc = Lifecycle::unopened();
            let err = lc.close(NodeKind::Report, "r", ts(1)).unwrap_err();
            assert!(matches!(err, RecorderError::NotOpen { .. }));
        }

        #[test]
        fn test_close_twice_fails() {
            let mut lc = Lifecycle::opened(ts(0));
            lc.close(NodeKind::Step, "s", ts(1)).unwrap();
            let err = lc.close(NodeKind::Step, "s", ts(2)).unwrap_err();
            assert!(matches!(err, RecorderError::ClosedNode { .. }));
            assert_eq!(lc.end_time(), Some(ts(1)));
        }

        #[test]
        fn test_end_clamped_to_start() {
            let mut lc = Lifecycle::opened(ts(100));
            let end = lc.close(NodeKind::Step, "s", ts(50)).unwrap();
            assert_eq!(end, ts(100));
            assert_eq!(lc.start_time(), lc.end_time());
        }
    }

    mod guarded_tests {
        use super::*;

        #[test]
        fn test_clones_share_state() {
            let a = Guarded::new(Vec::<u32>::new());
            let b = a.clone();
            a.with(|v| v.push(1));
            b.with(|v| v.push(2));
            assert_eq!(*a.lock(), vec![1, 2]);
        }

        #[test]
        fn test_poisoned_lock_is_recovered() {
            let guarded = Guarded::new(0_u32);
            let clone = guarded.clone();
            let _ = std::thread::spawn(move || {
                let _guard = clone.lock();
                panic!("worker crashed");
            })
            .join();
            guarded.with(|v| *v += 1);
            assert_eq!(*guarded.lock(), 1);
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(NodeKind::Suite.to_string(), "suite");
        assert_eq!(HookRole::TestSessionTeardown.to_string(), "test_session_teardown");
    }
}
