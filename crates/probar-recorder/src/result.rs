//! Result and error types for the recorder.

use crate::node::{HookRole, NodeKind};
use thiserror::Error;

/// Result type for recorder operations
pub type RecorderResult<T> = Result<T, RecorderError>;

/// Errors raised synchronously to the caller at the point of misuse.
///
/// None of these are retried by the recorder. A failed call leaves the node
/// exactly as it was before the call.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// `open`/`begin` called on a node that is already open
    #[error("{kind} '{label}' is already open")]
    AlreadyOpen {
        /// Kind of node
        kind: NodeKind,
        /// Node label (name, description or hook role)
        label: String,
    },

    /// Operation on a node that was never opened
    #[error("{kind} '{label}' was never opened")]
    NotOpen {
        /// Kind of node
        kind: NodeKind,
        /// Node label
        label: String,
    },

    /// Mutation of a node that has already been closed
    #[error("{kind} '{label}' is closed")]
    ClosedNode {
        /// Kind of node
        kind: NodeKind,
        /// Node label
        label: String,
    },

    /// A node was closed while one of its children is still open
    #[error("cannot close {kind} '{label}': {child_kind} '{child_label}' is still open")]
    UnclosedChild {
        /// Kind of the node being closed
        kind: NodeKind,
        /// Label of the node being closed
        label: String,
        /// Kind of the open child
        child_kind: NodeKind,
        /// Label of the open child
        child_label: String,
    },

    /// A setup or teardown hook was requested twice
    #[error("{role} hook of '{owner}' has already been set")]
    DuplicateHook {
        /// Owner label (suite name or report title)
        owner: String,
        /// Which hook
        role: HookRole,
    },

    /// Malformed step entry
    #[error("Invalid step entry: {message}")]
    InvalidEntry {
        /// Error message
        message: String,
    },

    /// Malformed test/suite metadata
    #[error("Invalid metadata: {message}")]
    InvalidMetadata {
        /// Error message
        message: String,
    },

    /// Lookup of a suite or test path that does not exist
    #[error("Cannot find {kind} '{path}'")]
    NodeNotFound {
        /// Kind of node searched for
        kind: NodeKind,
        /// Dotted hierarchy path
        path: String,
    },

    /// A document that does not match the report wire schema
    #[error("Invalid report: {message}")]
    InvalidReport {
        /// Error message
        message: String,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RecorderError {
    /// Create an invalid entry error
    #[must_use]
    pub fn invalid_entry(message: impl Into<String>) -> Self {
        Self::InvalidEntry {
            message: message.into(),
        }
    }

    /// Create an invalid metadata error
    #[must_use]
    pub fn invalid_metadata(message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            message: message.into(),
        }
    }

    /// Kind of node the error is about, if any
    #[must_use]
    pub const fn node_kind(&self) -> Option<NodeKind> {
        match self {
            Self::AlreadyOpen { kind, .. }
            | Self::NotOpen { kind, .. }
            | Self::ClosedNode { kind, .. }
            | Self::UnclosedChild { kind, .. }
            | Self::NodeNotFound { kind, .. } => Some(*kind),
            Self::DuplicateHook { .. } => Some(NodeKind::Hook),
            Self::InvalidEntry { .. } => Some(NodeKind::Step),
            Self::InvalidMetadata { .. } | Self::InvalidReport { .. } | Self::Json(_) => None,
        }
    }
}
