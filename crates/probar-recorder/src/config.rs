//! Recorder configuration.

use serde::{Deserialize, Serialize};

/// Status stamped on tests that were still open when the lenient policy
/// closed them
pub const DEFAULT_INCOMPLETE_STATUS: &str = "incomplete";

/// What happens when a parent closes (or the report finishes) while a
/// descendant is still open.
///
/// The policy is fixed per recorder; both behaviours never mix in one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnclosedPolicy {
    /// Refuse the close with [`crate::RecorderError::UnclosedChild`]
    #[default]
    FailFast,
    /// Close open descendants at the parent's close time and mark them
    /// incomplete
    Lenient,
}

/// Configuration shared by every node of one report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Handling of nodes left open
    pub unclosed_policy: UnclosedPolicy,
    /// Status given to tests closed by the lenient policy
    pub incomplete_status: String,
    /// Fill empty stats rows from the computed summary at `finish()`
    pub auto_stats: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            unclosed_policy: UnclosedPolicy::FailFast,
            incomplete_status: DEFAULT_INCOMPLETE_STATUS.to_string(),
            auto_stats: false,
        }
    }
}

impl RecorderConfig {
    /// Create a new config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on unclosed nodes (default)
    #[must_use]
    pub fn fail_fast(mut self) -> Self {
        self.unclosed_policy = UnclosedPolicy::FailFast;
        self
    }

    /// Auto-close unclosed nodes and mark them incomplete
    #[must_use]
    pub fn lenient(mut self) -> Self {
        self.unclosed_policy = UnclosedPolicy::Lenient;
        self
    }

    /// Set the status used for auto-closed tests
    #[must_use]
    pub fn with_incomplete_status(mut self, status: impl Into<String>) -> Self {
        self.incomplete_status = status.into();
        self
    }

    /// Enable or disable computed stats rows
    #[must_use]
    pub fn with_auto_stats(mut self, enabled: bool) -> Self {
        self.auto_stats = enabled;
        self
    }

    /// Whether the lenient policy is active
    #[must_use]
    pub fn is_lenient(&self) -> bool {
        self.unclosed_policy == UnclosedPolicy::Lenient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fail_fast() {
        let config = RecorderConfig::default();
        assert_eq!(config.unclosed_policy, UnclosedPolicy::FailFast);
        assert_eq!(config.incomplete_status, "incomplete");
        assert!(!config.auto_stats);
    }

    #[test]
    fn test_builders() {
        let config = RecorderConfig::new()
            .lenient()
            .with_incomplete_status("interrupted")
            .with_auto_stats(true);
        assert!(config.is_lenient());
        assert_eq!(config.incomplete_status, "interrupted");
        assert!(config.auto_stats);
        assert!(!config.fail_fast().is_lenient());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RecorderConfig =
            serde_json::from_str(r#"{"unclosed_policy": "lenient"}"#).unwrap();
        assert!(config.is_lenient());
        assert_eq!(config.incomplete_status, DEFAULT_INCOMPLETE_STATUS);
    }
}
