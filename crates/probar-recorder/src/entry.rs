//! Step entries: the evidence recorded inside a step.
//!
//! Four variants, discriminated on the wire by the `type` field:
//!
//! ```text
//! {"type": "log",        "message", "level", "time"}
//! {"type": "check",      "description", "outcome", "details"}
//! {"type": "attachment", "filename", "description"}
//! {"type": "url",        "url", "description"}
//! ```

use crate::clock::Timestamp;
use crate::result::{RecorderError, RecorderResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug output
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error; makes the enclosing step unsuccessful
    Error,
}

impl LogLevel {
    /// Wire name of the level
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of evidence appended to a step.
///
/// Entries are immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepEntry {
    /// A log line
    Log {
        /// Log message
        message: String,
        /// Log level
        level: LogLevel,
        /// When the line was logged
        #[serde(with = "crate::clock::timestamp")]
        time: Timestamp,
    },
    /// An assertion and its outcome
    Check {
        /// What was checked
        description: String,
        /// Whether the check passed
        outcome: bool,
        /// Extra information (usually the actual value)
        details: Option<String>,
    },
    /// Reference to a file attached to the report
    Attachment {
        /// Attachment file name, relative to the report
        filename: String,
        /// Attachment description
        description: String,
    },
    /// A link
    Url {
        /// Target URL
        url: String,
        /// Link description
        description: String,
    },
}

impl StepEntry {
    /// Create a log entry
    #[must_use]
    pub fn log(level: LogLevel, message: impl Into<String>, time: Timestamp) -> Self {
        Self::Log {
            message: message.into(),
            level,
            time,
        }
    }

    /// Create a check entry without details
    #[must_use]
    pub fn check(description: impl Into<String>, outcome: bool) -> Self {
        Self::Check {
            description: description.into(),
            outcome,
            details: None,
        }
    }

    /// Create a check entry with details
    #[must_use]
    pub fn check_with_details(
        description: impl Into<String>,
        outcome: bool,
        details: impl Into<String>,
    ) -> Self {
        Self::Check {
            description: description.into(),
            outcome,
            details: Some(details.into()),
        }
    }

    /// Create an attachment entry
    #[must_use]
    pub fn attachment(filename: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Attachment {
            filename: filename.into(),
            description: description.into(),
        }
    }

    /// Create a url entry
    #[must_use]
    pub fn url(url: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Url {
            url: url.into(),
            description: description.into(),
        }
    }

    /// Build an entry from loosely-typed data, e.g. forwarded by a harness
    /// written in another language.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::InvalidEntry`] if the `type` discriminant is
    /// unknown, a field is missing or mistyped (a check without a boolean
    /// `outcome`, a log with an unknown level), or a required string is empty.
    pub fn from_json(value: serde_json::Value) -> RecorderResult<Self> {
        let entry: Self = serde_json::from_value(value)
            .map_err(|e| RecorderError::invalid_entry(e.to_string()))?;
        entry.validate()?;
        Ok(entry)
    }

    /// Check the variant's required fields
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::InvalidEntry`] naming the empty field
    pub fn validate(&self) -> RecorderResult<()> {
        let (field, value) = match self {
            Self::Log { message, .. } => ("message", message),
            Self::Check { description, .. } => ("description", description),
            Self::Attachment { filename, .. } => ("filename", filename),
            Self::Url { url, .. } => ("url", url),
        };
        if value.trim().is_empty() {
            return Err(RecorderError::invalid_entry(format!(
                "{} entry requires a non-empty '{field}'",
                self.kind()
            )));
        }
        Ok(())
    }

    /// Wire discriminant of the entry
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Log { .. } => "log",
            Self::Check { .. } => "check",
            Self::Attachment { .. } => "attachment",
            Self::Url { .. } => "url",
        }
    }

    /// Outcome of a check entry, `None` for every other variant
    #[must_use]
    pub const fn check_outcome(&self) -> Option<bool> {
        match self {
            Self::Check { outcome, .. } => Some(*outcome),
            _ => None,
        }
    }

    /// Level of a log entry, `None` for every other variant
    #[must_use]
    pub const fn log_level(&self) -> Option<LogLevel> {
        match self {
            Self::Log { level, .. } => Some(*level),
            _ => None,
        }
    }

    /// False for failed checks and error logs
    #[must_use]
    pub const fn is_successful(&self) -> bool {
        match self {
            Self::Log { level, .. } => !matches!(level, LogLevel::Error),
            Self::Check { outcome, .. } => *outcome,
            Self::Attachment { .. } | Self::Url { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FakeClock};
    use serde_json::json;

    mod wire_tests {
        use super::*;

        #[test]
        fn test_check_serializes_with_type_tag() {
            let value = serde_json::to_value(StepEntry::check("status code", true)).unwrap();
            assert_eq!(
                value,
                json!({"type": "check", "description": "status code", "outcome": true, "details": null})
            );
        }

        #[test]
        fn test_log_serializes_level_and_time() {
            let time = FakeClock::fixed(0).now();
            let value = serde_json::to_value(StepEntry::log(LogLevel::Warn, "slow", time)).unwrap();
            assert_eq!(
                value,
                json!({"type": "log", "message": "slow", "level": "warn", "time": "1970-01-01T00:00:00.000Z"})
            );
        }

        #[test]
        fn test_attachment_and_url_fields() {
            let value = serde_json::to_value(StepEntry::attachment("shot.png", "screen")).unwrap();
            assert_eq!(
                value,
                json!({"type": "attachment", "filename": "shot.png", "description": "screen"})
            );
            let value = serde_json::to_value(StepEntry::url("https://example.com", "home")).unwrap();
            assert_eq!(
                value,
                json!({"type": "url", "url": "https://example.com", "description": "home"})
            );
        }
    }

    mod from_json_tests {
        use super::*;

        #[test]
        fn test_check_without_outcome_rejected() {
            let err = StepEntry::from_json(json!({"type": "check", "description": "x"})).unwrap_err();
            assert!(matches!(err, RecorderError::InvalidEntry { .. }));
        }

        #[test]
        fn test_check_with_string_outcome_rejected() {
            let err = StepEntry::from_json(
                json!({"type": "check", "description": "x", "outcome": "yes"}),
            )
            .unwrap_err();
            assert!(matches!(err, RecorderError::InvalidEntry { .. }));
        }

        #[test]
        fn test_unknown_type_rejected() {
            let err = StepEntry::from_json(json!({"type": "video", "filename": "a.mp4"})).unwrap_err();
            assert!(matches!(err, RecorderError::InvalidEntry { .. }));
        }

        #[test]
        fn test_unknown_log_level_rejected() {
            let err = StepEntry::from_json(json!({
                "type": "log", "message": "m", "level": "fatal", "time": "2024-01-01T00:00:00.000Z"
            }))
            .unwrap_err();
            assert!(matches!(err, RecorderError::InvalidEntry { .. }));
        }

        #[test]
        fn test_check_details_optional() {
            let entry =
                StepEntry::from_json(json!({"type": "check", "description": "x", "outcome": false}))
                    .unwrap();
            assert_eq!(entry, StepEntry::check("x", false));
        }

        #[test]
        fn test_empty_url_rejected() {
            let err = StepEntry::from_json(json!({"type": "url", "url": " ", "description": "d"}))
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                "Invalid step entry: url entry requires a non-empty 'url'"
            );
        }
    }

    mod success_tests {
        use super::*;

        #[test]
        fn test_error_log_is_unsuccessful() {
            let time = FakeClock::fixed(0).now();
            assert!(!StepEntry::log(LogLevel::Error, "boom", time).is_successful());
            assert!(StepEntry::log(LogLevel::Warn, "hmm", time).is_successful());
        }

        #[test]
        fn test_check_outcome_drives_success() {
            assert!(StepEntry::check("a", true).is_successful());
            assert!(!StepEntry::check("a", false).is_successful());
            assert_eq!(StepEntry::check("a", false).check_outcome(), Some(false));
            assert_eq!(StepEntry::url("u", "d").check_outcome(), None);
        }
    }
}
