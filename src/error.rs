//! Error types for the typing engine.
//!
//! Session-fatal conditions (sink failures) and start-time rejections are
//! separate variants so callers can match on them; helper-bridge faults are
//! ordinary result values the caller may retry or fall back from.

use thiserror::Error;

/// Main error type for typing operations.
#[derive(Error, Debug)]
pub enum TypistError {
    /// No typing target could be resolved at session start.
    #[error("no typing target available: {0}")]
    NoTarget(String),

    /// The resolved target refuses text input.
    #[error("target cannot accept text: {0}")]
    Untypable(String),

    /// A sink call failed mid-session. Fatal: the session stops.
    #[error("sink operation '{op}' failed: {source}")]
    SinkOperation {
        op: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The native automation helper is unreachable or reported failure.
    #[error("automation helper error: {0}")]
    Bridge(String),

    /// A second start was issued while a session is still typing or paused.
    #[error("a typing session is already active")]
    SessionActive,

    /// Settings validation failed.
    #[error("invalid settings: {0}")]
    Settings(String),

    /// The session task ended abnormally (panic or forced abort).
    #[error("session task failed: {0}")]
    Task(String),
}

/// Result type alias for typing operations.
pub type Result<T> = std::result::Result<T, TypistError>;

impl TypistError {
    pub fn no_target(message: impl Into<String>) -> Self {
        Self::NoTarget(message.into())
    }

    pub fn untypable(message: impl Into<String>) -> Self {
        Self::Untypable(message.into())
    }

    pub fn sink_operation(
        op: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::SinkOperation {
            op,
            source: Box::new(source),
        }
    }

    pub fn bridge(message: impl Into<String>) -> Self {
        Self::Bridge(message.into())
    }

    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings(message.into())
    }

    /// True for faults that must terminate the session.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, Self::SinkOperation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn error_display() {
        let err = TypistError::no_target("stdout is not a terminal");
        assert_eq!(
            err.to_string(),
            "no typing target available: stdout is not a terminal"
        );

        let err = TypistError::sink_operation(
            "emit_char",
            io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"),
        );
        assert_eq!(err.to_string(), "sink operation 'emit_char' failed: broken pipe");

        let err = TypistError::settings("wpm must be at least 1");
        assert_eq!(err.to_string(), "invalid settings: wpm must be at least 1");
    }

    #[test]
    fn sink_failures_are_fatal() {
        let err = TypistError::sink_operation(
            "clear",
            io::Error::new(io::ErrorKind::Other, "boom"),
        );
        assert!(err.is_fatal_to_session());
        assert!(!TypistError::SessionActive.is_fatal_to_session());
    }
}
