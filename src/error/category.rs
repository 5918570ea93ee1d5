//! Error category classification for connector failures.
//!
//! Categories decide how a lifecycle reacts to a failure: whether a work
//! unit exists to report against, whether the cycle counts as handled, and
//! whether the stream consumer has to terminate.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed inbound message. No work unit is created and no state is
    /// mutated.
    Validation,

    /// A referenced entity does not exist on the platform.
    Lookup,

    /// A marking policy (TLP ceiling) rejected the input.
    Policy,

    /// Arbitrary failure raised by user-supplied connector logic.
    UserLogic,

    /// A call to the platform work, bundle, file or entity API failed.
    Platform,

    /// Reading or writing connector state failed.
    State,

    /// The live stream connection failed or was interrupted.
    Transport,

    /// Invalid or missing configuration.
    Configuration,

    /// Local OS errors (filesystem, permissions).
    System,
}

impl ErrorCategory {
    /// Returns true when a failure in this category still counts as a
    /// handled cycle, so the last-run marker advances.
    pub fn is_handled(&self) -> bool {
        matches!(self, ErrorCategory::Lookup | ErrorCategory::Policy)
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Lookup => "lookup",
            ErrorCategory::Policy => "policy",
            ErrorCategory::UserLogic => "user_logic",
            ErrorCategory::Platform => "platform",
            ErrorCategory::State => "state",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::System => "system",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
