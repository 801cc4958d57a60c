use std::io;
use thiserror::Error;

/// The error type for connection discovery and attribution.
///
/// Only conditions that make a whole query impossible end up here. Per-row
/// problems (a malformed table line, a process that exited mid-walk, a listen
/// entry in tool output) are dropped by the parsers and never surface.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during a system call
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The introspection root (process directory or connection tables) is
    /// missing or unreadable
    #[error("Introspection root {resource} unavailable: {reason}")]
    RootUnavailable { resource: String, reason: String },

    /// An external diagnostic command exited unsuccessfully
    #[error("External tool '{tool}' failed (exit code {code:?}): {stderr}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Field-tagged tool output carried a tag this parser does not know
    #[error("Unexpected field tag '{tag}' in tool output: {value:?}")]
    UnexpectedField { tag: char, value: String },

    /// Invalid data format encountered
    #[error("Invalid data format in {0}: {1}")]
    InvalidFormat(String, String),

    /// Replay fixture could not be loaded
    #[error("Fixture error: {details}")]
    Fixture { details: String },
}

impl Error {
    /// Create a new root unavailable error
    pub fn root_unavailable(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::RootUnavailable {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a new tool failure error
    pub fn tool_failed(tool: impl Into<String>, code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Create a new unexpected field error
    pub fn unexpected_field(tag: char, value: impl Into<String>) -> Self {
        Self::UnexpectedField {
            tag,
            value: value.into(),
        }
    }

    /// Create a new invalid format error
    pub fn invalid_format(source: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidFormat(source.into(), details.into())
    }

    /// Create a new fixture error
    pub fn fixture(details: impl Into<String>) -> Self {
        Self::Fixture {
            details: details.into(),
        }
    }

    /// Whether this error means the native introspection filesystem cannot
    /// be used at all.
    #[must_use]
    pub const fn is_root_unavailable(&self) -> bool {
        matches!(self, Self::RootUnavailable { .. })
    }
}

/// A specialized `Result` type for connection discovery operations.
pub type Result<T> = std::result::Result<T, Error>;
