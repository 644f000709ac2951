//! Error types for protocell_core.
//!
//! Three tiers: configuration errors abort setup, policy violations are
//! returned to the caller, and faults are recorded against the running
//! organism without stopping it.

use protocell_data::{FaultKind, FaultLocation};
use thiserror::Error;

/// Fatal configuration and setup errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Opcode name not present in the instruction library
    #[error("unknown instruction '{name}'{}", suggestion_suffix(.suggestion))]
    UnknownInstruction {
        name: String,
        suggestion: Option<String>,
    },

    /// A no-op was listed after a non-no-op
    #[error("line {line}: invalid NOP placement, all NOPs must be listed first")]
    NopOrdering { line: usize },

    /// No usable entries survived loading
    #[error("instruction set is empty")]
    EmptyInstructionSet,

    /// Genome text named an instruction the set does not contain
    #[error("line {line}: instruction '{name}' is not in the instruction set")]
    UnknownName { line: usize, name: String },

    /// Hardware configuration rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A saved state does not fit this hardware
    #[error("state mismatch: {0}")]
    StateMismatch(String),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}

/// Result type alias for protocell_core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    #[must_use]
    pub fn state_mismatch<S: Into<String>>(msg: S) -> Self {
        Self::StateMismatch(msg.into())
    }
}

/// A recoverable, organism-local fault. The instruction that raised it
/// counts as failed; the organism keeps running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{location} fault ({kind:?}): {message}")]
pub struct Fault {
    pub location: FaultLocation,
    pub kind: FaultKind,
    pub message: String,
}

impl Fault {
    #[must_use]
    pub fn new<S: Into<String>>(location: FaultLocation, kind: FaultKind, message: S) -> Self {
        Self {
            location,
            kind,
            message: message.into(),
        }
    }
}

/// Thread policy violations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadError {
    #[error("thread limit of {0} reached")]
    AtCapacity(usize),
    #[error("cannot kill the last remaining thread")]
    LastThread,
    #[error("no free thread id")]
    IdSpaceExhausted,
}

/// Reasons an injection target refuses incoming code.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectError {
    #[error("no free memory space")]
    NoFreeSpace,
    #[error("no code to inject")]
    Empty,
    #[error("target thread limit reached")]
    ThreadCap,
    #[error("injected code exceeds the maximum genome size")]
    TooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One message produced while loading a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// 1-based source line, 0 when not tied to a line.
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        if self.line == 0 {
            write!(f, "{severity}: {}", self.message)
        } else {
            write!(f, "{severity}: line {}: {}", self.line, self.message)
        }
    }
}

/// Structured feedback channel for loaders: errors and warnings in the
/// order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feedback {
    entries: Vec<Diagnostic>,
}

impl Feedback {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning<S: Into<String>>(&mut self, line: usize, message: S) {
        let message = message.into();
        tracing::warn!(line, %message, "instruction set warning");
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            line,
            message,
        });
    }

    pub fn error<S: Into<String>>(&mut self, line: usize, message: S) {
        let message = message.into();
        tracing::debug!(line, %message, "instruction set error");
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            line,
            message,
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Warning)
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}
