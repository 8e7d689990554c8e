//! Error types for the spellbook core.

use spellbook_journal::JournalError;
use thiserror::Error;

/// Errors from parsing the textual problem format.
///
/// Line numbers are 1-based and count blank lines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// No header line at all.
    #[error("input is empty")]
    Empty,

    /// A line that does not match the expected shape.
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// Fewer commands than the header announced.
    #[error("expected {expected} commands, found {found}")]
    Truncated { expected: usize, found: usize },

    /// Non-blank content after the last announced command.
    #[error("line {line}: unexpected trailing input")]
    Trailing { line: usize },
}

impl InputError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed { line, reason: reason.into() }
    }
}

/// Errors from building a version tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    /// Rewind to a version that does not exist yet.
    #[error("command {command} rewinds to version {target}, which has not been created")]
    RewindAhead { command: usize, target: usize },

    /// Layer range does not fit the crystal array.
    #[error("command {command} covers [{start}, {end}] outside 1..={len}")]
    LayerOutOfBounds { command: usize, start: usize, end: usize, len: usize },
}

/// Errors from generator configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// RON syntax or schema error.
    #[error("config parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// Values that parse but make no sense together.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level error for core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Rollback bookkeeping went wrong; engine state is undefined.
    #[error("journal invariant violated: {0}")]
    Journal(#[from] JournalError),

    /// Range handed straight to the engine does not fit.
    #[error("range [{start}, {end}] outside 1..={len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    /// Engine answers disagree with the brute-force oracle.
    #[error("command {command}: engine reports {engine}, oracle reports {oracle}")]
    OracleMismatch { command: usize, engine: i128, oracle: i128 },
}
