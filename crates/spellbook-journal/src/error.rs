//! Error types for journal operations.

use thiserror::Error;

/// Errors that can occur while restoring a journal.
///
/// Any of these means the caller lost track of its own checkpoints. The
/// journal cannot guess which state was intended, so callers treat them as
/// fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JournalError {
    /// Checkpoint was taken after entries that have since been restored.
    #[error("checkpoint {checkpoint} is ahead of journal length {len}")]
    CheckpointAhead { checkpoint: usize, len: usize },
}
