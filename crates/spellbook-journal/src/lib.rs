//! Reversible mutation log for spellbook.
//!
//! A [`Journal`] is a pure undo ledger: callers record the previous value of
//! a location right before overwriting it, and later [`Journal::restore`]
//! puts every value back in strict last-in-first-out order until the log is
//! as long as a previously taken [`Checkpoint`].
//!
//! The journal has no idea what its entries mean. Each entry type says how
//! to write itself back into a target through the [`Revert`] trait.
//!
//! ```
//! use spellbook_journal::{Journal, Revert};
//!
//! struct Slot { index: usize, prev: i32 }
//!
//! impl Revert<Vec<i32>> for Slot {
//!     fn revert(self, target: &mut Vec<i32>) {
//!         target[self.index] = self.prev;
//!     }
//! }
//!
//! let mut cells = vec![1, 2, 3];
//! let mut journal = Journal::new();
//!
//! let cp = journal.mark();
//! journal.record(Slot { index: 1, prev: cells[1] });
//! cells[1] = 20;
//! journal.record(Slot { index: 1, prev: cells[1] });
//! cells[1] = 200;
//!
//! journal.restore(cp, &mut cells).unwrap();
//! assert_eq!(cells, vec![1, 2, 3]);
//! ```

mod error;

pub use error::JournalError;

/// Result type for journal operations.
pub type Result<T> = std::result::Result<T, JournalError>;

/// An entry that knows how to put its previous value back into `T`.
pub trait Revert<T: ?Sized> {
    /// Restore the recorded previous value into `target`.
    fn revert(self, target: &mut T);
}

/// Opaque position in a journal.
///
/// Only meaningful for the journal that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checkpoint(usize);

impl Checkpoint {
    /// Journal length at the time the checkpoint was taken.
    pub fn position(&self) -> usize {
        self.0
    }
}

/// Append-only LIFO undo ledger.
#[derive(Debug, Clone)]
pub struct Journal<E> {
    entries: Vec<E>,
}

impl<E> Default for Journal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Journal<E> {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Create an empty journal with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    /// Capture the current length.
    pub fn mark(&self) -> Checkpoint {
        Checkpoint(self.entries.len())
    }

    /// Append an entry.
    ///
    /// Must be called immediately before the overwrite it describes.
    pub fn record(&mut self, entry: E) {
        self.entries.push(entry);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the journal holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries recorded after `checkpoint`.
    pub fn depth_since(&self, checkpoint: Checkpoint) -> Result<usize> {
        self.check(checkpoint)?;
        Ok(self.entries.len() - checkpoint.0)
    }

    /// Revert every entry newer than `checkpoint` into `target`, newest first.
    ///
    /// Returns the number of entries reverted.
    pub fn restore<T: ?Sized>(&mut self, checkpoint: Checkpoint, target: &mut T) -> Result<usize>
    where
        E: Revert<T>,
    {
        self.restore_with(checkpoint, |entry| entry.revert(target))
    }

    /// Hand every entry newer than `checkpoint` to `undo`, newest first.
    ///
    /// Each entry is removed from the journal before `undo` sees it, so no
    /// entry is ever applied twice.
    pub fn restore_with<F>(&mut self, checkpoint: Checkpoint, mut undo: F) -> Result<usize>
    where
        F: FnMut(E),
    {
        self.check(checkpoint)?;

        let reverted = self.entries.len() - checkpoint.0;
        while self.entries.len() > checkpoint.0 {
            if let Some(entry) = self.entries.pop() {
                undo(entry);
            }
        }

        tracing::trace!(reverted, len = self.entries.len(), "journal restored");
        Ok(reverted)
    }

    fn check(&self, checkpoint: Checkpoint) -> Result<()> {
        if checkpoint.0 > self.entries.len() {
            return Err(JournalError::CheckpointAhead {
                checkpoint: checkpoint.0,
                len: self.entries.len(),
            });
        }
        Ok(())
    }
}
