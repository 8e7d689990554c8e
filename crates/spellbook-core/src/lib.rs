//! Layered crystal energy over a branching timeline.
//!
//! n crystals have immutable base values. Energize commands stack range
//! layers on top of them; rewind commands jump back to any earlier version
//! and continue from there as a new branch. After every command we report
//! the total energy.
//!
//! # Contribution Rule
//!
//! For a position with coverage count `c` and winning label `(k, p, x)`
//! (highest key among covering layers, earliest applied on ties):
//!
//! - `c == 0`: contributes nothing
//! - `c` even and `p` even, or `c` odd and `p` odd: `+x`
//! - otherwise: `-x`
//!
//! # Pieces
//!
//! |---------------------|-----------------------------------------------|
//! | Type                | Purpose                                       |
//! |---------------------|-----------------------------------------------|
//! | [`RangeEngine`]     | Segment tree of parity + winners, journaled   |
//! | [`Timeline`]        | Version tree + explicit-stack DFS             |
//! | [`Problem`]         | Parsed base values and commands               |
//! | [`oracle`]          | Brute-force reference evaluator               |
//! | [`generate`]        | Seeded random test-case generator             |
//! |---------------------|-----------------------------------------------|

pub mod engine;
mod error;
pub mod generate;
pub mod input;
pub mod layer;
pub mod oracle;
pub mod timeline;

pub use engine::{Cell, RangeEngine};
pub use error::{ConfigError, CoreError, InputError, TimelineError};
pub use input::{Problem, parse_problem};
pub use layer::{Label, Layer, Parity};
pub use spellbook_journal::{Checkpoint, JournalError};
pub use timeline::{Answers, Command, LayerState, Timeline, VersionId};

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Answer every command of `problem` with the range engine.
pub fn solve(problem: &Problem) -> Result<Answers> {
    let timeline = Timeline::from_commands(problem.positions(), problem.commands.iter().copied())?;
    let mut engine = RangeEngine::new(&problem.base);
    let answers = timeline.walk(&mut engine)?;

    tracing::debug!(
        positions = problem.positions(),
        commands = problem.commands.len(),
        "problem solved"
    );
    Ok(answers)
}
