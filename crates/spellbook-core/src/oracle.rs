//! Brute-force reference evaluator.
//!
//! Keeps a plain stack of active labels per position and recomputes the
//! total from scratch at every version. Quadratic, but obviously correct,
//! which is the point: the generator and `spellbook check` trust it to
//! judge the range engine.

use crate::layer::{Label, Layer};
use crate::timeline::{Answers, LayerState, Timeline};
use crate::{CoreError, Problem, Result};

/// Per-position label stacks.
#[derive(Debug, Clone)]
pub struct NaiveState {
    base_sum: i128,
    stacks: Vec<Vec<Label>>,
}

impl NaiveState {
    pub fn new(base: &[i64]) -> Self {
        Self {
            base_sum: base.iter().map(|&v| v as i128).sum(),
            stacks: vec![Vec::new(); base.len()],
        }
    }

    /// Winning label at `pos`: the first pushed among the highest keys.
    pub fn top(&self, pos: usize) -> Option<Label> {
        let stack = self.stacks.get(pos.checked_sub(1)?)?;
        stack.iter().copied().fold(None, |best: Option<Label>, label| match best {
            Some(b) if b.key >= label.key => Some(b),
            _ => Some(label),
        })
    }
}

impl LayerState for NaiveState {
    type Mark = Layer;

    fn apply(&mut self, layer: &Layer) -> Result<Layer> {
        if !layer.fits(self.stacks.len()) {
            return Err(CoreError::RangeOutOfBounds {
                start: layer.start,
                end: layer.end,
                len: self.stacks.len(),
            });
        }
        for stack in &mut self.stacks[layer.start - 1..layer.end] {
            stack.push(layer.label);
        }
        Ok(*layer)
    }

    fn revert(&mut self, layer: Layer) -> Result<()> {
        for stack in &mut self.stacks[layer.start - 1..layer.end] {
            stack.pop();
        }
        Ok(())
    }

    fn total(&self) -> i128 {
        let contributions: i128 = (1..=self.stacks.len())
            .filter_map(|pos| {
                let top = self.top(pos)?;
                Some(top.contribution(self.stacks[pos - 1].len() as i64))
            })
            .sum();
        self.base_sum + contributions
    }
}

/// Answer every command by brute force.
pub fn solve(problem: &Problem) -> Result<Answers> {
    let timeline = Timeline::from_commands(problem.positions(), problem.commands.iter().copied())?;
    let mut state = NaiveState::new(&problem.base);
    timeline.walk(&mut state)
}

/// Solve with the range engine and cross-check against the oracle.
pub fn verify(problem: &Problem) -> Result<Answers> {
    let fast = crate::solve(problem)?;
    let slow = solve(problem)?;

    if let Some((i, (engine, oracle))) =
        fast.iter().zip(slow.iter()).enumerate().find(|(_, (a, b))| a != b)
    {
        return Err(CoreError::OracleMismatch { command: i + 1, engine, oracle });
    }
    tracing::debug!(commands = fast.len(), "engine agrees with oracle");
    Ok(fast)
}
