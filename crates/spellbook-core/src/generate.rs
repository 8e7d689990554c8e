//! Random test-case generation.
//!
//! Three case shapes, cycled across a batch:
//!
//! - **random**: overlapping ranges, about a third rewinds, occasional key
//!   jumps and repeated keys
//! - **nested**: a tower of shrinking layers with small local layers, then
//!   rewinds bouncing among the build steps
//! - **edge**: full-range layers with clashing keys, rewinds to 0 and to
//!   recent versions, small magnitudes
//!
//! Expected outputs come from the brute-force [`oracle`](crate::oracle).
//! Generation is deterministic for a given [`GeneratorConfig`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::ConfigError;
use crate::layer::{Label, Layer, Parity};
use crate::timeline::{Answers, Command, VersionId};
use crate::{oracle, Problem, Result};

/// Layers in the nested tower.
const TOWER_HEIGHT: usize = 6;
/// Local layers added after each tower layer.
const TOWER_WIDTH: usize = 2;
/// Leading full-range commands in an edge case.
const EDGE_PRELUDE: usize = 10;

/// Shape of a generated case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CaseShape {
    Random,
    Nested,
    Edge,
}

/// Generator settings.
///
/// Every field has a default, so a config file only needs the fields it
/// changes:
///
/// ```ron
/// (cases: 12, seed: 7, n_max: 50, shapes: [nested, edge])
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of cases to produce.
    pub cases: usize,
    pub seed: u64,
    pub n_min: usize,
    pub n_max: usize,
    pub q_min: usize,
    pub q_max: usize,
    /// Probability that a random-shape command is a rewind.
    pub rewind_ratio: f64,
    /// Base values are drawn from `0..=max_base`.
    pub max_base: i64,
    /// Random-shape magnitudes are drawn from `1..=max_magnitude`.
    pub max_magnitude: i64,
    /// Shapes to cycle through, in order.
    pub shapes: Vec<CaseShape>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            cases: 6,
            seed: 20251022,
            n_min: 1,
            n_max: 20,
            q_min: 5,
            q_max: 30,
            rewind_ratio: 0.3,
            max_base: 15,
            max_magnitude: 10,
            shapes: vec![CaseShape::Random, CaseShape::Nested, CaseShape::Edge],
        }
    }
}

impl GeneratorConfig {
    /// Parse a RON config and validate it.
    pub fn from_ron(text: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the ranges are usable.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.n_min == 0 || self.n_min > self.n_max {
            return invalid(format!("need 1 <= n_min <= n_max, got {}..={}", self.n_min, self.n_max));
        }
        if self.q_min > self.q_max {
            return invalid(format!("need q_min <= q_max, got {}..={}", self.q_min, self.q_max));
        }
        if !(0.0..=1.0).contains(&self.rewind_ratio) {
            return invalid(format!("rewind_ratio must be within [0, 1], got {}", self.rewind_ratio));
        }
        if self.max_base < 0 || self.max_magnitude < 1 {
            return invalid(format!(
                "need max_base >= 0 and max_magnitude >= 1, got {} and {}",
                self.max_base, self.max_magnitude
            ));
        }
        if self.shapes.is_empty() {
            return invalid("shapes must not be empty".to_string());
        }
        Ok(())
    }
}

/// One generated case with its expected answers.
#[derive(Debug, Clone)]
pub struct Case {
    /// 1-based position in the batch.
    pub index: usize,
    pub shape: CaseShape,
    pub problem: Problem,
    pub expected: Answers,
}

impl Case {
    /// File name without extension, e.g. `03_edge`.
    pub fn file_stem(&self) -> String {
        format!("{:02}_{}", self.index, self.shape)
    }

    /// The problem in input format.
    pub fn input_text(&self) -> String {
        self.problem.to_string()
    }

    /// One total per line.
    pub fn output_text(&self) -> String {
        let mut out = String::new();
        for total in &self.expected {
            out.push_str(&total.to_string());
            out.push('\n');
        }
        out
    }
}

/// Generate a batch of cases.
pub fn generate(config: &GeneratorConfig) -> Result<Vec<Case>> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut cases = Vec::with_capacity(config.cases);
    for index in 1..=config.cases {
        let shape = config.shapes[(index - 1) % config.shapes.len()];
        let n = rng.gen_range(config.n_min..=config.n_max);
        let q = rng.gen_range(config.q_min..=config.q_max);
        let key_base = 1 + index as i64 * 10;

        let problem = match shape {
            CaseShape::Random => random_case(&mut rng, config, n, q, key_base),
            CaseShape::Nested => nested_case(&mut rng, config, n, q),
            CaseShape::Edge => edge_case(&mut rng, n, q),
        };
        let expected = oracle::solve(&problem)?;
        tracing::debug!(index, %shape, n, q, "generated case");

        cases.push(Case { index, shape, problem, expected });
    }
    Ok(cases)
}

fn random_range(rng: &mut impl Rng, n: usize) -> (usize, usize) {
    let a = rng.gen_range(1..=n);
    let b = rng.gen_range(1..=n);
    (a.min(b), a.max(b))
}

fn random_parity(rng: &mut impl Rng) -> Parity {
    if rng.gen_bool(0.5) { Parity::Odd } else { Parity::Even }
}

fn energize(start: usize, end: usize, key: i64, parity: Parity, magnitude: i64) -> Command {
    Command::Energize(Layer::new(start, end, Label::new(key, parity, magnitude)))
}

fn rewind(target: usize) -> Command {
    Command::Rewind(VersionId::new(target))
}

fn random_case(rng: &mut impl Rng, config: &GeneratorConfig, n: usize, q: usize, key_base: i64) -> Problem {
    let base = (0..n).map(|_| rng.gen_range(0..=config.max_base)).collect();

    let mut commands = Vec::with_capacity(q);
    let mut next_key = key_base;
    for index in 1..=q {
        if index > 1 && rng.gen_bool(config.rewind_ratio) {
            commands.push(rewind(rng.gen_range(0..index)));
            continue;
        }

        let (start, end) = random_range(rng, n);
        let key = if rng.gen_bool(0.2) {
            next_key + rng.gen_range(50..=200)
        } else if next_key > key_base && rng.gen_bool(0.15) {
            rng.gen_range(key_base..=next_key)
        } else {
            next_key
        };
        next_key = (next_key + 1).max(key + 1);

        let magnitude = rng.gen_range(1..=config.max_magnitude);
        commands.push(energize(start, end, key, random_parity(rng), magnitude));
    }
    Problem::new(base, commands)
}

fn nested_case(rng: &mut impl Rng, config: &GeneratorConfig, n: usize, q: usize) -> Problem {
    let base = (0..n).map(|_| rng.gen_range(0..=config.max_base.min(5))).collect();

    let step = (n / (2 * TOWER_HEIGHT)).max(1);
    let mut commands = Vec::new();
    let mut key = 1;
    for depth in 0..TOWER_HEIGHT {
        let start = 1 + depth * step;
        let (start, end) = match n.checked_sub(depth * step) {
            Some(end) if start <= end => (start, end),
            _ => (1, n),
        };
        let parity = if depth % 2 == 0 { Parity::Even } else { Parity::Odd };
        commands.push(energize(start, end, key, parity, 1 + (depth % 5) as i64));
        key += 1;

        for _ in 0..TOWER_WIDTH {
            let (start, end) = random_range(rng, n);
            commands.push(energize(start, end, key, random_parity(rng), rng.gen_range(1..=6)));
            key += 1;
        }
    }

    let built = commands.len();
    let bounce = built.min(TOWER_HEIGHT * (1 + TOWER_WIDTH));
    while commands.len() < q {
        commands.push(rewind(rng.gen_range(0..bounce)));
    }
    // Short cases keep only the bottom of the tower.
    commands.truncate(q);
    Problem::new(base, commands)
}

fn edge_case(rng: &mut impl Rng, n: usize, q: usize) -> Problem {
    let base = vec![0; n];

    let mut commands = Vec::with_capacity(q);
    let mut key = 5;
    for i in 0..q.min(EDGE_PRELUDE) {
        if i % 3 == 2 {
            commands.push(rewind(rng.gen_range(0..=i)));
            continue;
        }
        let clash = if i % 2 == 0 { key } else { 5 };
        let parity = if i % 2 == 0 { Parity::Even } else { Parity::Odd };
        commands.push(energize(1, n, clash, parity, 1 + (i % 3) as i64));
        key += 1;
    }

    while commands.len() < q {
        if rng.gen_bool(0.35) {
            commands.push(rewind(rng.gen_range(0..=commands.len())));
        } else {
            let (start, end) = random_range(rng, n);
            let parity = random_parity(rng);
            commands.push(energize(start, end, rng.gen_range(1..=12), parity, rng.gen_range(1..=4)));
        }
    }
    Problem::new(base, commands)
}
