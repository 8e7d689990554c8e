//! Textual problem format.
//!
//! ```text
//! n q
//! a_1 a_2 ... a_n
//! + l r k p x        (energize)
//! - t                (rewind to version t)
//! ```
//!
//! Parsing validates everything the engine relies on: arity, integer syntax,
//! `1 <= l <= r <= n`, `p` in `{0, 1}`, `x >= 0` and `0 <= t < i` for the
//! i-th command. Blank lines are ignored.

use std::fmt;
use std::str::FromStr;

use crate::error::InputError;
use crate::layer::{Label, Layer, Parity};
use crate::timeline::{Command, VersionId};

/// Base values plus the command stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    /// Position `i` has base value `base[i - 1]`.
    pub base: Vec<i64>,
    pub commands: Vec<Command>,
}

impl Problem {
    pub fn new(base: Vec<i64>, commands: Vec<Command>) -> Self {
        Self { base, commands }
    }

    /// Number of crystal positions.
    pub fn positions(&self) -> usize {
        self.base.len()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.base.len(), self.commands.len())?;
        let base: Vec<String> = self.base.iter().map(|v| v.to_string()).collect();
        writeln!(f, "{}", base.join(" "))?;
        for command in &self.commands {
            writeln!(f, "{command}")?;
        }
        Ok(())
    }
}

impl FromStr for Problem {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_problem(s)
    }
}

/// Parse a whole problem.
pub fn parse_problem(text: &str) -> Result<Problem, InputError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (header_line, header) = lines.next().ok_or(InputError::Empty)?;
    let mut tokens = header.split_whitespace();
    let n: usize = field(tokens.next(), header_line, "n")?;
    let q: usize = field(tokens.next(), header_line, "q")?;
    end_of_line(tokens, header_line)?;

    let base = if n == 0 {
        Vec::new()
    } else {
        let (base_line, values) = lines
            .next()
            .ok_or_else(|| InputError::malformed(header_line + 1, "missing base values"))?;
        let base = values
            .split_whitespace()
            .map(|tok| field(Some(tok), base_line, "base value"))
            .collect::<Result<Vec<i64>, _>>()?;
        if base.len() != n {
            return Err(InputError::malformed(
                base_line,
                format!("expected {n} base values, found {}", base.len()),
            ));
        }
        base
    };

    let mut commands = Vec::with_capacity(q);
    for index in 1..=q {
        let Some((line, text)) = lines.next() else {
            return Err(InputError::Truncated { expected: q, found: commands.len() });
        };
        commands.push(parse_command(text, line, index, n)?);
    }

    if let Some((line, _)) = lines.next() {
        return Err(InputError::Trailing { line });
    }

    Ok(Problem { base, commands })
}

/// Parse the `index`-th command (1-based) of a problem with `n` positions.
pub fn parse_command(text: &str, line: usize, index: usize, n: usize) -> Result<Command, InputError> {
    let mut tokens = text.split_whitespace();
    let command = match tokens.next() {
        Some("+") => {
            let start: usize = field(tokens.next(), line, "l")?;
            let end: usize = field(tokens.next(), line, "r")?;
            let key: i64 = field(tokens.next(), line, "k")?;
            let bit: u8 = field(tokens.next(), line, "p")?;
            let magnitude: i64 = field(tokens.next(), line, "x")?;

            let parity = Parity::from_bit(bit)
                .ok_or_else(|| InputError::malformed(line, format!("parity must be 0 or 1, got {bit}")))?;
            if magnitude < 0 {
                return Err(InputError::malformed(line, format!("magnitude must be non-negative, got {magnitude}")));
            }
            let layer = Layer::new(start, end, Label::new(key, parity, magnitude));
            if !layer.fits(n) {
                return Err(InputError::malformed(line, format!("range [{start}, {end}] outside 1..={n}")));
            }
            Command::Energize(layer)
        }
        Some("-") => {
            let target: usize = field(tokens.next(), line, "t")?;
            if target >= index {
                return Err(InputError::malformed(
                    line,
                    format!("command {index} cannot rewind to version {target}"),
                ));
            }
            Command::Rewind(VersionId::new(target))
        }
        Some(other) => {
            return Err(InputError::malformed(line, format!("unknown command {other:?}")));
        }
        None => return Err(InputError::malformed(line, "empty command")),
    };
    end_of_line(tokens, line)?;
    Ok(command)
}

fn field<T: FromStr>(token: Option<&str>, line: usize, name: &str) -> Result<T, InputError> {
    let token = token.ok_or_else(|| InputError::malformed(line, format!("missing {name}")))?;
    token
        .parse()
        .map_err(|_| InputError::malformed(line, format!("invalid {name}: {token:?}")))
}

fn end_of_line<'a>(mut tokens: impl Iterator<Item = &'a str>, line: usize) -> Result<(), InputError> {
    match tokens.next() {
        Some(extra) => Err(InputError::malformed(line, format!("unexpected token {extra:?}"))),
        None => Ok(()),
    }
}
