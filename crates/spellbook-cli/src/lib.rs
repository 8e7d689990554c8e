//! I/O glue around the spellbook core.
//!
//! Everything here is a thin wrapper: read a problem, hand it to the core,
//! format the totals one per line. Kept in a library so the integration
//! tests can drive it with in-memory readers and writers.

use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use spellbook_core::generate::{self, Case, GeneratorConfig};
use spellbook_core::{oracle, parse_problem, Answers};

/// Read the whole input from `path`, or stdin when `None`.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin().lock().read_to_string(&mut text).context("failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Write one total per line through a buffered writer.
pub fn write_answers<W: Write>(answers: &Answers, out: W) -> Result<()> {
    let mut out = BufWriter::new(out);
    for total in answers {
        writeln!(out, "{total}")?;
    }
    out.flush()?;
    Ok(())
}

/// Parse `text`, solve it with the range engine and print the totals.
pub fn solve<W: Write>(text: &str, out: W) -> Result<Answers> {
    let problem = parse_problem(text).context("invalid input")?;
    let answers = spellbook_core::solve(&problem)?;
    write_answers(&answers, out)?;
    Ok(answers)
}

/// Like [`solve`], but also run the brute-force oracle and fail on any
/// disagreement.
pub fn check<W: Write>(text: &str, out: W) -> Result<Answers> {
    let problem = parse_problem(text).context("invalid input")?;
    let answers = oracle::verify(&problem)?;
    write_answers(&answers, out)?;
    Ok(answers)
}

/// Command-line overrides for the generator.
#[derive(Debug, Default, Clone)]
pub struct GeneratorOverrides {
    pub cases: Option<usize>,
    pub seed: Option<u64>,
}

/// Load the generator config from an optional RON file, then apply flags.
pub fn load_generator_config(path: Option<&Path>, overrides: &GeneratorOverrides) -> Result<GeneratorConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            GeneratorConfig::from_ron(&text).with_context(|| format!("failed to load {}", path.display()))?
        }
        None => GeneratorConfig::default(),
    };

    if let Some(cases) = overrides.cases {
        config.cases = cases;
    }
    if let Some(seed) = overrides.seed {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

/// Generate a batch and write `<stem>.in` / `<stem>.out` pairs into `dir`.
///
/// Returns the paths of the input files, in case order.
pub fn write_cases(dir: &Path, config: &GeneratorConfig) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let cases = generate::generate(config)?;
    let mut written = Vec::with_capacity(cases.len());
    for case in &cases {
        written.push(write_case(dir, case)?);
    }
    tracing::info!(cases = cases.len(), dir = %dir.display(), "test cases written");
    Ok(written)
}

fn write_case(dir: &Path, case: &Case) -> Result<PathBuf> {
    let stem = case.file_stem();
    let input = dir.join(format!("{stem}.in"));
    let output = dir.join(format!("{stem}.out"));

    fs::write(&input, case.input_text()).with_context(|| format!("failed to write {}", input.display()))?;
    fs::write(&output, case.output_text()).with_context(|| format!("failed to write {}", output.display()))?;
    Ok(input)
}
