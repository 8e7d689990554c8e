//! spellbook binary
//!
//! ## Usage
//!
//! ```bash
//! # Solve from stdin (default)
//! spellbook < case.in
//!
//! # Solve a file, cross-check against the brute-force oracle
//! spellbook solve case.in
//! spellbook check case.in
//!
//! # Write generated cases to ./test_cases
//! spellbook generate --out test_cases --cases 12 --seed 7
//! spellbook generate --out test_cases --config profile.ron
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=debug` for per-run summaries.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use spellbook_cli::GeneratorOverrides;

/// Total crystal energy over a branching layer timeline.
#[derive(Parser, Debug)]
#[command(name = "spellbook")]
#[command(about = "Answer energize/rewind command streams")]
struct Args {
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the total after every command
    Solve {
        /// Input file (stdin when omitted)
        input: Option<PathBuf>,
    },
    /// Solve, and fail if the brute-force oracle disagrees
    Check {
        /// Input file (stdin when omitted)
        input: Option<PathBuf>,
    },
    /// Write random `.in`/`.out` case pairs
    Generate {
        /// Output directory
        #[arg(long, default_value = "test_cases")]
        out: PathBuf,

        /// Number of cases (overrides the config file)
        #[arg(long)]
        cases: Option<usize>,

        /// RNG seed (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,

        /// RON generator config
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    // stdout carries the answers, so logs go to stderr.
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();
    match run(args.command.unwrap_or(Cmd::Solve { input: None })) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("spellbook: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Cmd) -> anyhow::Result<()> {
    match command {
        Cmd::Solve { input } => {
            let text = spellbook_cli::read_input(input.as_deref())?;
            spellbook_cli::solve(&text, io::stdout().lock())?;
        }
        Cmd::Check { input } => {
            let text = spellbook_cli::read_input(input.as_deref())?;
            spellbook_cli::check(&text, io::stdout().lock())?;
        }
        Cmd::Generate { out, cases, seed, config } => {
            let overrides = GeneratorOverrides { cases, seed };
            let config = spellbook_cli::load_generator_config(config.as_deref(), &overrides)?;
            let written = spellbook_cli::write_cases(&out, &config)?;
            eprintln!("Generated {} cases in {}", written.len(), out.display());
        }
    }
    Ok(())
}
