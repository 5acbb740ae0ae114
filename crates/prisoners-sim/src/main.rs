//! Hundred Prisoners Simulation Runner
//!
//! Estimates how often every prisoner finds their own number when each one
//! follows the chain of slips starting at their own drawer.
//!
//! Usage:
//!   cargo run -p prisoners-sim -- run
//!   cargo run -p prisoners-sim -- run --mode sequential --trials 10000 --progress
//!   cargo run -p prisoners-sim -- run --mode process-pool --workers 8 --json
//!   cargo run -p prisoners-sim -- check --verbose

mod check;
mod progress;

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::warn;

use prisoners_logic::batch::{execute_batch, NoProgress};
use prisoners_logic::worker::{self, WorkerCommand};
use prisoners_logic::{BatchReport, RunMode, SimulationConfig};

use crate::progress::ProgressLine;

#[derive(Parser)]
#[command(name = "prisoners-sim")]
#[command(version)]
#[command(about = "Monte Carlo simulation of the 100 prisoners problem")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch of simulations and print the escape chance
    Run(RunArgs),

    /// Validate the simulation logic and exit non-zero on any failure
    Check,

    /// Process-pool worker: reads an assignment on stdin, writes a report on stdout
    #[command(hide = true)]
    Worker,
}

#[derive(Args)]
struct RunArgs {
    /// JSON file with simulation parameters (flags take precedence)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of prisoners and drawers
    #[arg(short = 'n', long)]
    prisoners: Option<u32>,

    /// Drawers each prisoner may open
    #[arg(short = 'k', long)]
    opens: Option<u32>,

    /// Number of simulation trials
    #[arg(short, long, env = "PRISONERS_TRIALS")]
    trials: Option<u64>,

    /// Execution mode: sequential, thread-pool or process-pool
    #[arg(short, long, env = "PRISONERS_MODE")]
    mode: Option<RunMode>,

    /// Pool size for the parallel modes
    #[arg(short, long, env = "PRISONERS_WORKERS")]
    workers: Option<usize>,

    /// Base random seed; the same seed reproduces the same result in every mode
    #[arg(long, env = "PRISONERS_SEED")]
    seed: Option<u64>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Show a progress line (sequential mode only)
    #[arg(long)]
    progress: bool,
}

impl RunArgs {
    /// Defaults, then the config file, then flags and environment.
    fn to_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                SimulationConfig::from_json(&json)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => SimulationConfig::default(),
        };
        if let Some(prisoners) = self.prisoners {
            config.prisoners = prisoners;
        }
        if let Some(opens) = self.opens {
            config.allowed_opens = opens;
        }
        if let Some(trials) = self.trials {
            config.trials = trials;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Run(args) => run(&args),
        Commands::Check => check::run_checks(cli.verbose),
        Commands::Worker => run_worker(),
    }
}

fn run(args: &RunArgs) -> Result<()> {
    let mut config = args.to_config()?;
    if config.mode == RunMode::ProcessPool {
        // Workers are this same executable running the hidden `worker` subcommand.
        let command = WorkerCommand::current_exe()
            .context("cannot locate executable for worker processes")?;
        config.worker_command = Some(command);
    }

    let report = if args.progress && config.mode == RunMode::Sequential {
        let mut line = ProgressLine::new(config.trials);
        execute_batch(&config, &mut line)?
    } else {
        if args.progress {
            warn!("progress display is only available in sequential mode");
        }
        execute_batch(&config, &mut NoProgress)?
    };

    print_report(&report, args.json)
}

fn print_report(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", report);
        println!(
            "Expected escape chance: {:.2}% ({} prisoners, {} opens)",
            report.expected_rate, report.prisoners, report.allowed_opens
        );
    }
    Ok(())
}

fn run_worker() -> Result<()> {
    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    worker::serve(stdin, stdout).context("worker could not complete its assignment")?;
    Ok(())
}
