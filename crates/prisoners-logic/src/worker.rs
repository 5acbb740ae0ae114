//! Process-pool worker protocol.
//!
//! The parent writes one JSON `WorkerAssignment` to a worker's stdin and
//! reads one JSON `WorkerReport` from its stdout. A worker runs trials
//! `first_trial .. first_trial + trial_count` of the batch using the same
//! per-trial seeding as the in-process runners, so outcomes do not depend on
//! how the batch was split.

use std::io::{self, Read, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::trial::run_indexed_trial;

/// Subcommand that turns the simulator binary into a process-pool worker.
pub const WORKER_SUBCOMMAND: &str = "worker";

/// How to launch a worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    /// Launch `program` with no arguments, e.g. the `prisoners-worker` binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Re-launch the running executable with the worker subcommand. Only
    /// meaningful when that executable dispatches `worker` to [`serve`].
    pub fn current_exe() -> io::Result<Self> {
        Ok(Self {
            program: std::env::current_exe()?,
            args: vec![WORKER_SUBCOMMAND.to_string()],
        })
    }
}

/// A contiguous slice of a batch handed to one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerAssignment {
    pub prisoners: u32,
    pub allowed_opens: u32,
    pub base_seed: u64,
    pub first_trial: u64,
    pub trial_count: u64,
}

/// Outcomes of one assignment, in trial order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub first_trial: u64,
    pub outcomes: Vec<bool>,
}

/// Execute an assignment in the current process.
pub fn run_assignment(assignment: &WorkerAssignment) -> WorkerReport {
    let end = assignment.first_trial + assignment.trial_count;
    let outcomes = (assignment.first_trial..end)
        .map(|i| {
            run_indexed_trial(
                assignment.prisoners,
                assignment.allowed_opens,
                assignment.base_seed,
                i,
            )
        })
        .collect();
    WorkerReport {
        first_trial: assignment.first_trial,
        outcomes,
    }
}

/// Worker process entry: read an assignment, run it, write the report.
pub fn serve(input: impl Read, mut output: impl Write) -> io::Result<WorkerReport> {
    let assignment: WorkerAssignment = serde_json::from_reader(input)?;
    log::debug!(
        "worker running trials {}..{}",
        assignment.first_trial,
        assignment.first_trial + assignment.trial_count
    );
    let report = run_assignment(&assignment);
    serde_json::to_writer(&mut output, &report)?;
    output.flush()?;
    Ok(report)
}

/// Split `trials` into at most `workers` contiguous ranges as even as possible.
/// Returns `(first_trial, trial_count)` pairs, none of them empty.
pub fn split_trials(trials: u64, workers: usize) -> Vec<(u64, u64)> {
    let workers = (workers as u64).clamp(1, trials.max(1));
    let base = trials / workers;
    let extra = trials % workers;
    let mut chunks = Vec::with_capacity(workers as usize);
    let mut start = 0;
    for w in 0..workers {
        let count = base + u64::from(w < extra);
        if count > 0 {
            chunks.push((start, count));
        }
        start += count;
    }
    chunks
}
