//! Batch executor: runs many independent trials and reduces them to a rate.
//!
//! Three runners share the [`BatchRunner`] contract:
//!
//! | Runner | Scheduling |
//! |--------|------------|
//! | [`SequentialRunner`] | Calling thread, in order, reports progress after each trial |
//! | [`ThreadPoolRunner`] | Dedicated rayon pool of `workers` threads |
//! | [`ProcessPoolRunner`] | `workers` child processes speaking the [`worker`](crate::worker) protocol |
//!
//! Every trial draws its randomness from `trial_rng(base_seed, index)`, so
//! no RNG state is shared between trials, threads or processes, and a fixed
//! seed yields the same outcomes under every runner.

use std::fmt;
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::escape_percentage;
use crate::config::{RunMode, SimulationConfig};
use crate::error::{BatchError, ConfigError};
use crate::trial::run_indexed_trial;
use crate::worker::{split_trials, WorkerAssignment, WorkerCommand, WorkerReport};

// ── Progress ────────────────────────────────────────────────────────────

/// Hook invoked after each trial by runners that report progress.
pub trait TrialObserver {
    fn on_trial(&mut self, completed: u64, total: u64, freed: bool);
}

/// Observer that ignores every trial.
pub struct NoProgress;

impl TrialObserver for NoProgress {
    fn on_trial(&mut self, _completed: u64, _total: u64, _freed: bool) {}
}

impl<F: FnMut(u64, u64, bool)> TrialObserver for F {
    fn on_trial(&mut self, completed: u64, total: u64, freed: bool) {
        self(completed, total, freed)
    }
}

// ── Runners ─────────────────────────────────────────────────────────────

/// Parameters of one batch after the seed has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchJob {
    pub prisoners: u32,
    pub allowed_opens: u32,
    pub trials: u64,
    pub base_seed: u64,
}

impl BatchJob {
    fn run_trial(&self, index: u64) -> bool {
        run_indexed_trial(self.prisoners, self.allowed_opens, self.base_seed, index)
    }
}

/// Runs every trial of a job and returns one outcome per trial.
pub trait BatchRunner {
    fn run(&self, job: &BatchJob, observer: &mut dyn TrialObserver)
        -> Result<Vec<bool>, BatchError>;
}

#[derive(Debug, Clone, Default)]
pub struct SequentialRunner;

impl BatchRunner for SequentialRunner {
    fn run(
        &self,
        job: &BatchJob,
        observer: &mut dyn TrialObserver,
    ) -> Result<Vec<bool>, BatchError> {
        let mut outcomes = Vec::with_capacity(usize::try_from(job.trials).unwrap_or(0));
        for index in 0..job.trials {
            let freed = job.run_trial(index);
            outcomes.push(freed);
            observer.on_trial(index + 1, job.trials, freed);
        }
        Ok(outcomes)
    }
}

#[derive(Debug, Clone)]
pub struct ThreadPoolRunner {
    pub workers: usize,
}

impl BatchRunner for ThreadPoolRunner {
    fn run(
        &self,
        job: &BatchJob,
        _observer: &mut dyn TrialObserver,
    ) -> Result<Vec<bool>, BatchError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("trial-worker-{}", i))
            .build()
            .map_err(|e| BatchError::ThreadPool(e.to_string()))?;
        let outcomes = pool.install(|| {
            (0..job.trials)
                .into_par_iter()
                .map(|index| job.run_trial(index))
                .collect()
        });
        Ok(outcomes)
    }
}

#[derive(Debug, Clone)]
pub struct ProcessPoolRunner {
    pub workers: usize,
    pub command: WorkerCommand,
}

impl ProcessPoolRunner {
    fn spawn(
        &self,
        worker: usize,
        assignment: WorkerAssignment,
    ) -> Result<WorkerProcess, BatchError> {
        let child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BatchError::WorkerIo { worker, source })?;
        Ok(WorkerProcess {
            worker,
            assignment,
            child: Some(child),
        })
    }
}

impl BatchRunner for ProcessPoolRunner {
    fn run(
        &self,
        job: &BatchJob,
        _observer: &mut dyn TrialObserver,
    ) -> Result<Vec<bool>, BatchError> {
        let chunks = split_trials(job.trials, self.workers);
        // Dropping `processes` on an early return kills every child spawned so far.
        let mut processes = Vec::with_capacity(chunks.len());
        for (worker, &(first_trial, trial_count)) in chunks.iter().enumerate() {
            let assignment = WorkerAssignment {
                prisoners: job.prisoners,
                allowed_opens: job.allowed_opens,
                base_seed: job.base_seed,
                first_trial,
                trial_count,
            };
            processes.push(self.spawn(worker, assignment)?);
        }
        log::debug!("spawned {} worker processes", processes.len());

        let results: Vec<Result<WorkerReport, BatchError>> = std::thread::scope(|s| {
            let mut results = Vec::with_capacity(processes.len());
            let mut handles = Vec::with_capacity(processes.len());
            let mut pending = processes.into_iter();
            for process in pending.by_ref() {
                let worker = process.worker;
                let spawned = std::thread::Builder::new()
                    .name(format!("worker-collector-{}", worker))
                    .spawn_scoped(s, move || process.collect());
                match spawned {
                    Ok(handle) => handles.push((worker, handle)),
                    Err(source) => {
                        log::warn!("no collector thread for worker {}: {}", worker, source);
                        results.push(Err(BatchError::WorkerIo { worker, source }));
                        break;
                    }
                }
            }
            drop(pending);

            for (worker, handle) in handles {
                results.push(handle.join().unwrap_or_else(|_| {
                    Err(BatchError::WorkerOutput {
                        worker,
                        detail: "collector thread panicked".into(),
                    })
                }));
            }
            results
        });

        let mut reports = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        reports.sort_by_key(|r| r.first_trial);
        Ok(reports.into_iter().flat_map(|r| r.outcomes).collect())
    }
}

/// A spawned worker and the trial range it was given. The child is killed
/// and reaped on drop unless [`collect`](Self::collect) took it first.
struct WorkerProcess {
    worker: usize,
    assignment: WorkerAssignment,
    child: Option<Child>,
}

impl WorkerProcess {
    /// Send the assignment to the worker and wait for its report.
    fn collect(mut self) -> Result<WorkerReport, BatchError> {
        let worker = self.worker;
        let io_err = move |source: std::io::Error| BatchError::WorkerIo { worker, source };
        let payload = serde_json::to_vec(&self.assignment).map_err(|e| io_err(e.into()))?;
        let mut child = self.child.take().ok_or_else(|| BatchError::WorkerOutput {
            worker,
            detail: "worker already collected".into(),
        })?;
        let sent = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&payload),
            None => Ok(()),
        };

        let output = child.wait_with_output().map_err(io_err)?;
        if !output.status.success() {
            return Err(BatchError::WorkerFailed {
                worker,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        sent.map_err(io_err)?;

        let assignment = &self.assignment;
        let report: WorkerReport =
            serde_json::from_slice(&output.stdout).map_err(|e| BatchError::WorkerOutput {
                worker,
                detail: e.to_string(),
            })?;
        if report.first_trial != assignment.first_trial
            || report.outcomes.len() as u64 != assignment.trial_count
        {
            return Err(BatchError::WorkerOutput {
                worker,
                detail: format!(
                    "expected {} outcomes from trial {}, got {} from trial {}",
                    assignment.trial_count,
                    assignment.first_trial,
                    report.outcomes.len(),
                    report.first_trial
                ),
            });
        }
        Ok(report)
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            log::debug!("killing uncollected worker {}", self.worker);
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// The selected execution strategy.
#[derive(Debug, Clone)]
pub enum Executor {
    Sequential(SequentialRunner),
    ThreadPool(ThreadPoolRunner),
    ProcessPool(ProcessPoolRunner),
}

impl Executor {
    /// Build the runner a config asks for. Process pools launch
    /// `config.worker_command`, which must be set for that mode.
    pub fn for_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        let workers = config.effective_workers();
        Ok(match config.mode {
            RunMode::Sequential => Executor::Sequential(SequentialRunner),
            RunMode::ThreadPool => Executor::ThreadPool(ThreadPoolRunner { workers }),
            RunMode::ProcessPool => Executor::ProcessPool(ProcessPoolRunner {
                workers,
                command: config
                    .worker_command
                    .clone()
                    .ok_or(ConfigError::NoWorkerCommand)?,
            }),
        })
    }

    pub fn mode(&self) -> RunMode {
        match self {
            Executor::Sequential(_) => RunMode::Sequential,
            Executor::ThreadPool(_) => RunMode::ThreadPool,
            Executor::ProcessPool(_) => RunMode::ProcessPool,
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            Executor::Sequential(_) => 1,
            Executor::ThreadPool(r) => r.workers,
            Executor::ProcessPool(r) => r.workers,
        }
    }
}

impl BatchRunner for Executor {
    fn run(
        &self,
        job: &BatchJob,
        observer: &mut dyn TrialObserver,
    ) -> Result<Vec<bool>, BatchError> {
        match self {
            Executor::Sequential(r) => r.run(job, observer),
            Executor::ThreadPool(r) => r.run(job, observer),
            Executor::ProcessPool(r) => r.run(job, observer),
        }
    }
}

// ── Report ──────────────────────────────────────────────────────────────

/// Aggregate of a finished batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub mode: RunMode,
    pub prisoners: u32,
    pub allowed_opens: u32,
    pub workers: usize,
    pub seed: u64,
    pub trials: u64,
    pub successes: u64,
    pub failures: u64,
    /// Empirical escape chance, percent.
    pub success_rate: f64,
    /// Exact escape chance for these parameters, percent.
    pub expected_rate: f64,
    pub elapsed_secs: f64,
}

impl BatchReport {
    fn from_outcomes(
        job: &BatchJob,
        executor: &Executor,
        outcomes: &[bool],
        elapsed: Duration,
    ) -> Self {
        let successes = outcomes.iter().filter(|&&freed| freed).count() as u64;
        let trials = outcomes.len() as u64;
        Self {
            mode: executor.mode(),
            prisoners: job.prisoners,
            allowed_opens: job.allowed_opens,
            workers: executor.workers(),
            seed: job.base_seed,
            trials,
            successes,
            failures: trials - successes,
            success_rate: successes as f64 / trials as f64 * 100.0,
            expected_rate: escape_percentage(job.prisoners, job.allowed_opens),
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_secs)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Simulations completed: {}, Escape chance: {:.2}%, Execution time: {:.4}s",
            self.trials, self.success_rate, self.elapsed_secs
        )
    }
}

// ── Entry points ────────────────────────────────────────────────────────

/// Validate `config`, run it with the runner it selects, and report.
pub fn execute_batch(
    config: &SimulationConfig,
    observer: &mut dyn TrialObserver,
) -> Result<BatchReport, BatchError> {
    config.validate()?;
    let executor = Executor::for_config(config)?;
    execute_batch_with(&executor, config, observer)
}

/// Like [`execute_batch`] but with an explicit runner; `config.mode`,
/// `config.workers` and `config.worker_command` are ignored in favour of
/// the executor's own.
pub fn execute_batch_with(
    executor: &Executor,
    config: &SimulationConfig,
    observer: &mut dyn TrialObserver,
) -> Result<BatchReport, BatchError> {
    config.validate_parameters()?;
    let job = BatchJob {
        prisoners: config.prisoners,
        allowed_opens: config.allowed_opens,
        trials: config.trials,
        base_seed: config.seed.unwrap_or_else(|| rand::thread_rng().gen()),
    };
    log::info!(
        "Running {} simulations with mode: {} ({} workers, {} prisoners, {} opens, seed {})",
        job.trials,
        executor.mode(),
        executor.workers(),
        job.prisoners,
        job.allowed_opens,
        job.base_seed
    );

    let start = Instant::now();
    let outcomes = executor.run(&job, observer)?;
    let elapsed = start.elapsed();

    if outcomes.len() as u64 != job.trials {
        return Err(BatchError::TrialCountMismatch {
            expected: job.trials,
            found: outcomes.len() as u64,
        });
    }
    let report = BatchReport::from_outcomes(&job, executor, &outcomes, elapsed);
    log::debug!(
        "{} of {} trials freed everyone",
        report.successes,
        report.trials
    );
    Ok(report)
}
