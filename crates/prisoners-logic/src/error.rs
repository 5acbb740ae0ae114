//! Error types for configuration and batch execution.
//!
//! A trial itself cannot fail; everything here is either a bad parameter
//! caught before the first trial or a worker problem that would silently
//! drop trials from the statistic if it were ignored.

use std::io;
use std::process::ExitStatus;

/// Rejected simulation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    NoPrisoners,
    NoOpens,
    NoTrials,
    NoWorkers,
    /// Process-pool mode without a program to launch as worker.
    NoWorkerCommand,
    /// Drawer contents are not a bijection over `1..=len`.
    NotAPermutation { len: usize, detail: String },
    UnknownMode(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoPrisoners => write!(f, "number of prisoners must be at least 1"),
            ConfigError::NoOpens => write!(f, "allowed drawer opens must be at least 1"),
            ConfigError::NoTrials => write!(f, "number of simulation trials must be at least 1"),
            ConfigError::NoWorkers => {
                write!(f, "parallel run modes need at least 1 worker")
            }
            ConfigError::NoWorkerCommand => {
                write!(f, "process-pool mode needs a worker command")
            }
            ConfigError::NotAPermutation { len, detail } => {
                write!(f, "not a permutation of 1..={}: {}", len, detail)
            }
            ConfigError::UnknownMode(mode) => write!(
                f,
                "unknown run mode '{}' (expected sequential, thread-pool or process-pool)",
                mode
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors that abort a whole batch.
#[derive(Debug)]
pub enum BatchError {
    Config(ConfigError),
    ThreadPool(String),
    /// A worker process could not be started or talked to.
    WorkerIo { worker: usize, source: io::Error },
    /// A worker process exited unsuccessfully.
    WorkerFailed {
        worker: usize,
        status: ExitStatus,
        stderr: String,
    },
    /// A worker process answered with something other than a valid report.
    WorkerOutput { worker: usize, detail: String },
    TrialCountMismatch { expected: u64, found: u64 },
}

impl From<ConfigError> for BatchError {
    fn from(e: ConfigError) -> Self {
        BatchError::Config(e)
    }
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchError::Config(e) => write!(f, "invalid configuration: {}", e),
            BatchError::ThreadPool(e) => write!(f, "failed to build thread pool: {}", e),
            BatchError::WorkerIo { worker, source } => {
                write!(f, "worker {} I/O error: {}", worker, source)
            }
            BatchError::WorkerFailed {
                worker,
                status,
                stderr,
            } => {
                write!(f, "worker {} exited with {}", worker, status)?;
                if !stderr.trim().is_empty() {
                    write!(f, ": {}", stderr.trim())?;
                }
                Ok(())
            }
            BatchError::WorkerOutput { worker, detail } => {
                write!(f, "worker {} returned an invalid report: {}", worker, detail)
            }
            BatchError::TrialCountMismatch { expected, found } => write!(
                f,
                "batch collected {} trial results, expected {}",
                found, expected
            ),
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BatchError::Config(e) => Some(e),
            BatchError::WorkerIo { source, .. } => Some(source),
            _ => None,
        }
    }
}
