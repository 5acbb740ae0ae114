//! Simulation parameters.
//!
//! `SimulationConfig` replaces process-wide constants: the caller builds one
//! (from defaults, a JSON file, or CLI flags) and hands it to the batch
//! executor, which validates it before running anything.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::worker::WorkerCommand;

/// How the trials of a batch are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// One trial after another on the calling thread.
    Sequential,
    /// A dedicated pool of worker threads.
    ThreadPool,
    /// A pool of worker processes, each with its own trial range.
    ProcessPool,
}

impl RunMode {
    pub fn all() -> &'static [RunMode] {
        &[RunMode::Sequential, RunMode::ThreadPool, RunMode::ProcessPool]
    }

    pub fn name(&self) -> &'static str {
        match self {
            RunMode::Sequential => "sequential",
            RunMode::ThreadPool => "thread-pool",
            RunMode::ProcessPool => "process-pool",
        }
    }

    pub fn is_parallel(&self) -> bool {
        !matches!(self, RunMode::Sequential)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "sequential" => Ok(RunMode::Sequential),
            "thread-pool" | "threads" | "multithreading" => Ok(RunMode::ThreadPool),
            "process-pool" | "processes" | "multiprocessing" => Ok(RunMode::ProcessPool),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// Everything a batch needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of prisoners, which is also the number of drawers (N).
    pub prisoners: u32,
    /// Drawers each prisoner may open (K).
    pub allowed_opens: u32,
    /// Independent trials to run (M).
    pub trials: u64,
    pub mode: RunMode,
    /// Pool size for the parallel modes; ignored when sequential.
    pub workers: usize,
    /// Base seed. `None` draws a fresh one per batch.
    pub seed: Option<u64>,
    /// Program the process pool launches; required for that mode.
    #[serde(skip)]
    pub worker_command: Option<WorkerCommand>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            prisoners: 100,
            allowed_opens: 50,
            trials: 100_000,
            mode: RunMode::ThreadPool,
            workers: default_workers(),
            seed: None,
            worker_command: None,
        }
    }
}

/// One worker per available core, falling back to 4.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl SimulationConfig {
    /// Reject parameters that would make the batch meaningless, including
    /// a scheduling setup the selected mode cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_parameters()?;
        if self.mode.is_parallel() && self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.mode == RunMode::ProcessPool && self.worker_command.is_none() {
            return Err(ConfigError::NoWorkerCommand);
        }
        Ok(())
    }

    /// Checks on the puzzle itself, independent of how it is scheduled.
    pub fn validate_parameters(&self) -> Result<(), ConfigError> {
        if self.prisoners == 0 {
            return Err(ConfigError::NoPrisoners);
        }
        if self.allowed_opens == 0 {
            return Err(ConfigError::NoOpens);
        }
        if self.trials == 0 {
            return Err(ConfigError::NoTrials);
        }
        Ok(())
    }

    /// Workers that will actually be used: never more than there are trials.
    pub fn effective_workers(&self) -> usize {
        if self.mode.is_parallel() {
            let trials = usize::try_from(self.trials).unwrap_or(usize::MAX);
            self.workers.min(trials).max(1)
        } else {
            1
        }
    }

    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_classic_puzzle() {
        let config = SimulationConfig::default();
        assert_eq!(config.prisoners, 100);
        assert_eq!(config.allowed_opens, 50);
        assert_eq!(config.trials, 100_000);
        assert!(config.workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let base = SimulationConfig::default();
        let cases = [
            (
                SimulationConfig {
                    prisoners: 0,
                    ..base.clone()
                },
                ConfigError::NoPrisoners,
            ),
            (
                SimulationConfig {
                    allowed_opens: 0,
                    ..base.clone()
                },
                ConfigError::NoOpens,
            ),
            (
                SimulationConfig {
                    trials: 0,
                    ..base.clone()
                },
                ConfigError::NoTrials,
            ),
            (
                SimulationConfig {
                    workers: 0,
                    mode: RunMode::ProcessPool,
                    ..base.clone()
                },
                ConfigError::NoWorkers,
            ),
        ];
        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }
    }

    #[test]
    fn test_process_pool_needs_worker_command() {
        let config = SimulationConfig {
            mode: RunMode::ProcessPool,
            workers: 2,
            ..SimulationConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoWorkerCommand));
        assert_eq!(config.validate_parameters(), Ok(()));

        let config = SimulationConfig {
            worker_command: Some(WorkerCommand {
                program: "prisoners-sim".into(),
                args: vec!["worker".into()],
            }),
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_worker_command_not_read_from_json() {
        let config = SimulationConfig::from_json(r#"{"mode": "process-pool"}"#).unwrap();
        assert_eq!(config.worker_command, None);
        assert_eq!(config.validate(), Err(ConfigError::NoWorkerCommand));
    }

    #[test]
    fn test_sequential_ignores_workers() {
        let config = SimulationConfig {
            mode: RunMode::Sequential,
            workers: 0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_workers(), 1);
    }

    #[test]
    fn test_effective_workers_capped_by_trials() {
        let config = SimulationConfig {
            trials: 3,
            workers: 16,
            mode: RunMode::ThreadPool,
            ..SimulationConfig::default()
        };
        assert_eq!(config.effective_workers(), 3);
    }

    #[test]
    fn test_mode_parsing() {
        for mode in RunMode::all() {
            assert_eq!(mode.name().parse::<RunMode>(), Ok(*mode));
        }
        assert_eq!("MULTITHREADING".parse::<RunMode>(), Ok(RunMode::ThreadPool));
        assert_eq!("process_pool".parse::<RunMode>(), Ok(RunMode::ProcessPool));
        assert!("gpu".parse::<RunMode>().is_err());
    }

    #[test]
    fn test_json_partial_config() {
        let config =
            SimulationConfig::from_json(r#"{"trials": 500, "mode": "sequential", "seed": 9}"#)
                .unwrap();
        assert_eq!(config.trials, 500);
        assert_eq!(config.mode, RunMode::Sequential);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.prisoners, 100);
    }

    #[test]
    fn test_json_roundtrip_uses_kebab_mode() {
        let json = serde_json::to_string(&SimulationConfig::default()).unwrap();
        assert!(json.contains("\"thread-pool\""));
    }
}
