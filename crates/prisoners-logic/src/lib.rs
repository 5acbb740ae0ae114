//! Pure simulation logic for the 100 prisoners problem.
//!
//! Every prisoner opens the drawer carrying their own number, then keeps
//! opening the drawer named by the slip they just found. A trial succeeds
//! only if every prisoner finds their own slip within the allowed opens.
//! This crate estimates that probability by running many independent trials.
//!
//! Functions take plain data and return results; nothing here touches a
//! terminal. The `prisoners-sim` binary wraps it with a CLI.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`analysis`] | Exact reference probability that no cycle exceeds the open budget |
//! | [`batch`] | Batch executor: sequential, thread-pool and process-pool runners |
//! | [`config`] | Simulation parameters, run mode and validation |
//! | [`error`] | Configuration and batch error types |
//! | [`permutation`] | Drawer permutations (uniform shuffle, cycle structure) |
//! | [`search`] | Chain-following search for a single prisoner |
//! | [`trial`] | One trial: shuffle once, search for every prisoner |
//! | [`worker`] | JSON assignment/report protocol for process-pool workers |

pub mod analysis;
pub mod batch;
pub mod config;
pub mod error;
pub mod permutation;
pub mod search;
pub mod trial;
pub mod worker;

pub use batch::{execute_batch, BatchReport, Executor, TrialObserver};
pub use config::{RunMode, SimulationConfig};
pub use error::{BatchError, ConfigError};
pub use permutation::Permutation;
