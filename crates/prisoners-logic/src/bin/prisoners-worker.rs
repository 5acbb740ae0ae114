//! Standalone process-pool worker.
//!
//! Reads one `WorkerAssignment` as JSON on stdin and writes its
//! `WorkerReport` to stdout. Point `SimulationConfig::worker_command` at
//! this binary to use the process pool without the `prisoners-sim` CLI.

use std::io;
use std::process::ExitCode;

use prisoners_logic::worker;

fn main() -> ExitCode {
    match worker::serve(io::stdin().lock(), io::stdout().lock()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("prisoners-worker: {}", e);
            ExitCode::FAILURE
        }
    }
}
