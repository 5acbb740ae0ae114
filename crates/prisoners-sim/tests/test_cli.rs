//! End-to-end tests against the built `prisoners-sim` binary.
//!
//! Covers the process pool (which needs a real worker executable), the
//! CLI surface and the config-file layer.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use prisoners_logic::batch::{execute_batch, NoProgress};
use prisoners_logic::worker::{WorkerCommand, WORKER_SUBCOMMAND};
use prisoners_logic::{BatchReport, RunMode, SimulationConfig};

// ── Helpers ────────────────────────────────────────────────────────────

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_prisoners-sim"))
}

fn sim(args: &[&str]) -> Output {
    Command::new(binary())
        .args(args)
        .env_remove("PRISONERS_TRIALS")
        .env_remove("PRISONERS_MODE")
        .env_remove("PRISONERS_WORKERS")
        .env_remove("PRISONERS_SEED")
        .output()
        .expect("failed to launch prisoners-sim")
}

fn json_report(output: &Output) -> BatchReport {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not a JSON report")
}

fn seeded(mode: RunMode, trials: u64, seed: u64) -> SimulationConfig {
    SimulationConfig {
        prisoners: 100,
        allowed_opens: 50,
        trials,
        mode,
        workers: 3,
        seed: Some(seed),
        worker_command: Some(WorkerCommand {
            program: binary(),
            args: vec![WORKER_SUBCOMMAND.to_string()],
        }),
    }
}

// ── Process pool ───────────────────────────────────────────────────────

#[test]
fn process_pool_matches_sequential_for_fixed_seed() {
    let pooled = execute_batch(&seeded(RunMode::ProcessPool, 600, 17), &mut NoProgress).unwrap();
    let sequential =
        execute_batch(&seeded(RunMode::Sequential, 600, 17), &mut NoProgress).unwrap();

    assert_eq!(pooled.mode, RunMode::ProcessPool);
    assert_eq!(pooled.workers, 3);
    assert_eq!(pooled.trials, 600);
    assert_eq!(pooled.successes, sequential.successes);
}

#[test]
fn process_pool_from_cli() {
    let pooled = json_report(&sim(&[
        "run",
        "--mode",
        "process-pool",
        "--workers",
        "4",
        "--trials",
        "400",
        "--seed",
        "99",
        "--json",
    ]));
    let threaded = json_report(&sim(&[
        "run",
        "--mode",
        "thread-pool",
        "--workers",
        "2",
        "--trials",
        "400",
        "--seed",
        "99",
        "--json",
    ]));
    assert_eq!(pooled.mode, RunMode::ProcessPool);
    assert_eq!(pooled.successes + pooled.failures, 400);
    assert_eq!(pooled.successes, threaded.successes);
}

#[test]
fn worker_rejects_malformed_assignment() {
    let mut child = Command::new(binary())
        .arg(WORKER_SUBCOMMAND)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"{\"prisoners\": ")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

// ── CLI surface ────────────────────────────────────────────────────────

#[test]
fn text_summary_format() {
    let output = sim(&[
        "run", "--mode", "sequential", "--trials", "50", "--seed", "1",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Simulations completed: 50, Escape chance: "));
    assert!(stdout.contains("%, Execution time: "));
    assert!(stdout.contains("Expected escape chance: 31.18%"));
}

#[test]
fn small_parameters_from_flags() {
    let report = json_report(&sim(&[
        "run", "-n", "10", "-k", "10", "-t", "25", "-m", "sequential", "--json",
    ]));
    assert_eq!(report.prisoners, 10);
    assert_eq!(report.allowed_opens, 10);
    assert_eq!(report.successes, 25);
}

#[test]
fn zero_trials_is_rejected() {
    let output = sim(&["run", "--trials", "0"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("at least 1"), "stderr: {}", stderr);
}

#[test]
fn zero_workers_is_rejected_for_parallel_modes() {
    let output = sim(&["run", "--mode", "thread-pool", "--workers", "0", "--trials", "5"]);
    assert!(!output.status.success());
}

#[test]
fn unknown_mode_is_rejected() {
    let output = sim(&["run", "--mode", "quantum"]);
    assert!(!output.status.success());
}

#[test]
fn config_file_with_flag_override() {
    let path = std::env::temp_dir().join(format!("prisoners-sim-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"{"prisoners": 20, "allowed_opens": 10, "trials": 30, "mode": "sequential", "seed": 4}"#,
    )
    .unwrap();

    let report = json_report(&sim(&[
        "run",
        "--config",
        path.to_str().unwrap(),
        "--trials",
        "40",
        "--json",
    ]));
    std::fs::remove_file(&path).ok();

    assert_eq!(report.prisoners, 20);
    assert_eq!(report.allowed_opens, 10);
    assert_eq!(report.trials, 40);
    assert_eq!(report.seed, 4);
    assert_eq!(report.mode, RunMode::Sequential);
}

#[test]
fn missing_config_file_is_reported() {
    let output = sim(&["run", "--config", "/nonexistent/prisoners.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("reading config file"));
}

#[test]
fn self_check_passes() {
    let output = sim(&["check"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {}", stdout);
    assert!(stdout.contains("0 failed"));
}

#[test]
fn verbose_self_check_shows_samples() {
    let output = sim(&["check", "--verbose"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {}", stdout);
    assert!(stdout.contains("sample N=100 search: longest chain"));

    let quiet = sim(&["check"]);
    assert!(!String::from_utf8_lossy(&quiet.stdout).contains("sample N=100"));
}
