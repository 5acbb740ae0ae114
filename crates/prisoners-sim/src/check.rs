//! Headless self-check of the simulation logic.
//!
//! Runs entirely in-process except for the process-pool section, which
//! re-launches this executable as its workers.

use anyhow::{Context, Result};

use prisoners_logic::analysis::escape_percentage;
use prisoners_logic::batch::{execute_batch, NoProgress};
use prisoners_logic::permutation::Permutation;
use prisoners_logic::search::{finds_own_number, opens_needed};
use prisoners_logic::trial::{all_prisoners_freed, trial_rng};
use prisoners_logic::worker::WorkerCommand;
use prisoners_logic::{RunMode, SimulationConfig};

// Fixed so failures are reproducible.
const SWEEP_SEED: u64 = 0x5EED;
const BATCH_SEED: u64 = 2024;

// ── Test harness ────────────────────────────────────────────────────────

struct CheckResult {
    name: String,
    passed: bool,
    detail: String,
}

impl CheckResult {
    fn new(name: &str, passed: bool, detail: String) -> Self {
        Self {
            name: name.into(),
            passed,
            detail,
        }
    }
}

pub fn run_checks(verbose: bool) -> Result<()> {
    println!("=== Hundred Prisoners Self-Check ===\n");

    let mut results = Vec::new();

    // 1. Permutation generator
    results.extend(validate_permutations(verbose));

    // 2. Chain search
    results.extend(validate_search(verbose));

    // 3. Hand-checked trials
    results.extend(validate_scenarios(verbose));

    // 4. Batch executor
    results.extend(validate_batches(verbose)?);

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed,
        results.len(),
        failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

// ── 1. Permutations ─────────────────────────────────────────────────────

fn validate_permutations(verbose: bool) -> Vec<CheckResult> {
    println!("--- Permutations ---");
    let mut results = Vec::new();

    let mut bad = Vec::new();
    for n in 1..=200u32 {
        let perm = Permutation::shuffled(n, &mut trial_rng(SWEEP_SEED, n as u64));
        let mut sorted = perm.as_slice().to_vec();
        sorted.sort_unstable();
        if !sorted.iter().copied().eq(1..=n) {
            bad.push(n);
        }
    }
    results.push(CheckResult::new(
        "permutation_bijection",
        bad.is_empty(),
        if bad.is_empty() {
            "shuffles of N=1..200 are all bijections".into()
        } else {
            format!("non-bijective shuffles for N = {:?}", bad)
        },
    ));

    // First drawer of N=4: each prisoner should land there about 1/4 of the time.
    let draws = 40_000u64;
    let mut counts = [0u64; 4];
    for i in 0..draws {
        let perm = Permutation::shuffled(4, &mut trial_rng(SWEEP_SEED, i));
        counts[perm.drawer(1) as usize - 1] += 1;
    }
    let expected = draws / 4;
    let worst = counts
        .iter()
        .map(|&c| c.abs_diff(expected))
        .max()
        .unwrap_or(0);
    results.push(CheckResult::new(
        "permutation_uniform_first_drawer",
        worst < expected / 20,
        format!("drawer 1 contents over {} shuffles: {:?}", draws, counts),
    ));

    if verbose {
        let perm = Permutation::shuffled(100, &mut trial_rng(SWEEP_SEED, 0));
        let mut cycles = perm.cycle_lengths();
        cycles.sort_unstable_by(|a, b| b.cmp(a));
        println!("  sample N=100 cycle lengths: {:?}", cycles);
    }

    results
}

// ── 2. Search ───────────────────────────────────────────────────────────

fn validate_search(verbose: bool) -> Vec<CheckResult> {
    println!("--- Chain Search ---");
    let mut results = Vec::new();

    let identity = Permutation::identity(100);
    let first_open = (1..=100).all(|p| opens_needed(&identity, p, 1) == Some(1));
    results.push(CheckResult::new(
        "search_identity_first_open",
        first_open,
        "identity permutation frees everyone on the first open".into(),
    ));

    let mut failures = 0;
    for i in 0..200 {
        let perm = Permutation::shuffled(50, &mut trial_rng(SWEEP_SEED, i));
        failures += (1..=50).filter(|&p| !finds_own_number(&perm, p, 50)).count();
    }
    results.push(CheckResult::new(
        "search_full_budget_always_succeeds",
        failures == 0,
        format!("{} failures with K = N over 200 permutations", failures),
    ));

    let mut mismatches = 0;
    for i in 0..200 {
        let perm = Permutation::shuffled(40, &mut trial_rng(SWEEP_SEED, i));
        for k in [10, 20, 30] {
            if all_prisoners_freed(&perm, k) != (perm.longest_cycle() <= k as usize) {
                mismatches += 1;
            }
        }
    }
    if verbose {
        let perm = Permutation::shuffled(100, &mut trial_rng(SWEEP_SEED, 1));
        let opens: Vec<u32> = (1..=100)
            .filter_map(|p| opens_needed(&perm, p, 100))
            .collect();
        let longest = opens.iter().copied().max().unwrap_or(0);
        println!(
            "  sample N=100 search: longest chain {} opens, freed with K=50: {}",
            longest,
            all_prisoners_freed(&perm, 50)
        );
    }
    results.push(CheckResult::new(
        "trial_matches_longest_cycle",
        mismatches == 0,
        format!("{} trials disagree with the longest-cycle rule", mismatches),
    ));

    results
}

// ── 3. Scenarios ────────────────────────────────────────────────────────

fn validate_scenarios(verbose: bool) -> Vec<CheckResult> {
    println!("--- Scenarios ---");
    let mut results = Vec::new();

    match Permutation::from_values(vec![2, 3, 4, 1]) {
        Ok(ring) => results.push(CheckResult::new(
            "scenario_four_cycle_k2",
            !all_prisoners_freed(&ring, 2),
            "single 4-cycle with K=2 fails".into(),
        )),
        Err(e) => results.push(CheckResult::new("scenario_four_cycle_k2", false, e.to_string())),
    }

    match Permutation::from_values(vec![3, 7, 1, 4, 8, 2, 9, 5, 10, 6]) {
        Ok(perm) => {
            let failed_k4: Vec<u32> = (1..=10).filter(|&p| !finds_own_number(&perm, p, 4)).collect();
            if verbose {
                println!("  N=10 cycles: {:?}", perm.cycle_lengths());
            }
            results.push(CheckResult::new(
                "scenario_ten_drawers_k5",
                all_prisoners_freed(&perm, 5),
                "longest cycle 5 fits in K=5".into(),
            ));
            results.push(CheckResult::new(
                "scenario_ten_drawers_k4",
                !all_prisoners_freed(&perm, 4) && failed_k4 == [2, 6, 7, 9, 10],
                format!("prisoners failing with K=4: {:?}", failed_k4),
            ));
        }
        Err(e) => results.push(CheckResult::new("scenario_ten_drawers", false, e.to_string())),
    }

    results
}

// ── 4. Batches ──────────────────────────────────────────────────────────

fn validate_batches(verbose: bool) -> Result<Vec<CheckResult>> {
    println!("--- Batch Executor ---");
    let mut results = Vec::new();

    let worker_command =
        WorkerCommand::current_exe().context("cannot locate executable for worker processes")?;
    let base = SimulationConfig {
        prisoners: 100,
        allowed_opens: 50,
        trials: 2_000,
        mode: RunMode::Sequential,
        workers: 4,
        seed: Some(BATCH_SEED),
        worker_command: Some(worker_command),
    };

    let mut successes = Vec::new();
    for &mode in RunMode::all() {
        let config = SimulationConfig {
            mode,
            ..base.clone()
        };
        let report = execute_batch(&config, &mut NoProgress)?;
        if verbose {
            println!("  {}", report);
        }
        results.push(CheckResult::new(
            &format!("batch_counts_{}", mode.name()),
            report.trials == base.trials && report.successes + report.failures == report.trials,
            format!("{} successes, {} failures", report.successes, report.failures),
        ));
        successes.push((mode, report.successes));
    }
    let agree = successes.windows(2).all(|w| w[0].1 == w[1].1);
    results.push(CheckResult::new(
        "batch_modes_agree_for_fixed_seed",
        agree,
        format!("{:?}", successes),
    ));

    let expected = escape_percentage(100, 50);
    let config = SimulationConfig {
        trials: 50_000,
        mode: RunMode::ThreadPool,
        seed: None,
        ..base
    };
    let report = execute_batch(&config, &mut NoProgress)?;
    results.push(CheckResult::new(
        "batch_converges_to_analytic",
        (report.success_rate - expected).abs() < 1.5,
        format!(
            "estimated {:.2}% vs exact {:.2}% over {} trials",
            report.success_rate, expected, report.trials
        ),
    ));

    Ok(results)
}
