//! Single-line progress display for sequential batches.

use std::time::Instant;

use prisoners_logic::TrialObserver;

/// Redraws a `\r`-terminated status line on stderr roughly every percent.
pub struct ProgressLine {
    step: u64,
    escaped: u64,
    started: Instant,
}

impl ProgressLine {
    pub fn new(total: u64) -> Self {
        Self {
            step: (total / 100).max(1),
            escaped: 0,
            started: Instant::now(),
        }
    }
}

impl TrialObserver for ProgressLine {
    fn on_trial(&mut self, completed: u64, total: u64, freed: bool) {
        if freed {
            self.escaped += 1;
        }
        if completed % self.step != 0 && completed != total {
            return;
        }
        let percent = completed * 100 / total.max(1);
        eprint!(
            "\r{:>3}% | {}/{} trials | {} escaped | {:.1}s",
            percent,
            completed,
            total,
            self.escaped,
            self.started.elapsed().as_secs_f64()
        );
        if completed == total {
            eprintln!();
        }
    }
}
