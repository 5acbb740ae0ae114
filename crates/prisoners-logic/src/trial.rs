//! One trial: shuffle the drawers once, then let every prisoner search.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::permutation::Permutation;
use crate::search::finds_own_number;

/// True iff every prisoner `1..=len` finds their own number within
/// `max_opens`. Stops at the first prisoner who fails.
pub fn all_prisoners_freed(perm: &Permutation, max_opens: u32) -> bool {
    (1..=perm.len() as u32).all(|p| finds_own_number(perm, p, max_opens))
}

/// Run a complete trial on a freshly shuffled set of drawers.
pub fn run_trial(prisoners: u32, max_opens: u32, rng: &mut impl Rng) -> bool {
    let perm = Permutation::shuffled(prisoners, rng);
    all_prisoners_freed(&perm, max_opens)
}

/// Independent RNG for trial `index` of a batch seeded with `base_seed`.
///
/// Trial randomness depends only on `(base_seed, index)`, never on which
/// thread or process runs the trial. Both values go into the key
/// separately, so every pair gets its own stream: trial `i + 1` of seed `S`
/// shares nothing with trial `i` of seed `S + 1`.
pub fn trial_rng(base_seed: u64, index: u64) -> StdRng {
    let mut key = <StdRng as SeedableRng>::Seed::default();
    key[..8].copy_from_slice(&base_seed.to_le_bytes());
    key[8..16].copy_from_slice(&index.to_le_bytes());
    StdRng::from_seed(key)
}

/// Run trial `index` of a batch.
pub fn run_indexed_trial(prisoners: u32, max_opens: u32, base_seed: u64, index: u64) -> bool {
    let mut rng = trial_rng(base_seed, index);
    run_trial(prisoners, max_opens, &mut rng)
}
