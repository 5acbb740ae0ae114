//! Drawer permutations.
//!
//! A `Permutation` maps drawer number → prisoner number, both 1-based.
//! It is always a bijection over `1..=len`: every constructor either builds
//! one directly or validates the values it is given.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::ConfigError;

/// Contents of every drawer for one trial. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    /// Index `d - 1` holds the prisoner number found in drawer `d`.
    slips: Vec<u32>,
}

impl Permutation {
    /// Uniformly random permutation of `1..=n` (Fisher–Yates shuffle).
    pub fn shuffled(n: u32, rng: &mut impl Rng) -> Self {
        let mut slips: Vec<u32> = (1..=n).collect();
        slips.shuffle(rng);
        Self { slips }
    }

    /// Drawer `d` holds prisoner `d`.
    pub fn identity(n: u32) -> Self {
        Self {
            slips: (1..=n).collect(),
        }
    }

    /// Build from explicit drawer contents, `values[d - 1]` being drawer `d`.
    pub fn from_values(values: Vec<u32>) -> Result<Self, ConfigError> {
        let len = values.len();
        if len == 0 {
            return Err(ConfigError::NoPrisoners);
        }
        let mut seen = vec![false; len];
        for (i, &v) in values.iter().enumerate() {
            if v == 0 || v as usize > len {
                return Err(ConfigError::NotAPermutation {
                    len,
                    detail: format!("drawer {} holds {}", i + 1, v),
                });
            }
            let slot = &mut seen[v as usize - 1];
            if *slot {
                return Err(ConfigError::NotAPermutation {
                    len,
                    detail: format!("{} appears more than once", v),
                });
            }
            *slot = true;
        }
        Ok(Self { slips: values })
    }

    /// Prisoner number inside drawer `drawer` (1-based).
    ///
    /// Panics if `drawer` is outside `1..=len`.
    #[inline]
    pub fn drawer(&self, drawer: u32) -> u32 {
        self.slips[drawer as usize - 1]
    }

    pub fn len(&self) -> usize {
        self.slips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slips.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.slips
    }

    /// Lengths of the permutation's cycles, in order of their smallest drawer.
    pub fn cycle_lengths(&self) -> Vec<usize> {
        let mut visited = vec![false; self.slips.len()];
        let mut lengths = Vec::new();
        for start in 0..self.slips.len() {
            if visited[start] {
                continue;
            }
            let mut len = 0;
            let mut cur = start;
            while !visited[cur] {
                visited[cur] = true;
                len += 1;
                cur = self.slips[cur] as usize - 1;
            }
            lengths.push(len);
        }
        lengths
    }

    /// Length of the longest cycle. A trial succeeds iff this is at most the
    /// open budget.
    pub fn longest_cycle(&self) -> usize {
        self.cycle_lengths().into_iter().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn is_bijection(perm: &Permutation) -> bool {
        let mut sorted = perm.as_slice().to_vec();
        sorted.sort_unstable();
        sorted.iter().copied().eq(1..=perm.len() as u32)
    }

    #[test]
    fn test_shuffled_is_bijection() {
        let mut rng = StdRng::seed_from_u64(42);
        for n in 1..=64 {
            let perm = Permutation::shuffled(n, &mut rng);
            assert_eq!(perm.len(), n as usize);
            assert!(is_bijection(&perm), "n={} gave {:?}", n, perm.as_slice());
        }
    }

    #[test]
    fn test_single_drawer() {
        let mut rng = StdRng::seed_from_u64(1);
        let perm = Permutation::shuffled(1, &mut rng);
        assert_eq!(perm.as_slice(), &[1]);
    }

    #[test]
    fn test_shuffle_is_roughly_uniform() {
        // 3! = 6 orderings, 6000 draws: each should land near 1000.
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = std::collections::HashMap::new();
        for _ in 0..6000 {
            let perm = Permutation::shuffled(3, &mut rng);
            *counts.entry(perm.as_slice().to_vec()).or_insert(0u32) += 1;
        }
        assert_eq!(counts.len(), 6);
        for (order, count) in &counts {
            assert!(
                (850..=1150).contains(count),
                "ordering {:?} drawn {} times",
                order,
                count
            );
        }
    }

    #[test]
    fn test_from_values_rejects_duplicates() {
        let err = Permutation::from_values(vec![1, 2, 2]).unwrap_err();
        assert!(matches!(err, ConfigError::NotAPermutation { len: 3, .. }));
    }

    #[test]
    fn test_from_values_rejects_out_of_range() {
        assert!(Permutation::from_values(vec![0, 1]).is_err());
        assert!(Permutation::from_values(vec![1, 3]).is_err());
        assert_eq!(
            Permutation::from_values(vec![]).unwrap_err(),
            ConfigError::NoPrisoners
        );
    }

    #[test]
    fn test_drawer_lookup_is_one_based() {
        let perm = Permutation::from_values(vec![2, 3, 4, 1]).unwrap();
        assert_eq!(perm.drawer(1), 2);
        assert_eq!(perm.drawer(4), 1);
    }

    #[test]
    fn test_cycle_lengths() {
        let perm = Permutation::from_values(vec![3, 7, 1, 4, 8, 2, 9, 5, 10, 6]).unwrap();
        assert_eq!(perm.cycle_lengths(), vec![2, 5, 1, 2]);
        assert_eq!(perm.longest_cycle(), 5);

        assert_eq!(Permutation::identity(5).cycle_lengths(), vec![1; 5]);
        let ring = Permutation::from_values(vec![2, 3, 4, 1]).unwrap();
        assert_eq!(ring.longest_cycle(), 4);
    }

    #[test]
    fn test_cycle_lengths_sum_to_len() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let perm = Permutation::shuffled(100, &mut rng);
            assert_eq!(perm.cycle_lengths().iter().sum::<usize>(), 100);
        }
    }
}
