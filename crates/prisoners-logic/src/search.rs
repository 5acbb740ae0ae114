//! Chain-following search for a single prisoner.
//!
//! Prisoner `p` opens drawer `p` first, then always opens the drawer named
//! by the slip just found. The walk stays inside the cycle containing `p`,
//! so it reaches `p`'s own slip after exactly that cycle's length in opens.

use crate::permutation::Permutation;

/// Number of opens prisoner `prisoner` needs, or `None` if the budget runs
/// out first.
pub fn opens_needed(perm: &Permutation, prisoner: u32, max_opens: u32) -> Option<u32> {
    let mut drawer = prisoner;
    for opened in 1..=max_opens {
        let slip = perm.drawer(drawer);
        if slip == prisoner {
            return Some(opened);
        }
        drawer = slip;
    }
    None
}

/// Whether `prisoner` finds their own number within `max_opens` drawers.
#[inline]
pub fn finds_own_number(perm: &Permutation, prisoner: u32, max_opens: u32) -> bool {
    opens_needed(perm, prisoner, max_opens).is_some()
}
