//! Exact reference probability for the chain strategy.
//!
//! With the chain strategy every prisoner in a cycle of length `L` needs
//! exactly `L` opens, so a trial succeeds iff the random permutation has no
//! cycle longer than `K`. Writing `a(m)` for that probability over `m`
//! elements and conditioning on the length `j` of the cycle through one
//! fixed element (uniform on `1..=m`):
//!
//! `a(0) = 1`, `a(m) = (1/m) · Σ_{j=1..=min(K, m)} a(m - j)`.

/// Probability (0.0..=1.0) that all `prisoners` are freed with `allowed_opens`.
pub fn escape_probability(prisoners: u32, allowed_opens: u32) -> f64 {
    let n = prisoners as usize;
    let k = allowed_opens as usize;
    if k >= n {
        return 1.0;
    }
    let mut a = vec![0.0f64; n + 1];
    a[0] = 1.0;
    // Running sum of the last `k` entries keeps this O(n).
    let mut window = 0.0;
    for m in 1..=n {
        window += a[m - 1];
        if m > k {
            window -= a[m - 1 - k];
        }
        a[m] = window / m as f64;
    }
    a[n]
}

/// Same as [`escape_probability`], as a percentage.
pub fn escape_percentage(prisoners: u32, allowed_opens: u32) -> f64 {
    escape_probability(prisoners, allowed_opens) * 100.0
}
