//! Number-of-false-alarms statistic for aligned-pixel counts.
//!
//! Under the a-contrario model each pixel is aligned with probability `p`
//! independently; a rectangle with `k` aligned pixels out of `n` is
//! meaningful when the binomial tail times the number of tests is small.
//! Values are returned as `-log10(NFA)`, so larger is more significant and
//! `> 0` means fewer than one expected false detection.

/// log10 of the number of rectangle tests on a `width x height` image.
pub fn log_number_of_tests(width: usize, height: usize) -> f64 {
    let w = (width.max(1)) as f64;
    let h = (height.max(1)) as f64;
    5.0 * (w.log10() + h.log10()) / 2.0 + 11f64.log10()
}

/// `-log10(NFA)` for `k` aligned pixels out of `n` at precision `p`.
pub fn log_nfa(n: usize, k: usize, p: f64, log_nt: f64) -> f64 {
    if n == 0 || k == 0 || !(p > 0.0 && p < 1.0) {
        return -log_nt;
    }
    if k >= n {
        return -log_nt - n as f64 * p.log10();
    }

    let nf = n as f64;
    let kf = k as f64;
    let log_p = p.ln();
    let log_q = (1.0 - p).ln();
    let log_first = log_gamma(nf + 1.0) - log_gamma(kf + 1.0) - log_gamma(nf - kf + 1.0)
        + kf * log_p
        + (nf - kf) * log_q;

    // Sum the tail relative to its first term to stay clear of underflow.
    let ratio = p / (1.0 - p);
    let mut term = 1.0f64;
    let mut tail = 1.0f64;
    for i in k..n {
        term *= (nf - i as f64) / (i as f64 + 1.0) * ratio;
        tail += term;
        if term < tail * 1e-12 {
            break;
        }
    }

    let log10_tail = (log_first + tail.ln()) / std::f64::consts::LN_10;
    -log10_tail - log_nt
}

/// Lanczos approximation of `ln(Gamma(x))` for `x > 0`.
pub fn log_gamma(x: f64) -> f64 {
    const Q: [f64; 7] = [
        75122.633_153_0,
        80916.627_895_2,
        36308.295_147_7,
        8687.245_297_05,
        1168.926_494_79,
        83.867_604_342_4,
        2.506_628_275_11,
    ];
    let mut a = (x + 0.5) * (x + 5.5).ln() - (x + 5.5);
    let mut b = 0.0;
    for (n, q) in Q.iter().enumerate() {
        a -= (x + n as f64).ln();
        b += q * x.powi(n as i32);
    }
    a + b.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_gamma_matches_factorials() {
        // Gamma(5) = 24, Gamma(11) = 3628800
        assert!((log_gamma(5.0) - 24f64.ln()).abs() < 1e-6);
        assert!((log_gamma(11.0) - 3_628_800f64.ln()).abs() < 1e-6);
    }

    #[test]
    fn fully_aligned_runs_are_significant() {
        let log_nt = log_number_of_tests(64, 64);
        assert!(log_nfa(60, 60, 0.125, log_nt) > 0.0);
        assert!(log_nfa(60, 58, 0.125, log_nt) > 0.0);
    }

    #[test]
    fn chance_level_alignment_is_rejected() {
        let log_nt = log_number_of_tests(64, 64);
        assert!(log_nfa(80, 10, 0.125, log_nt) < 0.0);
        assert_eq!(log_nfa(0, 0, 0.125, log_nt), -log_nt);
    }

    #[test]
    fn more_aligned_pixels_never_hurt() {
        let log_nt = log_number_of_tests(100, 100);
        let mut last = f64::NEG_INFINITY;
        for k in 0..=40 {
            let v = log_nfa(40, k, 0.125, log_nt);
            assert!(v >= last - 1e-9, "k={k}: {v} < {last}");
            last = v;
        }
    }
}
