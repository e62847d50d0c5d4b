//! Significance tests for resonance counts and Monte Carlo experiments.
//!
//! | Test | Null hypothesis |
//! |---|---|
//! | [`chi_squared_count`] | observed count equals its uniform-residual expectation (1 dof) |
//! | [`binomial_two_sided`] | count ~ B(n, p), exact two-sided |
//! | [`poisson_upper_tail`] | count ~ Poisson(λ), one-sided `P(X ≥ k)` |
//! | [`ks_one_sample`] | sample drawn from a given continuous law |
//! | [`EmpiricalPValue`] | observed statistic is typical of a simulated null |
//!
//! All tests return `None` for inputs on which they are undefined.

use std::fmt;

use serde::Serialize;

use crate::distributions::{Binomial, ContinuousCdf, Poisson};
use crate::special;

/// Relative tolerance when comparing pmf values in the two-sided
/// binomial test, so that ties produced by rounding count as equal.
const PMF_TIE_TOLERANCE: f64 = 1e-7;

/// A test statistic with its p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// Pearson χ² for a single count against its expectation, 1 dof.
///
/// Returns `None` if `expected` is not positive and finite.
///
/// # Examples
/// ```
/// use zeta_stats::hypothesis::chi_squared_count;
/// let r = chi_squared_count(30, 10.0).unwrap();
/// assert!((r.statistic - 40.0).abs() < 1e-12);
/// assert!(r.p_value < 1e-9);
/// ```
pub fn chi_squared_count(observed: u64, expected: f64) -> Option<TestResult> {
    if !expected.is_finite() || expected <= 0.0 {
        return None;
    }
    let diff = observed as f64 - expected;
    let statistic = diff * diff / expected;
    Some(TestResult {
        statistic,
        p_value: special::chi_squared_sf(statistic, 1.0),
    })
}

/// Exact two-sided binomial test of `k` successes in `n` trials.
///
/// The p-value sums the probabilities of every outcome no more likely
/// than `k` (minimum-likelihood method). `pmf` is unimodal, so the
/// boundary on the opposite tail is found by bisection instead of a
/// scan over `n` terms.
///
/// Returns `None` if `k > n` or `p ∉ [0, 1]`.
pub fn binomial_two_sided(k: u64, n: u64, p: f64) -> Option<f64> {
    if k > n {
        return None;
    }
    let dist = Binomial::new(n, p).ok()?;
    if p == 0.0 {
        return Some(if k == 0 { 1.0 } else { 0.0 });
    }
    if p == 1.0 {
        return Some(if k == n { 1.0 } else { 0.0 });
    }

    let np = n as f64 * p;
    let threshold = dist.ln_pmf(k) + PMF_TIE_TOLERANCE.ln_1p();
    let x = k as f64;

    let p_value = if x < np {
        // Opposite tail is [ceil(np), n] where pmf is non-increasing:
        // find the first j whose pmf drops to the threshold.
        let mut lo = np.ceil() as u64;
        let mut hi = n + 1;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if dist.ln_pmf(mid) <= threshold {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        dist.cdf(k) + dist.sf(lo)
    } else if x > np {
        // Opposite tail is [0, floor(np)] where pmf is non-decreasing:
        // count the j whose pmf stays at or below the threshold.
        let mut lo = 0_u64;
        let mut hi = np.floor() as u64 + 1;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if dist.ln_pmf(mid) <= threshold {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let lower = if lo == 0 { 0.0 } else { dist.cdf(lo - 1) };
        lower + dist.sf(k)
    } else {
        1.0
    };
    Some(p_value.clamp(0.0, 1.0))
}

/// `P(X ≥ k)` for `X ~ Poisson(λ)`.
///
/// Returns `None` if `λ` is not positive and finite.
///
/// # Examples
/// ```
/// use zeta_stats::hypothesis::poisson_upper_tail;
/// assert_eq!(poisson_upper_tail(0, 3.0), Some(1.0));
/// let p = poisson_upper_tail(1, 2.0).unwrap();
/// assert!((p - (1.0 - (-2.0_f64).exp())).abs() < 1e-12);
/// ```
pub fn poisson_upper_tail(k: u64, lambda: f64) -> Option<f64> {
    Poisson::new(lambda).ok().map(|d| d.sf(k))
}

/// One-sample Kolmogorov–Smirnov test result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KsResult {
    /// Supremum distance `D` between empirical and reference CDF.
    pub statistic: f64,
    /// Asymptotic p-value, `Q_KS((√n + 0.12 + 0.11/√n)·D)`.
    pub p_value: f64,
    pub n: usize,
}

/// Compares `sample` with the continuous law `dist`.
///
/// Returns `None` if `sample` is empty or contains NaN.
///
/// Reference: Press et al. (2007), *Numerical Recipes*, 3rd ed., §14.3.3.
pub fn ks_one_sample<D: ContinuousCdf + ?Sized>(sample: &[f64], dist: &D) -> Option<KsResult> {
    if sample.is_empty() || sample.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut sorted = sample.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let n = sorted.len();
    let nf = n as f64;
    let mut d = 0.0_f64;
    for (i, &x) in sorted.iter().enumerate() {
        let f = dist.cdf(x);
        let below = f - i as f64 / nf;
        let above = (i + 1) as f64 / nf - f;
        d = d.max(below).max(above);
    }

    let sqrt_n = nf.sqrt();
    let lambda = (sqrt_n + 0.12 + 0.11 / sqrt_n) * d;
    Some(KsResult {
        statistic: d,
        p_value: special::kolmogorov_sf(lambda),
        n,
    })
}

/// Wald–Wolfowitz runs test on a two-valued sequence.
///
/// The statistic is `z = (R − E[R]) / √Var[R]` for the observed number of
/// runs `R`, and the p-value is two-sided under the normal approximation.
/// A sequence holding only one value gives `z = 0, p = 1`.
///
/// Returns `None` for fewer than two elements.
///
/// # Examples
/// ```
/// use zeta_stats::hypothesis::runs_test;
/// let alternating: Vec<bool> = (0..40).map(|i| i % 2 == 0).collect();
/// let r = runs_test(&alternating).unwrap();
/// assert!(r.statistic > 0.0 && r.p_value < 1e-6);
/// ```
pub fn runs_test(sequence: &[bool]) -> Option<TestResult> {
    if sequence.len() < 2 {
        return None;
    }
    let n1 = sequence.iter().filter(|&&b| b).count() as f64;
    let n2 = sequence.len() as f64 - n1;
    let neutral = TestResult {
        statistic: 0.0,
        p_value: 1.0,
    };
    if n1 == 0.0 || n2 == 0.0 {
        return Some(neutral);
    }
    let runs = 1 + sequence.windows(2).filter(|w| w[0] != w[1]).count();
    let n = n1 + n2;
    let expected = 2.0 * n1 * n2 / n + 1.0;
    let variance = 2.0 * n1 * n2 * (2.0 * n1 * n2 - n) / (n * n * (n - 1.0));
    if !(variance > 0.0) {
        return Some(neutral);
    }
    let z = (runs as f64 - expected) / variance.sqrt();
    Some(TestResult {
        statistic: z,
        p_value: 1.0 - special::erf(z.abs() / std::f64::consts::SQRT_2),
    })
}

/// Conventional significance levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Significance {
    #[serde(rename = "***")]
    VeryHigh,
    #[serde(rename = "**")]
    High,
    #[serde(rename = "*")]
    Moderate,
    #[serde(rename = "n.s.")]
    NotSignificant,
}

impl Significance {
    /// `***` below 0.001, `**` below 0.01, `*` below 0.05.
    pub fn from_p_value(p: f64) -> Self {
        if p < 0.001 {
            Self::VeryHigh
        } else if p < 0.01 {
            Self::High
        } else if p < 0.05 {
            Self::Moderate
        } else {
            Self::NotSignificant
        }
    }

    /// Level implied by the statement `p < bound`.
    pub fn from_upper_bound(bound: f64) -> Self {
        if bound <= 0.001 {
            Self::VeryHigh
        } else if bound <= 0.01 {
            Self::High
        } else if bound <= 0.05 {
            Self::Moderate
        } else {
            Self::NotSignificant
        }
    }

    pub fn stars(self) -> &'static str {
        match self {
            Self::VeryHigh => "***",
            Self::High => "**",
            Self::Moderate => "*",
            Self::NotSignificant => "n.s.",
        }
    }

    pub fn is_significant(self) -> bool {
        self != Self::NotSignificant
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stars())
    }
}

/// Monte Carlo p-value: the fraction of simulated statistics at least as
/// extreme as the observed one.
///
/// With zero extreme trials the estimate is 0, but the experiment can
/// only resolve `p < 1/trials`; [`EmpiricalPValue::significance`] and the
/// `Display` impl use that bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmpiricalPValue {
    pub extreme: u64,
    pub trials: u64,
}

impl EmpiricalPValue {
    pub fn new(extreme: u64, trials: u64) -> Option<Self> {
        (trials > 0 && extreme <= trials).then_some(Self { extreme, trials })
    }

    /// Counts simulated values `≤ observed` (smaller is more extreme).
    /// NaN entries are not trials.
    pub fn lower_tail(simulated: &[f64], observed: f64) -> Option<Self> {
        let valid = simulated.iter().filter(|v| !v.is_nan());
        let (mut trials, mut extreme) = (0_u64, 0_u64);
        for &v in valid {
            trials += 1;
            if v <= observed {
                extreme += 1;
            }
        }
        Self::new(extreme, trials)
    }

    pub fn p_value(&self) -> f64 {
        self.extreme as f64 / self.trials as f64
    }

    /// Smallest p-value the experiment can resolve.
    pub fn resolution(&self) -> f64 {
        1.0 / self.trials as f64
    }

    pub fn is_bounded(&self) -> bool {
        self.extreme == 0
    }

    pub fn significance(&self) -> Significance {
        if self.is_bounded() {
            Significance::from_upper_bound(self.resolution())
        } else {
            Significance::from_p_value(self.p_value())
        }
    }
}

impl fmt::Display for EmpiricalPValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bounded() {
            write!(f, "< {:.1e}", self.resolution())
        } else {
            write!(f, "{:.6}", self.p_value())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::Uniform;
    use approx::assert_relative_eq;

    #[test]
    fn test_chi_squared_count() {
        let r = chi_squared_count(10, 10.0).unwrap();
        assert_eq!(r.statistic, 0.0);
        assert_relative_eq!(r.p_value, 1.0, epsilon = 1e-12);
        // 6.635 is the 1% critical value
        let r = chi_squared_count(0, 6.635).unwrap();
        assert_relative_eq!(r.statistic, 6.635, epsilon = 1e-12);
        assert_relative_eq!(r.p_value, 0.01, epsilon = 1e-4);
        assert!(chi_squared_count(3, 0.0).is_none());
        assert!(chi_squared_count(3, f64::NAN).is_none());
    }

    #[test]
    fn test_binomial_two_sided_small_n() {
        // B(10, 0.5), k = 2: P(X ≤ 2) + P(X ≥ 8) = 2·56/1024
        let p = binomial_two_sided(2, 10, 0.5).unwrap();
        assert_relative_eq!(p, 112.0 / 1024.0, epsilon = 1e-10);
        let p = binomial_two_sided(8, 10, 0.5).unwrap();
        assert_relative_eq!(p, 112.0 / 1024.0, epsilon = 1e-10);
        assert_eq!(binomial_two_sided(5, 10, 0.5), Some(1.0));
    }

    #[test]
    fn test_binomial_two_sided_asymmetric() {
        // brute force over the pmf
        let (k, n, prob) = (7_u64, 20_u64, 0.15);
        let dist = Binomial::new(n, prob).unwrap();
        let d = dist.pmf(k);
        let expected: f64 = (0..=n)
            .map(|i| dist.pmf(i))
            .filter(|&v| v <= d * (1.0 + 1e-7))
            .sum();
        let p = binomial_two_sided(k, n, prob).unwrap();
        assert_relative_eq!(p, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_binomial_two_sided_large_n() {
        // far above expectation in a two-million-zero dataset
        let p = binomial_two_sided(400, 2_000_000, 1e-4).unwrap();
        assert!(p < 1e-20);
        let p = binomial_two_sided(200, 2_000_000, 1e-4).unwrap();
        assert!(p > 0.9);
    }

    #[test]
    fn test_binomial_two_sided_invalid() {
        assert!(binomial_two_sided(11, 10, 0.5).is_none());
        assert!(binomial_two_sided(1, 10, 1.5).is_none());
        assert_eq!(binomial_two_sided(0, 10, 0.0), Some(1.0));
        assert_eq!(binomial_two_sided(1, 10, 0.0), Some(0.0));
    }

    #[test]
    fn test_poisson_upper_tail() {
        let p = poisson_upper_tail(3, 1.0).unwrap();
        let cdf2 = (-1.0_f64).exp() * (1.0 + 1.0 + 0.5);
        assert_relative_eq!(p, 1.0 - cdf2, epsilon = 1e-12);
        assert!(poisson_upper_tail(3, 0.0).is_none());
    }

    #[test]
    fn test_ks_uniform_grid_accepts() {
        let n = 1000;
        let sample: Vec<f64> = (0..n).map(|i| (i as f64 + 0.5) / n as f64 * 0.5).collect();
        let r = ks_one_sample(&sample, &Uniform::new(0.0, 0.5).unwrap()).unwrap();
        assert!(r.statistic <= 0.5 / n as f64 + 1e-12);
        assert!(r.p_value > 0.99);
        assert_eq!(r.n, n);
    }

    #[test]
    fn test_ks_rejects_shifted_sample() {
        let sample: Vec<f64> = (0..500).map(|i| 0.3 + i as f64 / 500.0 * 0.2).collect();
        let r = ks_one_sample(&sample, &Uniform::new(0.0, 0.5).unwrap()).unwrap();
        assert_relative_eq!(r.statistic, 0.6, epsilon = 1e-2);
        assert!(r.p_value < 1e-10);
    }

    #[test]
    fn test_ks_invalid() {
        let u = Uniform::new(0.0, 1.0).unwrap();
        assert!(ks_one_sample(&[], &u).is_none());
        assert!(ks_one_sample(&[0.1, f64::NAN], &u).is_none());
    }

    #[test]
    fn test_significance_levels() {
        assert_eq!(Significance::from_p_value(0.0005).stars(), "***");
        assert_eq!(Significance::from_p_value(0.005).stars(), "**");
        assert_eq!(Significance::from_p_value(0.03).stars(), "*");
        assert_eq!(Significance::from_p_value(0.2).stars(), "n.s.");
        assert_eq!(Significance::from_p_value(0.001).stars(), "**");
        assert!(!Significance::NotSignificant.is_significant());
    }

    #[test]
    fn test_runs_test() {
        // 10 runs of length 2: E[R] = 11, Var[R] = 36000/7600
        let blocks: Vec<bool> = (0..20).map(|i| (i / 2) % 2 == 0).collect();
        let r = runs_test(&blocks).unwrap();
        assert_relative_eq!(r.statistic, -1.0 / (36000.0_f64 / 7600.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(r.p_value, 0.6458, epsilon = 1e-3);

        // two long runs: far too few
        let clustered: Vec<bool> = (0..40).map(|i| i < 20).collect();
        let r = runs_test(&clustered).unwrap();
        assert!(r.statistic < -5.0);
        assert!(r.p_value < 1e-6);

        let constant = runs_test(&[true; 12]).unwrap();
        assert_eq!((constant.statistic, constant.p_value), (0.0, 1.0));
        assert!(runs_test(&[true]).is_none());
    }

    #[test]
    fn test_empirical_p_value() {
        let sims = [0.1, 0.2, 0.3, 0.4, f64::NAN];
        let p = EmpiricalPValue::lower_tail(&sims, 0.25).unwrap();
        assert_eq!(p.trials, 4);
        assert_eq!(p.extreme, 2);
        assert_eq!(p.p_value(), 0.5);
        assert_eq!(p.significance(), Significance::NotSignificant);
        assert_eq!(p.to_string(), "0.500000");
    }

    #[test]
    fn test_empirical_p_value_zero_hits_is_bounded() {
        let p = EmpiricalPValue::new(0, 10_000).unwrap();
        assert!(p.is_bounded());
        assert_eq!(p.p_value(), 0.0);
        assert_eq!(p.significance(), Significance::VeryHigh);
        assert_eq!(p.to_string(), "< 1.0e-4");

        // 1/100 cannot support ***
        let coarse = EmpiricalPValue::new(0, 100).unwrap();
        assert_eq!(coarse.significance(), Significance::High);
    }

    #[test]
    fn test_empirical_p_value_invalid() {
        assert!(EmpiricalPValue::new(0, 0).is_none());
        assert!(EmpiricalPValue::new(5, 4).is_none());
        assert!(EmpiricalPValue::lower_tail(&[f64::NAN], 1.0).is_none());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn binomial_p_value_in_unit_interval(n in 1_u64..500, frac in 0.0_f64..=1.0, p in 0.001_f64..0.999) {
            let k = ((n as f64) * frac).floor() as u64;
            let v = binomial_two_sided(k, n, p).unwrap();
            prop_assert!((0.0..=1.0).contains(&v));
        }

        #[test]
        fn binomial_matches_brute_force(n in 1_u64..60, frac in 0.0_f64..=1.0, p in 0.01_f64..0.99) {
            let k = ((n as f64) * frac).floor() as u64;
            let dist = Binomial::new(n, p).unwrap();
            let d = dist.pmf(k);
            let brute: f64 = (0..=n)
                .map(|i| dist.pmf(i))
                .filter(|&v| v <= d * (1.0 + 1e-7))
                .sum::<f64>()
                .min(1.0);
            let v = binomial_two_sided(k, n, p).unwrap();
            prop_assert!((v - brute).abs() < 1e-8, "k={} n={} p={} fast={} brute={}", k, n, p, v, brute);
        }

        #[test]
        fn ks_statistic_bounded(sample in prop::collection::vec(0.0_f64..1.0, 1..200)) {
            let u = crate::distributions::Uniform::new(0.0, 1.0).unwrap();
            let r = ks_one_sample(&sample, &u).unwrap();
            prop_assert!(r.statistic > 0.0 && r.statistic <= 1.0);
            prop_assert!((0.0..=1.0).contains(&r.p_value));
        }

        #[test]
        fn empirical_p_value_fraction(extreme in 0_u64..1000, extra in 1_u64..1000) {
            let p = EmpiricalPValue::new(extreme, extreme + extra).unwrap();
            prop_assert!(p.p_value() < 1.0);
            prop_assert!(p.resolution() > 0.0);
        }
    }
}
