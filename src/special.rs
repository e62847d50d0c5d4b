//! Special functions behind the p-values reported by [`crate::hypothesis`].
//!
//! Everything is expressed through two workhorses, the regularized
//! incomplete gamma and beta functions, so that tail probabilities of the
//! χ², Poisson and binomial laws share one well-tested core.
//! Upper tails are computed directly (never as `1 − lower`) wherever the
//! lower tail is close to 1, which matters for the extreme p-values a
//! resonance scan over millions of zeros produces.

use std::f64::consts::PI;

const EPS: f64 = 1e-15;
const TINY: f64 = 1e-300;
/// Continued fractions need O(√max(a, b)) steps; counts near 2·10⁶ need ~1.5k.
const MAX_ITER: usize = 5000;

// ============================================================================
// Gamma family
// ============================================================================

/// Natural log of the Gamma function, ln Γ(x).
///
/// # Algorithm
/// Lanczos approximation (g = 7, n = 9) with the reflection formula for
/// `x < 0.5`. Relative accuracy ≈ 1e-15 for positive arguments.
///
/// Reference: Lanczos (1964), *SIAM J. Numer. Anal.* B1, pp. 86–96.
///
/// # Examples
/// ```
/// use zeta_stats::special::ln_gamma;
/// assert!((ln_gamma(5.0) - 24.0_f64.ln()).abs() < 1e-12);
/// ```
pub fn ln_gamma(x: f64) -> f64 {
    #[allow(clippy::excessive_precision)]
    const LANCZOS: [f64; 9] = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if x < 0.5 {
        return (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let z = x - 1.0;
    let series = LANCZOS[1..]
        .iter()
        .enumerate()
        .fold(LANCZOS[0], |acc, (i, &c)| acc + c / (z + i as f64 + 1.0));
    let t = z + 7.5;
    0.5 * (2.0 * PI).ln() + (z + 0.5) * t.ln() - t + series.ln()
}

/// ln C(n, k) via log-gamma; `-inf` when `k > n`.
pub fn ln_choose(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

/// Regularized lower incomplete gamma P(a, x) = γ(a, x) / Γ(a).
///
/// # Examples
/// ```
/// use zeta_stats::special::regularized_lower_gamma;
/// let p = regularized_lower_gamma(1.0, 2.0);
/// assert!((p - (1.0 - (-2.0_f64).exp())).abs() < 1e-12);
/// ```
pub fn regularized_lower_gamma(a: f64, x: f64) -> f64 {
    if x.is_nan() || a.is_nan() || a <= 0.0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x < a + 1.0 {
        gamma_series(a, x)
    } else {
        1.0 - gamma_continued_fraction(a, x)
    }
}

/// Regularized upper incomplete gamma Q(a, x) = 1 − P(a, x).
///
/// Computed directly in the tail so tiny upper probabilities keep their
/// relative precision.
pub fn regularized_upper_gamma(a: f64, x: f64) -> f64 {
    if x.is_nan() || a.is_nan() || a <= 0.0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 1.0;
    }
    if x < a + 1.0 {
        1.0 - gamma_series(a, x)
    } else {
        gamma_continued_fraction(a, x)
    }
}

fn gamma_prefactor(a: f64, x: f64) -> f64 {
    (a * x.ln() - x - ln_gamma(a)).exp()
}

/// Series for P(a, x), convergent for `x < a + 1`.
fn gamma_series(a: f64, x: f64) -> f64 {
    let mut denom = a;
    let mut term = 1.0 / a;
    let mut sum = term;
    for _ in 0..MAX_ITER {
        denom += 1.0;
        term *= x / denom;
        sum += term;
        if term.abs() < sum.abs() * EPS {
            break;
        }
    }
    sum * gamma_prefactor(a, x)
}

/// Modified Lentz continued fraction for Q(a, x), used for `x ≥ a + 1`.
///
/// Reference: Press et al. (2007), *Numerical Recipes*, 3rd ed., §6.2.
fn gamma_continued_fraction(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / TINY;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..=MAX_ITER {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < TINY {
            d = TINY;
        }
        c = b + an / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h * gamma_prefactor(a, x)
}

// ============================================================================
// Beta family
// ============================================================================

/// ln B(a, b) = ln Γ(a) + ln Γ(b) − ln Γ(a + b).
pub fn ln_beta(a: f64, b: f64) -> f64 {
    ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)
}

/// Regularized incomplete beta function I_x(a, b).
///
/// # Algorithm
/// Lentz continued fraction, evaluated on whichever side of the mean
/// `(a + 1)/(a + b + 2)` converges, using `I_x(a,b) = 1 − I_{1−x}(b,a)`.
///
/// # Examples
/// ```
/// use zeta_stats::special::regularized_incomplete_beta;
/// assert_eq!(regularized_incomplete_beta(0.0, 2.0, 3.0), 0.0);
/// assert!((regularized_incomplete_beta(0.5, 1.0, 1.0) - 0.5).abs() < 1e-12);
/// ```
pub fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x.is_nan() || a <= 0.0 || b <= 0.0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    if x > (a + 1.0) / (a + b + 2.0) {
        return 1.0 - regularized_incomplete_beta(1.0 - x, b, a);
    }
    let ln_prefix = a * x.ln() + b * (1.0 - x).ln() - ln_beta(a, b);
    ln_prefix.exp() / a * beta_continued_fraction(x, a, b)
}

fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    let mut c = 1.0;
    let mut d = 1.0 / (1.0 - (a + b) * x / (a + 1.0)).max(TINY);
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let even = m * (b - m) * x / ((a + 2.0 * m - 1.0) * (a + 2.0 * m));
        d = 1.0 / (1.0 + even * d).max(TINY);
        c = (1.0 + even / c).max(TINY);
        h *= d * c;

        let odd = -(a + m) * (a + b + m) * x / ((a + 2.0 * m) * (a + 2.0 * m + 1.0));
        d = 1.0 / (1.0 + odd * d).max(TINY);
        c = (1.0 + odd / c).max(TINY);
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

// ============================================================================
// Error function
// ============================================================================

/// Error function, via erf(x) = sign(x)·P(½, x²).
///
/// Accurate to near machine precision, which the Wigner-surmise CDF
/// needs at small spacings.
///
/// # Examples
/// ```
/// use zeta_stats::special::erf;
/// assert!((erf(1.0) - 0.8427007929497149).abs() < 1e-12);
/// ```
pub fn erf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let p = regularized_lower_gamma(0.5, x * x);
    if x < 0.0 {
        -p
    } else {
        p
    }
}

/// Upper tail of the χ² distribution with `k` degrees of freedom.
///
/// # Examples
/// ```
/// use zeta_stats::special::chi_squared_sf;
/// // 3.841 is the 5% critical value for one degree of freedom.
/// assert!((chi_squared_sf(3.841, 1.0) - 0.05).abs() < 1e-3);
/// ```
pub fn chi_squared_sf(x: f64, k: f64) -> f64 {
    if x.is_nan() || k.is_nan() || k <= 0.0 {
        return f64::NAN;
    }
    regularized_upper_gamma(k / 2.0, x.max(0.0) / 2.0)
}

// ============================================================================
// Kolmogorov distribution
// ============================================================================

/// Survival function of the Kolmogorov distribution,
/// `Q(λ) = 2 Σ_{j≥1} (−1)^{j−1} exp(−2 j² λ²)`.
///
/// Returns 1 for small `λ`, where the alternating series converges too
/// slowly to be useful and the probability is 1 to working precision.
///
/// Reference: Press et al. (2007), *Numerical Recipes*, 3rd ed., §14.3.3.
///
/// # Examples
/// ```
/// use zeta_stats::special::kolmogorov_sf;
/// assert!((kolmogorov_sf(1.36) - 0.0495).abs() < 1e-3);
/// ```
pub fn kolmogorov_sf(lambda: f64) -> f64 {
    if lambda.is_nan() {
        return f64::NAN;
    }
    if lambda < 0.2 {
        return 1.0;
    }
    let a2 = -2.0 * lambda * lambda;
    let mut sign = 2.0;
    let mut sum = 0.0;
    let mut prev_term = 0.0_f64;
    for j in 1..=100 {
        let j = j as f64;
        let term = sign * (a2 * j * j).exp();
        sum += term;
        if term.abs() <= 1e-3 * prev_term || term.abs() <= 1e-10 * sum.abs() {
            return sum.clamp(0.0, 1.0);
        }
        sign = -sign;
        prev_term = term.abs();
    }
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- gamma ---

    #[test]
    fn test_ln_gamma_factorials() {
        for (n, fact) in [(1.0, 1.0), (2.0, 1.0), (4.0, 6.0), (11.0, 3628800.0_f64)] {
            assert!((ln_gamma(n) - fact.ln()).abs() < 1e-10, "ln Γ({n})");
        }
    }

    #[test]
    fn test_ln_gamma_half() {
        assert!((ln_gamma(0.5) - PI.sqrt().ln()).abs() < 1e-12);
    }

    #[test]
    fn test_ln_choose() {
        assert!((ln_choose(5, 2) - 10.0_f64.ln()).abs() < 1e-10);
        assert_eq!(ln_choose(3, 4), f64::NEG_INFINITY);
        assert!(ln_choose(7, 0).abs() < 1e-10);
    }

    #[test]
    fn test_incomplete_gamma_complementary() {
        for &(a, x) in &[(0.5, 0.1), (2.0, 1.0), (5.0, 9.0), (30.0, 20.0)] {
            let sum = regularized_lower_gamma(a, x) + regularized_upper_gamma(a, x);
            assert!((sum - 1.0).abs() < 1e-12, "P + Q for a={a}, x={x}");
        }
    }

    #[test]
    fn test_incomplete_gamma_edges() {
        assert_eq!(regularized_lower_gamma(2.0, 0.0), 0.0);
        assert_eq!(regularized_upper_gamma(2.0, 0.0), 1.0);
        assert!(regularized_lower_gamma(-1.0, 1.0).is_nan());
    }

    #[test]
    fn test_upper_gamma_tail_precision() {
        // Q(1, x) = exp(-x) exactly; 1 - P would underflow to 0 here.
        let q = regularized_upper_gamma(1.0, 50.0);
        assert!((q / (-50.0_f64).exp() - 1.0).abs() < 1e-10);
    }

    // --- beta ---

    #[test]
    fn test_incomplete_beta_known() {
        // I_x(1, b) = 1 - (1-x)^b
        let v = regularized_incomplete_beta(0.3, 1.0, 3.0);
        assert!((v - (1.0 - 0.7_f64.powi(3))).abs() < 1e-12);
        // I_x(a, 1) = x^a
        let v = regularized_incomplete_beta(0.4, 2.5, 1.0);
        assert!((v - 0.4_f64.powf(2.5)).abs() < 1e-12);
    }

    #[test]
    fn test_incomplete_beta_large_parameters() {
        // Symmetric case: I_0.5(a, a) = 0.5 for any a.
        let v = regularized_incomplete_beta(0.5, 50_000.0, 50_000.0);
        assert!((v - 0.5).abs() < 1e-8, "got {v}");
    }

    // --- erf ---

    #[test]
    fn test_erf_known() {
        assert_eq!(erf(0.0), 0.0);
        assert!((erf(0.5) - 0.5204998778130465).abs() < 1e-12);
        assert!((erf(-1.0) + 0.8427007929497149).abs() < 1e-12);
    }

    #[test]
    fn test_chi_squared_sf() {
        assert!((chi_squared_sf(6.635, 1.0) - 0.01).abs() < 1e-4);
        assert!((chi_squared_sf(5.991, 2.0) - 0.05).abs() < 1e-3);
        assert_eq!(chi_squared_sf(0.0, 3.0), 1.0);
        assert!(chi_squared_sf(1.0, 0.0).is_nan());
    }

    // --- kolmogorov ---

    #[test]
    fn test_kolmogorov_sf() {
        assert_eq!(kolmogorov_sf(0.1), 1.0);
        assert!((kolmogorov_sf(1.0) - 0.26999967).abs() < 1e-6);
        assert!(kolmogorov_sf(3.0) < 1e-6);
    }
}
