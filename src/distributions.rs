//! Reference distributions for the hypothesis tests.
//!
//! | Distribution | Used for |
//! |---|---|
//! | [`Uniform`] | null law of modular residuals, `U(0, c/2)` |
//! | [`Exponential`] | nearest-neighbour spacings of uncorrelated (Poisson) levels |
//! | [`WignerSurmise`] | nearest-neighbour spacings predicted by GUE statistics |
//! | [`Binomial`] | number of resonant zeros out of `n` |
//! | [`Poisson`] | the same count in the rare-event limit |
//! | [`ChiSquared`] | Pearson statistic of the resonance count |
//!
//! Continuous laws implement [`ContinuousCdf`] so the Kolmogorov–Smirnov
//! test can take any of them.

use std::f64::consts::PI;

use thiserror::Error;

use crate::special;

/// Invalid distribution parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    #[error("invalid distribution parameters: {0}")]
    InvalidParameters(String),
}

/// A continuous law with a closed-form CDF.
pub trait ContinuousCdf {
    fn cdf(&self, x: f64) -> f64;
}

// ============================================================================
// Uniform
// ============================================================================

/// Continuous uniform distribution on `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    min: f64,
    max: f64,
}

impl Uniform {
    /// # Errors
    /// Returns `Err` if `min >= max` or either bound is not finite.
    pub fn new(min: f64, max: f64) -> Result<Self, DistributionError> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(DistributionError::InvalidParameters(format!(
                "Uniform requires min < max, got min={min}, max={max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

impl ContinuousCdf for Uniform {
    fn cdf(&self, x: f64) -> f64 {
        ((x - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

// ============================================================================
// Exponential
// ============================================================================

/// Exponential distribution with rate `λ`; `Exponential::unit()` is the
/// spacing law `e^{−s}` of uncorrelated levels at unit mean spacing.
#[derive(Debug, Clone, PartialEq)]
pub struct Exponential {
    rate: f64,
}

impl Exponential {
    pub fn new(rate: f64) -> Result<Self, DistributionError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(DistributionError::InvalidParameters(format!(
                "Exponential requires rate > 0, got {rate}"
            )));
        }
        Ok(Self { rate })
    }

    pub fn unit() -> Self {
        Self { rate: 1.0 }
    }

    pub fn pdf(&self, x: f64) -> f64 {
        if x < 0.0 {
            0.0
        } else {
            self.rate * (-self.rate * x).exp()
        }
    }
}

impl ContinuousCdf for Exponential {
    fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            0.0
        } else {
            -(-self.rate * x).exp_m1()
        }
    }
}

// ============================================================================
// Wigner surmise (GUE, β = 2)
// ============================================================================

/// GUE Wigner surmise for unit-mean nearest-neighbour spacings.
///
/// # Mathematical Definition
/// - PDF: p(s) = (32/π²) s² exp(−4s²/π)
/// - CDF: F(s) = erf(2s/√π) − (4s/π) exp(−4s²/π)
/// - Mean: 1
///
/// Reference: Mehta (2004), *Random Matrices*, 3rd ed., §1.5.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WignerSurmise;

impl WignerSurmise {
    pub fn pdf(&self, s: f64) -> f64 {
        if s < 0.0 {
            return 0.0;
        }
        32.0 / (PI * PI) * s * s * (-4.0 * s * s / PI).exp()
    }
}

impl ContinuousCdf for WignerSurmise {
    fn cdf(&self, s: f64) -> f64 {
        if s <= 0.0 {
            return 0.0;
        }
        let value = special::erf(2.0 * s / PI.sqrt()) - 4.0 * s / PI * (-4.0 * s * s / PI).exp();
        value.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Binomial
// ============================================================================

/// Binomial distribution B(n, p).
///
/// Tail probabilities go through the regularized incomplete beta
/// function, so they stay accurate for `n` in the millions:
/// - `P(X ≤ k) = I_{1−p}(n − k, k + 1)`
/// - `P(X ≥ k) = I_p(k, n − k + 1)`
#[derive(Debug, Clone, PartialEq)]
pub struct Binomial {
    n: u64,
    p: f64,
}

impl Binomial {
    /// # Errors
    /// Returns `Err` if `p` is outside `[0, 1]`.
    pub fn new(n: u64, p: f64) -> Result<Self, DistributionError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(DistributionError::InvalidParameters(format!(
                "Binomial requires p in [0, 1], got {p}"
            )));
        }
        Ok(Self { n, p })
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn p(&self) -> f64 {
        self.p
    }

    pub fn mean(&self) -> f64 {
        self.n as f64 * self.p
    }

    /// Most likely count, `⌊(n + 1)p⌋` capped at `n`.
    pub fn mode(&self) -> u64 {
        (((self.n + 1) as f64 * self.p).floor() as u64).min(self.n)
    }

    pub fn ln_pmf(&self, k: u64) -> f64 {
        if k > self.n {
            return f64::NEG_INFINITY;
        }
        if self.p == 0.0 {
            return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
        }
        if self.p == 1.0 {
            return if k == self.n { 0.0 } else { f64::NEG_INFINITY };
        }
        special::ln_choose(self.n, k)
            + k as f64 * self.p.ln()
            + (self.n - k) as f64 * (-self.p).ln_1p()
    }

    pub fn pmf(&self, k: u64) -> f64 {
        self.ln_pmf(k).exp()
    }

    /// `P(X ≤ k)`.
    pub fn cdf(&self, k: u64) -> f64 {
        if k >= self.n {
            return 1.0;
        }
        special::regularized_incomplete_beta(1.0 - self.p, (self.n - k) as f64, k as f64 + 1.0)
    }

    /// `P(X ≥ k)`.
    pub fn sf(&self, k: u64) -> f64 {
        if k == 0 {
            return 1.0;
        }
        if k > self.n {
            return 0.0;
        }
        special::regularized_incomplete_beta(self.p, k as f64, (self.n - k + 1) as f64)
    }
}

// ============================================================================
// Poisson
// ============================================================================

/// Poisson distribution with mean `λ`.
///
/// - `P(X ≤ k) = Q(k + 1, λ)`
/// - `P(X ≥ k) = P(k, λ)`
#[derive(Debug, Clone, PartialEq)]
pub struct Poisson {
    lambda: f64,
}

impl Poisson {
    pub fn new(lambda: f64) -> Result<Self, DistributionError> {
        if !lambda.is_finite() || lambda <= 0.0 {
            return Err(DistributionError::InvalidParameters(format!(
                "Poisson requires λ > 0, got {lambda}"
            )));
        }
        Ok(Self { lambda })
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn pmf(&self, k: u64) -> f64 {
        let k = k as f64;
        (k * self.lambda.ln() - self.lambda - special::ln_gamma(k + 1.0)).exp()
    }

    pub fn cdf(&self, k: u64) -> f64 {
        special::regularized_upper_gamma(k as f64 + 1.0, self.lambda)
    }

    pub fn sf(&self, k: u64) -> f64 {
        if k == 0 {
            1.0
        } else {
            special::regularized_lower_gamma(k as f64, self.lambda)
        }
    }
}

// ============================================================================
// Chi-squared
// ============================================================================

/// χ² distribution with `k` degrees of freedom.
#[derive(Debug, Clone, PartialEq)]
pub struct ChiSquared {
    dof: f64,
}

impl ChiSquared {
    pub fn new(dof: f64) -> Result<Self, DistributionError> {
        if !dof.is_finite() || dof <= 0.0 {
            return Err(DistributionError::InvalidParameters(format!(
                "ChiSquared requires k > 0, got {dof}"
            )));
        }
        Ok(Self { dof })
    }

    pub fn dof(&self) -> f64 {
        self.dof
    }

    pub fn sf(&self, x: f64) -> f64 {
        special::chi_squared_sf(x, self.dof)
    }
}

impl ContinuousCdf for ChiSquared {
    fn cdf(&self, x: f64) -> f64 {
        special::regularized_lower_gamma(self.dof / 2.0, x.max(0.0) / 2.0)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn wigner_cdf_monotonic(s1 in 0.0_f64..5.0, s2 in 0.0_f64..5.0) {
            let (lo, hi) = if s1 <= s2 { (s1, s2) } else { (s2, s1) };
            let w = WignerSurmise;
            prop_assert!(w.cdf(lo) <= w.cdf(hi) + 1e-12);
        }

        #[test]
        fn binomial_cdf_in_unit_interval(n in 1_u64..500, p in 0.001_f64..0.999, k in 0_u64..500) {
            let b = Binomial::new(n, p).unwrap();
            let c = b.cdf(k);
            prop_assert!((0.0..=1.0 + 1e-12).contains(&c));
        }

        #[test]
        fn poisson_tails_complement(lambda in 0.1_f64..200.0, k in 0_u64..300) {
            let p = Poisson::new(lambda).unwrap();
            prop_assert!((p.cdf(k) + p.sf(k + 1) - 1.0).abs() < 1e-9);
        }
    }
}
