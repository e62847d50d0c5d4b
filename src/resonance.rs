//! Modular resonance between zeros and a constant.
//!
//! A zero `γ` *resonates* with a constant `c` when it lies close to an
//! integer multiple of `c`. The distance is the modular residual
//!
//! ```text
//! r(γ, c) = min(γ mod c, c − γ mod c) ∈ [0, c/2]
//! ```
//!
//! If the heights carried no information about `c`, residuals would be
//! uniform on `[0, c/2]` and a tolerance `tol` would catch a fraction
//! `2·tol/c` of the zeros. [`ResonanceStatistics`] measures departures from
//! that baseline.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::PhysicalConstant;
use crate::dataset::ZeroRecord;
use crate::distributions::Uniform;
use crate::hypothesis::{self, KsResult, TestResult};
use crate::stats;

/// Residuals needed before the uniformity KS test is run.
pub const MIN_RESIDUALS_FOR_KS: usize = 1000;

/// Expected count below which the χ² approximation is skipped.
pub const MIN_EXPECTED_FOR_CHI2: f64 = 5.0;

/// Hits needed for the hit-residual KS test.
pub const MIN_HITS_FOR_KS: usize = 10;

/// Hits needed for the runs test on index gaps.
pub const MIN_HITS_FOR_RUNS: usize = 20;

/// Hits needed for the lag-1 autocorrelation.
pub const MIN_HITS_FOR_AUTOCORRELATION: usize = 30;

/// Distance from `gamma` to the nearest multiple of `c`.
///
/// # Examples
/// ```
/// use zeta_stats::resonance::residual;
/// assert!((residual(10.3, 1.0) - 0.3).abs() < 1e-12);
/// assert!((residual(10.8, 1.0) - 0.2).abs() < 1e-12);
/// ```
#[inline]
pub fn residual(gamma: f64, c: f64) -> f64 {
    let m = gamma % c;
    m.min(c - m)
}

/// Index into `records` of the zero closest to a multiple of `c`, with its
/// residual. Ties keep the first zero.
pub(crate) fn best_residual(records: &[ZeroRecord], c: f64) -> Option<(usize, f64)> {
    if !c.is_finite() || c <= 0.0 {
        return None;
    }
    let mut best: Option<(usize, f64)> = None;
    for (i, r) in records.iter().enumerate() {
        let q = residual(r.gamma, c);
        if best.is_none_or(|(_, b)| q < b) {
            best = Some((i, q));
        }
    }
    best
}

/// The closest approach of any zero to a multiple of a constant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resonance {
    pub constant: String,
    pub value: f64,
    /// Residual of the best zero, in the units of `γ`.
    pub quality: f64,
    /// `quality / value · 100`.
    pub error_percent: f64,
    pub zero_index: u64,
    pub gamma: f64,
    /// Energy scale attributed to the zero, `γ / 10`.
    pub energy_estimate: f64,
}

/// Best resonance of `c` over `records`.
///
/// Returns `None` for empty input or a non-positive or non-finite `c`.
pub fn best_resonance(records: &[ZeroRecord], name: &str, c: f64) -> Option<Resonance> {
    let (i, quality) = best_residual(records, c)?;
    let zero = records[i];
    Some(Resonance {
        constant: name.to_string(),
        value: c,
        quality,
        error_percent: quality / c * 100.0,
        zero_index: zero.index,
        gamma: zero.gamma,
        energy_estimate: zero.gamma / 10.0,
    })
}

/// A zero within tolerance of a multiple of `c`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResonanceHit {
    pub zero_index: u64,
    pub gamma: f64,
    pub residual: f64,
}

/// Every zero whose residual is strictly below `tol`.
pub fn resonances_within(records: &[ZeroRecord], c: f64, tol: f64) -> Vec<ResonanceHit> {
    if !c.is_finite() || c <= 0.0 {
        return Vec::new();
    }
    records
        .iter()
        .filter_map(|r| {
            let q = residual(r.gamma, c);
            (q < tol).then_some(ResonanceHit {
                zero_index: r.index,
                gamma: r.gamma,
                residual: q,
            })
        })
        .collect()
}

/// Resonance count against the uniform-residual baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResonanceStatistics {
    pub total_zeros: u64,
    pub resonant_count: u64,
    /// `n · 2·tol / c`.
    pub expected: f64,
    pub rate: f64,
    /// `resonant_count / expected`; infinite when nothing is expected.
    pub significance_factor: f64,
    /// Present when `expected ≥ 5`.
    pub chi_squared: Option<TestResult>,
    /// Present when `2·tol/c ∈ [0, 1]`.
    pub binomial_p: Option<f64>,
    pub poisson_p: Option<f64>,
    /// Residuals against `Uniform(0, c/2)`, present with more than
    /// [`MIN_RESIDUALS_FOR_KS`] residuals.
    pub ks: Option<KsResult>,
    /// Hit residuals against `Uniform(0, tol)`.
    pub hit_ks: Option<KsResult>,
    /// Runs test on the gaps between hit indices, above or below their
    /// median.
    pub gap_runs: Option<TestResult>,
    /// Serial correlation of hit residuals in index order.
    pub autocorrelation: Option<HitAutocorrelation>,
}

/// Lag-1 autocorrelation of hit residuals with its `1.96/√n` band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HitAutocorrelation {
    pub lag1: f64,
    pub threshold: f64,
    pub significant: bool,
}

impl ResonanceStatistics {
    /// Returns `None` when there are no zeros or `c`, `tol` are not
    /// positive and finite.
    pub fn compute(
        total_zeros: usize,
        resonant_count: usize,
        c: f64,
        tol: f64,
        residuals: Option<&[f64]>,
    ) -> Option<Self> {
        if total_zeros == 0 || !c.is_finite() || c <= 0.0 || !tol.is_finite() || tol <= 0.0 {
            return None;
        }
        let n = total_zeros as u64;
        let k = resonant_count as u64;
        let p_hit = 2.0 * tol / c;
        let expected = total_zeros as f64 * p_hit;
        let significance_factor = if expected > 0.0 {
            k as f64 / expected
        } else {
            f64::INFINITY
        };

        let chi_squared = if expected >= MIN_EXPECTED_FOR_CHI2 {
            hypothesis::chi_squared_count(k, expected)
        } else {
            None
        };
        let binomial_p = if (0.0..=1.0).contains(&p_hit) {
            hypothesis::binomial_two_sided(k.min(n), n, p_hit)
        } else {
            None
        };
        let poisson_p = hypothesis::poisson_upper_tail(k, expected);
        let ks = residuals
            .filter(|r| r.len() > MIN_RESIDUALS_FOR_KS)
            .and_then(|r| residual_uniformity(r, c));

        Some(Self {
            total_zeros: n,
            resonant_count: k,
            expected,
            rate: k as f64 / n as f64,
            significance_factor,
            chi_squared,
            binomial_p,
            poisson_p,
            ks,
            hit_ks: None,
            gap_runs: None,
            autocorrelation: None,
        })
    }

    /// Adds the tests that look at the hits themselves rather than their
    /// count. Each needs a minimum number of hits and is left `None`
    /// below it.
    pub fn with_hits(mut self, hits: &[ResonanceHit], tol: f64) -> Self {
        let mut hits = hits.to_vec();
        hits.sort_by_key(|h| h.zero_index);

        if hits.len() > MIN_HITS_FOR_KS {
            let residuals: Vec<f64> = hits.iter().map(|h| h.residual).collect();
            self.hit_ks = Uniform::new(0.0, tol)
                .ok()
                .and_then(|null| hypothesis::ks_one_sample(&residuals, &null));
        }
        if hits.len() > MIN_HITS_FOR_RUNS {
            let gaps: Vec<f64> = hits
                .windows(2)
                .map(|w| (w[1].zero_index - w[0].zero_index) as f64)
                .collect();
            if let Some(median) = stats::median(&gaps) {
                let above: Vec<bool> = gaps.iter().map(|&g| g > median).collect();
                self.gap_runs = hypothesis::runs_test(&above);
            }
        }
        if hits.len() > MIN_HITS_FOR_AUTOCORRELATION {
            let residuals: Vec<f64> = hits.iter().map(|h| h.residual).collect();
            let threshold = 1.96 / (hits.len() as f64).sqrt();
            self.autocorrelation = stats::autocorrelation(&residuals, 1).map(|lag1| HitAutocorrelation {
                lag1,
                threshold,
                significant: lag1.abs() > threshold,
            });
        }
        self
    }
}

/// KS test of residuals against `Uniform(0, c/2)`.
pub fn residual_uniformity(residuals: &[f64], c: f64) -> Option<KsResult> {
    let null = Uniform::new(0.0, c / 2.0).ok()?;
    hypothesis::ks_one_sample(residuals, &null)
}

/// Thresholds a resonance count must clear to be reported as significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceCriteria {
    pub min_resonances: u64,
    pub min_significance_factor: f64,
    pub max_p_value: f64,
    /// χ² critical value, 6.635 for p < 0.01 at 1 dof.
    pub min_chi2_stat: f64,
}

impl Default for SignificanceCriteria {
    fn default() -> Self {
        Self {
            min_resonances: 10,
            min_significance_factor: 2.0,
            max_p_value: 0.01,
            min_chi2_stat: 6.635,
        }
    }
}

impl SignificanceCriteria {
    /// Significant when there are enough hits, the excess factor is large
    /// enough, and at least one of the χ², binomial or Poisson tests passes.
    pub fn evaluate(&self, stats: &ResonanceStatistics) -> (bool, String) {
        if stats.resonant_count < self.min_resonances {
            return (false, "insufficient resonances".to_string());
        }
        if stats.significance_factor < self.min_significance_factor {
            return (
                false,
                format!("low significance factor: {:.2}x", stats.significance_factor),
            );
        }

        let mut passed = Vec::new();
        if let Some(chi2) = stats.chi_squared.filter(|c| c.statistic > self.min_chi2_stat) {
            passed.push(format!("chi2={:.3}", chi2.statistic));
        }
        if let Some(p) = stats.binomial_p.filter(|&p| p < self.max_p_value) {
            passed.push(format!("binomial p={p:.2e}"));
        }
        if let Some(p) = stats.poisson_p.filter(|&p| p < self.max_p_value) {
            passed.push(format!("poisson p={p:.2e}"));
        }

        if passed.is_empty() {
            (false, "no significant statistical test".to_string())
        } else {
            (true, format!("significant tests: {}", passed.join(", ")))
        }
    }
}

/// Result of one tolerance level of a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToleranceLevel {
    pub tolerance: f64,
    pub count: u64,
    pub statistics: Option<ResonanceStatistics>,
    pub significant: bool,
    pub reason: String,
}

/// Multi-tolerance scan of one constant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstantScan {
    pub constant: PhysicalConstant,
    pub best: Option<Resonance>,
    /// Uniformity of all residuals; independent of the tolerance.
    pub residual_ks: Option<KsResult>,
    pub levels: Vec<ToleranceLevel>,
}

impl ConstantScan {
    pub fn any_significant(&self) -> bool {
        self.levels.iter().any(|l| l.significant)
    }
}

/// Counts resonances of every constant at each of its tolerances and
/// evaluates them against `criteria`.
pub fn scan(
    records: &[ZeroRecord],
    constants: &[PhysicalConstant],
    criteria: &SignificanceCriteria,
) -> Vec<ConstantScan> {
    constants
        .iter()
        .map(|constant| scan_constant(records, constant, &constant.tolerances(), criteria))
        .collect()
}

/// Scans one constant at the given tolerances.
pub fn scan_constant(
    records: &[ZeroRecord],
    constant: &PhysicalConstant,
    tolerances: &[f64],
    criteria: &SignificanceCriteria,
) -> ConstantScan {
    let c = constant.value;
    let residuals: Vec<f64> = if c.is_finite() && c > 0.0 {
        records.iter().map(|r| residual(r.gamma, c)).collect()
    } else {
        Vec::new()
    };
    let residual_ks = if residuals.len() > MIN_RESIDUALS_FOR_KS {
        residual_uniformity(&residuals, c)
    } else {
        None
    };

    let levels = tolerances
        .iter()
        .map(|&tol| {
            let hits: Vec<ResonanceHit> = records
                .iter()
                .zip(&residuals)
                .filter(|&(_, &q)| q < tol)
                .map(|(r, &q)| ResonanceHit {
                    zero_index: r.index,
                    gamma: r.gamma,
                    residual: q,
                })
                .collect();
            let count = hits.len();
            let statistics = ResonanceStatistics::compute(records.len(), count, c, tol, None)
                .map(|s| ResonanceStatistics { ks: residual_ks, ..s }.with_hits(&hits, tol));
            let (significant, reason) = match &statistics {
                Some(s) => criteria.evaluate(s),
                None => (false, "statistics unavailable".to_string()),
            };
            if significant {
                info!(
                    constant = %constant.name,
                    tolerance = tol,
                    count,
                    %reason,
                    "significant resonance"
                );
            }
            ToleranceLevel {
                tolerance: tol,
                count: count as u64,
                statistics,
                significant,
                reason,
            }
        })
        .collect();

    let best = best_resonance(records, &constant.name, c);
    debug!(
        constant = %constant.name,
        value = c,
        best_quality = best.as_ref().map(|b| b.quality),
        "scanned constant"
    );
    ConstantScan {
        constant: constant.clone(),
        best,
        residual_ks,
        levels,
    }
}

/// Single-tolerance comparison of a set of constants, typically real
/// constants next to arbitrary controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlComparison {
    pub name: String,
    pub value: f64,
    pub count: u64,
    /// Percentage of zeros within tolerance.
    pub rate_percent: f64,
    pub statistics: Option<ResonanceStatistics>,
}

pub fn compare_controls(
    records: &[ZeroRecord],
    constants: &[PhysicalConstant],
    tolerance: f64,
) -> Vec<ControlComparison> {
    constants
        .iter()
        .map(|c| {
            let hits = resonances_within(records, c.value, tolerance);
            let count = hits.len();
            let rate_percent = if records.is_empty() {
                0.0
            } else {
                count as f64 / records.len() as f64 * 100.0
            };
            ControlComparison {
                name: c.name.clone(),
                value: c.value,
                count: count as u64,
                rate_percent,
                statistics: ResonanceStatistics::compute(records.len(), count, c.value, tolerance, None)
                    .map(|s| s.with_hits(&hits, tolerance)),
            }
        })
        .collect()
}
