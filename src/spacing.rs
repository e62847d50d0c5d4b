//! Nearest-neighbour spacings and pair correlation of the zeros.
//!
//! Gaps shrink like `2π/ln(γ/2π)` with height, so raw gaps from different
//! heights cannot be pooled. Unfolding rescales each gap by the local mean
//! density, giving spacings with mean 1 whose distribution can be compared
//! with random-matrix predictions:
//!
//! - GUE (Wigner surmise, β = 2): `p(s) = (32/π²)·s²·e^{−4s²/π}`, with
//!   strong level repulsion near `s = 0`;
//! - uncorrelated levels: `p(s) = e^{−s}`.
//!
//! Montgomery's pair-correlation conjecture predicts the density of
//! unfolded differences `u` to be `1 − (sin πu / πu)²`.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::ZeroDataset;
use crate::distributions::{ContinuousCdf, Exponential, WignerSurmise};
use crate::hypothesis::{self, KsResult};
use crate::stats::{Histogram, Summary};
use crate::weyl;

/// Spacings below this count as near-degenerate.
pub const SMALL_SPACING: f64 = 0.1;

/// Histogram range for unfolded spacings.
pub const SPACING_RANGE: (f64, f64) = (0.0, 4.0);

/// Unfolded spacings `s_k = (γ_{k+1} − γ_k)·ln(γ̄/2π)/2π`, with `γ̄` the
/// midpoint of the pair. Pairs whose midpoint lies below `2π` are
/// skipped.
///
/// # Examples
/// ```
/// use zeta_stats::spacing::unfold;
/// let s = unfold(&[1000.0, 1001.0]);
/// assert_eq!(s.len(), 1);
/// assert!((s[0] - 0.807).abs() < 1e-3);
/// ```
pub fn unfold(gammas: &[f64]) -> Vec<f64> {
    gammas
        .windows(2)
        .filter_map(|w| {
            let d = weyl::density(0.5 * (w[0] + w[1]));
            (d > 0.0).then(|| (w[1] - w[0]) * d)
        })
        .collect()
}

/// One histogram bin of the spacing distribution with both reference
/// densities at its centre.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpacingBin {
    pub center: f64,
    pub observed: f64,
    pub gue: f64,
    pub poisson: f64,
}

/// Unfolded spacing distribution against GUE and Poisson.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpacingAnalysis {
    pub summary: Summary,
    pub bins: Vec<SpacingBin>,
    /// Spacings beyond [`SPACING_RANGE`].
    pub overflow: u64,
    pub gue_ks: KsResult,
    pub poisson_ks: KsResult,
    /// Observed fraction of spacings below [`SMALL_SPACING`].
    pub small_fraction: f64,
    pub gue_small_fraction: f64,
    pub poisson_small_fraction: f64,
}

impl SpacingAnalysis {
    /// Returns `None` with fewer than two unfolded spacings or `bins == 0`.
    pub fn compute(gammas: &[f64], bins: usize) -> Option<Self> {
        let spacings = unfold(gammas);
        if spacings.len() < 2 {
            return None;
        }
        let summary = Summary::from_slice(&spacings)?;
        let hist = Histogram::new(&spacings, bins, Some(SPACING_RANGE))?;
        let gue = WignerSurmise;
        let poisson = Exponential::unit();

        let bins = hist
            .centers()
            .into_iter()
            .zip(hist.density())
            .map(|(center, observed)| SpacingBin {
                center,
                observed,
                gue: gue.pdf(center),
                poisson: poisson.pdf(center),
            })
            .collect();

        let gue_ks = hypothesis::ks_one_sample(&spacings, &gue)?;
        let poisson_ks = hypothesis::ks_one_sample(&spacings, &poisson)?;
        let small = spacings.iter().filter(|&&s| s < SMALL_SPACING).count();

        info!(
            spacings = spacings.len(),
            mean = summary.mean,
            gue_d = gue_ks.statistic,
            poisson_d = poisson_ks.statistic,
            "spacing distribution compared"
        );
        Some(Self {
            summary,
            bins,
            overflow: hist.overflow(),
            gue_ks,
            poisson_ks,
            small_fraction: small as f64 / spacings.len() as f64,
            gue_small_fraction: gue.cdf(SMALL_SPACING),
            poisson_small_fraction: poisson.cdf(SMALL_SPACING),
        })
    }

    /// Whether the spacings sit closer to GUE than to Poisson.
    pub fn favours_gue(&self) -> bool {
        self.gue_ks.statistic < self.poisson_ks.statistic
    }
}

/// `1 − (sin πu / πu)²`, with the removable singularity at 0.
pub fn montgomery_density(u: f64) -> f64 {
    if u.abs() < 1e-8 {
        return 0.0;
    }
    let x = PI * u;
    let sinc = x.sin() / x;
    1.0 - sinc * sinc
}

/// A bin of the pair-correlation histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairBin {
    pub center: f64,
    pub observed: f64,
    pub montgomery: f64,
}

/// Pair correlation of a run of zeros.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairCorrelation {
    /// Zeros whose forward neighbourhood up to `max_u` was fully counted.
    pub base_points: usize,
    pub pairs: u64,
    pub bins: Vec<PairBin>,
    /// Mean `|observed − montgomery|` over the bins.
    pub mean_abs_deviation: f64,
}

/// Histogram of unfolded differences `x_j − x_i ∈ (0, max_u]` for
/// `i < j < i + window`, where `x = N̄(γ)` is the smooth count.
///
/// Normalised per base point and unit `u`, so uncorrelated levels give
/// a flat density of 1. Only base points with at least `max_u` of unfolded
/// room after them are used. `window` must be large enough to reach
/// `max_u`; at unit mean spacing that is a little over `max_u` neighbours.
///
/// Returns `None` if no base point qualifies or the arguments are
/// degenerate.
pub fn pair_correlation(gammas: &[f64], window: usize, max_u: f64, bins: usize) -> Option<PairCorrelation> {
    pair_correlation_limited(gammas, window, max_u, bins, usize::MAX)
}

/// [`pair_correlation`] over at most `max_base` base points, taken from the
/// low end of `gammas`. Zeros past the last base point still serve as
/// neighbours.
pub fn pair_correlation_limited(
    gammas: &[f64],
    window: usize,
    max_u: f64,
    bins: usize,
    max_base: usize,
) -> Option<PairCorrelation> {
    if window < 2 || bins == 0 || !(max_u > 0.0) || gammas.len() < 2 {
        return None;
    }
    let x: Vec<f64> = gammas.iter().map(|&g| weyl::smooth_count(g)).collect();
    let last = *x.last()?;
    let base_points = x
        .iter()
        .take_while(|&&xi| last - xi >= max_u)
        .count()
        .min(max_base);
    if base_points == 0 {
        return None;
    }

    let mut differences = Vec::new();
    for i in 0..base_points {
        for j in (i + 1)..(i + window).min(x.len()) {
            let u = x[j] - x[i];
            if u > max_u {
                break;
            }
            if u > 0.0 {
                differences.push(u);
            }
        }
    }

    let hist = Histogram::new(&differences, bins, Some((0.0, max_u)))?;
    let norm = base_points as f64 * hist.bin_width();
    let bins: Vec<PairBin> = hist
        .centers()
        .into_iter()
        .zip(hist.counts())
        .map(|(center, &count)| PairBin {
            center,
            observed: count as f64 / norm,
            montgomery: montgomery_density(center),
        })
        .collect();
    let mean_abs_deviation =
        bins.iter().map(|b| (b.observed - b.montgomery).abs()).sum::<f64>() / bins.len() as f64;

    debug!(base_points, pairs = differences.len(), mean_abs_deviation, "pair correlation");
    Some(PairCorrelation {
        base_points,
        pairs: differences.len() as u64,
        bins,
        mean_abs_deviation,
    })
}

/// Settings for pair correlation at several heights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairCorrelationConfig {
    /// Heights around which `[scale/2, 2·scale]` is sampled.
    pub scales: Vec<f64>,
    pub window: usize,
    pub max_u: f64,
    pub bins: usize,
    /// Cap on base points per scale.
    pub max_points: usize,
}

impl Default for PairCorrelationConfig {
    fn default() -> Self {
        Self {
            scales: vec![1e3, 1e4, 1e5, 1e6],
            window: 50,
            max_u: 3.0,
            bins: 30,
            max_points: 10_000,
        }
    }
}

/// Pair correlation of the zeros around one height.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleCorrelation {
    pub scale: f64,
    pub zeros: usize,
    pub correlation: PairCorrelation,
}

/// Minimum zeros around a scale for a pair-correlation estimate.
pub const MIN_SCALE_ZEROS: usize = 100;

/// Pair correlation at each configured scale with more than 100 zeros.
pub fn correlations_by_scale(dataset: &ZeroDataset, config: &PairCorrelationConfig) -> Vec<ScaleCorrelation> {
    config
        .scales
        .iter()
        .filter_map(|&scale| {
            let zeros = dataset.gammas_between(scale / 2.0, scale * 2.0);
            if zeros.len() <= MIN_SCALE_ZEROS {
                return None;
            }
            let take = (config.max_points + config.window).min(zeros.len());
            let correlation = pair_correlation_limited(
                &zeros[..take],
                config.window,
                config.max_u,
                config.bins,
                config.max_points,
            )?;
            Some(ScaleCorrelation {
                scale,
                zeros: zeros.len(),
                correlation,
            })
        })
        .collect()
}

/// Spacing distribution plus pair correlation by scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpacingReport {
    pub distribution: Option<SpacingAnalysis>,
    pub correlations: Vec<ScaleCorrelation>,
}

impl SpacingReport {
    pub fn compute(dataset: &ZeroDataset, bins: usize, config: &PairCorrelationConfig) -> Self {
        Self {
            distribution: SpacingAnalysis::compute(dataset.gammas(), bins),
            correlations: correlations_by_scale(dataset, config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;
    use approx::assert_relative_eq;
    use rand::Rng;

    /// Heights whose smooth count increments by exactly one.
    fn picket_fence(n: usize, start: f64) -> Vec<f64> {
        let mut out = Vec::with_capacity(n);
        let mut t = start;
        for _ in 0..n {
            out.push(t);
            t += 1.0 / weyl::density(t);
        }
        out
    }

    /// Uncorrelated heights: unit-mean exponential unfolded gaps.
    fn poisson_levels(n: usize, start: f64, seed: u64) -> Vec<f64> {
        let mut rng = create_rng(seed);
        let mut out = Vec::with_capacity(n);
        let mut t = start;
        for _ in 0..n {
            out.push(t);
            let s: f64 = -(1.0 - rng.random::<f64>()).ln();
            t += s / weyl::density(t);
        }
        out
    }

    #[test]
    fn test_unfold_picket_fence_is_unit() {
        let s = unfold(&picket_fence(500, 1000.0));
        assert_eq!(s.len(), 499);
        for v in s {
            assert!((v - 1.0).abs() < 1e-3, "{v}");
        }
    }

    #[test]
    fn test_unfold_skips_low_pairs() {
        assert!(unfold(&[1.0, 2.0]).is_empty());
        assert!(unfold(&[5.0]).is_empty());
    }

    #[test]
    fn test_poisson_levels_favour_poisson() {
        let gammas = poisson_levels(5000, 1e4, 11);
        let a = SpacingAnalysis::compute(&gammas, 40).unwrap();
        assert!(!a.favours_gue());
        assert!(a.poisson_ks.p_value > 0.001);
        assert!(a.gue_ks.p_value < 1e-6);
        assert!((a.summary.mean - 1.0).abs() < 0.05);
        assert!((a.small_fraction - a.poisson_small_fraction).abs() < 0.02);
        assert_eq!(a.bins.len(), 40);
    }

    #[test]
    fn test_reference_small_fractions() {
        let a = SpacingAnalysis::compute(&poisson_levels(100, 1e4, 1), 10).unwrap();
        assert_relative_eq!(a.poisson_small_fraction, 1.0 - (-0.1_f64).exp(), epsilon = 1e-12);
        assert!(a.gue_small_fraction < 2e-3);
        assert!(a.gue_small_fraction < a.poisson_small_fraction / 50.0);
    }

    #[test]
    fn test_spacing_analysis_degenerate() {
        assert!(SpacingAnalysis::compute(&[100.0, 101.0], 10).is_none());
        assert!(SpacingAnalysis::compute(&[100.0, 101.0, 102.0], 0).is_none());
    }

    #[test]
    fn test_montgomery_density() {
        assert_eq!(montgomery_density(0.0), 0.0);
        assert_relative_eq!(montgomery_density(1.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(montgomery_density(0.5), 1.0 - 4.0 / (PI * PI), epsilon = 1e-12);
    }

    #[test]
    fn test_pair_correlation_uncorrelated_is_flat() {
        let gammas = poisson_levels(20_000, 1e4, 5);
        let pc = pair_correlation(&gammas, 40, 3.0, 6).unwrap();
        assert!(pc.base_points > 19_000);
        for b in &pc.bins {
            assert!((b.observed - 1.0).abs() < 0.1, "{b:?}");
        }
    }

    #[test]
    fn test_pair_correlation_picket_fence_peaks_at_integers() {
        let gammas = picket_fence(2000, 1e4);
        let pc = pair_correlation(&gammas, 10, 2.5, 5).unwrap();
        // bins of width 0.5: differences all sit at u = 1 and u = 2
        let observed: Vec<f64> = pc.bins.iter().map(|b| b.observed).collect();
        assert_eq!(observed[0], 0.0);
        assert!(observed[1] > 1.9 || observed[2] > 1.9);
        assert_eq!(pc.pairs as usize, 2 * pc.base_points);
    }

    #[test]
    fn test_pair_correlation_degenerate() {
        assert!(pair_correlation(&[100.0, 101.0], 1, 3.0, 10).is_none());
        assert!(pair_correlation(&[100.0, 101.0], 10, 3.0, 0).is_none());
        assert!(pair_correlation(&[100.0, 100.5], 10, 3.0, 10).is_none());
    }

    #[test]
    fn test_correlations_by_scale() {
        let ds = ZeroDataset::from_gammas(poisson_levels(6000, 600.0, 3)).unwrap();
        let config = PairCorrelationConfig {
            scales: vec![1e3, 1e6],
            max_points: 1000,
            ..Default::default()
        };
        let out = correlations_by_scale(&ds, &config);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].scale, 1e3);
        assert_eq!(out[0].correlation.base_points, 1000);
    }

    #[test]
    fn test_correlations_by_scale_caps_base_points() {
        let ds = ZeroDataset::from_gammas(picket_fence(1100, 500.0)).unwrap();
        let config = PairCorrelationConfig {
            scales: vec![1e3],
            max_u: 2.5,
            max_points: 100,
            ..Default::default()
        };
        let out = correlations_by_scale(&ds, &config);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].zeros, 1100);
        assert_eq!(out[0].correlation.base_points, 100);
        // neighbours beyond the last base point are still counted
        assert_eq!(out[0].correlation.pairs, 200);
    }

    #[test]
    fn test_pair_correlation_limited_matches_prefix() {
        let gammas = picket_fence(400, 1e4);
        let full = pair_correlation(&gammas, 10, 2.5, 5).unwrap();
        let capped = pair_correlation_limited(&gammas, 10, 2.5, 5, 50).unwrap();
        assert!(full.base_points > 50);
        assert_eq!(capped.base_points, 50);
        assert_eq!(capped.pairs, 100);
        assert!(pair_correlation_limited(&gammas, 10, 2.5, 5, 0).is_none());
    }
}
