//! Comparison of the zeros with the analytic counting law.
//!
//! The number of zeros with `0 < γ ≤ T` is, by Riemann–von Mangoldt,
//!
//! ```text
//! N(T) = (T/2π)·ln(T/2π) − T/2π + 7/8 + S(T) + O(1/T)
//! ```
//!
//! with `S(T) = O(ln T)` oscillating around zero. The smooth part gives
//! the local density `ln(T/2π)/2π` and the mean gap `2π/ln(T/2π)`.
//!
//! Besides the counting comparison this module measures gap statistics by
//! region, density per logarithmic bin, histogram concentration, and the
//! density of a window of heights against its neighbours.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::ZeroDataset;
use crate::stats::{self, Histogram};

const TWO_PI: f64 = 2.0 * PI;

/// Which approximation of `N(T)` to compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountingFormula {
    /// `(T/2π)·ln(T/2π) − T/2π + 7/8`
    #[default]
    RiemannVonMangoldt,
    /// `T·ln T/2π − T/2π`, the leading terms without the `2π` inside the
    /// logarithm.
    Leading,
}

impl CountingFormula {
    pub fn count(self, t: f64) -> f64 {
        match self {
            CountingFormula::RiemannVonMangoldt => smooth_count(t),
            CountingFormula::Leading => leading_count(t),
        }
    }
}

/// Smooth Riemann–von Mangoldt count; `0` for `t ≤ 0`.
///
/// # Examples
/// ```
/// use zeta_stats::weyl::smooth_count;
/// // 649 zeros lie below T = 1000
/// assert!((smooth_count(1000.0) - 649.0).abs() < 1.0);
/// ```
pub fn smooth_count(t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    let x = t / TWO_PI;
    x * x.ln() - x + 0.875
}

/// `T·ln T/2π − T/2π`; `0` for `t ≤ 0`.
pub fn leading_count(t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    t * t.ln() / TWO_PI - t / TWO_PI
}

/// Mean zero density at height `γ`, `ln(γ/2π)/2π`.
pub fn density(gamma: f64) -> f64 {
    (gamma / TWO_PI).ln() / TWO_PI
}

/// Mean gap at height `γ`, `2π/ln(γ/2π)`. `None` for `γ ≤ 2π`, where the
/// asymptotic density is not positive.
pub fn expected_spacing(gamma: f64) -> Option<f64> {
    let d = density(gamma);
    (d.is_finite() && d > 0.0).then(|| 1.0 / d)
}

/// `n` logarithmically spaced heights from `lo` to `hi` inclusive.
pub fn log_heights(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if n == 0 || lo <= 0.0 || hi < lo {
        return Vec::new();
    }
    if n == 1 {
        return vec![lo];
    }
    let (a, b) = (lo.log10(), hi.log10());
    let step = (b - a) / (n - 1) as f64;
    (0..n).map(|i| 10f64.powf(a + step * i as f64)).collect()
}

/// Observed against predicted `N(T)` at one height.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountComparison {
    pub height: f64,
    pub observed: u64,
    pub predicted: f64,
    pub absolute_error: f64,
    /// `|observed − predicted| / predicted`; `None` when the prediction is
    /// not positive.
    pub relative_error: Option<f64>,
}

/// Compares `N(T)` with `formula` at each height up to the last zero.
pub fn compare_counts(
    dataset: &ZeroDataset,
    heights: &[f64],
    formula: CountingFormula,
) -> Vec<CountComparison> {
    let top = dataset.last().gamma;
    heights
        .iter()
        .filter(|&&t| t <= top)
        .map(|&t| {
            let observed = dataset.count_up_to(t) as u64;
            let predicted = formula.count(t);
            let absolute_error = (observed as f64 - predicted).abs();
            CountComparison {
                height: t,
                observed,
                predicted,
                absolute_error,
                relative_error: (predicted > 0.0).then(|| absolute_error / predicted),
            }
        })
        .collect()
}

/// Gap statistics of the zeros in one height region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSpacing {
    pub lo: f64,
    pub hi: f64,
    /// Geometric centre `√(lo·hi)`.
    pub center: f64,
    pub zeros: usize,
    pub mean_gap: f64,
    /// Population standard deviation of the gaps.
    pub std_gap: f64,
    pub expected_gap: f64,
    /// `mean_gap / expected_gap`.
    pub gap_ratio: f64,
    /// `std_gap / mean_gap`.
    pub cv: f64,
}

/// Regions of one decade each up to 10⁶, then `[10⁶, 2·10⁶]`.
pub const DEFAULT_REGIONS: [(f64, f64); 6] = [
    (10.0, 100.0),
    (100.0, 1e3),
    (1e3, 1e4),
    (1e4, 1e5),
    (1e5, 1e6),
    (1e6, 2e6),
];

/// Minimum zeros in a region for gap statistics.
pub const MIN_REGION_ZEROS: usize = 10;

/// Gap statistics per region `[lo, hi]`; regions with 10 or fewer zeros,
/// or whose centre is below `2π`, are left out.
pub fn region_spacing(dataset: &ZeroDataset, regions: &[(f64, f64)]) -> Vec<RegionSpacing> {
    regions
        .iter()
        .filter_map(|&(lo, hi)| {
            let zeros = dataset.gammas_between(lo, hi);
            if zeros.len() <= MIN_REGION_ZEROS {
                debug!(lo, hi, zeros = zeros.len(), "region skipped");
                return None;
            }
            let gaps = stats::diff(zeros);
            let mean_gap = stats::mean(&gaps)?;
            let std_gap = stats::population_std_dev(&gaps)?;
            let center = (lo * hi).sqrt();
            let expected_gap = expected_spacing(center)?;
            Some(RegionSpacing {
                lo,
                hi,
                center,
                zeros: zeros.len(),
                mean_gap,
                std_gap,
                expected_gap,
                gap_ratio: mean_gap / expected_gap,
                cv: std_gap / mean_gap,
            })
        })
        .collect()
}

/// Observed zero density in one logarithmic bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecadeDensity {
    pub lo: f64,
    pub hi: f64,
    pub center: f64,
    pub zeros: usize,
    /// Zeros per unit height.
    pub observed_density: f64,
    /// [`density`] at the geometric centre.
    pub theoretical_density: f64,
    pub density_ratio: f64,
    pub mean_gamma: f64,
    pub std_gamma: f64,
}

/// Minimum zeros in a logarithmic bin for a density estimate.
pub const MIN_BIN_ZEROS: usize = 5;

/// Density per half-open bin `[edges[i], edges[i+1])` with more than five
/// zeros.
pub fn decade_density(dataset: &ZeroDataset, edges: &[f64]) -> Vec<DecadeDensity> {
    let gammas = dataset.gammas();
    edges
        .windows(2)
        .filter_map(|w| {
            let (lo, hi) = (w[0], w[1]);
            let start = gammas.partition_point(|&g| g < lo);
            let end = gammas.partition_point(|&g| g < hi).max(start);
            let zeros = &gammas[start..end];
            if zeros.len() <= MIN_BIN_ZEROS {
                return None;
            }
            let center = (lo * hi).sqrt();
            let observed_density = zeros.len() as f64 / (hi - lo);
            let theoretical_density = density(center);
            Some(DecadeDensity {
                lo,
                hi,
                center,
                zeros: zeros.len(),
                observed_density,
                theoretical_density,
                density_ratio: if theoretical_density > 0.0 {
                    observed_density / theoretical_density
                } else {
                    0.0
                },
                mean_gamma: stats::mean(zeros)?,
                std_gamma: stats::population_std_dev(zeros)?,
            })
        })
        .collect()
}

/// How evenly the zeros fill equal-width bins over their full range.
///
/// The density grows like `ln γ`, so bin counts drift upwards with height;
/// a bin is flagged only when it exceeds the mean by three standard
/// deviations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcentrationTest {
    pub bins: usize,
    pub max_count: u64,
    pub mean_count: f64,
    pub std_count: f64,
    pub cv: f64,
    /// Bins above `mean + 3σ`.
    pub outlier_bins: usize,
}

pub fn concentration_test(dataset: &ZeroDataset, bins: usize) -> Option<ConcentrationTest> {
    let hist = Histogram::new(dataset.gammas(), bins, None)?;
    let counts: Vec<f64> = hist.counts().iter().map(|&c| c as f64).collect();
    let mean_count = stats::mean(&counts)?;
    let std_count = stats::population_std_dev(&counts)?;
    let threshold = mean_count + 3.0 * std_count;
    Some(ConcentrationTest {
        bins,
        max_count: hist.counts().iter().copied().max().unwrap_or(0),
        mean_count,
        std_count,
        cv: if mean_count > 0.0 { std_count / mean_count } else { 0.0 },
        outlier_bins: counts.iter().filter(|&&c| c > threshold).count(),
    })
}

/// A height window and its neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleWindows {
    /// Closed window `[lo, hi]`.
    pub window: (f64, f64),
    /// Starts at `before`, ends just below the window.
    pub before: f64,
    /// Starts just above the window, ends at `after`.
    pub after: f64,
}

impl Default for ScaleWindows {
    fn default() -> Self {
        Self {
            window: (8e5, 1.2e6),
            before: 4e5,
            after: 2e6,
        }
    }
}

/// Density of a window compared with the regions on either side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleDensity {
    pub windows: ScaleWindows,
    pub window_zeros: usize,
    pub window_density: f64,
    pub before_density: f64,
    pub after_density: f64,
    /// `window_density / max(before, after)`; `None` when both neighbours
    /// are empty.
    pub contrast: Option<f64>,
}

pub fn scale_density(dataset: &ZeroDataset, windows: &ScaleWindows) -> ScaleDensity {
    let gammas = dataset.gammas();
    let (lo, hi) = windows.window;
    let inside = dataset.gammas_between(lo, hi).len();
    let before = gammas
        .partition_point(|&g| g < lo)
        .saturating_sub(gammas.partition_point(|&g| g < windows.before));
    let after = gammas
        .partition_point(|&g| g <= windows.after)
        .saturating_sub(gammas.partition_point(|&g| g <= hi));

    let rate = |count: usize, width: f64| if width > 0.0 { count as f64 / width } else { 0.0 };
    let window_density = rate(inside, hi - lo);
    let before_density = rate(before, lo - windows.before);
    let after_density = rate(after, windows.after - hi);
    let neighbour = before_density.max(after_density);
    ScaleDensity {
        windows: windows.clone(),
        window_zeros: inside,
        window_density,
        before_density,
        after_density,
        contrast: (neighbour > 0.0).then(|| window_density / neighbour),
    }
}

/// Settings of the full counting-law analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeylConfig {
    pub formula: CountingFormula,
    pub count_points: usize,
    pub min_height: f64,
    pub max_height: f64,
    pub regions: Vec<(f64, f64)>,
    pub decade_points: usize,
    pub concentration_bins: usize,
    pub scale: ScaleWindows,
}

impl Default for WeylConfig {
    fn default() -> Self {
        Self {
            formula: CountingFormula::default(),
            count_points: 50,
            min_height: 10.0,
            max_height: 1e6,
            regions: DEFAULT_REGIONS.to_vec(),
            decade_points: 25,
            concentration_bins: 1000,
            scale: ScaleWindows::default(),
        }
    }
}

/// Whether the window of [`ScaleWindows`] behaves differently from the
/// rest of the dataset, judged by three checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleChecks {
    /// Counting error at the height nearest the window centre is at most
    /// the mean error.
    pub counting_conforms: bool,
    /// Gap ratio of the window's region within `[0.7, 1.3]`.
    pub spacing_conforms: bool,
    /// Window density above 1.1 times both neighbours.
    pub density_concentrated: bool,
    pub passed: usize,
    pub score: f64,
}

/// Every counting-law comparison on one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeylAnalysis {
    pub formula: CountingFormula,
    pub counts: Vec<CountComparison>,
    pub mean_relative_error: Option<f64>,
    pub regions: Vec<RegionSpacing>,
    pub decades: Vec<DecadeDensity>,
    pub concentration: Option<ConcentrationTest>,
    pub scale: ScaleDensity,
    pub checks: ScaleChecks,
}

impl WeylAnalysis {
    pub fn compute(dataset: &ZeroDataset, config: &WeylConfig) -> Self {
        let heights = log_heights(config.min_height, config.max_height, config.count_points);
        let counts = compare_counts(dataset, &heights, config.formula);
        let errors: Vec<f64> = counts.iter().filter_map(|c| c.relative_error).collect();
        let mean_relative_error = stats::mean(&errors);

        let regions = region_spacing(dataset, &config.regions);
        let edges = log_heights(config.min_height, config.max_height, config.decade_points);
        let decades = decade_density(dataset, &edges);
        let concentration = concentration_test(dataset, config.concentration_bins);
        let scale = scale_density(dataset, &config.scale);
        let checks = scale_checks(&counts, mean_relative_error, &regions, &scale);

        info!(
            zeros = dataset.len(),
            heights = counts.len(),
            mean_relative_error,
            regions = regions.len(),
            score = checks.score,
            "counting-law analysis complete"
        );
        Self {
            formula: config.formula,
            counts,
            mean_relative_error,
            regions,
            decades,
            concentration,
            scale,
            checks,
        }
    }
}

fn scale_checks(
    counts: &[CountComparison],
    mean_error: Option<f64>,
    regions: &[RegionSpacing],
    scale: &ScaleDensity,
) -> ScaleChecks {
    let (lo, hi) = scale.windows.window;
    let center = (lo * hi).sqrt();

    let nearest_error = counts
        .iter()
        .min_by(|a, b| (a.height - center).abs().total_cmp(&(b.height - center).abs()))
        .and_then(|c| c.relative_error);
    let counting_conforms = matches!((nearest_error, mean_error), (Some(e), Some(m)) if e <= m);

    // last region starting at or below the window centre
    let spacing_conforms = regions
        .iter()
        .filter(|r| r.lo <= center)
        .max_by(|a, b| a.lo.total_cmp(&b.lo))
        .is_some_and(|r| (0.7..=1.3).contains(&r.gap_ratio));

    let neighbour = scale.before_density.max(scale.after_density);
    let density_concentrated = scale.window_density > neighbour * 1.1;

    let passed = [counting_conforms, spacing_conforms, density_concentrated]
        .iter()
        .filter(|&&b| b)
        .count();
    ScaleChecks {
        counting_conforms,
        spacing_conforms,
        density_concentrated,
        passed,
        score: passed as f64 / 3.0,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn smooth_count_increasing(t in 7.0_f64..1e7, dt in 1e-3_f64..1e3) {
            prop_assert!(smooth_count(t + dt) > smooth_count(t));
        }

        #[test]
        fn log_heights_monotone(lo in 1.0_f64..1e3, factor in 1.5_f64..1e4, n in 2_usize..60) {
            let h = log_heights(lo, lo * factor, n);
            prop_assert_eq!(h.len(), n);
            prop_assert!(h.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
