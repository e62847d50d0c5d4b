//! Monte Carlo significance tests for the observed resonances.
//!
//! Two experiments calibrate the catalogue results of
//! [`crate::constants::reference_results`]:
//!
//! - **Negative control.** Arbitrary constants drawn log-uniformly from
//!   many decades are run through the same best-resonance search. If the
//!   observed qualities are no better than what random constants achieve,
//!   the resonances carry no information.
//! - **Perturbation robustness.** The real constants are jittered by a
//!   multiplicative Gaussian factor and the qualitative patterns of the
//!   observed results (category hierarchy, a single outstanding resonance,
//!   concentration of energies) are re-checked at each jitter level.
//!
//! Both experiments derive one RNG per trial from `(seed, trial)`, so a run
//! is bit-identical for a fixed seed and dataset slice regardless of the
//! order in which trials execute.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{self, Category, PhysicalConstant, ReferenceResult};
use crate::dataset::{ZeroDataset, ZeroRecord};
use crate::distributions::Binomial;
use crate::error::{Result, ZetaError};
use crate::hypothesis::{EmpiricalPValue, Significance};
use crate::random::{self, LogUniform, Perturbation};
use crate::resonance::{self, Resonance};
use crate::stats::{self, Summary, WelfordAccumulator};

/// Percentiles reported for the simulated distributions.
pub const PERCENTILE_LEVELS: [f64; 9] = [1.0, 5.0, 10.0, 25.0, 50.0, 75.0, 90.0, 95.0, 99.0];

/// Energy band, in the units of `γ / 10`, checked by the concentration
/// pattern.
pub const ENERGY_BAND: (f64, f64) = (5e4, 1.5e5);

/// Factor by which the best quality must beat the mean for the uniqueness
/// pattern.
pub const UNIQUENESS_FACTOR: f64 = 100.0;

/// Ratio band counted as a close match to a reference quality.
pub const CLOSE_MATCH_BAND: (f64, f64) = (0.1, 10.0);

fn sample<'a>(dataset: &'a ZeroDataset, sample_size: usize) -> Result<&'a [ZeroRecord]> {
    if sample_size == 0 {
        return Err(ZetaError::InvalidParameter("sample_size must be positive".into()));
    }
    Ok(dataset.tail(sample_size))
}

fn require_trials(n: usize) -> Result<()> {
    if n == 0 {
        return Err(ZetaError::InvalidParameter("n_simulations must be positive".into()));
    }
    Ok(())
}

// ============================================================================
// Negative control
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegativeControlConfig {
    pub n_simulations: usize,
    /// Random constants per trial.
    pub n_constants: usize,
    /// `log10` bounds of the constants.
    pub log_min: f64,
    pub log_max: f64,
    /// Number of highest zeros searched.
    pub sample_size: usize,
    pub seed: u64,
}

impl Default for NegativeControlConfig {
    fn default() -> Self {
        Self {
            n_simulations: 10_000,
            n_constants: 19,
            log_min: -50.0,
            log_max: 4.0,
            sample_size: 100_000,
            seed: 42,
        }
    }
}

/// Best and mean resonance of one trial's random constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlTrial {
    pub trial: u64,
    pub best_quality: f64,
    pub mean_quality: f64,
    pub best_error_percent: f64,
    pub mean_error_percent: f64,
    /// The constant that produced `best_quality`.
    pub best_constant: f64,
}

fn control_trial(
    records: &[ZeroRecord],
    sampler: &LogUniform,
    config: &NegativeControlConfig,
    trial: u64,
) -> Option<ControlTrial> {
    let mut rng = random::trial_rng(config.seed, trial);
    let mut qualities = Vec::with_capacity(config.n_constants);
    let mut errors = Vec::with_capacity(config.n_constants);
    let mut best: Option<(f64, f64)> = None;

    for _ in 0..config.n_constants {
        let c = sampler.sample(&mut rng);
        let Some((_, q)) = resonance::best_residual(records, c) else {
            continue;
        };
        qualities.push(q);
        errors.push(q / c * 100.0);
        if best.is_none_or(|(b, _)| q < b) {
            best = Some((q, c));
        }
    }

    let (best_quality, best_constant) = best?;
    if !best_quality.is_finite() {
        return None;
    }
    Some(ControlTrial {
        trial,
        best_quality,
        mean_quality: stats::mean(&qualities)?,
        best_error_percent: stats::min(&errors)?,
        mean_error_percent: stats::mean(&errors)?,
        best_constant,
    })
}

/// Percentile table and summaries of the simulated best resonances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlSummary {
    pub valid_trials: usize,
    pub best_quality: Summary,
    pub mean_quality: Summary,
    pub best_error_percent: Summary,
    /// `(percentile, value)` pairs over [`PERCENTILE_LEVELS`].
    pub quality_percentiles: Vec<(f64, f64)>,
    pub error_percentiles: Vec<(f64, f64)>,
}

/// One observed result placed within the simulated distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferencePValue {
    pub name: String,
    pub observed_quality: f64,
    pub observed_error_percent: f64,
    pub quality: EmpiricalPValue,
    pub error: EmpiricalPValue,
    /// Significance of the quality p-value.
    pub significance: Significance,
}

/// Headline counts over a set of p-values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlVerdict {
    pub tested: usize,
    pub significant: usize,
    /// Constants at `p < 0.001`.
    pub extremely_significant: Vec<String>,
}

impl ControlVerdict {
    pub fn from_p_values(p_values: &[ReferencePValue]) -> Self {
        Self {
            tested: p_values.len(),
            significant: p_values
                .iter()
                .filter(|p| p.significance.is_significant())
                .count(),
            extremely_significant: p_values
                .iter()
                .filter(|p| p.significance == Significance::VeryHigh)
                .map(|p| p.name.clone())
                .collect(),
        }
    }
}

/// Result of the random-constant experiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NegativeControl {
    pub config: NegativeControlConfig,
    /// Zeros actually searched (the dataset may be smaller than requested).
    pub sample_size: usize,
    pub trials: Vec<ControlTrial>,
    /// Trials in which no constant produced a finite quality.
    pub invalid_trials: usize,
}

impl NegativeControl {
    /// Runs every trial against the last `sample_size` zeros.
    ///
    /// # Errors
    /// [`ZetaError::InvalidParameter`] for zero trials, zero constants, a
    /// zero sample or an unusable exponent range.
    pub fn run(dataset: &ZeroDataset, config: &NegativeControlConfig) -> Result<Self> {
        require_trials(config.n_simulations)?;
        if config.n_constants == 0 {
            return Err(ZetaError::InvalidParameter("n_constants must be positive".into()));
        }
        let sampler = LogUniform::new(config.log_min, config.log_max)?;
        let records = sample(dataset, config.sample_size)?;

        info!(
            simulations = config.n_simulations,
            constants = config.n_constants,
            zeros = records.len(),
            seed = config.seed,
            "negative control started"
        );
        let mut trials = Vec::with_capacity(config.n_simulations);
        for t in 0..config.n_simulations as u64 {
            if let Some(trial) = control_trial(records, &sampler, config, t) {
                trials.push(trial);
            }
        }
        let invalid_trials = config.n_simulations - trials.len();
        info!(valid = trials.len(), invalid = invalid_trials, "negative control finished");

        Ok(Self {
            config: config.clone(),
            sample_size: records.len(),
            trials,
            invalid_trials,
        })
    }

    pub fn best_qualities(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.best_quality).collect()
    }

    pub fn best_errors(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.best_error_percent).collect()
    }

    /// `None` when no trial was valid.
    pub fn summary(&self) -> Option<ControlSummary> {
        let qualities = self.best_qualities();
        let errors = self.best_errors();
        let means: Vec<f64> = self.trials.iter().map(|t| t.mean_quality).collect();
        Some(ControlSummary {
            valid_trials: self.trials.len(),
            best_quality: Summary::from_slice(&qualities)?,
            mean_quality: Summary::from_slice(&means)?,
            best_error_percent: Summary::from_slice(&errors)?,
            quality_percentiles: stats::percentiles(&qualities, &PERCENTILE_LEVELS)?,
            error_percentiles: stats::percentiles(&errors, &PERCENTILE_LEVELS)?,
        })
    }

    /// Fraction of trials at least as good as each observed result, most
    /// significant first. Empty when no trial was valid.
    pub fn p_values(&self, reference: &[ReferenceResult]) -> Vec<ReferencePValue> {
        let qualities = self.best_qualities();
        let errors = self.best_errors();
        let mut out: Vec<ReferencePValue> = reference
            .iter()
            .filter_map(|r| {
                let quality = EmpiricalPValue::lower_tail(&qualities, r.quality)?;
                let error = EmpiricalPValue::lower_tail(&errors, r.error_percent)?;
                Some(ReferencePValue {
                    name: r.name.clone(),
                    observed_quality: r.quality,
                    observed_error_percent: r.error_percent,
                    quality,
                    error,
                    significance: quality.significance(),
                })
            })
            .collect();
        out.sort_by(|a, b| a.quality.p_value().total_cmp(&b.quality.p_value()));
        out
    }
}

// ============================================================================
// Perturbation robustness
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerturbationConfig {
    /// Relative standard deviations of the multiplicative jitter.
    pub levels: Vec<f64>,
    /// Trials per level.
    pub n_simulations: usize,
    pub sample_size: usize,
    /// Rate at which a pattern is assumed to hold by chance.
    pub chance_rate: f64,
    pub seed: u64,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            levels: vec![0.001, 0.01, 0.1, 1.0],
            n_simulations: 5_000,
            sample_size: 200_000,
            chance_rate: 0.2,
            seed: 42,
        }
    }
}

/// Simulated against reference quality for one category in one trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPattern {
    pub category: Category,
    pub mean_ratio: f64,
    pub median_ratio: f64,
    /// Ratios within one order of magnitude of the reference.
    pub close_matches: usize,
}

/// The observed qualitative patterns, re-checked on one trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternChecks {
    /// Cosmology has the lowest median quality of all categories.
    pub hierarchy: bool,
    /// The best quality is a hundred times below the mean.
    pub uniqueness: bool,
    /// More than half the energies fall in [`ENERGY_BAND`].
    pub energy_concentration: bool,
    pub categories: Vec<CategoryPattern>,
}

/// Checks the patterns on `(category, best resonance)` pairs. Only
/// constants with a reference result enter the hierarchy and the category
/// ratios.
pub fn pattern_checks(resonances: &[(Category, Resonance)], reference: &[ReferenceResult]) -> PatternChecks {
    let mut qualities: BTreeMap<Category, Vec<f64>> = BTreeMap::new();
    let mut ratios: BTreeMap<Category, Vec<f64>> = BTreeMap::new();
    for (category, r) in resonances {
        if let Some(observed) = constants::find_reference(reference, &r.constant) {
            qualities.entry(*category).or_default().push(r.quality);
            if observed.quality > 0.0 {
                ratios.entry(*category).or_default().push(r.quality / observed.quality);
            }
        }
    }

    let medians: BTreeMap<Category, f64> = qualities
        .iter()
        .filter_map(|(c, q)| Some((*c, stats::median(q)?)))
        .collect();
    let hierarchy = medians.get(&Category::Cosmology).is_some_and(|&cosmo| {
        let others: Vec<f64> = medians
            .iter()
            .filter(|(c, _)| **c != Category::Cosmology)
            .map(|(_, &m)| m)
            .collect();
        stats::min(&others).is_some_and(|lowest| cosmo <= lowest)
    });

    let all: Vec<f64> = resonances.iter().map(|(_, r)| r.quality).collect();
    let uniqueness = match (stats::min(&all), stats::mean(&all)) {
        (Some(best), Some(mean)) => best * UNIQUENESS_FACTOR < mean,
        _ => false,
    };

    let in_band = resonances
        .iter()
        .filter(|(_, r)| (ENERGY_BAND.0..=ENERGY_BAND.1).contains(&r.energy_estimate))
        .count();
    let energy_concentration = !resonances.is_empty() && in_band as f64 / resonances.len() as f64 > 0.5;

    let categories = ratios
        .into_iter()
        .filter_map(|(category, r)| {
            Some(CategoryPattern {
                category,
                mean_ratio: stats::mean(&r)?,
                median_ratio: stats::median(&r)?,
                close_matches: r
                    .iter()
                    .filter(|&&x| (CLOSE_MATCH_BAND.0..=CLOSE_MATCH_BAND.1).contains(&x))
                    .count(),
            })
        })
        .collect();

    PatternChecks {
        hierarchy,
        uniqueness,
        energy_concentration,
        categories,
    }
}

/// Reading of a level's pattern rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Interpretation {
    #[serde(rename = "robust pattern")]
    Robust,
    #[serde(rename = "partially preserved")]
    Partial,
    #[serde(rename = "not preserved")]
    NotPreserved,
}

impl Interpretation {
    /// Robust above 40 % for both hierarchy and uniqueness, partial when
    /// either exceeds 20 %.
    pub fn from_rates(hierarchy: f64, uniqueness: f64) -> Self {
        if hierarchy > 0.4 && uniqueness > 0.4 {
            Self::Robust
        } else if hierarchy > 0.2 || uniqueness > 0.2 {
            Self::Partial
        } else {
            Self::NotPreserved
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Robust => "robust pattern",
            Self::Partial => "partially preserved",
            Self::NotPreserved => "not preserved",
        }
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mean best quality of one constant across a level's trials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstantDrift {
    pub name: String,
    pub reference_quality: Option<f64>,
    pub mean_quality: f64,
    pub std_quality: Option<f64>,
    /// Trials in which the perturbed constant stayed positive.
    pub trials: u64,
}

/// Per-category ratios aggregated over a level's trials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRatios {
    pub category: Category,
    /// Median over trials of the per-trial median ratio.
    pub median_ratio: f64,
    pub mean_close_matches: f64,
}

/// Pattern rates at one perturbation level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelResult {
    pub sigma: f64,
    pub trials: u64,
    pub hierarchy_count: u64,
    pub uniqueness_count: u64,
    pub energy_count: u64,
    pub hierarchy_rate: f64,
    pub uniqueness_rate: f64,
    pub energy_rate: f64,
    /// `P(X ≥ hierarchy_count)` for `X ~ B(trials, chance_rate)`.
    pub hierarchy_p_value: f64,
    pub interpretation: Interpretation,
    pub categories: Vec<CategoryRatios>,
    pub constants: Vec<ConstantDrift>,
}

/// Result of the perturbation experiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerturbationTest {
    pub config: PerturbationConfig,
    pub sample_size: usize,
    pub levels: Vec<LevelResult>,
    /// Levels with a hierarchy rate above 40 %.
    pub robust_levels: usize,
    pub mean_hierarchy_rate: f64,
    pub mean_uniqueness_rate: f64,
    /// Mean hierarchy and uniqueness rates both above 30 %.
    pub robust: bool,
}

impl PerturbationTest {
    /// Runs every level on [`constants::physical_constants`] against
    /// [`constants::reference_results`].
    pub fn run(dataset: &ZeroDataset, config: &PerturbationConfig) -> Result<Self> {
        Self::run_with(
            dataset,
            config,
            &constants::physical_constants(),
            &constants::reference_results(),
        )
    }

    /// # Errors
    /// [`ZetaError::InvalidParameter`] for no levels, zero trials, a zero
    /// sample, a chance rate outside `[0, 1]` or a negative level.
    pub fn run_with(
        dataset: &ZeroDataset,
        config: &PerturbationConfig,
        catalogue: &[PhysicalConstant],
        reference: &[ReferenceResult],
    ) -> Result<Self> {
        require_trials(config.n_simulations)?;
        if config.levels.is_empty() {
            return Err(ZetaError::InvalidParameter("no perturbation levels".into()));
        }
        let records = sample(dataset, config.sample_size)?;
        let perturbations = config
            .levels
            .iter()
            .map(|&sigma| Perturbation::new(sigma))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let n = config.n_simulations as u64;
        // validates chance_rate before any trial runs
        Binomial::new(n, config.chance_rate)?;

        info!(
            levels = config.levels.len(),
            simulations = config.n_simulations,
            zeros = records.len(),
            seed = config.seed,
            "perturbation test started"
        );
        let mut levels = Vec::with_capacity(perturbations.len());
        for (i, perturbation) in perturbations.iter().enumerate() {
            let level_seed = random::trial_seed(config.seed, i as u64);
            let level = run_level(records, perturbation, level_seed, config, catalogue, reference)?;
            debug!(
                sigma = level.sigma,
                hierarchy = level.hierarchy_rate,
                uniqueness = level.uniqueness_rate,
                energy = level.energy_rate,
                "perturbation level done"
            );
            levels.push(level);
        }

        let n_levels = levels.len() as f64;
        let mean_hierarchy_rate = levels.iter().map(|l| l.hierarchy_rate).sum::<f64>() / n_levels;
        let mean_uniqueness_rate = levels.iter().map(|l| l.uniqueness_rate).sum::<f64>() / n_levels;
        let robust = mean_hierarchy_rate > 0.3 && mean_uniqueness_rate > 0.3;
        let robust_levels = levels.iter().filter(|l| l.hierarchy_rate > 0.4).count();
        info!(
            mean_hierarchy_rate,
            mean_uniqueness_rate,
            robust_levels,
            robust,
            "perturbation test finished"
        );

        Ok(Self {
            config: config.clone(),
            sample_size: records.len(),
            levels,
            robust_levels,
            mean_hierarchy_rate,
            mean_uniqueness_rate,
            robust,
        })
    }
}

fn run_level(
    records: &[ZeroRecord],
    perturbation: &Perturbation,
    level_seed: u64,
    config: &PerturbationConfig,
    catalogue: &[PhysicalConstant],
    reference: &[ReferenceResult],
) -> Result<LevelResult> {
    let n = config.n_simulations as u64;
    let mut drift: Vec<WelfordAccumulator> = vec![WelfordAccumulator::new(); catalogue.len()];
    let mut median_ratios: BTreeMap<Category, Vec<f64>> = BTreeMap::new();
    let mut close_matches: BTreeMap<Category, Vec<f64>> = BTreeMap::new();
    let (mut hierarchy, mut uniqueness, mut energy) = (0_u64, 0_u64, 0_u64);

    for t in 0..n {
        let mut rng = random::trial_rng(level_seed, t);
        let mut resonances = Vec::with_capacity(catalogue.len());
        for (k, constant) in catalogue.iter().enumerate() {
            let c = perturbation.apply(constant.value, &mut rng);
            if !(c > 0.0) || !c.is_finite() {
                continue;
            }
            if let Some(r) = resonance::best_resonance(records, &constant.name, c) {
                drift[k].update(r.quality);
                resonances.push((constant.category, r));
            }
        }

        let checks = pattern_checks(&resonances, reference);
        hierarchy += u64::from(checks.hierarchy);
        uniqueness += u64::from(checks.uniqueness);
        energy += u64::from(checks.energy_concentration);
        for p in checks.categories {
            median_ratios.entry(p.category).or_default().push(p.median_ratio);
            close_matches.entry(p.category).or_default().push(p.close_matches as f64);
        }
    }

    let rate = |k: u64| k as f64 / n as f64;
    let (hierarchy_rate, uniqueness_rate) = (rate(hierarchy), rate(uniqueness));
    let categories = median_ratios
        .iter()
        .filter_map(|(category, ratios)| {
            Some(CategoryRatios {
                category: *category,
                median_ratio: stats::median(ratios)?,
                mean_close_matches: stats::mean(close_matches.get(category)?)?,
            })
        })
        .collect();
    let constants = catalogue
        .iter()
        .zip(&drift)
        .filter_map(|(constant, acc)| {
            Some(ConstantDrift {
                name: constant.name.clone(),
                reference_quality: constants::find_reference(reference, &constant.name).map(|r| r.quality),
                mean_quality: acc.mean()?,
                std_quality: acc.sample_std_dev(),
                trials: acc.count(),
            })
        })
        .collect();

    Ok(LevelResult {
        sigma: perturbation.sigma(),
        trials: n,
        hierarchy_count: hierarchy,
        uniqueness_count: uniqueness,
        energy_count: energy,
        hierarchy_rate,
        uniqueness_rate,
        energy_rate: rate(energy),
        hierarchy_p_value: Binomial::new(n, config.chance_rate)?.sf(hierarchy),
        interpretation: Interpretation::from_rates(hierarchy_rate, uniqueness_rate),
        categories,
        constants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;
    use rand::Rng;

    /// Heights with roughly unit gaps and a little jitter, starting at 1e3.
    fn jittered_zeros(n: usize, seed: u64) -> ZeroDataset {
        let mut rng = create_rng(seed);
        let gammas = (0..n)
            .map(|k| 1000.0 + k as f64 + rng.random_range(-0.3..0.3))
            .collect();
        ZeroDataset::from_gammas(gammas).unwrap()
    }

    fn small_control(seed: u64) -> NegativeControlConfig {
        NegativeControlConfig {
            n_simulations: 50,
            n_constants: 5,
            log_min: -3.0,
            log_max: 1.0,
            sample_size: 500,
            seed,
        }
    }

    fn resonance(name: &str, quality: f64, gamma: f64) -> Resonance {
        Resonance {
            constant: name.to_string(),
            value: 1.0,
            quality,
            error_percent: quality * 100.0,
            zero_index: 1,
            gamma,
            energy_estimate: gamma / 10.0,
        }
    }

    #[test]
    fn test_negative_control_reproducible() {
        let ds = jittered_zeros(2000, 1);
        let a = NegativeControl::run(&ds, &small_control(7)).unwrap();
        let b = NegativeControl::run(&ds, &small_control(7)).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.p_values(&constants::reference_results()),
            b.p_values(&constants::reference_results())
        );

        let c = NegativeControl::run(&ds, &small_control(8)).unwrap();
        assert_ne!(a.best_qualities(), c.best_qualities());
    }

    #[test]
    fn test_negative_control_trials() {
        let ds = jittered_zeros(2000, 2);
        let mc = NegativeControl::run(&ds, &small_control(3)).unwrap();
        assert_eq!(mc.sample_size, 500);
        assert_eq!(mc.trials.len() + mc.invalid_trials, 50);
        assert_eq!(mc.invalid_trials, 0);
        for t in &mc.trials {
            assert!(t.best_quality <= t.mean_quality);
            assert!(t.best_quality >= 0.0);
            assert!(t.best_quality <= t.best_constant / 2.0);
            assert!((1e-3..10.0).contains(&t.best_constant));
        }
    }

    #[test]
    fn test_negative_control_uses_whole_small_dataset() {
        let ds = jittered_zeros(100, 2);
        let mc = NegativeControl::run(&ds, &small_control(3)).unwrap();
        assert_eq!(mc.sample_size, 100);
    }

    #[test]
    fn test_negative_control_summary() {
        let ds = jittered_zeros(1000, 4);
        let mc = NegativeControl::run(&ds, &small_control(5)).unwrap();
        let s = mc.summary().unwrap();
        assert_eq!(s.valid_trials, 50);
        assert_eq!(s.quality_percentiles.len(), PERCENTILE_LEVELS.len());
        assert!(s.quality_percentiles.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(s.best_quality.min <= s.best_quality.median);
    }

    #[test]
    fn test_p_values_bounds_and_ordering() {
        let ds = jittered_zeros(1000, 4);
        let mc = NegativeControl::run(&ds, &small_control(5)).unwrap();
        let reference = vec![
            ReferenceResult {
                name: "hopeless".into(),
                quality: 1e6,
                error_percent: 1e6,
                zero_index: 1,
            },
            ReferenceResult {
                name: "perfect".into(),
                quality: 0.0,
                error_percent: 0.0,
                zero_index: 1,
            },
        ];
        let p = mc.p_values(&reference);
        assert_eq!(p[0].name, "perfect");
        assert!(p[0].quality.is_bounded());
        // 50 trials resolve p < 0.02 only
        assert_eq!(p[0].significance, Significance::Moderate);
        assert_eq!(p[1].quality.p_value(), 1.0);
        assert_eq!(p[1].significance, Significance::NotSignificant);

        let verdict = ControlVerdict::from_p_values(&p);
        assert_eq!(verdict.tested, 2);
        assert_eq!(verdict.significant, 1);
        assert!(verdict.extremely_significant.is_empty());
    }

    #[test]
    fn test_negative_control_rejects_bad_config() {
        let ds = jittered_zeros(100, 1);
        let mut cfg = small_control(1);
        cfg.n_simulations = 0;
        assert!(NegativeControl::run(&ds, &cfg).is_err());
        let mut cfg = small_control(1);
        cfg.log_min = 2.0;
        assert!(NegativeControl::run(&ds, &cfg).is_err());
        let mut cfg = small_control(1);
        cfg.sample_size = 0;
        assert!(matches!(
            NegativeControl::run(&ds, &cfg),
            Err(ZetaError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_pattern_checks_hierarchy() {
        let reference = constants::reference_results();
        let resonances = vec![
            (Category::Cosmology, resonance("dark_energy", 1e-9, 1e6)),
            (Category::Cosmology, resonance("baryon_density", 2e-9, 1e6)),
            (Category::Forces, resonance("strong", 5e-9, 1e6)),
            (Category::Forces, resonance("weak", 1e-8, 1e6)),
            // no reference result: ignored by the hierarchy
            (Category::Masses, resonance("tau_electron", 1e-12, 1e6)),
        ];
        let checks = pattern_checks(&resonances, &reference);
        assert!(checks.hierarchy);
        assert!(checks.energy_concentration);
        assert_eq!(checks.categories.len(), 2);

        let flipped = vec![
            (Category::Cosmology, resonance("dark_energy", 1e-7, 1e6)),
            (Category::Forces, resonance("strong", 5e-9, 1e6)),
        ];
        assert!(!pattern_checks(&flipped, &reference).hierarchy);
    }

    #[test]
    fn test_pattern_checks_uniqueness_and_energy() {
        let reference = constants::reference_results();
        let resonances = vec![
            (Category::Forces, resonance("a", 1e-12, 10.0)),
            (Category::Forces, resonance("b", 1e-6, 10.0)),
            (Category::Forces, resonance("c", 1e-6, 6e5)),
        ];
        let checks = pattern_checks(&resonances, &reference);
        assert!(checks.uniqueness);
        assert!(!checks.energy_concentration);
        assert!(!checks.hierarchy);
        assert!(checks.categories.is_empty());

        let empty = pattern_checks(&[], &reference);
        assert!(!empty.hierarchy && !empty.uniqueness && !empty.energy_concentration);
    }

    #[test]
    fn test_category_ratios() {
        let reference = constants::reference_results();
        let dark = constants::find_reference(&reference, "dark_energy").unwrap().quality;
        let hubble = constants::find_reference(&reference, "hubble_reduced").unwrap().quality;
        let resonances = vec![
            (Category::Cosmology, resonance("dark_energy", dark * 2.0, 1e6)),
            (Category::Cosmology, resonance("hubble_reduced", hubble * 100.0, 1e6)),
        ];
        let checks = pattern_checks(&resonances, &reference);
        let cosmo = &checks.categories[0];
        assert_eq!(cosmo.category, Category::Cosmology);
        assert!((cosmo.mean_ratio - 51.0).abs() < 1e-9);
        assert!((cosmo.median_ratio - 51.0).abs() < 1e-9);
        assert_eq!(cosmo.close_matches, 1);
    }

    #[test]
    fn test_interpretation() {
        assert_eq!(Interpretation::from_rates(0.5, 0.5), Interpretation::Robust);
        assert_eq!(Interpretation::from_rates(0.5, 0.1), Interpretation::Partial);
        assert_eq!(Interpretation::from_rates(0.1, 0.25), Interpretation::Partial);
        assert_eq!(Interpretation::from_rates(0.2, 0.2), Interpretation::NotPreserved);
        assert_eq!(Interpretation::Robust.to_string(), "robust pattern");
    }

    fn small_perturbation(levels: Vec<f64>) -> PerturbationConfig {
        PerturbationConfig {
            levels,
            n_simulations: 20,
            sample_size: 1500,
            chance_rate: 0.2,
            seed: 9,
        }
    }

    #[test]
    fn test_perturbation_reproducible_and_bounded() {
        let ds = jittered_zeros(3000, 6);
        let cfg = small_perturbation(vec![0.001, 1.0]);
        let a = PerturbationTest::run(&ds, &cfg).unwrap();
        let b = PerturbationTest::run(&ds, &cfg).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.levels.len(), 2);
        assert_eq!(a.sample_size, 1500);
        for level in &a.levels {
            assert_eq!(level.trials, 20);
            for rate in [level.hierarchy_rate, level.uniqueness_rate, level.energy_rate] {
                assert!((0.0..=1.0).contains(&rate));
            }
            assert!((0.0..=1.0).contains(&level.hierarchy_p_value));
        }
        // σ = 0.1% keeps every constant positive
        assert!(a.levels[0].constants.iter().all(|c| c.trials == 20));
        assert_eq!(a.levels[0].constants.len(), 19);
    }

    #[test]
    fn test_wide_perturbation_skips_non_positive_constants() {
        let ds = jittered_zeros(3000, 6);
        let test = PerturbationTest::run(&ds, &small_perturbation(vec![1.0])).unwrap();
        let level = &test.levels[0];
        assert_eq!(level.trials, 20);
        // N(1, 1) factors fall below zero about one time in six
        assert!(level.constants.iter().all(|c| c.trials <= 20));
        assert!(level.constants.iter().any(|c| c.trials < 20));
        let kept: u64 = level.constants.iter().map(|c| c.trials).sum();
        assert!(kept < 19 * 20);
        assert!(kept > 19 * 20 / 2);
        for c in &level.constants {
            assert!(c.mean_quality.is_finite() && c.mean_quality >= 0.0, "{}", c.name);
        }
    }

    #[test]
    fn test_unperturbed_level_matches_direct_search() {
        let ds = jittered_zeros(2000, 8);
        let cfg = small_perturbation(vec![0.0]);
        let test = PerturbationTest::run(&ds, &cfg).unwrap();
        let level = &test.levels[0];
        let records = ds.tail(1500);
        for (drift, constant) in level.constants.iter().zip(constants::physical_constants()) {
            let direct = resonance::best_resonance(records, &constant.name, constant.value).unwrap();
            assert_eq!(drift.mean_quality, direct.quality, "{}", constant.name);
        }
        // every trial is identical, so each pattern holds always or never
        for count in [level.hierarchy_count, level.uniqueness_count, level.energy_count] {
            assert!(count == 0 || count == 20);
        }
    }

    #[test]
    fn test_perturbation_rejects_bad_config() {
        let ds = jittered_zeros(100, 1);
        assert!(PerturbationTest::run(&ds, &small_perturbation(vec![])).is_err());
        assert!(PerturbationTest::run(&ds, &small_perturbation(vec![-0.1])).is_err());
        let mut cfg = small_perturbation(vec![0.01]);
        cfg.chance_rate = 1.5;
        assert!(PerturbationTest::run(&ds, &cfg).is_err());
    }
}
