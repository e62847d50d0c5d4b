//! Analysis configuration from TOML.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields the standard analysis. Command-line flags are applied on top
//! of whatever the file sets.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ZetaError;
use crate::montecarlo::{NegativeControlConfig, PerturbationConfig};
use crate::resonance::SignificanceCriteria;
use crate::spacing::PairCorrelationConfig;
use crate::weyl::WeylConfig;

/// Configuration file read from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "zeta-stats.toml";

/// Top-level analysis configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub data: DataConfig,
    pub weyl: WeylConfig,
    pub spacing: SpacingConfig,
    pub resonance: ResonanceConfig,
    pub negative_control: NegativeControlConfig,
    pub perturbation: PerturbationConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub path: PathBuf,
    /// Abort on the first malformed row.
    pub strict: bool,
    pub limit: Option<usize>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("zeta_zeros.txt"),
            strict: false,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingConfig {
    /// Histogram bins for the unfolded spacings.
    pub bins: usize,
    pub pair_correlation: PairCorrelationConfig,
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self {
            bins: 40,
            pair_correlation: PairCorrelationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResonanceConfig {
    pub criteria: SignificanceCriteria,
    /// Single tolerance for the control-constant comparison.
    pub control_tolerance: f64,
    /// Also scan the control constants.
    pub include_controls: bool,
}

impl Default for ResonanceConfig {
    fn default() -> Self {
        Self {
            criteria: SignificanceCriteria::default(),
            control_tolerance: crate::constants::DEFAULT_TOLERANCE,
            include_controls: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Print the JSON report to stdout instead of the text report.
    pub json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
            json: false,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AnalysisConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Loads `explicit` if given. Otherwise loads `fallback` when it exists,
    /// and falls back to the defaults when it does not.
    pub fn resolve(explicit: Option<&Path>, fallback: impl AsRef<Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if fallback.as_ref().is_file() => Self::load(fallback),
            None => Ok(Self::default()),
        }
    }

    /// Sets the seed of both Monte Carlo experiments.
    pub fn set_seed(&mut self, seed: u64) {
        self.negative_control.seed = seed;
        self.perturbation.seed = seed;
    }

    /// Sets the trial count of both Monte Carlo experiments.
    pub fn set_simulations(&mut self, n: usize) {
        self.negative_control.n_simulations = n;
        self.perturbation.n_simulations = n;
    }

    /// Sets the zero sample of both Monte Carlo experiments.
    pub fn set_sample_size(&mut self, n: usize) {
        self.negative_control.sample_size = n;
        self.perturbation.sample_size = n;
    }

    /// Rejects values no stage can run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        let fail = |msg: String| -> crate::error::Result<()> { Err(ZetaError::Config(msg)) };
        if self.negative_control.n_simulations == 0 || self.perturbation.n_simulations == 0 {
            return fail("n_simulations must be positive".into());
        }
        if self.negative_control.sample_size == 0 || self.perturbation.sample_size == 0 {
            return fail("sample_size must be positive".into());
        }
        if self.negative_control.log_min >= self.negative_control.log_max {
            return fail(format!(
                "log_min ({}) must be below log_max ({})",
                self.negative_control.log_min, self.negative_control.log_max
            ));
        }
        if !(0.0..=1.0).contains(&self.perturbation.chance_rate) {
            return fail(format!("chance_rate {} outside [0, 1]", self.perturbation.chance_rate));
        }
        if let Some(level) = self.perturbation.levels.iter().find(|l| !(**l >= 0.0)) {
            return fail(format!("perturbation level {level} must be non-negative"));
        }
        if !(self.resonance.control_tolerance > 0.0) {
            return fail("control_tolerance must be positive".into());
        }
        if self.spacing.bins == 0 {
            return fail("spacing bins must be positive".into());
        }
        Ok(())
    }
}
