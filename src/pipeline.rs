//! Stage orchestration: load, then run the requested analyses into one
//! report.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{AnalysisConfig, DataConfig};
use crate::constants;
use crate::dataset::{self, LoadOptions, LoadReport, ZeroDataset};
use crate::error::Result;
use crate::montecarlo::{NegativeControl, PerturbationTest};
use crate::report::{AnalysisReport, Descriptive, NegativeControlSection};
use crate::resonance;
use crate::spacing::SpacingReport;
use crate::weyl::WeylAnalysis;

/// One analysis stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Describe,
    Weyl,
    Spacing,
    Scan,
    NegativeControl,
    Perturbation,
}

impl Stage {
    /// Every stage, in pipeline order.
    pub const ALL: [Stage; 6] = [
        Stage::Describe,
        Stage::Weyl,
        Stage::Spacing,
        Stage::Scan,
        Stage::NegativeControl,
        Stage::Perturbation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Describe => "describe",
            Stage::Weyl => "weyl",
            Stage::Spacing => "spacing",
            Stage::Scan => "scan",
            Stage::NegativeControl => "negative-control",
            Stage::Perturbation => "perturbation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Loads the dataset named by `data`.
pub fn load_dataset(data: &DataConfig) -> Result<(ZeroDataset, LoadReport)> {
    let options = LoadOptions {
        strict: data.strict,
        limit: data.limit,
    };
    dataset::load(&data.path, &options)
}

/// Runs `stages` on `dataset` in pipeline order. Descriptive statistics
/// are always included.
pub fn analyse(dataset: &ZeroDataset, config: &AnalysisConfig, stages: &[Stage]) -> Result<AnalysisReport> {
    let mut stages = stages.to_vec();
    stages.sort();
    stages.dedup();

    let mut report = AnalysisReport::new();
    report.descriptive = Descriptive::compute(dataset);
    for stage in stages {
        info!(%stage, zeros = dataset.len(), "running stage");
        match stage {
            Stage::Describe => {}
            Stage::Weyl => report.weyl = Some(WeylAnalysis::compute(dataset, &config.weyl)),
            Stage::Spacing => {
                report.spacing = Some(SpacingReport::compute(
                    dataset,
                    config.spacing.bins,
                    &config.spacing.pair_correlation,
                ))
            }
            Stage::Scan => {
                report.scan = Some(resonance::scan(
                    dataset.records(),
                    &constants::physical_constants(),
                    &config.resonance.criteria,
                ));
                if config.resonance.include_controls {
                    report.controls = Some(resonance::compare_controls(
                        dataset.records(),
                        &constants::control_constants(),
                        config.resonance.control_tolerance,
                    ));
                }
            }
            Stage::NegativeControl => {
                let control = NegativeControl::run(dataset, &config.negative_control)?;
                report.negative_control = Some(NegativeControlSection::new(
                    &control,
                    &constants::reference_results(),
                ));
            }
            Stage::Perturbation => {
                report.perturbation = Some(PerturbationTest::run(dataset, &config.perturbation)?);
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_and_names() {
        let mut stages = vec![Stage::Perturbation, Stage::Describe, Stage::Scan];
        stages.sort();
        assert_eq!(stages, vec![Stage::Describe, Stage::Scan, Stage::Perturbation]);
        assert_eq!(Stage::NegativeControl.to_string(), "negative-control");
        assert_eq!(Stage::ALL.len(), 6);
    }

    #[test]
    fn test_analyse_selected_stages_only() {
        let ds = ZeroDataset::from_gammas((0..300).map(|k| 50.0 + k as f64 * 0.5).collect()).unwrap();
        let report = analyse(&ds, &AnalysisConfig::default(), &[Stage::Scan, Stage::Scan]).unwrap();
        assert!(report.descriptive.is_some());
        assert_eq!(report.scan.as_ref().map(Vec::len), Some(19));
        assert_eq!(report.controls.as_ref().map(Vec::len), Some(11));
        assert!(report.weyl.is_none());
        assert!(report.negative_control.is_none());
    }

    #[test]
    fn test_analyse_propagates_stage_errors() {
        let ds = ZeroDataset::from_gammas(vec![14.134725, 21.02204]).unwrap();
        let mut config = AnalysisConfig::default();
        config.negative_control.n_simulations = 0;
        assert!(analyse(&ds, &config, &[Stage::NegativeControl]).is_err());
    }
}
