//! Report assembly, plain-text rendering and export.
//!
//! [`AnalysisReport`] collects the output of whichever stages ran. It
//! serialises to JSON as is; [`render_text`] lays the same content out as
//! fixed-width tables for reading in a terminal.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::constants::ReferenceResult;
use crate::dataset::{LoadReport, ZeroDataset, ZeroRecord};
use crate::error::{Result, ZetaError};
use crate::montecarlo::{
    ControlSummary, ControlVerdict, NegativeControl, NegativeControlConfig, PerturbationTest,
    ReferencePValue,
};
use crate::resonance::{ConstantScan, ControlComparison};
use crate::spacing::SpacingReport;
use crate::stats::{self, Summary};
use crate::weyl::{self, WeylAnalysis};

/// Descriptive statistics of the heights and their gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptive {
    pub zeros: usize,
    pub first: ZeroRecord,
    pub last: ZeroRecord,
    pub gamma: Summary,
    /// `None` for a single zero.
    pub gaps: Option<Summary>,
    /// Mean gap predicted at the highest zero.
    pub expected_last_gap: Option<f64>,
}

impl Descriptive {
    pub fn compute(dataset: &ZeroDataset) -> Option<Self> {
        let gamma = Summary::from_slice(dataset.gammas())?;
        let gaps = stats::diff(dataset.gammas());
        let last = *dataset.last();
        Some(Self {
            zeros: dataset.len(),
            first: *dataset.first(),
            last,
            gamma,
            gaps: Summary::from_slice(&gaps),
            expected_last_gap: weyl::expected_spacing(last.gamma),
        })
    }
}

/// Negative-control outcome without the per-trial records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NegativeControlSection {
    pub config: NegativeControlConfig,
    pub sample_size: usize,
    pub invalid_trials: usize,
    pub summary: Option<ControlSummary>,
    pub p_values: Vec<ReferencePValue>,
    pub verdict: ControlVerdict,
}

impl NegativeControlSection {
    pub fn new(control: &NegativeControl, reference: &[ReferenceResult]) -> Self {
        let p_values = control.p_values(reference);
        let verdict = ControlVerdict::from_p_values(&p_values);
        Self {
            config: control.config.clone(),
            sample_size: control.sample_size,
            invalid_trials: control.invalid_trials,
            summary: control.summary(),
            p_values,
            verdict,
        }
    }
}

/// Everything one run produced. Stages that did not run are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    /// Dataset path, when loaded from disk.
    pub source: Option<String>,
    pub load: Option<LoadReport>,
    pub descriptive: Option<Descriptive>,
    pub weyl: Option<WeylAnalysis>,
    pub spacing: Option<SpacingReport>,
    pub scan: Option<Vec<ConstantScan>>,
    pub controls: Option<Vec<ControlComparison>>,
    pub negative_control: Option<NegativeControlSection>,
    pub perturbation: Option<PerturbationTest>,
}

impl AnalysisReport {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            source: None,
            load: None,
            descriptive: None,
            weyl: None,
            spacing: None,
            scan: None,
            controls: None,
            negative_control: None,
            perturbation: None,
        }
    }
}

impl Default for AnalysisReport {
    fn default() -> Self {
        Self::new()
    }
}

const RULE: &str =
    "================================================================================";
const THIN_RULE: &str =
    "--------------------------------------------------------------------------------";

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{title}\n{THIN_RULE}");
}

fn opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$e}"),
        None => "-".to_string(),
    }
}

/// Renders `report` as plain text.
pub fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}\nRIEMANN ZETA ZEROS: STATISTICAL ANALYSIS\n{RULE}");
    let _ = writeln!(out, "Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(source) = &report.source {
        let _ = writeln!(out, "Dataset:   {source}");
    }

    if let Some(load) = &report.load {
        render_load(&mut out, load);
    }
    if let Some(d) = &report.descriptive {
        render_descriptive(&mut out, d);
    }
    if let Some(w) = &report.weyl {
        render_weyl(&mut out, w);
    }
    if let Some(s) = &report.spacing {
        render_spacing(&mut out, s);
    }
    if let Some(scan) = &report.scan {
        render_scan(&mut out, scan);
    }
    if let Some(controls) = &report.controls {
        render_controls(&mut out, controls);
    }
    if let Some(nc) = &report.negative_control {
        render_negative_control(&mut out, nc);
    }
    if let Some(p) = &report.perturbation {
        render_perturbation(&mut out, p);
    }
    render_conclusions(&mut out, report);
    out
}

fn render_load(out: &mut String, load: &LoadReport) {
    heading(out, "DATA LOADING");
    let _ = writeln!(out, "Lines read:        {}", load.lines_read);
    let _ = writeln!(out, "Records accepted:  {}", load.accepted);
    let _ = writeln!(out, "Malformed rows:    {}", load.malformed.len());
    let _ = writeln!(out, "Duplicate heights: {}", load.duplicates);
    if load.resorted {
        let _ = writeln!(out, "Input was unsorted and has been sorted by height.");
    }
    if load.truncated {
        let _ = writeln!(out, "Input truncated at the configured record limit.");
    }
}

fn render_descriptive(out: &mut String, d: &Descriptive) {
    heading(out, "DESCRIPTIVE STATISTICS");
    let _ = writeln!(out, "Zeros:        {}", d.zeros);
    let _ = writeln!(out, "First zero:   #{} at {:.6}", d.first.index, d.first.gamma);
    let _ = writeln!(out, "Last zero:    #{} at {:.6}", d.last.index, d.last.gamma);
    let _ = writeln!(out, "{:<10} {:>16} {:>16}", "", "gamma", "gap");
    let g = &d.gamma;
    let rows: [(&str, f64, Option<f64>); 7] = [
        ("mean", g.mean, d.gaps.as_ref().map(|s| s.mean)),
        ("std", g.std_dev, d.gaps.as_ref().map(|s| s.std_dev)),
        ("min", g.min, d.gaps.as_ref().map(|s| s.min)),
        ("q1", g.q1, d.gaps.as_ref().map(|s| s.q1)),
        ("median", g.median, d.gaps.as_ref().map(|s| s.median)),
        ("q3", g.q3, d.gaps.as_ref().map(|s| s.q3)),
        ("max", g.max, d.gaps.as_ref().map(|s| s.max)),
    ];
    for (label, gamma, gap) in rows {
        let gap = gap.map_or_else(|| "-".to_string(), |v| format!("{v:.6}"));
        let _ = writeln!(out, "{label:<10} {gamma:>16.4} {gap:>16}");
    }
    if let Some(cv) = d.gaps.as_ref().and_then(Summary::coefficient_of_variation) {
        let _ = writeln!(out, "Gap coefficient of variation: {cv:.4}");
    }
    if let Some(expected) = d.expected_last_gap {
        let _ = writeln!(out, "Expected gap at the last zero: {expected:.6}");
    }
}

fn render_weyl(out: &mut String, w: &WeylAnalysis) {
    heading(out, "COUNTING FUNCTION");
    let _ = writeln!(out, "Formula: {:?}", w.formula);
    let _ = writeln!(
        out,
        "{:>14} {:>12} {:>16} {:>12}",
        "T", "N(T)", "predicted", "rel. error"
    );
    for c in &w.counts {
        let _ = writeln!(
            out,
            "{:>14.2} {:>12} {:>16.2} {:>12}",
            c.height,
            c.observed,
            c.predicted,
            opt(c.relative_error, 3)
        );
    }
    let _ = writeln!(out, "Mean relative error: {}", opt(w.mean_relative_error, 3));

    if !w.regions.is_empty() {
        heading(out, "SPACING BY REGION");
        let _ = writeln!(
            out,
            "{:>22} {:>9} {:>11} {:>11} {:>8} {:>8}",
            "region", "zeros", "mean gap", "expected", "ratio", "cv"
        );
        for r in &w.regions {
            let _ = writeln!(
                out,
                "{:>22} {:>9} {:>11.6} {:>11.6} {:>8.4} {:>8.4}",
                format!("[{:.0e}, {:.0e}]", r.lo, r.hi),
                r.zeros,
                r.mean_gap,
                r.expected_gap,
                r.gap_ratio,
                r.cv
            );
        }
    }

    if !w.decades.is_empty() {
        heading(out, "DENSITY BY LOG BIN");
        let _ = writeln!(
            out,
            "{:>14} {:>9} {:>12} {:>12} {:>8}",
            "center", "zeros", "observed", "theory", "ratio"
        );
        for d in &w.decades {
            let _ = writeln!(
                out,
                "{:>14.2} {:>9} {:>12.6} {:>12.6} {:>8.4}",
                d.center, d.zeros, d.observed_density, d.theoretical_density, d.density_ratio
            );
        }
    }

    if let Some(c) = &w.concentration {
        let _ = writeln!(
            out,
            "\nHistogram concentration over {} bins: max {} mean {:.2} cv {:.4}, {} bins above mean + 3 sd",
            c.bins, c.max_count, c.mean_count, c.cv, c.outlier_bins
        );
    }
    let s = &w.scale;
    let _ = writeln!(
        out,
        "Window [{:.0}, {:.0}]: {} zeros, density {:.6} (before {:.6}, after {:.6})",
        s.windows.window.0,
        s.windows.window.1,
        s.window_zeros,
        s.window_density,
        s.before_density,
        s.after_density
    );
    let _ = writeln!(out, "Window checks passed: {} of 3 (score {:.2})", w.checks.passed, w.checks.score);
}

fn render_spacing(out: &mut String, s: &SpacingReport) {
    heading(out, "NEAREST-NEIGHBOUR SPACINGS (UNFOLDED)");
    match &s.distribution {
        Some(d) => {
            let _ = writeln!(out, "Spacings: {}  mean {:.6}  std {:.6}", d.summary.count, d.summary.mean, d.summary.std_dev);
            let _ = writeln!(out, "{:<10} {:>12} {:>12}", "reference", "KS D", "p-value");
            let _ = writeln!(out, "{:<10} {:>12.6} {:>12.3e}", "GUE", d.gue_ks.statistic, d.gue_ks.p_value);
            let _ = writeln!(out, "{:<10} {:>12.6} {:>12.3e}", "Poisson", d.poisson_ks.statistic, d.poisson_ks.p_value);
            let _ = writeln!(
                out,
                "Fraction s < 0.1: observed {:.5}, GUE {:.5}, Poisson {:.5}",
                d.small_fraction, d.gue_small_fraction, d.poisson_small_fraction
            );
            let closer = if d.favours_gue() { "GUE" } else { "Poisson" };
            let _ = writeln!(out, "Closer reference: {closer}");
        }
        None => {
            let _ = writeln!(out, "Not enough zeros for a spacing distribution.");
        }
    }
    for c in &s.correlations {
        let _ = writeln!(
            out,
            "Pair correlation near {:.0e}: {} base points, mean |R2 - Montgomery| = {:.4}",
            c.scale, c.correlation.base_points, c.correlation.mean_abs_deviation
        );
    }
}

fn render_scan(out: &mut String, scan: &[ConstantScan]) {
    heading(out, "RESONANCE SCAN");
    let _ = writeln!(
        out,
        "{:<24} {:>12} {:>12} {:>10} {:>12}",
        "constant", "best quality", "error %", "zero", "significant"
    );
    for s in scan {
        let (quality, error, index) = match &s.best {
            Some(b) => (format!("{:.3e}", b.quality), format!("{:.3e}", b.error_percent), b.zero_index.to_string()),
            None => ("-".into(), "-".into(), "-".into()),
        };
        let significant = s.levels.iter().filter(|l| l.significant).count();
        let _ = writeln!(
            out,
            "{:<24} {:>12} {:>12} {:>10} {:>9}/{}",
            s.constant.name,
            quality,
            error,
            index,
            significant,
            s.levels.len()
        );
    }
    for s in scan.iter().filter(|s| s.any_significant()) {
        for l in s.levels.iter().filter(|l| l.significant) {
            let _ = writeln!(out, "  {} at tolerance {:.0e}: {}", s.constant.name, l.tolerance, l.reason);
        }
    }
}

fn render_controls(out: &mut String, controls: &[ControlComparison]) {
    heading(out, "CONTROL CONSTANTS");
    let _ = writeln!(out, "{:<20} {:>14} {:>10} {:>10} {:>10}", "constant", "value", "count", "rate %", "factor");
    for c in controls {
        let factor = c.statistics.as_ref().map(|s| s.significance_factor);
        let _ = writeln!(
            out,
            "{:<20} {:>14.8} {:>10} {:>10.5} {:>10}",
            c.name,
            c.value,
            c.count,
            c.rate_percent,
            factor.map_or_else(|| "-".to_string(), |f| format!("{f:.3}"))
        );
    }
}

fn render_negative_control(out: &mut String, nc: &NegativeControlSection) {
    heading(out, "MONTE CARLO NEGATIVE CONTROL");
    let _ = writeln!(
        out,
        "Random constants: {} per trial, log-uniform on [1e{}, 1e{}], {} zeros searched",
        nc.config.n_constants, nc.config.log_min, nc.config.log_max, nc.sample_size
    );
    if let Some(s) = &nc.summary {
        let _ = writeln!(out, "Valid trials: {} (invalid {})", s.valid_trials, nc.invalid_trials);
        let _ = writeln!(out, "{:>6} {:>14} {:>14}", "pct", "best quality", "best error %");
        for ((p, q), (_, e)) in s.quality_percentiles.iter().zip(&s.error_percentiles) {
            let _ = writeln!(out, "{p:>6} {q:>14.3e} {e:>14.3e}");
        }
    }
    let _ = writeln!(
        out,
        "\n{:<24} {:>14} {:>12} {:>12} {:>5}",
        "constant", "observed", "p(quality)", "p(error)", "sig"
    );
    for p in &nc.p_values {
        let _ = writeln!(
            out,
            "{:<24} {:>14.3e} {:>12} {:>12} {:>5}",
            p.name,
            p.observed_quality,
            p.quality.to_string(),
            p.error.to_string(),
            p.significance.stars()
        );
    }
    let _ = writeln!(out, "\n*** p < 0.001   ** p < 0.01   * p < 0.05   n.s. not significant");
}

fn render_perturbation(out: &mut String, p: &PerturbationTest) {
    heading(out, "PERTURBATION ROBUSTNESS");
    let _ = writeln!(
        out,
        "{} trials per level, {} zeros searched, chance rate {:.2}",
        p.config.n_simulations, p.sample_size, p.config.chance_rate
    );
    let _ = writeln!(
        out,
        "{:>8} {:>10} {:>11} {:>8} {:>11} {:<20}",
        "sigma", "hierarchy", "uniqueness", "energy", "p(hier.)", "interpretation"
    );
    for l in &p.levels {
        let _ = writeln!(
            out,
            "{:>8} {:>9.1}% {:>10.1}% {:>7.1}% {:>11.3e} {:<20}",
            l.sigma,
            l.hierarchy_rate * 100.0,
            l.uniqueness_rate * 100.0,
            l.energy_rate * 100.0,
            l.hierarchy_p_value,
            l.interpretation.label()
        );
    }
    let _ = writeln!(
        out,
        "Mean hierarchy rate {:.1}%, mean uniqueness rate {:.1}%, {} of {} levels robust",
        p.mean_hierarchy_rate * 100.0,
        p.mean_uniqueness_rate * 100.0,
        p.robust_levels,
        p.levels.len()
    );
}

fn render_conclusions(out: &mut String, report: &AnalysisReport) {
    let _ = writeln!(out, "\n{RULE}\nCONCLUSIONS\n{RULE}");
    let mut any = false;
    if let Some(e) = report.weyl.as_ref().and_then(|w| w.mean_relative_error) {
        let _ = writeln!(out, "- Counting formula mean relative error: {e:.3e}");
        any = true;
    }
    if let Some(d) = report.spacing.as_ref().and_then(|s| s.distribution.as_ref()) {
        let closer = if d.favours_gue() { "GUE (level repulsion)" } else { "Poisson" };
        let _ = writeln!(out, "- Unfolded spacings are closer to {closer}");
        any = true;
    }
    if let Some(scan) = &report.scan {
        let n = scan.iter().filter(|s| s.any_significant()).count();
        let _ = writeln!(out, "- {n}/{} constants show a significant resonance count", scan.len());
        any = true;
    }
    if let Some(nc) = &report.negative_control {
        let v = &nc.verdict;
        let _ = writeln!(
            out,
            "- {}/{} observed resonances beat random constants (p < 0.05), {} at p < 0.001",
            v.significant,
            v.tested,
            v.extremely_significant.len()
        );
        any = true;
    }
    if let Some(p) = &report.perturbation {
        let verdict = if p.robust { "robust" } else { "not robust" };
        let _ = writeln!(out, "- Observed patterns are {verdict} under perturbation of the constants");
        any = true;
    }
    if !any {
        let _ = writeln!(out, "- No analysis stage was run.");
    }
}

/// Paths written by [`write_reports`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub text: PathBuf,
    pub json: PathBuf,
}

/// Writes `report_<timestamp>.txt` and `report_<timestamp>.json` into
/// `dir`, creating it if needed.
pub fn write_reports(report: &AnalysisReport, dir: impl AsRef<Path>) -> Result<ReportPaths> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|source| ZetaError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let stamp = report.generated_at.format("%Y%m%d_%H%M%S");
    let paths = ReportPaths {
        text: dir.join(format!("report_{stamp}.txt")),
        json: dir.join(format!("report_{stamp}.json")),
    };

    let json = serde_json::to_string_pretty(report)?;
    for (path, contents) in [(&paths.text, render_text(report)), (&paths.json, json)] {
        fs::write(path, contents).map_err(|source| ZetaError::Io {
            path: path.clone(),
            source,
        })?;
    }
    info!(text = %paths.text.display(), json = %paths.json.display(), "reports written");
    Ok(paths)
}
