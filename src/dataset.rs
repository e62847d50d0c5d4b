//! Riemann zeta zero datasets.
//!
//! A dataset is a text file with one zero per line, either a bare height
//! `γ` or an `index γ` pair separated by whitespace or a comma. Lines
//! starting with `#` and blank lines are ignored. Rows that fail to parse,
//! or carry a non-finite or non-positive height, are reported in
//! [`LoadReport::malformed`] and dropped, unless [`LoadOptions::strict`]
//! is set, in which case the first one aborts the load.
//!
//! Once built, a [`ZeroDataset`] is immutable and sorted ascending by `γ`.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, ZetaError};
use crate::stats;

/// Malformed rows logged individually before switching to a summary.
const MAX_LOGGED_MALFORMED: usize = 10;

/// One non-trivial zero `1/2 + iγ`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZeroRecord {
    /// 1-based ordinal among the known zeros.
    pub index: u64,
    pub gamma: f64,
}

/// Loader settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Abort on the first malformed row instead of skipping it.
    pub strict: bool,
    /// Stop after this many accepted records.
    pub limit: Option<usize>,
}

/// A row that was rejected by the loader.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MalformedRow {
    pub line: usize,
    pub text: String,
    pub reason: String,
}

/// What happened while loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub lines_read: usize,
    pub accepted: usize,
    /// Blank and comment lines.
    pub skipped: usize,
    pub malformed: Vec<MalformedRow>,
    /// Input was not in ascending order and had to be sorted.
    pub resorted: bool,
    /// Records whose `γ` equals the previous record's.
    pub duplicates: usize,
    /// Reading stopped at [`LoadOptions::limit`].
    pub truncated: bool,
}

/// Sorted, immutable collection of zeros.
#[derive(Debug, Clone)]
pub struct ZeroDataset {
    records: Vec<ZeroRecord>,
    gammas: Vec<f64>,
}

/// Reads a dataset from disk in one pass.
///
/// # Errors
/// I/O failures, a malformed row in strict mode, or no valid rows.
pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<(ZeroDataset, LoadReport)> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ZetaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), bytes = text.len(), "reading zero dataset");
    let (dataset, report) = parse(&text, options)?;
    info!(
        zeros = dataset.len(),
        malformed = report.malformed.len(),
        duplicates = report.duplicates,
        resorted = report.resorted,
        gamma_min = dataset.first().gamma,
        gamma_max = dataset.last().gamma,
        "dataset loaded"
    );
    Ok((dataset, report))
}

/// Parses dataset text. See [`load`].
pub fn parse(text: &str, options: &LoadOptions) -> Result<(ZeroDataset, LoadReport)> {
    let mut report = LoadReport::default();
    let mut rows: Vec<(Option<u64>, f64)> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        let is_data = !(line.is_empty() || line.starts_with('#'));
        if is_data && options.limit.is_some_and(|limit| rows.len() >= limit) {
            report.truncated = true;
            break;
        }
        report.lines_read += 1;
        if !is_data {
            report.skipped += 1;
            continue;
        }
        match parse_line(line) {
            Ok(row) => rows.push(row),
            Err(reason) => {
                if options.strict {
                    return Err(ZetaError::Malformed {
                        line: line_no,
                        text: line.to_string(),
                        reason,
                    });
                }
                if report.malformed.len() < MAX_LOGGED_MALFORMED {
                    warn!(line = line_no, text = line, %reason, "skipping malformed row");
                }
                report.malformed.push(MalformedRow {
                    line: line_no,
                    text: line.to_string(),
                    reason,
                });
            }
        }
    }

    if report.malformed.len() > MAX_LOGGED_MALFORMED {
        warn!(
            total = report.malformed.len(),
            "further malformed rows skipped without logging"
        );
    }
    if rows.is_empty() {
        return Err(ZetaError::EmptyDataset(format!(
            "no valid zeros among {} lines",
            report.lines_read
        )));
    }

    report.accepted = rows.len();
    let (dataset, resorted, duplicates) = ZeroDataset::build(rows);
    report.resorted = resorted;
    report.duplicates = duplicates;
    if resorted {
        warn!(zeros = dataset.len(), "input was not sorted by height; sorted in memory");
    }
    Ok((dataset, report))
}

/// One data line: `γ`, or `index γ` separated by whitespace or a comma.
fn parse_line(line: &str) -> std::result::Result<(Option<u64>, f64), String> {
    let fields: Vec<&str> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    let (index, value) = match fields.as_slice() {
        [value] => (None, *value),
        [index, value] => {
            let index = index
                .parse::<u64>()
                .map_err(|_| format!("invalid index {index:?}"))?;
            if index == 0 {
                return Err("index must be 1-based".to_string());
            }
            (Some(index), *value)
        }
        _ => return Err(format!("expected 1 or 2 columns, found {}", fields.len())),
    };
    let gamma = value
        .parse::<f64>()
        .map_err(|_| format!("not a number: {value:?}"))?;
    validate_gamma(gamma)?;
    Ok((index, gamma))
}

fn validate_gamma(gamma: f64) -> std::result::Result<(), String> {
    if !gamma.is_finite() {
        Err("non-finite height".to_string())
    } else if gamma <= 0.0 {
        Err("non-positive height".to_string())
    } else {
        Ok(())
    }
}

impl ZeroDataset {
    /// Builds a dataset from heights held in memory; indices are ordinal.
    ///
    /// # Errors
    /// Empty input, or any non-finite or non-positive height.
    pub fn from_gammas(gammas: Vec<f64>) -> Result<Self> {
        if gammas.is_empty() {
            return Err(ZetaError::EmptyDataset("no heights supplied".to_string()));
        }
        for (i, &g) in gammas.iter().enumerate() {
            validate_gamma(g).map_err(|reason| ZetaError::Malformed {
                line: i + 1,
                text: g.to_string(),
                reason,
            })?;
        }
        let (dataset, resorted, _) = Self::build(gammas.into_iter().map(|g| (None, g)).collect());
        if resorted {
            debug!(zeros = dataset.len(), "sorted in-memory heights");
        }
        Ok(dataset)
    }

    /// Sorts validated rows and assigns ordinal indices where none were
    /// given. Returns the dataset, whether sorting changed the order, and
    /// the duplicate count.
    fn build(mut rows: Vec<(Option<u64>, f64)>) -> (Self, bool, usize) {
        let resorted = rows.windows(2).any(|w| w[1].1 < w[0].1);
        if resorted {
            rows.sort_by(|a, b| a.1.total_cmp(&b.1));
        }
        let duplicates = rows.windows(2).filter(|w| w[1].1 == w[0].1).count();
        let records: Vec<ZeroRecord> = rows
            .into_iter()
            .enumerate()
            .map(|(pos, (index, gamma))| ZeroRecord {
                index: index.unwrap_or(pos as u64 + 1),
                gamma,
            })
            .collect();
        let gammas = records.iter().map(|r| r.gamma).collect();
        (Self { records, gammas }, resorted, duplicates)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always `false` for a constructed dataset.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ZeroRecord] {
        &self.records
    }

    pub fn gammas(&self) -> &[f64] {
        &self.gammas
    }

    pub fn first(&self) -> &ZeroRecord {
        &self.records[0]
    }

    pub fn last(&self) -> &ZeroRecord {
        &self.records[self.records.len() - 1]
    }

    /// The highest `n` zeros, or all of them if there are fewer.
    pub fn tail(&self, n: usize) -> &[ZeroRecord] {
        &self.records[self.records.len().saturating_sub(n)..]
    }

    /// `N(T)`: number of zeros with `γ ≤ t`.
    pub fn count_up_to(&self, t: f64) -> usize {
        self.gammas.partition_point(|&g| g <= t)
    }

    /// Heights in `[lo, hi]`.
    pub fn gammas_between(&self, lo: f64, hi: f64) -> &[f64] {
        let start = self.gammas.partition_point(|&g| g < lo);
        let end = self.gammas.partition_point(|&g| g <= hi).max(start);
        &self.gammas[start..end]
    }

    /// Consecutive gaps `γ_{k+1} − γ_k`.
    pub fn gaps(&self) -> Vec<f64> {
        stats::diff(&self.gammas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FIRST_ZEROS: &str = "\
# first five zeros
14.134725142
21.022039639
25.010857580

30.424876126
32.935061588
";

    #[test]
    fn test_parse_single_column() {
        let (ds, report) = parse(FIRST_ZEROS, &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 5);
        assert_eq!(report.lines_read, 7);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.accepted, 5);
        assert!(report.malformed.is_empty());
        assert!(!report.resorted);
        assert_eq!(ds.first().index, 1);
        assert_eq!(ds.last().index, 5);
        assert_eq!(ds.first().gamma, 14.134725142);
    }

    #[test]
    fn test_parse_index_columns() {
        let text = "1 14.134725142\n2,21.022039639\n3\t25.010857580\n";
        let (ds, _) = parse(text, &LoadOptions::default()).unwrap();
        assert_eq!(ds.records()[1], ZeroRecord { index: 2, gamma: 21.022039639 });
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn test_malformed_rows_reported() {
        let text = "14.13\nabc\n-3.0\ninf\n21.02\n1 2 3\n0 25.0\n";
        let (ds, report) = parse(text, &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 2);
        let lines: Vec<usize> = report.malformed.iter().map(|m| m.line).collect();
        assert_eq!(lines, vec![2, 3, 4, 6, 7]);
        assert!(report.malformed[0].reason.contains("not a number"));
        assert_eq!(report.malformed[1].reason, "non-positive height");
        assert_eq!(report.malformed[2].reason, "non-finite height");
    }

    #[test]
    fn test_strict_mode_aborts() {
        let text = "14.13\nabc\n21.02\n";
        let opts = LoadOptions { strict: true, ..Default::default() };
        match parse(text, &opts) {
            Err(ZetaError::Malformed { line, text, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(text, "abc");
            }
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_dataset_is_error() {
        assert!(matches!(
            parse("# nothing\n\n", &LoadOptions::default()),
            Err(ZetaError::EmptyDataset(_))
        ));
        assert!(matches!(
            ZeroDataset::from_gammas(vec![]),
            Err(ZetaError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let (ds, report) = parse("25.0\n14.0\n21.0\n21.0\n", &LoadOptions::default()).unwrap();
        assert!(report.resorted);
        assert_eq!(report.duplicates, 1);
        assert_eq!(ds.gammas(), &[14.0, 21.0, 21.0, 25.0]);
        let indices: Vec<u64> = ds.records().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_limit() {
        let opts = LoadOptions { limit: Some(3), ..Default::default() };
        let (ds, report) = parse(FIRST_ZEROS, &opts).unwrap();
        assert_eq!(ds.len(), 3);
        assert!(report.truncated);
        assert_eq!(ds.last().gamma, 25.010857580);
    }

    #[test]
    fn test_limit_reached_at_end_is_not_truncated() {
        let text = "14.134725\n21.022040\n\n# trailing comment\n";
        let opts = LoadOptions { limit: Some(2), ..Default::default() };
        let (ds, report) = parse(text, &opts).unwrap();
        assert_eq!(ds.len(), 2);
        assert!(!report.truncated);
        assert_eq!(report.skipped, 2);

        let (_, report) = parse(&format!("{text}25.010858\n"), &opts).unwrap();
        assert!(report.truncated);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIRST_ZEROS.as_bytes()).unwrap();
        let (ds, _) = load(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 5);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load("/nonexistent/zeros.txt", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ZetaError::Io { .. }));
    }

    #[test]
    fn test_queries() {
        let (ds, _) = parse(FIRST_ZEROS, &LoadOptions::default()).unwrap();
        assert_eq!(ds.count_up_to(10.0), 0);
        assert_eq!(ds.count_up_to(25.010857580), 3);
        assert_eq!(ds.count_up_to(1e9), 5);
        assert_eq!(ds.tail(2).len(), 2);
        assert_eq!(ds.tail(2)[0].index, 4);
        assert_eq!(ds.tail(100).len(), 5);
        assert_eq!(ds.gammas_between(20.0, 30.5).len(), 3);
        assert!(ds.gammas_between(40.0, 50.0).is_empty());
        let gaps = ds.gaps();
        assert_eq!(gaps.len(), 4);
        assert!(gaps.iter().all(|&g| g > 0.0));
    }

    #[test]
    fn test_from_gammas_rejects_invalid() {
        assert!(matches!(
            ZeroDataset::from_gammas(vec![1.0, f64::NAN]),
            Err(ZetaError::Malformed { line: 2, .. })
        ));
        assert!(ZeroDataset::from_gammas(vec![0.0]).is_err());
    }
}
