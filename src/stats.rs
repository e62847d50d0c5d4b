//! Descriptive statistics over zero heights, gaps and simulation outputs.
//!
//! Every function rejects empty input and non-finite values by returning
//! `None`; none of them panic. With ~2·10⁶ heights near 10⁶ the naive
//! `E[X²] − E[X]²` formula loses most of its significant digits, so the
//! moments here are accumulated with compensated or online schemes.
//!
//! # Algorithms
//!
//! - **Sums**: Neumaier's variant of Kahan summation.
//!   Reference: Neumaier (1974), *ZAMM* 54(1), pp. 39–51.
//! - **Moments**: Welford's online update, extended to M₃/M₄ after
//!   Pébay (2008), SAND2008-6212.
//! - **Quantiles**: R-7 linear interpolation (NumPy `percentile` default).
//!   Reference: Hyndman & Fan (1996), *The American Statistician* 50(4).

use serde::Serialize;

fn all_finite(data: &[f64]) -> bool {
    data.iter().all(|x| x.is_finite())
}

fn sorted_copy(data: &[f64]) -> Option<Vec<f64>> {
    if data.iter().any(|x| x.is_nan()) {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    Some(sorted)
}

/// Arithmetic mean computed from a compensated sum.
///
/// # Returns
/// - `None` if `data` is empty or contains NaN/Inf.
///
/// # Examples
/// ```
/// use zeta_stats::stats::mean;
/// assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
/// ```
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() || !all_finite(data) {
        return None;
    }
    Some(kahan_sum(data) / data.len() as f64)
}

/// Sample variance (Bessel-corrected, denominator `n − 1`).
///
/// # Returns
/// - `None` if fewer than two values or any value is NaN/Inf.
///
/// # Examples
/// ```
/// use zeta_stats::stats::variance;
/// let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
/// assert!((variance(&v).unwrap() - 32.0 / 7.0).abs() < 1e-12);
/// ```
pub fn variance(data: &[f64]) -> Option<f64> {
    if data.len() < 2 || !all_finite(data) {
        return None;
    }
    WelfordAccumulator::from_slice(data).sample_variance()
}

/// Population variance (denominator `n`), as NumPy's `np.std` squares to.
pub fn population_variance(data: &[f64]) -> Option<f64> {
    if data.is_empty() || !all_finite(data) {
        return None;
    }
    WelfordAccumulator::from_slice(data).population_variance()
}

/// Sample standard deviation, `sqrt(variance(data))`.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    variance(data).map(f64::sqrt)
}

/// Population standard deviation, `sqrt(population_variance(data))`.
pub fn population_std_dev(data: &[f64]) -> Option<f64> {
    population_variance(data).map(f64::sqrt)
}

/// Smallest value, or `None` if `data` is empty or contains NaN.
pub fn min(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    data.iter().try_fold(f64::INFINITY, |acc, &x| {
        (!x.is_nan()).then(|| acc.min(x))
    })
}

/// Largest value, or `None` if `data` is empty or contains NaN.
pub fn max(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    data.iter().try_fold(f64::NEG_INFINITY, |acc, &x| {
        (!x.is_nan()).then(|| acc.max(x))
    })
}

/// Median of `data`; the input is not modified.
///
/// # Complexity
/// Time: O(n log n), Space: O(n)
///
/// # Examples
/// ```
/// use zeta_stats::stats::median;
/// assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
/// assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
/// ```
pub fn median(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let sorted = sorted_copy(data)?;
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}

/// `p`-th quantile (`p ∈ [0, 1]`) using R-7 linear interpolation.
///
/// # Returns
/// - `None` if `data` is empty, `p` is outside `[0, 1]`, or data contains NaN.
///
/// # Examples
/// ```
/// use zeta_stats::stats::quantile;
/// let data = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(quantile(&data, 0.25), Some(2.0));
/// assert_eq!(quantile(&data, 1.0), Some(5.0));
/// ```
pub fn quantile(data: &[f64], p: f64) -> Option<f64> {
    if data.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }
    quantile_sorted(&sorted_copy(data)?, p)
}

/// R-7 quantile on data the caller has already sorted ascending.
///
/// With `h = (n − 1)·p`, `j = ⌊h⌋`, `g = h − j` the result is
/// `(1 − g)·x[j] + g·x[j+1]`.
pub fn quantile_sorted(sorted_data: &[f64], p: f64) -> Option<f64> {
    let n = sorted_data.len();
    if n == 0 || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let h = (n - 1) as f64 * p;
    let j = h.floor() as usize;
    if j + 1 >= n {
        return Some(sorted_data[n - 1]);
    }
    let g = h - j as f64;
    Some((1.0 - g) * sorted_data[j] + g * sorted_data[j + 1])
}

/// Percentiles on the 0–100 scale, computed with a single sort.
///
/// Returns `(percentile, value)` pairs in the order requested.
///
/// # Returns
/// - `None` if `data` is empty, contains NaN, or any percentile lies
///   outside `[0, 100]`.
///
/// # Examples
/// ```
/// use zeta_stats::stats::percentiles;
/// let data: Vec<f64> = (1..=101).map(f64::from).collect();
/// let p = percentiles(&data, &[1.0, 50.0, 99.0]).unwrap();
/// assert_eq!(p, vec![(1.0, 2.0), (50.0, 51.0), (99.0, 100.0)]);
/// ```
pub fn percentiles(data: &[f64], levels: &[f64]) -> Option<Vec<(f64, f64)>> {
    if data.is_empty() {
        return None;
    }
    let sorted = sorted_copy(data)?;
    levels
        .iter()
        .map(|&level| quantile_sorted(&sorted, level / 100.0).map(|v| (level, v)))
        .collect()
}

/// Bias-corrected sample skewness G₁ (matches `scipy.stats.skew(bias=False)`).
///
/// Two-pass: the mean comes from a compensated sum, then the central
/// moments are accumulated in one sweep.
///
/// Reference: Joanes & Gill (1998), *The Statistician* 47(1).
///
/// # Returns
/// - `None` if `data.len() < 3`, data contains NaN/Inf, or the variance is zero.
pub fn skewness(data: &[f64]) -> Option<f64> {
    let n = data.len();
    if n < 3 || !all_finite(data) {
        return None;
    }
    let nf = n as f64;
    let m = kahan_sum(data) / nf;
    let (sum2, sum3) = data.iter().fold((0.0, 0.0), |(s2, s3), &x| {
        let d = x - m;
        (s2 + d * d, s3 + d * d * d)
    });
    let m2 = sum2 / nf;
    if m2 == 0.0 {
        return None;
    }
    let g1 = (sum3 / nf) / m2.powf(1.5);
    Some(g1 * (nf * (nf - 1.0)).sqrt() / (nf - 2.0))
}

/// Bias-corrected excess kurtosis G₂ (0 for a normal distribution).
///
/// # Returns
/// - `None` if `data.len() < 4`, data contains NaN/Inf, or the variance is zero.
pub fn kurtosis(data: &[f64]) -> Option<f64> {
    let n = data.len();
    if n < 4 || !all_finite(data) {
        return None;
    }
    let nf = n as f64;
    let m = kahan_sum(data) / nf;
    let (sum2, sum4) = data.iter().fold((0.0, 0.0), |(s2, s4), &x| {
        let d2 = (x - m) * (x - m);
        (s2 + d2, s4 + d2 * d2)
    });
    let s2 = sum2 / (nf - 1.0);
    if s2 == 0.0 {
        return None;
    }
    let a = nf * (nf + 1.0) / ((nf - 1.0) * (nf - 2.0) * (nf - 3.0));
    let b = 3.0 * (nf - 1.0) * (nf - 1.0) / ((nf - 2.0) * (nf - 3.0));
    Some(a * (sum4 / (s2 * s2)) - b)
}

/// Sample autocorrelation at `lag`, `Σ (x_i − x̄)(x_{i+lag} − x̄) / Σ (x_i − x̄)²`.
///
/// # Returns
/// - `None` if `data.len() <= lag`, data contains NaN/Inf, or the variance is zero.
///
/// # Examples
/// ```
/// use zeta_stats::stats::autocorrelation;
/// let alternating = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
/// assert!((autocorrelation(&alternating, 1).unwrap() + 5.0 / 6.0).abs() < 1e-12);
/// ```
pub fn autocorrelation(data: &[f64], lag: usize) -> Option<f64> {
    if data.len() <= lag || !all_finite(data) {
        return None;
    }
    let m = kahan_sum(data) / data.len() as f64;
    let denom: f64 = data.iter().map(|&x| (x - m) * (x - m)).sum();
    if denom == 0.0 {
        return None;
    }
    let num: f64 = data
        .iter()
        .zip(&data[lag..])
        .map(|(&a, &b)| (a - m) * (b - m))
        .sum();
    Some(num / denom)
}

/// Consecutive differences `data[i + 1] − data[i]` (NumPy `np.diff`).
///
/// Returns an empty vector for fewer than two values.
///
/// # Examples
/// ```
/// use zeta_stats::stats::diff;
/// assert_eq!(diff(&[1.0, 4.0, 9.0]), vec![3.0, 5.0]);
/// ```
pub fn diff(data: &[f64]) -> Vec<f64> {
    data.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Neumaier compensated summation.
///
/// The compensation term captures the low-order bits lost in each
/// addition, whichever operand is larger, so the error stays O(ε)
/// independent of `n`.
pub fn kahan_sum(data: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    for &x in data {
        let t = sum + x;
        compensation += if sum.abs() >= x.abs() {
            (sum - t) + x
        } else {
            (x - t) + sum
        };
        sum = t;
    }
    sum + compensation
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// One-call descriptive summary of a sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation; `0.0` for a single value.
    pub std_dev: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// `None` when undefined (fewer than 3 values or zero variance).
    pub skewness: Option<f64>,
    /// Excess kurtosis; `None` when undefined.
    pub kurtosis: Option<f64>,
}

impl Summary {
    /// Summarises `data`, or `None` if it is empty or contains NaN/Inf.
    ///
    /// # Examples
    /// ```
    /// use zeta_stats::stats::Summary;
    /// let s = Summary::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
    /// assert_eq!(s.count, 5);
    /// assert_eq!(s.median, 3.0);
    /// assert_eq!(s.q1, 2.0);
    /// ```
    pub fn from_slice(data: &[f64]) -> Option<Self> {
        if data.is_empty() || !all_finite(data) {
            return None;
        }
        let sorted = sorted_copy(data)?;
        let acc = WelfordAccumulator::from_slice(data);
        Some(Self {
            count: data.len(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: kahan_sum(data) / data.len() as f64,
            std_dev: acc.sample_std_dev().unwrap_or(0.0),
            q1: quantile_sorted(&sorted, 0.25)?,
            median: quantile_sorted(&sorted, 0.5)?,
            q3: quantile_sorted(&sorted, 0.75)?,
            skewness: skewness(data),
            kurtosis: kurtosis(data),
        })
    }

    /// Coefficient of variation `std_dev / mean`, `None` for a zero mean.
    pub fn coefficient_of_variation(&self) -> Option<f64> {
        (self.mean != 0.0).then(|| self.std_dev / self.mean)
    }
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// Equal-width histogram over a closed range.
///
/// Bins are half-open `[lo, hi)` except the last, which also includes the
/// upper edge (the NumPy convention). Values outside the range are tallied
/// in `underflow` / `overflow` instead of being dropped silently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    lo: f64,
    hi: f64,
    counts: Vec<u64>,
    underflow: u64,
    overflow: u64,
}

impl Histogram {
    /// Bins `data` into `bins` equal-width bins over `range`.
    ///
    /// When `range` is `None` the data's own min/max are used.
    /// NaN values are ignored.
    ///
    /// # Returns
    /// - `None` if `bins == 0`, the range is empty or non-finite, or no
    ///   range can be derived from the data.
    ///
    /// # Examples
    /// ```
    /// use zeta_stats::stats::Histogram;
    /// let h = Histogram::new(&[0.1, 0.2, 0.6, 1.0], 2, Some((0.0, 1.0))).unwrap();
    /// assert_eq!(h.counts(), &[2, 2]);
    /// ```
    pub fn new(data: &[f64], bins: usize, range: Option<(f64, f64)>) -> Option<Self> {
        if bins == 0 {
            return None;
        }
        let (lo, hi) = match range {
            Some(r) => r,
            None => {
                let finite: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();
                (min(&finite)?, max(&finite)?)
            }
        };
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return None;
        }

        let mut hist = Self {
            lo,
            hi,
            counts: vec![0; bins],
            underflow: 0,
            overflow: 0,
        };
        let width = (hi - lo) / bins as f64;
        for &x in data {
            if x.is_nan() {
                continue;
            }
            if x < lo {
                hist.underflow += 1;
            } else if x > hi {
                hist.overflow += 1;
            } else {
                let idx = (((x - lo) / width) as usize).min(bins - 1);
                hist.counts[idx] += 1;
            }
        }
        Some(hist)
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn underflow(&self) -> u64 {
        self.underflow
    }

    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    pub fn bin_width(&self) -> f64 {
        (self.hi - self.lo) / self.counts.len() as f64
    }

    /// `bins + 1` edges from `lo` to `hi`.
    pub fn edges(&self) -> Vec<f64> {
        let w = self.bin_width();
        (0..=self.counts.len())
            .map(|i| self.lo + i as f64 * w)
            .collect()
    }

    pub fn centers(&self) -> Vec<f64> {
        let w = self.bin_width();
        (0..self.counts.len())
            .map(|i| self.lo + (i as f64 + 0.5) * w)
            .collect()
    }

    /// Number of values that landed inside the range.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Counts normalised so the in-range histogram integrates to 1.
    ///
    /// All zeros when no value landed in range.
    pub fn density(&self) -> Vec<f64> {
        let total = self.total();
        if total == 0 {
            return vec![0.0; self.counts.len()];
        }
        let norm = total as f64 * self.bin_width();
        self.counts.iter().map(|&c| c as f64 / norm).collect()
    }
}

// ---------------------------------------------------------------------------
// Welford online accumulator
// ---------------------------------------------------------------------------

/// Streaming mean/variance/skewness/kurtosis in O(1) memory.
///
/// The central moment sums are updated M₄ → M₃ → M₂ so each update reads
/// the previous values of the lower moments. Two accumulators can be
/// merged with Chan's pairwise formulas, which lets per-region statistics
/// be combined without a second pass.
///
/// # Examples
/// ```
/// use zeta_stats::stats::WelfordAccumulator;
/// let mut acc = WelfordAccumulator::new();
/// for &x in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     acc.update(x);
/// }
/// assert!((acc.mean().unwrap() - 5.0).abs() < 1e-15);
/// assert!((acc.population_variance().unwrap() - 4.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WelfordAccumulator {
    count: u64,
    mean: f64,
    m2: f64,
    m3: f64,
    m4: f64,
}

impl WelfordAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator pre-fed with every value of `data`.
    pub fn from_slice(data: &[f64]) -> Self {
        let mut acc = Self::new();
        for &x in data {
            acc.update(x);
        }
        acc
    }

    /// Feeds one sample.
    pub fn update(&mut self, value: f64) {
        let n1 = self.count;
        self.count += 1;
        if n1 == 0 {
            // Moments stay zero; avoids squaring a huge first delta.
            self.mean = value;
            return;
        }

        let n = self.count as f64;
        let delta = value - self.mean;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n1 as f64;

        self.m4 += term1 * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;
        self.mean += delta_n;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    pub fn sample_variance(&self) -> Option<f64> {
        (self.count >= 2).then(|| self.m2 / (self.count - 1) as f64)
    }

    pub fn population_variance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.m2 / self.count as f64)
    }

    pub fn sample_std_dev(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }

    pub fn population_std_dev(&self) -> Option<f64> {
        self.population_variance().map(f64::sqrt)
    }

    /// Bias-corrected skewness G₁; `None` below 3 samples or at zero variance.
    pub fn skewness(&self) -> Option<f64> {
        if self.count < 3 || self.m2 == 0.0 {
            return None;
        }
        let n = self.count as f64;
        let g1 = n.sqrt() * self.m3 / self.m2.powf(1.5);
        Some(g1 * (n * (n - 1.0)).sqrt() / (n - 2.0))
    }

    /// Bias-corrected excess kurtosis G₂; `None` below 4 samples or at zero variance.
    pub fn kurtosis(&self) -> Option<f64> {
        if self.count < 4 || self.m2 == 0.0 {
            return None;
        }
        let n = self.count as f64;
        let g2 = n * self.m4 / (self.m2 * self.m2) - 3.0;
        Some((n - 1.0) / ((n - 2.0) * (n - 3.0)) * ((n + 1.0) * g2 + 6.0))
    }

    /// Merges `other` into `self` (Chan, Golub & LeVeque 1979; Pébay 2008).
    pub fn merge(&mut self, other: &WelfordAccumulator) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;
        let delta2 = delta * delta;

        let m2 = self.m2 + other.m2 + delta2 * na * nb / n;
        let m3 = self.m3
            + other.m3
            + delta2 * delta * na * nb * (na - nb) / (n * n)
            + 3.0 * delta * (na * other.m2 - nb * self.m2) / n;
        let m4 = self.m4
            + other.m4
            + delta2 * delta2 * na * nb * (na * na - na * nb + nb * nb) / (n * n * n)
            + 6.0 * delta2 * (na * na * other.m2 + nb * nb * self.m2) / (n * n)
            + 4.0 * delta * (na * other.m3 - nb * self.m3) / n;

        self.count += other.count;
        self.mean += delta * nb / n;
        self.m2 = m2;
        self.m3 = m3;
        self.m4 = m4;
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn finite_vec(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
        proptest::collection::vec(-1.0e6_f64..1.0e6, min_len..=max_len)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn variance_non_negative(data in finite_vec(2, 100)) {
            prop_assert!(variance(&data).unwrap() >= 0.0);
        }

        #[test]
        fn quantile_extremes_are_min_max(data in finite_vec(1, 100)) {
            prop_assert_eq!(quantile(&data, 0.0), min(&data));
            prop_assert_eq!(quantile(&data, 1.0), max(&data));
        }

        #[test]
        fn quantiles_monotonic(data in finite_vec(2, 60), p1 in 0.0_f64..=1.0, p2 in 0.0_f64..=1.0) {
            let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
            prop_assert!(quantile(&data, lo).unwrap() <= quantile(&data, hi).unwrap() + 1e-6);
        }

        #[test]
        fn histogram_conserves_count(data in finite_vec(1, 200), bins in 1_usize..50) {
            let h = Histogram::new(&data, bins, Some((-5.0e5, 5.0e5))).unwrap();
            prop_assert_eq!(h.total() + h.underflow() + h.overflow(), data.len() as u64);
        }

        #[test]
        fn diff_reconstructs_last(data in finite_vec(2, 50)) {
            let d = diff(&data);
            let rebuilt = data[0] + kahan_sum(&d);
            let last = data[data.len() - 1];
            prop_assert!((rebuilt - last).abs() < 1e-6 * last.abs().max(1.0));
        }
    }
}
