//! # zeta-stats
//!
//! Statistical analysis of the non-trivial zeros of the Riemann zeta
//! function.
//!
//! The crate loads a precomputed table of zero heights `γ`, describes it,
//! compares it with the analytic counting and spacing laws, and tests the
//! claim that some zeros lie unusually close to integer multiples of
//! physical constants. The last part is the statistical core: resonance
//! counts against a uniform-residual baseline, and Monte Carlo experiments
//! with random and perturbed constants.
//!
//! ## Modules
//!
//! - [`stats`]: descriptive statistics with numerical stability guarantees
//! - [`special`]: special functions behind the p-values
//! - [`distributions`]: reference distributions for the tests
//! - [`random`]: seeded, per-trial random number generation
//! - [`hypothesis`]: count tests, Kolmogorov–Smirnov, empirical p-values
//! - [`dataset`]: zero loading and the immutable sorted dataset
//! - [`weyl`]: counting function, region spacing and density comparisons
//! - [`spacing`]: unfolded spacings and pair correlation
//! - [`constants`]: catalogue of physical constants and observed results
//! - [`resonance`]: modular residuals and resonance statistics
//! - [`montecarlo`]: negative-control and perturbation experiments
//! - [`report`]: report assembly, text rendering and export
//! - [`pipeline`]: stage orchestration
//! - [`config`]: TOML configuration
//!
//! ## Design Philosophy
//!
//! - **Numerical stability first**: Welford's algorithm for variance,
//!   Kahan summation for accumulation
//! - **Reproducible simulation**: one seeded RNG per trial
//! - **Property-based testing**: Mathematical invariants verified via proptest

pub mod config;
pub mod constants;
pub mod dataset;
pub mod distributions;
pub mod error;
pub mod hypothesis;
pub mod montecarlo;
pub mod pipeline;
pub mod random;
pub mod report;
pub mod resonance;
pub mod spacing;
pub mod special;
pub mod stats;
pub mod weyl;

pub use error::{Result, ZetaError};
