//! Physical constants tested for modular resonance with the zeros.
//!
//! Each constant carries a category and the exponent of its coarsest
//! resonance tolerance; [`PhysicalConstant::tolerances`] expands that into
//! six decades. The coarsest tolerance is chosen per constant so that a
//! scan starts near the constant's own magnitude.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generic tolerance ladder for constants without a tuned one.
pub const GENERIC_TOLERANCES: [f64; 6] = [1e-4, 1e-5, 1e-6, 1e-7, 1e-8, 1e-9];

/// Tolerance used when comparing controls at a single level.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// Decades in a tolerance ladder.
pub const TOLERANCE_DECADES: i32 = 6;

/// Physical grouping used by the hierarchy check of the perturbation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Cosmology,
    Electroweak,
    Forces,
    Masses,
    Magnetic,
    Mathematical,
    /// Arbitrary values with no physical meaning.
    Control,
}

impl Category {
    /// The categories of [`physical_constants`].
    pub const PHYSICAL: [Category; 6] = [
        Category::Cosmology,
        Category::Electroweak,
        Category::Forces,
        Category::Masses,
        Category::Magnetic,
        Category::Mathematical,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Cosmology => "Cosmology",
            Category::Electroweak => "Electroweak",
            Category::Forces => "Forces",
            Category::Masses => "Masses",
            Category::Magnetic => "Magnetic",
            Category::Mathematical => "Mathematical",
            Category::Control => "Control",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named constant `c` whose multiples are compared with the zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConstant {
    pub name: String,
    pub value: f64,
    pub category: Category,
    /// `log10` of the coarsest scan tolerance.
    pub tolerance_exponent: i32,
}

impl PhysicalConstant {
    pub fn new(name: &str, value: f64, category: Category, tolerance_exponent: i32) -> Self {
        Self {
            name: name.to_string(),
            value,
            category,
            tolerance_exponent,
        }
    }

    /// Six tolerances, coarsest first, one decade apart.
    pub fn tolerances(&self) -> Vec<f64> {
        decades(self.tolerance_exponent)
    }
}

fn decades(top_exponent: i32) -> Vec<f64> {
    (0..TOLERANCE_DECADES)
        .map(|k| 10f64.powi(top_exponent - k))
        .collect()
}

/// Tolerance ladder for an arbitrary constant: starts one decade below
/// the leading digit of `c`.
///
/// Returns [`GENERIC_TOLERANCES`] for non-positive or non-finite `c`.
///
/// # Examples
/// ```
/// use zeta_stats::constants::default_tolerances;
/// let t = default_tolerances(0.0338);
/// assert_eq!(t.len(), 6);
/// assert!((t[0] - 1e-3).abs() < 1e-18);
/// ```
pub fn default_tolerances(c: f64) -> Vec<f64> {
    if !c.is_finite() || c <= 0.0 {
        return GENERIC_TOLERANCES.to_vec();
    }
    decades(c.log10().floor() as i32 - 1)
}

/// The nineteen dimensionless constants of the study.
pub fn physical_constants() -> Vec<PhysicalConstant> {
    use Category::*;
    vec![
        PhysicalConstant::new("electromagnetic", 1.0 / 137.035999084, Forces, -4),
        PhysicalConstant::new("strong", 0.1185, Forces, -2),
        PhysicalConstant::new("weak", 0.0338, Forces, -3),
        PhysicalConstant::new("gravitational", 5.906e-39, Forces, -38),
        PhysicalConstant::new("weinberg_angle", 0.2312, Electroweak, -3),
        PhysicalConstant::new("proton_electron", 1836.15267343, Masses, -1),
        PhysicalConstant::new("euler_mascheroni", 0.5772156649, Mathematical, -3),
        PhysicalConstant::new("fermi_coupling", 1.1663787e-5, Electroweak, -6),
        PhysicalConstant::new("muon_electron", 206.7682826, Masses, -2),
        PhysicalConstant::new("tau_electron", 3477.15, Masses, -1),
        PhysicalConstant::new("neutron_proton", 1.00137841931, Masses, -4),
        PhysicalConstant::new("dark_energy", 0.6847, Cosmology, -3),
        PhysicalConstant::new("dark_matter", 0.2589, Cosmology, -3),
        PhysicalConstant::new("baryon_density", 0.0486, Cosmology, -4),
        PhysicalConstant::new("hubble_reduced", 0.6736, Cosmology, -3),
        PhysicalConstant::new("sigma8", 0.8111, Cosmology, -3),
        PhysicalConstant::new("gyromagnetic_proton", 2.7928473508, Magnetic, -2),
        PhysicalConstant::new("gyromagnetic_neutron", 1.9130427, Magnetic, -2),
        PhysicalConstant::new("magnetic_moment_ratio", 3.1524512605, Magnetic, -2),
    ]
}

/// Controls: six real constants next to five values of similar magnitude
/// with no physical meaning, all on the generic tolerance ladder.
pub fn control_constants() -> Vec<PhysicalConstant> {
    const REAL: [&str; 6] = [
        "electromagnetic",
        "strong",
        "weak",
        "weinberg_angle",
        "euler_mascheroni",
        "dark_energy",
    ];
    let mut controls: Vec<PhysicalConstant> = physical_constants()
        .into_iter()
        .filter(|c| REAL.contains(&c.name.as_str()))
        .map(|mut c| {
            c.tolerance_exponent = -4;
            c
        })
        .collect();
    controls.extend([
        PhysicalConstant::new("random_1", 1.0 / 142.7, Category::Control, -4),
        PhysicalConstant::new("random_2", 1.0 / 129.3, Category::Control, -4),
        PhysicalConstant::new("golden_ratio", (5f64.sqrt() - 1.0) / 2.0, Category::Control, -4),
        PhysicalConstant::new("pi_scale", std::f64::consts::PI / 100.0, Category::Control, -4),
        PhysicalConstant::new("e_scale", std::f64::consts::E / 100.0, Category::Control, -4),
    ]);
    controls
}

/// Best resonance observed for a constant over the full two-million-zero
/// dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceResult {
    pub name: String,
    pub quality: f64,
    pub error_percent: f64,
    pub zero_index: u64,
}

/// Observed results the Monte Carlo experiments are calibrated against,
/// best quality first.
pub fn reference_results() -> Vec<ReferenceResult> {
    [
        ("gravitational", 1.691571e-45, 0.000028641562, 1_593_106),
        ("fermi_coupling", 8.288891e-13, 0.000007106518, 1_470_480),
        ("electromagnetic", 9.091261e-10, 0.000012458301, 118_412),
        ("dark_energy", 4.012673e-09, 0.000000586048, 735_953),
        ("strong", 4.980134e-09, 0.000004202645, 1_978_224),
        ("weinberg_angle", 8.924658e-09, 0.000003860146, 1_948_828),
        ("hubble_reduced", 1.102047e-08, 0.000001636055, 1_680_335),
        ("weak", 2.394045e-08, 0.000070829742, 539_638),
        ("baryon_density", 3.206900e-08, 0.000065985593, 1_782_980),
        ("euler_mascheroni", 5.600674e-08, 0.000009702914, 733_625),
    ]
    .into_iter()
    .map(|(name, quality, error_percent, zero_index)| ReferenceResult {
        name: name.to_string(),
        quality,
        error_percent,
        zero_index,
    })
    .collect()
}

pub fn find_reference<'a>(results: &'a [ReferenceResult], name: &str) -> Option<&'a ReferenceResult> {
    results.iter().find(|r| r.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_physical_constants_catalogue() {
        let constants = physical_constants();
        assert_eq!(constants.len(), 19);
        let names: HashSet<&str> = constants.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names.len(), 19);
        assert!(constants.iter().all(|c| c.value > 0.0 && c.value.is_finite()));
        let cosmology = constants
            .iter()
            .filter(|c| c.category == Category::Cosmology)
            .count();
        assert_eq!(cosmology, 5);
        assert!(constants.iter().all(|c| c.category != Category::Control));
    }

    #[test]
    fn test_every_physical_category_populated() {
        let constants = physical_constants();
        for cat in Category::PHYSICAL {
            assert!(constants.iter().any(|c| c.category == cat), "{cat} empty");
        }
    }

    #[test]
    fn test_reference_results_refer_to_catalogue() {
        let constants = physical_constants();
        let refs = reference_results();
        assert_eq!(refs.len(), 10);
        for r in &refs {
            let c = constants.iter().find(|c| c.name == r.name).unwrap();
            // error % is quality relative to the constant
            let implied = r.quality / c.value * 100.0;
            assert!((implied - r.error_percent).abs() / r.error_percent < 1e-3, "{}", r.name);
        }
        assert!(refs.windows(2).all(|w| w[0].quality <= w[1].quality));
        assert!(find_reference(&refs, "dark_energy").is_some());
        assert!(find_reference(&refs, "sigma8").is_none());
    }

    #[test]
    fn test_tolerance_ladders() {
        let constants = physical_constants();
        let gravity = constants.iter().find(|c| c.name == "gravitational").unwrap();
        let t = gravity.tolerances();
        assert_eq!(t.len(), 6);
        assert!((t[0] / 1e-38 - 1.0).abs() < 1e-12);
        assert!((t[5] / 1e-43 - 1.0).abs() < 1e-12);

        let strong = constants.iter().find(|c| c.name == "strong").unwrap();
        assert!((strong.tolerances()[0] - 1e-2).abs() < 1e-15);
    }

    #[test]
    fn test_default_tolerances() {
        assert!((default_tolerances(1836.15)[0] - 1e2).abs() < 1e-9);
        assert!((default_tolerances(0.0073)[0] - 1e-4).abs() < 1e-18);
        assert_eq!(default_tolerances(-1.0), GENERIC_TOLERANCES.to_vec());
        assert_eq!(default_tolerances(f64::NAN), GENERIC_TOLERANCES.to_vec());
    }

    #[test]
    fn test_control_constants() {
        let controls = control_constants();
        assert_eq!(controls.len(), 11);
        assert!(controls.iter().all(|c| c.tolerance_exponent == -4));
        let golden = controls.iter().find(|c| c.name == "golden_ratio").unwrap();
        assert!((golden.value - 0.6180339887).abs() < 1e-9);
        assert_eq!(golden.category, Category::Control);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn default_tolerances_below_constant(exp in -45.0_f64..4.0) {
            let c = 10f64.powf(exp);
            let t = default_tolerances(c);
            prop_assert_eq!(t.len(), 6);
            prop_assert!(t[0] < c);
            prop_assert!(t.windows(2).all(|w| w[1] < w[0]));
        }
    }
}
