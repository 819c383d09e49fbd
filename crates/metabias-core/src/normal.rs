//! Standard normal helpers and significance tests
//!
//! Thin wrappers over the error functions in `statrs` so that the hot loops in
//! the p-curve and selection-model likelihoods stay infallible.

use serde::{Deserialize, Serialize};
use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::{PI, SQRT_2};

/// Conventional two-sided significance threshold, `z_{0.975}`
pub const Z_975: f64 = 1.959_963_984_540_054;

/// Standard normal cumulative distribution function
pub fn cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal survival function, `1 - Φ(x)` without cancellation
pub fn sf(x: f64) -> f64 {
    0.5 * erfc(x / SQRT_2)
}

/// Standard normal density
pub fn pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Standard normal quantile function
///
/// Returns ±∞ at 0 and 1, NaN outside `[0, 1]`.
pub fn quantile(p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// Critical value `z_{1-α/2}` of a two-sided test
pub fn two_sided_critical(alpha: f64) -> f64 {
    quantile(1.0 - alpha / 2.0)
}

/// Critical value `z_{1-α}` of an upper one-sided test
pub fn one_sided_critical(alpha: f64) -> f64 {
    quantile(1.0 - alpha)
}

/// Sidedness of a z-test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sidedness {
    /// Reject when `z > z_{1-α}`
    OneSided,
    /// Reject when `|z| > z_{1-α/2}`
    TwoSided,
}

impl Sidedness {
    pub fn from_one_sided(one_sided: bool) -> Self {
        if one_sided {
            Self::OneSided
        } else {
            Self::TwoSided
        }
    }
}

/// A z-test at a fixed significance level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZTest {
    pub alpha: f64,
    pub sidedness: Sidedness,
}

impl ZTest {
    pub fn new(alpha: f64, sidedness: Sidedness) -> Self {
        Self { alpha, sidedness }
    }

    pub fn critical_value(&self) -> f64 {
        match self.sidedness {
            Sidedness::OneSided => one_sided_critical(self.alpha),
            Sidedness::TwoSided => two_sided_critical(self.alpha),
        }
    }

    /// Whether `estimate / std_error` rejects the null of a zero coefficient
    pub fn rejects(&self, estimate: f64, std_error: f64) -> bool {
        let z = estimate / std_error;
        match self.sidedness {
            Sidedness::OneSided => z > self.critical_value(),
            Sidedness::TwoSided => z.abs() > self.critical_value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cdf_and_quantile() {
        assert_relative_eq!(cdf(0.0), 0.5, epsilon = 1e-15);
        assert_relative_eq!(cdf(Z_975), 0.975, epsilon = 1e-12);
        assert_relative_eq!(quantile(0.975), Z_975, epsilon = 1e-9);
        assert_relative_eq!(quantile(0.5), 0.0, epsilon = 1e-12);
        assert_relative_eq!(sf(1.0) + cdf(1.0), 1.0, epsilon = 1e-15);
        assert!(quantile(1.5).is_nan());
    }

    #[test]
    fn test_pdf() {
        assert_relative_eq!(pdf(0.0), 0.398_942_280_401_432_7, epsilon = 1e-15);
        assert_relative_eq!(pdf(1.0), pdf(-1.0));
    }

    #[test]
    fn test_critical_values() {
        assert_relative_eq!(two_sided_critical(0.05), Z_975, epsilon = 1e-9);
        assert_relative_eq!(one_sided_critical(0.05), 1.644_853_626_951_472_2, epsilon = 1e-9);
        assert_relative_eq!(one_sided_critical(0.10), 1.281_551_565_544_600_5, epsilon = 1e-9);
    }

    #[test]
    fn test_ztest_sidedness() {
        let one = ZTest::new(0.05, Sidedness::OneSided);
        let two = ZTest::new(0.05, Sidedness::TwoSided);

        // z = 1.8 clears 1.645 but not 1.96
        assert!(one.rejects(1.8, 1.0));
        assert!(!two.rejects(1.8, 1.0));

        // Large negative z only rejects two-sided
        assert!(!one.rejects(-3.0, 1.0));
        assert!(two.rejects(-3.0, 1.0));
    }
}
