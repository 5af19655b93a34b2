use serde::{Deserialize, Serialize};

use crate::{distance::Statistics, error::FilterError};

// rational approximation of the normal quantile, relative error below 1.15e-9
const A: [f64; 6] = [
    -3.969683028665376e+01,
    2.209460984245205e+02,
    -2.759285104469687e+02,
    1.383577518672690e+02,
    -3.066479806614716e+01,
    2.506628277459239e+00,
];
const B: [f64; 5] = [
    -5.447609879822406e+01,
    1.615858368580409e+02,
    -1.556989798598866e+02,
    6.680131188771972e+01,
    -1.328068155288572e+01,
];
const C: [f64; 6] = [
    -7.784894002430293e-03,
    -3.223964580411365e-01,
    -2.400758277161838e+00,
    -2.549732539343734e+00,
    4.374664141464968e+00,
    2.938163982698783e+00,
];
const D: [f64; 4] = [
    7.784695709041462e-03,
    3.224671290700398e-01,
    2.445134137142996e+00,
    3.754408661907416e+00,
];
const P_LOW: f64 = 0.02425;

fn tail_quantile(q: f64) -> f64 {
    (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
        / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
}

/// Quantile function (inverse CDF) of the standard normal distribution.
///
/// # Arguments
///
/// * `p` - A probability in the open interval (0, 1).
///
/// # Returns
///
/// The value `z` with `P(Z <= z) = p`; infinite at the bounds and NaN outside.
pub fn standard_normal_quantile(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        tail_quantile((-2.0 * p.ln()).sqrt())
    } else if p > 1.0 - P_LOW {
        -tail_quantile((-2.0 * (1.0 - p).ln()).sqrt())
    } else {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    }
}

/// Relative slack on the interval bounds, in machine epsilons.
const BOUND_ULPS: f64 = 4.0;

/// Two-sided acceptance interval of a normal distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound.
    pub lo: f64,
    /// Upper bound.
    pub hi: f64,
}

impl ConfidenceInterval {
    /// Derive the interval holding probability mass `softness` around the mean.
    ///
    /// The distribution is `N(stats.mean, stats.std^2)`. A zero deviation
    /// collapses the interval onto the mean.
    ///
    /// # Arguments
    ///
    /// * `stats` - Statistics of the representative neighbor distances.
    /// * `softness` - The confidence level, in the open interval (0, 1).
    ///
    /// Example:
    ///
    /// ```
    /// use camfilter_core::distance::Statistics;
    /// use camfilter_core::interval::ConfidenceInterval;
    ///
    /// let stats = Statistics { mean: 10.0, std: 2.0 };
    /// let interval = ConfidenceInterval::from_statistics(&stats, 0.95).unwrap();
    /// assert!((interval.hi - 13.919928).abs() < 1e-5);
    /// ```
    pub fn from_statistics(stats: &Statistics, softness: f64) -> Result<Self, FilterError> {
        if !(softness > 0.0 && softness < 1.0) {
            return Err(FilterError::InvalidSoftness(softness));
        }

        let z = standard_normal_quantile(0.5 + softness / 2.0);
        let half_width = z * stats.std;

        Ok(Self {
            lo: stats.mean - half_width,
            hi: stats.mean + half_width,
        })
    }

    /// Check whether the value lies within the closed interval.
    ///
    /// Values within a few ulps of a bound count as inside, so distances
    /// equal to the mean up to rounding are never rejected.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        let tolerance = BOUND_ULPS * f64::EPSILON * self.lo.abs().max(self.hi.abs());
        self.lo - tolerance <= value && value <= self.hi + tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standard_normal_quantile() {
        assert_relative_eq!(standard_normal_quantile(0.5), 0.0);
        assert_relative_eq!(standard_normal_quantile(0.975), 1.959964, epsilon = 1e-6);
        assert_relative_eq!(standard_normal_quantile(0.9), 1.281552, epsilon = 1e-6);
        assert_relative_eq!(standard_normal_quantile(0.995), 2.575829, epsilon = 1e-6);
        assert_relative_eq!(standard_normal_quantile(0.001), -3.090232, epsilon = 1e-6);
        assert!(standard_normal_quantile(1.5).is_nan());
        assert_eq!(standard_normal_quantile(1.0), f64::INFINITY);
    }

    #[test]
    fn test_quantile_symmetry() {
        for p in [0.01, 0.02, 0.1, 0.3, 0.45] {
            assert_relative_eq!(
                standard_normal_quantile(p),
                -standard_normal_quantile(1.0 - p),
                epsilon = 1e-8
            );
        }
    }

    #[test]
    fn test_interval_widens_with_softness() -> Result<(), FilterError> {
        let stats = Statistics {
            mean: 3.0,
            std: 0.5,
        };
        let mut previous = 0.0;
        for softness in [0.5, 0.8, 0.9, 0.95, 0.99, 0.999] {
            let interval = ConfidenceInterval::from_statistics(&stats, softness)?;
            assert_relative_eq!((interval.lo + interval.hi) / 2.0, 3.0, epsilon = 1e-12);
            let width = interval.hi - interval.lo;
            assert!(width > previous);
            previous = width;
        }
        Ok(())
    }

    #[test]
    fn test_degenerate_interval() -> Result<(), FilterError> {
        let stats = Statistics {
            mean: 1.5,
            std: 0.0,
        };
        let interval = ConfidenceInterval::from_statistics(&stats, 0.99)?;
        assert!(interval.contains(1.5));
        assert!(!interval.contains(1.5 + 1e-9));
        assert!(!interval.contains(1.5 - 1e-9));
        Ok(())
    }

    #[test]
    fn test_contains_tolerates_rounding() -> Result<(), FilterError> {
        // a mean off by one ulp from the samples it summarizes
        let mean = 0.1 + 0.1 + 0.1;
        let stats = Statistics {
            mean: mean / 3.0,
            std: 1.3877787807814457e-17,
        };
        for softness in [0.01, 0.3, 0.5] {
            let interval = ConfidenceInterval::from_statistics(&stats, softness)?;
            assert!(interval.contains(0.1));
        }
        Ok(())
    }

    #[test]
    fn test_invalid_softness() {
        let stats = Statistics {
            mean: 0.0,
            std: 1.0,
        };
        for softness in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            assert!(matches!(
                ConfidenceInterval::from_statistics(&stats, softness),
                Err(FilterError::InvalidSoftness(_))
            ));
        }
    }
}
