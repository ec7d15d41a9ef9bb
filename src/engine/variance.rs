use serde::Deserialize;

use crate::error::AppError;

/// E|z| for a standard normal, the centring term of the EGARCH shock.
const EXPECTED_ABS_Z: f64 = 0.797_884_560_802_865_4;

/// Log-variance is held inside `[-LOG_VARIANCE_BOUND, LOG_VARIANCE_BOUND]` so a
/// single extreme return cannot push the estimate to zero or infinity.
const LOG_VARIANCE_BOUND: f64 = 30.0;

/// Variance recurrence driven by each price delta.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VarianceModel {
    /// `v' = omega + alpha * diff^2 + beta * v`, on absolute price deltas.
    Garch { omega: f64, alpha: f64, beta: f64 },
    /// `ln v' = omega + beta * ln v + alpha * (|z| - E|z|) + gamma * z`,
    /// with `z = return / sqrt(v)`.
    Egarch {
        omega: f64,
        beta: f64,
        alpha: f64,
        gamma: f64,
    },
}

impl Default for VarianceModel {
    fn default() -> Self {
        Self::Garch {
            omega: 0.03,
            alpha: 0.12,
            beta: 0.85,
        }
    }
}

impl VarianceModel {
    pub fn egarch_default() -> Self {
        Self::Egarch {
            omega: -0.45,
            beta: 0.92,
            alpha: 0.12,
            gamma: -0.15,
        }
    }

    /// Next variance estimate. `variance` must be positive.
    pub fn next(&self, variance: f64, diff: f64, return_ratio: f64, eps: f64) -> f64 {
        match *self {
            Self::Garch { omega, alpha, beta } => omega + alpha * diff * diff + beta * variance,
            Self::Egarch {
                omega,
                beta,
                alpha,
                gamma,
            } => {
                let z = return_ratio / variance.sqrt().max(eps);
                let log_v =
                    omega + beta * variance.ln() + alpha * (z.abs() - EXPECTED_ABS_Z) + gamma * z;
                log_v.clamp(-LOG_VARIANCE_BOUND, LOG_VARIANCE_BOUND).exp()
            }
        }
    }

    /// Whether shocks decay back towards the long-run level.
    pub fn is_mean_reverting(&self) -> bool {
        match *self {
            Self::Garch { alpha, beta, .. } => alpha + beta < 1.0,
            Self::Egarch { beta, .. } => beta.abs() < 1.0,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        match *self {
            Self::Garch { omega, alpha, beta } => {
                if !(omega.is_finite() && alpha.is_finite() && beta.is_finite()) {
                    return Err(AppError::Config(
                        "garch coefficients must be finite".to_string(),
                    ));
                }
                if omega < 0.0 || alpha < 0.0 || beta < 0.0 {
                    return Err(AppError::Config(format!(
                        "garch coefficients must be non-negative (omega={}, alpha={}, beta={})",
                        omega, alpha, beta
                    )));
                }
            }
            Self::Egarch {
                omega,
                beta,
                alpha,
                gamma,
            } => {
                if ![omega, beta, alpha, gamma].iter().all(|c| c.is_finite()) {
                    return Err(AppError::Config(
                        "egarch coefficients must be finite".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garch_recurrence_matches_formula() {
        let model = VarianceModel::default();
        let v = model.next(0.01, 2.0, 0.02, 0.001);
        assert!((v - (0.03 + 0.12 * 4.0 + 0.85 * 0.01)).abs() < 1e-12);
        assert!(model.is_mean_reverting());
    }

    #[test]
    fn egarch_stays_positive_for_large_shocks() {
        let model = VarianceModel::egarch_default();
        let mut v = 0.0144;
        for ret in [0.5, -0.9, 3.0, -4.0, 0.0] {
            v = model.next(v, 0.0, ret, 0.001);
            assert!(v > 0.0 && v.is_finite());
        }
    }

    #[test]
    fn negative_garch_coefficients_rejected() {
        let model = VarianceModel::Garch {
            omega: 0.03,
            alpha: -0.1,
            beta: 0.85,
        };
        assert!(model.validate().is_err());
    }
}
