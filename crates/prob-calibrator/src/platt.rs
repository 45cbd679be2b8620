//! Platt scaling fitted by Newton-Raphson.
//!
//! Maximizes the L2-regularized log-likelihood of sigmoid(a*p + b) against
//! the binary outcomes. The regularization constant only exists to keep the
//! Hessian invertible and is far too small to bias a well-posed fit.

use calibration_core::{logit, sigmoid, CalibrationError};
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::model::{CalibratorModel, Fitter};

/// Newton-Raphson settings for Platt scaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlattConfig {
    /// Iteration cap for the Newton loop.
    pub max_iterations: usize,
    /// Convergence threshold on the max absolute parameter change.
    pub tolerance: f64,
    /// L2 regularization strength.
    pub regularization: f64,
    /// Minimum number of paired samples required to fit.
    pub min_samples: usize,
}

impl Default for PlattConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            regularization: 1e-8,
            min_samples: 3,
        }
    }
}

/// Fits the two Platt coefficients (a, b).
#[derive(Debug, Clone, Default)]
pub struct PlattFitter {
    config: PlattConfig,
}

impl PlattFitter {
    pub fn new(config: PlattConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlattConfig {
        &self.config
    }
}

impl Fitter for PlattFitter {
    fn fit(&self, probs: &[f64], outcomes: &[f64]) -> Result<CalibratorModel, CalibrationError> {
        if probs.len() != outcomes.len() {
            return Err(CalibrationError::ShapeMismatch {
                left: probs.len(),
                right: outcomes.len(),
            });
        }
        if probs.len() < self.config.min_samples {
            return Err(CalibrationError::InsufficientData {
                required: self.config.min_samples,
                actual: probs.len(),
            });
        }

        let n = probs.len();
        let lambda = self.config.regularization;

        // Design matrix columns are [p, 1]; start b at the logit of the
        // base rate and a at 1 (identity-ish in logit space).
        let mean_y = outcomes.iter().sum::<f64>() / n as f64;
        let mut w = Vector2::new(1.0, logit(mean_y));

        for _ in 0..self.config.max_iterations {
            let mut grad = Vector2::zeros();
            let mut info = Matrix2::zeros();

            for i in 0..n {
                let p = probs[i];
                let s = sigmoid(w[0] * p + w[1]);
                let residual = outcomes[i] - s;
                grad[0] += p * residual;
                grad[1] += residual;

                let v = s * (1.0 - s);
                info[(0, 0)] += p * p * v;
                info[(0, 1)] += p * v;
                info[(1, 1)] += v;
            }
            info[(1, 0)] = info[(0, 1)];

            grad -= w * lambda;
            let hessian = -(info + Matrix2::identity() * lambda);

            // Newton step: solve H * delta = grad. The pseudo-inverse path
            // covers degenerate inputs (e.g. constant probabilities).
            let delta = match hessian.try_inverse() {
                Some(inv) => inv * grad,
                None => hessian
                    .pseudo_inverse(1e-12)
                    .map(|pinv| pinv * grad)
                    .map_err(|e| CalibrationError::FitFailed(e.to_string()))?,
            };

            w -= delta;

            if delta.amax() < self.config.tolerance {
                break;
            }
        }

        if !w[0].is_finite() || !w[1].is_finite() {
            return Err(CalibrationError::FitFailed(
                "Newton-Raphson produced non-finite coefficients".to_string(),
            ));
        }

        Ok(CalibratorModel::Platt { a: w[0], b: w[1] })
    }
}
