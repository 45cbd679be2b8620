//! Fitted calibrator models and their application.
//!
//! A calibrator is a tagged union rather than a trait object so persisted
//! blobs are self-describing and dispatch is a single explicit match.

use calibration_core::{sigmoid, CalibrationError};
use serde::{Deserialize, Serialize};

/// One (x, y) point in an isotonic step mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Knot {
    pub x: f64,
    pub y: f64,
}

/// A fitted probability calibrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalibratorModel {
    /// Platt scaling: calibrated = sigmoid(a * p + b).
    Platt { a: f64, b: f64 },
    /// Isotonic regression: linear interpolation over non-decreasing knots.
    Isotonic { knots: Vec<Knot> },
    /// K-fold isotonic ensemble: arithmetic mean of the members' outputs.
    IsotonicEnsemble { members: Vec<Vec<Knot>> },
}

impl CalibratorModel {
    /// Map a raw probability through the calibrator.
    ///
    /// A non-finite result is treated as calibration failure and falls back
    /// to the raw input; the output is always clamped to [0, 1].
    pub fn apply(&self, raw: f64) -> f64 {
        let out = match self {
            CalibratorModel::Platt { a, b } => sigmoid(a * raw + b),
            CalibratorModel::Isotonic { knots } => interpolate(knots, raw),
            CalibratorModel::IsotonicEnsemble { members } => {
                if members.is_empty() {
                    raw
                } else {
                    let sum: f64 = members.iter().map(|k| interpolate(k, raw)).sum();
                    sum / members.len() as f64
                }
            }
        };

        if out.is_finite() {
            out.clamp(0.0, 1.0)
        } else {
            raw.clamp(0.0, 1.0)
        }
    }

    /// Apply the calibrator to a whole prediction slice.
    pub fn apply_all(&self, raw: &[f64]) -> Vec<f64> {
        raw.iter().map(|&p| self.apply(p)).collect()
    }
}

/// Piecewise-linear interpolation between knots. Inputs outside the knot
/// range are clamped to the boundary y-values; an empty knot set behaves as
/// a clamped identity.
fn interpolate(knots: &[Knot], raw: f64) -> f64 {
    let first = match knots.first() {
        Some(k) => k,
        None => return raw.clamp(0.0, 1.0),
    };
    let last = knots[knots.len() - 1];

    if raw <= first.x {
        return first.y;
    }
    if raw >= last.x {
        return last.y;
    }

    for pair in knots.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if raw <= hi.x {
            if hi.x == lo.x {
                return hi.y;
            }
            let t = (raw - lo.x) / (hi.x - lo.x);
            return lo.y + t * (hi.y - lo.y);
        }
    }

    last.y
}

/// A calibration fitting strategy over parallel probability/outcome vectors.
pub trait Fitter: Sync {
    fn fit(&self, probs: &[f64], outcomes: &[f64]) -> Result<CalibratorModel, CalibrationError>;
}
