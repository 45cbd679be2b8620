//! Calibration quality metrics: Brier score, expected calibration error,
//! and reliability diagram bins.

use calibration_core::CalibrationError;
use serde::{Deserialize, Serialize};

/// Number of equal-width bins used when no bin count is given.
pub const DEFAULT_BINS: usize = 10;

/// One equal-width bin of a reliability diagram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityBin {
    /// Midpoint of the bin's probability interval.
    pub center: f64,
    /// Mean predicted probability of the samples in the bin.
    pub mean_predicted: f64,
    /// Observed outcome frequency of the samples in the bin.
    pub mean_observed: f64,
    /// Number of samples in the bin.
    pub count: usize,
}

/// Mean squared error between predicted probabilities and binary outcomes.
///
/// Empty input scores 0.0.
pub fn brier_score(probs: &[f64], outcomes: &[f64]) -> Result<f64, CalibrationError> {
    check_shape(probs, outcomes)?;
    if probs.is_empty() {
        return Ok(0.0);
    }

    let sum: f64 = probs
        .iter()
        .zip(outcomes)
        .map(|(p, y)| (p - y) * (p - y))
        .sum();
    Ok(sum / probs.len() as f64)
}

/// Expected calibration error over `bins` equal-width probability bins.
///
/// Each non-empty bin contributes |mean predicted - mean observed| weighted
/// by its share of the samples; empty bins contribute nothing.
pub fn expected_calibration_error(
    probs: &[f64],
    outcomes: &[f64],
    bins: usize,
) -> Result<f64, CalibrationError> {
    let diagram = reliability_diagram(probs, outcomes, bins)?;
    if probs.is_empty() {
        return Ok(0.0);
    }

    let n = probs.len() as f64;
    let ece = diagram
        .iter()
        .filter(|bin| bin.count > 0)
        .map(|bin| (bin.count as f64 / n) * (bin.mean_predicted - bin.mean_observed).abs())
        .sum();
    Ok(ece)
}

/// ECE with the conventional ten-bin layout.
pub fn ece(probs: &[f64], outcomes: &[f64]) -> Result<f64, CalibrationError> {
    expected_calibration_error(probs, outcomes, DEFAULT_BINS)
}

/// Bucket predictions into `bins` equal-width bins over [0, 1].
///
/// Always returns exactly `bins` entries; empty bins carry zero counts and
/// zero means. A probability of exactly 1.0 lands in the last bin.
pub fn reliability_diagram(
    probs: &[f64],
    outcomes: &[f64],
    bins: usize,
) -> Result<Vec<ReliabilityBin>, CalibrationError> {
    check_shape(probs, outcomes)?;
    if bins == 0 {
        return Err(CalibrationError::FitFailed(
            "reliability diagram needs at least one bin".to_string(),
        ));
    }

    let mut sum_p = vec![0.0; bins];
    let mut sum_y = vec![0.0; bins];
    let mut counts = vec![0usize; bins];

    for (&p, &y) in probs.iter().zip(outcomes) {
        let idx = ((p * bins as f64) as usize).min(bins - 1);
        sum_p[idx] += p;
        sum_y[idx] += y;
        counts[idx] += 1;
    }

    let width = 1.0 / bins as f64;
    let diagram = (0..bins)
        .map(|i| {
            let count = counts[i];
            let (mean_predicted, mean_observed) = if count > 0 {
                (sum_p[i] / count as f64, sum_y[i] / count as f64)
            } else {
                (0.0, 0.0)
            };
            ReliabilityBin {
                center: (i as f64 + 0.5) * width,
                mean_predicted,
                mean_observed,
                count,
            }
        })
        .collect();

    Ok(diagram)
}

fn check_shape(probs: &[f64], outcomes: &[f64]) -> Result<(), CalibrationError> {
    if probs.len() != outcomes.len() {
        return Err(CalibrationError::ShapeMismatch {
            left: probs.len(),
            right: outcomes.len(),
        });
    }
    Ok(())
}
