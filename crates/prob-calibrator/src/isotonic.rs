//! Isotonic regression via the pool-adjacent-violators algorithm.

use std::cmp::Ordering;

use calibration_core::CalibrationError;

use crate::model::{CalibratorModel, Fitter, Knot};

/// One pooled block during PAV: carries the sums needed to compute the
/// block's mean x and mean y after merges.
#[derive(Debug, Clone, Copy)]
struct Block {
    sum_x: f64,
    sum_y: f64,
    count: usize,
}

impl Block {
    fn mean_y(&self) -> f64 {
        self.sum_y / self.count as f64
    }

    fn absorb(&mut self, other: Block) {
        self.sum_x += other.sum_x;
        self.sum_y += other.sum_y;
        self.count += other.count;
    }
}

/// Fits a monotone step mapping from raw probability to observed frequency.
#[derive(Debug, Clone, Default)]
pub struct IsotonicFitter;

impl IsotonicFitter {
    pub fn new() -> Self {
        Self
    }
}

impl Fitter for IsotonicFitter {
    fn fit(&self, probs: &[f64], outcomes: &[f64]) -> Result<CalibratorModel, CalibrationError> {
        if probs.len() != outcomes.len() {
            return Err(CalibrationError::ShapeMismatch {
                left: probs.len(),
                right: outcomes.len(),
            });
        }
        if probs.is_empty() {
            return Ok(CalibratorModel::Isotonic { knots: Vec::new() });
        }

        // Stable sort by probability; ties keep their original order.
        let mut order: Vec<usize> = (0..probs.len()).collect();
        order.sort_by(|&a, &b| probs[a].partial_cmp(&probs[b]).unwrap_or(Ordering::Equal));

        let mut blocks: Vec<Block> = order
            .iter()
            .map(|&i| Block {
                sum_x: probs[i],
                sum_y: outcomes[i],
                count: 1,
            })
            .collect();

        // Merge adjacent violators, backing up one block after each merge so
        // a lowered mean can propagate leftwards.
        let mut i = 0;
        while i + 1 < blocks.len() {
            if blocks[i].mean_y() > blocks[i + 1].mean_y() {
                let right = blocks.remove(i + 1);
                blocks[i].absorb(right);
                i = i.saturating_sub(1);
            } else {
                i += 1;
            }
        }

        let knots = blocks
            .iter()
            .map(|b| Knot {
                x: b.sum_x / b.count as f64,
                y: b.mean_y(),
            })
            .collect();

        Ok(CalibratorModel::Isotonic { knots })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn fit_knots(probs: &[f64], outcomes: &[f64]) -> Vec<Knot> {
        match IsotonicFitter::new().fit(probs, outcomes).unwrap() {
            CalibratorModel::Isotonic { knots } => knots,
            other => panic!("expected isotonic model, got {other:?}"),
        }
    }

    #[test]
    fn already_monotone_data_is_untouched() {
        // Only strict violations merge; the tied leading pair stays split.
        let knots = fit_knots(&[0.1, 0.4, 0.9], &[0.0, 0.0, 1.0]);
        assert_eq!(knots.len(), 3);
        assert_relative_eq!(knots[0].y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(knots[1].y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(knots[2].y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(knots[0].x, 0.1, epsilon = 1e-12);
        assert_relative_eq!(knots[2].x, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn violating_pair_is_pooled_to_its_mean() {
        // The middle pair (1, 0) violates and pools to 0.5.
        let knots = fit_knots(&[0.1, 0.4, 0.6, 0.9], &[0.0, 1.0, 0.0, 1.0]);
        assert_eq!(knots.len(), 3);
        assert_relative_eq!(knots[1].x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(knots[1].y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn fully_decreasing_data_collapses_to_one_block() {
        let knots = fit_knots(&[0.1, 0.5, 0.9], &[1.0, 0.5, 0.0]);
        assert_eq!(knots.len(), 1);
        assert_relative_eq!(knots[0].x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(knots[0].y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn empty_input_gives_empty_knots() {
        let model = IsotonicFitter::new().fit(&[], &[]).unwrap();
        assert_eq!(model, CalibratorModel::Isotonic { knots: vec![] });
        assert_relative_eq!(model.apply(0.37), 0.37, epsilon = 1e-12);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let err = IsotonicFitter::new().fit(&[0.5], &[]).unwrap_err();
        assert!(matches!(
            err,
            CalibrationError::ShapeMismatch { left: 1, right: 0 }
        ));
    }

    #[test]
    fn knots_are_always_monotone_on_random_inputs() {
        let mut rng = StdRng::seed_from_u64(1729);
        for _ in 0..50 {
            let n = rng.gen_range(1..200);
            let probs: Vec<f64> = (0..n).map(|_| rng.gen()).collect();
            let outcomes: Vec<f64> = (0..n)
                .map(|_| if rng.gen::<bool>() { 1.0 } else { 0.0 })
                .collect();

            let knots = fit_knots(&probs, &outcomes);
            for pair in knots.windows(2) {
                assert!(pair[0].x <= pair[1].x, "x must be non-decreasing");
                assert!(pair[0].y <= pair[1].y, "y must be non-decreasing");
            }
        }
    }

    #[test]
    fn single_point_maps_everything_to_its_outcome() {
        let model = IsotonicFitter::new().fit(&[0.7], &[1.0]).unwrap();
        assert_relative_eq!(model.apply(0.1), 1.0, epsilon = 1e-12);
        assert_relative_eq!(model.apply(0.99), 1.0, epsilon = 1e-12);
    }
}
