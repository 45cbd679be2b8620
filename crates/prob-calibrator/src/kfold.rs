//! K-fold calibration fitting.
//!
//! Fits K independent models on complementary data slices and aggregates
//! them: Platt coefficients are averaged, isotonic models are kept as an
//! ensemble whose applied value is the mean of the members' outputs. The
//! per-fold fits are independent and run on the rayon pool.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use calibration_core::CalibrationError;

use crate::model::{CalibratorModel, Fitter};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KFoldConfig {
    /// Number of folds.
    pub k: usize,
    /// Seed for the deterministic index shuffle.
    pub seed: u64,
}

impl Default for KFoldConfig {
    fn default() -> Self {
        Self { k: 5, seed: 42 }
    }
}

/// Fit `config.k` models, each trained with one fold held out, and aggregate.
///
/// Falls back to a single full-data fit when there are fewer samples than
/// folds. Individual fold failures are logged and skipped; only when every
/// fold fails is the full-data fallback tried, and its error propagates.
pub fn fit_kfold<F: Fitter>(
    fitter: &F,
    probs: &[f64],
    outcomes: &[f64],
    config: KFoldConfig,
) -> Result<CalibratorModel, CalibrationError> {
    if probs.len() != outcomes.len() {
        return Err(CalibrationError::ShapeMismatch {
            left: probs.len(),
            right: outcomes.len(),
        });
    }
    if config.k < 2 || probs.len() < config.k {
        return fitter.fit(probs, outcomes);
    }

    let folds = fold_indices(probs.len(), config.k, config.seed);

    let models: Vec<CalibratorModel> = folds
        .par_iter()
        .enumerate()
        .filter_map(|(fold_no, held_out)| {
            let mut train_p = Vec::with_capacity(probs.len() - held_out.len());
            let mut train_y = Vec::with_capacity(probs.len() - held_out.len());
            for (other_no, fold) in folds.iter().enumerate() {
                if other_no == fold_no {
                    continue;
                }
                for &i in fold {
                    train_p.push(probs[i]);
                    train_y.push(outcomes[i]);
                }
            }

            match fitter.fit(&train_p, &train_y) {
                Ok(model) => Some(model),
                Err(e) => {
                    warn!(fold = fold_no, error = %e, "fold fit failed, skipping");
                    None
                }
            }
        })
        .collect();

    if models.is_empty() {
        warn!("all folds failed, falling back to a single full-data fit");
        return fitter.fit(probs, outcomes);
    }

    aggregate(models)
}

/// Shuffle indices with a seeded RNG and deal them into k near-equal folds.
fn fold_indices(n: usize, k: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut folds = vec![Vec::with_capacity(n / k + 1); k];
    for (pos, idx) in indices.into_iter().enumerate() {
        folds[pos % k].push(idx);
    }
    folds
}

fn aggregate(models: Vec<CalibratorModel>) -> Result<CalibratorModel, CalibrationError> {
    let count = models.len() as f64;
    let mut platt_sum: Option<(f64, f64)> = None;
    let mut members = Vec::new();

    for model in models {
        match model {
            CalibratorModel::Platt { a, b } => {
                let (sa, sb) = platt_sum.unwrap_or((0.0, 0.0));
                platt_sum = Some((sa + a, sb + b));
            }
            CalibratorModel::Isotonic { knots } => members.push(knots),
            CalibratorModel::IsotonicEnsemble { members: inner } => members.extend(inner),
        }
    }

    match (platt_sum, members.is_empty()) {
        (Some((sa, sb)), true) => Ok(CalibratorModel::Platt {
            a: sa / count,
            b: sb / count,
        }),
        (None, false) => Ok(CalibratorModel::IsotonicEnsemble { members }),
        _ => Err(CalibrationError::FitFailed(
            "cannot aggregate mixed calibrator kinds".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isotonic::IsotonicFitter;
    use crate::platt::PlattFitter;
    use approx::assert_relative_eq;
    use calibration_core::sigmoid;
    use rand::Rng;

    fn synthetic(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut probs = Vec::with_capacity(n);
        let mut outcomes = Vec::with_capacity(n);
        for _ in 0..n {
            let p: f64 = rng.gen();
            let true_p = sigmoid(3.0 * p - 1.5);
            probs.push(p);
            outcomes.push(if rng.gen::<f64>() < true_p { 1.0 } else { 0.0 });
        }
        (probs, outcomes)
    }

    #[test]
    fn fold_partition_is_deterministic_and_complete() {
        let a = fold_indices(103, 5, 9);
        let b = fold_indices(103, 5, 9);
        assert_eq!(a, b);

        let mut all: Vec<usize> = a.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..103).collect::<Vec<_>>());
    }

    #[test]
    fn different_seeds_shuffle_differently() {
        assert_ne!(fold_indices(50, 5, 1), fold_indices(50, 5, 2));
    }

    #[test]
    fn platt_kfold_averages_to_a_single_model() {
        let (probs, outcomes) = synthetic(400, 3);
        let model = fit_kfold(
            &PlattFitter::default(),
            &probs,
            &outcomes,
            KFoldConfig::default(),
        )
        .unwrap();
        assert!(matches!(model, CalibratorModel::Platt { .. }));
    }

    #[test]
    fn isotonic_kfold_builds_a_five_member_ensemble() {
        let (probs, outcomes) = synthetic(200, 5);
        let model = fit_kfold(
            &IsotonicFitter::new(),
            &probs,
            &outcomes,
            KFoldConfig::default(),
        )
        .unwrap();
        match model {
            CalibratorModel::IsotonicEnsemble { members } => assert_eq!(members.len(), 5),
            other => panic!("expected ensemble, got {other:?}"),
        }
    }

    #[test]
    fn kfold_is_deterministic_for_a_fixed_seed() {
        let (probs, outcomes) = synthetic(300, 8);
        let cfg = KFoldConfig { k: 5, seed: 123 };
        let m1 = fit_kfold(&PlattFitter::default(), &probs, &outcomes, cfg).unwrap();
        let m2 = fit_kfold(&PlattFitter::default(), &probs, &outcomes, cfg).unwrap();
        assert_eq!(m1, m2);
    }

    #[test]
    fn tiny_input_falls_back_to_single_fit() {
        let probs = vec![0.2, 0.5, 0.8];
        let outcomes = vec![0.0, 1.0, 1.0];
        let model = fit_kfold(
            &IsotonicFitter::new(),
            &probs,
            &outcomes,
            KFoldConfig::default(),
        )
        .unwrap();
        // Plain isotonic, not an ensemble: k-fold was skipped.
        assert!(matches!(model, CalibratorModel::Isotonic { .. }));
    }

    /// Fails whenever the training slice contains the poison marker.
    struct PoisonFitter;

    impl Fitter for PoisonFitter {
        fn fit(&self, probs: &[f64], outcomes: &[f64]) -> Result<CalibratorModel, CalibrationError> {
            if probs.iter().any(|&p| p > 0.95) {
                return Err(CalibrationError::FitFailed("poisoned slice".to_string()));
            }
            IsotonicFitter::new().fit(probs, outcomes)
        }
    }

    #[test]
    fn partial_fold_failures_still_produce_an_ensemble() {
        // One poison sample: every training slice except the fold holding it
        // out contains the marker, so exactly one fold fit succeeds.
        let mut probs: Vec<f64> = (0..50).map(|i| i as f64 / 100.0).collect();
        probs[0] = 0.99;
        let outcomes: Vec<f64> = probs.iter().map(|&p| if p > 0.3 { 1.0 } else { 0.0 }).collect();

        let model = fit_kfold(&PoisonFitter, &probs, &outcomes, KFoldConfig::default()).unwrap();
        match model {
            CalibratorModel::IsotonicEnsemble { members } => assert_eq!(members.len(), 1),
            other => panic!("expected ensemble, got {other:?}"),
        }
    }

    #[test]
    fn total_failure_surfaces_the_fallback_error() {
        // Every sample is poisoned: all folds fail and so does the fallback.
        let probs = vec![0.99; 20];
        let outcomes = vec![1.0; 20];
        let err = fit_kfold(&PoisonFitter, &probs, &outcomes, KFoldConfig::default()).unwrap_err();
        assert!(matches!(err, CalibrationError::FitFailed(_)));
    }

    #[test]
    fn kfold_platt_tracks_the_single_fit() {
        let (probs, outcomes) = synthetic(2000, 21);
        let single = PlattFitter::default().fit(&probs, &outcomes).unwrap();
        let folded = fit_kfold(
            &PlattFitter::default(),
            &probs,
            &outcomes,
            KFoldConfig::default(),
        )
        .unwrap();

        let (CalibratorModel::Platt { a: a1, b: b1 }, CalibratorModel::Platt { a: a2, b: b2 }) =
            (single, folded)
        else {
            panic!("expected Platt models");
        };
        assert_relative_eq!(a1, a2, epsilon = 0.5);
        assert_relative_eq!(b1, b2, epsilon = 0.5);
    }
}
