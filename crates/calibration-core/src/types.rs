use serde::{Deserialize, Serialize};

/// A resolved model prediction used to fit a calibrator.
///
/// Created once per fitting call and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    /// Raw model output probability in [0, 1].
    pub probability: f64,
    /// Realized binary outcome: 1.0 if the event occurred, else 0.0.
    pub outcome: f64,
}

impl RawPrediction {
    pub fn new(probability: f64, occurred: bool) -> Self {
        Self {
            probability,
            outcome: if occurred { 1.0 } else { 0.0 },
        }
    }

    /// Split a prediction slice into the parallel (probability, outcome)
    /// vectors the fitters consume.
    pub fn split(predictions: &[RawPrediction]) -> (Vec<f64>, Vec<f64>) {
        let probs = predictions.iter().map(|p| p.probability).collect();
        let outcomes = predictions.iter().map(|p| p.outcome).collect();
        (probs, outcomes)
    }
}
