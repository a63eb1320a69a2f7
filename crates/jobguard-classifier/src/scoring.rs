//! Score normalization: logits to probabilities and a label

use jobguard_core::{LogitVector, PredictionLabel, ProbabilityDistribution};

/// Numerically stable softmax over the two logits, computed in f64
pub fn softmax(logits: &LogitVector) -> ProbabilityDistribution {
    let [real, fraudulent] = logits.as_array().map(f64::from);
    let max = real.max(fraudulent);

    let real = (real - max).exp();
    let fraudulent = (fraudulent - max).exp();
    let sum = real + fraudulent;

    ProbabilityDistribution {
        real: real / sum,
        fraudulent: fraudulent / sum,
    }
}

/// Index of the larger logit; ties go to `Real`
pub fn argmax(logits: &LogitVector) -> PredictionLabel {
    if logits.fraudulent() > logits.real() {
        PredictionLabel::Fraudulent
    } else {
        PredictionLabel::Real
    }
}

pub fn normalize(logits: &LogitVector) -> (ProbabilityDistribution, PredictionLabel) {
    (softmax(logits), argmax(logits))
}
