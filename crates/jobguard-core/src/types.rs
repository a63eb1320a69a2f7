//! Domain types flowing through the prediction pipeline

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated request text. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputText(String);

impl InputText {
    /// Validate raw request text.
    ///
    /// Absent and empty text are rejected; anything else is kept exactly as
    /// received. Length capping happens later, at tokenization.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw {
            Some(text) if !text.is_empty() => Ok(Self(text.to_string())),
            _ => Err(Error::EmptyInput),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for InputText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InputText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shorthand for [`InputText::parse`]
pub fn validate(raw: Option<&str>) -> Result<InputText> {
    InputText::parse(raw)
}

/// Model-ready input for a single text (batch size 1).
///
/// All three sequences have the same length; padded positions carry a 0 in
/// `attention_mask`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInput {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub type_ids: Vec<u32>,
}

impl EncodedInput {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of non-padding positions
    pub fn token_count(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m != 0).count()
    }

    /// Check the parallel sequences line up
    pub fn check_shape(&self) -> Result<()> {
        if self.input_ids.is_empty() {
            return Err(Error::inference("encoded input is empty"));
        }
        if self.attention_mask.len() != self.input_ids.len()
            || self.type_ids.len() != self.input_ids.len()
        {
            return Err(Error::inference(format!(
                "shape mismatch: {} ids, {} mask, {} type ids",
                self.input_ids.len(),
                self.attention_mask.len(),
                self.type_ids.len()
            )));
        }
        Ok(())
    }
}

/// The two classes, in model output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredictionLabel {
    Real,
    Fraudulent,
}

impl PredictionLabel {
    /// Labels indexed by model output position
    pub const ALL: [PredictionLabel; 2] = [PredictionLabel::Real, PredictionLabel::Fraudulent];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            Self::Real => 0,
            Self::Fraudulent => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Real => "Real",
            Self::Fraudulent => "Fraudulent",
        }
    }
}

impl fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw per-class scores: index 0 = Real, index 1 = Fraudulent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogitVector([f32; 2]);

impl LogitVector {
    pub fn new(real: f32, fraudulent: f32) -> Self {
        Self([real, fraudulent])
    }

    pub fn real(&self) -> f32 {
        self.0[0]
    }

    pub fn fraudulent(&self) -> f32 {
        self.0[1]
    }

    pub fn as_array(&self) -> [f32; 2] {
        self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl TryFrom<Vec<f32>> for LogitVector {
    type Error = Error;

    fn try_from(values: Vec<f32>) -> Result<Self> {
        let pair: [f32; 2] = values.try_into().map_err(|v: Vec<f32>| {
            Error::inference(format!("expected 2 logits, model produced {}", v.len()))
        })?;
        let logits = Self(pair);
        if !logits.is_finite() {
            return Err(Error::inference(format!(
                "non-finite logits: [{}, {}]",
                pair[0], pair[1]
            )));
        }
        Ok(logits)
    }
}

/// Softmax over the two classes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityDistribution {
    #[serde(rename = "Real")]
    pub real: f64,
    #[serde(rename = "Fraudulent")]
    pub fraudulent: f64,
}

impl ProbabilityDistribution {
    pub fn get(&self, label: PredictionLabel) -> f64 {
        match label {
            PredictionLabel::Real => self.real,
            PredictionLabel::Fraudulent => self.fraudulent,
        }
    }

    pub fn total(&self) -> f64 {
        self.real + self.fraudulent
    }
}

/// Final, immutable answer for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    text: String,
    prediction: PredictionLabel,
    probabilities: ProbabilityDistribution,
}

impl PredictionResult {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn prediction(&self) -> PredictionLabel {
        self.prediction
    }

    pub fn probabilities(&self) -> &ProbabilityDistribution {
        &self.probabilities
    }
}

/// Package a pipeline outcome. Values are taken as-is.
pub fn assemble(
    text: InputText,
    label: PredictionLabel,
    distribution: ProbabilityDistribution,
) -> PredictionResult {
    PredictionResult {
        text: text.into_inner(),
        prediction: label,
        probabilities: distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_missing_and_empty() {
        assert!(matches!(validate(None), Err(Error::EmptyInput)));
        assert!(matches!(validate(Some("")), Err(Error::EmptyInput)));
    }

    #[test]
    fn test_validate_keeps_text_unchanged() {
        let text = validate(Some("  Data entry clerk  ")).unwrap();
        assert_eq!(text.as_str(), "  Data entry clerk  ");

        // whitespace is still text
        assert!(validate(Some("   ")).is_ok());
    }

    #[test]
    fn test_logit_vector_requires_two_finite_values() {
        let logits = LogitVector::try_from(vec![0.25, -1.5]).unwrap();
        assert_eq!(logits.real(), 0.25);
        assert_eq!(logits.fraudulent(), -1.5);

        assert!(matches!(
            LogitVector::try_from(vec![1.0, 2.0, 3.0]),
            Err(Error::Inference(_))
        ));
        assert!(matches!(
            LogitVector::try_from(vec![f32::NAN, 0.0]),
            Err(Error::Inference(_))
        ));
        assert!(matches!(
            LogitVector::try_from(vec![f32::INFINITY, 0.0]),
            Err(Error::Inference(_))
        ));
    }

    #[test]
    fn test_encoded_input_shape_check() {
        let ok = EncodedInput {
            input_ids: vec![0, 5, 2],
            attention_mask: vec![1, 1, 1],
            type_ids: vec![0, 0, 0],
        };
        assert!(ok.check_shape().is_ok());

        let bad = EncodedInput {
            attention_mask: vec![1, 1],
            ..ok.clone()
        };
        assert!(matches!(bad.check_shape(), Err(Error::Inference(_))));
    }

    #[test]
    fn test_result_json_shape() {
        let result = assemble(
            validate(Some("Remote data entry, $900/day")).unwrap(),
            PredictionLabel::Fraudulent,
            ProbabilityDistribution {
                real: 0.125,
                fraudulent: 0.875,
            },
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["text"], "Remote data entry, $900/day");
        assert_eq!(json["prediction"], "Fraudulent");
        assert_eq!(json["probabilities"]["Real"], 0.125);
        assert_eq!(json["probabilities"]["Fraudulent"], 0.875);
    }

    #[test]
    fn test_label_index_mapping() {
        assert_eq!(PredictionLabel::from_index(0), Some(PredictionLabel::Real));
        assert_eq!(
            PredictionLabel::from_index(1),
            Some(PredictionLabel::Fraudulent)
        );
        assert_eq!(PredictionLabel::from_index(2), None);
        assert_eq!(PredictionLabel::Fraudulent.index(), 1);
    }
}
