//! Core types for toxiscan

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Human-readable class label attached to every prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToxicityLabel {
    #[serde(rename = "Toxic")]
    Toxic,
    #[serde(rename = "Not Toxic")]
    NotToxic,
}

impl ToxicityLabel {
    /// Label for a boolean decision
    pub fn from_decision(is_toxic: bool) -> Self {
        if is_toxic {
            Self::Toxic
        } else {
            Self::NotToxic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Toxic => "Toxic",
            Self::NotToxic => "Not Toxic",
        }
    }
}

impl fmt::Display for ToxicityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The answer returned for one input text.
///
/// `probability_toxic` is the calibrated display probability, and every other
/// numeric field is derived from it: `probability_not_toxic` is its
/// complement, `confidence` is the larger of the two and `is_toxic` is
/// `probability_toxic > 0.5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// The original input, echoed unmodified
    pub text: String,

    /// Binary decision
    pub is_toxic: bool,

    /// "Toxic" or "Not Toxic", consistent with `is_toxic`
    pub toxicity_label: ToxicityLabel,

    /// Display probability of the toxic class
    pub probability_toxic: f64,

    /// `1 - probability_toxic`
    pub probability_not_toxic: f64,

    /// `max(probability_toxic, probability_not_toxic)`
    pub confidence: f64,
}

/// Where a persisted prediction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    /// Single-text endpoint
    Api,
    /// Batch endpoint
    Batch,
    /// Video comment analysis
    Youtube,
}

impl PredictionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Batch => "batch",
            Self::Youtube => "youtube",
        }
    }
}

impl fmt::Display for PredictionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictionSource {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "batch" => Ok(Self::Batch),
            "youtube" => Ok(Self::Youtube),
            other => Err(crate::Error::invalid_argument(format!(
                "unknown prediction source: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_result_field_names() {
        let result = PredictionResult {
            text: "hello".to_string(),
            is_toxic: false,
            toxicity_label: ToxicityLabel::NotToxic,
            probability_toxic: 0.15,
            probability_not_toxic: 0.85,
            confidence: 0.85,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["text"], "hello");
        assert_eq!(json["is_toxic"], false);
        assert_eq!(json["toxicity_label"], "Not Toxic");
        assert_eq!(json["probability_toxic"], 0.15);
        assert_eq!(json["probability_not_toxic"], 0.85);
        assert_eq!(json["confidence"], 0.85);
        assert_eq!(json.as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_label_from_decision() {
        assert_eq!(ToxicityLabel::from_decision(true), ToxicityLabel::Toxic);
        assert_eq!(ToxicityLabel::from_decision(false).to_string(), "Not Toxic");
    }

    #[test]
    fn test_source_round_trip() {
        assert_eq!(serde_json::to_string(&PredictionSource::Youtube).unwrap(), "\"youtube\"");
        assert_eq!("BATCH".parse::<PredictionSource>().unwrap(), PredictionSource::Batch);
        assert!("webhook".parse::<PredictionSource>().is_err());
    }
}
