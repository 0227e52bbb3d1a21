//! Model adapter abstraction
//!
//! Defines the single contract every candidate predictor implements, so the
//! evaluation engine can drive a rule-based baseline, an n-gram similarity
//! baseline, or a remote black-box NLP model through the same interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dataset::LabelField;
use crate::error::InferenceError;
use crate::tokenize::ModelInput;

/// Optional per-building context passed alongside each input.
#[derive(Debug, Clone, Copy)]
pub struct BuildingContext<'a> {
    /// Building the point name belongs to.
    pub building: &'a str,
}

/// A predicted field labelling for one point name.
///
/// Partial predictions are allowed: a field the model does not predict is
/// simply absent and scores as a miss wherever ground truth has a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted field values.
    pub labels: BTreeMap<LabelField, String>,
    /// Model confidence in [0, 1], when the backend reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Prediction {
    /// Build a prediction from `(field, value)` pairs, dropping empty values.
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (LabelField, Option<S>)>,
        S: Into<String>,
    {
        let labels = fields
            .into_iter()
            .filter_map(|(f, v)| v.map(|v| (f, v.into())))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        Self { labels, confidence: None }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Predicted value for a field, if any.
    pub fn get(&self, field: LabelField) -> Option<&str> {
        self.labels.get(&field).map(String::as_str)
    }
}

/// Unified contract for candidate predictors.
///
/// `predict` may suspend while awaiting external inference. Backend
/// failures, timeouts and malformed responses surface as
/// [`InferenceError`]; the engine converts those to FAILED sentinels
/// per record rather than aborting the run.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Stable adapter name, recorded in reports.
    fn name(&self) -> &str;

    /// Predict field labels for one normalized point name.
    async fn predict(
        &self,
        input: &ModelInput,
        ctx: BuildingContext<'_>,
    ) -> Result<Prediction, InferenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fields_drops_empty_and_none() {
        let prediction = Prediction::from_fields([
            (LabelField::Equip, Some("AHU")),
            (LabelField::Subcomp, Some("")),
            (LabelField::IoType, None),
        ]);
        assert_eq!(prediction.get(LabelField::Equip), Some("AHU"));
        assert_eq!(prediction.get(LabelField::Subcomp), None);
        assert_eq!(prediction.get(LabelField::IoType), None);
    }
}
