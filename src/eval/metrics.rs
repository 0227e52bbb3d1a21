//! Scoring
//!
//! Computes per-field accuracy, macro-averaged precision / recall / F1 and
//! confusion matrices over a finished evaluation, globally and per building.
//!
//! Scoring conventions:
//! - A field is scored for a record only when ground truth has a value for
//!   it (partial labelling tolerance).
//! - FAILED records are excluded from every accuracy denominator; they are
//!   surfaced through `failed_count` / `failed_rate` instead.
//! - A field the model did not predict scores as wrong and lands in the
//!   `(missing)` confusion bucket.
//! - Values are compared case-insensitively after trimming; confusion
//!   matrices use the uppercased form.
//! - Macro averages run over the distinct ground-truth values of the field;
//!   `(missing)` is never a class of its own.
//! - Every ratio with a zero denominator is reported as 0.0, never NaN.
//!
//! All maps are ordered so that serializing the same run twice produces
//! byte-identical output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::RecordOutcome;
use crate::dataset::{GroundTruthRecord, LabelField};

/// Confusion bucket for fields the model left unpredicted.
pub const MISSING_BUCKET: &str = "(missing)";

/// Precision / recall / F1 for one ground-truth value of a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueMetrics {
    /// Records whose ground truth carries this value.
    pub support: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Scores for one label field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMetrics {
    /// Scored predictions: non-FAILED records whose ground truth has the field.
    pub scored: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub per_value: BTreeMap<String, ValueMetrics>,
    /// `confusion[truth][predicted] = count`.
    pub confusion: BTreeMap<String, BTreeMap<String, usize>>,
}

/// Scores over one record subset (one building, or the whole run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSet {
    pub record_count: usize,
    pub failed_count: usize,
    pub failed_rate: f64,
    pub fields: BTreeMap<LabelField, FieldMetrics>,
}

/// Global and per-building scores for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    pub global: MetricsSet,
    pub by_building: BTreeMap<String, MetricsSet>,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

fn canonical(value: &str) -> String {
    value.trim().to_uppercase()
}

impl FieldMetrics {
    fn compute<'a>(
        field: LabelField,
        pairs: impl Iterator<Item = (&'a GroundTruthRecord, &'a RecordOutcome)>,
    ) -> Self {
        let mut confusion: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        let mut scored = 0usize;
        let mut correct = 0usize;

        for (record, outcome) in pairs {
            let Some(prediction) = outcome.prediction() else {
                continue;
            };
            let Some(truth) = record.labels.get(&field) else {
                continue;
            };
            let truth = canonical(truth);
            let predicted = prediction
                .get(field)
                .map(canonical)
                .unwrap_or_else(|| MISSING_BUCKET.to_string());

            scored += 1;
            if truth == predicted {
                correct += 1;
            }
            *confusion
                .entry(truth)
                .or_default()
                .entry(predicted)
                .or_default() += 1;
        }

        // Column sums over predicted values, for false positives.
        let mut predicted_totals: BTreeMap<&str, usize> = BTreeMap::new();
        for row in confusion.values() {
            for (predicted, count) in row {
                *predicted_totals.entry(predicted).or_default() += count;
            }
        }

        let mut per_value = BTreeMap::new();
        for (truth, row) in &confusion {
            let support: usize = row.values().sum();
            let true_positives = row.get(truth).copied().unwrap_or(0);
            let false_negatives = support - true_positives;
            let false_positives =
                predicted_totals.get(truth.as_str()).copied().unwrap_or(0) - true_positives;
            let precision = ratio(true_positives, true_positives + false_positives);
            let recall = ratio(true_positives, true_positives + false_negatives);
            per_value.insert(
                truth.clone(),
                ValueMetrics {
                    support,
                    true_positives,
                    false_positives,
                    false_negatives,
                    precision,
                    recall,
                    f1: f1(precision, recall),
                },
            );
        }

        let class_count = per_value.len();
        let macro_precision = if class_count == 0 {
            0.0
        } else {
            per_value.values().map(|v| v.precision).sum::<f64>() / class_count as f64
        };
        let macro_recall = if class_count == 0 {
            0.0
        } else {
            per_value.values().map(|v| v.recall).sum::<f64>() / class_count as f64
        };
        let macro_f1 = if class_count == 0 {
            0.0
        } else {
            per_value.values().map(|v| v.f1).sum::<f64>() / class_count as f64
        };

        Self {
            scored,
            correct,
            accuracy: ratio(correct, scored),
            macro_precision,
            macro_recall,
            macro_f1,
            per_value,
            confusion,
        }
    }
}

impl MetricsSet {
    fn compute(
        records: &[GroundTruthRecord],
        outcomes: &[RecordOutcome],
        indices: &[usize],
    ) -> Self {
        let failed_count = indices
            .iter()
            .filter(|&&i| outcomes[i].is_failed())
            .count();

        let mut fields = BTreeMap::new();
        for field in LabelField::ALL {
            // Reports only carry fields the dataset actually labels.
            if !indices.iter().any(|&i| records[i].labels.contains_key(&field)) {
                continue;
            }
            let metrics = FieldMetrics::compute(
                field,
                indices.iter().map(|&i| (&records[i], &outcomes[i])),
            );
            fields.insert(field, metrics);
        }

        Self {
            record_count: indices.len(),
            failed_count,
            failed_rate: ratio(failed_count, indices.len()),
            fields,
        }
    }
}

/// Score a finished run. `outcomes[i]` must be the outcome for `records[i]`.
pub fn compute(records: &[GroundTruthRecord], outcomes: &[RecordOutcome]) -> RunMetrics {
    assert_eq!(records.len(), outcomes.len(), "one outcome per record");

    let all: Vec<usize> = (0..records.len()).collect();
    let mut building_indices: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, record) in records.iter().enumerate() {
        building_indices
            .entry(record.building.clone())
            .or_default()
            .push(i);
    }

    RunMetrics {
        global: MetricsSet::compute(records, outcomes, &all),
        by_building: building_indices
            .into_iter()
            .map(|(building, indices)| {
                (building.clone(), MetricsSet::compute(records, outcomes, &indices))
            })
            .collect(),
    }
}
