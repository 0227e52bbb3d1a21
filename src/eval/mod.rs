//! Evaluation engine
//!
//! Drives one adapter over a loaded dataset with bounded concurrency, a
//! per-call timeout and cooperative cancellation, then scores the results.
//!
//! Invariants:
//! - Exactly one outcome per record, stored at the record's load index, so
//!   two runs over the same inputs produce identical reports regardless of
//!   completion order.
//! - A failing, timed-out or cancelled call never aborts the run; the
//!   record is marked FAILED and the run completes normally.
//! - After cancellation no new calls are issued; in-flight calls are
//!   abandoned and their records marked FAILED as well.

pub mod metrics;

use futures::StreamExt;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::{BuildingContext, ModelAdapter, Prediction};
use crate::dataset::Dataset;
use crate::error::InferenceError;
use crate::tokenize::normalize;

pub use metrics::{FieldMetrics, MetricsSet, RunMetrics, ValueMetrics, MISSING_BUCKET};

/// Outcome for one record: a prediction, or the FAILED sentinel with the
/// error that caused it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    Predicted { prediction: Prediction },
    Failed { error: String },
}

impl RecordOutcome {
    pub fn prediction(&self) -> Option<&Prediction> {
        match self {
            Self::Predicted { prediction } => Some(prediction),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Engine knobs.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Maximum adapter calls in flight at once.
    pub concurrency: usize,
    /// Per-call deadline.
    pub timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A finished evaluation: one outcome per dataset record, plus scores.
#[derive(Debug, Clone)]
pub struct EvaluationRun {
    pub adapter: String,
    pub outcomes: Vec<RecordOutcome>,
    pub metrics: RunMetrics,
    pub duration: Duration,
}

impl EvaluationRun {
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }
}

/// Evaluate `adapter` over every record of `dataset`.
///
/// Always returns a run with `outcomes.len() == dataset.len()`.
pub async fn run(
    adapter: &dyn ModelAdapter,
    dataset: &Dataset,
    options: RunOptions,
    cancel: CancellationToken,
) -> EvaluationRun {
    let concurrency = options.concurrency.max(1);
    let timeout = options.timeout;
    let started = Instant::now();

    info!(
        adapter = adapter.name(),
        records = dataset.len(),
        buildings = dataset.building_count(),
        concurrency,
        "Starting evaluation run"
    );

    let mut slots: Vec<Option<RecordOutcome>> = vec![None; dataset.len()];
    let mut stream = futures::stream::iter(dataset.records().iter().enumerate().map(
        |(index, record)| {
            let cancel = cancel.clone();
            async move {
                // Once cancelled, drained records are failed without
                // touching the adapter.
                if cancel.is_cancelled() {
                    return (index, Err(InferenceError::Cancelled));
                }
                let input = normalize(&record.point_name);
                let ctx = BuildingContext {
                    building: &record.building,
                };
                let result = tokio::select! {
                    _ = cancel.cancelled() => Err(InferenceError::Cancelled),
                    result = tokio::time::timeout(timeout, adapter.predict(&input, ctx)) => {
                        match result {
                            Ok(inner) => inner,
                            Err(_) => Err(InferenceError::Timeout(timeout)),
                        }
                    }
                };
                (index, result)
            }
        },
    ))
    .buffer_unordered(concurrency);

    while let Some((index, result)) = stream.next().await {
        let outcome = match result {
            Ok(prediction) => {
                debug!(index, "Record predicted");
                RecordOutcome::Predicted { prediction }
            }
            Err(error) => {
                warn!(index, %error, "Record failed");
                RecordOutcome::Failed {
                    error: error.to_string(),
                }
            }
        };
        slots[index] = Some(outcome);
    }
    drop(stream);

    let outcomes: Vec<RecordOutcome> = slots
        .into_iter()
        .map(|slot| slot.expect("every record produced an outcome"))
        .collect();

    let metrics = metrics::compute(dataset.records(), &outcomes);
    let duration = started.elapsed();

    info!(
        adapter = adapter.name(),
        failed = metrics.global.failed_count,
        elapsed_secs = duration.as_secs_f64(),
        "Evaluation run finished"
    );

    EvaluationRun {
        adapter: adapter.name().to_string(),
        outcomes,
        metrics,
        duration,
    }
}
