//! Run reports
//!
//! Serializes a finished evaluation into a versioned JSON report and writes
//! it atomically: the report is staged in a temp file next to the target and
//! renamed into place, so a crash mid-write never leaves a truncated report
//! behind. All maps in the report are ordered, which keeps reports for the
//! same inputs diffable line by line (only the timestamp and resource
//! figures vary between runs).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::dataset::Dataset;
use crate::error::ReportError;
use crate::eval::{EvaluationRun, RunMetrics};
use crate::run_stats::RunStats;

/// Bumped whenever the report layout changes incompatibly.
pub const REPORT_FORMAT_VERSION: u32 = 1;

/// Identity of the dataset snapshot a report was computed against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub path: String,
    pub fingerprint: String,
    pub record_count: usize,
    pub building_count: usize,
}

/// One FAILED record, with enough context to find it in the dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureEntry {
    pub building: String,
    pub point_label: String,
    pub error: String,
}

/// The complete run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub format_version: u32,
    pub generated_at: DateTime<Utc>,
    pub adapter: String,
    pub dataset: DatasetInfo,
    pub metrics: RunMetrics,
    pub failures: Vec<FailureEntry>,
    pub stats: RunStats,
}

impl Report {
    /// Assemble a report from a finished run.
    pub fn build(
        run: &EvaluationRun,
        dataset: &Dataset,
        dataset_path: &Path,
        stats: RunStats,
    ) -> Self {
        let failures = dataset
            .records()
            .iter()
            .zip(&run.outcomes)
            .filter_map(|(record, outcome)| match outcome {
                crate::eval::RecordOutcome::Failed { error } => Some(FailureEntry {
                    building: record.building.clone(),
                    point_label: record.point_name.clone(),
                    error: error.clone(),
                }),
                _ => None,
            })
            .collect();

        Self {
            format_version: REPORT_FORMAT_VERSION,
            generated_at: Utc::now(),
            adapter: run.adapter.clone(),
            dataset: DatasetInfo {
                path: dataset_path.display().to_string(),
                fingerprint: dataset.fingerprint().to_string(),
                record_count: dataset.len(),
                building_count: dataset.building_count(),
            },
            metrics: run.metrics.clone(),
            failures,
            stats,
        }
    }

    /// Write the report to `path`, atomically. Either the complete report
    /// lands at `path` or the previous content is untouched.
    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_vec_pretty(self)?;

        let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            std::fs::create_dir_all(parent).map_err(|source| ReportError::Write {
                path: path.display().to_string(),
                source,
            })?;
        }

        // Staging in the target directory keeps the final rename on one
        // filesystem, which is what makes it atomic.
        let mut staged = tempfile::NamedTempFile::new_in(
            parent.unwrap_or_else(|| Path::new(".")),
        )
        .map_err(|source| ReportError::Write {
            path: path.display().to_string(),
            source,
        })?;
        staged.write_all(&json).map_err(|source| ReportError::Write {
            path: path.display().to_string(),
            source,
        })?;
        staged.persist(path).map_err(|err| ReportError::Write {
            path: path.display().to_string(),
            source: err.error,
        })?;
        Ok(())
    }

    /// Read a previously saved report back.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let content = std::fs::read_to_string(path).map_err(|source| ReportError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RuleAdapter;
    use crate::dataset::test_support::record;
    use crate::dataset::LabelField;
    use crate::eval::{run, RunOptions};
    use crate::vocab::Vocab;
    use tokio_util::sync::CancellationToken;

    async fn finished_run() -> (EvaluationRun, Dataset) {
        let dataset = Dataset::from_records(vec![
            record("b1", "AHU1.SAT", &[(LabelField::Equip, "AHU")]),
            record("b2", "VAV2.CMD", &[(LabelField::Equip, "VAV")]),
        ])
        .unwrap();
        let adapter = RuleAdapter::new(Vocab::seeds());
        let run = run(
            &adapter,
            &dataset,
            RunOptions::default(),
            CancellationToken::new(),
        )
        .await;
        (run, dataset)
    }

    fn stats() -> RunStats {
        RunStats {
            elapsed_secs: 1.0,
            throughput_per_sec: 2.0,
            baseline_memory_mb: 10.0,
            peak_memory_mb: 12.0,
        }
    }

    #[tokio::test]
    async fn test_report_save_and_read_back() {
        let (run, dataset) = finished_run().await;
        let report = Report::build(&run, &dataset, Path::new("points.jsonl"), stats());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.save(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["format_version"], 1);
        assert_eq!(value["adapter"], "rule");
        assert_eq!(value["dataset"]["record_count"], 2);
        assert_eq!(value["dataset"]["fingerprint"], dataset.fingerprint());
        assert!(value["metrics"]["global"]["fields"]["equip"]["accuracy"].is_number());
        assert!(value["failures"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_load_round_trips_metric_values() {
        let (run, dataset) = finished_run().await;
        let report = Report::build(&run, &dataset, Path::new("points.jsonl"), stats());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.save(&path).unwrap();
        let loaded = Report::load(&path).unwrap();

        assert_eq!(loaded.format_version, report.format_version);
        assert_eq!(loaded.dataset.fingerprint, report.dataset.fingerprint);
        for (field, metrics) in &report.metrics.global.fields {
            let restored = &loaded.metrics.global.fields[field];
            assert_eq!(restored.accuracy, metrics.accuracy);
            assert_eq!(restored.macro_f1, metrics.macro_f1);
            assert_eq!(restored.confusion, metrics.confusion);
        }
    }

    #[test]
    fn test_load_missing_report_reports_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        match Report::load(&dir.path().join("missing.json")) {
            Err(ReportError::Read { path, .. }) => assert!(path.contains("missing.json")),
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_report_save_creates_parent_dirs() {
        let (run, dataset) = finished_run().await;
        let report = Report::build(&run, &dataset, Path::new("points.jsonl"), stats());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/report.json");
        report.save(&path).unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_failures_listed_with_context() {
        let (mut run, dataset) = finished_run().await;
        run.outcomes[1] = crate::eval::RecordOutcome::Failed {
            error: "backend request failed: boom".to_string(),
        };
        let report = Report::build(&run, &dataset, Path::new("points.jsonl"), stats());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].building, "b2");
        assert_eq!(report.failures[0].point_label, "VAV2.CMD");
    }
}
