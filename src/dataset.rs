//! Point record store
//!
//! Loads the canonical benchmark dataset: raw BMS point names paired with
//! ground-truth field labels, grouped per building. The file format is
//! JSONL, one record per line:
//!
//! ```json
//! {"building_id": "ghc_cmu", "point_label": "AHU-03.SAT_AI",
//!  "labels": {"equip": "AHU", "equip_id": "03", "subcomp": "SAT", "io_type": "AI"}}
//! ```
//!
//! Labels may be partial; a field absent from a record is simply not scored
//! for that record. The store is read-only after load, and record order
//! (load order) is preserved for reproducibility.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use crate::error::DatasetError;

/// One semantic field a point name is labelled against.
///
/// The set mirrors the structured interpretation of a point name: where it
/// is (building, floor, zone), what equipment it belongs to, what it
/// measures or controls, and how it is wired.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LabelField {
    Bldg,
    Floor,
    Zone,
    Equip,
    EquipId,
    Subcomp,
    PointFunc,
    IoType,
    Vendor,
}

impl LabelField {
    /// All fields, in scoring order.
    pub const ALL: [LabelField; 9] = [
        Self::Bldg,
        Self::Floor,
        Self::Zone,
        Self::Equip,
        Self::EquipId,
        Self::Subcomp,
        Self::PointFunc,
        Self::IoType,
        Self::Vendor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bldg => "bldg",
            Self::Floor => "floor",
            Self::Zone => "zone",
            Self::Equip => "equip",
            Self::EquipId => "equip_id",
            Self::Subcomp => "subcomp",
            Self::PointFunc => "point_func",
            Self::IoType => "io_type",
            Self::Vendor => "vendor",
        }
    }
}

impl fmt::Display for LabelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One labelled point name. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthRecord {
    /// Building the point belongs to.
    #[serde(rename = "building_id")]
    pub building: String,
    /// The raw point name as emitted by the BMS.
    #[serde(rename = "point_label")]
    pub point_name: String,
    /// Ground-truth field values. Partial labelling is allowed.
    #[serde(default)]
    pub labels: BTreeMap<LabelField, String>,
}

/// The loaded dataset snapshot: all records in load order, plus per-building
/// index. Read-only for the remainder of the process.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<GroundTruthRecord>,
    /// Building name -> indices into `records`, in load order.
    by_building: BTreeMap<String, Vec<usize>>,
    /// SHA-256 over the raw record lines, identifying this snapshot.
    fingerprint: String,
}

impl Dataset {
    /// Load and validate a JSONL dataset file.
    ///
    /// Fails on unreadable files, malformed lines, empty point labels, and
    /// duplicate point names within a building. Blank lines are skipped.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: GroundTruthRecord =
                serde_json::from_str(line).map_err(|source| DatasetError::Parse {
                    line: idx + 1,
                    source,
                })?;
            if record.point_name.trim().is_empty() {
                return Err(DatasetError::EmptyPointLabel { line: idx + 1 });
            }
            records.push((idx + 1, record));
        }

        Self::build(records)
    }

    /// Build a dataset from in-memory records (used by tests and
    /// `extract-vocab`). Validation matches [`Dataset::load`].
    pub fn from_records(records: Vec<GroundTruthRecord>) -> Result<Self, DatasetError> {
        Self::build(records.into_iter().enumerate().map(|(i, r)| (i + 1, r)).collect())
    }

    fn build(numbered: Vec<(usize, GroundTruthRecord)>) -> Result<Self, DatasetError> {
        let mut by_building: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut hasher = Sha256::new();
        let mut records = Vec::with_capacity(numbered.len());

        for (line, record) in numbered {
            let key = (record.building.clone(), record.point_name.clone());
            if !seen.insert(key) {
                return Err(DatasetError::DuplicatePointLabel {
                    building: record.building,
                    label: record.point_name,
                    line,
                });
            }
            // Canonical serialization keeps the fingerprint stable across
            // formatting differences in the source file.
            hasher.update(serde_json::to_vec(&record).expect("record serializes"));
            hasher.update([b'\n']);
            by_building
                .entry(record.building.clone())
                .or_default()
                .push(records.len());
            records.push(record);
        }

        Ok(Self {
            records,
            by_building,
            fingerprint: format!("{:x}", hasher.finalize()),
        })
    }

    /// All records, in load order.
    pub fn records(&self) -> &[GroundTruthRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Building names, sorted.
    pub fn buildings(&self) -> impl Iterator<Item = &str> {
        self.by_building.keys().map(String::as_str)
    }

    pub fn building_count(&self) -> usize {
        self.by_building.len()
    }

    /// Records for one building, in load order. Empty for unknown buildings.
    pub fn by_building(&self, building: &str) -> impl Iterator<Item = &GroundTruthRecord> {
        self.by_building
            .get(building)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&i| &self.records[i])
    }

    /// SHA-256 fingerprint of this dataset snapshot.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::record;
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_jsonl() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"building_id": "b1", "point_label": "AHU1.ZN-T", "labels": {{"equip": "AHU", "subcomp": "ZN-T"}}}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"building_id": "b2", "point_label": "VAV2.CMD"}}"#
        )
        .unwrap();

        let dataset = Dataset::load(file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.building_count(), 2);
        let b1: Vec<_> = dataset.by_building("b1").collect();
        assert_eq!(b1.len(), 1);
        assert_eq!(b1[0].point_name, "AHU1.ZN-T");
        assert_eq!(
            b1[0].labels.get(&LabelField::Equip).map(String::as_str),
            Some("AHU")
        );
        // Missing labels object is treated as an empty (unlabelled) record.
        assert!(dataset.by_building("b2").next().unwrap().labels.is_empty());
    }

    #[test]
    fn test_load_rejects_malformed_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();
        match Dataset::load(file.path()) {
            Err(DatasetError::Parse { line: 1, .. }) => {}
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_point_name_within_building_rejected() {
        let records = vec![
            record("b1", "AHU1.SAT", &[]),
            record("b1", "AHU1.SAT", &[]),
        ];
        match Dataset::from_records(records) {
            Err(DatasetError::DuplicatePointLabel { building, label, .. }) => {
                assert_eq!(building, "b1");
                assert_eq!(label, "AHU1.SAT");
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn test_same_point_name_in_different_buildings_ok() {
        let records = vec![
            record("b1", "AHU1.SAT", &[]),
            record("b2", "AHU1.SAT", &[]),
        ];
        assert!(Dataset::from_records(records).is_ok());
    }

    #[test]
    fn test_by_building_partitions_exactly() {
        let records = vec![
            record("b2", "P1", &[]),
            record("b1", "P2", &[]),
            record("b2", "P3", &[]),
        ];
        let dataset = Dataset::from_records(records).unwrap();
        let total: usize = dataset
            .buildings()
            .map(|b| dataset.by_building(b).count())
            .sum();
        assert_eq!(total, dataset.len());
        // Load order preserved within a building.
        let b2: Vec<_> = dataset.by_building("b2").map(|r| r.point_name.as_str()).collect();
        assert_eq!(b2, vec!["P1", "P3"]);
    }

    #[test]
    fn test_fingerprint_identifies_snapshot() {
        let a = Dataset::from_records(vec![record("b1", "P1", &[])]).unwrap();
        let b = Dataset::from_records(vec![record("b1", "P1", &[])]).unwrap();
        let c = Dataset::from_records(vec![record("b1", "P2", &[])]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_label_field_serde_names() {
        assert_eq!(serde_json::to_string(&LabelField::EquipId).unwrap(), r#""equip_id""#);
        assert_eq!(
            serde_json::from_str::<LabelField>(r#""point_func""#).unwrap(),
            LabelField::PointFunc
        );
    }
}
