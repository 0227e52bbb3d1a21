//! BMS term vocabularies
//!
//! Vocabularies list known uppercase terms for the semantic groups used by
//! the rule-based and n-gram adapters: equipment types (AHU, VAV, FCU),
//! subcomponents / measured quantities (SAT, TEMP, FLOW), point functions
//! (CMD, STATUS, RUN), IO types (AI, AO, DI, DO) and vendor tags.
//!
//! A vocabulary file is JSON with one sorted list per group (the format
//! written by `extract-vocab`). When no file is supplied, the built-in seed
//! vocabulary is used.

pub mod extract;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Equipment-type seeds: prototypical terms trusted without statistics.
pub const SEED_EQUIP: &[&str] = &[
    "AHU", "VAV", "FCU", "CRAC", "MAU", "EF", "SF", "HWP", "PUMP", "CHW", "HHW", "HX", "FAN",
    "FANCOIL",
];

/// Subcomponent / measurement seeds.
pub const SEED_SUBCOMP: &[&str] = &[
    "SAT", "DAT", "RAT", "MAT", "OAT", "TEMP", "FLOW", "POS", "SPEED", "PRESS", "PRESSURE",
    "STATIC",
];

/// Point-function seeds: commands and states.
pub const SEED_POINT_FUNC: &[&str] = &[
    "CMD", "COMD", "STATUS", "START", "STOP", "RUN", "ENABLE", "ALARM", "ALM", "MODE", "PROOF",
    "DAY", "NIGHT",
];

/// IO types are a small, well-defined set.
pub const KNOWN_IO: &[&str] = &["AI", "AO", "DI", "DO", "AV", "BV", "UI", "UO"];

/// Vendor hints.
pub const KNOWN_VENDOR_HINTS: &[&str] = &[
    "JCI", "SIEMENS", "BAC", "BACNET", "HONEYWELL", "TRANE", "N2", "SCHNEIDER",
];

/// Term vocabularies for the rule-based labelling pipeline.
///
/// All terms are stored uppercase; lookups go through [`Vocab::contains`]
/// style accessors that uppercase the probe token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vocab {
    #[serde(rename = "equip_vocab", default)]
    pub equip: BTreeSet<String>,
    #[serde(rename = "subcomp_vocab", default)]
    pub subcomp: BTreeSet<String>,
    #[serde(rename = "point_func_vocab", default)]
    pub point_func: BTreeSet<String>,
    #[serde(rename = "io_type_vocab", default)]
    pub io_type: BTreeSet<String>,
    #[serde(rename = "vendor_vocab", default)]
    pub vendor: BTreeSet<String>,
}

impl Vocab {
    /// The built-in seed vocabulary, used when no vocab file is supplied.
    pub fn seeds() -> Self {
        fn to_set(terms: &[&str]) -> BTreeSet<String> {
            terms.iter().map(|t| t.to_string()).collect()
        }
        Self {
            equip: to_set(SEED_EQUIP),
            subcomp: to_set(SEED_SUBCOMP),
            point_func: to_set(SEED_POINT_FUNC),
            io_type: to_set(KNOWN_IO),
            vendor: to_set(KNOWN_VENDOR_HINTS),
        }
    }

    /// Load vocabularies from a JSON file. Unknown keys (`frequency`,
    /// `stats`) are ignored so `extract-vocab` output loads directly.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vocab file: {}", path.display()))?;
        let vocab: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse vocab file: {}", path.display()))?;
        Ok(vocab)
    }

    /// Load from `path` when given, otherwise fall back to the seeds.
    pub fn load_or_seeds(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::seeds()),
        }
    }

    pub fn is_equip(&self, token: &str) -> bool {
        self.equip.contains(&token.to_uppercase())
    }

    pub fn is_subcomp(&self, token: &str) -> bool {
        self.subcomp.contains(&token.to_uppercase())
    }

    pub fn is_point_func(&self, token: &str) -> bool {
        self.point_func.contains(&token.to_uppercase())
    }

    pub fn is_io_type(&self, token: &str) -> bool {
        self.io_type.contains(&token.to_uppercase())
    }

    pub fn is_vendor(&self, token: &str) -> bool {
        self.vendor.contains(&token.to_uppercase())
    }

    /// Total number of terms across all groups.
    pub fn term_count(&self) -> usize {
        self.equip.len()
            + self.subcomp.len()
            + self.point_func.len()
            + self.io_type.len()
            + self.vendor.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_lookups_are_case_insensitive() {
        let vocab = Vocab::seeds();
        assert!(vocab.is_equip("AHU"));
        assert!(vocab.is_equip("ahu"));
        assert!(vocab.is_io_type("Di"));
        assert!(vocab.is_vendor("Siemens"));
        assert!(!vocab.is_equip("XYZ"));
    }

    #[test]
    fn test_vocab_json_round_trip() {
        let json = r#"{
            "equip_vocab": ["AHU", "VAV"],
            "subcomp_vocab": ["SAT"],
            "point_func_vocab": ["CMD"],
            "io_type_vocab": ["AI"],
            "vendor_vocab": [],
            "frequency": {"AHU": 12},
            "stats": {"num_tokens": 5, "num_buildings": 2}
        }"#;
        let vocab: Vocab = serde_json::from_str(json).unwrap();
        assert_eq!(vocab.equip.len(), 2);
        assert!(vocab.is_subcomp("sat"));
        assert!(vocab.vendor.is_empty());
    }
}
