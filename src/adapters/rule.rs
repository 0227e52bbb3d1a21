//! Rule-based baseline adapter
//!
//! Weak rule-based labelling of BMS point names: each token is assigned a
//! semantic category via vocabulary lookups and regex patterns, the category
//! sequence is converted to BIO tags, and a simple structured interpretation
//! aggregates token categories into field predictions (first equipment token
//! wins, zone tokens are joined, last subcomponent wins, and so on).
//!
//! No machine learning involved; the pipeline is deterministic and cheap,
//! which makes it both a baseline model and a debugging tool (`label`
//! subcommand).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use super::traits::{BuildingContext, ModelAdapter, Prediction};
use crate::dataset::LabelField;
use crate::error::InferenceError;
use crate::tokenize::ModelInput;
use crate::vocab::Vocab;

static FLOOR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // F3, FL03, FL12
        Regex::new(r"(?i)^FL?\d+$").unwrap(),
        Regex::new(r"(?i)^Floor$").unwrap(),
    ]
});

static ROOM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // RM148A, RM1202E
        Regex::new(r"(?i)^RM\d+[A-Z]?$").unwrap(),
        // 2130, 1309, 7019E
        Regex::new(r"(?i)^\d{3,4}[A-Z]?$").unwrap(),
        // 2SE21 style
        Regex::new(r"(?i)^\d[A-Z]{1,3}\d{1,3}$").unwrap(),
    ]
});

static EQUIP_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // 01, 2, 8
        Regex::new(r"^\d+$").unwrap(),
        // A10, 2SE21
        Regex::new(r"^[A-Z]?\d{2,3}[A-Z]?$").unwrap(),
    ]
});

static BUILDING_HINT_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| vec![Regex::new(r"(?i)^BLDG\d+$").unwrap()]);

/// Semantic category assigned to a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenCategory {
    Bldg,
    Floor,
    Zone,
    Equip,
    EquipId,
    Subcomp,
    PointFunc,
    IoType,
    VendorTag,
    Misc,
}

impl TokenCategory {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bldg => "BLDG",
            Self::Floor => "FLOOR",
            Self::Zone => "ZONE",
            Self::Equip => "EQUIP",
            Self::EquipId => "EQUIP_ID",
            Self::Subcomp => "SUBCOMP",
            Self::PointFunc => "POINT_FUNC",
            Self::IoType => "IO_TYPE",
            Self::VendorTag => "VENDOR_TAG",
            Self::Misc => "MISC",
        }
    }
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Assign a category to one token. Vocabulary lookups take precedence over
/// the shape patterns; anything unmatched is MISC.
pub fn label_token(token: &str, vocab: &Vocab) -> TokenCategory {
    if vocab.is_vendor(token) {
        return TokenCategory::VendorTag;
    }
    if vocab.is_io_type(token) {
        return TokenCategory::IoType;
    }
    if vocab.is_equip(token) {
        return TokenCategory::Equip;
    }
    if vocab.is_subcomp(token) {
        return TokenCategory::Subcomp;
    }
    if vocab.is_point_func(token) {
        return TokenCategory::PointFunc;
    }
    if FLOOR_PATTERNS.iter().any(|p| p.is_match(token)) {
        return TokenCategory::Floor;
    }
    if ROOM_PATTERNS.iter().any(|p| p.is_match(token)) {
        return TokenCategory::Zone;
    }
    if EQUIP_ID_PATTERNS.iter().any(|p| p.is_match(token)) {
        return TokenCategory::EquipId;
    }
    if BUILDING_HINT_PATTERNS.iter().any(|p| p.is_match(token)) {
        return TokenCategory::Bldg;
    }
    TokenCategory::Misc
}

/// Label every token in sequence.
pub fn label_tokens(tokens: &[String], vocab: &Vocab) -> Vec<TokenCategory> {
    tokens.iter().map(|t| label_token(t, vocab)).collect()
}

/// Convert a category sequence to BIO tags.
///
/// MISC tokens become `O`; the first token of a run of the same category is
/// `B-CATEGORY`, subsequent tokens of the run are `I-CATEGORY`.
pub fn categories_to_bio(categories: &[TokenCategory]) -> Vec<String> {
    let mut bio = Vec::with_capacity(categories.len());
    let mut prev: Option<TokenCategory> = None;
    for &cat in categories {
        if cat == TokenCategory::Misc {
            bio.push("O".to_string());
            prev = None;
            continue;
        }
        if prev == Some(cat) {
            bio.push(format!("I-{}", cat.name()));
        } else {
            bio.push(format!("B-{}", cat.name()));
        }
        prev = Some(cat);
    }
    bio
}

/// Aggregate token categories into field predictions.
///
/// Heuristics: first building/floor/equipment/equipment-ID token wins, all
/// zone tokens are joined with spaces, the last subcomponent / point
/// function / IO type wins, any vendor token wins.
pub fn build_structured(tokens: &[String], categories: &[TokenCategory]) -> Prediction {
    let mut bldg = None;
    let mut floor = None;
    let mut zone_tokens: Vec<&str> = Vec::new();
    let mut equip = None;
    let mut equip_id = None;
    let mut subcomp = None;
    let mut point_func = None;
    let mut io_type = None;
    let mut vendor = None;

    for (token, category) in tokens.iter().zip(categories) {
        match category {
            TokenCategory::Bldg => {
                if bldg.is_none() {
                    bldg = Some(token.clone());
                }
            }
            TokenCategory::Floor => {
                if floor.is_none() {
                    floor = Some(token.clone());
                }
            }
            TokenCategory::Zone => zone_tokens.push(token),
            TokenCategory::Equip => {
                if equip.is_none() {
                    equip = Some(token.clone());
                }
            }
            TokenCategory::EquipId => {
                if equip_id.is_none() {
                    equip_id = Some(token.clone());
                }
            }
            TokenCategory::Subcomp => subcomp = Some(token.clone()),
            TokenCategory::PointFunc => point_func = Some(token.clone()),
            TokenCategory::IoType => io_type = Some(token.clone()),
            TokenCategory::VendorTag => vendor = Some(token.clone()),
            TokenCategory::Misc => {}
        }
    }

    let zone = if zone_tokens.is_empty() {
        None
    } else {
        Some(zone_tokens.join(" "))
    };

    Prediction::from_fields([
        (LabelField::Bldg, bldg),
        (LabelField::Floor, floor),
        (LabelField::Zone, zone),
        (LabelField::Equip, equip),
        (LabelField::EquipId, equip_id),
        (LabelField::Subcomp, subcomp),
        (LabelField::PointFunc, point_func),
        (LabelField::IoType, io_type),
        (LabelField::Vendor, vendor),
    ])
}

/// Full annotation of one point name, for inspection output.
#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub point_label: String,
    pub tokens: Vec<String>,
    pub token_labels: Vec<TokenCategory>,
    pub bio_tags: Vec<String>,
    pub structured: Prediction,
}

/// Rule-based baseline predictor.
pub struct RuleAdapter {
    vocab: Vocab,
}

impl RuleAdapter {
    pub fn new(vocab: Vocab) -> Self {
        Self { vocab }
    }

    /// Annotate one point name with tokens, categories, BIO tags and the
    /// structured interpretation.
    pub fn annotate(&self, input: &ModelInput) -> Annotation {
        let categories = label_tokens(&input.tokens, &self.vocab);
        let bio_tags = categories_to_bio(&categories);
        let structured = build_structured(&input.tokens, &categories);
        Annotation {
            point_label: input.raw.clone(),
            tokens: input.tokens.clone(),
            token_labels: categories,
            bio_tags,
            structured,
        }
    }
}

#[async_trait]
impl ModelAdapter for RuleAdapter {
    fn name(&self) -> &str {
        "rule"
    }

    async fn predict(
        &self,
        input: &ModelInput,
        _ctx: BuildingContext<'_>,
    ) -> Result<Prediction, InferenceError> {
        Ok(self.annotate(input).structured)
    }
}
