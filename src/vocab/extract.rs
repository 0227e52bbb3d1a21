//! Data-driven vocabulary extraction
//!
//! Bootstraps the term vocabularies from a real dataset instead of
//! maintaining them by hand. For every uppercase token the extractor tracks
//! global frequency, building support (how many distinct buildings it
//! appears in) and how often it is followed by a numeric token (`AHU 03`,
//! `VAV 12`). Simple heuristics then sort candidates into the five groups,
//! and score-based trimming keeps the vocabularies compact.
//!
//! No machine learning involved; only token counts and rules a domain
//! expert can read and adjust.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::{KNOWN_IO, KNOWN_VENDOR_HINTS, SEED_EQUIP, SEED_POINT_FUNC, SEED_SUBCOMP, Vocab};
use crate::tokenize::tokenize;

/// Token must appear at least this many times overall.
const MIN_GLOBAL_FREQ: usize = 10;
/// Token must appear in at least this many buildings.
const MIN_BUILDINGS: usize = 2;
/// Times a token must be followed by a numeric token to count as equipment
/// evidence.
const MIN_EQUIP_NUMID_BIGRAM: usize = 5;
/// Keep only the top-K equipment tokens by score.
const MAX_EQUIP: usize = 150;
const MIN_SUBCOMP_SCORE: usize = 15;
const MIN_POINTFUNC_SCORE: usize = 5;

/// Words we don't want to classify as equipment, even if short & uppercase.
const EQUIP_STOPWORDS: &[&str] = &[
    "AIR", "FLOW", "SUP", "SUPPLY", "RET", "RETURN", "ZONE", "HOT", "COLD", "HEAT", "COOL",
    "TEMP", "MODE", "FILTER", "ALARM", "ALM", "RUN", "START", "STOP", "DAY", "NIGHT",
];

const MEASUREMENT_KEYWORDS: &[&str] = &[
    "TEMP", "FLOW", "PRESS", "HUM", "SPEED", "POS", "LEVEL", "STATIC",
];

const FUNC_KEYWORDS: &[&str] = &[
    "CMD", "COMD", "STAT", "STATUS", "START", "STOP", "ENABLE", "ENBL", "ALARM", "ALM", "MODE",
    "PROOF", "RUN",
];

/// Per-token statistics collected during the counting pass.
#[derive(Debug, Clone, Copy, Default)]
struct TokenStats {
    freq: usize,
    buildings: usize,
    numid_bigrams: usize,
}

fn score_equip(s: &TokenStats) -> usize {
    s.freq + 2 * s.buildings + 3 * s.numid_bigrams
}

fn score_subcomp(s: &TokenStats) -> usize {
    s.freq + 2 * s.buildings
}

fn score_pointfunc(s: &TokenStats) -> usize {
    s.freq + s.buildings
}

/// Extraction result: the trimmed vocabularies plus the raw frequency table
/// and basic stats for inspection. Serializes to the vocab file format that
/// [`Vocab::load`] reads back.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedVocab {
    pub frequency: BTreeMap<String, usize>,
    pub equip_vocab: BTreeSet<String>,
    pub subcomp_vocab: BTreeSet<String>,
    pub point_func_vocab: BTreeSet<String>,
    pub io_type_vocab: BTreeSet<String>,
    pub vendor_vocab: BTreeSet<String>,
    pub stats: ExtractStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractStats {
    pub num_tokens: usize,
    pub num_buildings: usize,
}

impl ExtractedVocab {
    /// Convert into a [`Vocab`] usable by the adapters.
    pub fn into_vocab(self) -> Vocab {
        Vocab {
            equip: self.equip_vocab,
            subcomp: self.subcomp_vocab,
            point_func: self.point_func_vocab,
            io_type: self.io_type_vocab,
            vendor: self.vendor_vocab,
        }
    }
}

fn is_io_type(tok: &str) -> bool {
    KNOWN_IO.contains(&tok)
}

/// Known vendor hints plus a light `*NET` heuristic (BACNET-like).
fn is_vendor(tok: &str) -> bool {
    KNOWN_VENDOR_HINTS.contains(&tok) || (tok.ends_with("NET") && tok.len() <= 8)
}

fn passes_global_thresholds(stats: &TokenStats) -> bool {
    stats.freq >= MIN_GLOBAL_FREQ && stats.buildings >= MIN_BUILDINGS
}

fn likely_equip(tok: &str, stats: &TokenStats) -> bool {
    if SEED_EQUIP.contains(&tok) && stats.freq > 0 {
        return true;
    }
    if !passes_global_thresholds(stats) {
        return false;
    }
    // Shape: short uppercase alphabetic tokens.
    if !tok.chars().all(|c| c.is_ascii_uppercase()) {
        return false;
    }
    if !(2..=6).contains(&tok.len()) {
        return false;
    }
    if EQUIP_STOPWORDS.contains(&tok) {
        return false;
    }
    // Strong evidence: often followed by a numeric token (AHU 01, VAV 12).
    if stats.numid_bigrams >= MIN_EQUIP_NUMID_BIGRAM {
        return true;
    }
    // Fallback: the global thresholds already require wide building support
    // and medium frequency.
    true
}

fn likely_subcomponent(tok: &str, stats: &TokenStats) -> bool {
    if SEED_SUBCOMP.contains(&tok) && stats.freq > 0 {
        return true;
    }
    if !passes_global_thresholds(stats) {
        return false;
    }
    if MEASUREMENT_KEYWORDS.iter().any(|k| tok.contains(k)) {
        return true;
    }
    // SAT/DAT/RAT-shaped abbreviations. Digits are allowed as long as every
    // letter is uppercase and there is at least one.
    tok.len() <= 4
        && tok.ends_with('T')
        && tok.chars().any(|c| c.is_ascii_uppercase())
        && !tok.chars().any(|c| c.is_ascii_lowercase())
}

fn likely_point_func(tok: &str, stats: &TokenStats) -> bool {
    if SEED_POINT_FUNC.contains(&tok) && stats.freq > 0 {
        return true;
    }
    if !passes_global_thresholds(stats) {
        return false;
    }
    if FUNC_KEYWORDS.iter().any(|k| tok == *k || tok.starts_with(k)) {
        return true;
    }
    matches!(tok, "DAY" | "NIGHT")
}

/// Extract vocabularies from `(building_id, point_label)` pairs.
pub fn extract_vocab<'a, I>(points: I) -> ExtractedVocab
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut freq: BTreeMap<String, usize> = BTreeMap::new();
    let mut token_buildings: HashMap<String, HashSet<String>> = HashMap::new();
    let mut numid_bigrams: HashMap<String, usize> = HashMap::new();
    let mut buildings: HashSet<String> = HashSet::new();

    for (building, label) in points {
        let tokens = tokenize(label);
        if tokens.is_empty() {
            continue;
        }
        buildings.insert(building.to_string());

        let upper: Vec<String> = tokens.iter().map(|t| t.to_uppercase()).collect();
        for t in &upper {
            *freq.entry(t.clone()).or_insert(0) += 1;
        }
        for t in upper.iter().collect::<HashSet<_>>() {
            token_buildings
                .entry(t.clone())
                .or_default()
                .insert(building.to_string());
        }
        for window in upper.windows(2) {
            if window[1].chars().all(|c| c.is_ascii_digit()) {
                *numid_bigrams.entry(window[0].clone()).or_insert(0) += 1;
            }
        }
    }

    let stats_for = |tok: &str| TokenStats {
        freq: freq.get(tok).copied().unwrap_or(0),
        buildings: token_buildings.get(tok).map_or(0, HashSet::len),
        numid_bigrams: numid_bigrams.get(tok).copied().unwrap_or(0),
    };

    let mut io_vocab = BTreeSet::new();
    let mut vendor_vocab = BTreeSet::new();
    let mut equip_candidates: Vec<(String, TokenStats)> = Vec::new();
    let mut subcomp_candidates: Vec<(String, TokenStats)> = Vec::new();
    let mut pointfunc_candidates: Vec<(String, TokenStats)> = Vec::new();

    // Classification order matters: IO first (small, strict set), then
    // vendor, then function/subcomponent/equipment.
    for tok in freq.keys() {
        let stats = stats_for(tok);
        if is_io_type(tok) {
            io_vocab.insert(tok.clone());
        } else if is_vendor(tok) {
            vendor_vocab.insert(tok.clone());
        } else if likely_point_func(tok, &stats) {
            pointfunc_candidates.push((tok.clone(), stats));
        } else if likely_subcomponent(tok, &stats) {
            subcomp_candidates.push((tok.clone(), stats));
        } else if likely_equip(tok, &stats) {
            equip_candidates.push((tok.clone(), stats));
        }
    }

    // Equipment: keep only the top-K by score to improve precision.
    equip_candidates.sort_by(|a, b| score_equip(&b.1).cmp(&score_equip(&a.1)).then(a.0.cmp(&b.0)));
    let equip_vocab: BTreeSet<String> = equip_candidates
        .into_iter()
        .take(MAX_EQUIP)
        .map(|(t, _)| t)
        .collect();

    let subcomp_vocab: BTreeSet<String> = subcomp_candidates
        .into_iter()
        .filter(|(_, s)| score_subcomp(s) >= MIN_SUBCOMP_SCORE)
        .map(|(t, _)| t)
        .collect();

    let point_func_vocab: BTreeSet<String> = pointfunc_candidates
        .into_iter()
        .filter(|(_, s)| score_pointfunc(s) >= MIN_POINTFUNC_SCORE)
        .map(|(t, _)| t)
        .collect();

    ExtractedVocab {
        stats: ExtractStats {
            num_tokens: freq.len(),
            num_buildings: buildings.len(),
        },
        frequency: freq,
        equip_vocab,
        subcomp_vocab,
        point_func_vocab,
        io_type_vocab: io_vocab,
        vendor_vocab,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_io_type_recognises_known_io() {
        assert!(is_io_type("AI"));
        assert!(is_io_type("DO"));
        assert!(!is_io_type("XYZ"));
    }

    #[test]
    fn test_is_vendor_recognises_known_and_net_suffix() {
        assert!(is_vendor("SIEMENS"));
        assert!(is_vendor("BACNET"));
        assert!(is_vendor("MYNET"));
        assert!(!is_vendor("LONGNETNAME"));
        assert!(!is_vendor("NOTVENDOR"));
    }

    #[test]
    fn test_global_thresholds() {
        assert!(passes_global_thresholds(&TokenStats {
            freq: 15,
            buildings: 2,
            numid_bigrams: 0
        }));
        assert!(!passes_global_thresholds(&TokenStats {
            freq: 5,
            buildings: 2,
            numid_bigrams: 0
        }));
        assert!(!passes_global_thresholds(&TokenStats {
            freq: 15,
            buildings: 1,
            numid_bigrams: 0
        }));
    }

    #[test]
    fn test_score_functions_behave_monotonically() {
        let low = TokenStats { freq: 1, buildings: 1, numid_bigrams: 0 };
        let high = TokenStats { freq: 10, buildings: 3, numid_bigrams: 2 };
        assert!(score_equip(&high) > score_equip(&low));
        assert!(score_subcomp(&high) > score_subcomp(&low));
        assert!(score_pointfunc(&high) > score_pointfunc(&low));
    }

    #[test]
    fn test_subcomp_shape_allows_digit_tokens() {
        let stats = TokenStats { freq: 20, buildings: 3, numid_bigrams: 0 };
        assert!(likely_subcomponent("A1T", &stats));
        assert!(likely_subcomponent("DAT", &stats));
        assert!(!likely_subcomponent("a1t", &stats));
        assert!(!likely_subcomponent("A1TX2", &stats));
    }

    #[test]
    fn test_extract_seeds_always_accepted() {
        // A seed equipment token appears once in one building; the
        // thresholds would reject it, the seed rule keeps it.
        let points = vec![("b1", "AHU-01.SAT")];
        let extracted = extract_vocab(points.iter().map(|(b, l)| (*b, *l)));
        assert!(extracted.equip_vocab.contains("AHU"));
        assert!(extracted.subcomp_vocab.contains("SAT"));
        assert_eq!(extracted.stats.num_buildings, 1);
    }

    #[test]
    fn test_extract_io_and_vendor() {
        let points: Vec<(&str, &str)> =
            vec![("b1", "AHU1.SAT_AI"), ("b2", "SIEMENS.VAV2.CMD")];
        let extracted = extract_vocab(points.iter().map(|(b, l)| (*b, *l)));
        assert!(extracted.io_type_vocab.contains("AI"));
        assert!(extracted.vendor_vocab.contains("SIEMENS"));
        assert!(extracted.point_func_vocab.contains("CMD"));
    }

    #[test]
    fn test_extract_output_loads_as_vocab() {
        let points = vec![("b1", "AHU-01.SAT_AI")];
        let extracted = extract_vocab(points.iter().map(|(b, l)| (*b, *l)));
        let json = serde_json::to_string(&extracted).unwrap();
        let vocab: Vocab = serde_json::from_str(&json).unwrap();
        assert!(vocab.is_equip("AHU"));
        assert!(vocab.is_io_type("AI"));
    }
}
