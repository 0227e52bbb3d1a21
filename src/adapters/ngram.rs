//! Character n-gram similarity baseline
//!
//! Matches tokens against vocabulary terms by cosine similarity of hashed
//! character-trigram vectors, so near-miss spellings (TMP vs TEMP, STAT vs
//! STATUS) still resolve to a field. Entirely deterministic: fixed hash
//! function, fixed dimensionality, ties broken by vocabulary order.

use async_trait::async_trait;
use std::collections::BTreeSet;

use super::traits::{BuildingContext, ModelAdapter, Prediction};
use crate::dataset::LabelField;
use crate::error::InferenceError;
use crate::tokenize::ModelInput;
use crate::vocab::Vocab;

const VECTOR_DIM: usize = 512;

/// Minimum cosine similarity for a token to count as a vocabulary match.
const MATCH_THRESHOLD: f32 = 0.5;

/// FNV-1a, the usual cheap stable hash for feature bucketing.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Hashed character-trigram vector for one term. Terms are padded with `^`
/// and `$` so prefixes and suffixes get their own trigrams.
fn trigram_vector(term: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; VECTOR_DIM];
    let padded: Vec<char> = std::iter::once('^')
        .chain(term.to_uppercase().chars())
        .chain(std::iter::once('$'))
        .collect();
    if padded.len() < 3 {
        return vector;
    }
    for window in padded.windows(3) {
        let trigram: String = window.iter().collect();
        let bucket = (fnv1a(trigram.as_bytes()) % VECTOR_DIM as u64) as usize;
        vector[bucket] += 1.0;
    }
    vector
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// A vocabulary group pre-vectorized for matching.
struct TermIndex {
    terms: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl TermIndex {
    fn new(terms: &BTreeSet<String>) -> Self {
        let terms: Vec<String> = terms.iter().cloned().collect();
        let vectors = terms.iter().map(|t| trigram_vector(t)).collect();
        Self { terms, vectors }
    }

    /// Best-matching term for a token, when similarity clears the threshold.
    /// Vocabulary order breaks ties, which keeps matches deterministic.
    fn best_match(&self, token_vector: &[f32]) -> Option<(&str, f32)> {
        let mut best: Option<(&str, f32)> = None;
        for (term, vector) in self.terms.iter().zip(&self.vectors) {
            let similarity = cosine_similarity(token_vector, vector);
            if similarity >= MATCH_THRESHOLD
                && best.map_or(true, |(_, s)| similarity > s)
            {
                best = Some((term, similarity));
            }
        }
        best
    }
}

/// Fuzzy vocabulary-matching predictor.
pub struct NgramAdapter {
    equip: TermIndex,
    subcomp: TermIndex,
    point_func: TermIndex,
    io_type: TermIndex,
    vendor: TermIndex,
}

impl NgramAdapter {
    pub fn new(vocab: &Vocab) -> Self {
        Self {
            equip: TermIndex::new(&vocab.equip),
            subcomp: TermIndex::new(&vocab.subcomp),
            point_func: TermIndex::new(&vocab.point_func),
            io_type: TermIndex::new(&vocab.io_type),
            vendor: TermIndex::new(&vocab.vendor),
        }
    }

    fn predict_sync(&self, input: &ModelInput) -> Prediction {
        let mut equip: Option<(String, f32)> = None;
        let mut vendor: Option<(String, f32)> = None;
        let mut subcomp: Option<(String, f32)> = None;
        let mut point_func: Option<(String, f32)> = None;
        let mut io_type: Option<(String, f32)> = None;

        for token in &input.upper_tokens {
            // Numeric tokens (equipment IDs, room numbers) carry no lexical
            // signal for trigram matching.
            if token.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let vector = trigram_vector(token);

            // Vendor and IO matches take the token outright; the remaining
            // groups compete on similarity.
            if let Some((term, score)) = self.vendor.best_match(&vector) {
                if vendor.is_none() {
                    vendor = Some((term.to_string(), score));
                }
                continue;
            }
            if let Some((term, score)) = self.io_type.best_match(&vector) {
                // Later IO tokens win, matching the usual suffix position.
                io_type = Some((term.to_string(), score));
                continue;
            }

            let groups = [
                (0usize, self.equip.best_match(&vector)),
                (1, self.subcomp.best_match(&vector)),
                (2, self.point_func.best_match(&vector)),
            ];
            let best_for_token = groups
                .into_iter()
                .filter_map(|(group, m)| m.map(|(term, score)| (group, term, score)))
                .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));
            if let Some((group, term, score)) = best_for_token {
                match group {
                    // First equipment token wins; last subcomponent and
                    // point-function tokens win, matching suffix position.
                    0 => {
                        if equip.is_none() {
                            equip = Some((term.to_string(), score));
                        }
                    }
                    1 => subcomp = Some((term.to_string(), score)),
                    _ => point_func = Some((term.to_string(), score)),
                }
            }
        }

        let matches: Vec<&(String, f32)> = [&equip, &subcomp, &point_func, &io_type, &vendor]
            .into_iter()
            .flatten()
            .collect();
        let confidence = if matches.is_empty() {
            0.0
        } else {
            matches.iter().map(|(_, s)| s).sum::<f32>() / matches.len() as f32
        };

        Prediction::from_fields([
            (LabelField::Equip, equip.map(|(t, _)| t)),
            (LabelField::Subcomp, subcomp.map(|(t, _)| t)),
            (LabelField::PointFunc, point_func.map(|(t, _)| t)),
            (LabelField::IoType, io_type.map(|(t, _)| t)),
            (LabelField::Vendor, vendor.map(|(t, _)| t)),
        ])
        .with_confidence(confidence)
    }
}

#[async_trait]
impl ModelAdapter for NgramAdapter {
    fn name(&self) -> &str {
        "ngram"
    }

    async fn predict(
        &self,
        input: &ModelInput,
        _ctx: BuildingContext<'_>,
    ) -> Result<Prediction, InferenceError> {
        Ok(self.predict_sync(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::normalize;

    #[test]
    fn test_trigram_vector_identical_terms_match_exactly() {
        let a = trigram_vector("TEMP");
        let b = trigram_vector("temp");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let zero = vec![0.0; VECTOR_DIM];
        let v = trigram_vector("TEMP");
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
    }

    #[test]
    fn test_exact_vocabulary_token_matches() {
        let adapter = NgramAdapter::new(&Vocab::seeds());
        let prediction = adapter.predict_sync(&normalize("AHU-03.SAT_AI"));
        assert_eq!(prediction.get(LabelField::Equip), Some("AHU"));
        assert_eq!(prediction.get(LabelField::Subcomp), Some("SAT"));
        assert_eq!(prediction.get(LabelField::IoType), Some("AI"));
        assert!(prediction.confidence.unwrap() > 0.9);
    }

    #[test]
    fn test_near_miss_spelling_matches_fuzzily() {
        let adapter = NgramAdapter::new(&Vocab::seeds());
        // PRESSURE is seeded; PRESSUR shares most trigrams with it.
        let prediction = adapter.predict_sync(&normalize("AHU1.PRESSUR"));
        assert_eq!(prediction.get(LabelField::Subcomp), Some("PRESSURE"));
    }

    #[test]
    fn test_unmatched_tokens_yield_empty_prediction() {
        let adapter = NgramAdapter::new(&Vocab::seeds());
        let prediction = adapter.predict_sync(&normalize("XQZWV.JJJJ"));
        assert!(prediction.labels.is_empty());
        assert_eq!(prediction.confidence, Some(0.0));
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let adapter = NgramAdapter::new(&Vocab::seeds());
        let input = normalize("SIEMENS.AHU01.SAT_TEMP CMD AI");
        assert_eq!(adapter.predict_sync(&input), adapter.predict_sync(&input));
    }
}
