//! Tokenization of BMS point names
//!
//! Point names mix separators and letter/digit runs freely
//! (`"AHU-03.SAT_AI"`, `"ZONE.AHU01.RM3218:VLV1 COMD"`). Tokenization splits
//! on the separator characters ` _.-/:` and then on every transition between
//! letters and digits, so `"RM1203E"` becomes `["RM", "1203", "E"]`.
//!
//! `normalize` is the single boundary between the record store and any model
//! adapter: pure, deterministic, no side effects. Swapping models never
//! changes how point names are tokenized.

use once_cell::sync::Lazy;
use regex::Regex;

static DELIMITERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ _\.\-/:]+").unwrap());
static ALPHA_NUM_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+|\d+|[^A-Za-z0-9]").unwrap());

/// Normalized model input for one point name.
///
/// `tokens` preserve original casing (patterns like `RM1203E` are
/// case-sensitive in some vendors' conventions); `upper_tokens` are the
/// uppercase forms used for vocabulary lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInput {
    /// The raw point name exactly as loaded.
    pub raw: String,
    /// Tokens in original casing.
    pub tokens: Vec<String>,
    /// Uppercase tokens, index-aligned with `tokens`.
    pub upper_tokens: Vec<String>,
}

/// Split a single rough token on letter/digit transitions.
///
/// `"RM1203E"` -> `["RM", "1203", "E"]`
pub fn split_alpha_num(token: &str) -> Vec<String> {
    ALPHA_NUM_RUNS
        .find_iter(token)
        .map(|m| m.as_str())
        .filter(|p| !p.trim().is_empty())
        .map(String::from)
        .collect()
}

/// Tokenize a BMS point label into meaningful tokens.
pub fn tokenize(label: &str) -> Vec<String> {
    DELIMITERS
        .split(label)
        .filter(|t| !t.trim().is_empty())
        .flat_map(|t| split_alpha_num(t))
        .collect()
}

/// Build the [`ModelInput`] for a raw point name. Pure and deterministic.
pub fn normalize(point_name: &str) -> ModelInput {
    let tokens = tokenize(point_name);
    let upper_tokens = tokens.iter().map(|t| t.to_uppercase()).collect();
    ModelInput {
        raw: point_name.to_string(),
        tokens,
        upper_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_alpha_num() {
        assert_eq!(split_alpha_num("RM1203E"), vec!["RM", "1203", "E"]);
        assert_eq!(split_alpha_num("AHU"), vec!["AHU"]);
        assert_eq!(split_alpha_num("03"), vec!["03"]);
    }

    #[test]
    fn test_tokenize_separators() {
        assert_eq!(tokenize("AHU-03.SAT_AI"), vec!["AHU", "03", "SAT", "AI"]);
        assert_eq!(
            tokenize("ZONE.AHU01.RM3218:VLV1 COMD"),
            vec!["ZONE", "AHU", "01", "RM", "3218", "VLV", "1", "COMD"]
        );
    }

    #[test]
    fn test_tokenize_slash_paths() {
        assert_eq!(tokenize("CRAC-9/Capacity"), vec!["CRAC", "9", "Capacity"]);
    }

    #[test]
    fn test_tokenize_empty_and_separator_only() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("._-/:").is_empty());
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let a = normalize("BLDG1_FL03_AHU2_SAT_AI");
        let b = normalize("BLDG1_FL03_AHU2_SAT_AI");
        assert_eq!(a, b);
        assert_eq!(a.upper_tokens, vec!["BLDG", "1", "FL", "03", "AHU", "2", "SAT", "AI"]);
    }
}
