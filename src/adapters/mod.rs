//! Candidate model adapters
//!
//! Every predictor evaluated by the harness implements [`ModelAdapter`].
//! Two built-in baselines (rule-based and character n-gram) run in-process;
//! the `http` adapter drives any external model behind a JSON endpoint.

pub mod http;
pub mod ngram;
pub mod rule;
pub mod traits;

use anyhow::{bail, Result};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::vocab::Vocab;

pub use http::HttpAdapter;
pub use ngram::NgramAdapter;
pub use rule::{Annotation, RuleAdapter, TokenCategory};
pub use traits::{BuildingContext, ModelAdapter, Prediction};

/// Which adapter to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// Vocabulary and regex rules, no statistics.
    Rule,
    /// Character-trigram similarity against the vocabulary.
    Ngram,
    /// External model behind an HTTP endpoint.
    Http,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule => write!(f, "rule"),
            Self::Ngram => write!(f, "ngram"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Construct the requested adapter. The `http` kind requires an endpoint;
/// a missing endpoint is a configuration error, reported before any record
/// is processed.
pub fn build_adapter(
    kind: AdapterKind,
    vocab: &Vocab,
    endpoint: Option<&str>,
    timeout: Duration,
) -> Result<Box<dyn ModelAdapter>> {
    match kind {
        AdapterKind::Rule => Ok(Box::new(RuleAdapter::new(vocab.clone()))),
        AdapterKind::Ngram => Ok(Box::new(NgramAdapter::new(vocab))),
        AdapterKind::Http => {
            let Some(endpoint) = endpoint else {
                bail!("adapter 'http' requires --endpoint (or adapter.endpoint in the config)");
            };
            let adapter = HttpAdapter::new("http", endpoint, timeout)?;
            Ok(Box::new(adapter))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_adapter_rule_and_ngram() {
        let vocab = Vocab::seeds();
        let timeout = Duration::from_secs(5);
        assert_eq!(
            build_adapter(AdapterKind::Rule, &vocab, None, timeout)
                .unwrap()
                .name(),
            "rule"
        );
        assert_eq!(
            build_adapter(AdapterKind::Ngram, &vocab, None, timeout)
                .unwrap()
                .name(),
            "ngram"
        );
    }

    #[test]
    fn test_build_adapter_http_requires_endpoint() {
        let vocab = Vocab::seeds();
        assert!(build_adapter(AdapterKind::Http, &vocab, None, Duration::from_secs(5)).is_err());
        assert!(build_adapter(
            AdapterKind::Http,
            &vocab,
            Some("http://localhost:9000/predict"),
            Duration::from_secs(5)
        )
        .is_ok());
    }
}
