//! Configuration for the point-name benchmark
//!
//! Defines the bench.toml schema. Every value here can also be set on the
//! command line; CLI flags win over the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::adapters::AdapterKind;

/// Adapter section of bench.toml.
#[derive(Debug, Clone, Deserialize)]
pub struct AdapterConfig {
    /// Which adapter to run.
    #[serde(default = "default_kind")]
    pub kind: AdapterKind,

    /// Endpoint URL, required for the `http` adapter.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-call deadline in seconds.
    #[serde(default = "default_call_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            endpoint: None,
            timeout_secs: default_call_timeout_secs(),
        }
    }
}

/// Run section of bench.toml.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Maximum adapter calls in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

/// Benchmark configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub adapter: AdapterConfig,

    #[serde(default)]
    pub run: RunConfig,
}

impl BenchConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        Ok(config)
    }

    /// Load from the default location (./bench.toml) or return defaults.
    pub fn load_default() -> Result<Self> {
        let local_path = Path::new("bench.toml");
        if local_path.exists() {
            return Self::load(local_path);
        }
        Ok(Self::default())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter.timeout_secs)
    }
}

fn default_kind() -> AdapterKind {
    AdapterKind::Rule
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_concurrency() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BenchConfig::default();
        assert_eq!(config.adapter.kind, AdapterKind::Rule);
        assert_eq!(config.run.concurrency, 8);
        assert_eq!(config.call_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_full_toml() {
        let toml_str = r#"
[adapter]
kind = "http"
endpoint = "http://localhost:9000/predict"
timeout_secs = 10

[run]
concurrency = 16
"#;
        let config: BenchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.adapter.kind, AdapterKind::Http);
        assert_eq!(
            config.adapter.endpoint.as_deref(),
            Some("http://localhost:9000/predict")
        );
        assert_eq!(config.run.concurrency, 16);
        assert_eq!(config.call_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: BenchConfig = toml::from_str("[adapter]\nkind = \"ngram\"\n").unwrap();
        assert_eq!(config.adapter.kind, AdapterKind::Ngram);
        assert_eq!(config.run.concurrency, 8);
    }
}
