//! Configuration for the decision point.
//!
//! Values come from an optional file layered under `PDP`-prefixed
//! environment variables, e.g.
//! `PDP__ENGINE__RESPECT_ABANDONED_EVALUATABLES=true`.

use crate::combining::PolicyCombiningAlgId;
use crate::core::EvaluationContext;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "PDP";
const ENV_SEPARATOR: &str = "__";

const DEFAULT_L1_MAX_ENTRIES: usize = 10_000;
const DEFAULT_L1_TTL_SECS: u64 = 300;

fn default_max_reference_depth() -> usize {
    EvaluationContext::DEFAULT_MAX_REFERENCE_DEPTH
}

fn default_l1_max_entries() -> usize {
    DEFAULT_L1_MAX_ENTRIES
}

fn default_l1_ttl_secs() -> u64 {
    DEFAULT_L1_TTL_SECS
}

fn default_true() -> bool {
    true
}

fn default_service_name() -> String {
    "xacml-pdp".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Evaluation settings
    #[serde(default)]
    pub engine: EngineConfig,
    /// Decision cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging and counters
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Evaluation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Keep folding after deny-overrides or permit-overrides has its answer,
    /// so obligations of later children are collected.
    #[serde(default)]
    pub respect_abandoned_evaluatables: bool,
    /// Algorithm that combines the top-level evaluatables of a request.
    #[serde(default)]
    pub root_combining_algorithm: PolicyCombiningAlgId,
    /// How many references may be followed inside one evaluation.
    #[serde(default = "default_max_reference_depth")]
    pub max_reference_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            respect_abandoned_evaluatables: false,
            root_combining_algorithm: PolicyCombiningAlgId::default(),
            max_reference_depth: default_max_reference_depth(),
        }
    }
}

/// Decision cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether responses are cached. Ignored when an attribute finder is
    /// configured.
    #[serde(default)]
    pub enabled: bool,
    /// Maximum number of cached responses
    #[serde(default = "default_l1_max_entries")]
    pub l1_max_entries: usize,
    /// Lifetime of a cached response in seconds
    #[serde(default = "default_l1_ttl_secs")]
    pub l1_ttl_secs: u64,
}

impl CacheConfig {
    /// Lifetime of a cached response.
    pub fn l1_ttl(&self) -> Duration {
        Duration::from_secs(self.l1_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            l1_max_entries: default_l1_max_entries(),
            l1_ttl_secs: default_l1_ttl_secs(),
        }
    }
}

/// Logging and decision counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Whether decision counters are kept
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Name reported in logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON log lines
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: default_service_name(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load from the environment alone.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load from a YAML, JSON or TOML file, overridden by the environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(Some(path.as_ref()))
    }

    fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let config: Config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cache.enabled && self.cache.l1_max_entries == 0 {
            return Err(Error::config_key(
                "Cache capacity must be positive when the cache is enabled",
                "cache.l1_max_entries",
            ));
        }
        if self.engine.max_reference_depth == 0 {
            return Err(Error::config_key(
                "Reference depth must be positive",
                "engine.max_reference_depth",
            ));
        }
        if self.telemetry.service_name.trim().is_empty() {
            return Err(Error::config_key(
                "Service name cannot be empty",
                "telemetry.service_name",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.engine.respect_abandoned_evaluatables);
        assert_eq!(config.engine.root_combining_algorithm, PolicyCombiningAlgId::DenyOverrides);
        assert_eq!(
            config.engine.max_reference_depth,
            EvaluationContext::DEFAULT_MAX_REFERENCE_DEPTH
        );
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.l1_ttl(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
engine:
  respect_abandoned_evaluatables: true
  root_combining_algorithm: "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:first-applicable"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.engine.respect_abandoned_evaluatables);
        assert_eq!(config.engine.root_combining_algorithm, PolicyCombiningAlgId::FirstApplicable);
        assert_eq!(
            config.engine.max_reference_depth,
            EvaluationContext::DEFAULT_MAX_REFERENCE_DEPTH
        );
        assert_eq!(config.telemetry.service_name, "xacml-pdp");
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        config.cache.enabled = true;
        config.cache.l1_max_entries = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.l1_max_entries = 0;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.engine.max_reference_depth = 0;
        assert!(matches!(config.validate(), Err(Error::Config { .. })));

        let mut config = Config::default();
        config.telemetry.service_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "cache:\n  enabled: true\n  l1_max_entries: 16\n  l1_ttl_secs: 5").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.l1_max_entries, 16);
        assert_eq!(config.cache.l1_ttl(), Duration::from_secs(5));
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "engine:\n  max_reference_depth: 0").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }
}
