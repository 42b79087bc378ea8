//! Logging setup and decision counters.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the binary through [`init_logging`].

use crate::config::TelemetryConfig;
use crate::policy::Decision;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &TelemetryConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::config_key(e.to_string(), "telemetry.log_level"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = if config.json_logs {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| Error::internal(format!("Failed to install subscriber: {}", e)))?;

    tracing::debug!(service = %config.service_name, "Logging initialized");
    Ok(())
}

/// Lock-free decision counters.
#[derive(Debug)]
pub struct Telemetry {
    config: TelemetryConfig,
    permit: AtomicU64,
    deny: AtomicU64,
    not_applicable: AtomicU64,
    indeterminate: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    errors: AtomicU64,
    total_evaluation_time_us: AtomicU64,
}

impl Telemetry {
    /// Create counters for the given configuration.
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            config: config.clone(),
            permit: AtomicU64::new(0),
            deny: AtomicU64::new(0),
            not_applicable: AtomicU64::new(0),
            indeterminate: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            total_evaluation_time_us: AtomicU64::new(0),
        }
    }

    /// Record a finished evaluation, whether computed or served from the
    /// cache.
    pub fn record_evaluation(&self, decision: Decision, duration_ms: f64) {
        let counter = match decision {
            Decision::Permit => &self.permit,
            Decision::Deny => &self.deny,
            Decision::NotApplicable => &self.not_applicable,
            Decision::Indeterminate => &self.indeterminate,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let duration_us = (duration_ms * 1000.0) as u64;
        self.total_evaluation_time_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    /// Record a decision cache lookup.
    pub fn record_cache_lookup(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a failed operation.
    pub fn record_error(&self, category: &str) {
        tracing::debug!(category, "Error recorded");
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the counters.
    pub fn metrics(&self) -> TelemetryMetrics {
        let permit = self.permit.load(Ordering::Relaxed);
        let deny = self.deny.load(Ordering::Relaxed);
        let not_applicable = self.not_applicable.load(Ordering::Relaxed);
        let indeterminate = self.indeterminate.load(Ordering::Relaxed);
        let total_evaluations = permit + deny + not_applicable + indeterminate;

        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let cache_total = cache_hits + cache_misses;
        let cache_hit_rate = if cache_total > 0 {
            (cache_hits as f64 / cache_total as f64) * 100.0
        } else {
            0.0
        };

        let total_time_us = self.total_evaluation_time_us.load(Ordering::Relaxed);
        let avg_evaluation_time_ms = if total_evaluations > 0 {
            (total_time_us as f64 / total_evaluations as f64) / 1000.0
        } else {
            0.0
        };

        TelemetryMetrics {
            total_evaluations,
            permit,
            deny,
            not_applicable,
            indeterminate,
            cache_hits,
            cache_misses,
            cache_hit_rate,
            avg_evaluation_time_ms,
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    /// Whether counters are being kept.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// The configured service name.
    pub fn service_name(&self) -> &str {
        &self.config.service_name
    }
}

/// Counter snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryMetrics {
    /// Total number of evaluations
    pub total_evaluations: u64,
    /// Permit decisions
    pub permit: u64,
    /// Deny decisions
    pub deny: u64,
    /// NotApplicable decisions
    pub not_applicable: u64,
    /// Indeterminate decisions
    pub indeterminate: u64,
    /// Responses served from the cache
    pub cache_hits: u64,
    /// Cache lookups that found nothing
    pub cache_misses: u64,
    /// Cache hit rate percentage
    pub cache_hit_rate: f64,
    /// Average evaluation time in milliseconds
    pub avg_evaluation_time_ms: f64,
    /// Failed policy loads and unloads
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_creation() {
        let telemetry = Telemetry::new(&TelemetryConfig::default());
        assert!(telemetry.is_enabled());
        assert_eq!(telemetry.service_name(), "xacml-pdp");
        assert_eq!(telemetry.metrics().total_evaluations, 0);
    }

    #[test]
    fn test_record_evaluation() {
        let telemetry = Telemetry::new(&TelemetryConfig::default());

        telemetry.record_evaluation(Decision::Permit, 5.0);
        telemetry.record_evaluation(Decision::Deny, 3.0);
        telemetry.record_evaluation(Decision::Permit, 2.0);
        telemetry.record_evaluation(Decision::Indeterminate, 2.0);
        telemetry.record_cache_lookup(true);
        telemetry.record_cache_lookup(false);
        telemetry.record_cache_lookup(false);
        telemetry.record_cache_lookup(false);
        telemetry.record_error("io");

        let metrics = telemetry.metrics();
        assert_eq!(metrics.total_evaluations, 4);
        assert_eq!(metrics.permit, 2);
        assert_eq!(metrics.deny, 1);
        assert_eq!(metrics.not_applicable, 0);
        assert_eq!(metrics.indeterminate, 1);
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.cache_misses, 3);
        assert_eq!(metrics.cache_hit_rate, 25.0);
        assert_eq!(metrics.avg_evaluation_time_ms, 3.0);
        assert_eq!(metrics.errors, 1);
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let config = TelemetryConfig {
            log_level: "xacml_pdp=notalevel".to_string(),
            ..Default::default()
        };
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(init_logging(&config).is_err());
        }
    }
}
