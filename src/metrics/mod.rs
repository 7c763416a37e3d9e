//! Metrics registry and runner
//!
//! Every metric is a pure function of one canonical record. The registry is
//! an explicit static table built at process start; the runner isolates each
//! computation so one failing metric never aborts a run.

mod activity;
mod community;

use crate::error::{MetricError, MetricsError, Result};
use crate::types::{CanonicalRecord, MetricOutcome, MetricReport};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// A pure scoring function over one canonical record
pub type MetricFn = fn(&CanonicalRecord) -> std::result::Result<Value, MetricError>;

/// Registry of named metric functions.
///
/// Registered once at process start, read-only thereafter; iteration is in
/// name order so runs are deterministic.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    entries: BTreeMap<&'static str, MetricFn>,
}

impl MetricsRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry of built-in health metrics
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let table: &[(&'static str, MetricFn)] = &[
            ("identity", community::identity),
            ("has_security_policy", community::has_security_policy),
            ("has_contributing_policy", community::has_contributing_policy),
            ("is_fundable", community::is_fundable),
            ("feature_request_count", community::feature_request_count),
            (
                "closed_feature_request_count",
                community::closed_feature_request_count,
            ),
            ("dependency_count", community::dependency_count),
            ("license", community::license),
            ("stargazer_count", community::stargazer_count),
            ("fork_count", community::fork_count),
            ("is_archived", community::is_archived),
            ("mean_pull_requests", activity::mean_pull_requests),
            ("median_pull_requests", activity::median_pull_requests),
            ("commit_count", activity::commit_count),
            ("contributor_count", activity::contributor_count),
            ("elephant_factor", activity::elephant_factor),
            ("churn", activity::churn),
            ("release_count", activity::release_count),
            ("release_cadence", activity::release_cadence),
            ("issue_activity", activity::issue_activity),
            ("issue_close_ratio", activity::issue_close_ratio),
        ];
        for (name, compute) in table.iter().copied() {
            // Names in the table are unique by construction.
            registry
                .register(name, compute)
                .expect("built-in metric table contains duplicates");
        }
        registry
    }

    /// Register a metric function under a unique name
    pub fn register(&mut self, name: &'static str, compute: MetricFn) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(MetricsError::DuplicateMetric(name.to_string()));
        }
        let _ = self.entries.insert(name, compute);
        Ok(())
    }

    /// Registered metric names, in iteration order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Number of registered metrics
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every registered metric against one record.
    ///
    /// Failures are captured as markers under the metric's name; the report
    /// always covers every registered metric and this method never fails.
    pub fn run(&self, record: &CanonicalRecord) -> MetricReport {
        let mut report = MetricReport::new();
        for (name, compute) in &self.entries {
            let outcome = match compute(record) {
                Ok(value) => MetricOutcome::Value { value },
                Err(e) => MetricOutcome::Failed {
                    reason: e.to_string(),
                },
            };
            let _ = report.insert((*name).to_string(), outcome);
        }
        report
    }

    /// Run a single registered metric in isolation
    pub fn run_one(&self, name: &str, record: &CanonicalRecord) -> Result<MetricOutcome> {
        let compute = self
            .entries
            .get(name)
            .ok_or_else(|| MetricsError::UnknownMetric(name.to_string()))?;
        Ok(match compute(record) {
            Ok(value) => MetricOutcome::Value { value },
            Err(e) => MetricOutcome::Failed {
                reason: e.to_string(),
            },
        })
    }
}

/// Run the built-in registry against one record
pub fn get_metrics(record: &CanonicalRecord) -> MetricReport {
    MetricsRegistry::builtin().run(record)
}

/// Run one built-in metric against one record
pub fn get_metric(name: &str, record: &CanonicalRecord) -> Result<MetricOutcome> {
    MetricsRegistry::builtin().run_one(name, record)
}

/// All records of a fragment, or a metric failure naming the gap
pub(crate) fn require_fragment<'a>(
    record: &'a CanonicalRecord,
    name: &str,
) -> std::result::Result<&'a [Value], MetricError> {
    record
        .fragment(name)
        .ok_or_else(|| MetricError::missing_fragment(name))
}

/// The single payload of a single-shot fragment, or a metric failure
pub(crate) fn require_single<'a>(
    record: &'a CanonicalRecord,
    name: &str,
) -> std::result::Result<&'a Value, MetricError> {
    record
        .single(name)
        .ok_or_else(|| MetricError::missing_fragment(name))
}

/// Parse a GitHub ISO-8601 timestamp field off a raw record
pub(crate) fn parse_time(
    value: &Value,
    field: &str,
) -> std::result::Result<DateTime<Utc>, MetricError> {
    let text = value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| MetricError::missing_field(field))?;
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MetricError::new(format!("invalid timestamp in '{}': {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn empty_record() -> CanonicalRecord {
        CanonicalRecord::new(BTreeMap::new())
    }

    fn always_fails(_: &CanonicalRecord) -> std::result::Result<Value, MetricError> {
        Err(MetricError::new("intentional failure"))
    }

    fn always_succeeds(_: &CanonicalRecord) -> std::result::Result<Value, MetricError> {
        Ok(json!(42))
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = MetricsRegistry::new();
        registry.register("answer", always_succeeds).unwrap();
        let err = registry.register("answer", always_fails).unwrap_err();
        assert!(matches!(err, MetricsError::DuplicateMetric(_)));
    }

    #[test]
    fn test_failing_metric_is_isolated() {
        let mut registry = MetricsRegistry::new();
        registry.register("bad", always_fails).unwrap();
        registry.register("good", always_succeeds).unwrap();

        let report = registry.run(&empty_record());
        assert_eq!(report.len(), 2);
        assert!(report["bad"].is_failed());
        assert_eq!(report["good"].value(), Some(&json!(42)));
    }

    #[test]
    fn test_run_is_idempotent() {
        let registry = MetricsRegistry::builtin();
        let record = empty_record();
        assert_eq!(registry.run(&record), registry.run(&record));
    }

    #[test]
    fn test_run_covers_every_metric_even_on_empty_record() {
        let registry = MetricsRegistry::builtin();
        let report = registry.run(&empty_record());
        assert_eq!(report.len(), registry.len());
    }

    #[test]
    fn test_run_one_unknown_metric() {
        let registry = MetricsRegistry::builtin();
        let err = registry.run_one("nonexistent", &empty_record()).unwrap_err();
        assert!(matches!(err, MetricsError::UnknownMetric(_)));
    }

    #[test]
    fn test_builtin_registry_is_deterministic() {
        let first: Vec<_> = MetricsRegistry::builtin().names().collect();
        let second: Vec<_> = MetricsRegistry::builtin().names().collect();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
