//! Episode Record - metrics extracted from one result file

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Integer episode identifier shared across runs of the same episode.
pub type EpisodeId = i64;

/// Metric name to value.
pub type MetricMap = BTreeMap<String, f64>;

/// Binary success indicator for the whole task.
pub const COMPOSITE_SUCCESS: &str = "composite_success";
/// Steps taken by the run.
pub const NUM_STEPS: &str = "num_steps";
/// Steps conditioned on failure, capped bound after imputation.
pub const NUM_STEPS_FAIL: &str = "num_steps_fail";
/// Steps conditioned on failure, uncapped bound after imputation.
pub const NUM_STEPS_FAIL2: &str = "num_steps_fail2";
/// Binary agent-agent collision indicator.
pub const CR: &str = "CR";
/// Collision count normalized by step count.
pub const CR_PROP: &str = "CRprop";
/// Raw collision count in a result summary.
pub const NUM_AGENTS_COLLIDE: &str = "num_agents_collide";

/// Metrics copied from a result summary when present.
pub const METRICS_OF_INTEREST: [&str; 5] =
    [COMPOSITE_SUCCESS, NUM_STEPS, NUM_STEPS_FAIL, CR, CR_PROP];

/// Episode Record: the metrics of one run of one episode.
///
/// Built once from a result summary and never mutated afterwards, except
/// for failure-step imputation on the sample collections it is copied into.
///
/// ## Derived metrics
///
/// - `num_steps_fail` / `num_steps_fail2` equal `num_steps` on success and
///   are NaN otherwise, pending imputation against a reference run.
/// - `CR` / `CRprop` are only present when the summary carries a
///   `num_agents_collide` count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    id: EpisodeId,
    metrics: MetricMap,
}

impl EpisodeRecord {
    /// Build a record from a summary lookup.
    ///
    /// Returns `None` when the summary lacks `composite_success` or
    /// `num_steps`, which every derived metric depends on.
    pub fn from_summary<F>(id: EpisodeId, lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let mut metrics: MetricMap = METRICS_OF_INTEREST
            .iter()
            .filter_map(|name| lookup(name).map(|value| ((*name).to_string(), value)))
            .collect();

        let success = *metrics.get(COMPOSITE_SUCCESS)?;
        let num_steps = *metrics.get(NUM_STEPS)?;

        let num_steps_fail = if is_success(success) {
            num_steps
        } else {
            f64::NAN
        };
        metrics.insert(NUM_STEPS_FAIL.to_string(), num_steps_fail);
        metrics.insert(NUM_STEPS_FAIL2.to_string(), num_steps_fail);

        if let Some(collisions) = lookup(NUM_AGENTS_COLLIDE) {
            let collided = if collisions > 0.0 { 1.0 } else { 0.0 };
            metrics.insert(CR.to_string(), collided);
            metrics.insert(CR_PROP.to_string(), collisions / num_steps);
        }

        Some(Self { id, metrics })
    }

    /// Get the episode ID.
    #[must_use]
    pub const fn id(&self) -> EpisodeId {
        self.id
    }

    /// Get the extracted and derived metrics.
    #[must_use]
    pub const fn metrics(&self) -> &MetricMap {
        &self.metrics
    }

    /// Get a single metric value.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Consume the record, keeping its metrics.
    #[must_use]
    pub fn into_metrics(self) -> MetricMap {
        self.metrics
    }
}

/// Whether a (possibly averaged) success value means full success.
#[must_use]
pub fn is_success(value: f64) -> bool {
    (value - 1.0).abs() < f64::EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(pairs: &[(&str, f64)]) -> impl Fn(&str) -> Option<f64> {
        let map: MetricMap = pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect();
        move |name| map.get(name).copied()
    }

    #[test]
    fn test_success_keeps_num_steps() {
        let record =
            EpisodeRecord::from_summary(3, summary(&[("composite_success", 1.0), ("num_steps", 250.0)]))
                .unwrap();
        assert_eq!(record.id(), 3);
        assert_eq!(record.metric(NUM_STEPS_FAIL), Some(250.0));
        assert_eq!(record.metric(NUM_STEPS_FAIL2), Some(250.0));
        assert!(record.metric(CR).is_none());
    }

    #[test]
    fn test_failure_marks_undefined() {
        let record =
            EpisodeRecord::from_summary(4, summary(&[("composite_success", 0.0), ("num_steps", 900.0)]))
                .unwrap();
        assert!(record.metric(NUM_STEPS_FAIL).unwrap().is_nan());
        assert!(record.metric(NUM_STEPS_FAIL2).unwrap().is_nan());
    }

    #[test]
    fn test_collisions_derive_rates() {
        let record = EpisodeRecord::from_summary(
            5,
            summary(&[
                ("composite_success", 1.0),
                ("num_steps", 200.0),
                ("num_agents_collide", 10.0),
            ]),
        )
        .unwrap();
        assert_eq!(record.metric(CR), Some(1.0));
        assert!((record.metric(CR_PROP).unwrap() - 0.05).abs() < f64::EPSILON);

        let clean = EpisodeRecord::from_summary(
            6,
            summary(&[
                ("composite_success", 1.0),
                ("num_steps", 200.0),
                ("num_agents_collide", 0.0),
            ]),
        )
        .unwrap();
        assert_eq!(clean.metric(CR), Some(0.0));
        assert_eq!(clean.metric(CR_PROP), Some(0.0));
    }

    #[test]
    fn test_missing_required_metric_skips() {
        assert!(EpisodeRecord::from_summary(7, summary(&[("num_steps", 10.0)])).is_none());
        assert!(EpisodeRecord::from_summary(7, summary(&[("composite_success", 1.0)])).is_none());
    }

    #[test]
    fn test_ignores_unrelated_metrics() {
        let record = EpisodeRecord::from_summary(
            8,
            summary(&[("composite_success", 1.0), ("num_steps", 10.0), ("reward", 3.0)]),
        )
        .unwrap();
        assert!(record.metric("reward").is_none());
    }
}
