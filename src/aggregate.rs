//! Per-Episode Aggregator
//!
//! Reduces repeated observations of each key (an episode, an agent, or a
//! single `all_episodes` bucket) to raw sequences, means, or
//! `(mean, std)` pairs.
//!
//! Failed runs carry no step count of their own. Before reduction they can
//! be penalized against a reference dataset: a failing run is assumed to
//! take 1.5x the reference run's steps, stored both capped at
//! [`MAX_NUM_STEPS`] (`num_steps_fail`) and uncapped (`num_steps_fail2`).

use std::collections::BTreeMap;
use std::fmt::Display;

use crate::episode::{EpisodeId, EpisodeSamples, MetricMap, NUM_STEPS, NUM_STEPS_FAIL, NUM_STEPS_FAIL2};
use crate::stats::{mean, MeanStd};
use crate::{Error, Result};

/// Upper bound on the capped failure-step estimate.
pub const MAX_NUM_STEPS: f64 = 1500.0;

/// Multiplier applied to the reference step count for failed runs.
pub const FAILURE_STEP_FACTOR: f64 = 1.5;

/// Metric name to `(mean, std)`.
pub type Summary = BTreeMap<String, MeanStd>;

/// How observations are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregateMode {
    /// Keep the filtered sequence
    #[default]
    Raw,
    /// Collapse to the mean
    Mean,
    /// Collapse to mean and population std
    MeanStd,
}

impl AggregateMode {
    /// Map `average` / `std` flags to a mode. `std` without `average` is raw.
    #[must_use]
    pub const fn from_flags(average: bool, std: bool) -> Self {
        match (average, std) {
            (false, _) => Self::Raw,
            (true, false) => Self::Mean,
            (true, true) => Self::MeanStd,
        }
    }
}

/// One aggregated metric.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// Finite observations
    Values(Vec<f64>),
    /// Mean of the observations
    Mean(f64),
    /// Mean and population std of the observations
    MeanStd(MeanStd),
}

impl MetricValue {
    /// Central value regardless of mode.
    #[must_use]
    pub fn mean(&self) -> f64 {
        match self {
            Self::Values(values) => mean(values),
            Self::Mean(m) => *m,
            Self::MeanStd(pair) => pair.mean,
        }
    }
}

/// Outcome of [`impute_failures`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Imputation {
    /// Runs whose failure steps were filled in
    pub imputed: usize,
    /// Episodes absent from the reference dataset (left untouched)
    pub missing_reference: Vec<EpisodeId>,
}

/// Fill undefined failure-step bounds from a reference dataset.
///
/// For every run whose `num_steps_fail` is NaN and whose episode exists in
/// `reference`, sets `num_steps_fail = min(1.5 * ref, 1500)` and
/// `num_steps_fail2 = 1.5 * ref`. Successful runs are never touched.
pub fn impute_failures(samples: &mut EpisodeSamples, reference: &BTreeMap<EpisodeId, MetricMap>) -> Imputation {
    let mut outcome = Imputation::default();
    for (episode_id, runs) in samples.iter_mut() {
        let Some(reference_steps) = reference.get(episode_id).and_then(|r| r.get(NUM_STEPS)) else {
            outcome.missing_reference.push(*episode_id);
            continue;
        };
        let penalized = reference_steps * FAILURE_STEP_FACTOR;
        for run in runs.iter_mut() {
            if run.get(NUM_STEPS_FAIL).is_some_and(|v| v.is_nan()) {
                run.insert(NUM_STEPS_FAIL.to_string(), penalized.min(MAX_NUM_STEPS));
                run.insert(NUM_STEPS_FAIL2.to_string(), penalized);
                outcome.imputed += 1;
            }
        }
    }
    outcome
}

/// Reduce one key's observations.
///
/// Metric names are taken from the first observation; later observations
/// lacking a metric simply contribute nothing to it. Non-finite values are
/// dropped before reduction.
///
/// # Errors
///
/// Returns [`Error::EmptyEpisode`] when `observations` is empty
pub fn reduce(
    key: &dyn Display,
    observations: &[MetricMap],
    mode: AggregateMode,
) -> Result<BTreeMap<String, MetricValue>> {
    let first = observations
        .first()
        .ok_or_else(|| Error::EmptyEpisode(key.to_string()))?;

    Ok(first
        .keys()
        .map(|name| {
            let values: Vec<f64> = observations
                .iter()
                .filter_map(|obs| obs.get(name).copied())
                .filter(|v| v.is_finite())
                .collect();
            let value = match mode {
                AggregateMode::Raw => MetricValue::Values(values),
                AggregateMode::Mean => MetricValue::Mean(mean(&values)),
                AggregateMode::MeanStd => MetricValue::MeanStd(MeanStd::of(&values)),
            };
            (name.clone(), value)
        })
        .collect())
}

/// Reduce every key of a collection.
///
/// # Errors
///
/// Returns [`Error::EmptyEpisode`] if any key has no observations
pub fn aggregate<K>(
    samples: &BTreeMap<K, Vec<MetricMap>>,
    mode: AggregateMode,
) -> Result<BTreeMap<K, BTreeMap<String, MetricValue>>>
where
    K: Ord + Clone + Display,
{
    samples
        .iter()
        .map(|(key, observations)| Ok((key.clone(), reduce(key, observations, mode)?)))
        .collect()
}

/// [`aggregate`] in mean mode, flattened to scalars.
///
/// # Errors
///
/// Returns [`Error::EmptyEpisode`] if any key has no observations
pub fn aggregate_mean<K>(samples: &BTreeMap<K, Vec<MetricMap>>) -> Result<BTreeMap<K, MetricMap>>
where
    K: Ord + Clone + Display,
{
    Ok(aggregate(samples, AggregateMode::Mean)?
        .into_iter()
        .map(|(key, metrics)| {
            let means = metrics.into_iter().map(|(name, v)| (name, v.mean())).collect();
            (key, means)
        })
        .collect())
}

/// [`aggregate`] in mean/std mode, flattened to [`Summary`] values.
///
/// # Errors
///
/// Returns [`Error::EmptyEpisode`] if any key has no observations
pub fn aggregate_mean_std<K>(samples: &BTreeMap<K, Vec<MetricMap>>) -> Result<BTreeMap<K, Summary>>
where
    K: Ord + Clone + Display,
{
    Ok(aggregate(samples, AggregateMode::MeanStd)?
        .into_iter()
        .map(|(key, metrics)| {
            let summary = metrics
                .into_iter()
                .filter_map(|(name, v)| match v {
                    MetricValue::MeanStd(pair) => Some((name, pair)),
                    _ => None,
                })
                .collect();
            (key, summary)
        })
        .collect())
}

/// Mean/std over a flat list of observations.
///
/// # Errors
///
/// Returns [`Error::EmptyEpisode`] when `observations` is empty
pub fn summarize(observations: &[MetricMap]) -> Result<Summary> {
    let mut bucket = BTreeMap::new();
    bucket.insert("all_episodes", observations.to_vec());
    Ok(aggregate_mean_std(&bucket)?
        .remove("all_episodes")
        .unwrap_or_default())
}
