//! Relative Metric Calculator
//!
//! Scores a baseline episode against the same episode run solo. Scores are
//! only defined when the solo run succeeded; otherwise the episode has no
//! relative metric and is left out of every average.
//!
//! ```text
//! efficiency = solo.num_steps / baseline.num_steps
//! REMT       = solo.num_steps / baseline.num_steps_fail  * 100   (capped bound)
//! REMT2      = solo.num_steps / baseline.num_steps_fail2 * 100   (uncapped bound, exposed as RE_MT2)
//! ```

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::aggregate::aggregate_mean;
use crate::config::MissingEpisodePolicy;
use crate::episode::{
    is_success, EpisodeId, MetricMap, COMPOSITE_SUCCESS, CR, CR_PROP, NUM_STEPS, NUM_STEPS_FAIL,
    NUM_STEPS_FAIL2,
};
use crate::{Error, Result};

/// Relative efficiency against the uncapped failure bound.
pub const RE_MT2: &str = "RE_MT2";

/// Every intermediate quantity of one relative comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeBreakdown {
    /// `solo.num_steps / baseline.num_steps`
    pub efficiency: f64,
    /// `success * efficiency * 100`
    pub re: f64,
    /// Efficiency against the capped failure bound, in percent
    pub remt: f64,
    /// Efficiency against the uncapped failure bound, in percent
    pub remt2: f64,
    /// `efficiency * 100` when the baseline fully succeeded
    pub res: Option<f64>,
}

impl RelativeBreakdown {
    /// Compute the breakdown, or `None` when the solo run did not succeed.
    #[must_use]
    pub fn compute(baseline: &MetricMap, solo: &MetricMap) -> Option<Self> {
        if !solo.get(COMPOSITE_SUCCESS).copied().is_some_and(is_success) {
            return None;
        }
        let solo_steps = metric(solo, NUM_STEPS);
        let success = metric(baseline, COMPOSITE_SUCCESS);
        let efficiency = solo_steps / metric(baseline, NUM_STEPS);

        Some(Self {
            efficiency,
            re: success * efficiency * 100.0,
            remt: solo_steps / metric(baseline, NUM_STEPS_FAIL) * 100.0,
            remt2: solo_steps / metric(baseline, NUM_STEPS_FAIL2) * 100.0,
            res: is_success(success).then_some(efficiency * 100.0),
        })
    }

    /// Whether the two failure bounds are ordered as expected.
    ///
    /// `num_steps_fail <= num_steps_fail2` implies `remt >= remt2`. NaN on
    /// either side counts as consistent.
    #[must_use]
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn bounds_consistent(&self) -> bool {
        !(self.remt2 > self.remt)
    }
}

/// Relative metrics of one episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeMetrics {
    /// Baseline success, in percent
    pub composite_success: f64,
    /// Efficiency against the uncapped failure bound, in percent
    pub re_mt2: f64,
    /// Baseline collision indicator, when the baseline reports collisions
    pub cr: Option<f64>,
    /// Baseline collision proportion, when the baseline reports collisions
    pub cr_prop: Option<f64>,
}

impl RelativeMetrics {
    /// Flatten to a metric map (`CR` / `CRprop` only when known).
    #[must_use]
    pub fn to_metric_map(&self) -> MetricMap {
        let mut map = MetricMap::new();
        map.insert(COMPOSITE_SUCCESS.to_string(), self.composite_success);
        map.insert(RE_MT2.to_string(), self.re_mt2);
        if let Some(cr) = self.cr {
            map.insert(CR.to_string(), cr);
        }
        if let Some(cr_prop) = self.cr_prop {
            map.insert(CR_PROP.to_string(), cr_prop);
        }
        map
    }
}

/// Relative metrics of one episode, `None` when the solo run failed.
///
/// An inconsistent pair of failure bounds is logged, never dropped.
#[must_use]
pub fn relative_metric(baseline: &MetricMap, solo: &MetricMap) -> Option<RelativeMetrics> {
    let breakdown = RelativeBreakdown::compute(baseline, solo)?;
    if !breakdown.bounds_consistent() {
        warn!(
            remt = breakdown.remt,
            remt2 = breakdown.remt2,
            efficiency = breakdown.efficiency,
            num_steps_fail = metric(baseline, NUM_STEPS_FAIL),
            num_steps_fail2 = metric(baseline, NUM_STEPS_FAIL2),
            composite_success = metric(baseline, COMPOSITE_SUCCESS),
            "uncapped failure bound below capped bound"
        );
    }
    Some(RelativeMetrics {
        composite_success: metric(baseline, COMPOSITE_SUCCESS) * 100.0,
        re_mt2: breakdown.remt2,
        cr: baseline.get(CR).copied(),
        cr_prop: baseline.get(CR_PROP).copied(),
    })
}

/// Per-episode relative metrics of a baseline against solo runs.
///
/// Iterates solo episodes; episodes absent from the baseline follow
/// `policy`, episodes whose solo run failed are skipped.
///
/// # Errors
///
/// Returns [`Error::MissingEpisode`] under the strict policy
pub fn relative_per_episode(
    baseline: &BTreeMap<EpisodeId, MetricMap>,
    solo: &BTreeMap<EpisodeId, MetricMap>,
    policy: MissingEpisodePolicy,
) -> Result<BTreeMap<EpisodeId, RelativeMetrics>> {
    let mut per_episode = BTreeMap::new();
    for (episode_id, solo_metrics) in solo {
        let Some(baseline_metrics) = baseline.get(episode_id) else {
            match policy {
                MissingEpisodePolicy::Skip => {
                    debug!(episode_id, "episode missing from baseline, skipping");
                    continue;
                }
                MissingEpisodePolicy::Strict => {
                    return Err(Error::MissingEpisode {
                        episode_id: *episode_id,
                        dataset: "baseline".to_string(),
                    });
                }
            }
        };
        match relative_metric(baseline_metrics, solo_metrics) {
            Some(relative) => {
                per_episode.insert(*episode_id, relative);
            }
            None => debug!(episode_id, "solo run failed, no relative metric"),
        }
    }
    Ok(per_episode)
}

/// Relative metrics averaged over episodes.
///
/// Returns `None` when no episode has a relative metric.
///
/// # Errors
///
/// Returns [`Error::MissingEpisode`] under the strict policy
pub fn compute_relative_metrics(
    baseline: &BTreeMap<EpisodeId, MetricMap>,
    solo: &BTreeMap<EpisodeId, MetricMap>,
    policy: MissingEpisodePolicy,
) -> Result<Option<MetricMap>> {
    let per_episode = relative_per_episode(baseline, solo, policy)?;
    if per_episode.is_empty() {
        debug!(
            baseline_episodes = baseline.len(),
            "no episode with a relative metric"
        );
        return Ok(None);
    }
    let mut bucket: BTreeMap<&str, Vec<MetricMap>> = BTreeMap::new();
    bucket.insert(
        "all_episodes",
        per_episode.values().map(RelativeMetrics::to_metric_map).collect(),
    );
    Ok(aggregate_mean(&bucket)?.remove("all_episodes"))
}

fn metric(map: &MetricMap, name: &str) -> f64 {
    map.get(name).copied().unwrap_or(f64::NAN)
}
