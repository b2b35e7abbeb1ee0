//! Episode Sample Collection - repeated runs grouped by episode

use std::collections::BTreeMap;

use super::loader::LoadedEpisode;
use super::record::{EpisodeId, MetricMap};

/// Episode ID to the metrics of every run of that episode, in load order.
pub type EpisodeSamples = BTreeMap<EpisodeId, Vec<MetricMap>>;

/// Group loaded records by episode.
#[must_use]
pub fn collect_samples<'a, I>(loaded: I) -> EpisodeSamples
where
    I: IntoIterator<Item = &'a LoadedEpisode>,
{
    let mut samples = EpisodeSamples::new();
    for episode in loaded {
        samples
            .entry(episode.record.id())
            .or_default()
            .push(episode.record.metrics().clone());
    }
    samples
}

/// Split grouped samples by agent tag, then by episode.
///
/// `samples` must have been collected from `loaded` (runs of an episode in
/// load order), so the k-th run of an episode pairs with the k-th loaded
/// record of that episode. Records whose path has no parent directory are
/// left out.
#[must_use]
pub fn split_by_agent(
    loaded: &[LoadedEpisode],
    samples: &EpisodeSamples,
) -> BTreeMap<String, EpisodeSamples> {
    let mut cursor: BTreeMap<EpisodeId, usize> = BTreeMap::new();
    let mut by_agent: BTreeMap<String, EpisodeSamples> = BTreeMap::new();
    for episode in loaded {
        let id = episode.record.id();
        let slot = cursor.entry(id).or_default();
        let run = samples.get(&id).and_then(|runs| runs.get(*slot));
        *slot += 1;
        if let (Some(agent), Some(run)) = (episode.agent(), run) {
            by_agent
                .entry(agent.to_string())
                .or_default()
                .entry(id)
                .or_default()
                .push(run.clone());
        }
    }
    by_agent
}
