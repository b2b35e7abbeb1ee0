//! Multi-Checkpoint / Multi-Seed Orchestrator
//!
//! ## Levels
//!
//! ```text
//! solo dirs ──> per-episode means (reference, loaded once)
//!
//! experiment ──< seed group ──< agent dir
//!                    │              └── relative metrics, mean over episodes
//!                    └── relative metrics, mean over episodes (all agents)
//!
//! per (seed × agent) ──> per agent: mean ± std across seeds
//!                    ──> across agents: mean ± std of agent means
//!                    ──> "Averaged": mean ± std of every (seed × agent) value
//! ```
//!
//! Loading is the only parallel phase; everything after it runs on the
//! collected in-memory samples.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate_mean, aggregate_mean_std, impute_failures, summarize, Summary};
use crate::config::{SeedGroup, SweepConfig};
use crate::episode::{
    collect_samples, split_by_agent, EpisodeId, EpisodeLoader, MetricMap, COMPOSITE_SUCCESS, CR,
};
use crate::heatmap::render_heatmap;
use crate::relative::{compute_relative_metrics, RE_MT2};
use crate::report::{format_pair, format_summary};
use crate::stats::MeanStd;
use crate::Result;

/// Row holding the per-experiment average over every (seed × agent) pair.
pub const AVERAGED: &str = "Averaged";

/// Metrics compiled across (seed × agent) pairs, with their report labels.
const COMPILED_METRICS: [(&str, &str); 3] = [
    (COMPOSITE_SUCCESS, "success"),
    (RE_MT2, "efficiency"),
    (CR, "CR"),
];

/// Relative metrics of one seed group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupResult {
    /// Mean over episodes of all agents together, if any episode qualified
    pub overall: Option<MetricMap>,
    /// Mean over episodes per agent directory
    pub per_agent: BTreeMap<String, MetricMap>,
}

/// Everything a sweep produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    /// Experiment to mean ± std across seeds of the all-agent results
    pub overall: BTreeMap<String, Summary>,
    /// Experiment to agent (and [`AVERAGED`]) to mean ± std across seeds
    pub by_agent: BTreeMap<String, BTreeMap<String, Summary>>,
    /// Experiment to mean ± std across agents
    pub across_agents: BTreeMap<String, Summary>,
    /// `<experiment>.<seed index>` to agent to mean over episodes
    pub by_seed: BTreeMap<String, BTreeMap<String, MetricMap>>,
}

impl SweepReport {
    /// Write the `[by_agent, by_seed]` summary as JSON.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &(&self.by_agent, &self.by_seed))?;
        Ok(())
    }
}

/// Read the per-agent table back from a written summary.
///
/// # Errors
///
/// Returns error if the file cannot be read or is not a sweep summary
pub fn read_by_agent(path: &Path) -> Result<BTreeMap<String, BTreeMap<String, Summary>>> {
    let reader = BufReader::new(File::open(path)?);
    let (by_agent, _by_seed): (BTreeMap<String, BTreeMap<String, Summary>>, serde_json::Value) =
        serde_json::from_reader(reader)?;
    Ok(by_agent)
}

/// A configured sweep.
#[derive(Debug)]
pub struct Sweep {
    config: SweepConfig,
    loader: EpisodeLoader,
}

impl Sweep {
    /// Validate `config` and build the decoding pool.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] for an invalid configuration
    pub fn new(config: SweepConfig) -> Result<Self> {
        config.validate()?;
        let loader = EpisodeLoader::new(config.workers)?;
        Ok(Self { config, loader })
    }

    /// The sweep configuration.
    #[must_use]
    pub const fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Load and average the solo reference runs.
    ///
    /// # Errors
    ///
    /// Returns error if a solo file cannot be read
    pub fn load_solo(&self) -> Result<BTreeMap<EpisodeId, MetricMap>> {
        let loaded = self.loader.load_dirs(&self.config.solo)?;
        let solo = aggregate_mean(&collect_samples(&loaded))?;
        info!(episodes = solo.len(), "loaded solo reference");
        Ok(solo)
    }

    /// Relative metrics of one seed group against `solo`.
    ///
    /// Failure steps are imputed from `solo` once, then the imputed samples
    /// are averaged for the whole group and for each agent directory. A
    /// group with no decodable file still goes through the missing-episode
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns error if a file cannot be read, or on a missing episode
    /// under the strict policy
    pub fn evaluate_group(
        &self,
        group: &SeedGroup,
        solo: &BTreeMap<EpisodeId, MetricMap>,
    ) -> Result<GroupResult> {
        let policy = self.config.missing_episodes;
        let loaded = self.loader.load_dirs(&group.dirs)?;
        if loaded.is_empty() {
            warn!(seed = %group.label, "no result files decoded");
        }

        let mut samples = collect_samples(&loaded);
        let imputation = impute_failures(&mut samples, solo);
        for episode_id in &imputation.missing_reference {
            warn!(seed = %group.label, episode_id, "episode not found in solo data");
        }
        debug!(seed = %group.label, imputed = imputation.imputed, "imputed failure steps");

        let overall = compute_relative_metrics(&aggregate_mean(&samples)?, solo, policy)?;

        let mut per_agent = BTreeMap::new();
        for (agent, agent_samples) in split_by_agent(&loaded, &samples) {
            match compute_relative_metrics(&aggregate_mean(&agent_samples)?, solo, policy)? {
                Some(metrics) => {
                    per_agent.insert(agent, metrics);
                }
                None => debug!(seed = %group.label, agent = %agent, "no relative metric for agent"),
            }
        }

        Ok(GroupResult { overall, per_agent })
    }

    /// Run the whole sweep, writing report lines to `out`.
    ///
    /// The JSON summary is written to the configured output path, and the
    /// heatmap rendered when configured.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] before any output if a configured
    /// directory is missing, otherwise error on the first load or write
    /// failure
    pub fn run<W: Write>(&self, out: &mut W) -> Result<SweepReport> {
        let started = Instant::now();
        let latex = self.config.latex;
        self.config.check_dirs()?;
        let experiments = self.config.resolved_experiments()?;
        let solo = self.load_solo()?;
        if solo.is_empty() {
            warn!("solo reference is empty, no relative metric can be computed");
        }

        let mut report = SweepReport::default();
        for (name, paths) in &experiments {
            info!(experiment = %name, "computing");

            let mut seed_results = Vec::new();
            let mut seeds: Vec<(String, BTreeMap<String, MetricMap>)> = Vec::new();
            for group in paths.groups() {
                let result = self.evaluate_group(&group, &solo)?;
                match result.overall {
                    Some(overall) => seed_results.push(overall),
                    None => warn!(experiment = %name, seed = %group.label, "no relative metric for seed"),
                }
                seeds.push((group.label, result.per_agent));
            }
            seeds.sort_by(|a, b| a.0.cmp(&b.0));

            if !seed_results.is_empty() {
                let summary = summarize(&seed_results)?;
                writeln!(out, "{name}: {}", format_summary(&summary, latex, None))?;
                report.overall.insert(name.clone(), summary);
            }

            let mut per_agent_runs: BTreeMap<String, Vec<MetricMap>> = BTreeMap::new();
            let mut compiled: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
            for (index, (_, agents)) in seeds.iter().enumerate() {
                for (agent, metrics) in agents {
                    let single = summarize(std::slice::from_ref(metrics))?;
                    writeln!(out, "{name}.{agent}: {}", format_summary(&single, latex, None))?;
                    for (metric, _) in COMPILED_METRICS {
                        if let Some(value) = metrics.get(metric) {
                            compiled.entry(metric).or_default().push(*value);
                        }
                    }
                    per_agent_runs
                        .entry(agent.clone())
                        .or_default()
                        .push(metrics.clone());
                }
                report
                    .by_seed
                    .insert(format!("{name}.{index}"), agents.clone());
            }

            let mut agents = aggregate_mean_std(&per_agent_runs)?;

            let agent_means: Vec<MetricMap> = agents
                .values()
                .map(|summary| summary.iter().map(|(k, v)| (k.clone(), v.mean)).collect())
                .collect();
            if !agent_means.is_empty() {
                let across = summarize(&agent_means)?;
                writeln!(
                    out,
                    "{name}.across_agents: {}",
                    format_summary(&across, latex, None)
                )?;
                report.across_agents.insert(name.clone(), across);
            }

            let mut averaged = Summary::new();
            for (metric, label) in COMPILED_METRICS {
                if let Some(values) = compiled.get(metric) {
                    let pair = MeanStd::of(values);
                    writeln!(
                        out,
                        "{name}.compiled_results_{label}: {}",
                        format_pair(pair, latex).trim_end()
                    )?;
                    averaged.insert(metric.to_string(), pair);
                }
            }
            if !averaged.is_empty() {
                agents.insert(AVERAGED.to_string(), averaged);
            }
            report.by_agent.insert(name.clone(), agents);
        }

        report.write_json(&self.config.output)?;
        info!(path = %self.config.output.display(), "wrote summary");

        if let Some(heatmap) = &self.config.heatmap {
            render_heatmap(&report.by_agent, &heatmap.metric, &heatmap.path)?;
            info!(path = %heatmap.path.display(), metric = %heatmap.metric, "rendered heatmap");
        }

        info!(
            experiments = experiments.len(),
            elapsed = ?started.elapsed(),
            "sweep finished"
        );
        Ok(report)
    }
}
