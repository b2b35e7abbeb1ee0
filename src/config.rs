//! Sweep configuration
//!
//! A sweep is described by a JSON file naming the solo (reference) result
//! directories and, per experiment, its seed groups:
//!
//! ```json
//! {
//!   "solo": ["runs/solo_eval"],
//!   "experiments": {
//!     "GT_coord": ["runs/gt/0", "runs/gt/1"],
//!     "Pop_play": {"seed0": ["runs/pp/0/eval_data_a", "runs/pp/0/eval_data_b"]}
//!   }
//! }
//! ```
//!
//! A list value holds one directory per seed. A mapping value holds, per
//! seed label, the agent directories of that seed. Every other shape is a
//! configuration error, reported before any result file is read.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::episode::{list_agent_dirs, DEFAULT_WORKERS};
use crate::{Error, Result};

/// What to do with an episode present in one dataset but absent from the
/// one it is joined against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingEpisodePolicy {
    /// Log and continue
    #[default]
    Skip,
    /// Fail the sweep
    Strict,
}

/// Result directories of one seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedGroup {
    /// Seed label (the directory path for list-shaped experiments)
    pub label: String,
    /// Directories whose files belong to this seed
    pub dirs: Vec<PathBuf>,
}

/// Seed groups of one experiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentPaths {
    /// One directory per seed
    Seeds(Vec<PathBuf>),
    /// Seed label to agent directories
    Agents(BTreeMap<String, Vec<PathBuf>>),
}

impl ExperimentPaths {
    /// Validate a raw JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the value is neither a list of paths nor
    /// a mapping from seed label to a list of paths
    pub fn from_value(experiment: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(Self::Seeds(path_list(experiment, items)?)),
            Value::Object(map) => {
                let mut seeds = BTreeMap::new();
                for (label, dirs) in map {
                    let Value::Array(items) = dirs else {
                        return Err(shape_error(experiment));
                    };
                    seeds.insert(label.clone(), path_list(experiment, items)?);
                }
                Ok(Self::Agents(seeds))
            }
            _ => Err(shape_error(experiment)),
        }
    }

    /// Seed groups in sweep order.
    #[must_use]
    pub fn groups(&self) -> Vec<SeedGroup> {
        match self {
            Self::Seeds(dirs) => dirs
                .iter()
                .map(|dir| SeedGroup {
                    label: dir.display().to_string(),
                    dirs: vec![dir.clone()],
                })
                .collect(),
            Self::Agents(seeds) => seeds
                .iter()
                .map(|(label, dirs)| SeedGroup {
                    label: label.clone(),
                    dirs: dirs.clone(),
                })
                .collect(),
        }
    }

    /// Replace each seed directory by its agent sub-directories.
    ///
    /// Mapping-shaped experiments are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns error if a seed directory cannot be listed
    pub fn expand_agents(&self, prefix: &str) -> Result<Self> {
        match self {
            Self::Seeds(dirs) => {
                let mut seeds = BTreeMap::new();
                for dir in dirs {
                    seeds.insert(dir.display().to_string(), list_agent_dirs(dir, prefix)?);
                }
                Ok(Self::Agents(seeds))
            }
            Self::Agents(_) => Ok(self.clone()),
        }
    }
}

fn path_list(experiment: &str, items: &[Value]) -> Result<Vec<PathBuf>> {
    items
        .iter()
        .map(|item| item.as_str().map(PathBuf::from).ok_or_else(|| shape_error(experiment)))
        .collect()
}

fn shape_error(experiment: &str) -> Error {
    Error::Config(format!(
        "experiment `{experiment}`: expected a list of result directories or a mapping from seed label to a list of result directories"
    ))
}

/// Heatmap output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapSettings {
    /// SVG file to write
    pub path: PathBuf,
    /// Metric to shade by
    #[serde(default = "default_heatmap_metric")]
    pub metric: String,
}

fn default_heatmap_metric() -> String {
    crate::episode::COMPOSITE_SUCCESS.to_string()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSweepConfig {
    solo: OneOrMany,
    experiments: BTreeMap<String, Value>,
    #[serde(default = "default_output")]
    output: PathBuf,
    #[serde(default = "default_workers")]
    workers: usize,
    #[serde(default)]
    missing_episodes: MissingEpisodePolicy,
    #[serde(default)]
    expand_agents: bool,
    #[serde(default = "default_agent_prefix")]
    agent_dir_prefix: String,
    #[serde(default)]
    latex: bool,
    #[serde(default)]
    heatmap: Option<HeatmapSettings>,
}

fn default_output() -> PathBuf {
    PathBuf::from("aggregated_results.json")
}

const fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_agent_prefix() -> String {
    "eval_data".to_string()
}

/// Validated sweep configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Solo (reference) result directories
    pub solo: Vec<PathBuf>,
    /// Experiment name to seed groups
    pub experiments: BTreeMap<String, ExperimentPaths>,
    /// Summary output file
    pub output: PathBuf,
    /// Decoding workers
    pub workers: usize,
    /// Missing-episode handling
    pub missing_episodes: MissingEpisodePolicy,
    /// Expand list-shaped experiments into agent directories
    pub expand_agents: bool,
    /// Name prefix of agent directories
    pub agent_dir_prefix: String,
    /// Print LaTeX cells instead of plain text
    pub latex: bool,
    /// Optional heatmap
    pub heatmap: Option<HeatmapSettings>,
}

impl SweepConfig {
    /// Build a configuration with defaults for everything but the paths.
    #[must_use]
    pub fn new(solo: Vec<PathBuf>, experiments: BTreeMap<String, ExperimentPaths>) -> Self {
        Self {
            solo,
            experiments,
            output: default_output(),
            workers: DEFAULT_WORKERS,
            missing_episodes: MissingEpisodePolicy::default(),
            expand_agents: false,
            agent_dir_prefix: default_agent_prefix(),
            latex: false,
            heatmap: None,
        }
    }

    /// Parse and validate a JSON sweep description.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is malformed
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: RawSweepConfig =
            serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;

        let solo = match raw.solo {
            OneOrMany::One(path) => vec![path],
            OneOrMany::Many(paths) => paths,
        };
        let experiments: BTreeMap<String, ExperimentPaths> = raw
            .experiments
            .iter()
            .map(|(name, value)| Ok((name.clone(), ExperimentPaths::from_value(name, value)?)))
            .collect::<Result<_>>()?;

        let config = Self {
            solo,
            experiments,
            output: raw.output,
            workers: raw.workers,
            missing_episodes: raw.missing_episodes,
            expand_agents: raw.expand_agents,
            agent_dir_prefix: raw.agent_dir_prefix,
            latex: raw.latex,
            heatmap: raw.heatmap,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON sweep file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is malformed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Check invariants that do not depend on the file system.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on the first violated invariant
    pub fn validate(&self) -> Result<()> {
        if self.solo.is_empty() {
            return Err(Error::Config("`solo` must name at least one directory".to_string()));
        }
        if self.experiments.is_empty() {
            return Err(Error::Config("`experiments` is empty".to_string()));
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        for (name, paths) in &self.experiments {
            if paths.groups().is_empty() {
                return Err(Error::Config(format!("experiment `{name}` has no seed groups")));
            }
        }
        Ok(())
    }

    /// Check that every solo and seed directory exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first missing directory
    pub fn check_dirs(&self) -> Result<()> {
        for dir in &self.solo {
            if !dir.is_dir() {
                return Err(Error::Config(format!(
                    "solo directory {} does not exist",
                    dir.display()
                )));
            }
        }
        for (name, paths) in &self.experiments {
            for group in paths.groups() {
                if let Some(dir) = group.dirs.iter().find(|dir| !dir.is_dir()) {
                    return Err(Error::Config(format!(
                        "experiment `{name}`: directory {} does not exist",
                        dir.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Experiments with `expand_agents` applied.
    ///
    /// # Errors
    ///
    /// Returns error if a seed directory cannot be listed
    pub fn resolved_experiments(&self) -> Result<BTreeMap<String, ExperimentPaths>> {
        if !self.expand_agents {
            return Ok(self.experiments.clone());
        }
        self.experiments
            .iter()
            .map(|(name, paths)| Ok((name.clone(), paths.expand_agents(&self.agent_dir_prefix)?)))
            .collect()
    }
}
