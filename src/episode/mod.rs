//! Episode loading
//!
//! ## Data flow
//!
//! ```text
//! result file ──> EpisodeRecord ──> LoadedEpisode (record + path)
//!                                        │
//!                                        ├──> EpisodeSamples (per episode)
//!                                        └──> EpisodeSamples per agent dir
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use zsc_eval::episode::{collect_samples, EpisodeLoader};
//!
//! let loader = EpisodeLoader::new(8)?;
//! let loaded = loader.load_dirs(&[PathBuf::from("runs/solo_eval")])?;
//! let samples = collect_samples(&loaded);
//! println!("{} episodes", samples.len());
//! # Ok::<(), zsc_eval::Error>(())
//! ```

mod loader;
mod record;
mod samples;

pub use loader::{
    agent_tag, list_agent_dirs, list_result_files, load_episode_file, record_from_json,
    EpisodeLoader, LoadedEpisode, ResultFormat, StoredResult, DEFAULT_WORKERS, SOLO_MARKER,
};
pub use record::{
    is_success, EpisodeId, EpisodeRecord, MetricMap, COMPOSITE_SUCCESS, CR, CR_PROP,
    METRICS_OF_INTEREST, NUM_AGENTS_COLLIDE, NUM_STEPS, NUM_STEPS_FAIL, NUM_STEPS_FAIL2,
};
pub use samples::{collect_samples, split_by_agent, EpisodeSamples};
