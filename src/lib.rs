//! # zsc-eval: Zero-Shot Coordination Evaluation Aggregator
//!
//! Reads per-episode evaluation results of multi-agent rearrangement runs,
//! averages repeated runs of each episode, and scores every
//! experiment/seed/agent against a solo (single-agent) reference run.
//!
//! ## Pipeline
//!
//! - **Load**: decode result files in parallel (bounded worker pool)
//! - **Impute**: penalize failed runs at 1.5x the solo step count
//! - **Aggregate**: per-episode means, then mean ± std across seeds/agents
//! - **Relate**: success, relative efficiency (`RE_MT2`) and collision rates
//! - **Report**: text lines, a JSON summary, an optional SVG heatmap
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use zsc_eval::config::SweepConfig;
//! use zsc_eval::sweep::Sweep;
//!
//! let config = SweepConfig::from_file("sweep.json")?;
//! let sweep = Sweep::new(config)?;
//! let report = sweep.run(&mut std::io::stdout().lock())?;
//! println!("{} experiments", report.by_agent.len());
//! # Ok::<(), zsc_eval::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod aggregate;
pub mod config;
pub mod episode;
pub mod error;
pub mod heatmap;
pub mod relative;
pub mod report;
pub mod stats;
pub mod sweep;

pub use error::{Error, Result};
