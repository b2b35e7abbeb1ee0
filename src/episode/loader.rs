//! Episode Record Loader - decodes result files from disk
//!
//! Two encodings are understood, chosen by file extension:
//!
//! - `.bin`: `bincode` (serde mode, standard config) encoding of
//!   [`StoredResult`]. Only solo-run files (path contains `solo`) are read.
//! - anything else: a JSON document with an `id` and a `summary` object.
//!
//! Files that decode but lack an identifier or the required metrics yield
//! `Ok(None)` and are dropped by the caller. IO and decode failures are
//! errors.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use walkdir::WalkDir;

use super::record::{EpisodeId, EpisodeRecord};
use crate::{Error, Result};

/// Marker a binary result path must contain to be loaded.
pub const SOLO_MARKER: &str = "solo";

/// Default number of decoding workers.
pub const DEFAULT_WORKERS: usize = 24;

/// Result file encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    /// JSON document
    Json,
    /// bincode-encoded [`StoredResult`]
    Binary,
}

impl ResultFormat {
    /// Pick the encoding from the file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("bin") => Self::Binary,
            _ => Self::Json,
        }
    }
}

/// Binary result file payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    /// Episode identifier, integer-like
    pub id: String,
    /// Summary metrics of the run
    pub summary: BTreeMap<String, f64>,
}

impl StoredResult {
    /// Write this result as a binary result file.
    ///
    /// # Errors
    ///
    /// Returns error if encoding or writing fails
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| Error::Other(format!("Failed to encode {}: {e}", path.display())))?;
        fs::write(path, bytes)?;
        Ok(())
    }

    fn read_from(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let (stored, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
            .map_err(|e| Error::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(stored)
    }
}

/// A decoded record together with the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedEpisode {
    /// Source file
    pub path: PathBuf,
    /// Decoded record
    pub record: EpisodeRecord,
}

impl LoadedEpisode {
    /// Agent tag: the name of the directory holding the result file.
    #[must_use]
    pub fn agent(&self) -> Option<&str> {
        agent_tag(&self.path)
    }
}

/// Name of the directory that directly contains `path`.
#[must_use]
pub fn agent_tag(path: &Path) -> Option<&str> {
    path.parent()?.file_name()?.to_str()
}

/// Load one result file.
///
/// # Errors
///
/// Returns error if the file cannot be read or decoded
pub fn load_episode_file(path: &Path) -> Result<Option<EpisodeRecord>> {
    match ResultFormat::from_path(path) {
        ResultFormat::Binary => {
            if !path.to_string_lossy().contains(SOLO_MARKER) {
                debug!(path = %path.display(), "skipping non-solo binary result");
                return Ok(None);
            }
            let stored = StoredResult::read_from(path)?;
            let Ok(id) = stored.id.trim().parse::<EpisodeId>() else {
                debug!(path = %path.display(), id = %stored.id, "unparseable episode id");
                return Ok(None);
            };
            Ok(EpisodeRecord::from_summary(id, |name| {
                stored.summary.get(name).copied()
            }))
        }
        ResultFormat::Json => {
            let text = fs::read_to_string(path)?;
            let document: Value = serde_json::from_str(&text)?;
            Ok(record_from_json(&document))
        }
    }
}

/// Extract a record from a decoded JSON result document.
#[must_use]
pub fn record_from_json(document: &Value) -> Option<EpisodeRecord> {
    let id = document.get("id").and_then(episode_id)?;
    let summary = document.get("summary")?.as_object()?;
    EpisodeRecord::from_summary(id, |name| summary.get(name).and_then(numeric))
}

#[allow(clippy::cast_possible_truncation)]
fn episode_id(value: &Value) -> Option<EpisodeId> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Regular files directly inside `dir`, sorted by name.
///
/// # Errors
///
/// Returns error if the directory cannot be listed
pub fn list_result_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Sub-directories of `dir` whose name starts with `prefix`, sorted by name.
///
/// # Errors
///
/// Returns error if the directory cannot be listed
pub fn list_agent_dirs(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with(prefix) {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

/// Bounded worker pool decoding result files in parallel.
///
/// Decoding is a pure map: each worker reads one file, and results come
/// back in input order so every record stays paired with its path.
#[derive(Debug)]
pub struct EpisodeLoader {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl EpisodeLoader {
    /// Create a loader with `workers` decoding threads.
    ///
    /// # Errors
    ///
    /// Returns error if `workers` is zero or the pool cannot be built
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("zsc-load-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }

    /// Number of decoding threads.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Decode `files`, dropping those that yield no record.
    ///
    /// # Errors
    ///
    /// Returns the first IO or decode error encountered
    pub fn load_files(&self, files: &[PathBuf]) -> Result<Vec<LoadedEpisode>> {
        let decoded: Vec<Option<EpisodeRecord>> = self.pool.install(|| {
            files
                .par_iter()
                .map(|path| load_episode_file(path))
                .collect::<Result<_>>()
        })?;

        Ok(files
            .iter()
            .zip(decoded)
            .filter_map(|(path, record)| {
                record.map(|record| LoadedEpisode {
                    path: path.clone(),
                    record,
                })
            })
            .collect())
    }

    /// List and decode every result file in `dirs`.
    ///
    /// # Errors
    ///
    /// Returns error if a directory cannot be listed or a file decoded
    pub fn load_dirs(&self, dirs: &[PathBuf]) -> Result<Vec<LoadedEpisode>> {
        let mut files = Vec::new();
        for dir in dirs {
            files.extend(list_result_files(dir)?);
        }
        let loaded = self.load_files(&files)?;
        debug!(
            files = files.len(),
            records = loaded.len(),
            "decoded result files"
        );
        Ok(loaded)
    }
}
