//! Scalar statistics over small in-memory samples
//!
//! Standard deviation is the population form (divide by N).

use serde::{Deserialize, Serialize};

/// A `(mean, std)` pair.
///
/// Serialized as a two-element array so summaries read as `[mean, std]`.
/// JSON has no NaN: undefined entries are written as `null` and read back
/// as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Option<f64>, Option<f64>)", into = "(f64, f64)")]
pub struct MeanStd {
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
}

impl MeanStd {
    /// Create a pair from its parts.
    #[must_use]
    pub const fn new(mean: f64, std: f64) -> Self {
        Self { mean, std }
    }

    /// Compute mean and population std of `values`.
    ///
    /// Both are NaN for an empty slice.
    #[must_use]
    pub fn of(values: &[f64]) -> Self {
        Self {
            mean: mean(values),
            std: std_dev(values),
        }
    }
}

impl From<(Option<f64>, Option<f64>)> for MeanStd {
    fn from((mean, std): (Option<f64>, Option<f64>)) -> Self {
        Self {
            mean: mean.unwrap_or(f64::NAN),
            std: std.unwrap_or(f64::NAN),
        }
    }
}

impl From<MeanStd> for (f64, f64) {
    fn from(pair: MeanStd) -> Self {
        (pair.mean, pair.std)
    }
}

/// Arithmetic mean, NaN when empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation, NaN when empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
