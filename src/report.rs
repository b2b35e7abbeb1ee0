//! Text reports
//!
//! Summaries print as `name: mean ± std` cells, or as LaTeX cells
//! (`$mean_{ \pm std }$`) joined by `&` for pasting into tables.

use crate::aggregate::Summary;
use crate::stats::MeanStd;

/// Format one `(mean, std)` pair.
#[must_use]
pub fn format_pair(pair: MeanStd, latex: bool) -> String {
    if latex {
        format!("${:.2}_{{ \\pm {:.2} }}$", pair.mean, pair.std)
    } else {
        format!("{:.2} \u{00B1} {:.2}  ", pair.mean, pair.std)
    }
}

/// Format a summary as a single report line.
///
/// `metric_names` selects and orders the cells; `None` prints every metric
/// in name order. Names absent from the summary are skipped.
#[must_use]
pub fn format_summary(summary: &Summary, latex: bool, metric_names: Option<&[&str]>) -> String {
    let names: Vec<&str> = match metric_names {
        Some(names) => names.to_vec(),
        None => summary.keys().map(String::as_str).collect(),
    };
    let cells: Vec<String> = names
        .into_iter()
        .filter_map(|name| {
            let pair = *summary.get(name)?;
            let number = format_pair(pair, latex);
            Some(if latex {
                number
            } else {
                format!("{name}: {number}")
            })
        })
        .collect();
    if latex {
        cells.join(" & ")
    } else {
        cells.join(" ")
    }
}

/// Display label of an agent directory.
///
/// `eval_data_` and `.pth` are dropped; checkpoint agents become
/// `Learn-Single_<n>` and planner agents `Plan_<5 - n>`.
#[must_use]
pub fn agent_label(name: &str) -> String {
    let name = name.replace("eval_data_", "").replace(".pth", "");
    if name.contains("ckpt") {
        if let Some(n) = name.rsplit('.').next().and_then(|s| s.parse::<i64>().ok()) {
            return format!("Learn-Single_{n}");
        }
    } else if name.contains("plan") {
        let level = name
            .rsplit('_')
            .next()
            .and_then(|s| s.get(1..))
            .and_then(|s| s.parse::<i64>().ok());
        if let Some(level) = level {
            return format!("Plan_{}", 5 - level);
        }
    }
    name
}

/// Display label of an experiment (training method).
#[must_use]
pub fn experiment_label(name: &str) -> String {
    let name = name.replace("GT_coord", "Learn-Single").replace("Pop-Play", "Learn-Pop");
    if name.contains("Plan") {
        if let Some(digit) = name.chars().last().and_then(|c| c.to_digit(10)) {
            return format!("Plan-Pop_{}", 5 - i64::from(digit));
        }
    }
    name
}
