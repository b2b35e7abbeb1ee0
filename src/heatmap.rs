//! Per-agent heatmap
//!
//! Rows are experiments, columns are agents (with [`AVERAGED`] last). Each
//! cell is shaded by the metric mean, white for the table minimum to dark
//! blue for the maximum, and annotated with `mean ± std`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use plotters::prelude::*;

use crate::aggregate::Summary;
use crate::report::{agent_label, experiment_label};
use crate::sweep::AVERAGED;
use crate::{Error, Result};

const CELL_WIDTH: i32 = 170;
const CELL_HEIGHT: i32 = 56;
const ROW_HEADER: i32 = 180;
const COLUMN_HEADER: i32 = 48;
const FONT_SIZE: u32 = 15;

/// Blues ramp end points.
const LIGHT: (u8, u8, u8) = (247, 251, 255);
const DARK: (u8, u8, u8) = (8, 48, 107);

/// Table layout extracted from a per-agent summary.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapTable {
    /// Experiment names, top to bottom
    pub rows: Vec<String>,
    /// Agent names, left to right
    pub columns: Vec<String>,
    /// Cell values, `None` where the agent has no entry for the experiment
    pub cells: Vec<Vec<Option<(f64, f64)>>>,
}

impl HeatmapTable {
    /// Extract `metric` from an experiment → agent → summary table.
    #[must_use]
    pub fn from_summaries(table: &BTreeMap<String, BTreeMap<String, Summary>>, metric: &str) -> Self {
        let agents: BTreeSet<&String> = table
            .values()
            .flat_map(BTreeMap::keys)
            .filter(|agent| agent.as_str() != AVERAGED)
            .collect();
        let mut columns: Vec<String> = agents.into_iter().cloned().collect();
        if table.values().any(|agents| agents.contains_key(AVERAGED)) {
            columns.push(AVERAGED.to_string());
        }
        let rows: Vec<String> = table.keys().cloned().collect();
        let cells = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        let pair = table.get(row)?.get(column)?.get(metric)?;
                        Some((pair.mean, pair.std))
                    })
                    .collect()
            })
            .collect();
        Self {
            rows,
            columns,
            cells,
        }
    }

    /// Finite minimum and maximum cell mean.
    #[must_use]
    pub fn range(&self) -> Option<(f64, f64)> {
        self.cells
            .iter()
            .flatten()
            .filter_map(|cell| cell.map(|(mean, _)| mean))
            .filter(|mean| mean.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

fn shade(t: f64) -> RGBColor {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lerp = |a: u8, b: u8| (f64::from(b) - f64::from(a)).mul_add(t, f64::from(a)).round() as u8;
    RGBColor(lerp(LIGHT.0, DARK.0), lerp(LIGHT.1, DARK.1), lerp(LIGHT.2, DARK.2))
}

fn render_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Render(e.to_string())
}

/// Render `metric` of a per-agent table as an SVG heatmap.
///
/// # Errors
///
/// Returns [`Error::Render`] if the table is empty or drawing fails
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn render_heatmap(
    table: &BTreeMap<String, BTreeMap<String, Summary>>,
    metric: &str,
    path: &Path,
) -> Result<()> {
    let heatmap = HeatmapTable::from_summaries(table, metric);
    if heatmap.rows.is_empty() || heatmap.columns.is_empty() {
        return Err(Error::Render("nothing to plot".to_string()));
    }
    let (lo, hi) = heatmap.range().unwrap_or((0.0, 1.0));
    let span = if hi > lo { hi - lo } else { 1.0 };

    let width = ROW_HEADER + CELL_WIDTH * heatmap.columns.len() as i32;
    let height = COLUMN_HEADER + CELL_HEIGHT * heatmap.rows.len() as i32;
    let root = SVGBackend::new(path, (width as u32, height as u32)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    for (j, column) in heatmap.columns.iter().enumerate() {
        let x = ROW_HEADER + CELL_WIDTH * j as i32;
        root.draw(&Text::new(
            agent_label(column),
            (x + 8, COLUMN_HEADER / 3),
            ("sans-serif", FONT_SIZE).into_font().color(&BLACK),
        ))
        .map_err(render_err)?;
    }

    for (i, (row, cells)) in heatmap.rows.iter().zip(&heatmap.cells).enumerate() {
        let y = COLUMN_HEADER + CELL_HEIGHT * i as i32;
        root.draw(&Text::new(
            experiment_label(row),
            (8, y + CELL_HEIGHT / 3),
            ("sans-serif", FONT_SIZE).into_font().color(&BLACK),
        ))
        .map_err(render_err)?;

        for (j, cell) in cells.iter().enumerate() {
            let x = ROW_HEADER + CELL_WIDTH * j as i32;
            let Some((mean, std)) = cell else {
                continue;
            };
            let t = if mean.is_finite() { ((mean - lo) / span).clamp(0.0, 1.0) } else { 0.0 };
            root.draw(&Rectangle::new(
                [(x, y), (x + CELL_WIDTH, y + CELL_HEIGHT)],
                shade(t).filled(),
            ))
            .map_err(render_err)?;
            let ink = if t > 0.6 { WHITE } else { BLACK };
            root.draw(&Text::new(
                format!("{mean:.2} \u{00B1} {std:.2}"),
                (x + 12, y + CELL_HEIGHT / 3),
                ("sans-serif", FONT_SIZE).into_font().color(&ink),
            ))
            .map_err(render_err)?;
        }
    }

    // column divider before the averaged row
    if heatmap.columns.last().is_some_and(|c| c == AVERAGED) {
        let x = ROW_HEADER + CELL_WIDTH * (heatmap.columns.len() as i32 - 1);
        root.draw(&PathElement::new(
            vec![(x, COLUMN_HEADER), (x, height)],
            WHITE.stroke_width(3),
        ))
        .map_err(render_err)?;
    }

    root.present().map_err(render_err)?;
    Ok(())
}
