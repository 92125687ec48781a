// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The grid and panel drivers.

A grid request lays out a row-major sample lattice over rectangular bounds
and evaluates the propagation engine at every cell; a panel is the same
evaluator run over a polygon's bounding box with a point-in-polygon mask
and a sample cap. Rows are independent and evaluated in parallel; between
rows the driver polls the staleness callback so a superseded request stops
early.
 */

use log::debug;
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_RECEIVER_Z, LEVEL_FLOOR_DB, NUM_BANDS},
    geom::{point_in_polygon, Point2, Point3},
    paths::SceneGeometry,
    physics::{overall_level, Weighting},
    scene::{Panel, PropagationConfig, Source},
    spectrum::compute_point,
};

/// Rectangular evaluation bounds \[m\].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// A grid compute configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    pub bounds: Bounds,
    /// Cell spacing \[m\].
    pub resolution: f64,
    /// Evaluation height \[m\].
    #[serde(default = "default_elevation")]
    pub elevation: f64,
    /// Octave-band index to map; the weighted overall level when absent.
    #[serde(default)]
    pub target_band: Option<usize>,
    #[serde(default)]
    pub weighting: Weighting,
}

fn default_elevation() -> f64 {
    DEFAULT_RECEIVER_Z
}

/// A computed sound map.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridResult {
    pub bounds: Bounds,
    pub resolution: f64,
    pub elevation: f64,
    pub cols: usize,
    pub rows: usize,
    /// Row-major levels, `values[row * cols + col]` \[dB\].
    pub values: Vec<f64>,
    pub min: f64,
    pub max: f64,
}

/// One evaluated panel sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PanelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(rename = "LAeq")]
    pub laeq: f64,
}

/// Summary statistics over a panel's samples.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub p95: f64,
    pub sample_count: usize,
}

/// The value a grid cell maps to.
fn cell_value(spectrum: &[f64; NUM_BANDS], grid: &GridConfig) -> f64 {
    match grid.target_band {
        Some(band) => spectrum[band.min(NUM_BANDS - 1)],
        None => overall_level(spectrum, grid.weighting),
    }
}

/// Evaluate a grid. Returns `None` when `is_stale` reports the request has
/// been superseded; per-point warnings are appended to `warnings`.
pub fn compute_grid(
    sources: &[&Source],
    geometry: &SceneGeometry,
    config: &PropagationConfig,
    grid: &GridConfig,
    is_stale: &(dyn Fn() -> bool + Sync),
) -> Option<(GridResult, Vec<String>)> {
    let cols = ((grid.bounds.max_x - grid.bounds.min_x) / grid.resolution).ceil() as usize + 1;
    let rows = ((grid.bounds.max_y - grid.bounds.min_y) / grid.resolution).ceil() as usize + 1;
    debug!("Grid compute: {rows} x {cols} cells at {} m", grid.resolution);

    let row_results: Option<Vec<(Vec<f64>, Vec<String>)>> = (0..rows)
        .into_par_iter()
        .map(|row| {
            if is_stale() {
                return None;
            }
            let y = grid.bounds.min_y + row as f64 * grid.resolution;
            let mut warnings = vec![];
            let values = (0..cols)
                .map(|col| {
                    let x = grid.bounds.min_x + col as f64 * grid.resolution;
                    let point = Point3::new(x, y, grid.elevation);
                    let result = compute_point(sources, point, geometry, config);
                    warnings.extend(result.warnings);
                    cell_value(&result.spectrum, grid)
                })
                .collect();
            Some((values, warnings))
        })
        .collect();
    let row_results = row_results?;

    let mut warnings = vec![];
    let mut flat = Vec::with_capacity(rows * cols);
    for (values, row_warnings) in row_results {
        flat.extend(values);
        warnings.extend(row_warnings);
    }
    // The buffer is dense and row-major by construction.
    let array = Array2::from_shape_vec((rows, cols), flat).ok()?;
    let min = array.iter().copied().fold(f64::INFINITY, f64::min);
    let max = array.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some((
        GridResult {
            bounds: grid.bounds,
            resolution: grid.resolution,
            elevation: grid.elevation,
            cols,
            rows,
            values: array.into_raw_vec(),
            min,
            max,
        },
        warnings,
    ))
}

/// Evaluate a panel: its bounding box at the panel resolution, masked to the
/// outline, capped at the panel's point budget by uniform stride.
pub fn compute_panel(
    sources: &[&Source],
    geometry: &SceneGeometry,
    config: &PropagationConfig,
    panel: &Panel,
    is_stale: &(dyn Fn() -> bool + Sync),
) -> Option<(Vec<PanelSample>, PanelStats, Vec<String>)> {
    let min_x = panel.vertices.iter().map(|v| v.x).fold(f64::INFINITY, f64::min);
    let max_x = panel.vertices.iter().map(|v| v.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = panel.vertices.iter().map(|v| v.y).fold(f64::INFINITY, f64::min);
    let max_y = panel.vertices.iter().map(|v| v.y).fold(f64::NEG_INFINITY, f64::max);

    let cols = ((max_x - min_x) / panel.resolution).ceil() as usize + 1;
    let rows = ((max_y - min_y) / panel.resolution).ceil() as usize + 1;

    // Masked lattice points, row-major.
    let mut points: Vec<Point2> = vec![];
    for row in 0..rows {
        let y = min_y + row as f64 * panel.resolution;
        for col in 0..cols {
            let x = min_x + col as f64 * panel.resolution;
            let p = Point2::new(x, y);
            if point_in_polygon(p, &panel.vertices) {
                points.push(p);
            }
        }
    }
    // Enforce the point cap with a uniform stride.
    if panel.point_cap > 0 && points.len() > panel.point_cap {
        let stride = (points.len() + panel.point_cap - 1) / panel.point_cap;
        debug!(
            "Panel {}: {} candidate points capped to stride {stride}",
            panel.id,
            points.len()
        );
        points = points.into_iter().step_by(stride).collect();
    }

    let sample_results: Option<Vec<(PanelSample, Vec<String>)>> = points
        .par_chunks(64)
        .map(|chunk| {
            if is_stale() {
                return None;
            }
            Some(
                chunk
                    .iter()
                    .map(|p| {
                        let point = Point3::new(p.x, p.y, panel.elevation);
                        let result = compute_point(sources, point, geometry, config);
                        let sample = PanelSample {
                            x: p.x,
                            y: p.y,
                            z: panel.elevation,
                            laeq: overall_level(&result.spectrum, Weighting::A),
                        };
                        (sample, result.warnings)
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect::<Option<Vec<_>>>()
        .map(|chunks| chunks.into_iter().flatten().collect());
    let sample_results = sample_results?;

    let mut warnings = vec![];
    let mut samples = Vec::with_capacity(sample_results.len());
    for (sample, sample_warnings) in sample_results {
        samples.push(sample);
        warnings.extend(sample_warnings);
    }

    let stats = panel_stats(&samples);
    Some((samples, stats, warnings))
}

fn panel_stats(samples: &[PanelSample]) -> PanelStats {
    if samples.is_empty() {
        return PanelStats {
            min: LEVEL_FLOOR_DB,
            max: LEVEL_FLOOR_DB,
            avg: LEVEL_FLOOR_DB,
            p95: LEVEL_FLOOR_DB,
            sample_count: 0,
        };
    }
    let mut levels: Vec<f64> = samples.iter().map(|s| s.laeq).collect();
    levels.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let min = levels[0];
    let max = levels[levels.len() - 1];
    let avg = levels.iter().sum::<f64>() / levels.len() as f64;
    // Nearest-rank 95th percentile.
    let rank = ((0.95 * levels.len() as f64).ceil() as usize).clamp(1, levels.len());
    let p95 = levels[rank - 1];
    PanelStats {
        min,
        max,
        avg,
        p95,
        sample_count: levels.len(),
    }
}
