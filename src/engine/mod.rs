// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The request pipeline.

Compute requests are pure functions of an immutable scene snapshot. The only
process-wide state is the request-sequence map: submitting a request under a
`request_id` increments that id's sequence, and a running job that discovers
a newer sequence at a unit-of-work boundary fails with [EngineError::Stale].
Requests without an id are uncancellable.

Every response carries the backend id, phase timings, and the non-fatal
warnings collected along the way.
 */

mod error;
#[cfg(test)]
mod tests;

pub use error::EngineError;

use std::{sync::Mutex, time::Instant};

use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::{debug, trace};
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    constants::{NUM_BANDS, OCTAVE_BAND_FREQS},
    geom::{Point2, Point3},
    grid::{self, GridConfig, GridResult, PanelSample, PanelStats},
    paths::SceneGeometry,
    physics::{overall_level, Weighting},
    scene::{Barrier, Building, PropagationConfig, Scene, Source},
    spectrum::{compute_point, compute_point_traced, PathTrace, Spectrum},
};

/// The backend this crate implements. Routing to other backends is a caller
/// concern.
pub const BACKEND_ID: &str = "cpu";

lazy_static! {
    /// request_id → latest submitted sequence. Entries are never collected;
    /// ids are short strings with caller-bounded cardinality.
    static ref REQUEST_SEQUENCES: Mutex<IndexMap<String, u64>> = Mutex::new(IndexMap::new());
}

/// A submitted request's claim on its id. Obtain one per compute call; the
/// pipeline polls it between units of work.
#[derive(Clone, Debug)]
pub struct RequestTicket {
    id: Option<String>,
    sequence: u64,
}

impl RequestTicket {
    /// Register a submission, bumping the sequence for `request_id`.
    pub fn register(request_id: Option<&str>) -> RequestTicket {
        match request_id {
            Some(id) => {
                let mut map = REQUEST_SEQUENCES
                    .lock()
                    .unwrap_or_else(|poison| poison.into_inner());
                let sequence = map
                    .entry(id.to_string())
                    .and_modify(|s| *s += 1)
                    .or_insert(1);
                trace!("Request {id:?} registered at sequence {sequence}");
                RequestTicket {
                    id: Some(id.to_string()),
                    sequence: *sequence,
                }
            }
            None => RequestTicket {
                id: None,
                sequence: 0,
            },
        }
    }

    /// An uncancellable ticket.
    pub fn anonymous() -> RequestTicket {
        RequestTicket::register(None)
    }

    /// Has a newer submission with the same id arrived?
    pub fn is_stale(&self) -> bool {
        match &self.id {
            Some(id) => {
                let map = REQUEST_SEQUENCES
                    .lock()
                    .unwrap_or_else(|poison| poison.into_inner());
                map.get(id).map_or(false, |latest| *latest != self.sequence)
            }
            None => false,
        }
    }

    fn ensure_current(&self) -> Result<(), EngineError> {
        if self.is_stale() {
            Err(EngineError::Stale {
                id: self.id.clone().unwrap_or_default(),
            })
        } else {
            Ok(())
        }
    }
}

/// Wall-clock phase durations \[ms\].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
    pub setup_ms: f64,
    pub compute_ms: f64,
    pub transfer_ms: f64,
    pub total_ms: f64,
}

/// One receiver's evaluated spectrum.
#[derive(Clone, Debug, Serialize)]
pub struct ReceiverResult {
    pub id: String,
    #[serde(rename = "LAeq")]
    pub laeq: f64,
    pub spectrum: Spectrum,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiversResponse {
    pub receivers: Vec<ReceiverResult>,
    pub backend_id: &'static str,
    pub timings: Timings,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelResponse {
    pub panel_id: String,
    pub samples: Vec<PanelSample>,
    pub stats: PanelStats,
    pub backend_id: &'static str,
    pub timings: Timings,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridResponse {
    #[serde(flatten)]
    pub grid: GridResult,
    pub backend_id: &'static str,
    pub timings: Timings,
    pub warnings: Vec<String>,
}

/// Evaluate every receiver of the scene.
///
/// `config` overrides the scene's embedded engineConfig; the defaults apply
/// when neither is present.
pub fn compute_receivers(
    scene: &Scene,
    config: Option<&PropagationConfig>,
    ticket: &RequestTicket,
) -> Result<ReceiversResponse, EngineError> {
    let total_start = Instant::now();
    let (config, geometry, sources) = setup(scene, config, ticket)?;
    let setup_ms = ms_since(total_start);

    let compute_start = Instant::now();
    let results: Result<Vec<(ReceiverResult, Vec<String>)>, EngineError> = scene
        .receivers
        .par_iter()
        .map(|receiver| {
            ticket.ensure_current()?;
            let result = compute_point(&sources, receiver.position, &geometry, &config);
            Ok((
                ReceiverResult {
                    id: receiver.id.clone(),
                    laeq: overall_level(&result.spectrum, Weighting::A),
                    spectrum: result.spectrum,
                    x: receiver.position.x,
                    y: receiver.position.y,
                    z: receiver.position.z,
                },
                result.warnings,
            ))
        })
        .collect();
    let results = results?;
    let compute_ms = ms_since(compute_start);

    let transfer_start = Instant::now();
    let mut receivers = Vec::with_capacity(results.len());
    let mut warnings = vec![];
    for (result, point_warnings) in results {
        receivers.push(result);
        warnings.extend(point_warnings);
    }
    ticket.ensure_current()?;
    let transfer_ms = ms_since(transfer_start);

    debug!(
        "Receivers compute: {} probes, {} warnings",
        receivers.len(),
        warnings.len()
    );
    Ok(ReceiversResponse {
        receivers,
        backend_id: BACKEND_ID,
        timings: timings(setup_ms, compute_ms, transfer_ms, total_start),
        warnings,
    })
}

/// Evaluate one panel of the scene.
pub fn compute_panel(
    scene: &Scene,
    panel_id: &str,
    config: Option<&PropagationConfig>,
    ticket: &RequestTicket,
) -> Result<PanelResponse, EngineError> {
    let total_start = Instant::now();
    let (config, geometry, sources) = setup(scene, config, ticket)?;
    let panel = scene
        .panels
        .iter()
        .find(|p| p.id == panel_id)
        .ok_or_else(|| EngineError::UnknownPanel(panel_id.to_string()))?;
    let setup_ms = ms_since(total_start);

    let compute_start = Instant::now();
    let is_stale = || ticket.is_stale();
    let (samples, stats, warnings) =
        grid::compute_panel(&sources, &geometry, &config, panel, &is_stale).ok_or_else(|| {
            EngineError::Stale {
                id: ticket.id.clone().unwrap_or_default(),
            }
        })?;
    let compute_ms = ms_since(compute_start);
    ticket.ensure_current()?;

    Ok(PanelResponse {
        panel_id: panel_id.to_string(),
        samples,
        stats,
        backend_id: BACKEND_ID,
        timings: timings(setup_ms, compute_ms, 0.0, total_start),
        warnings,
    })
}

/// Evaluate a sound-map grid. The inline `grid_config` wins over the scene's
/// grid block.
pub fn compute_grid(
    scene: &Scene,
    grid_config: Option<&GridConfig>,
    config: Option<&PropagationConfig>,
    ticket: &RequestTicket,
) -> Result<GridResponse, EngineError> {
    let total_start = Instant::now();
    let (config, geometry, sources) = setup(scene, config, ticket)?;
    let grid_config = grid_config
        .or(scene.grid.as_ref())
        .ok_or(EngineError::MissingGridConfig)?;
    if let Some(band) = grid_config.target_band {
        if band >= NUM_BANDS {
            return Err(EngineError::BadBandIndex(band));
        }
    }
    let setup_ms = ms_since(total_start);

    let compute_start = Instant::now();
    let is_stale = || ticket.is_stale();
    let (grid, warnings) =
        grid::compute_grid(&sources, &geometry, &config, grid_config, &is_stale).ok_or_else(
            || EngineError::Stale {
                id: ticket.id.clone().unwrap_or_default(),
            },
        )?;
    let compute_ms = ms_since(compute_start);
    ticket.ensure_current()?;

    Ok(GridResponse {
        grid,
        backend_id: BACKEND_ID,
        timings: timings(setup_ms, compute_ms, 0.0, total_start),
        warnings,
    })
}

/// Shared request setup: config resolution and validation, obstacle
/// geometry, source filtering.
fn setup<'a>(
    scene: &'a Scene,
    config: Option<&PropagationConfig>,
    ticket: &RequestTicket,
) -> Result<(PropagationConfig, SceneGeometry, Vec<&'a Source>), EngineError> {
    ticket.ensure_current()?;
    let config = config
        .copied()
        .or(scene.config)
        .unwrap_or_default();
    config.validate()?;
    let geometry = SceneGeometry::new(scene);
    let sources = scene.enabled_sources();
    Ok((config, geometry, sources))
}

fn ms_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1e3
}

fn timings(setup_ms: f64, compute_ms: f64, transfer_ms: f64, total_start: Instant) -> Timings {
    Timings {
        setup_ms,
        compute_ms,
        transfer_ms,
        total_ms: ms_since(total_start),
    }
}

// Probe requests: single-point diagnostics with their own ad-hoc obstacle
// list instead of a full scene.

/// Which obstacle shape a probe wall describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeWallKind {
    Barrier,
    Building,
}

/// An obstacle as supplied by a probe request.
#[derive(Clone, Debug)]
pub struct ProbeWall {
    pub kind: ProbeWallKind,
    pub vertices: Vec<Point2>,
    pub height: f64,
}

/// A single-point diagnostic request.
#[derive(Clone, Debug)]
pub struct ProbeRequest {
    pub probe_id: String,
    pub position: Point3,
    pub sources: Vec<Source>,
    pub walls: Vec<ProbeWall>,
    pub config: PropagationConfig,
    pub include_path_geometry: bool,
}

/// A traced path polyline for the probe UI.
#[derive(Clone, Debug, Serialize)]
pub struct TracedPath {
    pub kind: String,
    pub points: Vec<Point3>,
    pub length: f64,
}

/// Per-path unwrapped phases in every band.
#[derive(Clone, Debug, Serialize)]
pub struct PathPhases {
    pub kind: String,
    pub phases: Spectrum,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterferenceDetails {
    pub ghost_count: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeData {
    pub frequencies: [f64; NUM_BANDS],
    pub magnitudes: Spectrum,
    pub interference_details: InterferenceDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traced_paths: Option<Vec<TracedPath>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_relationships: Option<Vec<PathPhases>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResponse {
    pub probe_id: String,
    pub data: ProbeData,
}

/// Evaluate a probe. Probes carry no request id and are uncancellable.
pub fn run_probe(request: &ProbeRequest) -> Result<ProbeResponse, EngineError> {
    request.config.validate()?;
    let geometry = probe_geometry(&request.walls);
    let sources: Vec<&Source> = request.sources.iter().collect();

    let result = if request.include_path_geometry {
        compute_point_traced(&sources, request.position, &geometry, &request.config)
    } else {
        compute_point(&sources, request.position, &geometry, &request.config)
    };

    let (traced_paths, phase_relationships) = match result.traces {
        Some(ref traces) => (
            Some(traces.iter().map(traced_path).collect()),
            Some(
                traces
                    .iter()
                    .map(|t| PathPhases {
                        kind: path_kind_name(t).to_string(),
                        phases: t.band_phases,
                    })
                    .collect(),
            ),
        ),
        None => (None, None),
    };

    Ok(ProbeResponse {
        probe_id: request.probe_id.clone(),
        data: ProbeData {
            frequencies: OCTAVE_BAND_FREQS,
            magnitudes: result.spectrum,
            interference_details: InterferenceDetails {
                ghost_count: result.ghost_count,
            },
            traced_paths,
            phase_relationships,
        },
    })
}

/// Build obstacle geometry from a probe's wall list.
fn probe_geometry(walls: &[ProbeWall]) -> SceneGeometry {
    let mut barriers = vec![];
    let mut buildings = vec![];
    for (i, wall) in walls.iter().enumerate() {
        match wall.kind {
            ProbeWallKind::Barrier => {
                if wall.vertices.len() >= 2 {
                    barriers.push(Barrier {
                        id: format!("wall-{i}"),
                        p1: wall.vertices[0],
                        p2: wall.vertices[1],
                        height: wall.height,
                        ground_elevation: 0.0,
                        attenuation_db: crate::constants::DEFAULT_OBSTACLE_ATTENUATION_DB,
                        enabled: true,
                    });
                }
            }
            ProbeWallKind::Building => {
                if wall.vertices.len() >= 3 {
                    let mut footprint = wall.vertices.clone();
                    if crate::geom::polygon_signed_area(&footprint) < 0.0 {
                        footprint.reverse();
                    }
                    buildings.push(Building {
                        id: format!("wall-{i}"),
                        footprint,
                        height: wall.height,
                        attenuation_db: crate::constants::DEFAULT_OBSTACLE_ATTENUATION_DB,
                        enabled: true,
                    });
                }
            }
        }
    }
    SceneGeometry::from_obstacles(barriers, buildings)
}

fn traced_path(trace: &PathTrace) -> TracedPath {
    TracedPath {
        kind: path_kind_name(trace).to_string(),
        points: trace.points.clone(),
        length: trace.length,
    }
}

fn path_kind_name(trace: &PathTrace) -> &'static str {
    use crate::paths::PathKind::*;
    match trace.kind {
        Direct => "direct",
        Ground => "ground",
        WallReflection => "wall",
        BarrierDiffraction => "barrier",
        BuildingDiffraction => "building",
    }
}
