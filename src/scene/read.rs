// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Code to read scene documents.

To keep the wire format independent of the internal model, `Scene` isn't
directly deserialisable. Temporary types do the serde work; validation and
normalisation (CCW footprints, enabled flags, defaults) happen while
converting into a [Scene].
 */

use std::{collections::HashSet, fs::File, io::BufReader, path::Path};

use log::{debug, trace};
use serde::Deserialize;

use super::{
    error::{ReadSceneError, SceneError},
    Barrier, Building, Origin, Panel, PropagationConfig, Receiver, Scene, Source,
};
use crate::{
    constants::{
        DEFAULT_OBSTACLE_ATTENUATION_DB, DEFAULT_RECEIVER_Z, DEFAULT_SOURCE_Z, NUM_BANDS,
        SCENE_SCHEMA_VERSION,
    },
    geom::{polygon_is_simple, polygon_signed_area, Point2, Point3},
    grid::GridConfig,
};

/// Default panel sampling resolution \[m\].
const DEFAULT_PANEL_RESOLUTION: f64 = 2.0;

/// Default panel sample cap.
const DEFAULT_PANEL_POINT_CAP: usize = 2000;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TmpScene {
    version: String,
    origin: Option<Origin>,
    #[serde(default)]
    sources: Vec<TmpSource>,
    #[serde(default)]
    receivers: Vec<TmpReceiver>,
    #[serde(default)]
    panels: Vec<TmpPanel>,
    #[serde(default)]
    obstacles: Vec<TmpObstacle>,
    grid: Option<GridConfig>,
    engine_config: Option<PropagationConfig>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TmpSource {
    id: String,
    x: f64,
    y: f64,
    #[serde(default = "default_source_z")]
    z: f64,
    spectrum: Vec<f64>,
    #[serde(default)]
    gain: f64,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    solo: bool,
    #[serde(default)]
    muted: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TmpReceiver {
    id: String,
    x: f64,
    y: f64,
    #[serde(default = "default_receiver_z")]
    z: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TmpPanel {
    id: String,
    vertices: Vec<Point2>,
    #[serde(default = "default_receiver_z")]
    elevation: f64,
    #[serde(default = "default_panel_resolution")]
    resolution: f64,
    #[serde(default = "default_panel_point_cap")]
    point_cap: usize,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TmpObstacle {
    Barrier {
        id: String,
        p1: Point2,
        p2: Point2,
        height: f64,
        #[serde(default, rename = "groundElevation")]
        ground_elevation: f64,
        #[serde(default = "default_attenuation")]
        attenuation: f64,
        #[serde(default = "default_true")]
        enabled: bool,
    },
    Building {
        id: String,
        footprint: Vec<Point2>,
        height: f64,
        #[serde(default = "default_attenuation")]
        attenuation: f64,
        #[serde(default = "default_true")]
        enabled: bool,
    },
}

fn default_true() -> bool {
    true
}

fn default_source_z() -> f64 {
    DEFAULT_SOURCE_Z
}

fn default_receiver_z() -> f64 {
    DEFAULT_RECEIVER_Z
}

fn default_panel_resolution() -> f64 {
    DEFAULT_PANEL_RESOLUTION
}

fn default_panel_point_cap() -> usize {
    DEFAULT_PANEL_POINT_CAP
}

fn default_attenuation() -> f64 {
    DEFAULT_OBSTACLE_ATTENUATION_DB
}

impl Scene {
    /// Parse and validate a JSON scene document.
    pub fn from_json_str(contents: &str) -> Result<Scene, ReadSceneError> {
        let tmp: TmpScene = serde_json::from_str(contents)?;
        Ok(scene_from_tmp(tmp)?)
    }

    /// Parse and validate a YAML scene document.
    pub fn from_yaml_str(contents: &str) -> Result<Scene, ReadSceneError> {
        let tmp: TmpScene = serde_yaml::from_str(contents)?;
        Ok(scene_from_tmp(tmp)?)
    }

    /// Read a scene document, dispatching on the file extension.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Scene, ReadSceneError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        debug!("Reading scene document {}", path.display());
        let reader = BufReader::new(File::open(path)?);
        match ext.as_deref() {
            Some("json") => {
                let tmp: TmpScene = serde_json::from_reader(reader)?;
                Ok(scene_from_tmp(tmp)?)
            }
            Some("yaml" | "yml") => {
                let tmp: TmpScene = serde_yaml::from_reader(reader)?;
                Ok(scene_from_tmp(tmp)?)
            }
            _ => Err(ReadSceneError::UnsupportedExt(path.to_path_buf())),
        }
    }
}

/// Validate a parsed document and convert it into the internal model.
fn scene_from_tmp(tmp: TmpScene) -> Result<Scene, SceneError> {
    if tmp.version != SCENE_SCHEMA_VERSION {
        return Err(SceneError::UnsupportedVersion {
            got: tmp.version,
            expected: SCENE_SCHEMA_VERSION.to_string(),
        });
    }

    let mut sources = Vec::with_capacity(tmp.sources.len());
    let mut seen = HashSet::new();
    for s in tmp.sources {
        if !seen.insert(s.id.clone()) {
            return Err(SceneError::DuplicateId {
                array: "sources",
                id: s.id,
            });
        }
        ensure_finite(&s.id, "position", &[s.x, s.y, s.z])?;
        if s.z < 0.0 {
            return Err(SceneError::SourceBelowGround { id: s.id, z: s.z });
        }
        if s.spectrum.len() != NUM_BANDS {
            return Err(SceneError::SpectrumLength {
                id: s.id,
                got: s.spectrum.len(),
            });
        }
        ensure_finite(&s.id, "spectrum", &s.spectrum)?;
        ensure_finite(&s.id, "gain", &[s.gain])?;
        let mut spectrum = [0.0; NUM_BANDS];
        spectrum.copy_from_slice(&s.spectrum);
        sources.push(Source {
            id: s.id,
            position: Point3::new(s.x, s.y, s.z),
            spectrum,
            gain_db: s.gain,
            enabled: s.enabled,
            solo: s.solo,
            muted: s.muted,
        });
    }

    let mut receivers = Vec::with_capacity(tmp.receivers.len());
    let mut seen = HashSet::new();
    for r in tmp.receivers {
        if !seen.insert(r.id.clone()) {
            return Err(SceneError::DuplicateId {
                array: "receivers",
                id: r.id,
            });
        }
        ensure_finite(&r.id, "position", &[r.x, r.y, r.z])?;
        if r.z < 0.0 {
            return Err(SceneError::ReceiverBelowGround { id: r.id, z: r.z });
        }
        receivers.push(Receiver {
            id: r.id,
            position: Point3::new(r.x, r.y, r.z),
        });
    }

    let mut panels = Vec::with_capacity(tmp.panels.len());
    let mut seen = HashSet::new();
    for p in tmp.panels {
        if !seen.insert(p.id.clone()) {
            return Err(SceneError::DuplicateId {
                array: "panels",
                id: p.id,
            });
        }
        if p.vertices.len() < 3 {
            return Err(SceneError::PanelTooSmall {
                id: p.id,
                got: p.vertices.len(),
            });
        }
        for v in &p.vertices {
            ensure_finite(&p.id, "vertices", &[v.x, v.y])?;
        }
        if !polygon_is_simple(&p.vertices) {
            return Err(SceneError::PanelNotSimple { id: p.id });
        }
        panels.push(Panel {
            id: p.id,
            vertices: p.vertices,
            elevation: p.elevation,
            resolution: p.resolution,
            point_cap: p.point_cap,
        });
    }

    let mut barriers = vec![];
    let mut buildings = vec![];
    let mut seen = HashSet::new();
    for o in tmp.obstacles {
        match o {
            TmpObstacle::Barrier {
                id,
                p1,
                p2,
                height,
                ground_elevation,
                attenuation,
                enabled,
            } => {
                if !seen.insert(id.clone()) {
                    return Err(SceneError::DuplicateId {
                        array: "obstacles",
                        id,
                    });
                }
                ensure_finite(&id, "endpoints", &[p1.x, p1.y, p2.x, p2.y])?;
                ensure_finite(&id, "height", &[height, ground_elevation, attenuation])?;
                if height <= 0.0 {
                    return Err(SceneError::NonPositiveHeight { id, height });
                }
                if p1 == p2 {
                    return Err(SceneError::DegenerateBarrier { id });
                }
                barriers.push(Barrier {
                    id,
                    p1,
                    p2,
                    height,
                    ground_elevation,
                    attenuation_db: attenuation,
                    enabled,
                });
            }
            TmpObstacle::Building {
                id,
                mut footprint,
                height,
                attenuation,
                enabled,
            } => {
                if !seen.insert(id.clone()) {
                    return Err(SceneError::DuplicateId {
                        array: "obstacles",
                        id,
                    });
                }
                for v in &footprint {
                    ensure_finite(&id, "footprint", &[v.x, v.y])?;
                }
                ensure_finite(&id, "height", &[height, attenuation])?;
                if height <= 0.0 {
                    return Err(SceneError::NonPositiveHeight { id, height });
                }
                if footprint.len() < 3 {
                    return Err(SceneError::FootprintTooSmall {
                        id,
                        got: footprint.len(),
                    });
                }
                if !polygon_is_simple(&footprint) {
                    return Err(SceneError::FootprintNotSimple { id });
                }
                let area = polygon_signed_area(&footprint);
                if area.abs() < 1e-9 {
                    return Err(SceneError::FootprintZeroArea { id });
                }
                // Normalise winding to CCW.
                if area < 0.0 {
                    trace!("Reversing footprint winding of building {id}");
                    footprint.reverse();
                }
                buildings.push(Building {
                    id,
                    footprint,
                    height,
                    attenuation_db: attenuation,
                    enabled,
                });
            }
        }
    }

    debug!(
        "Scene: {} sources, {} receivers, {} panels, {} barriers, {} buildings",
        sources.len(),
        receivers.len(),
        panels.len(),
        barriers.len(),
        buildings.len()
    );

    Ok(Scene {
        version: tmp.version,
        origin: tmp.origin,
        sources,
        receivers,
        panels,
        barriers,
        buildings,
        grid: tmp.grid,
        config: tmp.engine_config,
    })
}

fn ensure_finite(id: &str, what: &'static str, values: &[f64]) -> Result<(), SceneError> {
    if values.iter().any(|v| !v.is_finite()) {
        Err(SceneError::NonFinite {
            id: id.to_string(),
            what,
        })
    } else {
        Ok(())
    }
}
