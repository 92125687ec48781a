// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Scene documents and the propagation configuration.

A [Scene] is immutable for the duration of one compute call: the engine
borrows it, never mutates it, and every concurrent call sees a consistent
snapshot. Scenes are not deserialised directly; the on-disk/on-wire document
goes through temporary types in [read] that validate the schema invariants
and normalise footprint winding before anything reaches the path enumerator.
 */

mod error;
pub(crate) mod read;
#[cfg(test)]
mod tests;

pub use error::{ConfigError, ReadSceneError, SceneError};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::{
    constants::{
        DEFAULT_MAX_PROPAGATION_DISTANCE, DEFAULT_MIXED_GROUND_FACTOR, NUM_BANDS,
        SIDE_DIFFRACTION_AUTO_MAX_LENGTH,
    },
    geom::{Point2, Point3},
    physics::{
        speed_of_sound, AbsorptionModel, Atmosphere, GroundInterpolation, GroundKind, GroundModel,
        ImpedanceModel, Spreading,
    },
};

/// A validated scene: sources, probes, listening panels and obstacles in a
/// local ENU frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Schema version of the document this scene came from.
    pub version: String,
    /// The geodetic anchor of the ENU frame, if the document carried one.
    pub origin: Option<Origin>,
    pub sources: Vec<Source>,
    pub receivers: Vec<Receiver>,
    pub panels: Vec<Panel>,
    pub barriers: Vec<Barrier>,
    pub buildings: Vec<Building>,
    /// The grid block of the document, if present.
    pub grid: Option<crate::grid::GridConfig>,
    /// The engineConfig block of the document, if present.
    pub config: Option<PropagationConfig>,
}

impl Scene {
    /// Collapse a source's enabled/solo/mute state against the rest of the
    /// scene: a source contributes iff it is enabled, not muted, and either
    /// nothing is soloed or it is soloed itself.
    pub fn is_source_enabled(&self, source: &Source) -> bool {
        if !source.enabled || source.muted {
            return false;
        }
        let any_solo = self.sources.iter().any(|s| s.solo && s.enabled);
        !any_solo || source.solo
    }

    /// The sources that contribute to a compute call.
    pub fn enabled_sources(&self) -> Vec<&Source> {
        self.sources
            .iter()
            .filter(|s| self.is_source_enabled(s))
            .collect()
    }
}

/// The geodetic anchor of the ENU frame. Carried through verbatim; geodetic
/// transforms are a caller concern.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    pub lat_lon: LatLon,
    #[serde(default)]
    pub altitude: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// An omnidirectional point source with a 9-band power spectrum.
#[derive(Clone, Debug, PartialEq)]
pub struct Source {
    pub id: String,
    pub position: Point3,
    /// Per-band sound power levels \[dB Lw\].
    pub spectrum: [f64; NUM_BANDS],
    /// Offset added to every band \[dB\].
    pub gain_db: f64,
    pub enabled: bool,
    pub solo: bool,
    pub muted: bool,
}

impl Source {
    /// The spectrum with the gain offset applied.
    pub fn effective_spectrum(&self) -> [f64; NUM_BANDS] {
        let mut out = self.spectrum;
        for l in &mut out {
            *l += self.gain_db;
        }
        out
    }
}

/// A point probe at which a spectrum is evaluated.
#[derive(Clone, Debug, PartialEq)]
pub struct Receiver {
    pub id: String,
    pub position: Point3,
}

/// A polygonal listening area, sampled over its bounding box with a
/// point-in-polygon mask.
#[derive(Clone, Debug, PartialEq)]
pub struct Panel {
    pub id: String,
    pub vertices: Vec<Point2>,
    /// Evaluation height \[m\].
    pub elevation: f64,
    /// Sampling resolution \[m\].
    pub resolution: f64,
    /// Upper bound on the number of evaluated samples; enforced by uniform
    /// stride.
    pub point_cap: usize,
}

/// A thin screen between two ground points.
#[derive(Clone, Debug, PartialEq)]
pub struct Barrier {
    pub id: String,
    pub p1: Point2,
    pub p2: Point2,
    /// Height of the top edge above its ground elevation \[m\].
    pub height: f64,
    /// Ground elevation at the barrier base \[m\].
    pub ground_elevation: f64,
    /// Transmission loss cap \[dB\].
    pub attenuation_db: f64,
    pub enabled: bool,
}

impl Barrier {
    /// The z coordinate of the top edge.
    pub fn top_z(&self) -> f64 {
        self.ground_elevation + self.height
    }

    /// Horizontal length \[m\].
    pub fn length(&self) -> f64 {
        self.p1.distance(self.p2)
    }
}

/// An extruded polygon. The footprint is CCW after ingest.
#[derive(Clone, Debug, PartialEq)]
pub struct Building {
    pub id: String,
    pub footprint: Vec<Point2>,
    pub height: f64,
    /// Transmission loss cap \[dB\].
    pub attenuation_db: f64,
    pub enabled: bool,
}

/// Barrier side (around-end) diffraction switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SideDiffraction {
    Off,
    /// On for barriers shorter than 50 m.
    Auto,
    On,
}

impl Default for SideDiffraction {
    fn default() -> SideDiffraction {
        SideDiffraction::Auto
    }
}

impl SideDiffraction {
    /// Does a barrier of this length get around-end paths?
    pub fn enabled_for(self, barrier_length: f64) -> bool {
        match self {
            SideDiffraction::Off => false,
            SideDiffraction::On => true,
            SideDiffraction::Auto => barrier_length < SIDE_DIFFRACTION_AUTO_MAX_LENGTH,
        }
    }
}

/// Ground-reflection settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroundConfig {
    pub enabled: bool,
    pub kind: GroundKind,
    /// Mixed factor G ∈ [0, 1]; soft fraction.
    pub mixed_factor: f64,
    pub interpolation: GroundInterpolation,
    pub model: GroundModel,
    pub impedance: ImpedanceModel,
}

impl Default for GroundConfig {
    fn default() -> GroundConfig {
        GroundConfig {
            enabled: true,
            kind: GroundKind::default(),
            mixed_factor: DEFAULT_MIXED_GROUND_FACTOR,
            interpolation: GroundInterpolation::default(),
            model: GroundModel::default(),
            impedance: ImpedanceModel::default(),
        }
    }
}

/// Everything that applies to all paths in one compute call.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PropagationConfig {
    pub spreading: Spreading,
    pub absorption: AbsorptionModel,
    #[serde(flatten)]
    pub atmosphere: Atmosphere,
    pub ground: GroundConfig,
    pub side_diffraction: SideDiffraction,
    /// Overrides the temperature-derived speed of sound when set \[m/s\].
    pub speed_of_sound: Option<f64>,
    /// Complex path summation within a source; energetic when false.
    pub coherent_summation: bool,
    /// Sources beyond this distance contribute nothing \[m\].
    pub max_distance: f64,
}

impl Default for PropagationConfig {
    fn default() -> PropagationConfig {
        PropagationConfig {
            spreading: Spreading::default(),
            absorption: AbsorptionModel::default(),
            atmosphere: Atmosphere::default(),
            ground: GroundConfig::default(),
            side_diffraction: SideDiffraction::default(),
            speed_of_sound: None,
            coherent_summation: true,
            max_distance: DEFAULT_MAX_PROPAGATION_DISTANCE,
        }
    }
}

impl PropagationConfig {
    /// The speed of sound for this call \[m/s\]: the explicit override, or
    /// `331.3 sqrt(1 + T/273.15)` from the configured temperature.
    pub fn speed(&self) -> f64 {
        self.speed_of_sound
            .unwrap_or_else(|| speed_of_sound(self.atmosphere.temperature_c))
    }

    /// Reject contradictory settings before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.ground.mixed_factor) {
            return Err(ConfigError::MixedFactorOutOfRange(self.ground.mixed_factor));
        }
        if let Some(c) = self.speed_of_sound {
            if !(c > 0.0) {
                return Err(ConfigError::NonPositiveSpeedOfSound(c));
            }
        }
        if !(self.max_distance > 0.0) {
            return Err(ConfigError::NonPositiveMaxDistance(self.max_distance));
        }
        if !(0.0..=100.0).contains(&self.atmosphere.humidity_percent) {
            return Err(ConfigError::HumidityOutOfRange(
                self.atmosphere.humidity_percent,
            ));
        }
        if !(self.atmosphere.pressure_kpa > 0.0) {
            return Err(ConfigError::NonPositivePressure(self.atmosphere.pressure_kpa));
        }
        if self.atmosphere.temperature_c <= -273.15 {
            return Err(ConfigError::TemperatureBelowAbsoluteZero(
                self.atmosphere.temperature_c,
            ));
        }
        Ok(())
    }
}
