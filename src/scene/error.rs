// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from validating a scene document against the schema invariants.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Scene document version {got:?} is not supported (expected {expected:?})")]
    UnsupportedVersion { got: String, expected: String },

    #[error("Duplicate id {id:?} in the {array} array")]
    DuplicateId { array: &'static str, id: String },

    #[error("{what} of {id:?} is not finite")]
    NonFinite { id: String, what: &'static str },

    #[error("Source {id:?} has a spectrum with {got} entries; exactly 9 octave bands are required")]
    SpectrumLength { id: String, got: usize },

    #[error("Source {id:?} sits below the ground plane (z = {z})")]
    SourceBelowGround { id: String, z: f64 },

    #[error("Receiver {id:?} sits below the ground plane (z = {z})")]
    ReceiverBelowGround { id: String, z: f64 },

    #[error("Obstacle {id:?} must have a positive height, got {height}")]
    NonPositiveHeight { id: String, height: f64 },

    #[error("Barrier {id:?} has coincident endpoints")]
    DegenerateBarrier { id: String },

    #[error("Building {id:?} has {got} footprint vertices; at least 3 are required")]
    FootprintTooSmall { id: String, got: usize },

    #[error("Building {id:?} has a self-intersecting footprint")]
    FootprintNotSimple { id: String },

    #[error("Building {id:?} has a zero-area footprint")]
    FootprintZeroArea { id: String },

    #[error("Panel {id:?} has {got} vertices; at least 3 are required")]
    PanelTooSmall { id: String, got: usize },

    #[error("Panel {id:?} has a self-intersecting outline")]
    PanelNotSimple { id: String },
}

/// Errors from reading a scene document off disk or a string.
#[derive(Error, Debug)]
pub enum ReadSceneError {
    #[error("Unrecognised scene file extension on {0}; expected .json, .yaml or .yml")]
    UnsupportedExt(PathBuf),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("Could not parse scene JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not parse scene YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

/// Errors from contradictory propagation settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Mixed-ground factor G must lie in [0, 1], got {0}")]
    MixedFactorOutOfRange(f64),

    #[error("Speed of sound must be positive, got {0}")]
    NonPositiveSpeedOfSound(f64),

    #[error("Maximum propagation distance must be positive, got {0}")]
    NonPositiveMaxDistance(f64),

    #[error("Relative humidity must lie in [0, 100], got {0}")]
    HumidityOutOfRange(f64),

    #[error("Atmospheric pressure must be positive, got {0} kPa")]
    NonPositivePressure(f64),

    #[error("Air temperature {0} °C is below absolute zero")]
    TemperatureBelowAbsoluteZero(f64),
}
