// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all soundfield-related errors. This should be the *only*
//! error enum that callers need to match on; the per-module enums convert
//! into it.

use thiserror::Error;

use crate::{
    engine::EngineError,
    scene::{ConfigError, ReadSceneError, SceneError},
};

/// The *only* publicly visible error from soundfield.
#[derive(Error, Debug)]
pub enum SoundfieldError {
    /// The scene document violates the schema or its invariants.
    #[error("Invalid scene: {0}")]
    InvalidScene(String),

    /// The propagation configuration is contradictory.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A newer request with the same id has been submitted. Callers usually
    /// ignore this silently.
    #[error("Stale request: {0}")]
    Stale(String),

    /// The requested backend could not be dispatched.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<SceneError> for SoundfieldError {
    fn from(e: SceneError) -> Self {
        Self::InvalidScene(e.to_string())
    }
}

impl From<ReadSceneError> for SoundfieldError {
    fn from(e: ReadSceneError) -> Self {
        let s = e.to_string();
        match e {
            ReadSceneError::Scene(_)
            | ReadSceneError::Json(_)
            | ReadSceneError::Yaml(_)
            | ReadSceneError::UnsupportedExt(_) => Self::InvalidScene(s),
            ReadSceneError::IO(_) => Self::Generic(s),
        }
    }
}

impl From<ConfigError> for SoundfieldError {
    fn from(e: ConfigError) -> Self {
        Self::InvalidConfig(e.to_string())
    }
}

impl From<EngineError> for SoundfieldError {
    fn from(e: EngineError) -> Self {
        let s = e.to_string();
        match e {
            EngineError::InvalidConfig(_) => Self::InvalidConfig(s),
            EngineError::Stale { id } => Self::Stale(id),
            EngineError::BackendUnavailable(_) => Self::BackendUnavailable(s),
            EngineError::UnknownPanel(_)
            | EngineError::MissingGridConfig
            | EngineError::BadBandIndex(_) => Self::InvalidScene(s),
        }
    }
}
