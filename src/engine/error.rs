// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::scene::ConfigError;

/// Errors from the request pipeline. `Stale` is a distinct category so
/// callers can silently ignore superseded requests.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("Request {id:?} was superseded by a newer submission")]
    Stale { id: String },

    #[error("No enabled panel with id {0:?} in the scene")]
    UnknownPanel(String),

    #[error("Grid request carries no grid configuration (neither inline nor in the scene)")]
    MissingGridConfig,

    #[error("Octave-band index {0} is out of range; spectra have 9 bands")]
    BadBandIndex(usize),

    #[error("Backend {0:?} is unavailable")]
    BackendUnavailable(String),
}

impl EngineError {
    /// Is this the benign "a newer request took over" case?
    pub fn is_stale(&self) -> bool {
        matches!(self, EngineError::Stale { .. })
    }
}
