// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Coherent spectral outdoor sound propagation engine.
//!
//! Scenes of point sources, barriers and buildings are evaluated at probe
//! points and over listening grids: for each source-receiver pair the engine
//! enumerates the physically significant acoustic paths (direct, specular
//! ground reflection, first-order wall reflections, diffraction over and
//! around obstacles), attenuates each per octave band, and sums the paths as
//! pressure phasors into a 9-band spectrum.

pub mod constants;
pub mod engine;
mod error;
pub mod geom;
pub mod grid;
pub(crate) mod math;
pub mod paths;
pub mod physics;
pub mod scene;
pub mod spectrum;

// Re-exports.
pub use engine::{
    compute_grid, compute_panel, compute_receivers, run_probe, EngineError, ProbeRequest,
    ProbeResponse, ProbeWall, ProbeWallKind, RequestTicket, Timings, BACKEND_ID,
};
pub use error::SoundfieldError;
pub use grid::{Bounds, GridConfig, GridResult};
pub use physics::Weighting;
pub use scene::{PropagationConfig, Scene};
pub use spectrum::Spectrum;
