// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. `soundfield` should do as many
calculations as possible in double precision; levels are only rounded for
display by callers.
 */

pub use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

/// The number of octave bands in every spectrum.
pub const NUM_BANDS: usize = 9;

/// Octave-band centre frequencies \[Hz\]. Every "spectrum" in this crate is a
/// 9-vector indexed in this order.
pub const OCTAVE_BAND_FREQS: [f64; NUM_BANDS] = [
    63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// A-weighting corrections at the octave-band centre frequencies \[dB\].
pub const A_WEIGHTING: [f64; NUM_BANDS] = [-26.2, -16.1, -8.6, -3.2, 0.0, 1.2, 1.0, -1.1, -6.6];

/// C-weighting corrections at the octave-band centre frequencies \[dB\].
pub const C_WEIGHTING: [f64; NUM_BANDS] = [-0.8, -0.2, 0.0, 0.0, 0.0, -0.2, -0.8, -3.0, -8.5];

/// Z ("zero") weighting corrections \[dB\].
pub const Z_WEIGHTING: [f64; NUM_BANDS] = [0.0; NUM_BANDS];

/// Reference sound pressure \[Pa\] (SPL re 20 µPa).
pub const P_REF: f64 = 2e-5;

/// Pressures below this value are clamped to it \[Pa\].
pub const PRESSURE_FLOOR: f64 = 1e-12;

/// The level reported for empty path sets and non-finite bands \[dB\].
pub const LEVEL_FLOOR_DB: f64 = -200.0;

/// Speed of sound in air at 0 °C \[m/s\]. The temperature-dependent speed is
/// `331.3 * sqrt(1 + T / 273.15)`.
pub const SPEED_OF_SOUND_0C: f64 = 331.3;

/// Flow resistivity of acoustically hard ground (concrete, water) \[rayl\].
pub const SIGMA_HARD: f64 = 2.0e6;

/// Flow resistivity of acoustically soft ground (grass, snow) \[rayl\].
pub const SIGMA_SOFT: f64 = 2.0e4;

/// Default grazing angle from the surface normal used by the reflection
/// coefficient when no geometric angle is supplied \[radians\].
pub const DEFAULT_GRAZING_ANGLE: f64 = FRAC_PI_2 - 0.087;

/// Geometric tolerance. Segments passing within this distance of an edge are
/// considered grazing, not blocked; parallel-line denominators below this
/// magnitude yield no intersection.
pub const GEOM_EPSILON: f64 = 1e-10;

/// Pressure amplitude lost at a reflecting building wall (10% absorption).
pub const WALL_REFLECTION_FACTOR: f64 = 0.9;

/// Barriers shorter than this get around-end diffraction paths when side
/// diffraction is set to `auto` \[m\].
pub const SIDE_DIFFRACTION_AUTO_MAX_LENGTH: f64 = 50.0;

/// Insertion loss a screen cannot exceed when its own transmission loss is
/// unspecified \[dB\].
pub const DEFAULT_OBSTACLE_ATTENUATION_DB: f64 = 100.0;

// Numeric defaults for scene documents.

/// Default source height above ground \[m\].
pub const DEFAULT_SOURCE_Z: f64 = 1.5;

/// Default receiver height above ground \[m\].
pub const DEFAULT_RECEIVER_Z: f64 = 1.5;

/// Default probe height above ground \[m\].
pub const DEFAULT_PROBE_Z: f64 = 1.7;

/// Default air temperature \[°C\].
pub const DEFAULT_TEMPERATURE_C: f64 = 20.0;

/// Default relative humidity \[%\].
pub const DEFAULT_HUMIDITY_PERCENT: f64 = 50.0;

/// Default atmospheric pressure \[kPa\].
pub const DEFAULT_PRESSURE_KPA: f64 = 101.325;

/// Default mixed-ground factor G.
pub const DEFAULT_MIXED_GROUND_FACTOR: f64 = 0.5;

/// Sources farther than this from an evaluation point contribute nothing \[m\].
pub const DEFAULT_MAX_PROPAGATION_DISTANCE: f64 = 2000.0;

/// The scene document schema version this crate reads.
pub const SCENE_SCHEMA_VERSION: &str = "1";
