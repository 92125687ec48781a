// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The physics kernel.

dB↔pressure conversions, geometric spreading, atmospheric absorption,
Maekawa diffraction, ground impedance and the reflection coefficient, and
the A/C/Z weightings. All functions are pure; model selection is carried by
small serde'd enums that also appear in the propagation configuration.
 */

pub mod absorption;
pub mod diffraction;
pub mod ground;
pub mod weighting;


use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::constants::SPEED_OF_SOUND_0C;

pub use absorption::{AbsorptionModel, Atmosphere};
pub use diffraction::{double_edge_attenuation, fresnel_number, single_edge_attenuation};
pub use ground::{
    flow_resistivity, normalized_impedance, reflection_coefficient, GroundInterpolation,
    GroundKind, GroundModel, ImpedanceModel,
};
pub use weighting::{overall_level, weighting_corrections, Weighting};

/// Geometric spreading law.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Spreading {
    /// Point source: 20 log10(d).
    Spherical,
    /// Line source: 10 log10(d).
    Cylindrical,
}

impl Default for Spreading {
    fn default() -> Spreading {
        Spreading::Spherical
    }
}

/// Spreading attenuation over distance `d` \[dB\]. Distances are clamped to
/// 1 m; paths shorter than that are unattenuated by spreading.
pub fn spreading_attenuation(spreading: Spreading, d: f64) -> f64 {
    let d = d.max(1.0);
    match spreading {
        Spreading::Spherical => 20.0 * d.log10(),
        Spreading::Cylindrical => 10.0 * d.log10(),
    }
}

/// Speed of sound in air at the given temperature \[m/s\]:
/// `c = 331.3 sqrt(1 + T / 273.15)`.
pub fn speed_of_sound(temperature_c: f64) -> f64 {
    SPEED_OF_SOUND_0C * (1.0 + temperature_c / 273.15).sqrt()
}
