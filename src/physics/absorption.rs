// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Atmospheric absorption coefficients.
//!
//! The `iso9613` model implements the ISO 9613-1 pure-tone formulas: the
//! oxygen and nitrogen relaxation frequencies as functions of humidity,
//! temperature and pressure, plus the classical (viscous) term. `simple` is
//! a cheap linear-in-log-frequency stand-in.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::constants::{
    DEFAULT_HUMIDITY_PERCENT, DEFAULT_PRESSURE_KPA, DEFAULT_TEMPERATURE_C,
};

/// Reference atmospheric pressure \[kPa\].
const PRESSURE_REF_KPA: f64 = 101.325;

/// Reference air temperature \[K\].
const TEMPERATURE_REF_K: f64 = 293.15;

/// Triple-point isotherm temperature \[K\].
const TEMPERATURE_TRIPLE_K: f64 = 273.16;

/// Which atmospheric absorption model to apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AbsorptionModel {
    /// No atmospheric absorption.
    None,
    /// Linear in log-frequency approximation for a standard atmosphere.
    Simple,
    /// ISO 9613-1 with explicit temperature, humidity and pressure.
    Iso9613,
}

impl Default for AbsorptionModel {
    fn default() -> AbsorptionModel {
        AbsorptionModel::Iso9613
    }
}

/// The atmospheric state the ISO 9613-1 coefficients depend on.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Atmosphere {
    /// Air temperature \[°C\].
    pub temperature_c: f64,
    /// Relative humidity \[%\].
    pub humidity_percent: f64,
    /// Atmospheric pressure \[kPa\].
    pub pressure_kpa: f64,
}

impl Default for Atmosphere {
    fn default() -> Atmosphere {
        Atmosphere {
            temperature_c: DEFAULT_TEMPERATURE_C,
            humidity_percent: DEFAULT_HUMIDITY_PERCENT,
            pressure_kpa: DEFAULT_PRESSURE_KPA,
        }
    }
}

/// The absorption coefficient \[dB/m\] at frequency `f` \[Hz\]. The total
/// absorption over a path is the coefficient times the path length.
pub fn attenuation_coefficient(model: AbsorptionModel, f: f64, atmosphere: Atmosphere) -> f64 {
    match model {
        AbsorptionModel::None => 0.0,
        AbsorptionModel::Simple => simple_coefficient(f),
        AbsorptionModel::Iso9613 => iso9613_coefficient(
            f,
            atmosphere.temperature_c,
            atmosphere.humidity_percent,
            atmosphere.pressure_kpa,
        ),
    }
}

/// Linear in log10(f), anchored so that 1 kHz sits near the ISO value for
/// 20 °C / 50% RH. Never negative.
fn simple_coefficient(f: f64) -> f64 {
    (0.0030 * (f.max(1.0).log10() - 1.5)).max(0.0)
}

/// ISO 9613-1 absorption coefficient \[dB/m\].
fn iso9613_coefficient(f: f64, temperature_c: f64, humidity_percent: f64, pressure_kpa: f64) -> f64 {
    let t = temperature_c + 273.15;
    let t_rel = t / TEMPERATURE_REF_K;
    let p_rel = pressure_kpa / PRESSURE_REF_KPA;

    // Molar concentration of water vapour [%], via the saturation pressure
    // exponent.
    let c_sat = -6.8346 * (TEMPERATURE_TRIPLE_K / t).powf(1.261) + 4.6151;
    let h = humidity_percent * 10_f64.powf(c_sat) / p_rel;

    // Relaxation frequencies of oxygen and nitrogen [Hz].
    let fr_o = p_rel * (24.0 + 4.04e4 * h * (0.02 + h) / (0.391 + h));
    let fr_n = p_rel
        * t_rel.powf(-0.5)
        * (9.0 + 280.0 * h * (-4.170 * (t_rel.powf(-1.0 / 3.0) - 1.0)).exp());

    let f2 = f * f;
    8.686
        * f2
        * (1.84e-11 * t_rel.sqrt() / p_rel
            + t_rel.powf(-2.5)
                * (0.01275 * (-2239.1 / t).exp() / (fr_o + f2 / fr_o)
                    + 0.1068 * (-3352.0 / t).exp() / (fr_n + f2 / fr_n)))
}
