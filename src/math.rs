// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Small maths helpers used throughout the crate.

use num_complex::Complex;

use crate::constants::{LEVEL_FLOOR_DB, PRESSURE_FLOOR, P_REF};

/// Shorthand for a double-precision complex number.
#[allow(non_camel_case_types)]
pub(crate) type c64 = Complex<f64>;

/// `e^(i arg)`, using `sin_cos` to avoid two transcendental calls.
#[inline]
pub(crate) fn cexp(arg: f64) -> c64 {
    let (s, c) = arg.sin_cos();
    Complex::new(c, s)
}

/// Convert a sound pressure level \[dB re 20 µPa\] to a pressure \[Pa\],
/// clamped to the pressure floor.
#[inline]
pub(crate) fn pressure_from_level(level_db: f64) -> f64 {
    (P_REF * 10_f64.powf(level_db / 20.0)).max(PRESSURE_FLOOR)
}

/// Convert a pressure \[Pa\] to a sound pressure level \[dB re 20 µPa\].
/// Pressures at or below the floor map to the level floor.
#[inline]
pub(crate) fn level_from_pressure(pressure: f64) -> f64 {
    if pressure <= PRESSURE_FLOOR {
        LEVEL_FLOOR_DB
    } else {
        20.0 * (pressure / P_REF).log10()
    }
}

/// Energetic (incoherent) sum of levels: `10 log10(Σ 10^(L/10))`. An empty
/// iterator, or one whose terms all sit at the floor, yields the floor.
pub(crate) fn level_sum_energetic(levels: impl IntoIterator<Item = f64>) -> f64 {
    let sum: f64 = levels
        .into_iter()
        .filter(|l| *l > LEVEL_FLOOR_DB)
        .map(|l| 10_f64.powf(l / 10.0))
        .sum();
    if sum > 0.0 {
        10.0 * sum.log10()
    } else {
        LEVEL_FLOOR_DB
    }
}
