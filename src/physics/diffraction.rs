// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Maekawa screen diffraction.
//!
//! The single-edge insertion loss is the empirical Maekawa curve
//! `10 log10(3 + 20 N)` over the Fresnel number `N = 2 δ f / c`, extended
//! continuously below line of sight. The double-edge loss couples two
//! single-edge losses; it is monotone in both path-length excesses and in
//! frequency, and collapses to the single-edge curve as either edge
//! degenerates.

/// Coupling correction subtracted when two edges both contribute \[dB\].
/// `A(0) ≈ 4.77 dB` absorbs this as an edge degenerates.
const DOUBLE_EDGE_COUPLING_DB: f64 = 5.0;

/// The dimensionless Fresnel number `N = 2 δ f / c` for a path-length excess
/// `δ` \[m\] at frequency `f` \[Hz\] and speed of sound `c` \[m/s\].
pub fn fresnel_number(delta: f64, f: f64, c: f64) -> f64 {
    2.0 * delta * f / c
}

/// Single-edge Maekawa insertion loss \[dB\].
///
/// `10 log10(3 + 20 N)` for `N ≥ 0`; below line of sight the argument flips
/// to `3 − 20 |N|`, which decays continuously to 0 dB at `N = −0.1`. Never
/// negative.
pub fn single_edge_attenuation(delta: f64, f: f64, c: f64) -> f64 {
    let n = fresnel_number(delta, f, c);
    let arg = if n >= 0.0 { 3.0 + 20.0 * n } else { 3.0 - 20.0 * n.abs() };
    if arg <= 1.0 {
        0.0
    } else {
        10.0 * arg.log10()
    }
}

/// Double-edge (over-roof) insertion loss \[dB\].
///
/// The sum of the two single-edge losses minus a fixed coupling correction,
/// floored at the larger single-edge loss so a second edge never *reduces*
/// the attenuation.
pub fn double_edge_attenuation(delta1: f64, delta2: f64, f: f64, c: f64) -> f64 {
    let a1 = single_edge_attenuation(delta1, f, c);
    let a2 = single_edge_attenuation(delta2, f, c);
    (a1 + a2 - DOUBLE_EDGE_COUPLING_DB).max(a1.max(a2))
}
