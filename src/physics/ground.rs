// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Ground impedance and the specular reflection coefficient.
//!
//! The surface is characterised by its flow resistivity σ \[rayl\]; the
//! Delany–Bazley and Miki empirical models turn `X = f/σ` into a
//! dimensionless normal-incidence impedance, and the Fresnel equation turns
//! that into a complex reflection coefficient at the grazing angle.
//!
//! The `legacy` model bypasses impedance entirely: a per-band tabulated
//! reflection magnitude is applied to the image ray, which is then added in
//! phase with the direct ray.

use num_complex::Complex;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::{
    constants::{NUM_BANDS, SIGMA_HARD, SIGMA_SOFT},
    math::c64,
};

/// `X = f/σ` is clamped into this range before the empirical power laws are
/// evaluated, to avoid overflow at extreme ratios.
const X_MIN: f64 = 1e-8;
const X_MAX: f64 = 10.0;

/// Ground surface category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GroundKind {
    /// Concrete, asphalt, water: σ = 2·10⁶ rayl.
    Hard,
    /// Grass, soil, snow: σ = 2·10⁴ rayl.
    Soft,
    /// A blend controlled by the mixed factor G ∈ [0, 1].
    Mixed,
}

impl Default for GroundKind {
    fn default() -> GroundKind {
        GroundKind::Mixed
    }
}

/// How the mixed-ground factor interpolates between hard and soft.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GroundInterpolation {
    /// Linear in σ (ISO 9613-2 style G factor).
    Iso9613,
    /// Linear in log σ.
    Logarithmic,
}

impl Default for GroundInterpolation {
    fn default() -> GroundInterpolation {
        GroundInterpolation::Iso9613
    }
}

/// Which ground-reflection formulation to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum GroundModel {
    /// Tabulated per-band reflection magnitudes, added in phase with the
    /// direct ray.
    Legacy,
    /// Impedance-based coherent two-ray model.
    TwoRayPhasor,
}

impl Default for GroundModel {
    fn default() -> GroundModel {
        GroundModel::TwoRayPhasor
    }
}

/// Which empirical impedance model maps `f/σ` to an impedance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ImpedanceModel {
    DelanyBazley,
    Miki,
    /// Delany–Bazley when `f/σ < 1`, Miki otherwise.
    Auto,
}

impl Default for ImpedanceModel {
    fn default() -> ImpedanceModel {
        ImpedanceModel::Auto
    }
}

/// The effective flow resistivity \[rayl\] for a ground kind. `Mixed` blends
/// the hard and soft resistivities by the factor `g` under the chosen
/// interpolation rule.
pub fn flow_resistivity(kind: GroundKind, g: f64, interpolation: GroundInterpolation) -> f64 {
    match kind {
        GroundKind::Hard => SIGMA_HARD,
        GroundKind::Soft => SIGMA_SOFT,
        GroundKind::Mixed => {
            let g = g.clamp(0.0, 1.0);
            match interpolation {
                GroundInterpolation::Iso9613 => SIGMA_HARD * (1.0 - g) + SIGMA_SOFT * g,
                GroundInterpolation::Logarithmic => {
                    (SIGMA_HARD.ln() * (1.0 - g) + SIGMA_SOFT.ln() * g).exp()
                }
            }
        }
    }
}

/// The dimensionless (characteristic-impedance-normalised) surface impedance
/// at frequency `f` \[Hz\] over ground with flow resistivity `sigma` \[rayl\].
pub fn normalized_impedance(model: ImpedanceModel, f: f64, sigma: f64) -> c64 {
    let x = (f / sigma).clamp(X_MIN, X_MAX);
    match model {
        ImpedanceModel::DelanyBazley => Complex::new(
            1.0 + 0.0511 * x.powf(-0.75),
            -0.0768 * x.powf(-0.73),
        ),
        ImpedanceModel::Miki => Complex::new(
            1.0 + 0.0699 * x.powf(-0.632),
            -0.1071 * x.powf(-0.632),
        ),
        ImpedanceModel::Auto => {
            if x < 1.0 {
                normalized_impedance(ImpedanceModel::DelanyBazley, f, sigma)
            } else {
                normalized_impedance(ImpedanceModel::Miki, f, sigma)
            }
        }
    }
}

/// Fresnel reflection coefficient `Γ = (Zₙ cosθ − 1)/(Zₙ cosθ + 1)` for the
/// angle of incidence `θ` from the surface normal. The magnitude is in
/// `[0, 1]` and the phase in `(−π, π]`.
pub fn reflection_coefficient(z_n: c64, cos_theta: f64) -> c64 {
    let zc = z_n * cos_theta;
    (zc - 1.0) / (zc + 1.0)
}

/// Per-band reflection magnitudes of the legacy tabulated model over hard
/// ground.
const LEGACY_REFLECTION_HARD: [f64; NUM_BANDS] =
    [0.97, 0.97, 0.97, 0.97, 0.97, 0.97, 0.97, 0.97, 0.97];

/// Per-band reflection magnitudes of the legacy tabulated model over soft
/// ground; absorption grows with frequency.
const LEGACY_REFLECTION_SOFT: [f64; NUM_BANDS] =
    [0.90, 0.85, 0.70, 0.55, 0.45, 0.40, 0.35, 0.30, 0.25];

/// The legacy model's reflection magnitude for one octave band. `Mixed`
/// interpolates linearly between the hard and soft tables by `g`.
pub fn legacy_reflection_magnitude(kind: GroundKind, g: f64, band: usize) -> f64 {
    match kind {
        GroundKind::Hard => LEGACY_REFLECTION_HARD[band],
        GroundKind::Soft => LEGACY_REFLECTION_SOFT[band],
        GroundKind::Mixed => {
            let g = g.clamp(0.0, 1.0);
            LEGACY_REFLECTION_HARD[band] * (1.0 - g) + LEGACY_REFLECTION_SOFT[band] * g
        }
    }
}
