// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Frequency weightings and overall levels.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::{
    constants::{A_WEIGHTING, C_WEIGHTING, LEVEL_FLOOR_DB, NUM_BANDS, Z_WEIGHTING},
    math::level_sum_energetic,
};

/// Frequency weighting applied when collapsing a spectrum to one number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum Weighting {
    A,
    C,
    Z,
}

impl Default for Weighting {
    fn default() -> Weighting {
        Weighting::A
    }
}

/// The fixed per-band corrections \[dB\] for a weighting.
pub fn weighting_corrections(weighting: Weighting) -> &'static [f64; NUM_BANDS] {
    match weighting {
        Weighting::A => &A_WEIGHTING,
        Weighting::C => &C_WEIGHTING,
        Weighting::Z => &Z_WEIGHTING,
    }
}

/// The weighted overall level `10 log10(Σ 10^((L_i + W_i)/10))` \[dB\].
/// Bands at the floor do not contribute.
pub fn overall_level(spectrum: &[f64; NUM_BANDS], weighting: Weighting) -> f64 {
    let corrections = weighting_corrections(weighting);
    level_sum_energetic(
        spectrum
            .iter()
            .zip(corrections.iter())
            .filter(|(l, _)| **l > LEVEL_FLOOR_DB)
            .map(|(l, w)| l + w),
    )
}
