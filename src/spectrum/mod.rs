// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Spectral summation.

Every valid path becomes a per-band pressure phasor: magnitude from the
source level minus spreading, absorption and the path's extra attenuation;
phase from the travelled distance plus the path's phase change. Phasors are
summed complex-valued within a source (they share the source waveform and
interfere) and energetically across sources (distinct sources have no fixed
phase relationship).
 */


use log::trace;
use num_complex::Complex;

use crate::{
    constants::{
        DEFAULT_GRAZING_ANGLE, FRAC_PI_4, LEVEL_FLOOR_DB, NUM_BANDS, OCTAVE_BAND_FREQS, PI, TAU,
        WALL_REFLECTION_FACTOR,
    },
    math::{c64, cexp, level_from_pressure, level_sum_energetic, pressure_from_level},
    paths::{enumerate_paths, PathKind, PropagationPath, SceneGeometry},
    physics::{
        absorption::attenuation_coefficient,
        diffraction::{double_edge_attenuation, single_edge_attenuation},
        ground::{
            flow_resistivity, legacy_reflection_magnitude, normalized_impedance,
            reflection_coefficient, GroundModel,
        },
        spreading_attenuation,
    },
    scene::{PropagationConfig, Source},
};
use crate::geom::Point3;

/// A 9-band spectrum of levels \[dB\].
pub type Spectrum = [f64; NUM_BANDS];

/// A single-frequency pressure phasor: non-negative pressure \[Pa\] and an
/// unwrapped phase \[radians\].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Phasor {
    pub pressure: f64,
    pub phase: f64,
}

impl Phasor {
    /// Construct from a level and a travelled distance at one frequency:
    /// `p = p_ref 10^(L/20)`, `φ = −k d + φ_extra`.
    pub fn from_level(level_db: f64, distance: f64, frequency: f64, speed: f64, extra_phase: f64) -> Phasor {
        let k = TAU * frequency / speed;
        Phasor {
            pressure: pressure_from_level(level_db),
            phase: -k * distance + extra_phase,
        }
    }

    pub fn as_complex(&self) -> c64 {
        cexp(self.phase) * self.pressure
    }
}

/// One path's contribution to every band, kept for probe diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct PathTrace {
    pub kind: PathKind,
    pub points: Vec<Point3>,
    pub length: f64,
    /// Per-band levels \[dB\].
    pub band_levels: Spectrum,
    /// Per-band unwrapped phases \[radians\].
    pub band_phases: Spectrum,
}

/// The result of evaluating one point against a set of sources.
#[derive(Clone, Debug)]
pub struct PointResult {
    /// Per-band levels, sources combined incoherently \[dB\].
    pub spectrum: Spectrum,
    /// Non-fatal numeric conditions encountered on the way.
    pub warnings: Vec<String>,
    /// The number of reflection-type (image) paths that contributed.
    pub ghost_count: usize,
    /// Per-path traces, when requested.
    pub traces: Option<Vec<PathTrace>>,
}

/// Evaluate the total spectrum at `point` for the given sources.
pub fn compute_point(
    sources: &[&Source],
    point: Point3,
    geometry: &SceneGeometry,
    config: &PropagationConfig,
) -> PointResult {
    compute_point_inner(sources, point, geometry, config, false)
}

/// As [compute_point], but additionally returns per-path traces for
/// diagnostics.
pub fn compute_point_traced(
    sources: &[&Source],
    point: Point3,
    geometry: &SceneGeometry,
    config: &PropagationConfig,
) -> PointResult {
    compute_point_inner(sources, point, geometry, config, true)
}

fn compute_point_inner(
    sources: &[&Source],
    point: Point3,
    geometry: &SceneGeometry,
    config: &PropagationConfig,
    trace_paths: bool,
) -> PointResult {
    let mut warnings = vec![];
    let mut ghost_count = 0;
    let mut traces = if trace_paths { Some(vec![]) } else { None };

    let mut per_source: Vec<Spectrum> = Vec::with_capacity(sources.len());
    for source in sources {
        if source.position.distance(point) > config.max_distance {
            trace!(
                "Source {} is beyond the maximum propagation distance",
                source.id
            );
            continue;
        }
        let paths = enumerate_paths(source.position, point, geometry, config);
        ghost_count += paths
            .iter()
            .filter(|p| matches!(p.kind, PathKind::Ground | PathKind::WallReflection))
            .count();
        let spectrum = source_spectrum(
            source,
            &paths,
            config,
            &mut warnings,
            traces.as_mut(),
        );
        per_source.push(spectrum);
    }

    let mut total = [LEVEL_FLOOR_DB; NUM_BANDS];
    for (band, out) in total.iter_mut().enumerate() {
        *out = level_sum_energetic(per_source.iter().map(|s| s[band]));
    }

    PointResult {
        spectrum: total,
        warnings,
        ghost_count,
        traces,
    }
}

/// Sum one source's paths per band, coherently or energetically.
fn source_spectrum(
    source: &Source,
    paths: &[PropagationPath],
    config: &PropagationConfig,
    warnings: &mut Vec<String>,
    mut traces: Option<&mut Vec<PathTrace>>,
) -> Spectrum {
    let base = source.effective_spectrum();
    let speed = config.speed();
    let sigma = flow_resistivity(
        config.ground.kind,
        config.ground.mixed_factor,
        config.ground.interpolation,
    );
    let cos_theta = DEFAULT_GRAZING_ANGLE.cos();

    // Trace buffers are only materialised for probe requests; grid points
    // skip the clone.
    let mut path_traces: Vec<PathTrace> = if traces.is_some() {
        paths
            .iter()
            .map(|p| PathTrace {
                kind: p.kind,
                points: p.points.clone(),
                length: p.length,
                band_levels: [LEVEL_FLOOR_DB; NUM_BANDS],
                band_phases: [0.0; NUM_BANDS],
            })
            .collect()
    } else {
        vec![]
    };

    let mut spectrum = [LEVEL_FLOOR_DB; NUM_BANDS];
    for band in 0..NUM_BANDS {
        let f = OCTAVE_BAND_FREQS[band];
        let alpha = attenuation_coefficient(config.absorption, f, config.atmosphere);

        let mut coherent_sum = Complex::new(0.0, 0.0);
        let mut energy_sum = 0.0;
        let mut contributed = false;

        for (path_index, path) in paths.iter().enumerate() {
            let phasor = match path_phasor(
                path, base[band], band, f, alpha, speed, sigma, cos_theta, config,
            ) {
                Some(phasor) if phasor.pressure.is_finite() && phasor.phase.is_finite() => phasor,
                Some(_) => {
                    warnings.push(format!(
                        "Source {}: non-finite {:?} contribution in the {} Hz band; path dropped",
                        source.id, path.kind, f
                    ));
                    continue;
                }
                None => continue,
            };
            contributed = true;
            coherent_sum += phasor.as_complex();
            energy_sum += phasor.pressure * phasor.pressure;
            if let Some(trace) = path_traces.get_mut(path_index) {
                trace.band_levels[band] = level_from_pressure(phasor.pressure);
                trace.band_phases[band] = phasor.phase;
            }
        }

        if !contributed {
            continue;
        }
        let pressure = if config.coherent_summation {
            coherent_sum.norm()
        } else {
            energy_sum.sqrt()
        };
        let level = level_from_pressure(pressure);
        if level.is_finite() {
            spectrum[band] = level;
        } else {
            warnings.push(format!(
                "Source {}: non-finite total in the {} Hz band; clamped to the floor",
                source.id, f
            ));
        }
    }

    if let Some(traces) = traces.as_mut() {
        traces.extend(path_traces);
    }
    spectrum
}

/// The per-band phasor of one path, or `None` when the path doesn't
/// contribute at this configuration (degenerate reflection, vanishing Γ).
#[allow(clippy::too_many_arguments)]
fn path_phasor(
    path: &PropagationPath,
    base_level: f64,
    band: usize,
    f: f64,
    alpha: f64,
    speed: f64,
    sigma: f64,
    cos_theta: f64,
    config: &PropagationConfig,
) -> Option<Phasor> {
    match path.kind {
        PathKind::Direct => {
            let level = base_level - spreading_attenuation(config.spreading, path.length)
                - alpha * path.length;
            Some(Phasor::from_level(level, path.length, f, speed, 0.0))
        }

        PathKind::Ground => {
            let info = path.ground?;
            match config.ground.model {
                GroundModel::Legacy => {
                    // Tabulated reflection magnitude, added in phase with the
                    // direct ray.
                    let magnitude = legacy_reflection_magnitude(
                        config.ground.kind,
                        config.ground.mixed_factor,
                        band,
                    );
                    let extra = -20.0 * (magnitude * info.r1 / info.r2).log10();
                    let level = base_level
                        - spreading_attenuation(config.spreading, info.r1)
                        - alpha * info.r2
                        - extra;
                    Some(Phasor::from_level(level, info.r1, f, speed, 0.0))
                }
                GroundModel::TwoRayPhasor => {
                    let z = normalized_impedance(config.ground.impedance, f, sigma);
                    let gamma = reflection_coefficient(z, cos_theta);
                    let magnitude = gamma.norm();
                    if magnitude <= 0.0 {
                        return None;
                    }
                    let extra = -20.0 * (magnitude * info.r1 / info.r2).log10();
                    let level = base_level
                        - spreading_attenuation(config.spreading, info.r1)
                        - alpha * info.r2
                        - extra;
                    Some(Phasor::from_level(level, info.r2, f, speed, gamma.arg()))
                }
            }
        }

        PathKind::WallReflection => {
            let extra = -20.0 * WALL_REFLECTION_FACTOR.log10();
            let level = base_level
                - spreading_attenuation(config.spreading, path.length)
                - alpha * path.length
                - extra;
            // Hard-wall phase inversion.
            Some(Phasor::from_level(level, path.length, f, speed, PI))
        }

        PathKind::BarrierDiffraction | PathKind::BuildingDiffraction => {
            let insertion = if path.edge_count >= 2 {
                double_edge_attenuation(path.deltas.0, path.deltas.1, f, speed)
            } else {
                single_edge_attenuation(path.deltas.0, f, speed)
            };
            let insertion = insertion.min(path.attenuation_cap_db);
            let level = base_level
                - spreading_attenuation(config.spreading, path.length)
                - alpha * path.length
                - insertion;
            // Knife-edge asymptote: −π/4 per edge.
            let extra_phase = -FRAC_PI_4 * f64::from(path.edge_count);
            Some(Phasor::from_level(level, path.length, f, speed, extra_phase))
        }
    }
}
