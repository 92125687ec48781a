// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use serial_test::serial;

use super::*;
use crate::{
    grid::Bounds,
    physics::AbsorptionModel,
    scene::{Panel, Receiver},
};

fn simple_scene() -> Scene {
    Scene {
        version: "1".to_string(),
        origin: None,
        sources: vec![Source {
            id: "src".to_string(),
            position: Point3::new(0.0, 0.0, 1.5),
            spectrum: [94.0; NUM_BANDS],
            gain_db: 0.0,
            enabled: true,
            solo: false,
            muted: false,
        }],
        receivers: vec![Receiver {
            id: "rcv".to_string(),
            position: Point3::new(10.0, 0.0, 1.5),
        }],
        panels: vec![Panel {
            id: "panel".to_string(),
            vertices: vec![
                Point2::new(5.0, -5.0),
                Point2::new(15.0, -5.0),
                Point2::new(15.0, 5.0),
                Point2::new(5.0, 5.0),
            ],
            elevation: 1.5,
            resolution: 2.0,
            point_cap: 100,
        }],
        barriers: vec![],
        buildings: vec![],
        grid: None,
        config: None,
    }
}

fn bare_config() -> PropagationConfig {
    let mut config = PropagationConfig::default();
    config.absorption = AbsorptionModel::None;
    config.ground.enabled = false;
    config
}

#[test]
#[serial]
fn receivers_compute_end_to_end() {
    let scene = simple_scene();
    let response = compute_receivers(
        &scene,
        Some(&bare_config()),
        &RequestTicket::anonymous(),
    )
    .unwrap();
    assert_eq!(response.backend_id, "cpu");
    assert_eq!(response.receivers.len(), 1);
    let receiver = &response.receivers[0];
    assert_eq!(receiver.id, "rcv");
    for level in receiver.spectrum {
        assert_abs_diff_eq!(level, 74.0, epsilon = 1e-9);
    }
    // LAeq of a flat 74 dB spectrum: 74 plus the energetic sum of the
    // A-corrections, about 7.17 dB.
    assert_abs_diff_eq!(receiver.laeq, 81.17, epsilon = 0.01);
    assert!(response.warnings.is_empty());
    assert!(response.timings.total_ms >= response.timings.compute_ms);
}

#[test]
#[serial]
fn scene_embedded_config_applies_when_no_override_is_given() {
    let mut scene = simple_scene();
    let mut config = bare_config();
    config.coherent_summation = false;
    scene.config = Some(config);
    let response =
        compute_receivers(&scene, None, &RequestTicket::anonymous()).unwrap();
    // Ground and absorption are off in the embedded config: free field.
    assert_abs_diff_eq!(response.receivers[0].spectrum[3], 74.0, epsilon = 1e-9);
}

#[test]
#[serial]
fn invalid_config_aborts_the_request() {
    let scene = simple_scene();
    let mut config = bare_config();
    config.ground.mixed_factor = 1.5;
    let result = compute_receivers(&scene, Some(&config), &RequestTicket::anonymous());
    assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
}

#[test]
#[serial]
fn second_submission_with_the_same_id_stales_the_first() {
    let scene = simple_scene();
    let first = RequestTicket::register(Some("staleness-a"));
    let second = RequestTicket::register(Some("staleness-a"));

    let result = compute_receivers(&scene, Some(&bare_config()), &first);
    assert!(matches!(result, Err(ref e) if e.is_stale()));

    let result = compute_receivers(&scene, Some(&bare_config()), &second);
    assert!(result.is_ok());
}

#[test]
#[serial]
fn distinct_request_ids_do_not_interfere() {
    let scene = simple_scene();
    let a = RequestTicket::register(Some("staleness-b"));
    let b = RequestTicket::register(Some("staleness-c"));
    assert!(compute_receivers(&scene, Some(&bare_config()), &a).is_ok());
    assert!(compute_receivers(&scene, Some(&bare_config()), &b).is_ok());
}

#[test]
#[serial]
fn anonymous_tickets_are_uncancellable() {
    let ticket = RequestTicket::anonymous();
    let _other = RequestTicket::register(Some("staleness-d"));
    assert!(!ticket.is_stale());
}

#[test]
#[serial]
fn panel_compute_reports_stats() {
    let scene = simple_scene();
    let response = compute_panel(
        &scene,
        "panel",
        Some(&bare_config()),
        &RequestTicket::anonymous(),
    )
    .unwrap();
    assert_eq!(response.panel_id, "panel");
    assert_eq!(response.stats.sample_count, response.samples.len());
    assert!(response.samples.len() <= 100);
    assert!(response.stats.min <= response.stats.p95);
    assert!(response.stats.p95 <= response.stats.max);
}

#[test]
#[serial]
fn unknown_panel_id_is_rejected() {
    let scene = simple_scene();
    let result = compute_panel(
        &scene,
        "no-such-panel",
        Some(&bare_config()),
        &RequestTicket::anonymous(),
    );
    assert!(matches!(result, Err(EngineError::UnknownPanel(_))));
}

#[test]
#[serial]
fn grid_compute_end_to_end() {
    let scene = simple_scene();
    let grid = GridConfig {
        bounds: Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 20.0,
            max_y: 10.0,
        },
        resolution: 5.0,
        elevation: 1.5,
        target_band: Some(3),
        weighting: Weighting::A,
    };
    let response = compute_grid(
        &scene,
        Some(&grid),
        Some(&bare_config()),
        &RequestTicket::anonymous(),
    )
    .unwrap();
    assert_eq!(response.grid.cols, 5);
    assert_eq!(response.grid.rows, 3);
    assert_eq!(response.grid.values.len(), 15);
    assert_eq!(response.backend_id, "cpu");
}

#[test]
#[serial]
fn grid_without_config_is_rejected() {
    let scene = simple_scene();
    let result = compute_grid(
        &scene,
        None,
        Some(&bare_config()),
        &RequestTicket::anonymous(),
    );
    assert!(matches!(result, Err(EngineError::MissingGridConfig)));
}

#[test]
#[serial]
fn out_of_range_band_index_is_rejected() {
    let scene = simple_scene();
    let grid = GridConfig {
        bounds: Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 10.0,
            max_y: 10.0,
        },
        resolution: 5.0,
        elevation: 1.5,
        target_band: Some(9),
        weighting: Weighting::Z,
    };
    let result = compute_grid(
        &scene,
        Some(&grid),
        Some(&bare_config()),
        &RequestTicket::anonymous(),
    );
    assert!(matches!(result, Err(EngineError::BadBandIndex(9))));
}

#[test]
#[serial]
fn muted_and_soloed_sources_collapse() {
    let mut scene = simple_scene();
    let mut second = scene.sources[0].clone();
    second.id = "src2".to_string();
    second.solo = true;
    scene.sources.push(second);
    // With a soloed source present, the first source is dropped.
    let response =
        compute_receivers(&scene, Some(&bare_config()), &RequestTicket::anonymous()).unwrap();
    assert_abs_diff_eq!(response.receivers[0].spectrum[3], 74.0, epsilon = 1e-9);

    // Without solo, both contribute (+3 dB).
    scene.sources[1].solo = false;
    let response =
        compute_receivers(&scene, Some(&bare_config()), &RequestTicket::anonymous()).unwrap();
    assert_abs_diff_eq!(
        response.receivers[0].spectrum[3],
        74.0 + 10.0 * 2_f64.log10(),
        epsilon = 1e-9
    );
}

#[test]
#[serial]
fn probe_returns_magnitudes_and_ghost_count() {
    let request = ProbeRequest {
        probe_id: "probe-1".to_string(),
        position: Point3::new(10.0, 0.0, 1.7),
        sources: vec![Source {
            id: "src".to_string(),
            position: Point3::new(0.0, 0.0, 1.5),
            spectrum: [94.0; NUM_BANDS],
            gain_db: 0.0,
            enabled: true,
            solo: false,
            muted: false,
        }],
        walls: vec![],
        config: PropagationConfig::default(),
        include_path_geometry: false,
    };
    let response = run_probe(&request).unwrap();
    assert_eq!(response.probe_id, "probe-1");
    assert_eq!(response.data.frequencies, OCTAVE_BAND_FREQS);
    // Direct + ground reflection: one ghost.
    assert_eq!(response.data.interference_details.ghost_count, 1);
    assert!(response.data.traced_paths.is_none());
}

#[test]
#[serial]
fn probe_traces_paths_on_request() {
    let request = ProbeRequest {
        probe_id: "probe-2".to_string(),
        position: Point3::new(10.0, 0.0, 1.7),
        sources: vec![Source {
            id: "src".to_string(),
            position: Point3::new(0.0, 0.0, 1.5),
            spectrum: [94.0; NUM_BANDS],
            gain_db: 0.0,
            enabled: true,
            solo: false,
            muted: false,
        }],
        walls: vec![ProbeWall {
            kind: ProbeWallKind::Barrier,
            vertices: vec![Point2::new(5.0, -5.0), Point2::new(5.0, 5.0)],
            height: 3.0,
        }],
        config: PropagationConfig::default(),
        include_path_geometry: true,
    };
    let response = run_probe(&request).unwrap();
    let traced = response.data.traced_paths.unwrap();
    assert!(!traced.is_empty());
    assert!(traced.iter().any(|t| t.kind == "barrier"));
    let phases = response.data.phase_relationships.unwrap();
    assert_eq!(phases.len(), traced.len());
}
