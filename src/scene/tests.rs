// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Write;

use approx::assert_abs_diff_eq;
use indoc::indoc;
use tempfile::Builder;

use super::*;
use crate::physics::{AbsorptionModel, GroundModel};

const FULL_SCENE: &str = indoc! {r#"
    {
      "version": "1",
      "origin": {"latLon": {"lat": 52.37, "lon": 4.89}, "altitude": 2.0},
      "sources": [
        {
          "id": "src-1",
          "x": 0.0, "y": 0.0, "z": 2.0,
          "spectrum": [94, 94, 94, 94, 94, 94, 94, 94, 94],
          "gain": -3.0
        },
        {
          "id": "src-2",
          "x": 5.0, "y": 5.0,
          "spectrum": [80, 80, 80, 80, 80, 80, 80, 80, 80],
          "enabled": false
        }
      ],
      "receivers": [
        {"id": "rcv-1", "x": 10.0, "y": 0.0}
      ],
      "panels": [
        {
          "id": "panel-1",
          "vertices": [{"x": 0, "y": 0}, {"x": 10, "y": 0}, {"x": 10, "y": 10}],
          "pointCap": 500
        }
      ],
      "obstacles": [
        {
          "type": "barrier", "id": "bar-1",
          "p1": {"x": 5, "y": -5}, "p2": {"x": 5, "y": 5},
          "height": 3.0, "groundElevation": 0.5
        },
        {
          "type": "building", "id": "bld-1",
          "footprint": [{"x": 20, "y": 0}, {"x": 20, "y": 10}, {"x": 30, "y": 10}, {"x": 30, "y": 0}],
          "height": 8.0, "attenuation": 25.0
        }
      ],
      "grid": {
        "bounds": {"minX": 0, "minY": 0, "maxX": 50, "maxY": 50},
        "resolution": 2.5,
        "weighting": "A"
      },
      "engineConfig": {
        "spreading": "spherical",
        "absorption": "iso9613",
        "temperatureC": 15.0,
        "ground": {"enabled": true, "kind": "soft", "model": "twoRayPhasor"},
        "sideDiffraction": "on"
      }
    }
"#};

#[test]
fn full_scene_document_parses() {
    let scene = Scene::from_json_str(FULL_SCENE).unwrap();

    assert_eq!(scene.version, "1");
    let origin = scene.origin.unwrap();
    assert_abs_diff_eq!(origin.lat_lon.lat, 52.37, epsilon = 1e-12);
    assert_abs_diff_eq!(origin.altitude, 2.0, epsilon = 1e-12);

    assert_eq!(scene.sources.len(), 2);
    let src = &scene.sources[0];
    assert_abs_diff_eq!(src.position.z, 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(src.gain_db, -3.0, epsilon = 1e-12);
    assert!(src.enabled && !src.solo && !src.muted);
    // The second source defaults to z = 1.5 and is disabled.
    assert_abs_diff_eq!(scene.sources[1].position.z, 1.5, epsilon = 1e-12);
    assert!(!scene.sources[1].enabled);

    // Receiver default height.
    assert_abs_diff_eq!(scene.receivers[0].position.z, 1.5, epsilon = 1e-12);

    assert_eq!(scene.panels.len(), 1);
    assert_eq!(scene.panels[0].point_cap, 500);

    assert_eq!(scene.barriers.len(), 1);
    let barrier = &scene.barriers[0];
    assert_abs_diff_eq!(barrier.ground_elevation, 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(barrier.top_z(), 3.5, epsilon = 1e-12);
    // The transmission cap defaults to opaque.
    assert_abs_diff_eq!(barrier.attenuation_db, 100.0, epsilon = 1e-12);

    assert_eq!(scene.buildings.len(), 1);
    assert_abs_diff_eq!(scene.buildings[0].attenuation_db, 25.0, epsilon = 1e-12);

    let grid = scene.grid.unwrap();
    assert_abs_diff_eq!(grid.resolution, 2.5, epsilon = 1e-12);
    assert_eq!(grid.target_band, None);

    let config = scene.config.unwrap();
    assert_eq!(config.absorption, AbsorptionModel::Iso9613);
    assert_abs_diff_eq!(config.atmosphere.temperature_c, 15.0, epsilon = 1e-12);
    // Unspecified atmosphere fields keep their defaults.
    assert_abs_diff_eq!(config.atmosphere.humidity_percent, 50.0, epsilon = 1e-12);
    assert_eq!(config.ground.model, GroundModel::TwoRayPhasor);
    assert_eq!(config.side_diffraction, SideDiffraction::On);
    assert!(config.coherent_summation);
}

#[test]
fn clockwise_footprints_are_normalised_to_ccw() {
    let scene = Scene::from_json_str(FULL_SCENE).unwrap();
    let footprint = &scene.buildings[0].footprint;
    assert!(crate::geom::polygon_signed_area(footprint) > 0.0);
    assert_abs_diff_eq!(footprint[0].x, 30.0, epsilon = 1e-12);
    assert_abs_diff_eq!(footprint[0].y, 0.0, epsilon = 1e-12);
}

#[test]
fn yaml_documents_parse_too() {
    let yaml = indoc! {r#"
        version: "1"
        sources:
          - id: src-1
            x: 0.0
            y: 0.0
            spectrum: [94, 94, 94, 94, 94, 94, 94, 94, 94]
        receivers:
          - id: rcv-1
            x: 10.0
            y: 0.0
    "#};
    let scene = Scene::from_yaml_str(yaml).unwrap();
    assert_eq!(scene.sources.len(), 1);
    assert_eq!(scene.receivers.len(), 1);
}

#[test]
fn reading_dispatches_on_extension() {
    let mut json = Builder::new().suffix(".json").tempfile().unwrap();
    json.write_all(FULL_SCENE.as_bytes()).unwrap();
    let scene = Scene::read_from_file(json.path()).unwrap();
    assert_eq!(scene.sources.len(), 2);

    let mut other = Builder::new().suffix(".csv").tempfile().unwrap();
    other.write_all(b"not a scene").unwrap();
    assert!(matches!(
        Scene::read_from_file(other.path()),
        Err(ReadSceneError::UnsupportedExt(_))
    ));
}

#[test]
fn unsupported_version_is_rejected() {
    let result = Scene::from_json_str(r#"{"version": "99"}"#);
    assert!(matches!(
        result,
        Err(ReadSceneError::Scene(SceneError::UnsupportedVersion { .. }))
    ));
}

fn minimal_with_source(source_json: &str) -> String {
    format!(r#"{{"version": "1", "sources": [{source_json}]}}"#)
}

#[test]
fn wrong_spectrum_length_is_rejected() {
    let result = Scene::from_json_str(&minimal_with_source(
        r#"{"id": "s", "x": 0, "y": 0, "spectrum": [94, 94]}"#,
    ));
    assert!(matches!(
        result,
        Err(ReadSceneError::Scene(SceneError::SpectrumLength { got: 2, .. }))
    ));
}

#[test]
fn underground_sources_are_rejected() {
    let result = Scene::from_json_str(&minimal_with_source(
        r#"{"id": "s", "x": 0, "y": 0, "z": -1.0,
            "spectrum": [94, 94, 94, 94, 94, 94, 94, 94, 94]}"#,
    ));
    assert!(matches!(
        result,
        Err(ReadSceneError::Scene(SceneError::SourceBelowGround { .. }))
    ));
}

#[test]
fn duplicate_ids_are_rejected() {
    let json = r#"{"version": "1", "receivers": [
        {"id": "r", "x": 0, "y": 0}, {"id": "r", "x": 1, "y": 1}
    ]}"#;
    assert!(matches!(
        Scene::from_json_str(json),
        Err(ReadSceneError::Scene(SceneError::DuplicateId {
            array: "receivers",
            ..
        }))
    ));
}

#[test]
fn degenerate_barriers_are_rejected() {
    let json = r#"{"version": "1", "obstacles": [
        {"type": "barrier", "id": "b",
         "p1": {"x": 5, "y": 5}, "p2": {"x": 5, "y": 5}, "height": 3}
    ]}"#;
    assert!(matches!(
        Scene::from_json_str(json),
        Err(ReadSceneError::Scene(SceneError::DegenerateBarrier { .. }))
    ));
}

#[test]
fn non_positive_heights_are_rejected() {
    let json = r#"{"version": "1", "obstacles": [
        {"type": "building", "id": "b", "height": 0,
         "footprint": [{"x": 0, "y": 0}, {"x": 1, "y": 0}, {"x": 1, "y": 1}]}
    ]}"#;
    assert!(matches!(
        Scene::from_json_str(json),
        Err(ReadSceneError::Scene(SceneError::NonPositiveHeight { .. }))
    ));
}

#[test]
fn self_intersecting_footprints_are_rejected() {
    let json = r#"{"version": "1", "obstacles": [
        {"type": "building", "id": "b", "height": 5,
         "footprint": [{"x": 0, "y": 0}, {"x": 1, "y": 1}, {"x": 1, "y": 0}, {"x": 0, "y": 1}]}
    ]}"#;
    assert!(matches!(
        Scene::from_json_str(json),
        Err(ReadSceneError::Scene(SceneError::FootprintNotSimple { .. }))
    ));
}

#[test]
fn zero_area_footprints_are_rejected() {
    let json = r#"{"version": "1", "obstacles": [
        {"type": "building", "id": "b", "height": 5,
         "footprint": [{"x": 0, "y": 0}, {"x": 1, "y": 0}, {"x": 2, "y": 0}]}
    ]}"#;
    assert!(matches!(
        Scene::from_json_str(json),
        Err(ReadSceneError::Scene(SceneError::FootprintZeroArea { .. }))
    ));
}

#[test]
fn nan_coordinates_are_rejected() {
    // JSON has no NaN literal, but YAML does.
    let yaml = indoc! {r#"
        version: "1"
        receivers:
          - id: r
            x: .nan
            y: 0.0
    "#};
    assert!(matches!(
        Scene::from_yaml_str(yaml),
        Err(ReadSceneError::Scene(SceneError::NonFinite { .. }))
    ));
}

#[test]
fn solo_and_mute_collapse() {
    let mut scene = Scene::from_json_str(FULL_SCENE).unwrap();
    scene.sources[1].enabled = true;

    // No solo anywhere: both enabled sources contribute.
    assert!(scene.is_source_enabled(&scene.sources[0]));
    assert!(scene.is_source_enabled(&scene.sources[1]));

    // Soloing the second silences the first.
    scene.sources[1].solo = true;
    assert!(!scene.is_source_enabled(&scene.sources[0]));
    assert!(scene.is_source_enabled(&scene.sources[1]));
    assert_eq!(scene.enabled_sources().len(), 1);

    // A muted source never contributes, soloed or not.
    scene.sources[1].muted = true;
    assert!(!scene.is_source_enabled(&scene.sources[1]));
}

#[test]
fn default_config_round_trips_through_serde() {
    let config = PropagationConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let back: PropagationConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config, back);
}

#[test]
fn config_validation_rejects_contradictions() {
    let mut config = PropagationConfig::default();
    config.ground.mixed_factor = -0.1;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MixedFactorOutOfRange(_))
    ));

    let mut config = PropagationConfig::default();
    config.speed_of_sound = Some(0.0);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NonPositiveSpeedOfSound(_))
    ));

    let mut config = PropagationConfig::default();
    config.atmosphere.humidity_percent = 150.0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::HumidityOutOfRange(_))
    ));

    assert!(PropagationConfig::default().validate().is_ok());
}

#[test]
fn speed_of_sound_falls_back_to_temperature() {
    let mut config = PropagationConfig::default();
    assert_abs_diff_eq!(config.speed(), 343.21, epsilon = 0.01);
    config.speed_of_sound = Some(340.0);
    assert_abs_diff_eq!(config.speed(), 340.0, epsilon = 1e-12);
    config.speed_of_sound = None;
    config.atmosphere.temperature_c = 0.0;
    assert_abs_diff_eq!(config.speed(), 331.3, epsilon = 1e-9);
}

#[test]
fn effective_spectrum_applies_gain() {
    let scene = Scene::from_json_str(FULL_SCENE).unwrap();
    let spectrum = scene.sources[0].effective_spectrum();
    for level in spectrum {
        assert_abs_diff_eq!(level, 91.0, epsilon = 1e-12);
    }
}
